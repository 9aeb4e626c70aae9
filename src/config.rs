use chrono::{Duration, NaiveTime};
use chrono_tz::Tz;
use dotenv::dotenv;
use std::env;
use std::str::FromStr;
use thiserror::Error;
use tracing::info;

use crate::models::stylist::DayOfWeek;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to parse {name}: {message}")]
    Invalid { name: &'static str, message: String },
}

/// Hours during which the shop as a whole takes bookings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusinessHours {
    pub open: NaiveTime,
    pub close: NaiveTime,
    pub days: Vec<DayOfWeek>,
}

impl Default for BusinessHours {
    fn default() -> Self {
        Self {
            open: NaiveTime::from_hms_opt(9, 0, 0).unwrap_or_default(),
            close: NaiveTime::from_hms_opt(18, 0, 0).unwrap_or_default(),
            days: vec![
                DayOfWeek::Monday,
                DayOfWeek::Tuesday,
                DayOfWeek::Wednesday,
                DayOfWeek::Thursday,
                DayOfWeek::Friday,
            ],
        }
    }
}

/// Per-tenant booking settings, passed explicitly to every service call.
#[derive(Debug, Clone)]
pub struct BookingSettings {
    pub timezone: Tz,
    pub slot_interval_minutes: u32,
    pub default_service_duration: u32,
    /// Padding around existing appointments when listing open slots.
    pub availability_buffer_minutes: u32,
    /// Padding around existing appointments when reserving a slot.
    pub booking_buffer_minutes: u32,
    /// Padding used by the shop-wide calendar check.
    pub calendar_check_buffer_minutes: u32,
    pub business_hours: BusinessHours,
}

impl Default for BookingSettings {
    fn default() -> Self {
        Self {
            timezone: Tz::UTC,
            slot_interval_minutes: 30,
            default_service_duration: 60,
            availability_buffer_minutes: 0,
            booking_buffer_minutes: 0,
            calendar_check_buffer_minutes: 15,
            business_hours: BusinessHours::default(),
        }
    }
}

impl BookingSettings {
    pub fn slot_interval(&self) -> Duration {
        Duration::minutes(i64::from(self.slot_interval_minutes))
    }

    pub fn availability_buffer(&self) -> Duration {
        Duration::minutes(i64::from(self.availability_buffer_minutes))
    }

    pub fn booking_buffer(&self) -> Duration {
        Duration::minutes(i64::from(self.booking_buffer_minutes))
    }

    pub fn calendar_check_buffer(&self) -> Duration {
        Duration::minutes(i64::from(self.calendar_check_buffer_minutes))
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub appointments_path: String,
    pub history_path: String,
    pub catalog_path: String,
    pub settings: BookingSettings,
}

impl Config {
    /// Load configuration from the environment (and `.env` if present).
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv().ok();
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build configuration from any key lookup, falling back to defaults for missing keys.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = BookingSettings::default();

        let timezone = match lookup("BUSINESS_TIMEZONE") {
            Some(name) => Tz::from_str(&name).map_err(|e| ConfigError::Invalid {
                name: "BUSINESS_TIMEZONE",
                message: e.to_string(),
            })?,
            None => defaults.timezone,
        };

        let slot_interval_minutes =
            parse_var(&lookup, "SLOT_INTERVAL_MINUTES", defaults.slot_interval_minutes)?;
        if slot_interval_minutes == 0 {
            return Err(ConfigError::Invalid {
                name: "SLOT_INTERVAL_MINUTES",
                message: "must be greater than zero".to_string(),
            });
        }

        let business_hours = BusinessHours {
            open: parse_time_var(&lookup, "BUSINESS_OPEN", defaults.business_hours.open)?,
            close: parse_time_var(&lookup, "BUSINESS_CLOSE", defaults.business_hours.close)?,
            days: match lookup("BUSINESS_DAYS") {
                Some(raw) => raw
                    .split(',')
                    .filter(|day| !day.trim().is_empty())
                    .map(DayOfWeek::from_str)
                    .collect::<Result<Vec<_>, _>>()
                    .map_err(|message| ConfigError::Invalid {
                        name: "BUSINESS_DAYS",
                        message,
                    })?,
                None => defaults.business_hours.days,
            },
        };

        let settings = BookingSettings {
            timezone,
            slot_interval_minutes,
            default_service_duration: parse_var(
                &lookup,
                "DEFAULT_SERVICE_DURATION_MINUTES",
                defaults.default_service_duration,
            )?,
            availability_buffer_minutes: parse_var(
                &lookup,
                "AVAILABILITY_BUFFER_MINUTES",
                defaults.availability_buffer_minutes,
            )?,
            booking_buffer_minutes: parse_var(
                &lookup,
                "BOOKING_BUFFER_MINUTES",
                defaults.booking_buffer_minutes,
            )?,
            calendar_check_buffer_minutes: parse_var(
                &lookup,
                "CALENDAR_CHECK_BUFFER_MINUTES",
                defaults.calendar_check_buffer_minutes,
            )?,
            business_hours,
        };

        let config = Self {
            port: parse_var(&lookup, "SERVER_PORT", 3000)?,
            appointments_path: lookup("APPOINTMENTS_DATABASE_PATH")
                .unwrap_or_else(|| "/app/data/appointments.csv".to_string()),
            history_path: lookup("STATUS_HISTORY_PATH")
                .unwrap_or_else(|| "/app/data/appointment_history.csv".to_string()),
            catalog_path: lookup("CATALOG_PATH")
                .unwrap_or_else(|| "/app/data/catalog.json".to_string()),
            settings,
        };

        info!(
            "Loaded configuration: timezone={}, slot interval={}m, buffers (availability/booking/calendar)={}/{}/{}m",
            config.settings.timezone,
            config.settings.slot_interval_minutes,
            config.settings.availability_buffer_minutes,
            config.settings.booking_buffer_minutes,
            config.settings.calendar_check_buffer_minutes
        );

        Ok(config)
    }
}

fn parse_var<F, T>(lookup: &F, name: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(name) {
        Some(raw) => raw.trim().parse::<T>().map_err(|e| ConfigError::Invalid {
            name,
            message: e.to_string(),
        }),
        None => Ok(default),
    }
}

fn parse_time_var<F>(
    lookup: &F,
    name: &'static str,
    default: NaiveTime,
) -> Result<NaiveTime, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(name) {
        Some(raw) => NaiveTime::parse_from_str(raw.trim(), "%H:%M").map_err(|e| {
            ConfigError::Invalid {
                name,
                message: e.to_string(),
            }
        }),
        None => Ok(default),
    }
}
