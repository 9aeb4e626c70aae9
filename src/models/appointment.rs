use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AppointmentStatus {
    Pending,
    Confirmed,
    Completed,
    Cancelled,
    NoShow,
}

impl AppointmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentStatus::Pending => "pending",
            AppointmentStatus::Confirmed => "confirmed",
            AppointmentStatus::Completed => "completed",
            AppointmentStatus::Cancelled => "cancelled",
            AppointmentStatus::NoShow => "no-show",
        }
    }

    /// Every status except `cancelled` keeps the chair occupied.
    pub fn blocks_slot(&self) -> bool {
        !matches!(self, AppointmentStatus::Cancelled)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            AppointmentStatus::Completed | AppointmentStatus::Cancelled | AppointmentStatus::NoShow
        )
    }

    pub fn can_transition_to(&self, next: AppointmentStatus) -> bool {
        use AppointmentStatus::*;

        matches!(
            (self, next),
            (Pending, Confirmed)
                | (Pending, Cancelled)
                | (Pending, NoShow)
                | (Confirmed, Completed)
                | (Confirmed, Cancelled)
                | (Confirmed, NoShow)
        )
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// Stored appointment, one CSV row per appointment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Appointment {
    pub id: String,
    pub booking_number: String,
    pub stylist_id: String,
    pub service_id: Option<String>,
    pub customer_name: Option<String>,
    pub start: DateTime<Utc>,
    pub duration_minutes: u32,
    pub status: AppointmentStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Appointment {
    pub fn end(&self) -> DateTime<Utc> {
        self.start + Duration::minutes(i64::from(self.duration_minutes))
    }
}

/// Query used by the data-access layer. Unset fields do not filter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppointmentFilter {
    pub stylist_id: Option<String>,
    /// Inclusive lower bound on the start time.
    pub starts_from: Option<DateTime<Utc>>,
    /// Exclusive upper bound on the start time.
    pub starts_before: Option<DateTime<Utc>>,
    pub exclude_statuses: Vec<AppointmentStatus>,
}

impl AppointmentFilter {
    pub fn matches(&self, appointment: &Appointment) -> bool {
        self.stylist_id
            .as_ref()
            .map_or(true, |id| *id == appointment.stylist_id)
            && self.starts_from.map_or(true, |from| appointment.start >= from)
            && self
                .starts_before
                .map_or(true, |before| appointment.start < before)
            && !self.exclude_statuses.contains(&appointment.status)
    }
}

// Request body for booking an appointment
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingRequest {
    pub stylist_id: String,
    pub service_id: Option<String>,
    pub customer_name: Option<String>,
    /// RFC 3339 start time.
    pub start: String,
    pub duration_minutes: Option<u32>,
}

// Request body for a status transition
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusChangeRequest {
    pub status: AppointmentStatus,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusChange {
    pub appointment_id: String,
    pub previous_status: AppointmentStatus,
    pub status: AppointmentStatus,
    pub changed_at: DateTime<Utc>,
    pub reason: String,
}

// Response structure for appointment lookups
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentDetails {
    #[serde(flatten)]
    pub appointment: Appointment,
    pub end: DateTime<Utc>,
    pub status_history: Vec<StatusChange>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentList {
    pub stylist_id: String,
    pub date: String,
    pub total_count: usize,
    pub page: usize,
    pub page_size: usize,
    pub appointments: Vec<Appointment>,
}
