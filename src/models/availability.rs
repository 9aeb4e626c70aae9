use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::models::common::hhmm;
use crate::models::stylist::{DayOfWeek, WorkHours};

// Raw query string of the availability endpoint; validated by the handler
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilityQuery {
    pub stylist_id: Option<String>,
    pub date: Option<String>,
    pub service_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AvailabilityRequest {
    pub stylist_id: String,
    pub date: NaiveDate,
    pub service_id: Option<String>,
}

/// Business-rule reasons for a closed day. These are normal answers, not errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnavailableReason {
    NotAWorkDay,
    TimeOff,
}

impl UnavailableReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            UnavailableReason::NotAWorkDay => "not a work day",
            UnavailableReason::TimeOff => "time off",
        }
    }
}

impl fmt::Display for UnavailableReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for UnavailableReason {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkHoursView {
    #[serde(with = "hhmm")]
    pub start: NaiveTime,
    #[serde(with = "hhmm")]
    pub end: NaiveTime,
    #[serde(with = "hhmm::option")]
    pub break_start: Option<NaiveTime>,
    #[serde(with = "hhmm::option")]
    pub break_end: Option<NaiveTime>,
}

impl From<&WorkHours> for WorkHoursView {
    fn from(hours: &WorkHours) -> Self {
        Self {
            start: hours.start_time,
            end: hours.end_time,
            break_start: hours.break_start,
            break_end: hours.break_end,
        }
    }
}

// Open slots for one stylist on one day
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilityReport {
    pub available: bool,
    pub stylist_id: String,
    pub date: NaiveDate,
    #[serde(serialize_with = "serialize_slots")]
    pub available_slots: Vec<NaiveTime>,
    pub work_hours: WorkHoursView,
    pub service_duration: u32,
    pub total_slots: usize,
    pub day_of_week: DayOfWeek,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnavailableDay {
    pub available: bool,
    pub reason: UnavailableReason,
    pub stylist_id: String,
    pub date: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Availability {
    Open(AvailabilityReport),
    Closed(UnavailableDay),
}

impl Availability {
    pub fn is_available(&self) -> bool {
        match self {
            Availability::Open(report) => report.available,
            Availability::Closed(_) => false,
        }
    }
}

fn serialize_slots<S: serde::Serializer>(
    slots: &[NaiveTime],
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.collect_seq(slots.iter().map(|slot| slot.format(hhmm::FORMAT).to_string()))
}

// Request body for the calendar check endpoint
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarCheckRequest {
    /// RFC 3339 start time.
    pub date: String,
    #[serde(default = "default_check_duration")]
    pub duration: u32,
    pub stylist_id: Option<String>,
}

fn default_check_duration() -> u32 {
    60
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarConflict {
    pub id: String,
    pub stylist_id: String,
    pub start: DateTime<Utc>,
    pub service_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarCheckResponse {
    pub available: bool,
    pub conflicts: Vec<CalendarConflict>,
    pub business_hours: bool,
    pub is_future: bool,
    pub requested_time: String,
    pub duration: u32,
}

// Query string of the calendar slot listing
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarSlotsQuery {
    pub date: Option<String>,
    pub stylist_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BusinessHoursView {
    #[serde(with = "hhmm")]
    pub start: NaiveTime,
    #[serde(with = "hhmm")]
    pub end: NaiveTime,
}

/// Open shop-wide start times for one date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarSlots {
    pub date: String,
    pub available_slots: Vec<DateTime<Utc>>,
    pub business_hours: BusinessHoursView,
}
