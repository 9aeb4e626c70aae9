use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use tracing::debug;

use crate::models::appointment::Appointment;
use crate::models::stylist::WorkHours;

/// Half-open time range `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeRange {
    pub fn starting_at(start: DateTime<Utc>, duration_minutes: u32) -> Self {
        Self {
            start,
            end: start + Duration::minutes(i64::from(duration_minutes)),
        }
    }

    pub fn of(appointment: &Appointment) -> Self {
        Self::starting_at(appointment.start, appointment.duration_minutes)
    }

    /// `other` is widened by `buffer` on both sides before comparing, so
    /// back-to-back ranges only collide when the buffer is non-zero.
    pub fn overlaps(&self, other: &TimeRange, buffer: Duration) -> bool {
        self.start < other.end + buffer && other.start - buffer < self.end
    }
}

// Generate candidate slot start times for one day of a work window
pub fn generate_time_windows(
    date: NaiveDate,
    hours: &WorkHours,
    interval: Duration,
) -> Vec<NaiveDateTime> {
    if hours.end_time <= hours.start_time || interval <= Duration::zero() {
        debug!(
            "Empty work window {}-{} on {}",
            hours.start_time, hours.end_time, date
        );
        return Vec::new();
    }

    let end = date.and_time(hours.end_time);
    let mut current = date.and_time(hours.start_time);
    let mut windows = Vec::new();

    while current < end {
        if !hours.in_break(current.time()) {
            windows.push(current);
        }
        current += interval;
    }

    debug!(
        "Generated {} candidate windows for {} between {} and {}",
        windows.len(),
        date,
        hours.start_time,
        hours.end_time
    );

    windows
}

/// Resolve a business-local wall-clock time to UTC. Times that do not exist
/// (DST gaps) yield `None`; ambiguous ones resolve to the earlier instant.
pub fn localize(timezone: &Tz, local: NaiveDateTime) -> Option<DateTime<Utc>> {
    timezone
        .from_local_datetime(&local)
        .earliest()
        .map(|time| time.with_timezone(&Utc))
}

/// UTC bounds `[start of day, start of next day)` for a business-local date.
pub fn day_bounds(timezone: &Tz, date: NaiveDate) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
    let next = date.succ_opt()?;
    let start = localize(timezone, date.and_hms_opt(0, 0, 0)?)?;
    let end = localize(timezone, next.and_hms_opt(0, 0, 0)?)?;
    Some((start, end))
}

// Collect the appointments a candidate range collides with
pub fn conflicting_appointments<'a>(
    candidate: &TimeRange,
    existing: &'a [Appointment],
    buffer: Duration,
) -> Vec<&'a Appointment> {
    existing
        .iter()
        .filter(|appointment| candidate.overlaps(&TimeRange::of(appointment), buffer))
        .collect()
}

// Check whether a candidate slot overlaps any existing appointment
pub fn has_conflict(
    start: DateTime<Utc>,
    duration_minutes: u32,
    existing: &[Appointment],
    buffer: Duration,
) -> bool {
    let candidate = TimeRange::starting_at(start, duration_minutes);

    existing.iter().any(|appointment| {
        let conflict = candidate.overlaps(&TimeRange::of(appointment), buffer);
        if conflict {
            debug!(
                "Slot {} ({} mins) conflicts with appointment {} at {}",
                start, duration_minutes, appointment.id, appointment.start
            );
        }
        conflict
    })
}
