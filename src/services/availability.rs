use chrono::{DateTime, NaiveDate, Utc};
use tracing::{debug, info, warn};

use crate::config::BookingSettings;
use crate::error::{AppError, AppResult};
use crate::models::appointment::{Appointment, AppointmentFilter, AppointmentStatus};
use crate::models::availability::{
    Availability, AvailabilityQuery, AvailabilityReport, AvailabilityRequest, UnavailableDay,
    UnavailableReason, WorkHoursView,
};
use crate::models::service::ServiceDuration;
use crate::models::stylist::{DayOfWeek, Stylist, WorkSchedule};
use crate::services::store::Repository;
use crate::services::time_slots::{day_bounds, generate_time_windows, has_conflict, localize};

pub const DATE_FORMAT: &str = "%Y-%m-%d";

pub fn parse_date(raw: &str) -> AppResult<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT).map_err(|e| {
        AppError::Validation(format!(
            "Invalid date '{}', expected YYYY-MM-DD: {}",
            raw, e
        ))
    })
}

// Validate the raw availability query
pub fn parse_request(query: AvailabilityQuery) -> AppResult<AvailabilityRequest> {
    let stylist_id = query
        .stylist_id
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty());
    let date = query.date.filter(|date| !date.trim().is_empty());

    let (stylist_id, date) = match (stylist_id, date) {
        (Some(stylist_id), Some(date)) => (stylist_id, date),
        _ => {
            return Err(AppError::Validation(
                "Stylist ID and date are required".to_string(),
            ))
        }
    };

    Ok(AvailabilityRequest {
        stylist_id,
        date: parse_date(&date)?,
        service_id: query
            .service_id
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty()),
    })
}

/// Look up a stylist that can take bookings, together with their schedule.
pub fn load_bookable_stylist(
    repo: &dyn Repository,
    stylist_id: &str,
) -> AppResult<(Stylist, WorkSchedule)> {
    let stylist = repo
        .find_stylist_by_id(stylist_id)?
        .ok_or_else(|| AppError::NotFound(format!("Stylist {} not found", stylist_id)))?;

    if !stylist.is_active {
        warn!("Stylist {} is inactive", stylist_id);
        return Err(AppError::Validation("Stylist is not available".to_string()));
    }

    let schedule = stylist.schedule.clone().ok_or_else(|| {
        AppError::NotFound(format!("No work schedule found for stylist {}", stylist_id))
    })?;

    Ok((stylist, schedule))
}

/// Day-level business rules: the stylist must work that weekday and not be on time off.
pub fn closed_reason(schedule: &WorkSchedule, date: NaiveDate) -> Option<UnavailableReason> {
    if !schedule.works_on(date) {
        return Some(UnavailableReason::NotAWorkDay);
    }

    if schedule.time_off_on(date).is_some() {
        return Some(UnavailableReason::TimeOff);
    }

    None
}

// Resolve how long the requested service occupies the chair
pub fn resolve_service_duration(
    repo: &dyn Repository,
    settings: &BookingSettings,
    service_id: Option<&str>,
) -> AppResult<ServiceDuration> {
    let fallback = ServiceDuration::without_buffer(settings.default_service_duration);
    let Some(service_id) = service_id else {
        return Ok(fallback);
    };

    match repo.find_service_by_id(service_id)? {
        Some(service) => match service.timing() {
            Some(timing) => Ok(timing),
            None => {
                warn!(
                    "Service {} has no duration, using default of {} minutes",
                    service_id, settings.default_service_duration
                );
                Ok(fallback)
            }
        },
        None => {
            warn!(
                "Service {} not found, using default duration of {} minutes",
                service_id, settings.default_service_duration
            );
            Ok(fallback)
        }
    }
}

/// Slot-blocking appointments of a stylist starting on a business-local date.
pub fn appointments_on(
    repo: &dyn Repository,
    settings: &BookingSettings,
    stylist_id: &str,
    date: NaiveDate,
) -> AppResult<Vec<Appointment>> {
    let (starts_from, starts_before) = day_bounds(&settings.timezone, date).ok_or_else(|| {
        AppError::Validation(format!("Date {} cannot be resolved in {}", date, settings.timezone))
    })?;

    let filter = AppointmentFilter {
        stylist_id: Some(stylist_id.to_string()),
        starts_from: Some(starts_from),
        starts_before: Some(starts_before),
        exclude_statuses: vec![AppointmentStatus::Cancelled],
    };

    Ok(repo.find_appointments(&filter)?)
}

/// Compute the open slots of one stylist on one day.
///
/// A closed day (not a work day, time off) short-circuits before any
/// appointment is loaded. Open slots are those produced by the window
/// generator that neither collide with an existing appointment nor start at
/// or before `now`.
pub fn check_availability(
    repo: &dyn Repository,
    settings: &BookingSettings,
    request: &AvailabilityRequest,
    now: DateTime<Utc>,
) -> AppResult<Availability> {
    let (_, schedule) = load_bookable_stylist(repo, &request.stylist_id)?;

    if let Some(reason) = closed_reason(&schedule, request.date) {
        info!(
            "Stylist {} unavailable on {}: {}",
            request.stylist_id, request.date, reason
        );
        return Ok(Availability::Closed(UnavailableDay {
            available: false,
            reason,
            stylist_id: request.stylist_id.clone(),
            date: request.date,
        }));
    }

    let service = resolve_service_duration(repo, settings, request.service_id.as_deref())?;
    let occupied_minutes = service.occupied_minutes();
    let existing = appointments_on(repo, settings, &request.stylist_id, request.date)?;
    let buffer = settings.availability_buffer();

    debug!(
        "Checking {} existing appointments for stylist {} on {}",
        existing.len(),
        request.stylist_id,
        request.date
    );

    let available_slots: Vec<_> = generate_time_windows(
        request.date,
        &schedule.work_hours,
        settings.slot_interval(),
    )
    .into_iter()
    .filter(|local| match localize(&settings.timezone, *local) {
        Some(start) => start > now && !has_conflict(start, occupied_minutes, &existing, buffer),
        None => false,
    })
    .map(|local| local.time())
    .collect();

    info!(
        "Stylist {} has {} open slots on {}",
        request.stylist_id,
        available_slots.len(),
        request.date
    );

    Ok(Availability::Open(AvailabilityReport {
        available: !available_slots.is_empty(),
        stylist_id: request.stylist_id.clone(),
        date: request.date,
        total_slots: available_slots.len(),
        available_slots,
        work_hours: WorkHoursView::from(&schedule.work_hours),
        service_duration: service.minutes,
        day_of_week: DayOfWeek::of(request.date),
    }))
}
