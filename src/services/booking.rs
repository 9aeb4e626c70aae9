use chrono::{DateTime, Datelike, Duration, Utc};
use rand::Rng;
use tracing::{debug, error, info, warn};

use crate::config::BookingSettings;
use crate::error::{AppError, AppResult};
use crate::models::appointment::{
    Appointment, AppointmentDetails, AppointmentFilter, AppointmentList, AppointmentStatus,
    BookingRequest, StatusChange, StatusChangeRequest,
};
use crate::models::availability::{
    BusinessHoursView, CalendarCheckRequest, CalendarCheckResponse, CalendarConflict,
    CalendarSlots, CalendarSlotsQuery,
};
use crate::models::common::PaginationParams;
use crate::models::stylist::{DayOfWeek, WorkHours};
use crate::services::availability::{
    closed_reason, load_bookable_stylist, parse_date, resolve_service_duration,
};
use crate::services::store::{Repository, Reservation, StatusUpdate};
use crate::services::time_slots::{
    conflicting_appointments, day_bounds, generate_time_windows, localize, TimeRange,
};

pub const MIN_DURATION_MINUTES: u32 = 15;
pub const MAX_DURATION_MINUTES: u32 = 240;
pub const DURATION_STEP_MINUTES: u32 = 15;

const DEFAULT_STATUS_REASON: &str = "No reason provided";
const BOOKING_CODE_CHARS: &[u8] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";

fn parse_timestamp(raw: &str, field: &str) -> AppResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw.trim())
        .map(|time| time.with_timezone(&Utc))
        .map_err(|e| AppError::Validation(format!("Invalid {} '{}': {}", field, raw, e)))
}

pub fn validate_duration(minutes: u32) -> AppResult<()> {
    if !(MIN_DURATION_MINUTES..=MAX_DURATION_MINUTES).contains(&minutes) {
        return Err(AppError::Validation(format!(
            "Duration must be between {} and {} minutes",
            MIN_DURATION_MINUTES, MAX_DURATION_MINUTES
        )));
    }

    if minutes % DURATION_STEP_MINUTES != 0 {
        return Err(AppError::Validation(format!(
            "Duration must be in {}-minute increments",
            DURATION_STEP_MINUTES
        )));
    }

    Ok(())
}

// Booking numbers look like APT-1711962000000-K3ZQ
pub fn generate_booking_number(now: DateTime<Utc>) -> String {
    let mut rng = rand::thread_rng();
    let code: String = (0..4)
        .map(|_| BOOKING_CODE_CHARS[rng.gen_range(0..BOOKING_CODE_CHARS.len())] as char)
        .collect();

    format!("APT-{}-{}", now.timestamp_millis(), code)
}

fn generate_appointment_id(now: DateTime<Utc>) -> String {
    format!("{:x}{:08x}", now.timestamp_millis(), rand::thread_rng().gen::<u32>())
}

/// Book an appointment if the stylist can take it at the requested time.
///
/// The final overlap check happens inside the store together with the
/// insert, so two concurrent requests for the same slot cannot both win.
pub fn book_appointment(
    repo: &dyn Repository,
    settings: &BookingSettings,
    request: &BookingRequest,
    now: DateTime<Utc>,
) -> AppResult<Appointment> {
    let stylist_id = request.stylist_id.trim();
    if stylist_id.is_empty() {
        return Err(AppError::Validation("Stylist ID is required".to_string()));
    }

    let start = parse_timestamp(&request.start, "start time")?;

    let duration_minutes = match request.duration_minutes {
        Some(minutes) => {
            validate_duration(minutes)?;
            minutes
        }
        None => resolve_service_duration(repo, settings, request.service_id.as_deref())?
            .occupied_minutes(),
    };

    if start <= now {
        return Err(AppError::Validation(
            "Appointment time must be in the future".to_string(),
        ));
    }

    let (_, schedule) = load_bookable_stylist(repo, stylist_id)?;

    let local = start.with_timezone(&settings.timezone);
    let date = local.date_naive();
    if let Some(reason) = closed_reason(&schedule, date) {
        info!(
            "Rejecting booking for stylist {} on {}: {}",
            stylist_id, date, reason
        );
        return Err(AppError::Conflict(format!(
            "Stylist is unavailable on {}: {}",
            date, reason
        )));
    }

    let time = local.time();
    if !schedule.work_hours.contains(time) || schedule.work_hours.in_break(time) {
        return Err(AppError::Conflict(format!(
            "Requested time {} is outside the stylist's working hours",
            time.format("%H:%M")
        )));
    }

    let appointment = Appointment {
        id: generate_appointment_id(now),
        booking_number: generate_booking_number(now),
        stylist_id: stylist_id.to_string(),
        service_id: request.service_id.clone(),
        // Blank names are stored as absent
        customer_name: request
            .customer_name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string),
        start,
        duration_minutes,
        status: AppointmentStatus::Pending,
        created_at: now,
        updated_at: now,
    };

    match repo.reserve_if_free(appointment, settings.booking_buffer())? {
        Reservation::Reserved(appointment) => {
            info!(
                "Booked appointment {} ({}) for stylist {} at {}",
                appointment.booking_number, appointment.id, appointment.stylist_id, appointment.start
            );
            Ok(appointment)
        }
        Reservation::Conflict(existing) => {
            warn!(
                "Booking for stylist {} at {} overlaps {} existing appointments",
                stylist_id,
                start,
                existing.len()
            );
            Err(AppError::Conflict(
                "This time slot is already booked for the selected stylist".to_string(),
            ))
        }
    }
}

// Apply a status transition and record it in the history
pub fn change_status(
    repo: &dyn Repository,
    appointment_id: &str,
    request: &StatusChangeRequest,
    now: DateTime<Utc>,
) -> AppResult<(Appointment, StatusChange)> {
    let current = repo
        .find_appointment_by_id(appointment_id)?
        .ok_or_else(|| AppError::NotFound(format!("Appointment {} not found", appointment_id)))?;

    if !current.status.can_transition_to(request.status) {
        return Err(AppError::Conflict(format!(
            "Cannot change appointment status from {} to {}",
            current.status, request.status
        )));
    }

    let reason = request
        .reason
        .as_deref()
        .map(str::trim)
        .filter(|reason| !reason.is_empty())
        .unwrap_or(DEFAULT_STATUS_REASON);

    match repo.update_appointment_status(appointment_id, current.status, request.status, reason, now)? {
        StatusUpdate::Updated {
            appointment,
            change,
        } => {
            info!(
                "Appointment {} moved from {} to {}",
                appointment_id, change.previous_status, change.status
            );
            Ok((appointment, change))
        }
        StatusUpdate::NotFound => Err(AppError::NotFound(format!(
            "Appointment {} not found",
            appointment_id
        ))),
        StatusUpdate::Stale(actual) => {
            error!(
                "Appointment {} changed to {} while updating from {}",
                appointment_id, actual, current.status
            );
            Err(AppError::Conflict(format!(
                "Appointment status changed concurrently to {}",
                actual
            )))
        }
    }
}

pub fn appointment_details(
    repo: &dyn Repository,
    appointment_id: &str,
) -> AppResult<AppointmentDetails> {
    let appointment = repo
        .find_appointment_by_id(appointment_id)?
        .ok_or_else(|| AppError::NotFound(format!("Appointment {} not found", appointment_id)))?;
    let status_history = repo.status_history(appointment_id)?;

    Ok(AppointmentDetails {
        end: appointment.end(),
        appointment,
        status_history,
    })
}

// List every appointment of a stylist on a date, cancelled ones included
pub fn list_stylist_appointments(
    repo: &dyn Repository,
    settings: &BookingSettings,
    stylist_id: &str,
    date: &str,
    pagination: &PaginationParams,
) -> AppResult<AppointmentList> {
    if repo.find_stylist_by_id(stylist_id)?.is_none() {
        return Err(AppError::NotFound(format!("Stylist {} not found", stylist_id)));
    }

    let date = parse_date(date)?;
    let (starts_from, starts_before) = day_bounds(&settings.timezone, date).ok_or_else(|| {
        AppError::Validation(format!("Date {} cannot be resolved in {}", date, settings.timezone))
    })?;

    let mut appointments = repo.find_appointments(&AppointmentFilter {
        stylist_id: Some(stylist_id.to_string()),
        starts_from: Some(starts_from),
        starts_before: Some(starts_before),
        exclude_statuses: Vec::new(),
    })?;
    appointments.sort_by_key(|appointment| appointment.start);

    Ok(AppointmentList {
        stylist_id: stylist_id.to_string(),
        date: date.format("%Y-%m-%d").to_string(),
        total_count: appointments.len(),
        page: pagination.page(),
        page_size: pagination.page_size(),
        appointments: pagination.apply(&appointments),
    })
}

/// Quick check of a single start time against business hours and the
/// calendar, optionally for one stylist only.
pub fn calendar_check(
    repo: &dyn Repository,
    settings: &BookingSettings,
    request: &CalendarCheckRequest,
    now: DateTime<Utc>,
) -> AppResult<CalendarCheckResponse> {
    let start = parse_timestamp(&request.date, "date")?;
    if request.duration == 0 {
        return Err(AppError::Validation(
            "Duration must be greater than zero".to_string(),
        ));
    }

    let local = start.with_timezone(&settings.timezone);
    let hours = &settings.business_hours;
    let business_hours = hours.days.contains(&DayOfWeek::from(local.weekday()))
        && local.time() >= hours.open
        && local.time() < hours.close;
    let is_future = start > now;

    let candidate = TimeRange::starting_at(start, request.duration);
    let buffer = settings.calendar_check_buffer();

    // Anything starting up to a day earlier could still run into the candidate
    let nearby = repo.find_appointments(&AppointmentFilter {
        stylist_id: request.stylist_id.clone(),
        starts_from: Some(candidate.start - buffer - Duration::days(1)),
        starts_before: Some(candidate.end + buffer),
        exclude_statuses: vec![AppointmentStatus::Cancelled],
    })?;

    let conflicts: Vec<CalendarConflict> = conflicting_appointments(&candidate, &nearby, buffer)
        .into_iter()
        .map(|appointment| CalendarConflict {
            id: appointment.id.clone(),
            stylist_id: appointment.stylist_id.clone(),
            start: appointment.start,
            service_id: appointment.service_id.clone(),
        })
        .collect();

    debug!(
        "Calendar check at {}: business hours={}, future={}, conflicts={}",
        start,
        business_hours,
        is_future,
        conflicts.len()
    );

    Ok(CalendarCheckResponse {
        available: business_hours && is_future && conflicts.is_empty(),
        conflicts,
        business_hours,
        is_future,
        requested_time: request.date.clone(),
        duration: request.duration,
    })
}

/// Open start times across the shop (or one stylist) on a date.
///
/// Candidates step through business hours at the slot interval. A candidate
/// stays open when it is in the future and no live appointment starts within
/// the default service duration of it. Closed business days have no slots.
pub fn calendar_slots(
    repo: &dyn Repository,
    settings: &BookingSettings,
    query: &CalendarSlotsQuery,
    now: DateTime<Utc>,
) -> AppResult<CalendarSlots> {
    let raw_date = query
        .date
        .as_deref()
        .map(str::trim)
        .filter(|date| !date.is_empty())
        .ok_or_else(|| AppError::Validation("Date parameter is required".to_string()))?;
    let date = parse_date(raw_date)?;

    let hours = &settings.business_hours;
    let business_day = hours.days.contains(&DayOfWeek::of(date));
    let window = WorkHours {
        start_time: hours.open,
        end_time: hours.close,
        break_start: None,
        break_end: None,
    };

    let candidates: Vec<DateTime<Utc>> = if business_day {
        generate_time_windows(date, &window, settings.slot_interval())
            .into_iter()
            .filter_map(|local| localize(&settings.timezone, local))
            .collect()
    } else {
        Vec::new()
    };

    let spacing = Duration::minutes(i64::from(settings.default_service_duration));
    let existing = match (candidates.first(), candidates.last()) {
        (Some(first), Some(last)) => repo.find_appointments(&AppointmentFilter {
            stylist_id: query.stylist_id.clone(),
            starts_from: Some(*first - spacing),
            starts_before: Some(*last + spacing),
            exclude_statuses: vec![AppointmentStatus::Cancelled],
        })?,
        _ => Vec::new(),
    };

    let available_slots: Vec<DateTime<Utc>> = candidates
        .into_iter()
        .filter(|slot| {
            *slot > now
                && existing.iter().all(|appointment| {
                    let gap = if appointment.start > *slot {
                        appointment.start - *slot
                    } else {
                        *slot - appointment.start
                    };
                    gap >= spacing
                })
        })
        .collect();

    debug!(
        "Calendar slots on {}: {} open, {} appointments nearby",
        date,
        available_slots.len(),
        existing.len()
    );

    Ok(CalendarSlots {
        date: date.format("%Y-%m-%d").to_string(),
        available_slots,
        business_hours: BusinessHoursView {
            start: hours.open,
            end: hours.close,
        },
    })
}
