use axum::{
    extract::{Json as ExtractJson, Path, Query, State},
    http::StatusCode,
    response::Json,
};
use chrono::Utc;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{error, info};

use crate::config::BookingSettings;
use crate::error::{AppError, AppResult};
use crate::models::appointment::{
    Appointment, AppointmentDetails, AppointmentList, BookingRequest, StatusChangeRequest,
};
use crate::models::availability::{
    Availability, AvailabilityQuery, CalendarCheckRequest, CalendarCheckResponse, CalendarSlots,
    CalendarSlotsQuery,
};
use crate::models::common::{default_page, default_page_size, PaginationParams};
use crate::services::availability::{check_availability, parse_request};
use crate::services::booking::{
    appointment_details, book_appointment, calendar_check, calendar_slots, change_status,
    list_stylist_appointments,
};
use crate::services::store::Repository;

// AppState struct containing shared resources
pub struct AppState {
    pub store: Arc<dyn Repository>,
    pub settings: BookingSettings,
}

// Query parameters are not flattened: urlencoded numbers would not parse
#[derive(Debug, Deserialize)]
pub struct StylistAppointmentsQuery {
    pub date: Option<String>,
    #[serde(default = "default_page")]
    pub page: usize,
    #[serde(default = "default_page_size")]
    pub page_size: usize,
}

// Stylist availability endpoint
pub async fn stylist_availability(
    State(state): State<Arc<AppState>>,
    Query(query): Query<AvailabilityQuery>,
) -> AppResult<Json<Availability>> {
    info!(
        "Received availability request for stylist={:?} date={:?} service={:?}",
        query.stylist_id, query.date, query.service_id
    );

    let request = parse_request(query)?;

    match check_availability(state.store.as_ref(), &state.settings, &request, Utc::now()) {
        Ok(availability) => Ok(Json(availability)),
        Err(err) => {
            error!(
                "Failed to check availability for stylist {}: {}",
                request.stylist_id, err
            );
            Err(err)
        }
    }
}

// Book appointment endpoint
pub async fn create_appointment(
    State(state): State<Arc<AppState>>,
    ExtractJson(request): ExtractJson<BookingRequest>,
) -> AppResult<(StatusCode, Json<Appointment>)> {
    info!(
        "Received booking request for stylist {} at {}",
        request.stylist_id, request.start
    );

    let appointment = book_appointment(state.store.as_ref(), &state.settings, &request, Utc::now())?;

    Ok((StatusCode::CREATED, Json(appointment)))
}

// Appointment lookup endpoint
pub async fn get_appointment(
    State(state): State<Arc<AppState>>,
    Path(appointment_id): Path<String>,
) -> AppResult<Json<AppointmentDetails>> {
    info!("Received request for appointment {}", appointment_id);

    Ok(Json(appointment_details(state.store.as_ref(), &appointment_id)?))
}

// Status transition endpoint
pub async fn update_appointment_status(
    State(state): State<Arc<AppState>>,
    Path(appointment_id): Path<String>,
    ExtractJson(request): ExtractJson<StatusChangeRequest>,
) -> AppResult<Json<AppointmentDetails>> {
    info!(
        "Received request to change appointment {} to {}",
        appointment_id, request.status
    );

    change_status(state.store.as_ref(), &appointment_id, &request, Utc::now())?;

    Ok(Json(appointment_details(state.store.as_ref(), &appointment_id)?))
}

// Stylist day listing endpoint
pub async fn list_appointments(
    State(state): State<Arc<AppState>>,
    Path(stylist_id): Path<String>,
    Query(query): Query<StylistAppointmentsQuery>,
) -> AppResult<Json<AppointmentList>> {
    let pagination = PaginationParams {
        page: query.page,
        page_size: query.page_size,
    };
    let date = query
        .date
        .ok_or_else(|| AppError::Validation("Date is required".to_string()))?;

    info!(
        "Listing appointments for stylist {} on {} with page={}, page_size={}",
        stylist_id, date, pagination.page, pagination.page_size
    );

    Ok(Json(list_stylist_appointments(
        state.store.as_ref(),
        &state.settings,
        &stylist_id,
        &date,
        &pagination,
    )?))
}

// Calendar check endpoint
pub async fn check_calendar(
    State(state): State<Arc<AppState>>,
    ExtractJson(request): ExtractJson<CalendarCheckRequest>,
) -> AppResult<Json<CalendarCheckResponse>> {
    info!(
        "Received calendar check for {} ({} mins)",
        request.date, request.duration
    );

    Ok(Json(calendar_check(
        state.store.as_ref(),
        &state.settings,
        &request,
        Utc::now(),
    )?))
}

// Open calendar slots endpoint
pub async fn list_calendar_slots(
    State(state): State<Arc<AppState>>,
    Query(query): Query<CalendarSlotsQuery>,
) -> AppResult<Json<CalendarSlots>> {
    info!("Received calendar slot listing for {:?}", query.date);

    Ok(Json(calendar_slots(
        state.store.as_ref(),
        &state.settings,
        &query,
        Utc::now(),
    )?))
}
