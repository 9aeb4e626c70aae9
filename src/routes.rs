use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use crate::handlers::api::{
    check_calendar, create_appointment, get_appointment, list_appointments, list_calendar_slots,
    stylist_availability, update_appointment_status, AppState,
};
use crate::handlers::health::health_check;

pub fn create_router(app_state: Arc<AppState>) -> Router {
    // Health check is always available
    let health_route = Router::new().route("/health", get(health_check));

    let availability_routes = Router::new()
        .route("/stylists/availability", get(stylist_availability))
        .route("/stylists/:stylist_id/appointments", get(list_appointments))
        .route(
            "/calendar/check",
            get(list_calendar_slots).post(check_calendar),
        );

    let booking_routes = Router::new()
        .route("/appointments", post(create_appointment))
        .route("/appointments/:appointment_id", get(get_appointment))
        .route(
            "/appointments/:appointment_id/status",
            post(update_appointment_status),
        );

    Router::new()
        .merge(health_route)
        .merge(availability_routes)
        .merge(booking_routes)
        .with_state(app_state)
}
