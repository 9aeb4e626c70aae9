//! Stylist Availability Service
//!
//! Computes open appointment slots for barbershop stylists and books
//! appointments against them.
//!
//! # Modules
//!
//! - `services::time_slots`: candidate slot generation and overlap detection
//! - `services::availability`: assembles a stylist's open slots for one day
//! - `services::booking`: reserve-if-free booking, status transitions, calendar checks
//! - `services::database`: CSV-backed implementation of the `Repository` contract
//! - `handlers` / `routes`: the axum HTTP surface
//!
//! # Configuration
//!
//! Business hours, buffers and the business time zone are gathered in
//! [`config::BookingSettings`] and passed explicitly to every service call.

pub mod config;
pub mod error;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod services;


// Re-export the main API types for ease of use
pub use config::{BookingSettings, Config};
pub use error::{AppError, AppResult};
pub use handlers::api::AppState;
pub use routes::create_router;
pub use services::database::{create_database_service, DatabaseService};
pub use services::store::{Catalog, Repository};
