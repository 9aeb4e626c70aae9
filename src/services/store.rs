use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;
use tracing::info;

use crate::models::appointment::{Appointment, AppointmentFilter, AppointmentStatus, StatusChange};
use crate::models::service::Service;
use crate::models::stylist::Stylist;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Catalog error: {0}")]
    Catalog(#[from] serde_json::Error),

    #[error("Failed to acquire store lock: {0}")]
    Lock(String),
}

impl StoreError {
    pub fn io(path: &str, source: std::io::Error) -> Self {
        StoreError::Io {
            path: path.to_string(),
            source,
        }
    }
}

/// Outcome of an atomic reserve-if-free insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reservation {
    Reserved(Appointment),
    /// The stylist already has these appointments in the requested range.
    Conflict(Vec<Appointment>),
}

/// Outcome of a compare-and-set status update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusUpdate {
    Updated {
        appointment: Appointment,
        change: StatusChange,
    },
    NotFound,
    /// The stored status no longer matches the expected one.
    Stale(AppointmentStatus),
}

/// Data-access contract the scheduling services depend on.
#[cfg_attr(test, mockall::automock)]
pub trait Repository: Send + Sync {
    fn find_appointments(&self, filter: &AppointmentFilter)
        -> Result<Vec<Appointment>, StoreError>;

    fn find_appointment_by_id(&self, id: &str) -> Result<Option<Appointment>, StoreError>;

    fn find_stylist_by_id(&self, id: &str) -> Result<Option<Stylist>, StoreError>;

    fn find_service_by_id(&self, id: &str) -> Result<Option<Service>, StoreError>;

    /// Insert `appointment` unless a slot-blocking appointment of the same
    /// stylist overlaps it (widened by `buffer`). Check and insert are atomic.
    fn reserve_if_free(
        &self,
        appointment: Appointment,
        buffer: Duration,
    ) -> Result<Reservation, StoreError>;

    /// Move an appointment from `expected` to `next` and record the change.
    fn update_appointment_status(
        &self,
        id: &str,
        expected: AppointmentStatus,
        next: AppointmentStatus,
        reason: &str,
        changed_at: DateTime<Utc>,
    ) -> Result<StatusUpdate, StoreError>;

    fn status_history(&self, id: &str) -> Result<Vec<StatusChange>, StoreError>;
}

/// Stylists and services of one tenant, loaded from JSON at startup.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Catalog {
    #[serde(default)]
    pub stylists: Vec<Stylist>,
    #[serde(default)]
    pub services: Vec<Service>,
}

impl Catalog {
    pub fn load(path: &str) -> Result<Self, StoreError> {
        if !Path::new(path).exists() {
            return Err(StoreError::io(
                path,
                std::io::Error::new(std::io::ErrorKind::NotFound, "catalog file not found"),
            ));
        }

        let raw = fs::read_to_string(path).map_err(|e| StoreError::io(path, e))?;
        let catalog: Catalog = serde_json::from_str(&raw)?;

        info!(
            "Loaded catalog from {} with {} stylists and {} services",
            path,
            catalog.stylists.len(),
            catalog.services.len()
        );

        Ok(catalog)
    }

    pub fn stylist(&self, id: &str) -> Option<&Stylist> {
        self.stylists.iter().find(|stylist| stylist.id == id)
    }

    pub fn service(&self, id: &str) -> Option<&Service> {
        self.services.iter().find(|service| service.id == id)
    }
}
