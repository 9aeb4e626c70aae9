use chrono::{DateTime, Duration, Utc};
use csv::{ReaderBuilder, WriterBuilder};
use serde::{de::DeserializeOwned, Serialize};
use std::fs::{self, File, OpenOptions};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::models::appointment::{Appointment, AppointmentFilter, AppointmentStatus, StatusChange};
use crate::models::service::Service;
use crate::models::stylist::Stylist;
use crate::services::store::{Catalog, Repository, Reservation, StatusUpdate, StoreError};
use crate::services::time_slots::{conflicting_appointments, TimeRange};

const APPOINTMENT_HEADERS: [&str; 10] = [
    "id",
    "bookingNumber",
    "stylistId",
    "serviceId",
    "customerName",
    "start",
    "durationMinutes",
    "status",
    "createdAt",
    "updatedAt",
];

const HISTORY_HEADERS: [&str; 5] = [
    "appointmentId",
    "previousStatus",
    "status",
    "changedAt",
    "reason",
];

// CSV-backed appointment store with an in-memory stylist/service catalog
pub struct DatabaseService {
    appointments_path: String,
    history_path: String,
    catalog: Catalog,
    file_mutex: Mutex<()>,
}

impl DatabaseService {
    pub fn new(
        appointments_path: &str,
        history_path: &str,
        catalog: Catalog,
    ) -> Result<Self, StoreError> {
        create_csv_if_missing(appointments_path, &APPOINTMENT_HEADERS)?;
        create_csv_if_missing(history_path, &HISTORY_HEADERS)?;

        Ok(Self {
            appointments_path: appointments_path.to_string(),
            history_path: history_path.to_string(),
            catalog,
            file_mutex: Mutex::new(()),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, ()>, StoreError> {
        self.file_mutex
            .lock()
            .map_err(|e| StoreError::Lock(e.to_string()))
    }

    // Caller must hold the file lock
    fn load_appointments(&self) -> Result<Vec<Appointment>, StoreError> {
        read_records(&self.appointments_path)
    }

    // Replace the appointments file through a temporary file; caller holds the lock
    fn rewrite_appointments(&self, appointments: &[Appointment]) -> Result<(), StoreError> {
        let tmp_path = format!("{}.tmp", self.appointments_path);
        let file = File::create(&tmp_path).map_err(|e| StoreError::io(&tmp_path, e))?;

        let mut writer = WriterBuilder::new().has_headers(false).from_writer(file);
        writer.write_record(APPOINTMENT_HEADERS)?;
        for appointment in appointments {
            writer.serialize(appointment)?;
        }
        writer.flush().map_err(|e| StoreError::io(&tmp_path, e))?;
        drop(writer);

        fs::rename(&tmp_path, &self.appointments_path)
            .map_err(|e| StoreError::io(&self.appointments_path, e))?;

        debug!(
            "Rewrote {} appointments to {}",
            appointments.len(),
            self.appointments_path
        );

        Ok(())
    }
}

impl Repository for DatabaseService {
    fn find_appointments(
        &self,
        filter: &AppointmentFilter,
    ) -> Result<Vec<Appointment>, StoreError> {
        let _lock = self.lock()?;

        let appointments: Vec<Appointment> = self
            .load_appointments()?
            .into_iter()
            .filter(|appointment| filter.matches(appointment))
            .collect();

        debug!("Found {} appointments matching {:?}", appointments.len(), filter);

        Ok(appointments)
    }

    fn find_appointment_by_id(&self, id: &str) -> Result<Option<Appointment>, StoreError> {
        let _lock = self.lock()?;

        Ok(self
            .load_appointments()?
            .into_iter()
            .find(|appointment| appointment.id == id))
    }

    fn find_stylist_by_id(&self, id: &str) -> Result<Option<Stylist>, StoreError> {
        Ok(self.catalog.stylist(id).cloned())
    }

    fn find_service_by_id(&self, id: &str) -> Result<Option<Service>, StoreError> {
        Ok(self.catalog.service(id).cloned())
    }

    fn reserve_if_free(
        &self,
        appointment: Appointment,
        buffer: Duration,
    ) -> Result<Reservation, StoreError> {
        let _lock = self.lock()?;

        let booked: Vec<Appointment> = self
            .load_appointments()?
            .into_iter()
            .filter(|existing| {
                existing.stylist_id == appointment.stylist_id && existing.status.blocks_slot()
            })
            .collect();

        let candidate = TimeRange::of(&appointment);
        let conflicts: Vec<Appointment> = conflicting_appointments(&candidate, &booked, buffer)
            .into_iter()
            .cloned()
            .collect();

        if !conflicts.is_empty() {
            warn!(
                "Slot {} for stylist {} is taken by {} appointments",
                appointment.start,
                appointment.stylist_id,
                conflicts.len()
            );
            return Ok(Reservation::Conflict(conflicts));
        }

        append_record(&self.appointments_path, &appointment)?;

        info!(
            "Stored appointment {} for stylist {} at {}",
            appointment.id, appointment.stylist_id, appointment.start
        );

        Ok(Reservation::Reserved(appointment))
    }

    fn update_appointment_status(
        &self,
        id: &str,
        expected: AppointmentStatus,
        next: AppointmentStatus,
        reason: &str,
        changed_at: DateTime<Utc>,
    ) -> Result<StatusUpdate, StoreError> {
        let _lock = self.lock()?;

        let mut appointments = self.load_appointments()?;
        let Some(appointment) = appointments.iter_mut().find(|appointment| appointment.id == id)
        else {
            warn!("No appointment found with id {}", id);
            return Ok(StatusUpdate::NotFound);
        };

        if appointment.status != expected {
            return Ok(StatusUpdate::Stale(appointment.status));
        }

        appointment.status = next;
        appointment.updated_at = changed_at;
        let updated = appointment.clone();

        let change = StatusChange {
            appointment_id: id.to_string(),
            previous_status: expected,
            status: next,
            changed_at,
            reason: reason.to_string(),
        };

        // History first; rolled back if the rewrite fails
        let history_len = file_len(&self.history_path)?;
        append_record(&self.history_path, &change)?;
        if let Err(e) = self.rewrite_appointments(&appointments) {
            warn!(
                "Failed to store status of appointment {}, dropping its history row",
                id
            );
            truncate_file(&self.history_path, history_len)?;
            return Err(e);
        }

        info!(
            "Updated appointment {} status from {} to {}",
            id, expected, next
        );

        Ok(StatusUpdate::Updated {
            appointment: updated,
            change,
        })
    }

    fn status_history(&self, id: &str) -> Result<Vec<StatusChange>, StoreError> {
        let _lock = self.lock()?;

        Ok(read_records::<StatusChange>(&self.history_path)?
            .into_iter()
            .filter(|change| change.appointment_id == id)
            .collect())
    }
}

fn create_csv_if_missing(path: &str, headers: &[&str]) -> Result<(), StoreError> {
    if Path::new(path).exists() {
        return Ok(());
    }

    info!("Creating new database file at {}", path);

    let file = File::create(path).map_err(|e| StoreError::io(path, e))?;
    let mut writer = WriterBuilder::new().has_headers(true).from_writer(file);
    writer.write_record(headers)?;
    writer.flush().map_err(|e| StoreError::io(path, e))?;

    Ok(())
}

fn read_records<T: DeserializeOwned>(path: &str) -> Result<Vec<T>, StoreError> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(StoreError::io(path, e)),
    };

    let mut reader = ReaderBuilder::new().has_headers(true).from_reader(file);
    let mut records = Vec::new();
    for result in reader.deserialize() {
        records.push(result?);
    }

    Ok(records)
}

fn append_record<T: Serialize>(path: &str, record: &T) -> Result<(), StoreError> {
    let file = OpenOptions::new()
        .append(true)
        .open(path)
        .map_err(|e| StoreError::io(path, e))?;

    let mut writer = WriterBuilder::new().has_headers(false).from_writer(file);
    writer.serialize(record)?;
    writer.flush().map_err(|e| StoreError::io(path, e))?;

    Ok(())
}

fn file_len(path: &str) -> Result<u64, StoreError> {
    fs::metadata(path)
        .map(|metadata| metadata.len())
        .map_err(|e| StoreError::io(path, e))
}

fn truncate_file(path: &str, len: u64) -> Result<(), StoreError> {
    OpenOptions::new()
        .write(true)
        .open(path)
        .and_then(|file| file.set_len(len))
        .map_err(|e| StoreError::io(path, e))
}

// Create the database service described by the configuration
pub fn create_database_service(config: &Config) -> Result<Arc<DatabaseService>, StoreError> {
    for path in [&config.appointments_path, &config.history_path] {
        if let Some(dir) = Path::new(path).parent().filter(|dir| !dir.as_os_str().is_empty()) {
            fs::create_dir_all(dir).map_err(|e| StoreError::io(path, e))?;
        }
    }

    let catalog = Catalog::load(&config.catalog_path)?;

    Ok(Arc::new(DatabaseService::new(
        &config.appointments_path,
        &config.history_path,
        catalog,
    )?))
}
