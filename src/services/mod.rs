pub mod availability;
pub mod booking;
pub mod database;
pub mod store;
pub mod time_slots;
