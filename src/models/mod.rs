pub mod appointment;
pub mod availability;
pub mod common;
pub mod service;
pub mod stylist;
