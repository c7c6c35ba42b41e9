//! Rental Ops: backup/restore, CSV exchange, and customer messaging for a
//! vehicle-rental back office.

pub mod backup;
pub mod comms;
pub mod config;
pub mod error;
pub mod storage;
