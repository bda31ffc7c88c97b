//! Record identifiers and sharded-path utilities.
//!
//! Every stored record (doctor, patient, appointment, prescription, user) is keyed by a
//! [`RecordId`]: a v4 UUID in *canonical* form, **32 lowercase hexadecimal characters** with no
//! hyphens. The same value names the record on disk and in API paths.
//!
//! ## Sharded directory layout
//! For a canonical id `u`, a record lives under:
//! `collection_dir/<u[0..2]>/<u[2..4]>/<u>/`
//!
//! Example:
//! `hospital_data/patients/55/0e/550e8400e29b41d4a716446655440000/record.json`
//!
//! This keeps the fan-out of any single directory small.

mod service;

pub use service::{RecordId, Uuid};

/// Error type for identifier operations.
#[derive(Debug, thiserror::Error)]
pub enum UuidError {
    /// Invalid input provided
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Result type for identifier operations.
pub type UuidResult<T> = Result<T, UuidError>;
