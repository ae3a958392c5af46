//! Core error types for medtrack-core.
//!
//! Errors fall into three families: validation of caller input, failures of
//! the record store, and internal invariant violations in the adherence
//! computations. `CoreError` wraps all of them for callers that don't care
//! which layer failed.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for medtrack-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Malformed or inconsistent input
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Record store errors
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Internal invariant violations
    #[error("Computation error: {0}")]
    Computation(#[from] ComputationError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Validation errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Required field missing or blank
    #[error("'{field}' is required")]
    Required { field: &'static str },

    /// Time of day could not be parsed
    #[error("Invalid time of day '{value}': expected HH:MM")]
    InvalidTimeOfDay { value: String },

    /// Unknown frequency name
    #[error("Unknown frequency '{0}'")]
    UnknownFrequency(String),

    /// Unknown role name
    #[error("Unknown role '{0}'")]
    UnknownRole(String),

    /// Medication id does not exist
    #[error("Medication '{medication_id}' not found")]
    MedicationNotFound { medication_id: String },

    /// Medication exists but belongs to someone else
    #[error("Medication '{medication_id}' does not belong to patient '{patient_id}'")]
    MedicationNotOwned {
        medication_id: String,
        patient_id: String,
    },

    /// Invalid value
    #[error("Invalid value for '{field}': {message}")]
    InvalidValue { field: String, message: String },
}

/// Record store errors.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Failed to open database connection
    #[error("Failed to open database at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Query execution failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Migration failed
    #[error("Database migration failed: {0}")]
    MigrationFailed(String),

    /// Database is locked
    #[error("Database is locked")]
    Locked,

    /// A row could not be decoded into a record
    #[error("Corrupt record in '{table}': {message}")]
    CorruptRecord { table: &'static str, message: String },

    /// Record to update or delete does not exist
    #[error("{entity} '{id}' not found")]
    NotFound { entity: &'static str, id: String },

    /// Store is unreachable
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Internal invariant violations. Seeing one of these means a defect.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ComputationError {
    /// Satisfied dose count exceeded the due count for a day
    #[error("Day {date}: satisfied count {satisfied} exceeds due count {due}")]
    SatisfiedExceedsDue {
        date: String,
        due: u32,
        satisfied: u32,
    },

    /// Monthly buckets do not add up to the month length
    #[error("Month {year}-{month:02}: buckets sum to {sum}, expected {expected}")]
    PartitionMismatch {
        year: i32,
        month: u32,
        sum: u32,
        expected: u32,
    },

    /// Date arithmetic left the supported calendar range
    #[error("Date out of range: {0}")]
    DateOutOfRange(String),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Unknown configuration key
    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),

    /// Data directory could not be resolved or created
    #[error("Failed to access data directory: {0}")]
    DataDir(String),
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(code, _msg) => {
                if code.code == rusqlite::ErrorCode::DatabaseBusy
                    || code.code == rusqlite::ErrorCode::DatabaseLocked
                {
                    StoreError::Locked
                } else {
                    StoreError::QueryFailed(err.to_string())
                }
            }
            _ => StoreError::QueryFailed(err.to_string()),
        }
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
