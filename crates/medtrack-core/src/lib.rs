//! # Medtrack Core Library
//!
//! This library provides the core logic for tracking medication adherence.
//! It implements a CLI-first philosophy where all operations are available via
//! a standalone CLI binary over the same core library.
//!
//! ## Architecture
//!
//! - **Adherence engine**: pure computations over a patient's schedules and
//!   intake logs: per-day status, consecutive-day streak, trailing adherence
//!   rate and the current month's breakdown
//! - **Calendar**: patient-local calendar days anchored to an IANA time zone
//! - **Storage**: SQLite-based record storage and TOML-based configuration
//!
//! ## Key Components
//!
//! - [`AdherenceEngine`]: composes the calculators and records intakes
//! - [`AdherenceStore`]: the record store boundary
//! - [`Database`]: SQLite implementation of the store, plus profile and
//!   medication management
//! - [`Config`]: Application configuration management

pub mod adherence;
pub mod calendar;
pub mod error;
pub mod medication;
pub mod patient;
pub mod storage;

pub use adherence::{
    AdherenceEngine, AdherenceSummary, DayStatus, DerivedDayStatus, EngineConfig, IntakeRequest,
    LogSnapshot, MonthlyAdherence, PatientSnapshot, ScheduleSnapshot, SnapshotCache,
};
pub use calendar::{CalendarDay, DateRange, PatientZone};
pub use error::{ComputationError, ConfigError, CoreError, StoreError, ValidationError};
pub use medication::{Frequency, IntakeLog, MedicationDraft, MedicationSchedule, TimeOfDay};
pub use patient::{PatientContext, Profile, Role};
pub use storage::{AdherenceStore, Config, Database};
