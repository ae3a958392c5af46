//! The record store boundary the adherence engine reads from and writes to.

use crate::calendar::DateRange;
use crate::error::StoreError;
use crate::medication::{IntakeLog, MedicationSchedule, NewIntakeLog};

/// Persistent storage of schedules and intake logs.
///
/// Implementations must make `insert_log` all-or-nothing: after it returns,
/// successfully or not, the store holds either zero or one new record.
pub trait AdherenceStore {
    /// All schedules owned by `patient_id`.
    fn list_schedules(&self, patient_id: &str) -> Result<Vec<MedicationSchedule>, StoreError>;

    /// Logs of `patient_id` with `taken_at` inside `range`, oldest first.
    fn list_logs(&self, patient_id: &str, range: &DateRange) -> Result<Vec<IntakeLog>, StoreError>;

    /// Look up one schedule regardless of owner.
    fn find_schedule(&self, medication_id: &str) -> Result<Option<MedicationSchedule>, StoreError>;

    /// Persist a log and return it with its assigned id.
    fn insert_log(&self, log: NewIntakeLog) -> Result<IntakeLog, StoreError>;
}
