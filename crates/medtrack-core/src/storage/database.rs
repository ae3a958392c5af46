//! SQLite-based storage for profiles, medication schedules and intake logs.
//!
//! Provides persistent storage for:
//! - Patient and caretaker profiles
//! - Medication schedules (create, update, delete)
//! - Intake logs, through the [`AdherenceStore`] boundary

use std::path::Path;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use super::migrations;
use super::store::AdherenceStore;
use crate::calendar::DateRange;
use crate::error::{CoreError, StoreError};
use crate::medication::{Frequency, IntakeLog, MedicationDraft, MedicationSchedule, NewIntakeLog};
use crate::patient::{Profile, Role};

const SCHEDULE_COLUMNS: &str =
    "id, patient_id, name, dosage, frequency, time_of_day, created_by, created_at";

/// Timestamps are stored as fixed-width UTC RFC3339 so they sort as text.
fn format_instant(instant: DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn parse_instant(table: &'static str, raw: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StoreError::CorruptRecord {
            table,
            message: format!("bad timestamp '{raw}': {e}"),
        })
}

/// Columns of a medications row before decoding.
struct ScheduleRow {
    id: String,
    patient_id: String,
    name: String,
    dosage: String,
    frequency: String,
    time_of_day: String,
    created_by: String,
    created_at: String,
}

impl ScheduleRow {
    fn from_row(row: &rusqlite::Row) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get(0)?,
            patient_id: row.get(1)?,
            name: row.get(2)?,
            dosage: row.get(3)?,
            frequency: row.get(4)?,
            time_of_day: row.get(5)?,
            created_by: row.get(6)?,
            created_at: row.get(7)?,
        })
    }

    fn decode(self) -> Result<MedicationSchedule, StoreError> {
        let frequency = self
            .frequency
            .parse::<Frequency>()
            .map_err(|e| StoreError::CorruptRecord {
                table: "medications",
                message: e.to_string(),
            })?;
        Ok(MedicationSchedule {
            created_at: parse_instant("medications", &self.created_at)?,
            id: self.id,
            patient_id: self.patient_id,
            name: self.name,
            dosage: self.dosage,
            frequency,
            time_of_day: self.time_of_day,
            created_by: self.created_by,
        })
    }
}

struct LogRow {
    id: String,
    medication_id: String,
    patient_id: String,
    taken_at: String,
    proof_ref: Option<String>,
}

impl LogRow {
    fn from_row(row: &rusqlite::Row) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get(0)?,
            medication_id: row.get(1)?,
            patient_id: row.get(2)?,
            taken_at: row.get(3)?,
            proof_ref: row.get(4)?,
        })
    }

    fn decode(self) -> Result<IntakeLog, StoreError> {
        Ok(IntakeLog {
            taken_at: parse_instant("medication_logs", &self.taken_at)?,
            id: self.id,
            medication_id: self.medication_id,
            patient_id: self.patient_id,
            proof_ref: self.proof_ref,
        })
    }
}

/// Keep decodable records; skip the rest with a warning.
fn keep_decodable<T, R>(rows: Vec<R>, decode: impl Fn(R) -> Result<T, StoreError>) -> Vec<T> {
    rows.into_iter()
        .filter_map(|row| match decode(row) {
            Ok(record) => Some(record),
            Err(e) => {
                tracing::warn!(error = %e, "skipping undecodable record");
                None
            }
        })
        .collect()
}

/// SQLite database for medtrack records.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Get a reference to the underlying SQLite connection.
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Open (or create) the database at `path`.
    ///
    /// Creates the schema if it doesn't exist and applies pending
    /// migrations.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open_at(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path).map_err(|source| StoreError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        Self::with_connection(conn)
    }

    /// Open an in-memory database.
    pub fn open_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory().map_err(|source| StoreError::OpenFailed {
            path: ":memory:".into(),
            source,
        })?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> Result<Self, StoreError> {
        migrations::migrate(&conn).map_err(|e| StoreError::MigrationFailed(e.to_string()))?;
        Ok(Self { conn })
    }

    // === Profiles ===

    pub fn create_profile(&self, name: &str, role: Role) -> Result<Profile, CoreError> {
        if name.trim().is_empty() {
            return Err(crate::error::ValidationError::Required { field: "name" }.into());
        }
        let profile = Profile {
            id: Uuid::new_v4().to_string(),
            name: name.trim().to_string(),
            role,
            created_at: Utc::now(),
        };
        self.conn
            .execute(
                "INSERT INTO profiles (id, name, role, created_at) VALUES (?1, ?2, ?3, ?4)",
                params![
                    profile.id,
                    profile.name,
                    profile.role.as_str(),
                    format_instant(profile.created_at)
                ],
            )
            .map_err(StoreError::from)?;
        tracing::info!(profile_id = %profile.id, role = %profile.role, "profile created");
        Ok(profile)
    }

    pub fn get_profile(&self, id: &str) -> Result<Option<Profile>, StoreError> {
        let row = self
            .conn
            .query_row(
                "SELECT id, name, role, created_at FROM profiles WHERE id = ?1",
                params![id],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                    ))
                },
            )
            .optional()?;
        row.map(Self::decode_profile).transpose()
    }

    /// Every patient profile, by name. Caretakers pick from this list.
    pub fn list_patients(&self) -> Result<Vec<Profile>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, role, created_at FROM profiles WHERE role = ?1 ORDER BY name, id",
        )?;
        let rows = stmt
            .query_map(params![Role::Patient.as_str()], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(keep_decodable(rows, Self::decode_profile))
    }

    fn decode_profile(
        (id, name, role, created_at): (String, String, String, String),
    ) -> Result<Profile, StoreError> {
        let role = role.parse::<Role>().map_err(|e| {
            StoreError::CorruptRecord {
                table: "profiles",
                message: e.to_string(),
            }
        })?;
        Ok(Profile {
            created_at: parse_instant("profiles", &created_at)?,
            id,
            name,
            role,
        })
    }

    // === Medications ===

    /// Create a schedule from validated user input.
    pub fn create_medication(
        &self,
        draft: &MedicationDraft,
        created_by: &str,
    ) -> Result<MedicationSchedule, CoreError> {
        let time = draft.validate()?;
        let now = Utc::now();
        let schedule = MedicationSchedule {
            id: Uuid::new_v4().to_string(),
            patient_id: draft.patient_id.trim().to_string(),
            name: draft.name.trim().to_string(),
            dosage: draft.dosage.trim().to_string(),
            frequency: draft.frequency,
            time_of_day: time.to_string(),
            created_by: created_by.to_string(),
            created_at: now,
        };

        self.conn
            .execute(
                "INSERT INTO medications
                    (id, patient_id, name, dosage, frequency, time_of_day, created_by, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)",
                params![
                    schedule.id,
                    schedule.patient_id,
                    schedule.name,
                    schedule.dosage,
                    schedule.frequency.as_str(),
                    schedule.time_of_day,
                    schedule.created_by,
                    format_instant(now),
                ],
            )
            .map_err(StoreError::from)?;

        tracing::info!(
            medication_id = %schedule.id,
            patient_id = %schedule.patient_id,
            frequency = %schedule.frequency,
            "medication created"
        );
        Ok(schedule)
    }

    /// Replace the editable fields of a schedule.
    ///
    /// The creation anchor is kept, so recurrence stays aligned.
    pub fn update_medication(
        &self,
        id: &str,
        draft: &MedicationDraft,
    ) -> Result<MedicationSchedule, CoreError> {
        let time = draft.validate()?;
        let changed = self
            .conn
            .execute(
                "UPDATE medications
                 SET patient_id = ?2, name = ?3, dosage = ?4, frequency = ?5,
                     time_of_day = ?6, updated_at = ?7
                 WHERE id = ?1",
                params![
                    id,
                    draft.patient_id.trim(),
                    draft.name.trim(),
                    draft.dosage.trim(),
                    draft.frequency.as_str(),
                    time.to_string(),
                    format_instant(Utc::now()),
                ],
            )
            .map_err(StoreError::from)?;

        if changed == 0 {
            return Err(StoreError::NotFound {
                entity: "Medication",
                id: id.to_string(),
            }
            .into());
        }

        tracing::info!(medication_id = %id, "medication updated");
        self.find_schedule(id)?
            .ok_or_else(|| {
                StoreError::NotFound {
                    entity: "Medication",
                    id: id.to_string(),
                }
                .into()
            })
    }

    /// Delete a schedule. Its intake logs stay as history.
    pub fn delete_medication(&self, id: &str) -> Result<(), StoreError> {
        let deleted = self
            .conn
            .execute("DELETE FROM medications WHERE id = ?1", params![id])?;
        if deleted == 0 {
            return Err(StoreError::NotFound {
                entity: "Medication",
                id: id.to_string(),
            });
        }
        tracing::info!(medication_id = %id, "medication deleted");
        Ok(())
    }

    /// Schedules of a patient, newest first.
    pub fn list_medications(&self, patient_id: &str) -> Result<Vec<MedicationSchedule>, StoreError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {SCHEDULE_COLUMNS} FROM medications
             WHERE patient_id = ?1
             ORDER BY created_at DESC, id"
        ))?;
        let rows = stmt
            .query_map(params![patient_id], ScheduleRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(keep_decodable(rows, ScheduleRow::decode))
    }

    /// Number of intake logs recorded for a medication.
    pub fn count_logs(&self, medication_id: &str) -> Result<u64, StoreError> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM medication_logs WHERE medication_id = ?1",
            params![medication_id],
            |row| row.get(0),
        )?;
        Ok(count.max(0) as u64)
    }
}

impl AdherenceStore for Database {
    fn list_schedules(&self, patient_id: &str) -> Result<Vec<MedicationSchedule>, StoreError> {
        self.list_medications(patient_id)
    }

    fn list_logs(&self, patient_id: &str, range: &DateRange) -> Result<Vec<IntakeLog>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, medication_id, patient_id, taken_at, proof_ref
             FROM medication_logs
             WHERE patient_id = ?1 AND taken_at >= ?2 AND taken_at <= ?3
             ORDER BY taken_at, id",
        )?;
        let rows = stmt
            .query_map(
                params![
                    patient_id,
                    format_instant(range.start),
                    format_instant(range.end)
                ],
                LogRow::from_row,
            )?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(keep_decodable(rows, LogRow::decode))
    }

    fn find_schedule(&self, medication_id: &str) -> Result<Option<MedicationSchedule>, StoreError> {
        let row = self
            .conn
            .query_row(
                &format!("SELECT {SCHEDULE_COLUMNS} FROM medications WHERE id = ?1"),
                params![medication_id],
                ScheduleRow::from_row,
            )
            .optional()?;
        row.map(ScheduleRow::decode).transpose()
    }

    fn insert_log(&self, log: NewIntakeLog) -> Result<IntakeLog, StoreError> {
        let id = Uuid::new_v4().to_string();
        self.conn.execute(
            "INSERT INTO medication_logs (id, medication_id, patient_id, taken_at, proof_ref)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                id,
                log.medication_id,
                log.patient_id,
                format_instant(log.taken_at),
                log.proof_ref,
            ],
        )?;
        Ok(log.into_log(id))
    }
}
