//! Per-patient snapshot cache with staged intakes.
//!
//! A caller that wants to show an intake before the store has confirmed it
//! stages a tentative log, then either commits it with the persisted record
//! or rolls it back. Summaries are always recomputed from the cached
//! snapshot, so nothing derived is kept here.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};

use super::snapshot::PatientSnapshot;
use crate::medication::{IntakeLog, NewIntakeLog};

/// Handle for one staged intake, returned by [`SnapshotCache::stage_intake`].
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use = "a staged intake must be committed or rolled back"]
pub struct StagedIntake {
    patient_id: String,
    tentative_id: String,
}

impl StagedIntake {
    pub fn patient_id(&self) -> &str {
        &self.patient_id
    }

    pub fn tentative_id(&self) -> &str {
        &self.tentative_id
    }
}

#[derive(Debug, Clone)]
struct Entry {
    snapshot: PatientSnapshot,
    staged: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct SnapshotCache {
    entries: HashMap<String, Entry>,
    next_stage: u64,
}

impl SnapshotCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a freshly loaded snapshot, replacing any previous one.
    pub fn insert(&mut self, snapshot: PatientSnapshot) {
        let patient_id = snapshot.patient_id().to_string();
        self.entries.insert(
            patient_id,
            Entry {
                snapshot,
                staged: Vec::new(),
            },
        );
    }

    /// The snapshot of a patient, including staged intakes.
    pub fn get(&self, patient_id: &str) -> Option<&PatientSnapshot> {
        self.entries.get(patient_id).map(|e| &e.snapshot)
    }

    /// Whether a patient's snapshot is missing or older than `max_age`.
    pub fn is_stale(&self, patient_id: &str, now: DateTime<Utc>, max_age: Duration) -> bool {
        match self.entries.get(patient_id) {
            Some(entry) => now - entry.snapshot.loaded_at > max_age,
            None => true,
        }
    }

    /// Drop a patient's snapshot so the next read reloads it.
    pub fn invalidate(&mut self, patient_id: &str) -> bool {
        self.entries.remove(patient_id).is_some()
    }

    /// Number of staged intakes not yet committed or rolled back.
    pub fn staged_count(&self, patient_id: &str) -> usize {
        self.entries.get(patient_id).map_or(0, |e| e.staged.len())
    }

    /// Apply an intake tentatively. Returns `None` when the patient has no
    /// cached snapshot to apply it to.
    pub fn stage_intake(&mut self, intake: &NewIntakeLog) -> Option<StagedIntake> {
        let entry = self.entries.get_mut(&intake.patient_id)?;
        self.next_stage += 1;
        let tentative_id = format!("staged-{}", self.next_stage);

        entry
            .snapshot
            .logs
            .push(intake.clone().into_log(tentative_id.clone()));
        entry.staged.push(tentative_id.clone());

        Some(StagedIntake {
            patient_id: intake.patient_id.clone(),
            tentative_id,
        })
    }

    /// Replace a staged intake with the record the store persisted.
    pub fn commit(&mut self, staged: StagedIntake, persisted: IntakeLog) {
        let Some(entry) = self.entries.get_mut(&staged.patient_id) else {
            return;
        };
        if Self::unstage(entry, &staged.tentative_id) {
            entry.snapshot.logs.push(persisted);
        }
    }

    /// Discard a staged intake, restoring the last confirmed logs.
    pub fn rollback(&mut self, staged: StagedIntake) {
        if let Some(entry) = self.entries.get_mut(&staged.patient_id) {
            Self::unstage(entry, &staged.tentative_id);
        }
    }

    fn unstage(entry: &mut Entry, tentative_id: &str) -> bool {
        let Some(pos) = entry.staged.iter().position(|id| id == tentative_id) else {
            return false;
        };
        entry.staged.remove(pos);
        entry.snapshot.logs.remove(tentative_id);
        true
    }
}
