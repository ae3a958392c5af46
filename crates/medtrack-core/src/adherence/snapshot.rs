//! Point-in-time inputs to the adherence calculators.
//!
//! Snapshots are plain data handed over by the caller. Before computing, the
//! schedules are prepared once (dose times parsed, anchors resolved in the
//! patient's zone) and the logs are indexed by medication and local day.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::calendar::{CalendarDay, PatientZone};
use crate::medication::{IntakeLog, MedicationSchedule, TimeOfDay};

/// Active schedules of one patient.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleSnapshot {
    pub patient_id: String,
    pub schedules: Vec<MedicationSchedule>,
}

impl ScheduleSnapshot {
    pub fn new(patient_id: impl Into<String>, schedules: Vec<MedicationSchedule>) -> Self {
        Self {
            patient_id: patient_id.into(),
            schedules,
        }
    }

    pub fn find(&self, medication_id: &str) -> Option<&MedicationSchedule> {
        self.schedules.iter().find(|s| s.id == medication_id)
    }
}

/// Recorded intakes of one patient.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogSnapshot {
    pub patient_id: String,
    pub logs: Vec<IntakeLog>,
}

impl LogSnapshot {
    pub fn new(patient_id: impl Into<String>, logs: Vec<IntakeLog>) -> Self {
        Self {
            patient_id: patient_id.into(),
            logs,
        }
    }

    pub fn push(&mut self, log: IntakeLog) {
        self.logs.push(log);
    }

    /// Remove a log by id, returning it if present.
    pub fn remove(&mut self, log_id: &str) -> Option<IntakeLog> {
        let pos = self.logs.iter().position(|l| l.id == log_id)?;
        Some(self.logs.remove(pos))
    }

    pub fn len(&self) -> usize {
        self.logs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.logs.is_empty()
    }
}

/// Both snapshots of one patient, as fetched together from the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatientSnapshot {
    pub schedules: ScheduleSnapshot,
    pub logs: LogSnapshot,
    pub loaded_at: DateTime<Utc>,
}

impl PatientSnapshot {
    pub fn patient_id(&self) -> &str {
        &self.schedules.patient_id
    }
}

/// A record skipped because it could not be used in the computation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataWarning {
    pub medication_id: String,
    pub medication_name: String,
    pub message: String,
}

/// A schedule that passed preparation.
#[derive(Debug, Clone)]
pub struct PreparedSchedule<'a> {
    pub schedule: &'a MedicationSchedule,
    pub dose_time: TimeOfDay,
    pub anchor: CalendarDay,
}

impl PreparedSchedule<'_> {
    pub fn is_due_on(&self, day: CalendarDay) -> bool {
        self.schedule.frequency.is_due(self.anchor, day)
    }
}

/// Schedules ready for per-day classification.
#[derive(Debug, Clone)]
pub struct PreparedSchedules<'a> {
    usable: Vec<PreparedSchedule<'a>>,
    warnings: Vec<DataWarning>,
}

impl<'a> PreparedSchedules<'a> {
    /// Parse dose times and resolve anchors. Schedules with an unparsable
    /// time are left out and reported as warnings.
    pub fn prepare(snapshot: &'a ScheduleSnapshot, zone: PatientZone) -> Self {
        let mut usable = Vec::with_capacity(snapshot.schedules.len());
        let mut warnings = Vec::new();

        for schedule in &snapshot.schedules {
            match schedule.parsed_time() {
                Ok(dose_time) => usable.push(PreparedSchedule {
                    schedule,
                    dose_time,
                    anchor: zone.day_of(schedule.created_at),
                }),
                Err(e) => {
                    tracing::warn!(
                        medication_id = %schedule.id,
                        time_of_day = %schedule.time_of_day,
                        "skipping schedule with unusable dose time"
                    );
                    warnings.push(DataWarning {
                        medication_id: schedule.id.clone(),
                        medication_name: schedule.name.clone(),
                        message: e.to_string(),
                    });
                }
            }
        }

        Self { usable, warnings }
    }

    pub fn due_on(&self, day: CalendarDay) -> impl Iterator<Item = &PreparedSchedule<'a>> {
        self.usable.iter().filter(move |s| s.is_due_on(day))
    }

    /// Earliest anchor among schedules that can ever be due.
    ///
    /// Days before it predate the patient's regimen and are not counted.
    pub fn history_start(&self) -> Option<CalendarDay> {
        self.usable
            .iter()
            .filter(|s| s.schedule.frequency.interval_days().is_some())
            .map(|s| s.anchor)
            .min()
    }

    pub fn warnings(&self) -> &[DataWarning] {
        &self.warnings
    }

    pub fn len(&self) -> usize {
        self.usable.len()
    }

    pub fn is_empty(&self) -> bool {
        self.usable.is_empty()
    }
}

/// Local days on which each medication has at least one intake.
#[derive(Debug, Clone, Default)]
pub struct IntakeIndex {
    days: HashMap<String, HashSet<CalendarDay>>,
}

impl IntakeIndex {
    pub fn build(logs: &LogSnapshot, zone: PatientZone) -> Self {
        let mut days: HashMap<String, HashSet<CalendarDay>> = HashMap::new();
        for log in &logs.logs {
            days.entry(log.medication_id.clone())
                .or_default()
                .insert(zone.day_of(log.taken_at));
        }
        Self { days }
    }

    pub fn taken_on(&self, medication_id: &str, day: CalendarDay) -> bool {
        self.days
            .get(medication_id)
            .is_some_and(|d| d.contains(&day))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::medication::Frequency;
    use chrono::{TimeZone, Utc};

    fn schedule(id: &str, time: &str, frequency: Frequency) -> MedicationSchedule {
        MedicationSchedule {
            id: id.into(),
            patient_id: "p1".into(),
            name: format!("Med {id}"),
            dosage: "10mg".into(),
            frequency,
            time_of_day: time.into(),
            created_by: "p1".into(),
            created_at: Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap(),
        }
    }

    #[test]
    fn bad_dose_time_becomes_warning() {
        let snap = ScheduleSnapshot::new(
            "p1",
            vec![
                schedule("a", "08:00", Frequency::Daily),
                schedule("b", "not a time", Frequency::Daily),
            ],
        );
        let prepared = PreparedSchedules::prepare(&snap, PatientZone::utc());
        assert_eq!(prepared.len(), 1);
        assert_eq!(prepared.warnings().len(), 1);
        assert_eq!(prepared.warnings()[0].medication_id, "b");
    }

    #[test]
    fn history_start_ignores_as_needed() {
        let mut early = schedule("prn", "08:00", Frequency::AsNeeded);
        early.created_at = Utc.with_ymd_and_hms(2023, 6, 1, 0, 0, 0).unwrap();
        let snap = ScheduleSnapshot::new(
            "p1",
            vec![early, schedule("a", "08:00", Frequency::Weekly)],
        );
        let prepared = PreparedSchedules::prepare(&snap, PatientZone::utc());
        assert_eq!(prepared.history_start(), CalendarDay::from_ymd(2024, 1, 1));
    }

    #[test]
    fn intake_index_buckets_by_local_day() {
        let zone = PatientZone::parse("America/New_York").unwrap();
        let logs = LogSnapshot::new(
            "p1",
            vec![IntakeLog {
                id: "l1".into(),
                medication_id: "a".into(),
                patient_id: "p1".into(),
                // 02:00 UTC on the 16th is still the 15th in New York.
                taken_at: Utc.with_ymd_and_hms(2024, 1, 16, 2, 0, 0).unwrap(),
                proof_ref: None,
            }],
        );
        let index = IntakeIndex::build(&logs, zone);
        assert!(index.taken_on("a", CalendarDay::from_ymd(2024, 1, 15).unwrap()));
        assert!(!index.taken_on("a", CalendarDay::from_ymd(2024, 1, 16).unwrap()));
        assert!(!index.taken_on("b", CalendarDay::from_ymd(2024, 1, 15).unwrap()));
    }

    #[test]
    fn log_snapshot_remove_by_id() {
        let mut logs = LogSnapshot::new("p1", Vec::new());
        logs.push(IntakeLog {
            id: "l1".into(),
            medication_id: "a".into(),
            patient_id: "p1".into(),
            taken_at: Utc::now(),
            proof_ref: None,
        });
        assert_eq!(logs.remove("l1").map(|l| l.id), Some("l1".to_string()));
        assert!(logs.remove("l1").is_none());
        assert!(logs.is_empty());
    }
}
