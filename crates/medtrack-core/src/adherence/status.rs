//! Per-day status classification.
//!
//! A day is judged by how many schedules were due on it and how many of those
//! have at least one intake logged on the same local day:
//! - **NoMedications**: nothing was due
//! - **Completed**: every due schedule has an intake
//! - **Pending**: at least one due schedule has no intake yet
//!
//! `Pending` does not distinguish "not yet taken today" from "missed on a past
//! day"; callers compare the date with today for that.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::snapshot::{IntakeIndex, PreparedSchedules};
use crate::calendar::{CalendarDay, PatientZone};
use crate::error::ComputationError;
use crate::medication::TimeOfDay;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DayStatus {
    NoMedications,
    Pending,
    Completed,
}

impl DayStatus {
    pub fn from_counts(due_count: u32, satisfied_count: u32) -> Self {
        if due_count == 0 {
            DayStatus::NoMedications
        } else if satisfied_count >= due_count {
            DayStatus::Completed
        } else {
            DayStatus::Pending
        }
    }

    /// Completed days and days with nothing due keep a streak alive.
    pub fn keeps_streak(self) -> bool {
        matches!(self, DayStatus::Completed | DayStatus::NoMedications)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DayStatus::NoMedications => "no_medications",
            DayStatus::Pending => "pending",
            DayStatus::Completed => "completed",
        }
    }
}

/// State of one due dose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DoseState {
    Taken,
    /// Dose time has passed without an intake
    Missed,
    Pending,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DoseStatus {
    pub medication_id: String,
    pub name: String,
    pub dosage: String,
    pub dose_time: TimeOfDay,
    pub state: DoseState,
}

/// Derived status of one calendar day. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DerivedDayStatus {
    pub date: CalendarDay,
    pub due_count: u32,
    pub satisfied_count: u32,
    pub status: DayStatus,
    pub doses: Vec<DoseStatus>,
}

impl DerivedDayStatus {
    /// A status from bare counts, without dose detail.
    pub fn from_counts(date: CalendarDay, due_count: u32, satisfied_count: u32) -> Self {
        Self {
            date,
            due_count,
            satisfied_count,
            status: DayStatus::from_counts(due_count, satisfied_count),
            doses: Vec::new(),
        }
    }

    /// A past day with doses due that were not all taken.
    pub fn is_missed(&self, today: CalendarDay) -> bool {
        self.status == DayStatus::Pending && self.date < today
    }

    pub fn check(&self) -> Result<(), ComputationError> {
        if self.satisfied_count > self.due_count {
            return Err(ComputationError::SatisfiedExceedsDue {
                date: self.date.to_string(),
                due: self.due_count,
                satisfied: self.satisfied_count,
            });
        }
        Ok(())
    }
}

/// Classifies single days against prepared schedules and indexed intakes.
#[derive(Debug, Clone, Copy, Default)]
pub struct StatusClassifier {
    zone: PatientZone,
}

impl StatusClassifier {
    pub fn new(zone: PatientZone) -> Self {
        Self { zone }
    }

    /// Classify `day`. `now` only decides whether an untaken dose is
    /// reported as missed or pending; it does not affect `status`.
    pub fn classify(
        &self,
        day: CalendarDay,
        schedules: &PreparedSchedules<'_>,
        intakes: &IntakeIndex,
        now: DateTime<Utc>,
    ) -> DerivedDayStatus {
        let mut doses = Vec::new();
        let mut satisfied_count = 0u32;

        for prepared in schedules.due_on(day) {
            let schedule = prepared.schedule;
            let taken = intakes.taken_on(&schedule.id, day);
            let state = if taken {
                satisfied_count += 1;
                DoseState::Taken
            } else if self.zone.at(day, prepared.dose_time.naive()) <= now {
                DoseState::Missed
            } else {
                DoseState::Pending
            };

            doses.push(DoseStatus {
                medication_id: schedule.id.clone(),
                name: schedule.name.clone(),
                dosage: schedule.dosage.clone(),
                dose_time: prepared.dose_time,
                state,
            });
        }

        doses.sort_by(|a, b| a.dose_time.cmp(&b.dose_time).then_with(|| a.name.cmp(&b.name)));
        let due_count = doses.len() as u32;

        DerivedDayStatus {
            date: day,
            due_count,
            satisfied_count,
            status: DayStatus::from_counts(due_count, satisfied_count),
            doses,
        }
    }
}
