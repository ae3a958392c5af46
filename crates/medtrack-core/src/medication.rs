//! Medication schedules and intake logs.
//!
//! These are the records kept by the external store. Nothing here is derived:
//! adherence figures are computed from these records by the `adherence`
//! module.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveTime, Timelike, Utc};
use serde::{Deserialize, Serialize};

use crate::calendar::CalendarDay;
use crate::error::ValidationError;

/// How often a schedule is due.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Frequency {
    Daily,
    Weekly,
    Biweekly,
    Monthly,
    /// Taken on demand; never due on a specific day
    AsNeeded,
}

impl Frequency {
    pub const ALL: [Frequency; 5] = [
        Frequency::Daily,
        Frequency::Weekly,
        Frequency::Biweekly,
        Frequency::Monthly,
        Frequency::AsNeeded,
    ];

    /// Days between due dates, or `None` for `as_needed`.
    pub fn interval_days(self) -> Option<u32> {
        match self {
            Frequency::Daily => Some(1),
            Frequency::Weekly => Some(7),
            Frequency::Biweekly => Some(14),
            Frequency::Monthly => Some(30),
            Frequency::AsNeeded => None,
        }
    }

    /// Whether a schedule anchored on `anchor` is due on `day`.
    ///
    /// Nothing is due before its anchor day.
    pub fn is_due(self, anchor: CalendarDay, day: CalendarDay) -> bool {
        let Some(every) = self.interval_days() else {
            return false;
        };
        let elapsed = day.days_since(anchor);
        elapsed >= 0 && elapsed % i64::from(every) == 0
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Frequency::Daily => "daily",
            Frequency::Weekly => "weekly",
            Frequency::Biweekly => "biweekly",
            Frequency::Monthly => "monthly",
            Frequency::AsNeeded => "as_needed",
        }
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Frequency {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        Frequency::ALL
            .into_iter()
            .find(|f| f.as_str() == normalized)
            .ok_or_else(|| ValidationError::UnknownFrequency(s.to_string()))
    }
}

/// Wall-clock time a dose is expected, minute precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimeOfDay(NaiveTime);

impl TimeOfDay {
    pub fn new(hour: u32, minute: u32) -> Option<Self> {
        NaiveTime::from_hms_opt(hour, minute, 0).map(Self)
    }

    /// Parse `HH:MM`, `HH:MM:SS` or 12-hour `h:mm AM`.
    pub fn parse(value: &str) -> Result<Self, ValidationError> {
        let trimmed = value.trim();
        let invalid = || ValidationError::InvalidTimeOfDay {
            value: value.to_string(),
        };
        if trimmed.is_empty() {
            return Err(invalid());
        }

        let upper = trimmed.to_ascii_uppercase();
        let parsed = if upper.ends_with("AM") || upper.ends_with("PM") {
            NaiveTime::parse_from_str(&upper, "%I:%M %p")
                .or_else(|_| NaiveTime::parse_from_str(&upper, "%I:%M%p"))
        } else {
            NaiveTime::parse_from_str(trimmed, "%H:%M")
                .or_else(|_| NaiveTime::parse_from_str(trimmed, "%H:%M:%S"))
        };

        parsed
            .ok()
            .and_then(|t| Self::new(t.hour(), t.minute()))
            .ok_or_else(invalid)
    }

    pub fn naive(self) -> NaiveTime {
        self.0
    }

    pub fn hour(self) -> u32 {
        self.0.hour()
    }

    pub fn minute(self) -> u32 {
        self.0.minute()
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour(), self.minute())
    }
}

impl FromStr for TimeOfDay {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for TimeOfDay {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for TimeOfDay {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}

/// A recurring prescription for one patient.
///
/// `time_of_day` is kept as stored so that a malformed value can be reported
/// without dropping the whole record; see [`MedicationSchedule::parsed_time`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MedicationSchedule {
    pub id: String,
    pub patient_id: String,
    pub name: String,
    pub dosage: String,
    pub frequency: Frequency,
    pub time_of_day: String,
    /// Patient or caretaker who created the schedule
    pub created_by: String,
    pub created_at: DateTime<Utc>,
}

impl MedicationSchedule {
    pub fn parsed_time(&self) -> Result<TimeOfDay, ValidationError> {
        TimeOfDay::parse(&self.time_of_day)
    }
}

/// User input for creating or editing a schedule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MedicationDraft {
    pub name: String,
    pub dosage: String,
    pub frequency: Frequency,
    pub time_of_day: String,
    pub patient_id: String,
}

impl MedicationDraft {
    /// Check required fields and return the normalized dose time.
    pub fn validate(&self) -> Result<TimeOfDay, ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::Required { field: "name" });
        }
        if self.dosage.trim().is_empty() {
            return Err(ValidationError::Required { field: "dosage" });
        }
        if self.time_of_day.trim().is_empty() {
            return Err(ValidationError::Required { field: "time_of_day" });
        }
        if self.patient_id.trim().is_empty() {
            return Err(ValidationError::Required { field: "patient_id" });
        }
        TimeOfDay::parse(&self.time_of_day)
    }
}

/// One confirmed dose.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntakeLog {
    pub id: String,
    pub medication_id: String,
    pub patient_id: String,
    pub taken_at: DateTime<Utc>,
    /// Reference to an uploaded confirmation image. Informational only.
    pub proof_ref: Option<String>,
}

impl IntakeLog {
    pub fn has_proof(&self) -> bool {
        self.proof_ref.as_deref().is_some_and(|p| !p.is_empty())
    }
}

/// An intake not yet persisted; the store assigns the id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewIntakeLog {
    pub medication_id: String,
    pub patient_id: String,
    pub taken_at: DateTime<Utc>,
    pub proof_ref: Option<String>,
}

impl NewIntakeLog {
    pub fn into_log(self, id: String) -> IntakeLog {
        IntakeLog {
            id,
            medication_id: self.medication_id,
            patient_id: self.patient_id,
            taken_at: self.taken_at,
            proof_ref: self.proof_ref,
        }
    }
}
