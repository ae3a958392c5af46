//! Patient and caretaker profiles.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Patient,
    Caretaker,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Patient => "patient",
            Role::Caretaker => "caretaker",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "patient" => Ok(Role::Patient),
            "caretaker" => Ok(Role::Caretaker),
            _ => Err(ValidationError::UnknownRole(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub id: String,
    pub name: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

/// Who is asking, and about which patient.
///
/// Passed explicitly into every read so one process can serve several
/// patients (a caretaker switching between them) without shared state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatientContext {
    pub patient_id: String,
    pub viewer_role: Role,
}

impl PatientContext {
    pub fn patient(patient_id: impl Into<String>) -> Self {
        Self {
            patient_id: patient_id.into(),
            viewer_role: Role::Patient,
        }
    }

    pub fn caretaker_of(patient_id: impl Into<String>) -> Self {
        Self {
            patient_id: patient_id.into(),
            viewer_role: Role::Caretaker,
        }
    }
}
