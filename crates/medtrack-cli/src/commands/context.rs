//! Shared setup for commands that read or write records.

use chrono::{DateTime, Utc};
use clap::Args;
use medtrack_core::{
    AdherenceEngine, CalendarDay, Config, Database, PatientContext, PatientSnapshot, Role,
};

/// Selects the patient a command reads, and who is asking.
#[derive(Args)]
pub struct PatientArgs {
    /// Patient profile id
    #[arg(long)]
    pub patient: String,
    /// Role of the viewer (patient or caretaker)
    #[arg(long, default_value = "patient")]
    pub viewer: Role,
}

impl PatientArgs {
    pub fn context(&self) -> PatientContext {
        PatientContext {
            patient_id: self.patient.clone(),
            viewer_role: self.viewer,
        }
    }
}

/// Config, database and engine opened together.
pub struct Session {
    pub db: Database,
    pub engine: AdherenceEngine,
    pub config: Config,
}

impl Session {
    pub fn open() -> Result<Self, Box<dyn std::error::Error>> {
        let config = Config::load()?;
        let zone = config.zone()?;
        let db = Database::open_at(&config.database_location()?)?;
        let engine = AdherenceEngine::new(zone, config.engine);
        Ok(Self { db, engine, config })
    }

    pub fn snapshot(
        &self,
        patient: &PatientArgs,
        now: DateTime<Utc>,
    ) -> Result<PatientSnapshot, Box<dyn std::error::Error>> {
        Ok(self.engine.load_snapshot(&self.db, &patient.context(), now)?)
    }

    /// Snapshot whose logs reach back to at least `first`.
    pub fn snapshot_from(
        &self,
        patient: &PatientArgs,
        first: CalendarDay,
        now: DateTime<Utc>,
    ) -> Result<PatientSnapshot, Box<dyn std::error::Error>> {
        Ok(self
            .engine
            .load_snapshot_from(&self.db, &patient.context(), first, now)?)
    }

    pub fn today(&self, now: DateTime<Utc>) -> CalendarDay {
        self.engine.zone().day_of(now)
    }
}

pub fn print_json<T: serde::Serialize>(value: &T) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
