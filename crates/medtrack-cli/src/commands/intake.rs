use chrono::{DateTime, Utc};
use clap::Subcommand;
use medtrack_core::IntakeRequest;

use super::context::{print_json, PatientArgs, Session};

#[derive(Subcommand)]
pub enum IntakeAction {
    /// Record a dose as taken
    Record {
        /// Patient profile id
        #[arg(long)]
        patient: String,
        /// Medication id
        #[arg(long)]
        medication: String,
        /// When it was taken (RFC 3339, defaults to now)
        #[arg(long)]
        at: Option<DateTime<Utc>>,
        /// Reference to an uploaded photo
        #[arg(long)]
        proof: Option<String>,
    },
    /// Latest intakes, newest first
    Recent {
        #[command(flatten)]
        patient: PatientArgs,
        /// Number of entries (defaults to engine.recent_activity_limit)
        #[arg(long)]
        limit: Option<usize>,
    },
}

pub fn run(action: IntakeAction) -> Result<(), Box<dyn std::error::Error>> {
    let session = Session::open()?;

    match action {
        IntakeAction::Record {
            patient,
            medication,
            at,
            proof,
        } => {
            let mut request = IntakeRequest::new(medication, patient, at.unwrap_or_else(Utc::now));
            if let Some(proof) = proof {
                request = request.with_proof(proof);
            }
            let log = session.engine.record_intake(&session.db, request)?;
            print_json(&log)?;
        }
        IntakeAction::Recent { patient, limit } => {
            let now = Utc::now();
            let snapshot = session.snapshot(&patient, now)?;
            let limit =
                limit.unwrap_or(session.config.engine.recent_activity_limit as usize);
            let view = session.engine.view_snapshot(&snapshot, now);
            print_json(&view.recent_activity(limit))?;
        }
    }
    Ok(())
}
