use chrono::Utc;
use clap::Subcommand;

use medtrack_core::AdherenceEngine;

use super::context::{print_json, PatientArgs, Session};

#[derive(Subcommand)]
pub enum AdherenceAction {
    /// Adherence rate and streak
    Summary {
        #[command(flatten)]
        patient: PatientArgs,
        /// Rate window in days (defaults to engine.rate_window_days)
        #[arg(long)]
        window: Option<u32>,
    },
    /// Current month breakdown
    Monthly {
        #[command(flatten)]
        patient: PatientArgs,
    },
    /// One mark per day of the current month
    Calendar {
        #[command(flatten)]
        patient: PatientArgs,
    },
    /// Rate, streak and today's status for every patient
    Overview,
}

pub fn run(action: AdherenceAction) -> Result<(), Box<dyn std::error::Error>> {
    let session = Session::open()?;
    let now = Utc::now();

    match action {
        AdherenceAction::Summary { patient, window } => {
            let first = AdherenceEngine::window_start(
                session.today(now),
                window.unwrap_or(session.config.engine.rate_window_days),
            );
            let snapshot = session.snapshot_from(&patient, first, now)?;
            let view = session.engine.view_snapshot(&snapshot, now);
            let mut summary = view.summary()?;
            if let Some(window) = window {
                summary.rate = view.adherence_rate(window)?;
            }
            print_json(&summary)?;
        }
        AdherenceAction::Monthly { patient } => {
            let snapshot = session.snapshot(&patient, now)?;
            let view = session.engine.view_snapshot(&snapshot, now);
            print_json(&view.monthly_summary()?)?;
        }
        AdherenceAction::Calendar { patient } => {
            let snapshot = session.snapshot(&patient, now)?;
            let view = session.engine.view_snapshot(&snapshot, now);
            print_json(&view.month_calendar())?;
        }
        AdherenceAction::Overview => {
            let patients = session.db.list_patients()?;
            let overview = session.engine.patient_overview(&session.db, &patients, now)?;
            print_json(&overview)?;
        }
    }
    Ok(())
}
