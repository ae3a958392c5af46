use chrono::Utc;
use clap::Subcommand;
use medtrack_core::CalendarDay;

use super::context::{print_json, PatientArgs, Session};

#[derive(Subcommand)]
pub enum StatusAction {
    /// Status of one day, with per-dose detail
    Day {
        #[command(flatten)]
        patient: PatientArgs,
        /// Day to classify (YYYY-MM-DD, defaults to today)
        #[arg(long)]
        date: Option<CalendarDay>,
    },
    /// Today's status, summary, month and recent activity together
    Dashboard {
        #[command(flatten)]
        patient: PatientArgs,
    },
}

pub fn run(action: StatusAction) -> Result<(), Box<dyn std::error::Error>> {
    let session = Session::open()?;
    let now = Utc::now();

    match action {
        StatusAction::Day { patient, date } => {
            let day = date.unwrap_or_else(|| session.today(now));
            let snapshot = session.snapshot_from(&patient, day, now)?;
            let view = session.engine.view_snapshot(&snapshot, now);
            let status = view.daily_status(day);
            print_json(&status)?;
        }
        StatusAction::Dashboard { patient } => {
            let snapshot = session.snapshot(&patient, now)?;
            let view = session.engine.view_snapshot(&snapshot, now);
            print_json(&view.dashboard()?)?;
        }
    }
    Ok(())
}
