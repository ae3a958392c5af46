use clap::Subcommand;
use medtrack_core::Role;

use super::context::{print_json, Session};

#[derive(Subcommand)]
pub enum PatientAction {
    /// Create a profile
    Add {
        /// Display name
        name: String,
        /// patient or caretaker
        #[arg(long, default_value = "patient")]
        role: Role,
    },
    /// List patient profiles
    List,
    /// Show one profile
    Show {
        /// Profile id
        id: String,
    },
}

pub fn run(action: PatientAction) -> Result<(), Box<dyn std::error::Error>> {
    let session = Session::open()?;

    match action {
        PatientAction::Add { name, role } => {
            let profile = session.db.create_profile(&name, role)?;
            print_json(&profile)?;
        }
        PatientAction::List => {
            print_json(&session.db.list_patients()?)?;
        }
        PatientAction::Show { id } => match session.db.get_profile(&id)? {
            Some(profile) => print_json(&profile)?,
            None => return Err(format!("profile not found: {id}").into()),
        },
    }
    Ok(())
}
