use clap::Subcommand;
use medtrack_core::{AdherenceStore, Frequency, MedicationDraft};

use super::context::{print_json, Session};

#[derive(Subcommand)]
pub enum MedAction {
    /// Add a medication schedule
    Add {
        /// Patient profile id
        #[arg(long)]
        patient: String,
        /// Medication name
        #[arg(long)]
        name: String,
        /// Dosage, e.g. "10mg"
        #[arg(long)]
        dosage: String,
        /// daily, weekly, biweekly, monthly or as_needed
        #[arg(long, default_value = "daily")]
        frequency: Frequency,
        /// Dose time, e.g. "08:00" or "8:00 PM"
        #[arg(long)]
        time: String,
        /// Profile id of the creator (defaults to the patient)
        #[arg(long)]
        created_by: Option<String>,
    },
    /// List a patient's schedules, newest first
    List {
        #[arg(long)]
        patient: String,
    },
    /// Change fields of a schedule
    Update {
        /// Medication id
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        dosage: Option<String>,
        #[arg(long)]
        frequency: Option<Frequency>,
        #[arg(long)]
        time: Option<String>,
    },
    /// Delete a schedule (its intake history is kept)
    Remove {
        /// Medication id
        id: String,
    },
}

pub fn run(action: MedAction) -> Result<(), Box<dyn std::error::Error>> {
    let session = Session::open()?;
    let db = &session.db;

    match action {
        MedAction::Add {
            patient,
            name,
            dosage,
            frequency,
            time,
            created_by,
        } => {
            let created_by = created_by.unwrap_or_else(|| patient.clone());
            let draft = MedicationDraft {
                name,
                dosage,
                frequency,
                time_of_day: time,
                patient_id: patient,
            };
            print_json(&db.create_medication(&draft, &created_by)?)?;
        }
        MedAction::List { patient } => {
            print_json(&db.list_medications(&patient)?)?;
        }
        MedAction::Update {
            id,
            name,
            dosage,
            frequency,
            time,
        } => {
            let existing = db
                .find_schedule(&id)?
                .ok_or_else(|| format!("medication not found: {id}"))?;
            let draft = MedicationDraft {
                name: name.unwrap_or(existing.name),
                dosage: dosage.unwrap_or(existing.dosage),
                frequency: frequency.unwrap_or(existing.frequency),
                time_of_day: time.unwrap_or(existing.time_of_day),
                patient_id: existing.patient_id,
            };
            print_json(&db.update_medication(&id, &draft)?)?;
        }
        MedAction::Remove { id } => {
            db.delete_medication(&id)?;
            println!("removed {id}");
        }
    }
    Ok(())
}
