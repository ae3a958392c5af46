//! Integration tests for the SQLite store.
//!
//! Runs the full workflow against a file-backed database: profiles,
//! medication management, intake recording and adherence reads after
//! reopening the file.

use chrono::{Duration, SecondsFormat, Utc};
use medtrack_core::{
    AdherenceEngine, AdherenceStore, Database, Frequency, IntakeRequest, MedicationDraft,
    PatientContext, PatientZone, Role,
};
use rusqlite::params;

fn draft(patient_id: &str, name: &str, frequency: Frequency) -> MedicationDraft {
    MedicationDraft {
        name: name.into(),
        dosage: "1 tablet".into(),
        frequency,
        time_of_day: "08:00".into(),
        patient_id: patient_id.into(),
    }
}

/// Move a schedule's creation back so it has history.
fn backdate(db: &Database, medication_id: &str, days: i64) {
    let created = (Utc::now() - Duration::days(days)).to_rfc3339_opts(SecondsFormat::Millis, true);
    db.conn()
        .execute(
            "UPDATE medications SET created_at = ?1 WHERE id = ?2",
            params![created, medication_id],
        )
        .unwrap();
}

#[test]
fn full_workflow_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("medtrack.db");
    let engine = AdherenceEngine::with_zone(PatientZone::utc());
    let now = Utc::now();

    let (patient_id, med_id) = {
        let db = Database::open_at(&path).unwrap();
        let patient = db.create_profile("Dana", Role::Patient).unwrap();
        let caretaker = db.create_profile("Sam", Role::Caretaker).unwrap();
        let med = db
            .create_medication(&draft(&patient.id, "Levothyroxine", Frequency::Daily), &caretaker.id)
            .unwrap();
        assert_eq!(med.created_by, caretaker.id);
        backdate(&db, &med.id, 2);

        for days_ago in [2, 1, 0] {
            engine
                .record_intake(
                    &db,
                    IntakeRequest::new(med.id.clone(), patient.id.clone(), now - Duration::days(days_ago))
                        .with_proof(format!("proofs/{}_{days_ago}.jpg", med.id)),
                )
                .unwrap();
        }
        (patient.id, med.id)
    };

    let db = Database::open_at(&path).unwrap();
    let snapshot = engine
        .load_snapshot(&db, &PatientContext::caretaker_of(patient_id.clone()), now)
        .unwrap();
    let view = engine.view_snapshot(&snapshot, now);

    assert_eq!(view.streak(), 3);
    let recent = view.recent_activity(5);
    assert_eq!(recent.len(), 3);
    assert!(recent.iter().all(|r| r.medication_name == "Levothyroxine" && r.has_proof));
    assert!(recent[0].taken_at >= recent[1].taken_at);

    db.delete_medication(&med_id).unwrap();
    let snapshot = engine
        .load_snapshot(&db, &PatientContext::patient(patient_id), now)
        .unwrap();
    let view = engine.view_snapshot(&snapshot, now);
    assert_eq!(view.recent_activity(5)[0].medication_name, "Unknown Medication");
    assert_eq!(view.streak(), 0);
}

#[test]
fn caretaker_overview_lists_every_patient() {
    let db = Database::open_memory().unwrap();
    let engine = AdherenceEngine::default();
    let now = Utc::now();

    let ann = db.create_profile("Ann", Role::Patient).unwrap();
    let bo = db.create_profile("Bo", Role::Patient).unwrap();
    db.create_profile("Carer", Role::Caretaker).unwrap();

    let med = db
        .create_medication(&draft(&ann.id, "Aspirin", Frequency::Daily), &ann.id)
        .unwrap();
    engine
        .record_intake(&db, IntakeRequest::new(med.id, ann.id.clone(), now))
        .unwrap();
    db.create_medication(&draft(&bo.id, "Ibuprofen", Frequency::AsNeeded), &bo.id)
        .unwrap();

    let patients = db.list_patients().unwrap();
    assert_eq!(patients.len(), 2);
    let overview = engine.patient_overview(&db, &patients, now).unwrap();
    assert_eq!(overview[0].name, "Ann");
    assert_eq!(overview[0].adherence_rate, 100);
    assert_eq!(overview[1].name, "Bo");
    assert_eq!(overview[1].adherence_rate, 0);
}

#[test]
fn schedules_are_scoped_to_their_patient() {
    let db = Database::open_memory().unwrap();
    db.create_medication(&draft("p1", "A", Frequency::Daily), "p1").unwrap();
    db.create_medication(&draft("p2", "B", Frequency::Weekly), "p2").unwrap();

    let p1 = db.list_schedules("p1").unwrap();
    assert_eq!(p1.len(), 1);
    assert_eq!(p1[0].name, "A");
}
