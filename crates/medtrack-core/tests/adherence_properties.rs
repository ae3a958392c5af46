//! Property tests for the adherence calculators.

use chrono::{DateTime, Duration, TimeZone, Utc};
use medtrack_core::adherence::percent;
use medtrack_core::{
    AdherenceEngine, DayStatus, Frequency, IntakeLog, LogSnapshot, MedicationSchedule,
    ScheduleSnapshot,
};
use proptest::prelude::*;

const HISTORY_DAYS: usize = 45;

fn origin() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
}

fn frequency() -> impl Strategy<Value = Frequency> {
    prop::sample::select(Frequency::ALL.to_vec())
}

/// Up to three schedules created on the origin day, each with a flag per
/// history day saying whether it was logged.
fn history() -> impl Strategy<Value = Vec<(Frequency, u32, Vec<bool>)>> {
    prop::collection::vec(
        (
            frequency(),
            0u32..24,
            prop::collection::vec(any::<bool>(), HISTORY_DAYS),
        ),
        0..=3,
    )
}

fn build(history: &[(Frequency, u32, Vec<bool>)]) -> (ScheduleSnapshot, LogSnapshot) {
    let mut schedules = Vec::new();
    let mut logs = Vec::new();
    for (i, (frequency, hour, taken)) in history.iter().enumerate() {
        let id = format!("m{i}");
        schedules.push(MedicationSchedule {
            id: id.clone(),
            patient_id: "p1".into(),
            name: format!("Med {i}"),
            dosage: "1 tablet".into(),
            frequency: *frequency,
            time_of_day: format!("{hour:02}:00"),
            created_by: "p1".into(),
            created_at: origin(),
        });
        for (d, was_taken) in taken.iter().enumerate() {
            if *was_taken {
                logs.push(IntakeLog {
                    id: format!("{id}-{d}"),
                    medication_id: id.clone(),
                    patient_id: "p1".into(),
                    taken_at: origin() + Duration::days(d as i64) + Duration::hours(i64::from(*hour)),
                    proof_ref: None,
                });
            }
        }
    }
    (
        ScheduleSnapshot::new("p1", schedules),
        LogSnapshot::new("p1", logs),
    )
}

proptest! {
    #[test]
    fn percent_stays_in_bounds(satisfied in 0u64..10_000, due in 0u64..10_000) {
        let rate = percent(satisfied, due);
        prop_assert!(rate <= 100);
        if due == 0 {
            prop_assert_eq!(rate, 0);
        }
    }

    #[test]
    fn engine_rate_stays_in_bounds(
        history in history(),
        now_day in 0i64..(HISTORY_DAYS as i64),
        window in 1u32..60,
    ) {
        let (schedules, logs) = build(&history);
        let now = origin() + Duration::days(now_day) + Duration::hours(12);
        let engine = AdherenceEngine::default();
        let rate = engine.compute_adherence_rate(&schedules, &logs, window, now).unwrap();
        prop_assert!(rate <= 100);
    }

    #[test]
    fn monthly_buckets_partition_the_month(
        history in history(),
        now_day in 0i64..(HISTORY_DAYS as i64),
    ) {
        let (schedules, logs) = build(&history);
        let now = origin() + Duration::days(now_day) + Duration::hours(12);
        let monthly = AdherenceEngine::default()
            .compute_monthly_summary(&schedules, &logs, now)
            .unwrap();
        prop_assert_eq!(
            monthly.taken_days + monthly.missed_days + monthly.remaining_days + monthly.no_medication_days,
            monthly.days_in_month
        );
    }

    #[test]
    fn streak_never_reaches_a_missed_day(
        history in history(),
        now_day in 0i64..(HISTORY_DAYS as i64),
        now_hour in 0i64..24,
    ) {
        let (schedules, logs) = build(&history);
        let now = origin() + Duration::days(now_day) + Duration::hours(now_hour);
        let view = AdherenceEngine::default().view(&schedules, &logs, now);
        let today = view.today();
        let streak = view.streak();

        let mut cursor = today.pred();
        while let Some(day) = cursor {
            if day.naive() < origin().date_naive() {
                break;
            }
            if view.daily_status(day).is_missed(today) {
                prop_assert!(i64::from(streak) <= today.days_since(day));
            }
            cursor = day.pred();
        }
    }

    #[test]
    fn repeated_intake_leaves_satisfied_count_unchanged(
        history in history(),
        now_day in 0i64..(HISTORY_DAYS as i64),
    ) {
        let (schedules, mut logs) = build(&history);
        let now = origin() + Duration::days(now_day) + Duration::hours(23);
        let engine = AdherenceEngine::default();
        let today = engine.view(&schedules, &logs, now).today();
        let before = engine.compute_daily_status(&schedules, &logs, today, now);

        let taken_today: Vec<IntakeLog> = logs
            .logs
            .iter()
            .filter(|l| engine.zone().day_of(l.taken_at) == today)
            .cloned()
            .collect();
        for (i, mut dup) in taken_today.into_iter().enumerate() {
            dup.id = format!("dup-{i}");
            logs.push(dup);
        }

        let after = engine.compute_daily_status(&schedules, &logs, today, now);
        prop_assert_eq!(before.satisfied_count, after.satisfied_count);
        prop_assert_eq!(before.status, after.status);
    }

    #[test]
    fn no_schedules_means_no_medications_every_day(
        now_day in 0i64..(HISTORY_DAYS as i64),
    ) {
        let (schedules, logs) = build(&[]);
        let now = origin() + Duration::days(now_day);
        let engine = AdherenceEngine::default();
        let view = engine.view(&schedules, &logs, now);
        prop_assert_eq!(view.today_status().status, DayStatus::NoMedications);
        prop_assert_eq!(view.adherence_rate(30).unwrap(), 0);
        prop_assert_eq!(view.streak(), 0);
    }
}
