//! Adherence engine.
//!
//! Composes the status classifier and the streak, rate and monthly
//! calculators over one patient's snapshots, and owns the intake recording
//! contract against the store.
//!
//! Every computation is a pure function of (schedules, logs, now). The engine
//! holds only the patient zone and window sizes, so one instance can serve
//! any number of patients from any number of threads.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::cache::SnapshotCache;
use super::monthly::{DayMark, MonthlyAdherence, MonthlyAggregator};
use super::rate::{AdherenceRateCalculator, DEFAULT_RATE_WINDOW_DAYS};
use super::snapshot::{
    DataWarning, IntakeIndex, LogSnapshot, PatientSnapshot, PreparedSchedules, ScheduleSnapshot,
};
use super::status::{DayStatus, DerivedDayStatus, StatusClassifier};
use super::streak::{StreakCalculator, DEFAULT_LOOKBACK_DAYS};
use crate::calendar::{CalendarDay, PatientZone};
use crate::error::{ComputationError, CoreError, StoreError, ValidationError};
use crate::medication::{IntakeLog, NewIntakeLog};
use crate::patient::{PatientContext, Profile};
use crate::storage::AdherenceStore;

pub const DEFAULT_RECENT_ACTIVITY_LIMIT: u32 = 5;

/// Name shown for logs whose schedule no longer exists.
pub const UNKNOWN_MEDICATION: &str = "Unknown Medication";

/// Window sizes used by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Maximum number of days the streak scan looks back.
    #[serde(default = "default_lookback_days")]
    pub lookback_days: u32,
    /// Trailing window of the adherence rate.
    #[serde(default = "default_rate_window_days")]
    pub rate_window_days: u32,
    #[serde(default = "default_recent_activity_limit")]
    pub recent_activity_limit: u32,
}

fn default_lookback_days() -> u32 {
    DEFAULT_LOOKBACK_DAYS
}
fn default_rate_window_days() -> u32 {
    DEFAULT_RATE_WINDOW_DAYS
}
fn default_recent_activity_limit() -> u32 {
    DEFAULT_RECENT_ACTIVITY_LIMIT
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            lookback_days: default_lookback_days(),
            rate_window_days: default_rate_window_days(),
            recent_activity_limit: default_recent_activity_limit(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdherenceSummary {
    pub rate: u32,
    pub streak: u32,
}

/// A request to record one intake.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntakeRequest {
    pub medication_id: String,
    pub patient_id: String,
    pub taken_at: DateTime<Utc>,
    pub proof_ref: Option<String>,
}

impl IntakeRequest {
    pub fn new(
        medication_id: impl Into<String>,
        patient_id: impl Into<String>,
        taken_at: DateTime<Utc>,
    ) -> Self {
        Self {
            medication_id: medication_id.into(),
            patient_id: patient_id.into(),
            taken_at,
            proof_ref: None,
        }
    }

    pub fn with_proof(mut self, proof_ref: impl Into<String>) -> Self {
        self.proof_ref = Some(proof_ref.into());
        self
    }

    fn into_new_log(self) -> NewIntakeLog {
        NewIntakeLog {
            medication_id: self.medication_id,
            patient_id: self.patient_id,
            taken_at: self.taken_at,
            proof_ref: self.proof_ref,
        }
    }
}

/// One entry of the recent activity feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecentActivity {
    pub log_id: String,
    pub medication_id: String,
    pub medication_name: String,
    pub taken_at: DateTime<Utc>,
    pub has_proof: bool,
}

/// Caretaker's per-patient line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatientOverview {
    pub patient_id: String,
    pub name: String,
    pub adherence_rate: u32,
    pub streak: u32,
    pub today: DayStatus,
}

/// Everything a dashboard shows for one patient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatientDashboard {
    pub patient_id: String,
    pub today: DerivedDayStatus,
    pub summary: AdherenceSummary,
    pub monthly: MonthlyAdherence,
    pub calendar: Vec<DayMark>,
    pub recent_activity: Vec<RecentActivity>,
    pub warnings: Vec<DataWarning>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct AdherenceEngine {
    zone: PatientZone,
    config: EngineConfig,
}

impl AdherenceEngine {
    pub fn new(zone: PatientZone, config: EngineConfig) -> Self {
        Self { zone, config }
    }

    pub fn with_zone(zone: PatientZone) -> Self {
        Self::new(zone, EngineConfig::default())
    }

    pub fn zone(&self) -> PatientZone {
        self.zone
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Prepare snapshots once for several reads at the same `now`.
    pub fn view<'a>(
        &self,
        schedules: &'a ScheduleSnapshot,
        logs: &'a LogSnapshot,
        now: DateTime<Utc>,
    ) -> AdherenceView<'a> {
        AdherenceView {
            engine: *self,
            schedules,
            logs,
            prepared: PreparedSchedules::prepare(schedules, self.zone),
            intakes: IntakeIndex::build(logs, self.zone),
            now,
            today: self.zone.day_of(now),
        }
    }

    pub fn view_snapshot<'a>(
        &self,
        snapshot: &'a PatientSnapshot,
        now: DateTime<Utc>,
    ) -> AdherenceView<'a> {
        self.view(&snapshot.schedules, &snapshot.logs, now)
    }

    pub fn compute_daily_status(
        &self,
        schedules: &ScheduleSnapshot,
        logs: &LogSnapshot,
        day: CalendarDay,
        now: DateTime<Utc>,
    ) -> DerivedDayStatus {
        self.view(schedules, logs, now).daily_status(day)
    }

    pub fn compute_streak(
        &self,
        schedules: &ScheduleSnapshot,
        logs: &LogSnapshot,
        now: DateTime<Utc>,
    ) -> u32 {
        self.view(schedules, logs, now).streak()
    }

    pub fn compute_adherence_rate(
        &self,
        schedules: &ScheduleSnapshot,
        logs: &LogSnapshot,
        window_days: u32,
        now: DateTime<Utc>,
    ) -> Result<u32, ComputationError> {
        self.view(schedules, logs, now).adherence_rate(window_days)
    }

    pub fn compute_monthly_summary(
        &self,
        schedules: &ScheduleSnapshot,
        logs: &LogSnapshot,
        now: DateTime<Utc>,
    ) -> Result<MonthlyAdherence, ComputationError> {
        self.view(schedules, logs, now).monthly_summary()
    }

    pub fn compute_summary(
        &self,
        schedules: &ScheduleSnapshot,
        logs: &LogSnapshot,
        now: DateTime<Utc>,
    ) -> Result<AdherenceSummary, ComputationError> {
        self.view(schedules, logs, now).summary()
    }

    /// First day of a `window_days` window ending on `today`.
    pub fn window_start(today: CalendarDay, window_days: u32) -> CalendarDay {
        today
            .offset(-(i64::from(window_days.max(1)) - 1))
            .unwrap_or(today)
    }

    /// Earliest day the configured calculators read at `today`: streak
    /// lookback, rate window or start of the month.
    pub fn default_first_day(&self, today: CalendarDay) -> CalendarDay {
        let span = self.config.lookback_days.max(self.config.rate_window_days);
        Self::window_start(today, span).min(today.first_of_month())
    }

    /// Fetch the schedules and the logs every computation at `now` needs.
    pub fn load_snapshot<S>(
        &self,
        store: &S,
        context: &PatientContext,
        now: DateTime<Utc>,
    ) -> Result<PatientSnapshot, StoreError>
    where
        S: AdherenceStore + ?Sized,
    {
        let today = self.zone.day_of(now);
        self.load_snapshot_from(store, context, self.default_first_day(today), now)
    }

    /// Like [`load_snapshot`](Self::load_snapshot), with logs reaching back
    /// to at least `first`.
    ///
    /// Callers reading days older than [`default_first_day`](Self::default_first_day),
    /// such as a wider rate window or a past date, must load through here.
    /// Days before the loaded span have no logs in the snapshot.
    pub fn load_snapshot_from<S>(
        &self,
        store: &S,
        context: &PatientContext,
        first: CalendarDay,
        now: DateTime<Utc>,
    ) -> Result<PatientSnapshot, StoreError>
    where
        S: AdherenceStore + ?Sized,
    {
        let patient_id = context.patient_id.as_str();
        let today = self.zone.day_of(now);
        let first = first.min(self.default_first_day(today));

        tracing::debug!(
            patient_id,
            viewer = %context.viewer_role,
            from = %first,
            to = %today,
            "loading adherence snapshot"
        );

        let schedules: Vec<_> = store
            .list_schedules(patient_id)?
            .into_iter()
            .filter(|s| s.patient_id == patient_id)
            .collect();
        let logs = store.list_logs(patient_id, &self.zone.days_range(first, today))?;

        Ok(PatientSnapshot {
            schedules: ScheduleSnapshot::new(patient_id, schedules),
            logs: LogSnapshot::new(patient_id, logs),
            loaded_at: now,
        })
    }

    /// Check that an intake can be recorded, without touching the store.
    fn validate_intake<S>(&self, store: &S, request: &IntakeRequest) -> Result<(), CoreError>
    where
        S: AdherenceStore + ?Sized,
    {
        if request.medication_id.trim().is_empty() {
            return Err(ValidationError::Required {
                field: "medication_id",
            }
            .into());
        }
        if request.patient_id.trim().is_empty() {
            return Err(ValidationError::Required {
                field: "patient_id",
            }
            .into());
        }

        let schedule = store.find_schedule(&request.medication_id)?.ok_or_else(|| {
            ValidationError::MedicationNotFound {
                medication_id: request.medication_id.clone(),
            }
        })?;

        if schedule.patient_id != request.patient_id {
            return Err(ValidationError::MedicationNotOwned {
                medication_id: request.medication_id.clone(),
                patient_id: request.patient_id.clone(),
            }
            .into());
        }
        Ok(())
    }

    /// Record one intake.
    ///
    /// # Errors
    /// - `Validation` if the medication is unknown or belongs to another
    ///   patient; nothing is written.
    /// - `Store` if the store fails; the store writes the log with a single
    ///   insert, so it holds either zero or one new record.
    ///
    /// Summaries computed before this call are stale once it succeeds.
    pub fn record_intake<S>(&self, store: &S, request: IntakeRequest) -> Result<IntakeLog, CoreError>
    where
        S: AdherenceStore + ?Sized,
    {
        self.validate_intake(store, &request)?;
        let log = store.insert_log(request.into_new_log())?;
        tracing::info!(
            log_id = %log.id,
            medication_id = %log.medication_id,
            patient_id = %log.patient_id,
            "intake recorded"
        );
        Ok(log)
    }

    /// Record one intake, showing it in the cached snapshot while the store
    /// write is in flight.
    ///
    /// On failure the cached snapshot is rolled back to its state before the
    /// call.
    pub fn record_intake_staged<S>(
        &self,
        store: &S,
        cache: &mut SnapshotCache,
        request: IntakeRequest,
    ) -> Result<IntakeLog, CoreError>
    where
        S: AdherenceStore + ?Sized,
    {
        self.validate_intake(store, &request)?;
        let new_log = request.into_new_log();
        let staged = cache.stage_intake(&new_log);

        match store.insert_log(new_log) {
            Ok(log) => {
                if let Some(staged) = staged {
                    cache.commit(staged, log.clone());
                }
                tracing::info!(log_id = %log.id, medication_id = %log.medication_id, "intake recorded");
                Ok(log)
            }
            Err(e) => {
                if let Some(staged) = staged {
                    cache.rollback(staged);
                }
                tracing::warn!(error = %e, "intake not recorded; staged change rolled back");
                Err(e.into())
            }
        }
    }

    /// Adherence rate, streak and today's status for each patient.
    pub fn patient_overview<S>(
        &self,
        store: &S,
        patients: &[Profile],
        now: DateTime<Utc>,
    ) -> Result<Vec<PatientOverview>, CoreError>
    where
        S: AdherenceStore + ?Sized,
    {
        patients
            .iter()
            .map(|patient| -> Result<PatientOverview, CoreError> {
                let context = PatientContext::caretaker_of(patient.id.clone());
                let snapshot = self.load_snapshot(store, &context, now)?;
                let view = self.view_snapshot(&snapshot, now);
                Ok(PatientOverview {
                    patient_id: patient.id.clone(),
                    name: patient.name.clone(),
                    adherence_rate: view.adherence_rate(self.config.rate_window_days)?,
                    streak: view.streak(),
                    today: view.today_status().status,
                })
            })
            .collect()
    }
}

/// Prepared snapshots of one patient at a fixed `now`.
#[derive(Debug, Clone)]
pub struct AdherenceView<'a> {
    engine: AdherenceEngine,
    schedules: &'a ScheduleSnapshot,
    logs: &'a LogSnapshot,
    prepared: PreparedSchedules<'a>,
    intakes: IntakeIndex,
    now: DateTime<Utc>,
    today: CalendarDay,
}

impl AdherenceView<'_> {
    pub fn today(&self) -> CalendarDay {
        self.today
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.now
    }

    pub fn warnings(&self) -> &[DataWarning] {
        self.prepared.warnings()
    }

    pub fn daily_status(&self, day: CalendarDay) -> DerivedDayStatus {
        StatusClassifier::new(self.engine.zone).classify(
            day,
            &self.prepared,
            &self.intakes,
            self.now,
        )
    }

    pub fn today_status(&self) -> DerivedDayStatus {
        self.daily_status(self.today)
    }

    pub fn streak(&self) -> u32 {
        tracing::debug!(today = %self.today, "computing streak");
        StreakCalculator::with_lookback(self.engine.config.lookback_days).calculate(
            self.today,
            self.prepared.history_start(),
            |day| self.daily_status(day),
        )
    }

    pub fn adherence_rate(&self, window_days: u32) -> Result<u32, ComputationError> {
        tracing::debug!(today = %self.today, window_days, "computing adherence rate");
        AdherenceRateCalculator::with_window(window_days)
            .calculate(self.today, |day| self.daily_status(day))
    }

    pub fn monthly_summary(&self) -> Result<MonthlyAdherence, ComputationError> {
        let rate = self.adherence_rate(self.engine.config.rate_window_days)?;
        MonthlyAggregator::new().aggregate(self.today, rate, |day| self.daily_status(day))
    }

    pub fn month_calendar(&self) -> Vec<DayMark> {
        MonthlyAggregator::new().calendar(self.today, |day| self.daily_status(day))
    }

    pub fn summary(&self) -> Result<AdherenceSummary, ComputationError> {
        Ok(AdherenceSummary {
            rate: self.adherence_rate(self.engine.config.rate_window_days)?,
            streak: self.streak(),
        })
    }

    /// The latest `limit` intakes, newest first.
    pub fn recent_activity(&self, limit: usize) -> Vec<RecentActivity> {
        let mut logs: Vec<&IntakeLog> = self.logs.logs.iter().collect();
        logs.sort_by(|a, b| b.taken_at.cmp(&a.taken_at).then_with(|| b.id.cmp(&a.id)));

        logs.into_iter()
            .take(limit)
            .map(|log| RecentActivity {
                log_id: log.id.clone(),
                medication_id: log.medication_id.clone(),
                medication_name: self
                    .schedules
                    .find(&log.medication_id)
                    .map(|s| s.name.clone())
                    .unwrap_or_else(|| UNKNOWN_MEDICATION.to_string()),
                taken_at: log.taken_at,
                has_proof: log.has_proof(),
            })
            .collect()
    }

    pub fn dashboard(&self) -> Result<PatientDashboard, ComputationError> {
        Ok(PatientDashboard {
            patient_id: self.schedules.patient_id.clone(),
            today: self.today_status(),
            summary: self.summary()?,
            monthly: self.monthly_summary()?,
            calendar: self.month_calendar(),
            recent_activity: self.recent_activity(self.engine.config.recent_activity_limit as usize),
            warnings: self.warnings().to_vec(),
        })
    }
}
