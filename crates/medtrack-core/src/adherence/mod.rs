//! Adherence computation.
//!
//! Leaf to root: snapshots are prepared and indexed, the classifier derives
//! one day's status, the streak/rate/monthly calculators fold over days, and
//! the engine composes them for one patient at a given `now`.

mod cache;
mod engine;
mod monthly;
mod rate;
mod snapshot;
mod status;
mod streak;

pub use cache::{SnapshotCache, StagedIntake};
pub use engine::{
    AdherenceEngine, AdherenceSummary, AdherenceView, EngineConfig, IntakeRequest,
    PatientDashboard, PatientOverview, RecentActivity, DEFAULT_RECENT_ACTIVITY_LIMIT,
    UNKNOWN_MEDICATION,
};
pub use monthly::{CalendarMark, DayMark, MonthlyAdherence, MonthlyAggregator};
pub use rate::{percent, AdherenceRateCalculator, DoseDayTotals, DEFAULT_RATE_WINDOW_DAYS};
pub use snapshot::{
    DataWarning, IntakeIndex, LogSnapshot, PatientSnapshot, PreparedSchedule, PreparedSchedules,
    ScheduleSnapshot,
};
pub use status::{DayStatus, DerivedDayStatus, DoseState, DoseStatus, StatusClassifier};
pub use streak::{StreakCalculator, DEFAULT_LOOKBACK_DAYS};
