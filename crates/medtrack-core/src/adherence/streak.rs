//! Consecutive-day adherence streak.
//!
//! Walks backward from today one local day at a time:
//! - a completed day, or a day with nothing due, extends the streak
//! - a past day with an untaken dose ends it
//! - today while still pending is skipped: it neither ends nor extends it
//!
//! The walk stops at the lookback limit and at the patient's history start,
//! so days before any schedule existed are never counted.

use super::status::{DayStatus, DerivedDayStatus};
use crate::calendar::CalendarDay;

pub const DEFAULT_LOOKBACK_DAYS: u32 = 365;

#[derive(Debug, Clone, Copy)]
pub struct StreakCalculator {
    lookback_days: u32,
}

impl Default for StreakCalculator {
    fn default() -> Self {
        Self {
            lookback_days: DEFAULT_LOOKBACK_DAYS,
        }
    }
}

impl StreakCalculator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_lookback(lookback_days: u32) -> Self {
        Self { lookback_days }
    }

    pub fn lookback_days(&self) -> u32 {
        self.lookback_days
    }

    /// Count the streak ending at `today`.
    ///
    /// # Arguments
    /// * `today` - The patient's current local day
    /// * `history_start` - First day any schedule could be due; `None` if
    ///   the patient has no countable schedule
    /// * `status_of` - Classifies a single day
    pub fn calculate<F>(
        &self,
        today: CalendarDay,
        history_start: Option<CalendarDay>,
        mut status_of: F,
    ) -> u32
    where
        F: FnMut(CalendarDay) -> DerivedDayStatus,
    {
        let Some(start) = history_start else {
            return 0;
        };

        let mut streak = 0;
        let mut cursor = Some(today);

        for _ in 0..self.lookback_days {
            let Some(day) = cursor else { break };
            if day < start {
                break;
            }

            match status_of(day).status {
                DayStatus::Completed | DayStatus::NoMedications => streak += 1,
                DayStatus::Pending if day == today => {}
                DayStatus::Pending => break,
            }

            cursor = day.pred();
        }

        streak
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn jan(d: u32) -> CalendarDay {
        CalendarDay::from_ymd(2024, 1, d).unwrap()
    }

    /// Days absent from `days` have one dose due and none taken.
    fn ledger(days: &[(u32, u32, u32)]) -> impl FnMut(CalendarDay) -> DerivedDayStatus {
        let map: HashMap<CalendarDay, (u32, u32)> =
            days.iter().map(|&(d, due, sat)| (jan(d), (due, sat))).collect();
        move |day| {
            let (due, sat) = map.get(&day).copied().unwrap_or((1, 0));
            DerivedDayStatus::from_counts(day, due, sat)
        }
    }

    #[test]
    fn three_completed_days_give_three() {
        let calc = StreakCalculator::new();
        let streak = calc.calculate(
            jan(10),
            Some(jan(1)),
            ledger(&[(8, 1, 1), (9, 1, 1), (10, 1, 1)]),
        );
        assert_eq!(streak, 3);
    }

    #[test]
    fn pending_today_neither_breaks_nor_counts() {
        let calc = StreakCalculator::new();
        let streak = calc.calculate(
            jan(10),
            Some(jan(1)),
            ledger(&[(8, 1, 1), (9, 1, 1), (10, 1, 0)]),
        );
        assert_eq!(streak, 2);
    }

    #[test]
    fn missed_day_stops_the_walk() {
        let calc = StreakCalculator::new();
        let streak = calc.calculate(
            jan(10),
            Some(jan(1)),
            ledger(&[(5, 1, 1), (6, 1, 1), (8, 1, 1), (9, 1, 1), (10, 1, 1)]),
        );
        assert_eq!(streak, 3);
    }

    #[test]
    fn days_with_nothing_due_bridge_the_streak() {
        let calc = StreakCalculator::new();
        let streak = calc.calculate(
            jan(10),
            Some(jan(7)),
            ledger(&[(7, 1, 1), (8, 0, 0), (9, 0, 0), (10, 1, 1)]),
        );
        assert_eq!(streak, 4);
    }

    #[test]
    fn walk_stops_at_history_start() {
        let calc = StreakCalculator::new();
        let streak = calc.calculate(jan(10), Some(jan(9)), ledger(&[(9, 1, 1), (10, 1, 1)]));
        assert_eq!(streak, 2);
    }

    #[test]
    fn no_history_means_zero() {
        let calc = StreakCalculator::new();
        assert_eq!(calc.calculate(jan(10), None, |d| DerivedDayStatus::from_counts(d, 0, 0)), 0);
    }

    #[test]
    fn lookback_caps_the_walk() {
        let calc = StreakCalculator::with_lookback(7);
        let streak = calc.calculate(
            CalendarDay::from_ymd(2024, 6, 1).unwrap(),
            CalendarDay::from_ymd(2020, 1, 1),
            |d| DerivedDayStatus::from_counts(d, 1, 1),
        );
        assert_eq!(streak, 7);
    }

    #[test]
    fn future_history_start_gives_zero() {
        let calc = StreakCalculator::new();
        let streak = calc.calculate(jan(10), Some(jan(12)), |d| {
            DerivedDayStatus::from_counts(d, 0, 0)
        });
        assert_eq!(streak, 0);
    }
}
