//! Adherence rate over a trailing window of days.
//!
//! The rate is computed over dose-days (one due schedule on one day), so a
//! patient with two daily medications has to take both to get full credit
//! for the day. Logging the same dose twice never pushes it above 100.

use super::status::DerivedDayStatus;
use crate::calendar::CalendarDay;
use crate::error::ComputationError;

pub const DEFAULT_RATE_WINDOW_DAYS: u32 = 30;

/// Integer percentage of `satisfied` over `due`, rounded half up.
///
/// Returns 0 when nothing was due.
pub fn percent(satisfied: u64, due: u64) -> u32 {
    if due == 0 {
        return 0;
    }
    let satisfied = satisfied.min(due);
    ((satisfied * 200 + due) / (2 * due)) as u32
}

/// Totals of a window, kept alongside the rate for reporting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DoseDayTotals {
    pub due: u64,
    pub satisfied: u64,
}

impl DoseDayTotals {
    pub fn rate(&self) -> u32 {
        percent(self.satisfied, self.due)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct AdherenceRateCalculator {
    window_days: u32,
}

impl Default for AdherenceRateCalculator {
    fn default() -> Self {
        Self {
            window_days: DEFAULT_RATE_WINDOW_DAYS,
        }
    }
}

impl AdherenceRateCalculator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_window(window_days: u32) -> Self {
        Self { window_days }
    }

    pub fn window_days(&self) -> u32 {
        self.window_days
    }

    /// Sum dose-days over the window ending at `today` (inclusive).
    pub fn totals<F>(
        &self,
        today: CalendarDay,
        mut status_of: F,
    ) -> Result<DoseDayTotals, ComputationError>
    where
        F: FnMut(CalendarDay) -> DerivedDayStatus,
    {
        let mut totals = DoseDayTotals::default();
        let mut cursor = Some(today);

        for _ in 0..self.window_days {
            let Some(day) = cursor else { break };
            let status = status_of(day);
            status.check()?;
            totals.due += u64::from(status.due_count);
            totals.satisfied += u64::from(status.satisfied_count);
            cursor = day.pred();
        }

        Ok(totals)
    }

    /// Adherence percentage over the window ending at `today`.
    pub fn calculate<F>(&self, today: CalendarDay, status_of: F) -> Result<u32, ComputationError>
    where
        F: FnMut(CalendarDay) -> DerivedDayStatus,
    {
        self.totals(today, status_of).map(|t| t.rate())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adherence::status::DayStatus;

    fn jan(d: u32) -> CalendarDay {
        CalendarDay::from_ymd(2024, 1, d).unwrap()
    }

    #[test]
    fn percent_rounds_half_up() {
        assert_eq!(percent(0, 0), 0);
        assert_eq!(percent(1, 2), 50);
        assert_eq!(percent(1, 3), 33);
        assert_eq!(percent(2, 3), 67);
        assert_eq!(percent(1, 8), 13); // 12.5
        assert_eq!(percent(5, 5), 100);
    }

    #[test]
    fn percent_never_exceeds_100() {
        assert_eq!(percent(9, 3), 100);
    }

    #[test]
    fn window_counts_dose_days() {
        // Two meds due every day; both taken on 2 of 4 days, one on the rest.
        let calc = AdherenceRateCalculator::with_window(4);
        let totals = calc
            .totals(jan(10), |d| {
                let sat = if d.day() % 2 == 0 { 2 } else { 1 };
                DerivedDayStatus::from_counts(d, 2, sat)
            })
            .unwrap();
        assert_eq!(totals, DoseDayTotals { due: 8, satisfied: 6 });
        assert_eq!(totals.rate(), 75);
    }

    #[test]
    fn window_includes_today_and_stops_at_its_length() {
        let calc = AdherenceRateCalculator::with_window(3);
        let mut seen = Vec::new();
        calc.calculate(jan(10), |d| {
            seen.push(d);
            DerivedDayStatus::from_counts(d, 0, 0)
        })
        .unwrap();
        assert_eq!(seen, vec![jan(10), jan(9), jan(8)]);
    }

    #[test]
    fn nothing_due_gives_zero() {
        let calc = AdherenceRateCalculator::new();
        let rate = calc
            .calculate(jan(10), |d| DerivedDayStatus::from_counts(d, 0, 0))
            .unwrap();
        assert_eq!(rate, 0);
    }

    #[test]
    fn inconsistent_day_is_a_computation_error() {
        let calc = AdherenceRateCalculator::with_window(1);
        let result = calc.calculate(jan(10), |d| DerivedDayStatus {
            date: d,
            due_count: 1,
            satisfied_count: 3,
            status: DayStatus::Completed,
            doses: Vec::new(),
        });
        assert!(result.is_err());
    }
}
