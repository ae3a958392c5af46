//! Current-month breakdown and calendar marks.
//!
//! Every day of the month falls in exactly one bucket:
//! - **taken**: on or before today, completed
//! - **missed**: on or before today, doses due and not all taken
//! - **no medications**: on or before today, nothing due
//! - **remaining**: after today

use serde::{Deserialize, Serialize};

use super::status::{DayStatus, DerivedDayStatus};
use crate::calendar::CalendarDay;
use crate::error::ComputationError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthlyAdherence {
    pub year: i32,
    pub month: u32,
    pub days_in_month: u32,
    /// Trailing-window adherence rate, reported alongside the buckets
    pub rate: u32,
    pub taken_days: u32,
    pub missed_days: u32,
    pub remaining_days: u32,
    pub no_medication_days: u32,
}

/// How a day is drawn on the adherence calendar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CalendarMark {
    Taken,
    Missed,
    /// Today, with doses still open
    Pending,
    NoMedications,
    Upcoming,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayMark {
    pub date: CalendarDay,
    pub mark: CalendarMark,
    pub due_count: u32,
    pub satisfied_count: u32,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct MonthlyAggregator;

impl MonthlyAggregator {
    pub fn new() -> Self {
        Self
    }

    /// Bucket every day of the month containing `today`.
    ///
    /// Future days are counted as remaining without being classified.
    pub fn aggregate<F>(
        &self,
        today: CalendarDay,
        rate: u32,
        mut status_of: F,
    ) -> Result<MonthlyAdherence, ComputationError>
    where
        F: FnMut(CalendarDay) -> DerivedDayStatus,
    {
        let mut summary = MonthlyAdherence {
            year: today.year(),
            month: today.month(),
            days_in_month: today.days_in_month(),
            rate,
            taken_days: 0,
            missed_days: 0,
            remaining_days: 0,
            no_medication_days: 0,
        };

        for day in today.month_days() {
            if day > today {
                summary.remaining_days += 1;
                continue;
            }
            let status = status_of(day);
            status.check()?;
            match status.status {
                DayStatus::Completed => summary.taken_days += 1,
                DayStatus::Pending => summary.missed_days += 1,
                DayStatus::NoMedications => summary.no_medication_days += 1,
            }
        }

        let sum = summary.taken_days
            + summary.missed_days
            + summary.remaining_days
            + summary.no_medication_days;
        if sum != summary.days_in_month {
            return Err(ComputationError::PartitionMismatch {
                year: summary.year,
                month: summary.month,
                sum,
                expected: summary.days_in_month,
            });
        }

        Ok(summary)
    }

    /// One mark per day of the month containing `today`.
    pub fn calendar<F>(&self, today: CalendarDay, mut status_of: F) -> Vec<DayMark>
    where
        F: FnMut(CalendarDay) -> DerivedDayStatus,
    {
        today
            .month_days()
            .map(|day| {
                if day > today {
                    return DayMark {
                        date: day,
                        mark: CalendarMark::Upcoming,
                        due_count: 0,
                        satisfied_count: 0,
                    };
                }
                let status = status_of(day);
                let mark = match status.status {
                    DayStatus::Completed => CalendarMark::Taken,
                    DayStatus::NoMedications => CalendarMark::NoMedications,
                    DayStatus::Pending if day == today => CalendarMark::Pending,
                    DayStatus::Pending => CalendarMark::Missed,
                };
                DayMark {
                    date: day,
                    mark,
                    due_count: status.due_count,
                    satisfied_count: status.satisfied_count,
                }
            })
            .collect()
    }
}
