//! Patient-local calendar days.
//!
//! Adherence is judged per calendar day as the patient experiences it, so
//! every instant is mapped into the patient's time zone before it is compared
//! with a day. `CalendarDay` is compared structurally (year, month, day) and
//! never by formatting to strings.

use std::fmt;
use std::str::FromStr;

use chrono::{
    DateTime, Datelike, Duration, LocalResult, NaiveDate, NaiveDateTime, NaiveTime, TimeZone,
    Utc,
};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// A calendar day in the patient's local time zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CalendarDay(NaiveDate);

impl CalendarDay {
    pub fn from_ymd(year: i32, month: u32, day: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, day).map(Self)
    }

    pub fn from_naive(date: NaiveDate) -> Self {
        Self(date)
    }

    pub fn naive(self) -> NaiveDate {
        self.0
    }

    pub fn year(self) -> i32 {
        self.0.year()
    }

    pub fn month(self) -> u32 {
        self.0.month()
    }

    pub fn day(self) -> u32 {
        self.0.day()
    }

    /// The day before, or `None` at the start of the supported range.
    pub fn pred(self) -> Option<Self> {
        self.0.pred_opt().map(Self)
    }

    pub fn succ(self) -> Option<Self> {
        self.0.succ_opt().map(Self)
    }

    /// Move `days` forward (or backward when negative).
    pub fn offset(self, days: i64) -> Option<Self> {
        self.0.checked_add_signed(Duration::days(days)).map(Self)
    }

    /// Whole days from `earlier` to `self`; negative if `earlier` is later.
    pub fn days_since(self, earlier: CalendarDay) -> i64 {
        (self.0 - earlier.0).num_days()
    }

    pub fn first_of_month(self) -> Self {
        Self(self.0.with_day(1).unwrap_or(self.0))
    }

    pub fn days_in_month(self) -> u32 {
        let (year, month) = if self.month() == 12 {
            (self.year() + 1, 1)
        } else {
            (self.year(), self.month() + 1)
        };
        NaiveDate::from_ymd_opt(year, month, 1)
            .and_then(|next| next.pred_opt())
            .map(|last| last.day())
            .unwrap_or(31)
    }

    /// All days of the month containing `self`, in order.
    pub fn month_days(self) -> impl Iterator<Item = CalendarDay> {
        let first = self.first_of_month();
        (0..self.days_in_month() as i64).filter_map(move |i| first.offset(i))
    }
}

impl fmt::Display for CalendarDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%d"))
    }
}

impl FromStr for CalendarDay {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
            .map(Self)
            .map_err(|e| ValidationError::InvalidValue {
                field: "date".into(),
                message: format!("'{s}' is not a YYYY-MM-DD date ({e})"),
            })
    }
}

/// Inclusive range of instants, used to query intake logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl DateRange {
    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.start <= instant && instant <= self.end
    }
}

/// The time zone a patient's calendar days are anchored to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PatientZone(Tz);

impl Default for PatientZone {
    fn default() -> Self {
        Self(Tz::UTC)
    }
}

impl PatientZone {
    pub fn new(tz: Tz) -> Self {
        Self(tz)
    }

    pub fn utc() -> Self {
        Self::default()
    }

    /// Parse an IANA zone name such as `Europe/Berlin`.
    pub fn parse(name: &str) -> Result<Self, ValidationError> {
        name.trim()
            .parse::<Tz>()
            .map(Self)
            .map_err(|_| ValidationError::InvalidValue {
                field: "timezone".into(),
                message: format!("unknown time zone '{name}'"),
            })
    }

    pub fn name(&self) -> &'static str {
        self.0.name()
    }

    /// The local calendar day an instant falls on.
    pub fn day_of(&self, instant: DateTime<Utc>) -> CalendarDay {
        CalendarDay(instant.with_timezone(&self.0).date_naive())
    }

    /// The instant of a local wall-clock time on `day`.
    ///
    /// Ambiguous times resolve to the earlier instant; times inside a DST gap
    /// move forward to the first valid instant.
    pub fn at(&self, day: CalendarDay, time: NaiveTime) -> DateTime<Utc> {
        self.resolve(day.0.and_time(time))
    }

    /// Local midnight starting `day`.
    pub fn start_of(&self, day: CalendarDay) -> DateTime<Utc> {
        self.at(day, NaiveTime::MIN)
    }

    /// Last millisecond of `day` (23:59:59.999 local).
    pub fn end_of(&self, day: CalendarDay) -> DateTime<Utc> {
        match day.succ() {
            Some(next) => self.start_of(next) - Duration::milliseconds(1),
            None => DateTime::<Utc>::MAX_UTC,
        }
    }

    pub fn day_range(&self, day: CalendarDay) -> DateRange {
        self.days_range(day, day)
    }

    /// From the start of `first` to the end of `last`.
    pub fn days_range(&self, first: CalendarDay, last: CalendarDay) -> DateRange {
        DateRange {
            start: self.start_of(first),
            end: self.end_of(last),
        }
    }

    fn resolve(&self, naive: NaiveDateTime) -> DateTime<Utc> {
        let mut probe = naive;
        // DST gaps are at most a couple of hours; step through them.
        for _ in 0..16 {
            match self.0.from_local_datetime(&probe) {
                LocalResult::Single(t) | LocalResult::Ambiguous(t, _) => {
                    return t.with_timezone(&Utc)
                }
                LocalResult::None => probe += Duration::minutes(15),
            }
        }
        Utc.from_utc_datetime(&naive)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> CalendarDay {
        CalendarDay::from_ymd(y, m, d).unwrap()
    }

    #[test]
    fn days_in_month_handles_leap_years() {
        assert_eq!(day(2024, 2, 10).days_in_month(), 29);
        assert_eq!(day(2023, 2, 10).days_in_month(), 28);
        assert_eq!(day(2024, 12, 31).days_in_month(), 31);
        assert_eq!(day(2024, 4, 1).days_in_month(), 30);
    }

    #[test]
    fn month_days_covers_whole_month() {
        let days: Vec<_> = day(2024, 2, 17).month_days().collect();
        assert_eq!(days.len(), 29);
        assert_eq!(days[0], day(2024, 2, 1));
        assert_eq!(days[28], day(2024, 2, 29));
    }

    #[test]
    fn parse_and_display() {
        let d: CalendarDay = "2024-03-05".parse().unwrap();
        assert_eq!(d, day(2024, 3, 5));
        assert_eq!(d.to_string(), "2024-03-05");
        assert!("03/05/2024".parse::<CalendarDay>().is_err());
    }

    #[test]
    fn days_since_and_offset() {
        let a = day(2024, 1, 30);
        let b = a.offset(3).unwrap();
        assert_eq!(b, day(2024, 2, 2));
        assert_eq!(b.days_since(a), 3);
        assert_eq!(a.days_since(b), -3);
    }

    #[test]
    fn day_of_uses_patient_zone() {
        let tokyo = PatientZone::parse("Asia/Tokyo").unwrap();
        // 2024-01-15 20:00 UTC is already the 16th in Tokyo.
        let instant = Utc.with_ymd_and_hms(2024, 1, 15, 20, 0, 0).unwrap();
        assert_eq!(tokyo.day_of(instant), day(2024, 1, 16));
        assert_eq!(PatientZone::utc().day_of(instant), day(2024, 1, 15));
    }

    #[test]
    fn day_range_is_inclusive_to_the_millisecond() {
        let zone = PatientZone::utc();
        let range = zone.day_range(day(2024, 1, 15));
        assert_eq!(range.start, Utc.with_ymd_and_hms(2024, 1, 15, 0, 0, 0).unwrap());
        assert_eq!(
            range.end,
            Utc.with_ymd_and_hms(2024, 1, 15, 23, 59, 59).unwrap() + Duration::milliseconds(999)
        );
        assert!(range.contains(range.end));
        assert!(!range.contains(range.end + Duration::milliseconds(1)));
    }

    #[test]
    fn start_of_day_inside_dst_gap_moves_forward() {
        // Havana skips from 00:00 to 01:00 on its spring-forward day.
        let havana = PatientZone::parse("America/Havana").unwrap();
        let gap_day = day(2024, 3, 10);
        let start = havana.start_of(gap_day);
        assert_eq!(havana.day_of(start), gap_day);
        assert!(havana.end_of(gap_day) > start);
    }

    #[test]
    fn unknown_zone_is_rejected() {
        assert!(PatientZone::parse("Mars/Olympus").is_err());
    }
}
