//! Calendar points for the checkpoint scheduler.
//!
//! The engine only cares about three instants per month (days 1, 15 and 30),
//! so a point is packed into one sortable integer `YYYYMMDD` instead of going
//! through jiff's `Span` machinery in the hot loop. Conversions to and from
//! `jiff::civil::Date` exist for presentation and for callers that start from
//! a real date.

use std::fmt;

use jiff::civil::Date;
use serde::{Deserialize, Serialize};

/// Fast leap year check.
#[inline]
pub fn is_leap_year(year: i16) -> bool {
    (year % 4 == 0 && year % 100 != 0) || (year % 400 == 0)
}

/// Days in a month without constructing a `jiff::civil::Date`.
#[inline]
pub fn days_in_month(year: i16, month: i8) -> i8 {
    const DAYS: [i8; 12] = [31, 28, 31, 30, 31, 30, 31, 31, 30, 31, 30, 31];
    if month == 2 && is_leap_year(year) {
        29
    } else {
        DAYS[(month - 1) as usize]
    }
}

/// The three per-month instants the engine recognizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Checkpoint {
    /// Day 1: lifecycle, income recognition, income-side transfers.
    StartOfMonth,
    /// Day 15: escrow accrual.
    MidMonth,
    /// Day 30: expense settlement, growth, withholding.
    EndOfMonth,
}

impl Checkpoint {
    #[must_use]
    pub const fn day(self) -> u8 {
        match self {
            Checkpoint::StartOfMonth => 1,
            Checkpoint::MidMonth => 15,
            Checkpoint::EndOfMonth => 30,
        }
    }

    #[must_use]
    pub const fn from_day(day: u8) -> Option<Self> {
        match day {
            1 => Some(Checkpoint::StartOfMonth),
            15 => Some(Checkpoint::MidMonth),
            30 => Some(Checkpoint::EndOfMonth),
            _ => None,
        }
    }
}

/// Year, month and checkpoint day encoded as `year * 10_000 + month * 100 + day`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CalendarPoint(u32);

impl CalendarPoint {
    /// Build a point. Month is clamped to 1..=12 and day to 1..=30.
    #[must_use]
    pub fn new(year: u16, month: u8, day: u8) -> Self {
        let month = month.clamp(1, 12);
        let day = day.clamp(1, 30);
        CalendarPoint(u32::from(year) * 10_000 + u32::from(month) * 100 + u32::from(day))
    }

    /// Day 1 of the given month.
    #[must_use]
    pub fn month_start(year: u16, month: u8) -> Self {
        Self::new(year, month, 1)
    }

    /// Day 30 of the given month.
    #[must_use]
    pub fn month_end(year: u16, month: u8) -> Self {
        Self::new(year, month, 30)
    }

    #[must_use]
    pub const fn encoded(self) -> u32 {
        self.0
    }

    /// Decode a raw `YYYYMMDD` integer, rejecting impossible months or days.
    #[must_use]
    pub fn from_encoded(raw: u32) -> Option<Self> {
        let year = raw / 10_000;
        let month = (raw / 100) % 100;
        let day = raw % 100;
        if year == 0 || !(1..=12).contains(&month) || !(1..=30).contains(&day) {
            return None;
        }
        Some(CalendarPoint(raw))
    }

    #[must_use]
    pub const fn year(self) -> u16 {
        (self.0 / 10_000) as u16
    }

    #[must_use]
    pub const fn month(self) -> u8 {
        ((self.0 / 100) % 100) as u8
    }

    #[must_use]
    pub const fn day(self) -> u8 {
        (self.0 % 100) as u8
    }

    #[must_use]
    pub fn checkpoint(self) -> Option<Checkpoint> {
        Checkpoint::from_day(self.day())
    }

    #[must_use]
    pub fn is_new_year(self) -> bool {
        self.month() == 1 && self.day() == 1
    }

    /// Same year and month, ignoring the day.
    #[must_use]
    pub fn same_month(self, other: CalendarPoint) -> bool {
        self.0 / 100 == other.0 / 100
    }

    /// Day 1 of this point's month.
    #[must_use]
    pub fn first_of_month(self) -> Self {
        CalendarPoint(self.0 / 100 * 100 + 1)
    }

    /// Day 30 of this point's month.
    #[must_use]
    pub fn end_of_month(self) -> Self {
        CalendarPoint(self.0 / 100 * 100 + 30)
    }

    /// Step by whole months, keeping the day.
    #[must_use]
    pub fn add_months(self, months: i32) -> Self {
        let index = self.month_index() + months;
        let year = index.div_euclid(12);
        let month = index.rem_euclid(12) + 1;
        Self::new(year.max(1) as u16, month as u8, self.day())
    }

    /// Whole months from `self` to `later` (negative when `later` is earlier).
    #[must_use]
    pub fn months_until(self, later: CalendarPoint) -> i32 {
        later.month_index() - self.month_index()
    }

    /// The next checkpoint: 1 -> 15 -> 30 -> day 1 of the following month.
    #[must_use]
    pub fn next_checkpoint(self) -> Self {
        match self.day() {
            d if d < 15 => Self::new(self.year(), self.month(), 15),
            d if d < 30 => Self::new(self.year(), self.month(), 30),
            _ => self.first_of_month().add_months(1),
        }
    }

    /// Convert to a civil date, clamping day 30 to the month's length.
    #[must_use]
    pub fn to_date(self) -> Date {
        let year = self.year() as i16;
        let month = self.month() as i8;
        let day = (self.day() as i8).min(days_in_month(year, month));
        jiff::civil::date(year, month, day)
    }

    /// Snap a civil date to the checkpoint on or before it.
    #[must_use]
    pub fn from_date(date: Date) -> Self {
        let day = match date.day() {
            d if d >= 30 || d == days_in_month(date.year(), date.month()) => 30,
            d if d >= 15 => 15,
            _ => 1,
        };
        Self::new(date.year().max(1) as u16, date.month() as u8, day)
    }

    fn month_index(self) -> i32 {
        i32::from(self.year()) * 12 + i32::from(self.month()) - 1
    }
}

impl fmt::Display for CalendarPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}-{:02}", self.year(), self.month(), self.day())
    }
}

/// A year/month pair used for account windows in snapshot records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct YearMonth {
    pub year: u16,
    pub month: u8,
}

impl YearMonth {
    #[must_use]
    pub const fn new(year: u16, month: u8) -> Self {
        YearMonth { year, month }
    }

    #[must_use]
    pub fn is_valid(self) -> bool {
        self.year > 0 && (1..=12).contains(&self.month)
    }

    #[must_use]
    pub fn start(self) -> CalendarPoint {
        CalendarPoint::month_start(self.year, self.month)
    }

    #[must_use]
    pub fn end(self) -> CalendarPoint {
        CalendarPoint::month_end(self.year, self.month)
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jiff::civil::date;

    #[test]
    fn test_encoding_sorts_chronologically() {
        let a = CalendarPoint::new(2024, 12, 30);
        let b = CalendarPoint::new(2025, 1, 1);
        let c = CalendarPoint::new(2025, 1, 15);
        assert!(a < b && b < c);
        assert_eq!(b.encoded(), 20_250_101);
        assert_eq!(c.year(), 2025);
        assert_eq!(c.month(), 1);
        assert_eq!(c.day(), 15);
    }

    #[test]
    fn test_next_checkpoint_cycle() {
        let p = CalendarPoint::new(2025, 12, 1);
        let p = p.next_checkpoint();
        assert_eq!(p, CalendarPoint::new(2025, 12, 15));
        let p = p.next_checkpoint();
        assert_eq!(p, CalendarPoint::new(2025, 12, 30));
        let p = p.next_checkpoint();
        assert_eq!(p, CalendarPoint::new(2026, 1, 1));
        assert!(p.is_new_year());
    }

    #[test]
    fn test_month_stepping() {
        let p = CalendarPoint::new(2025, 11, 15);
        assert_eq!(p.add_months(3), CalendarPoint::new(2026, 2, 15));
        assert_eq!(p.add_months(-11), CalendarPoint::new(2024, 12, 15));
        assert_eq!(p.months_until(CalendarPoint::new(2026, 11, 1)), 12);
        assert_eq!(CalendarPoint::new(2026, 1, 1).months_until(p), -2);
    }

    #[test]
    fn test_from_encoded_rejects_garbage() {
        assert!(CalendarPoint::from_encoded(20_251_301).is_none());
        assert!(CalendarPoint::from_encoded(20_250_131).is_none());
        assert_eq!(
            CalendarPoint::from_encoded(20_250_215),
            Some(CalendarPoint::new(2025, 2, 15))
        );
    }

    #[test]
    fn test_to_date_clamps_february() {
        assert_eq!(CalendarPoint::new(2025, 2, 30).to_date(), date(2025, 2, 28));
        assert_eq!(CalendarPoint::new(2024, 2, 30).to_date(), date(2024, 2, 29));
        assert_eq!(CalendarPoint::new(2025, 7, 30).to_date(), date(2025, 7, 30));
    }

    #[test]
    fn test_from_date_snaps_to_checkpoint() {
        assert_eq!(
            CalendarPoint::from_date(date(2025, 3, 9)),
            CalendarPoint::new(2025, 3, 1)
        );
        assert_eq!(
            CalendarPoint::from_date(date(2025, 3, 20)),
            CalendarPoint::new(2025, 3, 15)
        );
        assert_eq!(
            CalendarPoint::from_date(date(2025, 2, 28)),
            CalendarPoint::new(2025, 2, 30)
        );
    }

    #[test]
    fn test_days_in_month_leap_years() {
        assert_eq!(days_in_month(2024, 2), 29);
        assert_eq!(days_in_month(2100, 2), 28);
        assert_eq!(days_in_month(2000, 2), 29);
        assert_eq!(days_in_month(2025, 4), 30);
    }
}
