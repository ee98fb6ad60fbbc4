//! # Date Keys
//!
//! The remote store identifies calendar days by a single integer:
//! `YYYY * 10000 + MM * 100 + DD`.
//!
//! ## Why Not a Date Type on the Wire?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  2024-05-31  →  20240531                                                │
//! │  2024-06-01  →  20240601      integer order == calendar order           │
//! │  2024-06-02  →  20240602                                                │
//! │                                                                         │
//! │  Range queries (weekly earnings) and equality checks (slot lookups)     │
//! │  compare these integers directly, so the encoding is reproduced         │
//! │  exactly instead of sending a generic date.                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Calendar math (weekday, week bounds) goes through `chrono::NaiveDate`.

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, Duration, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};

/// A calendar day encoded as `YYYYMMDD`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(transparent)]
#[ts(export)]
pub struct DateKey(u32);

impl DateKey {
    /// Wraps a raw wire value without checking it is a real date.
    #[inline]
    pub const fn from_raw(raw: u32) -> Self {
        DateKey(raw)
    }

    /// Builds a key from year, month and day, rejecting impossible dates.
    ///
    /// ## Example
    /// ```rust
    /// use turf_core::DateKey;
    ///
    /// assert_eq!(DateKey::from_ymd(2024, 6, 1).unwrap().raw(), 20240601);
    /// assert!(DateKey::from_ymd(2024, 2, 30).is_err());
    /// ```
    pub fn from_ymd(year: i32, month: u32, day: u32) -> CoreResult<Self> {
        let date = NaiveDate::from_ymd_opt(year, month, day).ok_or_else(|| {
            CoreError::InvalidDate(
                (year.max(0) as u32)
                    .saturating_mul(10_000)
                    .saturating_add(month.saturating_mul(100).saturating_add(day)),
            )
        })?;
        Ok(Self::from_date(date))
    }

    /// Encodes a `NaiveDate`. Years before 1 CE are not representable.
    pub fn from_date(date: NaiveDate) -> Self {
        let year = date.year().max(0) as u32;
        DateKey(year * 10_000 + date.month() * 100 + date.day())
    }

    /// Returns the raw `YYYYMMDD` integer.
    #[inline]
    pub const fn raw(&self) -> u32 {
        self.0
    }

    #[inline]
    pub const fn year(&self) -> u32 {
        self.0 / 10_000
    }

    #[inline]
    pub const fn month(&self) -> u32 {
        (self.0 / 100) % 100
    }

    #[inline]
    pub const fn day(&self) -> u32 {
        self.0 % 100
    }

    /// Decodes the key into a calendar date.
    pub fn to_date(&self) -> CoreResult<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year() as i32, self.month(), self.day())
            .ok_or(CoreError::InvalidDate(self.0))
    }

    /// Returns true if the key names a real calendar day.
    pub fn is_valid(&self) -> bool {
        self.to_date().is_ok()
    }

    /// Day of the week.
    pub fn weekday(&self) -> CoreResult<Weekday> {
        Ok(self.to_date()?.weekday())
    }

    /// Saturday and Sunday are weekend days for pricing.
    ///
    /// Computed locally from the calendar; the remote store does not send
    /// this flag. An invalid key is never a weekend.
    pub fn is_weekend(&self) -> bool {
        matches!(self.weekday(), Ok(Weekday::Sat) | Ok(Weekday::Sun))
    }

    /// Returns the Monday..Sunday week containing this day.
    ///
    /// ## Example
    /// ```rust
    /// use turf_core::DateKey;
    ///
    /// let (start, end) = DateKey::from_raw(20240605).week_bounds().unwrap();
    /// assert_eq!(start.raw(), 20240603);
    /// assert_eq!(end.raw(), 20240609);
    /// ```
    pub fn week_bounds(&self) -> CoreResult<(DateKey, DateKey)> {
        let date = self.to_date()?;
        let offset = date.weekday().num_days_from_monday() as i64;
        let monday = date - Duration::days(offset);
        let sunday = monday + Duration::days(6);
        Ok((Self::from_date(monday), Self::from_date(sunday)))
    }

    /// The next calendar day.
    pub fn next_day(&self) -> CoreResult<DateKey> {
        let date = self.to_date()?;
        date.succ_opt()
            .map(Self::from_date)
            .ok_or(CoreError::InvalidDate(self.0))
    }
}

impl From<NaiveDate> for DateKey {
    fn from(date: NaiveDate) -> Self {
        DateKey::from_date(date)
    }
}

impl fmt::Display for DateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_valid() {
            write!(f, "{:04}-{:02}-{:02}", self.year(), self.month(), self.day())
        } else {
            write!(f, "{}", self.0)
        }
    }
}

/// Accepts `YYYY-MM-DD` or the raw `YYYYMMDD` form.
impl FromStr for DateKey {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
            return Ok(DateKey::from_date(date));
        }
        let raw: u32 = s.parse().map_err(|_| CoreError::InvalidDate(0))?;
        let key = DateKey(raw);
        key.to_date()?;
        Ok(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encoding_matches_wire_format() {
        let key = DateKey::from_ymd(2024, 6, 1).unwrap();
        assert_eq!(key.raw(), 20240601);
        assert_eq!(key.year(), 2024);
        assert_eq!(key.month(), 6);
        assert_eq!(key.day(), 1);
    }

    #[test]
    fn test_integer_order_matches_calendar_order() {
        let a = DateKey::from_ymd(2023, 12, 31).unwrap();
        let b = DateKey::from_ymd(2024, 1, 1).unwrap();
        let c = DateKey::from_ymd(2024, 1, 2).unwrap();
        assert!(a < b && b < c);
    }

    #[test]
    fn test_out_of_range_parts_are_rejected() {
        assert!(matches!(
            DateKey::from_ymd(2024, 50_000_000, 1),
            Err(CoreError::InvalidDate(_))
        ));
        assert!(matches!(
            DateKey::from_ymd(i32::MAX, u32::MAX, u32::MAX),
            Err(CoreError::InvalidDate(u32::MAX))
        ));
        assert!(DateKey::from_ymd(-5, 13, 40).is_err());
    }

    #[test]
    fn test_weekend_detection() {
        // 2024-06-01 is a Saturday, 2024-06-03 a Monday
        assert!(DateKey::from_raw(20240601).is_weekend());
        assert!(DateKey::from_raw(20240602).is_weekend());
        assert!(!DateKey::from_raw(20240603).is_weekend());
        assert!(!DateKey::from_raw(20240230).is_weekend());
    }

    #[test]
    fn test_week_bounds_across_month_end() {
        // Friday 2024-05-31
        let (start, end) = DateKey::from_raw(20240531).week_bounds().unwrap();
        assert_eq!(start.raw(), 20240527);
        assert_eq!(end.raw(), 20240602);
    }

    #[test]
    fn test_next_day_rolls_over_year() {
        let key = DateKey::from_raw(20241231).next_day().unwrap();
        assert_eq!(key.raw(), 20250101);
    }

    #[test]
    fn test_parse_and_display() {
        let key: DateKey = "2024-06-01".parse().unwrap();
        assert_eq!(key.raw(), 20240601);
        assert_eq!(key.to_string(), "2024-06-01");

        let key: DateKey = "20240229".parse().unwrap();
        assert_eq!(key.to_string(), "2024-02-29");

        assert!("20230229".parse::<DateKey>().is_err());
        assert!("tomorrow".parse::<DateKey>().is_err());
    }
}
