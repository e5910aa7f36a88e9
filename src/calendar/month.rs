//! Month — calendar month value type with shift/range arithmetic.
//!
//! Purpose
//! -------
//! Represent the unit of time the forecasting engine steps through: a
//! `(year, month)` pair with a total calendar order, month shifting across
//! year boundaries, and lazy inclusive/exclusive ranges.
//!
//! Key behaviors
//! -------------
//! - [`Month::new`] validates the raw month number (1..=12) and the year
//!   against chrono's representable range.
//! - [`Month::shift`] moves by any signed number of months, wrapping years.
//! - [`Month::range`] yields a restartable [`MonthRange`] iterator.
//! - [`Month::start_of_month`] / [`Month::end_of_month`] convert to
//!   `chrono::NaiveDate`; [`end_of_month`] and [`is_end_of_month`] normalize
//!   arbitrary dates.
//!
//! Invariants & assumptions
//! ------------------------
//! - `1 <= month <= 12` for every constructed value.
//! - Ordering is derived on `(year, month)`, which is calendar order.
//!
//! Conventions
//! -----------
//! - Textual form is `YYYY-MM`; serde uses the same representation.
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::{fmt, str::FromStr};

use crate::errors::{ForecastError, ForecastResult};

/// Smallest year accepted by [`Month::new`].
pub const MIN_YEAR: i32 = -262_000;
/// Largest year accepted by [`Month::new`].
pub const MAX_YEAR: i32 = 262_000;

/// Month — an immutable calendar month.
///
/// Fields are private so every value has passed [`Month::new`] validation
/// (or was derived from one that has).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Month {
    year: i32,
    month: u32,
}

impl Month {
    /// Construct a month, validating the raw month number and year.
    ///
    /// Errors
    /// ------
    /// - [`ForecastError::InvalidMonth`] if `month` is outside 1..=12 or
    ///   `year` is outside `MIN_YEAR..=MAX_YEAR`.
    pub fn new(year: i32, month: u32) -> ForecastResult<Self> {
        if !(1..=12).contains(&month) || !(MIN_YEAR..=MAX_YEAR).contains(&year) {
            return Err(ForecastError::InvalidMonth { year, month });
        }
        Ok(Month { year, month })
    }

    /// Month containing `date`.
    pub fn from_date(date: NaiveDate) -> Self {
        Month { year: date.year(), month: date.month() }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    /// Shift by `months` (negative moves backward), wrapping year boundaries.
    ///
    /// Notes
    /// -----
    /// - Results beyond `MIN_YEAR`/`MAX_YEAR` saturate at the boundary year;
    ///   date conversions on such values fail with `DateOutOfRange` anyway.
    pub fn shift(&self, months: i32) -> Self {
        let index = self.index() + i64::from(months);
        let year = index.div_euclid(12).clamp(i64::from(MIN_YEAR), i64::from(MAX_YEAR)) as i32;
        let month = index.rem_euclid(12) as u32 + 1;
        Month { year, month }
    }

    /// Signed number of months from `earlier` to `self`.
    pub fn months_since(&self, earlier: Month) -> i32 {
        (self.index() - earlier.index()) as i32
    }

    /// First day of the month.
    pub fn start_of_month(&self) -> ForecastResult<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year, self.month, 1)
            .ok_or(ForecastError::DateOutOfRange { year: self.year, month: self.month })
    }

    /// Last day of the month.
    pub fn end_of_month(&self) -> ForecastResult<NaiveDate> {
        let (year, month) =
            if self.month == 12 { (self.year + 1, 1) } else { (self.year, self.month + 1) };
        NaiveDate::from_ymd_opt(year, month, 1)
            .and_then(|next| next.pred_opt())
            .ok_or(ForecastError::DateOutOfRange { year: self.year, month: self.month })
    }

    /// Consecutive months from `start` to `end`.
    ///
    /// When `inclusive` is false the range stops before `end`. An empty range
    /// is produced when `end` precedes `start`.
    pub fn range(start: Month, end: Month, inclusive: bool) -> MonthRange {
        let last = if inclusive { end } else { end.shift(-1) };
        MonthRange { next: start, last, exhausted: last < start }
    }

    fn index(&self) -> i64 {
        i64::from(self.year) * 12 + i64::from(self.month) - 1
    }
}

impl fmt::Display for Month {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for Month {
    type Err = ForecastError;

    fn from_str(s: &str) -> ForecastResult<Self> {
        let invalid = || ForecastError::InvalidMonth { year: 0, month: 0 };
        let (year, month) = s.trim().rsplit_once('-').ok_or_else(invalid)?;
        let year: i32 = year.parse().map_err(|_| invalid())?;
        let month: u32 = month.parse().map_err(|_| invalid())?;
        Month::new(year, month)
    }
}

impl Serialize for Month {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Month {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// MonthRange — lazy, finite iterator over consecutive months.
///
/// `Clone` gives a fresh iterator from the same position, so a range can be
/// walked more than once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonthRange {
    next: Month,
    last: Month,
    exhausted: bool,
}

impl Iterator for MonthRange {
    type Item = Month;

    fn next(&mut self) -> Option<Month> {
        if self.exhausted {
            return None;
        }
        let current = self.next;
        if current >= self.last {
            self.exhausted = true;
        } else {
            self.next = current.shift(1);
        }
        Some(current)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let len = if self.exhausted {
            0
        } else {
            (self.last.months_since(self.next) + 1).max(0) as usize
        };
        (len, Some(len))
    }
}

impl ExactSizeIterator for MonthRange {}

/// Last day of the month containing `date`.
pub fn end_of_month(date: NaiveDate) -> ForecastResult<NaiveDate> {
    Month::from_date(date).end_of_month()
}

/// Whether `date` is the last day of its month.
pub fn is_end_of_month(date: NaiveDate) -> bool {
    date.succ_opt().map_or(true, |next| next.day() == 1)
}
