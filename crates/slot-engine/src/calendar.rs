//! Civil calendar helpers: strict parsing of request inputs and month walking.
//!
//! Month lengths come straight from chrono's proleptic Gregorian calendar, so
//! leap years need no special handling here.

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, Days, NaiveDate, NaiveTime};

use crate::error::{EngineError, Result};

/// Parse a civil date in `YYYY-MM-DD` form.
///
/// # Errors
/// Returns `EngineError::InvalidDate` for anything else, including
/// out-of-range days such as `2026-02-30`.
pub fn parse_date(input: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(input.trim(), "%Y-%m-%d")
        .map_err(|_| EngineError::InvalidDate(input.to_string()))
}

/// Parse a time of day in `HH:MM` form; a trailing `:SS` is tolerated.
///
/// # Errors
/// Returns `EngineError::InvalidTime` when the input is malformed.
pub fn parse_time(input: &str) -> Result<NaiveTime> {
    let trimmed = input.trim();
    NaiveTime::parse_from_str(trimmed, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(trimmed, "%H:%M:%S"))
        .map_err(|_| EngineError::InvalidTime(input.to_string()))
}

/// A calendar month, parsed from `YYYY-MM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct YearMonth {
    first: NaiveDate,
}

impl YearMonth {
    /// # Errors
    /// Returns `EngineError::InvalidDate` when the month is not 1..=12 or the
    /// year is outside chrono's supported range.
    pub fn new(year: i32, month: u32) -> Result<Self> {
        NaiveDate::from_ymd_opt(year, month, 1)
            .map(|first| YearMonth { first })
            .ok_or_else(|| EngineError::InvalidDate(format!("{:04}-{:02}", year, month)))
    }

    pub fn year(&self) -> i32 {
        self.first.year()
    }

    pub fn month(&self) -> u32 {
        self.first.month()
    }

    pub fn first_day(&self) -> NaiveDate {
        self.first
    }

    pub fn last_day(&self) -> NaiveDate {
        self.first
            .checked_add_months(chrono::Months::new(1))
            .and_then(|next| next.pred_opt())
            .unwrap_or(NaiveDate::MAX)
    }

    pub fn days_in_month(&self) -> u32 {
        self.last_day().day()
    }

    /// Every date of the month in ascending order.
    pub fn days(&self) -> impl Iterator<Item = NaiveDate> {
        let first = self.first;
        (1..=self.days_in_month()).filter_map(move |day| first.with_day(day))
    }
}

impl FromStr for YearMonth {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || EngineError::InvalidDate(s.to_string());
        let (year, month) = s.trim().split_once('-').ok_or_else(invalid)?;
        if year.len() != 4 || month.len() != 2 {
            return Err(invalid());
        }
        let year: i32 = year.parse().map_err(|_| invalid())?;
        let month: u32 = month.parse().map_err(|_| invalid())?;
        YearMonth::new(year, month).map_err(|_| invalid())
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year(), self.month())
    }
}

/// `horizon_days` consecutive dates starting at `start`, stopping early at the
/// end of chrono's representable range.
pub fn date_span(start: NaiveDate, horizon_days: u32) -> impl Iterator<Item = NaiveDate> {
    (0..u64::from(horizon_days)).map_while(move |offset| start.checked_add_days(Days::new(offset)))
}
