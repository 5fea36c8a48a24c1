//! Internal calendar helpers.
//!
//! Nothing here reads the clock: every function takes the reference date so
//! the pattern and forecast code stays deterministic.

use chrono::{Datelike, NaiveDate};

use crate::{EngineError, ResultEngine};

/// Number of days in the month containing `date`.
pub(crate) fn days_in_month(date: NaiveDate) -> u32 {
    let (year, month) = (date.year(), date.month());
    let next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    };
    match (NaiveDate::from_ymd_opt(year, month, 1), next) {
        (Some(first), Some(next)) => (next - first).num_days() as u32,
        _ => 31,
    }
}

/// `YYYY-MM` key of the month containing `date`.
pub(crate) fn month_key(date: NaiveDate) -> String {
    format!("{:04}-{:02}", date.year(), date.month())
}

/// First and last day of `year`.
pub(crate) fn year_bounds(year: i32) -> ResultEngine<(NaiveDate, NaiveDate)> {
    let first = NaiveDate::from_ymd_opt(year, 1, 1);
    let last = NaiveDate::from_ymd_opt(year, 12, 31);
    match (first, last) {
        (Some(first), Some(last)) => Ok((first, last)),
        _ => Err(EngineError::InvalidDate(format!("year {year} out of range"))),
    }
}

/// How far into its month a date is.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MonthProgress {
    /// Calendar day of `today`, counting today as passed.
    pub days_passed: u32,
    pub days_in_month: u32,
    pub fraction: f64,
}

impl MonthProgress {
    pub fn remaining_days(&self) -> u32 {
        self.days_in_month.saturating_sub(self.days_passed)
    }
}

pub fn month_progress(today: NaiveDate) -> MonthProgress {
    let days_in_month = days_in_month(today);
    let days_passed = today.day();
    MonthProgress {
        days_passed,
        days_in_month,
        fraction: f64::from(days_passed) / f64::from(days_in_month),
    }
}
