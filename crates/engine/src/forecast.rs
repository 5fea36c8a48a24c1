//! End-of-month spending forecast.
//!
//! Exponential smoothing between this month's pace and the historical pace
//! of the budgeted categories. A category whose spend already passed 90% of
//! its historical average is "closed": its realized spend counts, but it no
//! longer contributes a trend.
//!
//! Inputs are milliunits. Spend figures are reported in display units
//! (milliunits / 1000); `total_available` is the plain sum of the category
//! balances as given.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{
    categories::Category,
    util::{MonthProgress, month_progress},
};

pub const DEFAULT_ALPHA: f64 = 0.5;

/// Spend above this share of the historical average closes a category.
pub const CLOSED_THRESHOLD: f64 = 0.9;

const MILLIUNITS: f64 = 1000.0;

/// The category fields the forecast reads.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ForecastCategory {
    pub balance: i64,
    pub activity: i64,
    pub budgeted: i64,
    pub historical_average: i64,
    pub typical_spending_pattern: f64,
}

impl ForecastCategory {
    /// Milliunits spent this month; refunds never make it negative.
    fn spent(&self) -> i64 {
        (-self.activity).max(0)
    }

    fn is_open(&self) -> bool {
        (self.spent() as f64) < CLOSED_THRESHOLD * self.historical_average as f64
    }
}

impl From<&Category> for ForecastCategory {
    fn from(value: &Category) -> Self {
        Self {
            balance: value.balance,
            activity: value.activity,
            budgeted: value.budgeted,
            historical_average: value.historical_average,
            typical_spending_pattern: value.typical_spending_pattern,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Forecast {
    pub days_in_month: u32,
    pub days_passed: u32,
    pub remaining_days: u32,
    pub budgeted_categories: usize,
    pub open_categories: usize,
    pub total_spent_so_far: f64,
    pub open_spent_so_far: f64,
    pub total_available: f64,
    pub weighted_current_month_trend: f64,
    pub historical_trend: f64,
    pub forecasted_daily_spending: f64,
    pub predicted_spending_end_of_month: f64,
    pub predicted_remaining_amount: f64,
    /// Zero on the last day of the month.
    pub predicted_remaining_per_day: f64,
    /// Zero on the last day of the month.
    pub actual_remaining_per_day: f64,
    pub extra_amount_needed: f64,
}

/// Forecast end-of-month spending as of `today`.
///
/// `alpha` weighs the current month's pace against the historical pace; values
/// outside `[0, 1]` are clamped and NaN falls back to [`DEFAULT_ALPHA`].
pub fn forecast(categories: &[ForecastCategory], today: NaiveDate, alpha: f64) -> Forecast {
    let alpha = if alpha.is_nan() {
        DEFAULT_ALPHA
    } else {
        alpha.clamp(0.0, 1.0)
    };
    let progress = month_progress(today);
    let MonthProgress {
        days_passed,
        days_in_month,
        ..
    } = progress;
    let remaining_days = progress.remaining_days();

    let budgeted: Vec<&ForecastCategory> = categories.iter().filter(|c| c.budgeted > 0).collect();
    let open: Vec<&ForecastCategory> = budgeted.iter().copied().filter(|c| c.is_open()).collect();

    let total_spent_so_far = budgeted.iter().map(|c| c.spent()).sum::<i64>() as f64 / MILLIUNITS;
    let open_spent_so_far = open.iter().map(|c| c.spent()).sum::<i64>() as f64 / MILLIUNITS;
    let total_available = budgeted.iter().map(|c| c.balance).sum::<i64>() as f64;

    let days_passed_f = f64::from(days_passed.max(1));
    let days_in_month_f = f64::from(days_in_month);

    let weighted_current_month_trend: f64 = open
        .iter()
        .map(|c| (c.spent() as f64 / MILLIUNITS / days_passed_f) * c.typical_spending_pattern)
        .sum();
    let historical_trend: f64 = open
        .iter()
        .map(|c| {
            (c.historical_average as f64 / MILLIUNITS / days_in_month_f)
                * c.typical_spending_pattern
        })
        .sum();

    let forecasted_daily_spending =
        alpha * weighted_current_month_trend + (1.0 - alpha) * historical_trend;
    let predicted_spending_end_of_month =
        total_spent_so_far - open_spent_so_far + forecasted_daily_spending * days_in_month_f;
    let predicted_remaining_amount = predicted_spending_end_of_month - total_spent_so_far;

    let per_day = |amount: f64| {
        if remaining_days == 0 {
            0.0
        } else {
            amount / f64::from(remaining_days)
        }
    };

    Forecast {
        days_in_month,
        days_passed,
        remaining_days,
        budgeted_categories: budgeted.len(),
        open_categories: open.len(),
        total_spent_so_far,
        open_spent_so_far,
        total_available,
        weighted_current_month_trend: finite_or_zero(weighted_current_month_trend),
        historical_trend: finite_or_zero(historical_trend),
        forecasted_daily_spending: finite_or_zero(forecasted_daily_spending),
        predicted_spending_end_of_month: finite_or_zero(predicted_spending_end_of_month),
        predicted_remaining_amount: finite_or_zero(predicted_remaining_amount),
        predicted_remaining_per_day: finite_or_zero(per_day(predicted_remaining_amount)),
        actual_remaining_per_day: finite_or_zero(per_day(total_available)),
        extra_amount_needed: finite_or_zero(predicted_remaining_amount - total_available),
    }
}

fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() { value } else { 0.0 }
}
