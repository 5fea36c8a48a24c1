//! Spending-pattern fold.
//!
//! Folds a year of categorized transactions into:
//!
//! - per category, the average absolute transaction amount and the
//!   amount-weighted position inside the month where spending lands
//!   (0 = first day, 1 = last day);
//! - per (category, month), the summed activity.
//!
//! The fold is pure; [`Engine::recompute_spending_patterns`] feeds it from
//! the mirror and persists the result.
//!
//! [`Engine::recompute_spending_patterns`]: crate::Engine::recompute_spending_patterns

use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::util::{days_in_month, month_key};

/// One categorized transaction as seen by the fold.
#[derive(Clone, Copy, Debug)]
pub struct PatternSample {
    pub category_id: Uuid,
    pub amount: i64,
    pub date: NaiveDate,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CategoryPattern {
    pub category_id: Uuid,
    pub transaction_count: u64,
    /// Milliunits, rounded to the nearest unit.
    pub historical_average: i64,
    pub typical_spending_pattern: f64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthlyActivity {
    pub category_id: Uuid,
    pub month: String,
    pub activity_sum: i64,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SpendingPatterns {
    pub categories: Vec<CategoryPattern>,
    pub months: Vec<MonthlyActivity>,
}

impl SpendingPatterns {
    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }
}

#[derive(Default)]
struct Accumulator {
    count: u64,
    absolute_sum: i128,
    weighted_day_sum: f64,
}

pub fn fold_spending_patterns(samples: impl IntoIterator<Item = PatternSample>) -> SpendingPatterns {
    let mut per_category: BTreeMap<Uuid, Accumulator> = BTreeMap::new();
    let mut per_month: BTreeMap<(Uuid, String), i64> = BTreeMap::new();

    for sample in samples {
        let absolute = i128::from(sample.amount).abs();
        let day_weight = f64::from(sample.date.day()) / f64::from(days_in_month(sample.date));

        let acc = per_category.entry(sample.category_id).or_default();
        acc.count += 1;
        acc.absolute_sum += absolute;
        acc.weighted_day_sum += absolute as f64 * day_weight;

        *per_month
            .entry((sample.category_id, month_key(sample.date)))
            .or_default() += sample.amount;
    }

    let categories = per_category
        .into_iter()
        .map(|(category_id, acc)| {
            let historical_average = (acc.absolute_sum as f64 / acc.count as f64).round() as i64;
            let typical_spending_pattern = if acc.absolute_sum == 0 {
                0.0
            } else {
                acc.weighted_day_sum / acc.absolute_sum as f64
            };
            CategoryPattern {
                category_id,
                transaction_count: acc.count,
                historical_average,
                typical_spending_pattern,
            }
        })
        .collect();

    let months = per_month
        .into_iter()
        .map(|((category_id, month), activity_sum)| MonthlyActivity {
            category_id,
            month,
            activity_sum,
        })
        .collect();

    SpendingPatterns { categories, months }
}
