use sea_orm::{
    ActiveValue, QueryFilter, QueryOrder, QuerySelect, TransactionTrait, prelude::*,
    sea_query::{CaseStatement, Expr, SimpleExpr},
};
use serde::{Deserialize, Serialize};

use crate::{
    PatternSample, ResultEngine, categories, category_history, fold_spending_patterns,
    transactions, util::year_bounds,
};

use super::{Engine, with_tx};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternOutcome {
    /// No categorized transaction in the year; nothing was written.
    Skipped,
    Recomputed { categories: usize, months: usize },
}

impl Engine {
    /// Rebuild spending patterns and monthly history of a budget for `year`.
    ///
    /// Category aggregates are overwritten and the year's history rows are
    /// replaced in one database transaction, so re-running it never
    /// accumulates rows.
    pub async fn recompute_spending_patterns(
        &self,
        budget_id: Uuid,
        year: i32,
    ) -> ResultEngine<PatternOutcome> {
        let (first, last) = year_bounds(year)?;
        let samples = transactions::Entity::find()
            .select_only()
            .column(transactions::Column::CategoryId)
            .column(transactions::Column::Amount)
            .column(transactions::Column::Date)
            .filter(transactions::Column::BudgetId.eq(budget_id))
            .filter(transactions::Column::Date.between(first, last))
            .filter(transactions::Column::CategoryId.is_not_null())
            .into_tuple::<(Uuid, i64, chrono::NaiveDate)>()
            .all(&self.database)
            .await?;

        if samples.is_empty() {
            tracing::debug!(budget_id = %budget_id, year, "no categorized transactions");
            return Ok(PatternOutcome::Skipped);
        }

        let patterns = fold_spending_patterns(samples.into_iter().map(
            |(category_id, amount, date)| PatternSample {
                category_id,
                amount,
                date,
            },
        ));

        with_tx!(self, |txn| {
            let ids = patterns
                .categories
                .iter()
                .map(|pattern| pattern.category_id)
                .collect::<Vec<_>>();
            let (averages, typical) = patterns.categories.iter().fold(
                (CaseStatement::new(), CaseStatement::new()),
                |(averages, typical), pattern| {
                    let this = categories::Column::Id.eq(pattern.category_id);
                    (
                        averages.case(this.clone(), Expr::value(pattern.historical_average)),
                        typical.case(this, Expr::value(pattern.typical_spending_pattern)),
                    )
                },
            );
            categories::Entity::update_many()
                .col_expr(
                    categories::Column::HistoricalAverage,
                    <CaseStatement as Into<SimpleExpr>>::into(
                        averages.finally(Expr::col(categories::Column::HistoricalAverage)),
                    ),
                )
                .col_expr(
                    categories::Column::TypicalSpendingPattern,
                    <CaseStatement as Into<SimpleExpr>>::into(
                        typical.finally(Expr::col(categories::Column::TypicalSpendingPattern)),
                    ),
                )
                .filter(categories::Column::Id.is_in(ids))
                .exec(&txn)
                .await?;

            category_history::Entity::delete_many()
                .filter(category_history::Column::BudgetId.eq(budget_id))
                .filter(category_history::Column::Month.starts_with(format!("{year:04}-")))
                .exec(&txn)
                .await?;

            let rows = patterns
                .months
                .iter()
                .map(|month| category_history::ActiveModel {
                    category_id: ActiveValue::Set(month.category_id),
                    budget_id: ActiveValue::Set(budget_id),
                    month: ActiveValue::Set(month.month.clone()),
                    activity_sum: ActiveValue::Set(month.activity_sum),
                })
                .collect::<Vec<_>>();
            if !rows.is_empty() {
                category_history::Entity::insert_many(rows)
                    .exec_without_returning(&txn)
                    .await?;
            }

            tracing::info!(
                budget_id = %budget_id,
                year,
                categories = patterns.categories.len(),
                months = patterns.months.len(),
                "recomputed spending patterns"
            );
            Ok(PatternOutcome::Recomputed {
                categories: patterns.categories.len(),
                months: patterns.months.len(),
            })
        })
    }

    /// Monthly activity rows of a budget for `year`, by month then category.
    pub async fn category_history(
        &self,
        budget_id: Uuid,
        year: i32,
    ) -> ResultEngine<Vec<category_history::Model>> {
        let rows = category_history::Entity::find()
            .filter(category_history::Column::BudgetId.eq(budget_id))
            .filter(category_history::Column::Month.starts_with(format!("{year:04}-")))
            .order_by_asc(category_history::Column::Month)
            .order_by_asc(category_history::Column::CategoryId)
            .all(&self.database)
            .await?;
        Ok(rows)
    }
}
