use chrono::{DateTime, TimeDelta, Utc};
use sea_orm::{QueryFilter, QueryOrder, prelude::*, sea_query::Expr};

use crate::{EngineError, ResultEngine, Transaction, transactions};

use super::Engine;

/// Cached category suggestions older than this are ignored.
pub const SUGGESTION_TTL_DAYS: i64 = 7;

impl Engine {
    /// The cached category suggestion for a transaction, if still fresh.
    pub async fn cached_suggestion(
        &self,
        budget_id: Uuid,
        remote_id: &str,
        now: DateTime<Utc>,
    ) -> ResultEngine<Option<(String, Option<f64>)>> {
        let Some(tx) = self.transaction_by_remote_id(budget_id, remote_id).await? else {
            return Ok(None);
        };
        let (Some(category), Some(suggested_at)) = (tx.ai_suggested_category, tx.ai_suggestion_date)
        else {
            return Ok(None);
        };
        if now - suggested_at > TimeDelta::days(SUGGESTION_TTL_DAYS) {
            return Ok(None);
        }
        Ok(Some((category, tx.ai_suggestion_confidence)))
    }

    pub async fn store_suggestion(
        &self,
        budget_id: Uuid,
        remote_id: &str,
        category: &str,
        confidence: Option<f64>,
        now: DateTime<Utc>,
    ) -> ResultEngine<()> {
        let result = transactions::Entity::update_many()
            .col_expr(
                transactions::Column::AiSuggestedCategory,
                Expr::value(Some(category.to_string())),
            )
            .col_expr(transactions::Column::AiSuggestionDate, Expr::value(Some(now)))
            .col_expr(
                transactions::Column::AiSuggestionConfidence,
                Expr::value(confidence),
            )
            .filter(transactions::Column::BudgetId.eq(budget_id))
            .filter(transactions::Column::RemoteId.eq(remote_id))
            .exec(&self.database)
            .await?;
        if result.rows_affected == 0 {
            return Err(EngineError::KeyNotFound(format!("transaction {remote_id}")));
        }
        Ok(())
    }

    /// Mirrored transactions without a category, newest first.
    pub async fn uncategorized_transactions(&self, budget_id: Uuid) -> ResultEngine<Vec<Transaction>> {
        let models = transactions::Entity::find()
            .filter(transactions::Column::BudgetId.eq(budget_id))
            .filter(transactions::Column::CategoryId.is_null())
            .order_by_desc(transactions::Column::Date)
            .all(&self.database)
            .await?;
        Ok(models.into_iter().map(Transaction::from).collect())
    }
}
