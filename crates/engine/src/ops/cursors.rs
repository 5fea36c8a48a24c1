use chrono::Utc;
use sea_orm::{ActiveValue, QueryFilter, prelude::*, sea_query::Expr};

use crate::{ResultEngine, SyncKind, sync_cursors};

use super::{Engine, ReconcileReport};

impl Engine {
    /// Stored cursor for `(user, budget, kind)`; 0 means "full resync".
    pub async fn cursor(&self, user_id: Uuid, budget_id: Uuid, kind: SyncKind) -> ResultEngine<i64> {
        let knowledge = sync_cursors::Entity::find_by_id((user_id, budget_id, kind.as_str().to_string()))
            .one(&self.database)
            .await?
            .map_or(0, |row| row.knowledge);
        Ok(knowledge)
    }

    pub async fn cursor_row(
        &self,
        user_id: Uuid,
        budget_id: Uuid,
        kind: SyncKind,
    ) -> ResultEngine<Option<sync_cursors::Model>> {
        Ok(
            sync_cursors::Entity::find_by_id((user_id, budget_id, kind.as_str().to_string()))
                .one(&self.database)
                .await?,
        )
    }

    /// Persist the cursor a reconciliation pass produced.
    pub(super) async fn store_cursor(
        &self,
        user_id: Uuid,
        budget_id: Uuid,
        kind: SyncKind,
        report: &ReconcileReport,
    ) -> ResultEngine<()> {
        let row = sync_cursors::ActiveModel {
            user_id: ActiveValue::Set(user_id),
            budget_id: ActiveValue::Set(budget_id),
            kind: ActiveValue::Set(kind.as_str().to_string()),
            knowledge: ActiveValue::Set(report.cursor),
            observed_knowledge: ActiveValue::Set(report.server_knowledge),
            updated_at: ActiveValue::Set(Utc::now()),
        };

        if self.cursor_row(user_id, budget_id, kind).await?.is_some() {
            row.update(&self.database).await?;
        } else {
            row.insert(&self.database).await?;
        }
        tracing::debug!(
            user_id = %user_id,
            budget_id = %budget_id,
            kind = kind.as_str(),
            cursor = report.cursor,
            observed = report.server_knowledge,
            "stored sync cursor"
        );
        Ok(())
    }

    /// Pin every cursor of a budget back to 0 so the next sync is a full pull.
    pub async fn reset_cursors(&self, user_id: Uuid, budget_id: Uuid) -> ResultEngine<u64> {
        let result = sync_cursors::Entity::update_many()
            .col_expr(sync_cursors::Column::Knowledge, Expr::value(0i64))
            .col_expr(sync_cursors::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(sync_cursors::Column::UserId.eq(user_id))
            .filter(sync_cursors::Column::BudgetId.eq(budget_id))
            .exec(&self.database)
            .await?;
        Ok(result.rows_affected)
    }
}
