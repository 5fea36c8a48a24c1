use std::collections::{HashMap, HashSet};

use api_types::budget::BudgetSummary;
use chrono::{DateTime, Utc};
use futures::future::join_all;
use sea_orm::{ActiveValue, JoinType, QueryFilter, QuerySelect, SqlErr, prelude::*};

use crate::{Budget, EngineError, ResultEngine, budget_owners, budgets};

use super::{Engine, EntityKind, ReconcileReport, WriteOutcome};

impl Engine {
    /// Create or rename the local budget rows for a user's remote budgets and
    /// record the user as an owner of each.
    pub async fn reconcile_budgets(
        &self,
        user_id: Uuid,
        remote: Vec<BudgetSummary>,
        now: DateTime<Utc>,
    ) -> ResultEngine<ReconcileReport> {
        let remote_ids: Vec<Uuid> = remote.iter().map(|budget| budget.id).collect();
        let index: HashMap<Uuid, Uuid> = budgets::Entity::find()
            .select_only()
            .column(budgets::Column::RemoteId)
            .column(budgets::Column::Id)
            .filter(budgets::Column::RemoteId.is_in(remote_ids))
            .into_tuple::<(Uuid, Uuid)>()
            .all(&self.database)
            .await?
            .into_iter()
            .collect();

        let writes = remote.into_iter().map(|summary| {
            let existing = index.get(&summary.id).copied();
            async move {
                (
                    summary.id.to_string(),
                    self.upsert_budget(user_id, &summary, existing, now).await,
                )
            }
        });

        let mut report = ReconcileReport::new(EntityKind::Budgets);
        for (remote_id, outcome) in join_all(writes).await {
            report.record(&remote_id, outcome);
        }
        Ok(report)
    }

    async fn upsert_budget(
        &self,
        user_id: Uuid,
        summary: &BudgetSummary,
        existing: Option<Uuid>,
        now: DateTime<Utc>,
    ) -> Result<WriteOutcome, DbErr> {
        let (budget_id, outcome) = match existing {
            Some(budget_id) => {
                budgets::ActiveModel {
                    id: ActiveValue::Set(budget_id),
                    name: ActiveValue::Set(summary.name.clone()),
                    updated_at: ActiveValue::Set(now),
                    ..Default::default()
                }
                .update(&self.database)
                .await?;
                (budget_id, WriteOutcome::Updated)
            }
            None => {
                let budget_id = Uuid::new_v4();
                let inserted = budgets::ActiveModel {
                    id: ActiveValue::Set(budget_id),
                    remote_id: ActiveValue::Set(summary.id),
                    name: ActiveValue::Set(summary.name.clone()),
                    updated_at: ActiveValue::Set(now),
                }
                .insert(&self.database)
                .await;
                match inserted {
                    Ok(_) => (budget_id, WriteOutcome::Inserted),
                    // Another owner mirrored the same budget first.
                    Err(err) if matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
                        let Some(winner) = budgets::Entity::find()
                            .filter(budgets::Column::RemoteId.eq(summary.id))
                            .one(&self.database)
                            .await?
                        else {
                            return Err(err);
                        };
                        tracing::debug!(remote_id = %summary.id, "budget inserted concurrently");
                        budgets::ActiveModel {
                            id: ActiveValue::Set(winner.id),
                            name: ActiveValue::Set(summary.name.clone()),
                            updated_at: ActiveValue::Set(now),
                            ..Default::default()
                        }
                        .update(&self.database)
                        .await?;
                        (winner.id, WriteOutcome::Updated)
                    }
                    Err(err) => return Err(err),
                }
            }
        };

        let owned = budget_owners::Entity::find_by_id((budget_id, user_id))
            .one(&self.database)
            .await?
            .is_some();
        if !owned {
            budget_owners::ActiveModel {
                budget_id: ActiveValue::Set(budget_id),
                user_id: ActiveValue::Set(user_id),
            }
            .insert(&self.database)
            .await?;
        }
        Ok(outcome)
    }

    /// Local budgets the user owns.
    pub async fn user_budgets(&self, user_id: Uuid) -> ResultEngine<Vec<budgets::Model>> {
        let owned = budgets::Entity::find()
            .join(JoinType::InnerJoin, budgets::Relation::Owners.def())
            .filter(budget_owners::Column::UserId.eq(user_id))
            .all(&self.database)
            .await?;
        Ok(owned)
    }

    /// A budget with the full set of its owners.
    pub async fn budget(&self, budget_id: Uuid) -> ResultEngine<Budget> {
        let model = budgets::Entity::find_by_id(budget_id)
            .one(&self.database)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound(format!("budget {budget_id}")))?;
        let owners: HashSet<Uuid> = budget_owners::Entity::find()
            .filter(budget_owners::Column::BudgetId.eq(budget_id))
            .all(&self.database)
            .await?
            .into_iter()
            .map(|owner| owner.user_id)
            .collect();
        Ok(Budget::from_model(model, owners))
    }

    pub async fn budget_by_remote_id(&self, remote_id: Uuid) -> ResultEngine<Budget> {
        let model = budgets::Entity::find()
            .filter(budgets::Column::RemoteId.eq(remote_id))
            .one(&self.database)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound(format!("remote budget {remote_id}")))?;
        self.budget(model.id).await
    }
}
