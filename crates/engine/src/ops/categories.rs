use std::collections::HashMap;

use api_types::category::Category as RemoteCategory;
use futures::future::join_all;
use sea_orm::{QueryFilter, QueryOrder, QuerySelect, prelude::*};

use crate::{
    Category, Delta, ResultEngine, SyncKind, categories,
    delta::{Planned, RemoteRecord, plan},
};

use super::{Engine, EntityKind, ReconcileReport, WriteOutcome};

impl Engine {
    /// Merge a batch of remote categories into the budget's mirror.
    ///
    /// The returned report's `cursor` is always 0: categories are pulled in
    /// full every cycle (see [`SyncKind::is_incremental`]).
    pub async fn reconcile_categories(
        &self,
        budget_id: Uuid,
        delta: Delta<RemoteCategory>,
        prior_cursor: i64,
    ) -> ResultEngine<ReconcileReport> {
        let index = self.category_index(budget_id).await?;
        let steps = plan(delta.records, &index);

        let writes = steps.into_iter().map(|step| async move {
            let remote_id = step.record().remote_key().to_string();
            (remote_id, self.apply_category(budget_id, step).await)
        });

        let mut report = ReconcileReport::new(EntityKind::Categories);
        for (remote_id, outcome) in join_all(writes).await {
            report.record(&remote_id, outcome);
        }
        report.server_knowledge = delta.server_knowledge;
        report.cursor = SyncKind::Categories.next_cursor(prior_cursor, delta.server_knowledge);
        Ok(report)
    }

    async fn apply_category(
        &self,
        budget_id: Uuid,
        step: Planned<RemoteCategory>,
    ) -> Result<WriteOutcome, DbErr> {
        match step {
            Planned::Insert(record) => {
                let category = Category::from_remote(Uuid::new_v4(), budget_id, &record);
                categories::ActiveModel::from(&category)
                    .insert(&self.database)
                    .await?;
                Ok(WriteOutcome::Inserted)
            }
            Planned::Update { local_id, record } => {
                let category = Category::from_remote(local_id, budget_id, &record);
                category.remote_fields().update(&self.database).await?;
                Ok(WriteOutcome::Updated)
            }
            Planned::Delete { local_id, .. } => {
                categories::Entity::delete_by_id(local_id)
                    .exec(&self.database)
                    .await?;
                Ok(WriteOutcome::Deleted)
            }
            Planned::Skip(_) => Ok(WriteOutcome::Unchanged),
        }
    }

    /// Remote category id → local category id for one budget.
    pub(super) async fn category_index(&self, budget_id: Uuid) -> ResultEngine<HashMap<Uuid, Uuid>> {
        let pairs = categories::Entity::find()
            .select_only()
            .column(categories::Column::RemoteId)
            .column(categories::Column::Id)
            .filter(categories::Column::BudgetId.eq(budget_id))
            .into_tuple::<(Uuid, Uuid)>()
            .all(&self.database)
            .await?;
        Ok(pairs.into_iter().collect())
    }

    pub async fn budget_categories(&self, budget_id: Uuid) -> ResultEngine<Vec<Category>> {
        let models = categories::Entity::find()
            .filter(categories::Column::BudgetId.eq(budget_id))
            .order_by_asc(categories::Column::Name)
            .all(&self.database)
            .await?;
        Ok(models.into_iter().map(Category::from).collect())
    }

    pub async fn category_by_remote_id(
        &self,
        budget_id: Uuid,
        remote_id: Uuid,
    ) -> ResultEngine<Option<Category>> {
        let model = categories::Entity::find()
            .filter(categories::Column::BudgetId.eq(budget_id))
            .filter(categories::Column::RemoteId.eq(remote_id))
            .one(&self.database)
            .await?;
        Ok(model.map(Category::from))
    }
}

