use std::collections::{BTreeSet, HashMap};

use api_types::transaction::Transaction as RemoteTransaction;
use chrono::Datelike;
use futures::future::join_all;
use sea_orm::{QueryFilter, QueryOrder, QuerySelect, prelude::*};

use crate::{
    Delta, ResultEngine, SyncKind, Transaction,
    delta::{Planned, RemoteRecord, plan},
    transactions,
    util::year_bounds,
};

use super::{Engine, EntityKind, ReconcileReport, WriteOutcome};

impl Engine {
    /// Merge a batch of remote transactions into the budget's mirror.
    ///
    /// Remote category ids are resolved against the categories already
    /// mirrored for the budget; an unknown id is stored as uncategorized
    /// rather than dropping the transaction. When the batch changed anything,
    /// spending patterns are recomputed for every year the batch touches.
    pub async fn reconcile_transactions(
        &self,
        budget_id: Uuid,
        delta: Delta<RemoteTransaction>,
        prior_cursor: i64,
    ) -> ResultEngine<ReconcileReport> {
        let categories = self.category_index(budget_id).await?;
        let index: HashMap<String, Uuid> = transactions::Entity::find()
            .select_only()
            .column(transactions::Column::RemoteId)
            .column(transactions::Column::Id)
            .filter(transactions::Column::BudgetId.eq(budget_id))
            .into_tuple::<(String, Uuid)>()
            .all(&self.database)
            .await?
            .into_iter()
            .collect();

        let years: BTreeSet<i32> = delta.records.iter().map(|tx| tx.date.year()).collect();
        let categories = &categories;
        let writes = plan(delta.records, &index).into_iter().map(|step| async move {
            let remote_id = step.record().remote_key();
            (
                remote_id,
                self.apply_transaction(budget_id, categories, step).await,
            )
        });

        let mut report = ReconcileReport::new(EntityKind::Transactions);
        for (remote_id, outcome) in join_all(writes).await {
            report.record(&remote_id, outcome);
        }
        report.server_knowledge = delta.server_knowledge;
        report.cursor = SyncKind::Transactions.next_cursor(prior_cursor, delta.server_knowledge);

        if report.changed() > 0 {
            for year in years {
                if let Err(err) = self.recompute_spending_patterns(budget_id, year).await {
                    tracing::warn!(
                        budget_id = %budget_id,
                        year,
                        "failed to recompute spending patterns: {err}"
                    );
                }
            }
        }
        Ok(report)
    }

    async fn apply_transaction(
        &self,
        budget_id: Uuid,
        categories: &HashMap<Uuid, Uuid>,
        step: Planned<RemoteTransaction>,
    ) -> Result<WriteOutcome, DbErr> {
        let resolve = |record: &RemoteTransaction| {
            record
                .category_id
                .and_then(|remote| categories.get(&remote).copied())
        };
        match step {
            Planned::Insert(record) => {
                let tx = Transaction::from_remote(Uuid::new_v4(), budget_id, resolve(&record), &record);
                transactions::ActiveModel::from(&tx)
                    .insert(&self.database)
                    .await?;
                Ok(WriteOutcome::Inserted)
            }
            Planned::Update { local_id, record } => {
                let tx = Transaction::from_remote(local_id, budget_id, resolve(&record), &record);
                tx.remote_fields().update(&self.database).await?;
                Ok(WriteOutcome::Updated)
            }
            Planned::Delete { local_id, .. } => {
                transactions::Entity::delete_by_id(local_id)
                    .exec(&self.database)
                    .await?;
                Ok(WriteOutcome::Deleted)
            }
            Planned::Skip(_) => Ok(WriteOutcome::Unchanged),
        }
    }

    pub async fn transaction_by_remote_id(
        &self,
        budget_id: Uuid,
        remote_id: &str,
    ) -> ResultEngine<Option<Transaction>> {
        let model = transactions::Entity::find()
            .filter(transactions::Column::BudgetId.eq(budget_id))
            .filter(transactions::Column::RemoteId.eq(remote_id))
            .one(&self.database)
            .await?;
        Ok(model.map(Transaction::from))
    }

    /// Mirrored transactions of a budget dated within `year`, oldest first.
    pub async fn budget_transactions(
        &self,
        budget_id: Uuid,
        year: i32,
    ) -> ResultEngine<Vec<Transaction>> {
        let (first, last) = year_bounds(year)?;
        let models = transactions::Entity::find()
            .filter(transactions::Column::BudgetId.eq(budget_id))
            .filter(transactions::Column::Date.between(first, last))
            .order_by_asc(transactions::Column::Date)
            .all(&self.database)
            .await?;
        Ok(models.into_iter().map(Transaction::from).collect())
    }
}
