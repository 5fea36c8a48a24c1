use std::collections::HashMap;

use api_types::account::Account as RemoteAccount;
use futures::future::join_all;
use sea_orm::{QueryFilter, QueryOrder, QuerySelect, prelude::*};

use crate::{
    Account, Delta, ResultEngine, SyncKind, accounts,
    delta::{Planned, RemoteRecord, plan},
};

use super::{Engine, EntityKind, ReconcileReport, WriteOutcome};

impl Engine {
    /// Merge a batch of remote accounts into the budget's mirror.
    ///
    /// Like categories, accounts are pulled in full every cycle, so the
    /// returned cursor is always 0.
    pub async fn reconcile_accounts(
        &self,
        budget_id: Uuid,
        delta: Delta<RemoteAccount>,
        prior_cursor: i64,
    ) -> ResultEngine<ReconcileReport> {
        let index: HashMap<Uuid, Uuid> = accounts::Entity::find()
            .select_only()
            .column(accounts::Column::RemoteId)
            .column(accounts::Column::Id)
            .filter(accounts::Column::BudgetId.eq(budget_id))
            .into_tuple::<(Uuid, Uuid)>()
            .all(&self.database)
            .await?
            .into_iter()
            .collect();

        let writes = plan(delta.records, &index).into_iter().map(|step| async move {
            let remote_id = step.record().remote_key().to_string();
            (remote_id, self.apply_account(budget_id, step).await)
        });

        let mut report = ReconcileReport::new(EntityKind::Accounts);
        for (remote_id, outcome) in join_all(writes).await {
            report.record(&remote_id, outcome);
        }
        report.server_knowledge = delta.server_knowledge;
        report.cursor = SyncKind::Accounts.next_cursor(prior_cursor, delta.server_knowledge);
        Ok(report)
    }

    async fn apply_account(
        &self,
        budget_id: Uuid,
        step: Planned<RemoteAccount>,
    ) -> Result<WriteOutcome, DbErr> {
        match step {
            Planned::Insert(record) => {
                let account = Account::from_remote(Uuid::new_v4(), budget_id, &record);
                accounts::ActiveModel::from(&account)
                    .insert(&self.database)
                    .await?;
                Ok(WriteOutcome::Inserted)
            }
            Planned::Update { local_id, record } => {
                let account = Account::from_remote(local_id, budget_id, &record);
                accounts::ActiveModel::from(&account)
                    .update(&self.database)
                    .await?;
                Ok(WriteOutcome::Updated)
            }
            Planned::Delete { local_id, .. } => {
                accounts::Entity::delete_by_id(local_id)
                    .exec(&self.database)
                    .await?;
                Ok(WriteOutcome::Deleted)
            }
            Planned::Skip(_) => Ok(WriteOutcome::Unchanged),
        }
    }

    pub async fn budget_accounts(&self, budget_id: Uuid) -> ResultEngine<Vec<Account>> {
        let models = accounts::Entity::find()
            .filter(accounts::Column::BudgetId.eq(budget_id))
            .order_by_asc(accounts::Column::Name)
            .all(&self.database)
            .await?;
        Ok(models.into_iter().map(Account::from).collect())
    }
}
