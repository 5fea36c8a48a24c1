//! Per-user sync: token refresh, budget listing, per-budget fan-out.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use sea_orm::prelude::Uuid;
use tokio::{sync::Semaphore, task::JoinSet};

use crate::{EngineError, ResultEngine, SyncKind};

use super::{BudgetSyncReport, Engine, ReconcileReport, UserSyncReport};

impl Engine {
    /// Bring every budget of one user up to date with the remote ledger.
    ///
    /// Only the token refresh is fatal: when the remote ledger rejects the
    /// refresh token the stored connection is cleared and the user has to
    /// authorize again. Any later failure is contained to the budget or
    /// entity kind it happened in; that kind's cursor is left untouched so
    /// the next cycle retries from the same point.
    pub async fn sync_user(&self, user_id: Uuid, now: DateTime<Utc>) -> ResultEngine<UserSyncReport> {
        let user = self.user(user_id).await?;
        let Some(refresh_token) = user.refresh_token else {
            return Err(EngineError::NotConnected(format!("user {user_id}")));
        };

        let tokens = match self.ledger.refresh_token(&refresh_token).await {
            Ok(tokens) => tokens,
            Err(err) => {
                if err.is_auth_failure() {
                    self.clear_connection(user_id).await?;
                    tracing::error!(
                        user_id = %user_id,
                        "refresh token rejected, connection cleared: {err}"
                    );
                } else {
                    tracing::error!(user_id = %user_id, "failed to refresh access token: {err}");
                }
                return Err(EngineError::Auth(err.to_string()));
            }
        };
        self.store_tokens(user_id, &tokens, now).await?;
        let access_token: Arc<str> = Arc::from(tokens.access_token);

        let budgets_listed = match self.ledger.budgets(&access_token).await {
            Ok(remote) => Some(self.reconcile_budgets(user_id, remote, now).await?),
            Err(err) => {
                tracing::warn!(
                    user_id = %user_id,
                    "failed to list budgets, syncing known budgets only: {err}"
                );
                None
            }
        };

        let owned = self.user_budgets(user_id).await?;
        let semaphore = Arc::new(Semaphore::new(self.options.max_concurrent_budgets));
        let mut tasks = JoinSet::new();
        for budget in owned {
            let Ok(permit) = semaphore.clone().acquire_owned().await else {
                break;
            };
            let engine = self.clone();
            let access_token = access_token.clone();
            tasks.spawn(async move {
                let _permit = permit;
                let outcome = engine
                    .sync_budget(user_id, &access_token, budget.id, budget.remote_id)
                    .await;
                (budget.id, outcome)
            });
        }

        let mut budgets = Vec::new();
        let mut failed_budgets = 0;
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((_, Ok(report))) => budgets.push(report),
                Ok((budget_id, Err(err))) => {
                    failed_budgets += 1;
                    tracing::warn!(
                        user_id = %user_id,
                        budget_id = %budget_id,
                        "budget sync failed: {err}"
                    );
                }
                Err(err) => {
                    failed_budgets += 1;
                    tracing::error!(user_id = %user_id, "budget sync task aborted: {err}");
                }
            }
        }
        budgets.sort_by_key(|report| report.budget_id);

        self.mark_synced(user_id, now).await?;
        tracing::info!(
            user_id = %user_id,
            budgets = budgets.len(),
            failed_budgets,
            "user sync finished"
        );
        Ok(UserSyncReport {
            user_id,
            budgets_listed,
            budgets,
            failed_budgets,
        })
    }

    /// Run the three reconcilers of one budget in dependency order.
    async fn sync_budget(
        &self,
        user_id: Uuid,
        access_token: &str,
        budget_id: Uuid,
        remote_budget_id: Uuid,
    ) -> ResultEngine<BudgetSyncReport> {
        let mut report = BudgetSyncReport {
            budget_id,
            passes: Vec::with_capacity(SyncKind::ORDERED.len()),
            failed_kinds: Vec::new(),
        };
        for kind in SyncKind::ORDERED {
            match self
                .sync_kind(user_id, access_token, budget_id, remote_budget_id, kind)
                .await
            {
                Ok(pass) => report.passes.push(pass),
                Err(err) => {
                    tracing::warn!(
                        user_id = %user_id,
                        budget_id = %budget_id,
                        kind = kind.as_str(),
                        "skipping pass this cycle: {err}"
                    );
                    report.failed_kinds.push(kind);
                }
            }
        }
        Ok(report)
    }

    async fn sync_kind(
        &self,
        user_id: Uuid,
        access_token: &str,
        budget_id: Uuid,
        remote_budget_id: Uuid,
        kind: SyncKind,
    ) -> ResultEngine<ReconcileReport> {
        let prior = self.cursor(user_id, budget_id, kind).await?;
        let requested = kind.request_cursor(prior);
        let pass = match kind {
            SyncKind::Categories => {
                let delta = self
                    .ledger
                    .categories(access_token, remote_budget_id, requested)
                    .await?;
                self.reconcile_categories(budget_id, delta, prior).await?
            }
            SyncKind::Accounts => {
                let delta = self
                    .ledger
                    .accounts(access_token, remote_budget_id, requested)
                    .await?;
                self.reconcile_accounts(budget_id, delta, prior).await?
            }
            SyncKind::Transactions => {
                let delta = self
                    .ledger
                    .transactions(access_token, remote_budget_id, requested)
                    .await?;
                self.reconcile_transactions(budget_id, delta, prior).await?
            }
        };
        self.store_cursor(user_id, budget_id, kind, &pass).await?;
        tracing::info!(
            user_id = %user_id,
            budget_id = %budget_id,
            kind = kind.as_str(),
            inserted = pass.inserted,
            updated = pass.updated,
            deleted = pass.deleted,
            failed = pass.failed,
            "reconciled"
        );
        Ok(pass)
    }
}
