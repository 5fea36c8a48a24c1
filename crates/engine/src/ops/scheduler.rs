use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::{sync::Semaphore, task::JoinSet};

use crate::ResultEngine;

use super::{BatchReport, Engine};

impl Engine {
    /// Sync the next batch of due users.
    ///
    /// Users run in parallel up to `max_concurrent_users`; a failing user is
    /// logged and counted, never stopping the others.
    pub async fn run_due_batch(&self, now: DateTime<Utc>) -> ResultEngine<BatchReport> {
        let due = self.due_users(now, self.options.batch_size).await?;
        let mut report = BatchReport {
            selected: due.len(),
            ..Default::default()
        };
        if due.is_empty() {
            tracing::debug!("no users due for sync");
            return Ok(report);
        }

        let semaphore = Arc::new(Semaphore::new(self.options.max_concurrent_users));
        let mut tasks = JoinSet::new();
        for user in due {
            let Ok(permit) = semaphore.clone().acquire_owned().await else {
                break;
            };
            let engine = self.clone();
            tasks.spawn(async move {
                let _permit = permit;
                (user.id, engine.sync_user(user.id, now).await)
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((_, Ok(_))) => report.succeeded += 1,
                Ok((user_id, Err(err))) => {
                    report.failed += 1;
                    tracing::error!(user_id = %user_id, "user sync failed: {err}");
                }
                Err(err) => {
                    report.failed += 1;
                    tracing::error!("user sync task aborted: {err}");
                }
            }
        }
        tracing::info!(
            selected = report.selected,
            succeeded = report.succeeded,
            failed = report.failed,
            "sync batch finished"
        );
        Ok(report)
    }
}
