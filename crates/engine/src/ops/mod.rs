use std::{fmt, sync::Arc};

use chrono::TimeDelta;
use sea_orm::{DatabaseConnection, DbErr};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, LedgerApi, ResultEngine, SyncKind};

mod accounts;
mod budgets;
mod categories;
mod cursors;
mod forecast;
mod patterns;
mod scheduler;
mod suggestions;
mod sync;
mod transactions;
mod users;

pub use patterns::PatternOutcome;
pub use suggestions::SUGGESTION_TTL_DAYS;

/// Run a block inside a DB transaction, committing on success and rolling back on error.
macro_rules! with_tx {
    ($self:expr, |$tx:ident| $body:expr) => {{
        let $tx = $self.database.begin().await?;
        let result = $body;
        match result {
            Ok(value) => {
                $tx.commit().await?;
                Ok(value)
            }
            Err(err) => Err(err),
        }
    }};
}

pub(crate) use with_tx;

/// Tuning for the scheduler and the per-user fan-out.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SyncOptions {
    /// Users picked per scheduler tick.
    pub batch_size: u64,
    pub max_concurrent_users: usize,
    /// Budgets of one user synced at the same time.
    pub max_concurrent_budgets: usize,
    /// Users synced more recently than this are not due.
    pub min_sync_interval: TimeDelta,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            batch_size: 100,
            max_concurrent_users: 8,
            max_concurrent_budgets: 4,
            min_sync_interval: TimeDelta::minutes(60),
        }
    }
}

#[derive(Clone)]
pub struct Engine {
    database: DatabaseConnection,
    ledger: Arc<dyn LedgerApi>,
    options: SyncOptions,
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("database", &self.database)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl Engine {
    /// Return a builder for `Engine`. Help to build the struct.
    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }

    pub fn options(&self) -> &SyncOptions {
        &self.options
    }
}

/// The builder for `Engine`
#[derive(Default)]
pub struct EngineBuilder {
    database: DatabaseConnection,
    ledger: Option<Arc<dyn LedgerApi>>,
    options: SyncOptions,
}

impl EngineBuilder {
    /// Pass the required database
    pub fn database(mut self, db: DatabaseConnection) -> EngineBuilder {
        self.database = db;
        self
    }

    /// Pass the required remote ledger client
    pub fn ledger(mut self, ledger: Arc<dyn LedgerApi>) -> EngineBuilder {
        self.ledger = Some(ledger);
        self
    }

    pub fn options(mut self, options: SyncOptions) -> EngineBuilder {
        self.options = options;
        self
    }

    /// Construct `Engine`
    pub async fn build(self) -> ResultEngine<Engine> {
        let ledger = self
            .ledger
            .ok_or_else(|| EngineError::Config("remote ledger client is required".to_string()))?;
        if self.options.max_concurrent_users == 0 || self.options.max_concurrent_budgets == 0 {
            return Err(EngineError::Config(
                "concurrency limits must be at least 1".to_string(),
            ));
        }
        Ok(Engine {
            database: self.database,
            ledger,
            options: self.options,
        })
    }
}

/// Entity kinds written by reconciliation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Budgets,
    Categories,
    Accounts,
    Transactions,
}

impl EntityKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Budgets => "budgets",
            Self::Categories => "categories",
            Self::Accounts => "accounts",
            Self::Transactions => "transactions",
        }
    }
}

impl From<SyncKind> for EntityKind {
    fn from(value: SyncKind) -> Self {
        match value {
            SyncKind::Categories => Self::Categories,
            SyncKind::Accounts => Self::Accounts,
            SyncKind::Transactions => Self::Transactions,
        }
    }
}

/// What a single record write did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum WriteOutcome {
    Inserted,
    Updated,
    Deleted,
    Unchanged,
}

/// Outcome of one reconciliation pass.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcileReport {
    pub kind: EntityKind,
    pub inserted: usize,
    pub updated: usize,
    pub deleted: usize,
    pub unchanged: usize,
    pub failed: usize,
    /// Knowledge the remote API returned with the batch.
    pub server_knowledge: i64,
    /// Cursor persisted for the next pass.
    pub cursor: i64,
}

impl ReconcileReport {
    pub(crate) fn new(kind: EntityKind) -> Self {
        Self {
            kind,
            inserted: 0,
            updated: 0,
            deleted: 0,
            unchanged: 0,
            failed: 0,
            server_knowledge: 0,
            cursor: 0,
        }
    }

    /// Count one record write; failures are logged and skipped.
    pub(crate) fn record(&mut self, remote_id: &str, outcome: Result<WriteOutcome, DbErr>) {
        match outcome {
            Ok(WriteOutcome::Inserted) => self.inserted += 1,
            Ok(WriteOutcome::Updated) => self.updated += 1,
            Ok(WriteOutcome::Deleted) => self.deleted += 1,
            Ok(WriteOutcome::Unchanged) => self.unchanged += 1,
            Err(err) => {
                self.failed += 1;
                tracing::warn!(
                    kind = self.kind.as_str(),
                    remote_id,
                    "failed to mirror record: {err}"
                );
            }
        }
    }

    /// Records whose mirror row was created, changed or removed.
    pub fn changed(&self) -> usize {
        self.inserted + self.updated + self.deleted
    }
}

/// Outcome of syncing one budget for one user.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BudgetSyncReport {
    pub budget_id: Uuid,
    pub passes: Vec<ReconcileReport>,
    /// Kinds skipped this cycle; their cursors were left untouched.
    pub failed_kinds: Vec<SyncKind>,
}

impl BudgetSyncReport {
    pub fn pass(&self, kind: SyncKind) -> Option<&ReconcileReport> {
        let kind = EntityKind::from(kind);
        self.passes.iter().find(|pass| pass.kind == kind)
    }
}

/// Outcome of one user's sync run.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSyncReport {
    pub user_id: Uuid,
    /// `None` when the budget list could not be fetched this cycle.
    pub budgets_listed: Option<ReconcileReport>,
    pub budgets: Vec<BudgetSyncReport>,
    pub failed_budgets: usize,
}

/// Outcome of one scheduler tick.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchReport {
    pub selected: usize,
    pub succeeded: usize,
    pub failed: usize,
}
