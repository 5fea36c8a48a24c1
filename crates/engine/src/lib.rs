//! Ledger mirror engine.
//!
//! Mirrors budgets, categories, accounts and transactions from the remote
//! ledger API into a local sea-orm store, keeps them current with
//! server-knowledge delta sync, and derives spending patterns and an
//! end-of-month forecast from the mirrored history.

pub use budgets::Budget;
pub use categories::Category;
pub use accounts::Account;
pub use error::{EngineError, RemoteError};
pub use forecast::{DEFAULT_ALPHA, Forecast, ForecastCategory, forecast};
pub use ops::{
    BatchReport, BudgetSyncReport, Engine, EngineBuilder, EntityKind, PatternOutcome,
    ReconcileReport, SUGGESTION_TTL_DAYS, SyncOptions, UserSyncReport,
};
pub use patterns::{
    CategoryPattern, MonthlyActivity, PatternSample, SpendingPatterns, fold_spending_patterns,
};
pub use payee::clean_payee;
pub use remote::{Delta, HttpLedgerApi, LedgerApi, LedgerConfig};
pub use sync_cursors::SyncKind;
pub use transactions::Transaction;
pub use util::{MonthProgress, month_progress};

pub mod accounts;
pub mod budget_owners;
pub mod budgets;
pub mod categories;
pub mod category_history;
mod delta;
mod error;
mod forecast;
mod ops;
mod patterns;
mod payee;
mod remote;
pub mod sync_cursors;
pub mod transactions;
pub mod users;
mod util;

type ResultEngine<T> = Result<T, EngineError>;
