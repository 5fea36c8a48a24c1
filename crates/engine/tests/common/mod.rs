#![allow(dead_code)]

use std::{
    collections::{HashMap, HashSet},
    sync::{Arc, Mutex},
};

use api_types::{
    account::Account, auth::TokenPair, budget::BudgetSummary, category::Category,
    transaction::Transaction,
};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use engine::{Delta, Engine, LedgerApi, RemoteError, SyncKind, SyncOptions};
use migration::MigratorTrait;
use reqwest::StatusCode;
use sea_orm::{Database, DatabaseConnection};
use uuid::Uuid;

/// Remote ledger double serving canned batches per remote budget.
#[derive(Default)]
pub struct FakeLedger {
    pub state: Mutex<FakeState>,
}

#[derive(Default)]
pub struct FakeState {
    pub budgets: Vec<BudgetSummary>,
    pub categories: HashMap<Uuid, Delta<Category>>,
    pub accounts: HashMap<Uuid, Delta<Account>>,
    pub transactions: HashMap<Uuid, Delta<Transaction>>,
    /// Refresh tokens the fake answers with 401.
    pub rejected_tokens: HashSet<String>,
    /// Answer every refresh with this status.
    pub refresh_status: Option<StatusCode>,
    pub budgets_unavailable: bool,
    pub failing_kinds: HashSet<SyncKind>,
    /// Every delta request as (kind, remote budget, requested knowledge).
    pub requests: Vec<(SyncKind, Uuid, i64)>,
}

impl FakeLedger {
    pub fn with(&self, f: impl FnOnce(&mut FakeState)) {
        let mut state = self.state.lock().unwrap();
        f(&mut state);
    }

    pub fn requests(&self, kind: SyncKind) -> Vec<i64> {
        self.state
            .lock()
            .unwrap()
            .requests
            .iter()
            .filter(|(k, _, _)| *k == kind)
            .map(|(_, _, knowledge)| *knowledge)
            .collect()
    }

    fn delta<T: Clone>(
        &self,
        kind: SyncKind,
        budget_id: Uuid,
        knowledge: i64,
        pick: impl FnOnce(&FakeState) -> Option<&Delta<T>>,
    ) -> Result<Delta<T>, RemoteError> {
        let mut state = self.state.lock().unwrap();
        state.requests.push((kind, budget_id, knowledge));
        if state.failing_kinds.contains(&kind) {
            return Err(unavailable());
        }
        Ok(pick(&*state).cloned().unwrap_or_else(|| Delta {
            server_knowledge: 0,
            records: Vec::new(),
        }))
    }
}

fn unavailable() -> RemoteError {
    RemoteError::Server {
        status: StatusCode::SERVICE_UNAVAILABLE,
        message: "try again later".to_string(),
    }
}

#[async_trait]
impl LedgerApi for FakeLedger {
    async fn refresh_token(&self, refresh_token: &str) -> Result<TokenPair, RemoteError> {
        let state = self.state.lock().unwrap();
        if let Some(status) = state.refresh_status {
            return Err(RemoteError::Server {
                status,
                message: "try again later".to_string(),
            });
        }
        if state.rejected_tokens.contains(refresh_token) {
            return Err(RemoteError::Unauthorized("invalid_grant".to_string()));
        }
        Ok(TokenPair {
            access_token: format!("access-{refresh_token}"),
            refresh_token: refresh_token.to_string(),
            expires_in: Some(7200),
            token_type: Some("bearer".to_string()),
        })
    }

    async fn budgets(&self, _access_token: &str) -> Result<Vec<BudgetSummary>, RemoteError> {
        let state = self.state.lock().unwrap();
        if state.budgets_unavailable {
            return Err(unavailable());
        }
        Ok(state.budgets.clone())
    }

    async fn categories(
        &self,
        _access_token: &str,
        budget_id: Uuid,
        knowledge: i64,
    ) -> Result<Delta<Category>, RemoteError> {
        self.delta(SyncKind::Categories, budget_id, knowledge, |state| {
            state.categories.get(&budget_id)
        })
    }

    async fn accounts(
        &self,
        _access_token: &str,
        budget_id: Uuid,
        knowledge: i64,
    ) -> Result<Delta<Account>, RemoteError> {
        self.delta(SyncKind::Accounts, budget_id, knowledge, |state| {
            state.accounts.get(&budget_id)
        })
    }

    async fn transactions(
        &self,
        _access_token: &str,
        budget_id: Uuid,
        knowledge: i64,
    ) -> Result<Delta<Transaction>, RemoteError> {
        self.delta(SyncKind::Transactions, budget_id, knowledge, |state| {
            state.transactions.get(&budget_id)
        })
    }
}

pub async fn engine_with_db() -> (Engine, Arc<FakeLedger>, DatabaseConnection) {
    engine_with_options(SyncOptions::default()).await
}

pub async fn engine_with_options(options: SyncOptions) -> (Engine, Arc<FakeLedger>, DatabaseConnection) {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    let ledger = Arc::new(FakeLedger::default());
    let engine = Engine::builder()
        .database(db.clone())
        .ledger(ledger.clone())
        .options(options)
        .build()
        .await
        .unwrap();
    (engine, ledger, db)
}

pub fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2021, 3, 15, 12, 0, 0).unwrap()
}

pub fn date(value: &str) -> NaiveDate {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").unwrap()
}

/// Create a connected user owning one budget; returns (user, local budget).
pub async fn connected_user_with_budget(engine: &Engine, email: &str, remote_budget: Uuid) -> (Uuid, Uuid) {
    let user_id = engine.create_user(email, now()).await.unwrap();
    engine.connect_user(user_id, &format!("refresh-{email}")).await.unwrap();
    engine
        .reconcile_budgets(
            user_id,
            vec![BudgetSummary {
                id: remote_budget,
                name: "Household".to_string(),
            }],
            now(),
        )
        .await
        .unwrap();
    let budget = engine.budget_by_remote_id(remote_budget).await.unwrap();
    (user_id, budget.id)
}

pub fn remote_category(id: Uuid, name: &str, balance: i64, activity: i64, budgeted: i64) -> Category {
    Category {
        id,
        name: name.to_string(),
        category_group_name: Some("Everyday".to_string()),
        balance,
        budgeted,
        activity,
        goal_target: None,
        hidden: false,
        deleted: false,
    }
}

pub fn remote_account(id: Uuid, name: &str, balance: i64) -> Account {
    Account {
        id,
        name: name.to_string(),
        kind: Some("checking".to_string()),
        balance,
        cleared_balance: balance,
        uncleared_balance: 0,
        closed: false,
        deleted: false,
    }
}

pub fn remote_transaction(id: &str, on: &str, amount: i64, category_id: Option<Uuid>) -> Transaction {
    Transaction {
        id: id.to_string(),
        date: date(on),
        amount,
        memo: None,
        account_id: None,
        account_name: Some("Checking".to_string()),
        payee_name: Some(format!("Payee {id}")),
        category_id,
        category_name: None,
        deleted: false,
    }
}

pub fn delta<T>(server_knowledge: i64, records: Vec<T>) -> Delta<T> {
    Delta {
        server_knowledge,
        records,
    }
}
