mod common;

use api_types::budget::BudgetSummary;
use chrono::TimeDelta;
use common::*;
use engine::{EngineError, SyncKind, SyncOptions};
use reqwest::StatusCode;
use uuid::Uuid;

struct Fixture {
    remote_budget: Uuid,
    groceries: Uuid,
}

fn seed(ledger: &FakeLedger) -> Fixture {
    let remote_budget = Uuid::new_v4();
    let groceries = Uuid::new_v4();
    let checking = Uuid::new_v4();
    ledger.with(|state| {
        state.budgets = vec![BudgetSummary {
            id: remote_budget,
            name: "Household".to_string(),
        }];
        state.categories.insert(
            remote_budget,
            delta(
                10,
                vec![remote_category(groceries, "Groceries", 40_000, -60_000, 100_000)],
            ),
        );
        state
            .accounts
            .insert(remote_budget, delta(20, vec![remote_account(checking, "Checking", 250_000)]));
        state.transactions.insert(
            remote_budget,
            delta(
                30,
                vec![
                    remote_transaction("tx-1", "2021-03-02", -25_000, Some(groceries)),
                    remote_transaction("tx-2", "2021-03-05", -35_000, Some(Uuid::new_v4())),
                ],
            ),
        );
    });
    Fixture {
        remote_budget,
        groceries,
    }
}

#[tokio::test]
async fn sync_resolves_categories_mirrored_in_the_same_cycle() {
    let (engine, ledger, _db) = engine_with_db().await;
    let fixture = seed(&ledger);
    let user_id = engine.create_user("alice@example.com", now()).await.unwrap();
    engine.connect_user(user_id, "refresh-alice").await.unwrap();

    let report = engine.sync_user(user_id, now()).await.unwrap();
    assert_eq!(report.failed_budgets, 0);
    assert_eq!(report.budgets_listed.as_ref().map(|pass| pass.inserted), Some(1));
    assert_eq!(report.budgets.len(), 1);
    assert!(report.budgets[0].failed_kinds.is_empty());

    let budget = engine.budget_by_remote_id(fixture.remote_budget).await.unwrap();
    assert!(budget.owner_user_ids.contains(&user_id));
    let groceries = engine
        .category_by_remote_id(budget.id, fixture.groceries)
        .await
        .unwrap()
        .unwrap();

    let known = engine
        .transaction_by_remote_id(budget.id, "tx-1")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(known.category_id, Some(groceries.id));

    // Unknown remote category: kept, uncategorized.
    let unknown = engine
        .transaction_by_remote_id(budget.id, "tx-2")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(unknown.category_id, None);

    assert_eq!(engine.budget_accounts(budget.id).await.unwrap().len(), 1);

    let user = engine.user(user_id).await.unwrap();
    assert_eq!(user.access_token.as_deref(), Some("access-refresh-alice"));
    assert_eq!(user.last_synced_at, Some(now()));
    assert!(user.token_expires_at.is_some());
}

#[tokio::test]
async fn category_and_account_cursors_stay_at_zero() {
    let (engine, ledger, _db) = engine_with_db().await;
    let fixture = seed(&ledger);
    let user_id = engine.create_user("bob@example.com", now()).await.unwrap();
    engine.connect_user(user_id, "refresh-bob").await.unwrap();

    engine.sync_user(user_id, now()).await.unwrap();
    let budget = engine.budget_by_remote_id(fixture.remote_budget).await.unwrap();

    assert_eq!(engine.cursor(user_id, budget.id, SyncKind::Categories).await.unwrap(), 0);
    assert_eq!(engine.cursor(user_id, budget.id, SyncKind::Accounts).await.unwrap(), 0);
    assert_eq!(engine.cursor(user_id, budget.id, SyncKind::Transactions).await.unwrap(), 30);
    let categories = engine
        .cursor_row(user_id, budget.id, SyncKind::Categories)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(categories.observed_knowledge, 10);

    engine.sync_user(user_id, now()).await.unwrap();
    assert_eq!(ledger.requests(SyncKind::Categories), vec![0, 0]);
    assert_eq!(ledger.requests(SyncKind::Accounts), vec![0, 0]);
    assert_eq!(ledger.requests(SyncKind::Transactions), vec![0, 30]);
}

#[tokio::test]
async fn transaction_cursor_never_moves_backwards() {
    let (engine, ledger, _db) = engine_with_db().await;
    let fixture = seed(&ledger);
    let user_id = engine.create_user("carol@example.com", now()).await.unwrap();
    engine.connect_user(user_id, "refresh-carol").await.unwrap();
    engine.sync_user(user_id, now()).await.unwrap();

    ledger.with(|state| {
        state
            .transactions
            .insert(fixture.remote_budget, delta(12, Vec::new()));
    });
    engine.sync_user(user_id, now()).await.unwrap();

    let budget = engine.budget_by_remote_id(fixture.remote_budget).await.unwrap();
    assert_eq!(engine.cursor(user_id, budget.id, SyncKind::Transactions).await.unwrap(), 30);
}

#[tokio::test]
async fn rejected_refresh_token_clears_the_connection() {
    let (engine, ledger, _db) = engine_with_db().await;
    seed(&ledger);
    let user_id = engine.create_user("dave@example.com", now()).await.unwrap();
    engine.connect_user(user_id, "revoked").await.unwrap();
    ledger.with(|state| {
        state.rejected_tokens.insert("revoked".to_string());
    });

    let err = engine.sync_user(user_id, now()).await.unwrap_err();
    assert!(matches!(err, EngineError::Auth(_)));

    let user = engine.user(user_id).await.unwrap();
    assert!(user.refresh_token.is_none());
    assert!(user.access_token.is_none());
    assert!(user.last_synced_at.is_none());
    assert!(engine.due_users(now(), 10).await.unwrap().is_empty());
    assert_eq!(
        engine.sync_user(user_id, now()).await.unwrap_err(),
        EngineError::NotConnected(format!("user {user_id}"))
    );
}

#[tokio::test]
async fn unavailable_token_endpoint_keeps_the_connection() {
    let (engine, ledger, _db) = engine_with_db().await;
    seed(&ledger);
    let user_id = engine.create_user("erin@example.com", now()).await.unwrap();
    engine.connect_user(user_id, "refresh-erin").await.unwrap();
    ledger.with(|state| state.refresh_status = Some(StatusCode::SERVICE_UNAVAILABLE));

    let err = engine.sync_user(user_id, now()).await.unwrap_err();
    assert!(matches!(err, EngineError::Auth(_)));
    let user = engine.user(user_id).await.unwrap();
    assert_eq!(user.refresh_token.as_deref(), Some("refresh-erin"));
}

#[tokio::test]
async fn rate_limited_token_endpoint_keeps_the_connection() {
    let (engine, ledger, _db) = engine_with_db().await;
    seed(&ledger);
    let user_id = engine.create_user("grace@example.com", now()).await.unwrap();
    engine.connect_user(user_id, "refresh-grace").await.unwrap();
    ledger.with(|state| state.refresh_status = Some(StatusCode::TOO_MANY_REQUESTS));

    let err = engine.sync_user(user_id, now()).await.unwrap_err();
    assert!(matches!(err, EngineError::Auth(_)));
    let user = engine.user(user_id).await.unwrap();
    assert_eq!(user.refresh_token.as_deref(), Some("refresh-grace"));
    assert_eq!(engine.due_users(now(), 10).await.unwrap().len(), 1);

    ledger.with(|state| state.refresh_status = None);
    let report = engine.sync_user(user_id, now()).await.unwrap();
    assert_eq!(report.budgets.len(), 1);
}

#[tokio::test]
async fn failed_pass_leaves_its_cursor_and_siblings_alone() {
    let (engine, ledger, _db) = engine_with_db().await;
    let fixture = seed(&ledger);
    let user_id = engine.create_user("frank@example.com", now()).await.unwrap();
    engine.connect_user(user_id, "refresh-frank").await.unwrap();
    engine.sync_user(user_id, now()).await.unwrap();

    ledger.with(|state| {
        state.failing_kinds.insert(SyncKind::Transactions);
        state
            .transactions
            .insert(fixture.remote_budget, delta(45, Vec::new()));
        state.categories.insert(
            fixture.remote_budget,
            delta(
                11,
                vec![remote_category(fixture.groceries, "Food", 10_000, -90_000, 100_000)],
            ),
        );
    });
    let report = engine.sync_user(user_id, now()).await.unwrap();
    assert_eq!(report.budgets[0].failed_kinds, vec![SyncKind::Transactions]);
    assert!(report.budgets[0].pass(SyncKind::Categories).is_some());

    let budget = engine.budget_by_remote_id(fixture.remote_budget).await.unwrap();
    assert_eq!(engine.cursor(user_id, budget.id, SyncKind::Transactions).await.unwrap(), 30);
    let groceries = engine
        .category_by_remote_id(budget.id, fixture.groceries)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(groceries.name, "Food");
    assert_eq!(groceries.activity, -90_000);
}

#[tokio::test]
async fn budget_list_failure_still_syncs_known_budgets() {
    let (engine, ledger, _db) = engine_with_db().await;
    let fixture = seed(&ledger);
    let (user_id, budget_id) =
        connected_user_with_budget(&engine, "gina@example.com", fixture.remote_budget).await;
    ledger.with(|state| state.budgets_unavailable = true);

    let report = engine.sync_user(user_id, now()).await.unwrap();
    assert!(report.budgets_listed.is_none());
    assert_eq!(report.budgets.len(), 1);
    assert_eq!(report.budgets[0].budget_id, budget_id);
    assert_eq!(
        engine.cursor(user_id, budget_id, SyncKind::Transactions).await.unwrap(),
        30
    );
}

#[tokio::test]
async fn shared_budget_keeps_cursors_per_user() {
    let (engine, ledger, _db) = engine_with_db().await;
    let fixture = seed(&ledger);
    let (first, budget_id) =
        connected_user_with_budget(&engine, "hank@example.com", fixture.remote_budget).await;
    let (second, same_budget) =
        connected_user_with_budget(&engine, "iris@example.com", fixture.remote_budget).await;
    assert_eq!(budget_id, same_budget);

    engine.sync_user(first, now()).await.unwrap();
    assert_eq!(engine.cursor(first, budget_id, SyncKind::Transactions).await.unwrap(), 30);
    assert_eq!(engine.cursor(second, budget_id, SyncKind::Transactions).await.unwrap(), 0);

    let budget = engine.budget(budget_id).await.unwrap();
    assert_eq!(budget.owner_user_ids.len(), 2);
}

#[tokio::test]
async fn batch_isolates_a_failing_user() {
    let (engine, ledger, _db) = engine_with_db().await;
    seed(&ledger);
    let good = engine.create_user("jade@example.com", now()).await.unwrap();
    engine.connect_user(good, "refresh-jade").await.unwrap();
    let bad = engine.create_user("kyle@example.com", now()).await.unwrap();
    engine.connect_user(bad, "revoked").await.unwrap();
    let idle = engine.create_user("lena@example.com", now()).await.unwrap();
    ledger.with(|state| {
        state.rejected_tokens.insert("revoked".to_string());
    });

    let report = engine.run_due_batch(now()).await.unwrap();
    assert_eq!(report.selected, 2);
    assert_eq!(report.succeeded, 1);
    assert_eq!(report.failed, 1);

    assert!(engine.user(good).await.unwrap().last_synced_at.is_some());
    assert!(engine.user(bad).await.unwrap().refresh_token.is_none());
    assert!(engine.user(idle).await.unwrap().last_synced_at.is_none());

    // Synced within the interval: nobody is due.
    let later = now() + TimeDelta::minutes(5);
    assert_eq!(engine.run_due_batch(later).await.unwrap().selected, 0);
    let much_later = now() + TimeDelta::minutes(61);
    assert_eq!(engine.run_due_batch(much_later).await.unwrap().selected, 1);
}

#[tokio::test]
async fn due_users_are_capped_and_oldest_first() {
    let options = SyncOptions {
        batch_size: 2,
        ..SyncOptions::default()
    };
    let (engine, ledger, _db) = engine_with_options(options).await;
    seed(&ledger);
    let mut users = Vec::new();
    for name in ["mia", "noah", "olga"] {
        let id = engine
            .create_user(&format!("{name}@example.com"), now())
            .await
            .unwrap();
        engine.connect_user(id, &format!("refresh-{name}")).await.unwrap();
        users.push(id);
    }
    engine
        .sync_user(users[0], now() - TimeDelta::hours(3))
        .await
        .unwrap();

    let report = engine.run_due_batch(now()).await.unwrap();
    assert_eq!(report.selected, 2);

    // The two never-synced users went first.
    let due = engine.due_users(now() + TimeDelta::minutes(1), 10).await.unwrap();
    assert_eq!(due.len(), 1);
    assert_eq!(due[0].id, users[0]);
}
