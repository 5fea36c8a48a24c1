mod common;

use common::*;
use engine::EntityKind;
use sea_orm::ConnectionTrait;
use uuid::Uuid;

#[tokio::test]
async fn reapplying_a_transaction_batch_is_idempotent() {
    let (engine, _ledger, _db) = engine_with_db().await;
    let (_, budget_id) = connected_user_with_budget(&engine, "a@example.com", Uuid::new_v4()).await;
    let rent = Uuid::new_v4();
    engine
        .reconcile_categories(
            budget_id,
            delta(5, vec![remote_category(rent, "Rent", 0, -900_000, 900_000)]),
            0,
        )
        .await
        .unwrap();

    let batch = vec![
        remote_transaction("t-1", "2021-01-01", -450_000, Some(rent)),
        remote_transaction("t-2", "2021-01-15", -450_000, Some(rent)),
    ];
    let first = engine
        .reconcile_transactions(budget_id, delta(7, batch.clone()), 0)
        .await
        .unwrap();
    assert_eq!(first.kind, EntityKind::Transactions);
    assert_eq!(first.inserted, 2);
    assert_eq!(first.cursor, 7);

    let second = engine
        .reconcile_transactions(budget_id, delta(7, batch), 7)
        .await
        .unwrap();
    assert_eq!(second.inserted, 0);
    assert_eq!(second.updated, 2);

    assert_eq!(engine.budget_transactions(budget_id, 2021).await.unwrap().len(), 2);
    let history = engine.category_history(budget_id, 2021).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].month, "2021-01");
    assert_eq!(history[0].activity_sum, -900_000);
}

#[tokio::test]
async fn failed_record_write_is_skipped_while_siblings_land() {
    let (engine, _ledger, db) = engine_with_db().await;
    let (_, budget_id) = connected_user_with_budget(&engine, "f@example.com", Uuid::new_v4()).await;
    db.execute_unprepared(
        "CREATE TRIGGER reject_t_bad BEFORE INSERT ON transactions \
         WHEN NEW.remote_id = 't-bad' \
         BEGIN SELECT RAISE(ABORT, 'rejected'); END",
    )
    .await
    .unwrap();

    let report = engine
        .reconcile_transactions(
            budget_id,
            delta(
                12,
                vec![
                    remote_transaction("t-1", "2021-04-01", -1_000, None),
                    remote_transaction("t-bad", "2021-04-02", -2_000, None),
                    remote_transaction("t-2", "2021-04-03", -3_000, None),
                ],
            ),
            4,
        )
        .await
        .unwrap();

    assert_eq!(report.failed, 1);
    assert_eq!(report.inserted, 2);
    assert_eq!(report.server_knowledge, 12);
    assert_eq!(report.cursor, 12);
    assert!(engine.transaction_by_remote_id(budget_id, "t-1").await.unwrap().is_some());
    assert!(engine.transaction_by_remote_id(budget_id, "t-2").await.unwrap().is_some());
    assert!(engine.transaction_by_remote_id(budget_id, "t-bad").await.unwrap().is_none());
}

#[tokio::test]
async fn delete_flag_removes_rows_and_ignores_unknown_ones() {
    let (engine, _ledger, _db) = engine_with_db().await;
    let (_, budget_id) = connected_user_with_budget(&engine, "b@example.com", Uuid::new_v4()).await;
    engine
        .reconcile_transactions(
            budget_id,
            delta(3, vec![remote_transaction("t-1", "2021-02-01", -1_000, None)]),
            0,
        )
        .await
        .unwrap();

    let mut gone = remote_transaction("t-1", "2021-02-01", -1_000, None);
    gone.deleted = true;
    let mut never_seen = remote_transaction("t-9", "2021-02-03", -2_000, None);
    never_seen.deleted = true;

    let report = engine
        .reconcile_transactions(budget_id, delta(4, vec![gone, never_seen]), 3)
        .await
        .unwrap();
    assert_eq!(report.deleted, 1);
    assert_eq!(report.unchanged, 1);
    assert_eq!(report.failed, 0);
    assert!(engine
        .transaction_by_remote_id(budget_id, "t-1")
        .await
        .unwrap()
        .is_none());

    let mut category = remote_category(Uuid::new_v4(), "Gone", 0, 0, 0);
    category.deleted = true;
    let report = engine
        .reconcile_categories(budget_id, delta(1, vec![category]), 0)
        .await
        .unwrap();
    assert_eq!(report.unchanged, 1);
    assert!(engine.budget_categories(budget_id).await.unwrap().is_empty());
}

#[tokio::test]
async fn last_occurrence_wins_inside_one_batch() {
    let (engine, _ledger, _db) = engine_with_db().await;
    let (_, budget_id) = connected_user_with_budget(&engine, "c@example.com", Uuid::new_v4()).await;
    let checking = Uuid::new_v4();

    let report = engine
        .reconcile_accounts(
            budget_id,
            delta(
                9,
                vec![
                    remote_account(checking, "Checking", 1_000),
                    remote_account(checking, "Checking", 5_000),
                ],
            ),
            0,
        )
        .await
        .unwrap();
    assert_eq!(report.inserted, 1);
    assert_eq!(report.cursor, 0);
    assert_eq!(report.server_knowledge, 9);

    let accounts = engine.budget_accounts(budget_id).await.unwrap();
    assert_eq!(accounts.len(), 1);
    assert_eq!(accounts[0].balance, 5_000);
}

#[tokio::test]
async fn category_cursor_is_zero_after_every_pass() {
    let (engine, _ledger, _db) = engine_with_db().await;
    let (_, budget_id) = connected_user_with_budget(&engine, "d@example.com", Uuid::new_v4()).await;
    let remote = remote_category(Uuid::new_v4(), "Fun", 10, -5, 15);

    for prior in [0, 40] {
        let report = engine
            .reconcile_categories(budget_id, delta(50, vec![remote.clone()]), prior)
            .await
            .unwrap();
        assert_eq!(report.cursor, 0);
        assert_eq!(report.server_knowledge, 50);
    }
    assert_eq!(engine.budget_categories(budget_id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn payee_is_cleaned_and_raw_payee_kept() {
    let (engine, _ledger, _db) = engine_with_db().await;
    let (_, budget_id) = connected_user_with_budget(&engine, "e@example.com", Uuid::new_v4()).await;
    let mut card = remote_transaction("t-1", "2021-04-03", -12_340, None);
    card.payee_name = Some("8286 COGO ANTWERPEN Betaling met 123".to_string());
    let mut missing = remote_transaction("t-2", "2021-04-04", -1_000, None);
    missing.payee_name = None;

    engine
        .reconcile_transactions(budget_id, delta(2, vec![card, missing]), 0)
        .await
        .unwrap();

    let card = engine
        .transaction_by_remote_id(budget_id, "t-1")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(card.payee_name, "COGO ANTWERPEN");
    assert_eq!(
        card.raw_payee_name.as_deref(),
        Some("8286 COGO ANTWERPEN Betaling met 123")
    );
    let missing = engine
        .transaction_by_remote_id(budget_id, "t-2")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(missing.payee_name, "");
    assert_eq!(missing.raw_payee_name, None);
}

#[tokio::test]
async fn remote_updates_keep_cached_suggestions() {
    let (engine, _ledger, _db) = engine_with_db().await;
    let (_, budget_id) = connected_user_with_budget(&engine, "f@example.com", Uuid::new_v4()).await;
    engine
        .reconcile_transactions(
            budget_id,
            delta(1, vec![remote_transaction("t-1", "2021-03-10", -5_000, None)]),
            0,
        )
        .await
        .unwrap();
    engine
        .store_suggestion(budget_id, "t-1", "Groceries", Some(0.8), now())
        .await
        .unwrap();

    let mut edited = remote_transaction("t-1", "2021-03-10", -6_000, None);
    edited.memo = Some("split".to_string());
    engine
        .reconcile_transactions(budget_id, delta(2, vec![edited]), 1)
        .await
        .unwrap();

    let tx = engine
        .transaction_by_remote_id(budget_id, "t-1")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(tx.amount, -6_000);
    assert_eq!(tx.memo.as_deref(), Some("split"));
    assert_eq!(tx.ai_suggested_category.as_deref(), Some("Groceries"));
    assert_eq!(
        engine.cached_suggestion(budget_id, "t-1", now()).await.unwrap(),
        Some(("Groceries".to_string(), Some(0.8)))
    );
}

#[tokio::test]
async fn category_updates_keep_derived_fields() {
    let (engine, _ledger, _db) = engine_with_db().await;
    let (_, budget_id) = connected_user_with_budget(&engine, "g@example.com", Uuid::new_v4()).await;
    let food = Uuid::new_v4();
    engine
        .reconcile_categories(
            budget_id,
            delta(1, vec![remote_category(food, "Food", 0, 0, 50_000)]),
            0,
        )
        .await
        .unwrap();
    engine
        .reconcile_transactions(
            budget_id,
            delta(
                1,
                vec![remote_transaction("t-1", "2021-01-31", -31_000, Some(food))],
            ),
            0,
        )
        .await
        .unwrap();

    engine
        .reconcile_categories(
            budget_id,
            delta(2, vec![remote_category(food, "Food & drink", 19_000, -31_000, 50_000)]),
            0,
        )
        .await
        .unwrap();

    let food = engine
        .category_by_remote_id(budget_id, food)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(food.name, "Food & drink");
    assert_eq!(food.balance, 19_000);
    assert_eq!(food.historical_average, 31_000);
    assert!((food.typical_spending_pattern - 1.0).abs() < 1e-9);
}
