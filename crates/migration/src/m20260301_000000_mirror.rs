//! Initial schema for the ledger mirror.
//!
//! - `users`: people whose remote ledger is mirrored, with their tokens
//! - `budgets`: mirrored budgets, addressed by remote id
//! - `budget_owners`: which users can see which budget
//! - `categories`: mirrored categories plus the derived spending fields
//! - `accounts`: mirrored accounts
//! - `transactions`: mirrored transactions plus the suggestion cache fields
//! - `category_history`: monthly activity per category, rebuilt per year
//! - `sync_cursors`: last server knowledge per (user, budget, kind)

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

// ─────────────────────────────────────────────────────────────────────────────
// Table identifiers
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Iden)]
enum Users {
    Table,
    Id,
    Email,
    AccessToken,
    RefreshToken,
    TokenExpiresAt,
    LastSyncedAt,
    CreatedAt,
}

#[derive(Iden)]
enum Budgets {
    Table,
    Id,
    RemoteId,
    Name,
    UpdatedAt,
}

#[derive(Iden)]
enum BudgetOwners {
    Table,
    BudgetId,
    UserId,
}

#[derive(Iden)]
enum Categories {
    Table,
    Id,
    RemoteId,
    BudgetId,
    Name,
    GroupName,
    Balance,
    Budgeted,
    Activity,
    TargetAmount,
    Hidden,
    HistoricalAverage,
    TypicalSpendingPattern,
}

#[derive(Iden)]
enum Accounts {
    Table,
    Id,
    RemoteId,
    BudgetId,
    Name,
    Kind,
    Balance,
    ClearedBalance,
    UnclearedBalance,
    Closed,
}

#[derive(Iden)]
enum Transactions {
    Table,
    Id,
    RemoteId,
    BudgetId,
    AccountName,
    Amount,
    Date,
    CategoryId,
    PayeeName,
    RawPayeeName,
    Memo,
    AiSuggestedCategory,
    AiSuggestionDate,
    AiSuggestionConfidence,
}

#[derive(Iden)]
enum CategoryHistory {
    Table,
    CategoryId,
    BudgetId,
    Month,
    ActivitySum,
}

#[derive(Iden)]
enum SyncCursors {
    Table,
    UserId,
    BudgetId,
    Kind,
    Knowledge,
    ObservedKnowledge,
    UpdatedAt,
}

// ─────────────────────────────────────────────────────────────────────────────
// Migration implementation
// ─────────────────────────────────────────────────────────────────────────────

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // ───────────────────────────────────────────────────────────────────
        // 1. Users
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Users::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Users::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Users::Email).string().not_null().unique_key())
                    .col(ColumnDef::new(Users::AccessToken).string())
                    .col(ColumnDef::new(Users::RefreshToken).string())
                    .col(ColumnDef::new(Users::TokenExpiresAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(Users::LastSyncedAt).timestamp_with_time_zone())
                    .col(
                        ColumnDef::new(Users::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 2. Budgets
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Budgets::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Budgets::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Budgets::RemoteId).uuid().not_null().unique_key())
                    .col(ColumnDef::new(Budgets::Name).string().not_null())
                    .col(
                        ColumnDef::new(Budgets::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(BudgetOwners::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(BudgetOwners::BudgetId).uuid().not_null())
                    .col(ColumnDef::new(BudgetOwners::UserId).uuid().not_null())
                    .primary_key(
                        Index::create()
                            .col(BudgetOwners::BudgetId)
                            .col(BudgetOwners::UserId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-budget_owners-budget_id")
                            .from(BudgetOwners::Table, BudgetOwners::BudgetId)
                            .to(Budgets::Table, Budgets::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-budget_owners-user_id")
                            .from(BudgetOwners::Table, BudgetOwners::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-budget_owners-user_id")
                    .table(BudgetOwners::Table)
                    .col(BudgetOwners::UserId)
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 3. Categories
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Categories::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Categories::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Categories::RemoteId).uuid().not_null())
                    .col(ColumnDef::new(Categories::BudgetId).uuid().not_null())
                    .col(ColumnDef::new(Categories::Name).string().not_null())
                    .col(ColumnDef::new(Categories::GroupName).string())
                    .col(ColumnDef::new(Categories::Balance).big_integer().not_null())
                    .col(ColumnDef::new(Categories::Budgeted).big_integer().not_null())
                    .col(ColumnDef::new(Categories::Activity).big_integer().not_null())
                    .col(ColumnDef::new(Categories::TargetAmount).big_integer())
                    .col(
                        ColumnDef::new(Categories::Hidden)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Categories::HistoricalAverage)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Categories::TypicalSpendingPattern)
                            .double()
                            .not_null()
                            .default(0.0),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-categories-budget_id")
                            .from(Categories::Table, Categories::BudgetId)
                            .to(Budgets::Table, Budgets::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-categories-budget_id-remote_id-unique")
                    .table(Categories::Table)
                    .col(Categories::BudgetId)
                    .col(Categories::RemoteId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 4. Accounts
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Accounts::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Accounts::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Accounts::RemoteId).uuid().not_null())
                    .col(ColumnDef::new(Accounts::BudgetId).uuid().not_null())
                    .col(ColumnDef::new(Accounts::Name).string().not_null())
                    .col(ColumnDef::new(Accounts::Kind).string())
                    .col(ColumnDef::new(Accounts::Balance).big_integer().not_null())
                    .col(
                        ColumnDef::new(Accounts::ClearedBalance)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Accounts::UnclearedBalance)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Accounts::Closed)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-accounts-budget_id")
                            .from(Accounts::Table, Accounts::BudgetId)
                            .to(Budgets::Table, Budgets::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-accounts-budget_id-remote_id-unique")
                    .table(Accounts::Table)
                    .col(Accounts::BudgetId)
                    .col(Accounts::RemoteId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 5. Transactions
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Transactions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Transactions::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Transactions::RemoteId).string().not_null())
                    .col(ColumnDef::new(Transactions::BudgetId).uuid().not_null())
                    .col(ColumnDef::new(Transactions::AccountName).string().not_null())
                    .col(ColumnDef::new(Transactions::Amount).big_integer().not_null())
                    .col(ColumnDef::new(Transactions::Date).date().not_null())
                    .col(ColumnDef::new(Transactions::CategoryId).uuid())
                    .col(ColumnDef::new(Transactions::PayeeName).string().not_null())
                    .col(ColumnDef::new(Transactions::RawPayeeName).string())
                    .col(ColumnDef::new(Transactions::Memo).string())
                    .col(ColumnDef::new(Transactions::AiSuggestedCategory).string())
                    .col(ColumnDef::new(Transactions::AiSuggestionDate).timestamp_with_time_zone())
                    .col(ColumnDef::new(Transactions::AiSuggestionConfidence).double())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-transactions-budget_id")
                            .from(Transactions::Table, Transactions::BudgetId)
                            .to(Budgets::Table, Budgets::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-transactions-category_id")
                            .from(Transactions::Table, Transactions::CategoryId)
                            .to(Categories::Table, Categories::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-transactions-budget_id-remote_id-unique")
                    .table(Transactions::Table)
                    .col(Transactions::BudgetId)
                    .col(Transactions::RemoteId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-transactions-budget_id-date")
                    .table(Transactions::Table)
                    .col(Transactions::BudgetId)
                    .col(Transactions::Date)
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 6. Category history
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(CategoryHistory::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(CategoryHistory::CategoryId).uuid().not_null())
                    .col(ColumnDef::new(CategoryHistory::BudgetId).uuid().not_null())
                    .col(ColumnDef::new(CategoryHistory::Month).string().not_null())
                    .col(
                        ColumnDef::new(CategoryHistory::ActivitySum)
                            .big_integer()
                            .not_null(),
                    )
                    .primary_key(
                        Index::create()
                            .col(CategoryHistory::CategoryId)
                            .col(CategoryHistory::Month),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-category_history-category_id")
                            .from(CategoryHistory::Table, CategoryHistory::CategoryId)
                            .to(Categories::Table, Categories::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-category_history-budget_id")
                            .from(CategoryHistory::Table, CategoryHistory::BudgetId)
                            .to(Budgets::Table, Budgets::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-category_history-budget_id-month")
                    .table(CategoryHistory::Table)
                    .col(CategoryHistory::BudgetId)
                    .col(CategoryHistory::Month)
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 7. Sync cursors
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(SyncCursors::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(SyncCursors::UserId).uuid().not_null())
                    .col(ColumnDef::new(SyncCursors::BudgetId).uuid().not_null())
                    .col(ColumnDef::new(SyncCursors::Kind).string().not_null())
                    .col(
                        ColumnDef::new(SyncCursors::Knowledge)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(SyncCursors::ObservedKnowledge)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(SyncCursors::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .primary_key(
                        Index::create()
                            .col(SyncCursors::UserId)
                            .col(SyncCursors::BudgetId)
                            .col(SyncCursors::Kind),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-sync_cursors-user_id")
                            .from(SyncCursors::Table, SyncCursors::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-sync_cursors-budget_id")
                            .from(SyncCursors::Table, SyncCursors::BudgetId)
                            .to(Budgets::Table, Budgets::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Drop in reverse order of creation (respecting FK dependencies)
        manager
            .drop_table(Table::drop().table(SyncCursors::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(CategoryHistory::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Transactions::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Accounts::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Categories::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(BudgetOwners::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Budgets::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Users::Table).to_owned())
            .await?;
        Ok(())
    }
}
