//! Mirrored transactions.
//!
//! Besides the remote fields a transaction row carries the cached category
//! suggestion (`ai_*` columns). Reconciliation never writes those columns,
//! so a suggestion survives any number of remote updates.

use api_types::transaction::Transaction as RemoteTransaction;
use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::entity::{ActiveValue, prelude::*};
use serde::{Deserialize, Serialize};

use crate::payee::clean_payee;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: Uuid,
    pub remote_id: String,
    pub budget_id: Uuid,
    pub account_name: String,
    /// Signed milliunits; outflows are negative.
    pub amount: i64,
    pub date: NaiveDate,
    /// Local category id; `None` when uncategorized or not yet mirrored.
    pub category_id: Option<Uuid>,
    /// Display payee, cleaned from the bank import noise.
    pub payee_name: String,
    /// Payee exactly as the remote ledger reported it.
    pub raw_payee_name: Option<String>,
    pub memo: Option<String>,
    pub ai_suggested_category: Option<String>,
    pub ai_suggestion_date: Option<DateTime<Utc>>,
    pub ai_suggestion_confidence: Option<f64>,
}

impl Transaction {
    /// Build the local shape of a remote transaction.
    ///
    /// `category_id` is the already-resolved local category; the caller owns
    /// the remote-to-local lookup.
    pub fn from_remote(
        id: Uuid,
        budget_id: Uuid,
        category_id: Option<Uuid>,
        remote: &RemoteTransaction,
    ) -> Self {
        Self {
            id,
            remote_id: remote.id.clone(),
            budget_id,
            account_name: remote.account_name.clone().unwrap_or_default(),
            amount: remote.amount,
            date: remote.date,
            category_id,
            payee_name: clean_payee(remote.payee_name.as_deref()),
            raw_payee_name: remote.payee_name.clone(),
            memo: remote.memo.clone(),
            ai_suggested_category: None,
            ai_suggestion_date: None,
            ai_suggestion_confidence: None,
        }
    }

    /// Active model touching only remote-authoritative columns.
    pub(crate) fn remote_fields(&self) -> ActiveModel {
        ActiveModel {
            ai_suggested_category: ActiveValue::NotSet,
            ai_suggestion_date: ActiveValue::NotSet,
            ai_suggestion_confidence: ActiveValue::NotSet,
            ..ActiveModel::from(self)
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "transactions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub remote_id: String,
    pub budget_id: Uuid,
    pub account_name: String,
    pub amount: i64,
    pub date: NaiveDate,
    pub category_id: Option<Uuid>,
    pub payee_name: String,
    pub raw_payee_name: Option<String>,
    pub memo: Option<String>,
    pub ai_suggested_category: Option<String>,
    pub ai_suggestion_date: Option<DateTime<Utc>>,
    #[sea_orm(column_type = "Double", nullable)]
    pub ai_suggestion_confidence: Option<f64>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::budgets::Entity",
        from = "Column::BudgetId",
        to = "super::budgets::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Budget,
    #[sea_orm(
        belongs_to = "super::categories::Entity",
        from = "Column::CategoryId",
        to = "super::categories::Column::Id",
        on_update = "NoAction",
        on_delete = "SetNull"
    )]
    Category,
}

impl Related<super::budgets::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Budget.def()
    }
}

impl Related<super::categories::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Category.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Transaction> for ActiveModel {
    fn from(tx: &Transaction) -> Self {
        Self {
            id: ActiveValue::Set(tx.id),
            remote_id: ActiveValue::Set(tx.remote_id.clone()),
            budget_id: ActiveValue::Set(tx.budget_id),
            account_name: ActiveValue::Set(tx.account_name.clone()),
            amount: ActiveValue::Set(tx.amount),
            date: ActiveValue::Set(tx.date),
            category_id: ActiveValue::Set(tx.category_id),
            payee_name: ActiveValue::Set(tx.payee_name.clone()),
            raw_payee_name: ActiveValue::Set(tx.raw_payee_name.clone()),
            memo: ActiveValue::Set(tx.memo.clone()),
            ai_suggested_category: ActiveValue::Set(tx.ai_suggested_category.clone()),
            ai_suggestion_date: ActiveValue::Set(tx.ai_suggestion_date),
            ai_suggestion_confidence: ActiveValue::Set(tx.ai_suggestion_confidence),
        }
    }
}

impl From<Model> for Transaction {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            remote_id: model.remote_id,
            budget_id: model.budget_id,
            account_name: model.account_name,
            amount: model.amount,
            date: model.date,
            category_id: model.category_id,
            payee_name: model.payee_name,
            raw_payee_name: model.raw_payee_name,
            memo: model.memo,
            ai_suggested_category: model.ai_suggested_category,
            ai_suggestion_date: model.ai_suggestion_date,
            ai_suggestion_confidence: model.ai_suggestion_confidence,
        }
    }
}
