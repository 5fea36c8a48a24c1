//! Mirrored accounts. Identity is the remote id within a budget.

use api_types::account::Account as RemoteAccount;
use sea_orm::entity::{ActiveValue, prelude::*};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: Uuid,
    pub remote_id: Uuid,
    pub budget_id: Uuid,
    pub name: String,
    pub kind: Option<String>,
    pub balance: i64,
    pub cleared_balance: i64,
    pub uncleared_balance: i64,
    pub closed: bool,
}

impl Account {
    pub fn from_remote(id: Uuid, budget_id: Uuid, remote: &RemoteAccount) -> Self {
        Self {
            id,
            remote_id: remote.id,
            budget_id,
            name: remote.name.clone(),
            kind: remote.kind.clone(),
            balance: remote.balance,
            cleared_balance: remote.cleared_balance,
            uncleared_balance: remote.uncleared_balance,
            closed: remote.closed,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "accounts")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub remote_id: Uuid,
    pub budget_id: Uuid,
    pub name: String,
    pub kind: Option<String>,
    pub balance: i64,
    pub cleared_balance: i64,
    pub uncleared_balance: i64,
    pub closed: bool,
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
}

impl Related<super::budgets::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Budget.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Account> for ActiveModel {
    fn from(value: &Account) -> Self {
        Self {
            id: ActiveValue::Set(value.id),
            remote_id: ActiveValue::Set(value.remote_id),
            budget_id: ActiveValue::Set(value.budget_id),
            name: ActiveValue::Set(value.name.clone()),
            kind: ActiveValue::Set(value.kind.clone()),
            balance: ActiveValue::Set(value.balance),
            cleared_balance: ActiveValue::Set(value.cleared_balance),
            uncleared_balance: ActiveValue::Set(value.uncleared_balance),
            closed: ActiveValue::Set(value.closed),
        }
    }
}

impl From<Model> for Account {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            remote_id: model.remote_id,
            budget_id: model.budget_id,
            name: model.name,
            kind: model.kind,
            balance: model.balance,
            cleared_balance: model.cleared_balance,
            uncleared_balance: model.uncleared_balance,
            closed: model.closed,
        }
    }
}
