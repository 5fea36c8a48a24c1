//! Mirrored budget categories.
//!
//! Everything but `historical_average` and `typical_spending_pattern` is
//! remote-authoritative. Those two are derived from mirrored transactions
//! and only the spending-pattern recomputation writes them.

use api_types::category::Category as RemoteCategory;
use sea_orm::entity::{ActiveValue, prelude::*};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: Uuid,
    pub remote_id: Uuid,
    pub budget_id: Uuid,
    pub name: String,
    pub group_name: Option<String>,
    /// Milliunits available in the category this month.
    pub balance: i64,
    pub budgeted: i64,
    /// Milliunits spent (negative) or refunded this month.
    pub activity: i64,
    pub target_amount: Option<i64>,
    pub hidden: bool,
    /// Average absolute transaction amount, in milliunits.
    pub historical_average: i64,
    /// Where in the month spending usually lands: 0 = first day, 1 = last day.
    pub typical_spending_pattern: f64,
}

impl Category {
    /// Build the local shape of a remote category. Derived fields start empty.
    pub fn from_remote(id: Uuid, budget_id: Uuid, remote: &RemoteCategory) -> Self {
        Self {
            id,
            remote_id: remote.id,
            budget_id,
            name: remote.name.clone(),
            group_name: remote.category_group_name.clone(),
            balance: remote.balance,
            budgeted: remote.budgeted,
            activity: remote.activity,
            target_amount: remote.goal_target,
            hidden: remote.hidden,
            historical_average: 0,
            typical_spending_pattern: 0.0,
        }
    }

    /// Active model touching only remote-authoritative columns.
    pub(crate) fn remote_fields(&self) -> ActiveModel {
        ActiveModel {
            historical_average: ActiveValue::NotSet,
            typical_spending_pattern: ActiveValue::NotSet,
            ..ActiveModel::from(self)
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "categories")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub remote_id: Uuid,
    pub budget_id: Uuid,
    pub name: String,
    pub group_name: Option<String>,
    pub balance: i64,
    pub budgeted: i64,
    pub activity: i64,
    pub target_amount: Option<i64>,
    pub hidden: bool,
    pub historical_average: i64,
    #[sea_orm(column_type = "Double")]
    pub typical_spending_pattern: f64,
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
    #[sea_orm(has_many = "super::transactions::Entity")]
    Transactions,
    #[sea_orm(has_many = "super::category_history::Entity")]
    History,
}

impl Related<super::budgets::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Budget.def()
    }
}

impl Related<super::transactions::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Transactions.def()
    }
}

impl Related<super::category_history::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::History.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Category> for ActiveModel {
    fn from(value: &Category) -> Self {
        Self {
            id: ActiveValue::Set(value.id),
            remote_id: ActiveValue::Set(value.remote_id),
            budget_id: ActiveValue::Set(value.budget_id),
            name: ActiveValue::Set(value.name.clone()),
            group_name: ActiveValue::Set(value.group_name.clone()),
            balance: ActiveValue::Set(value.balance),
            budgeted: ActiveValue::Set(value.budgeted),
            activity: ActiveValue::Set(value.activity),
            target_amount: ActiveValue::Set(value.target_amount),
            hidden: ActiveValue::Set(value.hidden),
            historical_average: ActiveValue::Set(value.historical_average),
            typical_spending_pattern: ActiveValue::Set(value.typical_spending_pattern),
        }
    }
}

impl From<Model> for Category {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            remote_id: model.remote_id,
            budget_id: model.budget_id,
            name: model.name,
            group_name: model.group_name,
            balance: model.balance,
            budgeted: model.budgeted,
            activity: model.activity,
            target_amount: model.target_amount,
            hidden: model.hidden,
            historical_average: model.historical_average,
            typical_spending_pattern: model.typical_spending_pattern,
        }
    }
}
