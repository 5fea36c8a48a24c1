//! Users whose remote ledger is mirrored.
//!
//! A user is "connected" while a refresh token is stored. Clearing both
//! tokens forces the user through the remote authorization flow again.

use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub email: String,
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub token_expires_at: Option<DateTime<Utc>>,
    pub last_synced_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Model {
    pub fn is_connected(&self) -> bool {
        self.refresh_token.is_some()
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::budget_owners::Entity")]
    BudgetOwners,
}

impl Related<super::budget_owners::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::BudgetOwners.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
