//! Wire types of the remote ledger API.
//!
//! Every amount is an integer in milliunits (1000 = one unit of the budget
//! currency). Delta endpoints take a `last_knowledge_of_server` cursor and
//! answer with the records changed since then plus the new cursor.
use serde::{Deserialize, Serialize};

/// Standard `{ "data": ... }` envelope used by every endpoint.
#[derive(Debug, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub data: T,
}

/// Error body returned on non-success statuses.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub detail: Option<String>,
}

pub mod auth {
    use super::*;

    /// Response of the OAuth refresh-token grant.
    #[derive(Clone, Debug, Serialize, Deserialize)]
    pub struct TokenPair {
        pub access_token: String,
        pub refresh_token: String,
        /// Lifetime of the access token, in seconds.
        #[serde(default)]
        pub expires_in: Option<i64>,
        #[serde(default)]
        pub token_type: Option<String>,
    }
}

pub mod budget {
    use super::*;
    use uuid::Uuid;

    #[derive(Clone, Debug, Serialize, Deserialize)]
    pub struct BudgetSummary {
        pub id: Uuid,
        pub name: String,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct BudgetsResponse {
        pub budgets: Vec<BudgetSummary>,
    }
}

pub mod category {
    use super::*;
    use uuid::Uuid;

    #[derive(Clone, Debug, Serialize, Deserialize)]
    pub struct Category {
        pub id: Uuid,
        pub name: String,
        #[serde(default)]
        pub category_group_name: Option<String>,
        pub balance: i64,
        pub budgeted: i64,
        pub activity: i64,
        /// Goal target, absent when the category has no goal.
        #[serde(default)]
        pub goal_target: Option<i64>,
        #[serde(default)]
        pub hidden: bool,
        #[serde(default)]
        pub deleted: bool,
    }

    #[derive(Clone, Debug, Serialize, Deserialize)]
    pub struct CategoryGroup {
        pub id: Uuid,
        pub name: String,
        #[serde(default)]
        pub deleted: bool,
        #[serde(default)]
        pub categories: Vec<Category>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct CategoriesResponse {
        pub category_groups: Vec<CategoryGroup>,
        pub server_knowledge: i64,
    }
}

pub mod account {
    use super::*;
    use uuid::Uuid;

    #[derive(Clone, Debug, Serialize, Deserialize)]
    pub struct Account {
        pub id: Uuid,
        pub name: String,
        #[serde(default, rename = "type")]
        pub kind: Option<String>,
        pub balance: i64,
        pub cleared_balance: i64,
        pub uncleared_balance: i64,
        #[serde(default)]
        pub closed: bool,
        #[serde(default)]
        pub deleted: bool,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct AccountsResponse {
        pub accounts: Vec<Account>,
        pub server_knowledge: i64,
    }
}

pub mod transaction {
    use super::*;
    use chrono::NaiveDate;
    use uuid::Uuid;

    #[derive(Clone, Debug, Serialize, Deserialize)]
    pub struct Transaction {
        pub id: String,
        pub date: NaiveDate,
        pub amount: i64,
        #[serde(default)]
        pub memo: Option<String>,
        #[serde(default)]
        pub account_id: Option<Uuid>,
        #[serde(default)]
        pub account_name: Option<String>,
        #[serde(default)]
        pub payee_name: Option<String>,
        #[serde(default)]
        pub category_id: Option<Uuid>,
        #[serde(default)]
        pub category_name: Option<String>,
        #[serde(default)]
        pub deleted: bool,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct TransactionsResponse {
        pub transactions: Vec<Transaction>,
        pub server_knowledge: i64,
    }
}
