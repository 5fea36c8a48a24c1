//! Client for the remote ledger API.
//!
//! [`LedgerApi`] is the seam the sync code talks to; [`HttpLedgerApi`] is the
//! production implementation over `reqwest`.

use api_types::{
    Envelope, ErrorEnvelope,
    account::{Account, AccountsResponse},
    auth::TokenPair,
    budget::{BudgetSummary, BudgetsResponse},
    category::{CategoriesResponse, Category},
    transaction::{Transaction, TransactionsResponse},
};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use uuid::Uuid;

use crate::RemoteError;

/// Records changed since a cursor, plus the cursor to use next time.
#[derive(Clone, Debug, Default)]
pub struct Delta<T> {
    pub server_knowledge: i64,
    pub records: Vec<T>,
}

#[async_trait]
pub trait LedgerApi: Send + Sync {
    /// Exchange a refresh token for a new access/refresh token pair.
    async fn refresh_token(&self, refresh_token: &str) -> Result<TokenPair, RemoteError>;

    async fn budgets(&self, access_token: &str) -> Result<Vec<BudgetSummary>, RemoteError>;

    async fn categories(
        &self,
        access_token: &str,
        budget_id: Uuid,
        knowledge: i64,
    ) -> Result<Delta<Category>, RemoteError>;

    async fn accounts(
        &self,
        access_token: &str,
        budget_id: Uuid,
        knowledge: i64,
    ) -> Result<Delta<Account>, RemoteError>;

    async fn transactions(
        &self,
        access_token: &str,
        budget_id: Uuid,
        knowledge: i64,
    ) -> Result<Delta<Transaction>, RemoteError>;
}

/// OAuth application credentials and endpoints.
#[derive(Clone, Debug)]
pub struct LedgerConfig {
    pub base_url: String,
    pub token_url: String,
    pub client_id: String,
    pub client_secret: String,
}

#[derive(Clone, Debug)]
pub struct HttpLedgerApi {
    client: Client,
    config: LedgerConfig,
}

impl HttpLedgerApi {
    pub fn new(client: Client, config: LedgerConfig) -> Self {
        Self { client, config }
    }

    fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.config.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        access_token: &str,
        path: &str,
        knowledge: Option<i64>,
    ) -> Result<T, RemoteError> {
        let mut req = self.client.get(self.url(path)).bearer_auth(access_token);
        if let Some(knowledge) = knowledge.filter(|k| *k > 0) {
            req = req.query(&[("last_knowledge_of_server", knowledge)]);
        }

        let resp = req.send().await?;
        let status = resp.status();
        if status.is_success() {
            let envelope = resp
                .json::<Envelope<T>>()
                .await
                .map_err(|err| RemoteError::Decode(err.to_string()))?;
            return Ok(envelope.data);
        }
        Err(error_from_response(status, resp).await)
    }
}

async fn error_from_response(status: StatusCode, resp: reqwest::Response) -> RemoteError {
    let message = match resp.json::<ErrorEnvelope>().await {
        Ok(body) => body.error.detail.unwrap_or(body.error.name),
        Err(_) => "server error".to_string(),
    };
    if status == StatusCode::UNAUTHORIZED {
        return RemoteError::Unauthorized(message);
    }
    RemoteError::Server { status, message }
}

#[async_trait]
impl LedgerApi for HttpLedgerApi {
    async fn refresh_token(&self, refresh_token: &str) -> Result<TokenPair, RemoteError> {
        let resp = self
            .client
            .post(&self.config.token_url)
            .form(&[
                ("grant_type", "refresh_token"),
                ("client_id", self.config.client_id.as_str()),
                ("client_secret", self.config.client_secret.as_str()),
                ("refresh_token", refresh_token),
            ])
            .send()
            .await?;

        let status = resp.status();
        if status.is_success() {
            return resp
                .json::<TokenPair>()
                .await
                .map_err(|err| RemoteError::Decode(err.to_string()));
        }
        // The token endpoint answers with a flat OAuth error body.
        let message = resp
            .text()
            .await
            .unwrap_or_else(|_| "token refresh failed".to_string());
        if status == StatusCode::UNAUTHORIZED {
            return Err(RemoteError::Unauthorized(message));
        }
        Err(RemoteError::Server { status, message })
    }

    async fn budgets(&self, access_token: &str) -> Result<Vec<BudgetSummary>, RemoteError> {
        let data: BudgetsResponse = self.get_json(access_token, "/budgets", None).await?;
        Ok(data.budgets)
    }

    async fn categories(
        &self,
        access_token: &str,
        budget_id: Uuid,
        knowledge: i64,
    ) -> Result<Delta<Category>, RemoteError> {
        let data: CategoriesResponse = self
            .get_json(
                access_token,
                &format!("/budgets/{budget_id}/categories"),
                Some(knowledge),
            )
            .await?;

        let records = data
            .category_groups
            .into_iter()
            .flat_map(|group| {
                let group_name = group.name;
                let group_deleted = group.deleted;
                group.categories.into_iter().map(move |mut category| {
                    category
                        .category_group_name
                        .get_or_insert_with(|| group_name.clone());
                    category.deleted |= group_deleted;
                    category
                })
            })
            .collect();

        Ok(Delta {
            server_knowledge: data.server_knowledge,
            records,
        })
    }

    async fn accounts(
        &self,
        access_token: &str,
        budget_id: Uuid,
        knowledge: i64,
    ) -> Result<Delta<Account>, RemoteError> {
        let data: AccountsResponse = self
            .get_json(
                access_token,
                &format!("/budgets/{budget_id}/accounts"),
                Some(knowledge),
            )
            .await?;
        Ok(Delta {
            server_knowledge: data.server_knowledge,
            records: data.accounts,
        })
    }

    async fn transactions(
        &self,
        access_token: &str,
        budget_id: Uuid,
        knowledge: i64,
    ) -> Result<Delta<Transaction>, RemoteError> {
        let data: TransactionsResponse = self
            .get_json(
                access_token,
                &format!("/budgets/{budget_id}/transactions"),
                Some(knowledge),
            )
            .await?;
        Ok(Delta {
            server_knowledge: data.server_knowledge,
            records: data.transactions,
        })
    }
}
