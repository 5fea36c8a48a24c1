use api_types::auth::TokenPair;
use chrono::{DateTime, TimeDelta, Utc};
use sea_orm::{
    ActiveValue, Condition, QueryFilter, QueryOrder, QuerySelect, prelude::*, sea_query::Expr,
};

use crate::{EngineError, ResultEngine, users};

use super::Engine;

fn normalize_email(value: &str) -> ResultEngine<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() || !trimmed.contains('@') {
        return Err(EngineError::InvalidId(format!("invalid email: {value:?}")));
    }
    Ok(trimmed.to_lowercase())
}

impl Engine {
    /// Register a user. The user is not connected until a refresh token is
    /// stored with [`Engine::connect_user`].
    pub async fn create_user(&self, email: &str, now: DateTime<Utc>) -> ResultEngine<Uuid> {
        let email = normalize_email(email)?;
        if users::Entity::find()
            .filter(users::Column::Email.eq(email.clone()))
            .one(&self.database)
            .await?
            .is_some()
        {
            return Err(EngineError::ExistingKey(email));
        }

        let id = Uuid::new_v4();
        users::ActiveModel {
            id: ActiveValue::Set(id),
            email: ActiveValue::Set(email),
            access_token: ActiveValue::Set(None),
            refresh_token: ActiveValue::Set(None),
            token_expires_at: ActiveValue::Set(None),
            last_synced_at: ActiveValue::Set(None),
            created_at: ActiveValue::Set(now),
        }
        .insert(&self.database)
        .await?;
        Ok(id)
    }

    pub async fn user(&self, user_id: Uuid) -> ResultEngine<users::Model> {
        users::Entity::find_by_id(user_id)
            .one(&self.database)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound(format!("user {user_id}")))
    }

    pub async fn user_by_email(&self, email: &str) -> ResultEngine<users::Model> {
        let email = normalize_email(email)?;
        users::Entity::find()
            .filter(users::Column::Email.eq(email.clone()))
            .one(&self.database)
            .await?
            .ok_or(EngineError::KeyNotFound(email))
    }

    /// Store the refresh token obtained from the remote authorization flow.
    pub async fn connect_user(&self, user_id: Uuid, refresh_token: &str) -> ResultEngine<()> {
        let refresh_token = refresh_token.trim();
        if refresh_token.is_empty() {
            return Err(EngineError::InvalidId(
                "refresh token must not be empty".to_string(),
            ));
        }
        let result = users::Entity::update_many()
            .col_expr(users::Column::RefreshToken, Expr::value(refresh_token))
            .col_expr(users::Column::AccessToken, Expr::value(Option::<String>::None))
            .col_expr(
                users::Column::TokenExpiresAt,
                Expr::value(Option::<DateTime<Utc>>::None),
            )
            .filter(users::Column::Id.eq(user_id))
            .exec(&self.database)
            .await?;
        if result.rows_affected == 0 {
            return Err(EngineError::KeyNotFound(format!("user {user_id}")));
        }
        Ok(())
    }

    /// Drop both tokens so the user has to authorize again.
    pub async fn clear_connection(&self, user_id: Uuid) -> ResultEngine<()> {
        let result = users::Entity::update_many()
            .col_expr(users::Column::RefreshToken, Expr::value(Option::<String>::None))
            .col_expr(users::Column::AccessToken, Expr::value(Option::<String>::None))
            .col_expr(
                users::Column::TokenExpiresAt,
                Expr::value(Option::<DateTime<Utc>>::None),
            )
            .filter(users::Column::Id.eq(user_id))
            .exec(&self.database)
            .await?;
        if result.rows_affected == 0 {
            return Err(EngineError::KeyNotFound(format!("user {user_id}")));
        }
        Ok(())
    }

    pub(super) async fn store_tokens(
        &self,
        user_id: Uuid,
        tokens: &TokenPair,
        now: DateTime<Utc>,
    ) -> ResultEngine<()> {
        let expires_at = tokens
            .expires_in
            .and_then(TimeDelta::try_seconds)
            .map(|lifetime| now + lifetime);
        users::ActiveModel {
            id: ActiveValue::Set(user_id),
            access_token: ActiveValue::Set(Some(tokens.access_token.clone())),
            refresh_token: ActiveValue::Set(Some(tokens.refresh_token.clone())),
            token_expires_at: ActiveValue::Set(expires_at),
            ..Default::default()
        }
        .update(&self.database)
        .await?;
        Ok(())
    }

    pub(super) async fn mark_synced(&self, user_id: Uuid, now: DateTime<Utc>) -> ResultEngine<()> {
        users::Entity::update_many()
            .col_expr(users::Column::LastSyncedAt, Expr::value(Some(now)))
            .filter(users::Column::Id.eq(user_id))
            .exec(&self.database)
            .await?;
        Ok(())
    }

    /// Connected users not synced within the configured interval.
    ///
    /// Never-synced users come first, then the least recently synced.
    pub async fn due_users(&self, now: DateTime<Utc>, limit: u64) -> ResultEngine<Vec<users::Model>> {
        let threshold = now - self.options.min_sync_interval;
        let due = users::Entity::find()
            .filter(users::Column::RefreshToken.is_not_null())
            .filter(
                Condition::any()
                    .add(users::Column::LastSyncedAt.is_null())
                    .add(users::Column::LastSyncedAt.lt(threshold)),
            )
            .order_by_asc(users::Column::LastSyncedAt)
            .order_by_asc(users::Column::CreatedAt)
            .limit(limit)
            .all(&self.database)
            .await?;
        Ok(due)
    }
}
