//! The module contains the errors the engine can throw.
//!
//! - [`EngineError`] is what every public engine operation returns.
//! - [`RemoteError`] describes a failed call to the remote ledger API and is
//!   wrapped by [`EngineError::Remote`].
use reqwest::StatusCode;
use sea_orm::DbErr;
use thiserror::Error;

/// Engine custom errors.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("\"{0}\" key not found!")]
    KeyNotFound(String),
    #[error("\"{0}\" already present!")]
    ExistingKey(String),
    #[error("Invalid id: {0}")]
    InvalidId(String),
    #[error("Invalid date: {0}")]
    InvalidDate(String),
    #[error("User not connected: {0}")]
    NotConnected(String),
    #[error("Authentication failed: {0}")]
    Auth(String),
    #[error("Invalid configuration: {0}")]
    Config(String),
    #[error(transparent)]
    Remote(#[from] RemoteError),
    #[error(transparent)]
    Database(#[from] DbErr),
}

impl PartialEq for EngineError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::KeyNotFound(a), Self::KeyNotFound(b)) => a == b,
            (Self::ExistingKey(a), Self::ExistingKey(b)) => a == b,
            (Self::InvalidId(a), Self::InvalidId(b)) => a == b,
            (Self::InvalidDate(a), Self::InvalidDate(b)) => a == b,
            (Self::NotConnected(a), Self::NotConnected(b)) => a == b,
            (Self::Auth(a), Self::Auth(b)) => a == b,
            (Self::Config(a), Self::Config(b)) => a == b,
            (Self::Remote(a), Self::Remote(b)) => a.to_string() == b.to_string(),
            (Self::Database(a), Self::Database(b)) => a.to_string() == b.to_string(),
            _ => false,
        }
    }
}

/// Failure talking to the remote ledger API.
#[derive(Error, Debug)]
pub enum RemoteError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    #[error("{status}: {message}")]
    Server { status: StatusCode, message: String },
    #[error("unexpected response: {0}")]
    Decode(String),
}

impl RemoteError {
    /// Whether the failure means the stored credentials are no longer usable.
    ///
    /// Token endpoints answer `400 invalid_grant` or `403` for revoked or
    /// expired refresh tokens, so those count as well as `401`. Throttling and
    /// timeouts (`408`, `429`) are transient and leave the credentials alone.
    pub fn is_auth_failure(&self) -> bool {
        match self {
            Self::Unauthorized(_) => true,
            Self::Server { status, .. } => matches!(
                *status,
                StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN
            ),
            Self::Network(_) | Self::Decode(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_credential_rejections_are_auth_failures() {
        assert!(RemoteError::Unauthorized("expired".to_string()).is_auth_failure());
        assert!(
            RemoteError::Server {
                status: StatusCode::BAD_REQUEST,
                message: "invalid_grant".to_string(),
            }
            .is_auth_failure()
        );
        assert!(
            !RemoteError::Server {
                status: StatusCode::BAD_GATEWAY,
                message: "upstream".to_string(),
            }
            .is_auth_failure()
        );
        assert!(!RemoteError::Decode("eof".to_string()).is_auth_failure());
    }

    #[test]
    fn throttling_and_timeouts_are_retryable() {
        for status in [StatusCode::TOO_MANY_REQUESTS, StatusCode::REQUEST_TIMEOUT] {
            let err = RemoteError::Server {
                status,
                message: "try again later".to_string(),
            };
            assert!(!err.is_auth_failure(), "{status} must not drop credentials");
        }
        assert!(
            RemoteError::Server {
                status: StatusCode::FORBIDDEN,
                message: "invalid_client".to_string(),
            }
            .is_auth_failure()
        );
    }
}
