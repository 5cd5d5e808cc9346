use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use credential_core::TokenError;
use serde_json::json;
use thiserror::Error;

/// Service error taxonomy.
///
/// Authentication failures (bad credentials, unknown user, revoked or reused
/// token, disabled account) all collapse into [`AuthError::Unauthorized`] on
/// the wire with a single generic message; the distinction lives in the logs
/// only. `TokenExpired` is the one caller-visible exception, so clients know
/// to refresh instead of re-authenticating.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Unauthorized")]
    Unauthorized,

    #[error("Not found")]
    NotFound,

    #[error("Conflict")]
    Conflict,

    #[error("Token expired")]
    TokenExpired,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, AuthError>;

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AuthError::Unauthorized | AuthError::InvalidToken => (
                StatusCode::UNAUTHORIZED,
                "Invalid credentials or token".to_string(),
            ),
            AuthError::TokenExpired => (StatusCode::UNAUTHORIZED, "Token expired".to_string()),
            AuthError::NotFound => (StatusCode::NOT_FOUND, "Not found".to_string()),
            AuthError::Conflict => (StatusCode::CONFLICT, "Conflict".to_string()),
            AuthError::Database(_) | AuthError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            ),
        };

        let body = Json(json!({
            "error": error_message,
            "status": status.as_u16()
        }));

        (status, body).into_response()
    }
}

impl From<sqlx::Error> for AuthError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => AuthError::NotFound,
            sqlx::Error::Database(db) if db.code().as_deref() == Some("23505") => {
                // Unique constraint on the token hash lost a race.
                AuthError::Conflict
            }
            _ => {
                tracing::error!("database error: {}", err);
                AuthError::Database(err.to_string())
            }
        }
    }
}

impl From<TokenError> for AuthError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Expired => AuthError::TokenExpired,
            TokenError::Invalid => AuthError::InvalidToken,
        }
    }
}

impl From<credential_core::hash::HashError> for AuthError {
    fn from(err: credential_core::hash::HashError) -> Self {
        tracing::error!("secret hashing error: {}", err);
        AuthError::Internal(err.to_string())
    }
}

impl From<anyhow::Error> for AuthError {
    fn from(err: anyhow::Error) -> Self {
        tracing::error!("internal error: {}", err);
        AuthError::Internal(err.to_string())
    }
}
