/// Access-token authentication extractor
use axum::{async_trait, extract::FromRequestParts, http::header, http::request::Parts};
use credential_core::Claims;
use uuid::Uuid;

use crate::error::AuthError;
use crate::AppState;

/// The verified identity behind a bearer access token.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user_id: Uuid,
    pub claims: Claims,
}

#[async_trait]
impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .ok_or(AuthError::InvalidToken)?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or(AuthError::InvalidToken)?;

        let claims = state.signer.verify_access(token)?;
        let user_id = claims.user_id()?;

        Ok(AuthenticatedUser { user_id, claims })
    }
}
