/// Authentication handlers
use axum::{
    extract::{Path, State},
    http::HeaderMap,
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::{
    authz,
    error::AuthError,
    middleware::AuthenticatedUser,
    models::{FederatedProfile, LoginRequest, RefreshRequest, RefreshTokenRecord, Role, SessionBinding},
    services::{LogoutScope, TokenPair},
    AppState,
};

#[derive(Debug, Deserialize)]
pub struct FederatedLoginRequest {
    #[serde(flatten)]
    pub profile: FederatedProfile,
    pub device_fingerprint: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LogoutRequest {
    pub refresh_token: String,
    #[serde(default)]
    pub scope: LogoutScope,
}

#[derive(Debug, Serialize)]
pub struct LogoutResponse {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct LogoutAllResponse {
    pub message: String,
    pub revoked_sessions: u64,
}

/// Active-session view; the hash itself never leaves the service.
#[derive(Debug, Serialize)]
pub struct SessionView {
    pub id: Uuid,
    pub family_id: Uuid,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub expires_at: chrono::DateTime<chrono::Utc>,
    pub last_used_at: Option<chrono::DateTime<chrono::Utc>>,
    pub user_agent: Option<String>,
    pub ip_address: Option<String>,
}

impl From<RefreshTokenRecord> for SessionView {
    fn from(record: RefreshTokenRecord) -> Self {
        Self {
            id: record.id,
            family_id: record.family_id,
            created_at: record.created_at,
            expires_at: record.expires_at,
            last_used_at: record.last_used_at,
            user_agent: record.user_agent,
            ip_address: record.ip_address,
        }
    }
}

/// Session-binding metadata from the request envelope.
fn binding_from(headers: &HeaderMap, device_fingerprint: Option<String>) -> SessionBinding {
    SessionBinding {
        user_agent: headers
            .get("user-agent")
            .and_then(|h| h.to_str().ok())
            .map(str::to_string),
        ip_address: headers
            .get("x-forwarded-for")
            .and_then(|h| h.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(|v| v.trim().to_string()),
        device_fingerprint,
    }
}

/// Password login endpoint handler
pub async fn login(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<TokenPair>, AuthError> {
    // A malformed email cannot belong to any account; same generic rejection.
    payload.validate().map_err(|_| AuthError::Unauthorized)?;

    let binding = binding_from(&headers, payload.device_fingerprint.clone());
    let pair = state
        .sessions
        .login(&payload.email, &payload.password, binding)
        .await?;

    Ok(Json(pair))
}

/// Federated login endpoint handler. The profile arrives pre-verified from
/// the identity-provider exchange; nothing is re-verified here.
pub async fn federated_login(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<FederatedLoginRequest>,
) -> Result<Json<TokenPair>, AuthError> {
    let binding = binding_from(&headers, payload.device_fingerprint.clone());
    let pair = state
        .sessions
        .login_federated(&payload.profile, binding)
        .await?;

    Ok(Json(pair))
}

/// Refresh (rotation) endpoint handler
pub async fn refresh_token(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<RefreshRequest>,
) -> Result<Json<TokenPair>, AuthError> {
    let binding = binding_from(&headers, payload.device_fingerprint.clone());
    let pair = state
        .sessions
        .refresh(&payload.refresh_token, binding)
        .await?;

    Ok(Json(pair))
}

/// Logout endpoint handler
pub async fn logout(
    State(state): State<AppState>,
    Json(payload): Json<LogoutRequest>,
) -> Result<Json<LogoutResponse>, AuthError> {
    state
        .sessions
        .logout(&payload.refresh_token, payload.scope)
        .await?;

    Ok(Json(LogoutResponse {
        message: "Logged out successfully".to_string(),
    }))
}

/// Logout-all-devices endpoint handler
pub async fn logout_all_devices(
    State(state): State<AppState>,
    Json(payload): Json<RefreshRequest>,
) -> Result<Json<LogoutAllResponse>, AuthError> {
    let revoked = state
        .sessions
        .logout_all_devices(&payload.refresh_token)
        .await?;

    Ok(Json(LogoutAllResponse {
        message: "Logged out on all devices".to_string(),
        revoked_sessions: revoked,
    }))
}

/// The caller's active sessions
pub async fn my_sessions(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<Vec<SessionView>>, AuthError> {
    let sessions = state.sessions.active_sessions(user.user_id).await?;
    Ok(Json(sessions.into_iter().map(SessionView::from).collect()))
}

/// The caller's effective roles
pub async fn my_roles(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<Vec<Role>>, AuthError> {
    let roles = authz::resolve_roles(state.roles.as_ref(), user.user_id).await?;
    Ok(Json(roles))
}

/// Any user's active sessions; staff only.
pub async fn list_user_sessions(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(user_id): Path<Uuid>,
) -> Result<Json<Vec<SessionView>>, AuthError> {
    let held = authz::resolve_roles(state.roles.as_ref(), user.user_id).await?;
    if !authz::authorize(&held, &[Role::Admin]) {
        return Err(AuthError::Unauthorized);
    }

    let sessions = state.sessions.active_sessions(user_id).await?;
    Ok(Json(sessions.into_iter().map(SessionView::from).collect()))
}
