/// Route definitions for the REST API
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::{handlers, metrics, AppState};

/// Build the full API router. State is applied by the caller.
pub fn api_router(state: AppState) -> Router {
    Router::new()
        // Session lifecycle endpoints
        .route("/api/v1/auth/login", post(handlers::login))
        .route("/api/v1/auth/federated", post(handlers::federated_login))
        .route("/api/v1/auth/refresh", post(handlers::refresh_token))
        .route("/api/v1/auth/logout", post(handlers::logout))
        .route("/api/v1/auth/logout-all", post(handlers::logout_all_devices))
        // Session and role introspection
        .route("/api/v1/auth/sessions", get(handlers::my_sessions))
        .route("/api/v1/auth/roles", get(handlers::my_roles))
        .route(
            "/api/v1/admin/users/:user_id/sessions",
            get(handlers::list_user_sessions),
        )
        // Operational endpoints
        .route("/health", get(health_check))
        .route("/readiness", get(readiness_check))
        .route("/metrics", get(metrics::metrics_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "OK"
}

/// Readiness check endpoint
async fn readiness_check() -> &'static str {
    "READY"
}
