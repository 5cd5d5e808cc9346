use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use once_cell::sync::Lazy;
use prometheus::{Encoder, IntCounter, TextEncoder};

/// Handler that serialises Prometheus metrics in text format.
pub async fn metrics_handler() -> Response {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();

    let mut buffer = Vec::new();
    match encoder.encode(&metric_families, &mut buffer) {
        Ok(_) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, encoder.format_type().to_string())],
            buffer,
        )
            .into_response(),
        Err(err) => (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()).into_response(),
    }
}

fn register_counter(name: &str, help: &str) -> IntCounter {
    IntCounter::new(name.to_string(), help.to_string())
        .and_then(|c| {
            prometheus::default_registry().register(Box::new(c.clone()))?;
            Ok(c)
        })
        .unwrap_or_else(|e| {
            tracing::error!("failed to register {} counter: {}", name, e);
            // Fall back to an unregistered counter rather than panicking in
            // a lazy-static context.
            IntCounter::new(format!("{name}_unregistered"), help.to_string())
                .expect("fallback counter")
        })
}

/// Counter for login attempts (password and federated)
static LOGIN_REQUESTS_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_counter("login_requests_total", "Total number of login attempts")
});

/// Counter for rejected logins (unknown user, wrong password, disabled account)
static LOGIN_FAILURES_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_counter("login_failures_total", "Total number of rejected logins")
});

/// Counter for successful refresh-token rotations
static TOKEN_ROTATIONS_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_counter(
        "token_rotations_total",
        "Total number of successful refresh-token rotations",
    )
});

/// Counter for replayed refresh tokens that triggered family revocation
static TOKEN_REUSE_DETECTIONS_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_counter(
        "token_reuse_detections_total",
        "Total number of replayed refresh tokens detected",
    )
});

/// Increment login requests counter
#[inline]
pub fn inc_login_requests() {
    LOGIN_REQUESTS_TOTAL.inc();
}

/// Increment login failures counter
#[inline]
pub fn inc_login_failures() {
    LOGIN_FAILURES_TOTAL.inc();
}

/// Increment rotation counter
#[inline]
pub fn inc_token_rotations() {
    TOKEN_ROTATIONS_TOTAL.inc();
}

/// Increment reuse-detection counter
#[inline]
pub fn inc_reuse_detections() {
    TOKEN_REUSE_DETECTIONS_TOTAL.inc();
}
