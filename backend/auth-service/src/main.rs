/// Classloop Auth Service - Main entry point
/// REST API for session issuance, rotation and revocation
use std::net::SocketAddr;
use std::time::Duration;

use sqlx::postgres::PgPoolOptions;
use tokio::net::TcpListener;

use auth_service::{config::Config, routes, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt::init();

    // Load configuration
    let config = Config::from_env()?;

    tracing::info!(
        "Starting Classloop Auth Service on {}:{}",
        config.server_host,
        config.server_port
    );

    // Initialize database connection pool
    let db_pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await?;

    tracing::info!("Database connection pool initialized");

    sqlx::migrate!("./migrations").run(&db_pool).await?;

    tracing::info!("Database migrations applied");

    let app_state = AppState::new(db_pool, &config);

    spawn_token_sweeper(app_state.clone());

    let router = routes::api_router(app_state);

    let addr: SocketAddr = format!("{}:{}", config.server_host, config.server_port).parse()?;
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("REST API listening on {}", addr);

    axum::serve(listener, router).await?;

    Ok(())
}

/// Hourly background sweep that deletes refresh tokens past their expiry.
fn spawn_token_sweeper(state: AppState) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(3600));
        loop {
            interval.tick().await;
            match state.sessions.purge_expired().await {
                Ok(0) => {}
                Ok(purged) => tracing::info!(purged, "purged expired refresh tokens"),
                Err(err) => tracing::error!("token sweep failed: {}", err),
            }
        }
    });
}
