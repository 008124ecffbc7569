//! Dashboard API server
//!
//! Loads `.env`, parses [`ServerConfig`] from flags and environment, opens
//! the analytical store read-only and serves the API.

use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use dashboard_api::{create_router, AppState, DatabaseManager, ServerConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables before clap reads them
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                EnvFilter::new("dashboard_api=info,dashboard_server=info,tower_http=debug")
            }),
        )
        .init();

    let config = ServerConfig::parse();

    let db = DatabaseManager::new(config.database_config())
        .await
        .context("failed to open the dashboard database")?;
    db.test_connection()
        .await
        .context("database did not answer the connectivity check")?;
    info!("Database ready ({})", db.connection_stats());

    let limits = config.query_limits();
    info!(
        max_rows = limits.max_rows,
        filter_options = limits.filter_options,
        "Query limits"
    );
    let app = create_router(AppState::new(db, limits));

    let addr = config.listen_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!("Dashboard API listening on http://{}", addr);

    axum::serve(listener, app).await.context("server error")?;

    Ok(())
}
