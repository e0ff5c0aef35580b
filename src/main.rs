//! CodeForge - Application Entry Point
//!
//! Connects to PostgreSQL, applies migrations and keeps stored contest
//! statuses in step with the clock until interrupted.

use std::sync::Arc;

use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use codeforge::{
    config::CONFIG,
    db::{self, PgGateway},
    services::ContestService,
    state::AppState,
    utils::SystemClock,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| CONFIG.log.rust_log.clone().into());
    let registry = tracing_subscriber::registry().with(filter);
    if CONFIG.log.json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    info!("Starting CodeForge...");

    info!("Connecting to database...");
    let pool = db::create_pool(&CONFIG.database).await?;
    db::test_connection(&pool).await?;

    info!("Running database migrations...");
    db::run_migrations(&pool).await?;

    let state = AppState::new(
        Arc::new(PgGateway::new(pool)),
        Arc::new(SystemClock),
        CONFIG.clone(),
    );

    let mut interval = tokio::time::interval(state.config().scheduler.status_sync_interval);
    info!(
        every_secs = state.config().scheduler.status_sync_interval.as_secs(),
        "Contest status sync running"
    );

    loop {
        tokio::select! {
            _ = interval.tick() => {
                if let Err(err) = ContestService::refresh_statuses(&state).await {
                    warn!(error = %err, code = err.error_code(), "Contest status sync failed");
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Shutting down");
                break;
            }
        }
    }

    Ok(())
}
