//! DueSync - assignment due dates in parent and student calendars
//!
//! Runs the auto-sync scheduler until interrupted.

use anyhow::Context;
use duesync_api::utils::logging::init_tracing;
use duesync_api::AppContext;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Before tracing, so RUST_LOG from .env applies
    let dotenv = dotenvy::dotenv();
    init_tracing();

    match dotenv {
        Ok(path) => info!(path = %path.display(), "loaded .env"),
        Err(e) => info!(reason = %e, "no .env loaded"),
    }

    let config = duesync_infra::config::load().context("failed to load configuration")?;
    let ctx = AppContext::new(config).await.context("failed to initialize DueSync")?;

    if ctx.start_auto_sync().await.context("failed to start auto-sync")? {
        info!(cron = %ctx.config.sync.auto_sync_cron, "auto-sync scheduled");
    }

    info!("DueSync running; press Ctrl-C to stop");
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "could not listen for shutdown signal");
    }

    info!("shutting down");
    ctx.shutdown().await.context("shutdown failed")?;
    Ok(())
}
