use anyhow::{Context, Result};
use dotenv::dotenv;
use stock_sync_rust::{Config, Orchestrator};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Starting stock sync...");

    let config = Config::from_env().context("Failed to load configuration")?;
    config.log_config();

    let orchestrator =
        Orchestrator::from_config(&config).context("Failed to initialize HTTP clients")?;

    // Failures are reported in the summary; the exit status does not depend on them
    let summary = orchestrator.run().await;
    summary.log();
    if let Ok(json) = serde_json::to_string(&summary) {
        debug!("Run summary: {}", json);
    }

    Ok(())
}
