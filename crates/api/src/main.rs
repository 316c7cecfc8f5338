//! Air Quality Service - Main Entry Point

use anyhow::Context;
use api::{init_logging, run_server, Settings};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::load().context("Failed to load configuration")?;
    init_logging(&settings.log_level, settings.is_production())?;

    info!("=== Air Quality Service v{} ===", env!("CARGO_PKG_VERSION"));
    info!(
        env = %settings.app_env,
        driver = ?settings.db_driver,
        prefix = %settings.api_prefix,
        "Configuration loaded"
    );

    run_server(settings).await
}
