//! Roster Server - Main entry point

use anyhow::Result;
use roster_common::logging::{init_logging, LogConfig};
use tracing::info;

use roster_server::{api, bootstrap, config::Config};

#[tokio::main]
async fn main() -> Result<()> {
    // Defaults for this binary; environment variables take precedence
    let log_config = LogConfig::builder()
        .log_file_prefix("roster-server")
        .filter_directives("roster_server=debug,tower_http=debug,sqlx=warn")
        .build()
        .merge_env()?;

    let _log_guard = init_logging(&log_config)?;

    info!("Starting Roster Server");

    let config = Config::load()?;
    info!(
        store = %config.store,
        "Configuration loaded - server will bind to {}:{}",
        config.server.host, config.server.port
    );

    let state = bootstrap::build_state(&config).await?;
    bootstrap::seed_all(&state, &config.seed).await?;

    api::serve(&config, state).await
}
