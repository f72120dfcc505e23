use anyhow::{anyhow, Result};
use tracing::{info, warn};

use super::open_state;
use crate::logging;
use crate::settings::Settings;

/// Run the web server until it stops or Ctrl-C is pressed
pub async fn execute(
    settings: Settings,
    host: Option<String>,
    port: Option<u16>,
    verbose: bool,
) -> Result<()> {
    let _guard = logging::init_logging(&settings, verbose)
        .map_err(|e| anyhow!("Failed to initialize logging: {}", e))?;

    info!("=== Inklog starting ({}) ===", settings.environment);
    if let Some(source) = &settings.source {
        info!("Settings loaded from {}", source.display());
    }

    let state = open_state(&settings).await?;
    if let Err(e) = state.users.cleanup_expired().await {
        warn!("Failed to clean up expired sessions: {}", e);
    }

    let mut config = settings.api_config();
    if let Some(host) = host {
        config = config.with_host(host);
    }
    if let Some(port) = port {
        config = config.with_port(port);
    }

    tokio::select! {
        result = api::start_server(state, config) => {
            result.map_err(|e| anyhow!("Server error: {}", e))?;
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received");
        }
    }

    logging::log_shutdown();
    Ok(())
}
