pub mod config;
pub mod health;
pub mod serve;
pub mod user;

use anyhow::{Context, Result};
use std::sync::Arc;

use crate::settings::Settings;

/// Open the database and the account manager on it, running migrations
pub async fn open_state(settings: &Settings) -> Result<api::AppState> {
    let db = database::initialize_database(settings.database_config())
        .await
        .with_context(|| format!("Failed to open {}", settings.database_path().display()))?;
    let session_config = settings.session_config()?;
    let state = api::AppState::new(
        db,
        session_config,
        Arc::new(::user::password::Argon2Hasher::default()),
    )
    .await
    .map_err(|e| anyhow::anyhow!("Failed to initialize application state: {}", e))?;
    Ok(state)
}
