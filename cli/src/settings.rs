//! Runtime settings.
//!
//! Values come from `config/inklog.yaml` (optional), then from `INKLOG_*`
//! environment variables, after `.env` has been loaded. Relative paths are
//! resolved against the base directory, normally the working directory.

use anyhow::{Context, Result};
use api::ApiConfig;
use database::DatabaseConfig;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};
use user::SessionConfig;

pub const DEFAULT_CONFIG_FILE: &str = "config/inklog.yaml";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// `dev`, `test` or `prod`
    pub environment: String,
    pub data_dir: PathBuf,
    /// Defaults to `<data_dir>/inklog.db`
    pub database_path: Option<PathBuf>,
    pub max_connections: u32,
    pub host: String,
    pub port: u16,
    pub session: SessionSettings,
    /// The YAML file the settings were read from, if any
    #[serde(skip_deserializing)]
    pub source: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
    pub timeout_seconds: i64,
    pub secure_cookies: bool,
    pub remember_me_lifetime_seconds: i64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            environment: "dev".to_string(),
            data_dir: PathBuf::from("data"),
            database_path: None,
            max_connections: 5,
            host: "127.0.0.1".to_string(),
            port: 3030,
            session: SessionSettings::default(),
            source: None,
        }
    }
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            timeout_seconds: 3600,
            secure_cookies: false,
            remember_me_lifetime_seconds: 604_800,
        }
    }
}

impl Settings {
    /// Load settings relative to the current directory
    pub fn load() -> Result<Self> {
        let base = env::current_dir().context("Failed to get current directory")?;
        Self::load_from(&base)
    }

    /// Load settings relative to `base`
    pub fn load_from(base: &Path) -> Result<Self> {
        let env_file = base.join(".env");
        if env_file.exists() {
            dotenvy::from_path(&env_file).ok();
        }

        let config_file = env::var("INKLOG_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_FILE));
        let config_file = resolve(base, config_file);

        let mut settings = if config_file.exists() {
            let raw = std::fs::read_to_string(&config_file)
                .with_context(|| format!("Failed to read {}", config_file.display()))?;
            let mut settings: Settings = serde_yaml::from_str(&raw)
                .with_context(|| format!("Invalid configuration in {}", config_file.display()))?;
            settings.source = Some(config_file);
            settings
        } else {
            Settings::default()
        };

        settings.apply_env()?;
        settings.data_dir = resolve(base, settings.data_dir);
        settings.database_path = settings.database_path.map(|path| resolve(base, path));
        Ok(settings)
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(environment) = env::var("INKLOG_ENV") {
            self.environment = environment;
        }
        if let Ok(data_dir) = env::var("INKLOG_DATA_DIR") {
            self.data_dir = PathBuf::from(data_dir);
        }
        if let Ok(path) = env::var("INKLOG_DATABASE_PATH") {
            self.database_path = Some(PathBuf::from(path));
        }
        if let Ok(port) = env::var("INKLOG_PORT") {
            self.port = port
                .trim()
                .parse()
                .with_context(|| format!("INKLOG_PORT is not a valid port: {}", port))?;
        }
        Ok(())
    }

    pub fn is_production(&self) -> bool {
        matches!(self.environment.as_str(), "prod" | "production")
    }

    pub fn database_path(&self) -> PathBuf {
        self.database_path
            .clone()
            .unwrap_or_else(|| self.data_dir.join("inklog.db"))
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.data_dir.join("logs")
    }

    pub fn database_config(&self) -> DatabaseConfig {
        DatabaseConfig::new()
            .with_database_path(self.database_path())
            .with_max_connections(self.max_connections)
            .with_create_tables(false)
    }

    pub fn api_config(&self) -> ApiConfig {
        ApiConfig::new()
            .with_host(self.host.clone())
            .with_port(self.port)
    }

    /// Session settings with the secret from `SESSION_SECRET_KEY`.
    ///
    /// Outside production a missing secret falls back to a random one, which
    /// logs everybody out on restart.
    pub fn session_config(&self) -> Result<SessionConfig> {
        let mut config = match SessionConfig::new() {
            Ok(config) => config,
            Err(e) if self.is_production() => {
                return Err(e).context("SESSION_SECRET_KEY is required in production");
            }
            Err(e) => {
                tracing::warn!("{}; using a random session secret", e);
                SessionConfig::with_secret(SessionConfig::random_secret())
            }
        };
        config.timeout_seconds = self.session.timeout_seconds;
        config.secure = self.session.secure_cookies;
        config.remember_me_lifetime_seconds = self.session.remember_me_lifetime_seconds;
        Ok(config)
    }
}

fn resolve(base: &Path, path: PathBuf) -> PathBuf {
    if path.is_relative() {
        base.join(path)
    } else {
        path
    }
}
