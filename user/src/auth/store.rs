//! Session store and session cookie configuration

use std::env;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tower_sessions::cookie::time::Duration;
use tower_sessions::{Expiry, SessionManagerLayer};
use tower_sessions_sqlx_store::SqliteStore;
use tracing::{error, info, warn};

use crate::error::{Result, UserError};

/// SQLx-based session store for tower-sessions
#[derive(Debug, Clone)]
pub struct SqlxSessionStore {
    store: SqliteStore,
    pool: SqlitePool,
}

impl SqlxSessionStore {
    /// Create the store, creating the `tower_sessions` table if needed
    pub async fn new(pool: SqlitePool) -> Result<Self> {
        let store = SqliteStore::new(pool.clone());
        store.migrate().await.map_err(|e| {
            error!("Failed to create session table: {}", e);
            UserError::Database(e)
        })?;

        info!("SQLx session store initialized");
        Ok(Self { store, pool })
    }

    /// Get the underlying SqliteStore
    pub fn inner(&self) -> &SqliteStore {
        &self.store
    }

    /// Session middleware for this store, configured from `config`
    pub fn layer(&self, config: &SessionConfig) -> SessionManagerLayer<SqliteStore> {
        SessionManagerLayer::new(self.store.clone())
            .with_name(config.cookie_name.clone())
            .with_secure(config.secure)
            .with_http_only(config.http_only)
            .with_same_site(config.same_site.into())
            .with_expiry(Expiry::OnInactivity(Duration::seconds(
                config.timeout_seconds,
            )))
    }

    /// Delete sessions past their expiry date
    pub async fn cleanup_expired(&self) -> Result<u64> {
        let now = chrono::Utc::now().timestamp();

        let result = sqlx::query("DELETE FROM tower_sessions WHERE expiry_date < ?")
            .bind(now)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                error!("Failed to cleanup expired sessions: {}", e);
                UserError::Database(e)
            })?;

        info!("Expired sessions cleaned up: {}", result.rows_affected());
        Ok(result.rows_affected())
    }
}

/// Session and remember-me cookie configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Session cookie name
    pub cookie_name: String,
    /// Inactivity timeout in seconds
    pub timeout_seconds: i64,
    /// Whether to use secure cookies (HTTPS only)
    pub secure: bool,
    /// SameSite cookie attribute
    pub same_site: SameSiteConfig,
    /// HTTP only cookie (not accessible via JavaScript)
    pub http_only: bool,
    /// Remember-me cookie name
    pub remember_me_cookie: String,
    /// Remember-me lifetime in seconds
    pub remember_me_lifetime_seconds: i64,
    /// How long a just-rotated remember-me token is still accepted, for
    /// requests sent in parallel with the same cookie
    pub remember_me_rotation_grace_seconds: i64,
    /// Secret mixed into remember-me token digests
    #[serde(skip_serializing, default)]
    pub secret_key: Vec<u8>,
}

impl SessionConfig {
    pub const DEFAULT_COOKIE_NAME: &'static str = "inklog_session";
    pub const DEFAULT_REMEMBER_ME_COOKIE: &'static str = "INKLOG_REMEMBERME";

    /// Load session configuration; the secret comes from `SESSION_SECRET_KEY`
    pub fn new() -> Result<Self> {
        let secret_key = Self::load_from_env()?;
        Ok(Self::with_secret(secret_key))
    }

    /// Defaults with an explicit secret
    pub fn with_secret(secret_key: Vec<u8>) -> Self {
        Self {
            cookie_name: Self::DEFAULT_COOKIE_NAME.to_string(),
            timeout_seconds: 3600,
            secure: false,
            same_site: SameSiteConfig::Lax,
            http_only: true,
            remember_me_cookie: Self::DEFAULT_REMEMBER_ME_COOKIE.to_string(),
            remember_me_lifetime_seconds: 604_800,
            remember_me_rotation_grace_seconds: 60,
            secret_key,
        }
    }

    fn load_from_env() -> Result<Vec<u8>> {
        let key_str = env::var("SESSION_SECRET_KEY")
            .map_err(|_| UserError::Configuration("SESSION_SECRET_KEY not set".to_string()))?;

        BASE64
            .decode(key_str.trim().as_bytes())
            .map_err(|e| UserError::Configuration(format!("Invalid BASE64 secret key: {}", e)))
    }

    /// Random 32-byte secret
    pub fn random_secret() -> Vec<u8> {
        use rand::RngCore;
        let mut secret_key = vec![0u8; 32];
        rand::thread_rng().fill_bytes(&mut secret_key);
        secret_key
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::new().unwrap_or_else(|e| {
            warn!("Failed to load session config: {}. Using random key.", e);
            Self::with_secret(Self::random_secret())
        })
    }
}

/// SameSite cookie configuration
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum SameSiteConfig {
    Strict,
    Lax,
    None,
}

impl SameSiteConfig {
    /// Attribute value as written in a `Set-Cookie` header
    pub fn as_str(&self) -> &'static str {
        match self {
            SameSiteConfig::Strict => "Strict",
            SameSiteConfig::Lax => "Lax",
            SameSiteConfig::None => "None",
        }
    }
}

impl From<SameSiteConfig> for tower_sessions::cookie::SameSite {
    fn from(config: SameSiteConfig) -> Self {
        match config {
            SameSiteConfig::Strict => tower_sessions::cookie::SameSite::Strict,
            SameSiteConfig::Lax => tower_sessions::cookie::SameSite::Lax,
            SameSiteConfig::None => tower_sessions::cookie::SameSite::None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn create_test_pool(temp_dir: &TempDir) -> SqlitePool {
        let db_path = temp_dir.path().join("test_sessions.db");
        let options = sqlx::sqlite::SqliteConnectOptions::new()
            .filename(&db_path)
            .create_if_missing(true);
        SqlitePool::connect_with(options).await.unwrap()
    }

    #[tokio::test]
    async fn test_session_store_creation() {
        let temp_dir = TempDir::new().unwrap();
        let pool = create_test_pool(&temp_dir).await;
        let store = SqlxSessionStore::new(pool.clone()).await.unwrap();

        let result = sqlx::query("SELECT COUNT(*) as count FROM tower_sessions")
            .fetch_one(&pool)
            .await;
        assert!(result.is_ok());

        sqlx::query("INSERT INTO tower_sessions (id, data, expiry_date) VALUES ('old', x'00', 0)")
            .execute(&pool)
            .await
            .unwrap();
        assert_eq!(store.cleanup_expired().await.unwrap(), 1);
    }

    #[test]
    fn test_session_config_with_secret() {
        let config = SessionConfig::with_secret(b"0123456789abcdef0123456789abcdef".to_vec());

        assert_eq!(config.cookie_name, "inklog_session");
        assert_eq!(config.remember_me_cookie, "INKLOG_REMEMBERME");
        assert_eq!(config.timeout_seconds, 3600);
        assert!(!config.secure);
        assert!(config.http_only);
        assert_eq!(config.same_site.as_str(), "Lax");

        let json = serde_json::to_string(&config).unwrap();
        assert!(!json.contains("secret_key"));
    }

    #[test]
    fn test_random_secret_length() {
        let a = SessionConfig::random_secret();
        let b = SessionConfig::random_secret();
        assert_eq!(a.len(), 32);
        assert_ne!(a, b);
    }
}
