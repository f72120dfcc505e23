//! Session management for authentication
//!
//! Everything the security layer keeps between requests lives in the
//! tower-sessions `Session`: the security token of each firewall realm, the
//! stored post-login target path, CSRF tokens and flash messages.

use async_trait::async_trait;
use authz::{target_path_key, TargetPathStore, DEFAULT_REALM};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD as BASE64, Engine};
use rand::Rng;
use tower_sessions::Session;
use tracing::{debug, info, warn};

use super::store::SessionConfig;
use super::types::{AuthLevel, Flash, SessionToken};
use crate::error::{Result, UserError};
use crate::model::User;

/// Session keys used for storing data
pub struct SessionKeys;

impl SessionKeys {
    pub const FLASHES: &'static str = "_flashes";
    pub const CSRF_PREFIX: &'static str = "_csrf/";

    /// Security token key for a firewall realm
    pub fn token(realm: &str) -> String {
        format!("_security.{}.token", realm)
    }

    /// Password fingerprint of the account the token names
    pub fn auth_hash(realm: &str) -> String {
        format!("_security.{}.auth_hash", realm)
    }

    pub fn csrf(intention: &str) -> String {
        format!("{}{}", Self::CSRF_PREFIX, intention)
    }
}

/// Generate a URL-safe random token
pub(crate) fn generate_token() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill(&mut bytes);
    BASE64.encode(bytes)
}

pub(crate) fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.len() == b.len() && a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// Session manager for one firewall realm
#[derive(Debug, Clone)]
pub struct SessionManager {
    config: SessionConfig,
    realm: String,
}

impl SessionManager {
    pub fn new(config: SessionConfig) -> Self {
        Self::with_realm(config, DEFAULT_REALM)
    }

    pub fn with_realm(config: SessionConfig, realm: impl Into<String>) -> Self {
        Self {
            config,
            realm: realm.into(),
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn realm(&self) -> &str {
        &self.realm
    }

    /// Store a security token for `user`, renewing the session id
    pub async fn login(
        &self,
        session: &Session,
        user: &User,
        level: AuthLevel,
    ) -> Result<SessionToken> {
        let user_id = user
            .id
            .ok_or_else(|| UserError::UserNotFound(user.email().to_string()))?;
        let token = SessionToken::new(user_id, level);

        session.cycle_id().await.map_err(UserError::session)?;
        self.store_token(session, &token).await?;
        self.bind_auth_hash(session, user).await?;

        info!("User {} logged in ({})", user_id, level);
        Ok(token)
    }

    /// Switch the session to `target`, remembering who the impersonator is
    pub async fn start_impersonation(
        &self,
        session: &Session,
        current: &SessionToken,
        target: &User,
    ) -> Result<SessionToken> {
        let target_id = target
            .id
            .ok_or_else(|| UserError::UserNotFound(target.email().to_string()))?;
        let token = SessionToken {
            user_id: target_id,
            level: current.level,
            impersonator_id: Some(current.user_id),
        };
        self.store_token(session, &token).await?;
        self.bind_auth_hash(session, target).await?;
        info!("User {} is now impersonating {}", current.user_id, target_id);
        Ok(token)
    }

    /// Restore the impersonator's token. Returns `None` when not impersonating.
    pub async fn exit_impersonation(
        &self,
        session: &Session,
        current: &SessionToken,
    ) -> Result<Option<SessionToken>> {
        let Some(original) = current.impersonator_id else {
            return Ok(None);
        };
        let token = SessionToken::new(original, current.level);
        self.store_token(session, &token).await?;
        info!("User {} stopped impersonating {}", original, current.user_id);
        Ok(Some(token))
    }

    async fn store_token(&self, session: &Session, token: &SessionToken) -> Result<()> {
        session
            .insert(&SessionKeys::token(&self.realm), token)
            .await
            .map_err(UserError::session)
    }

    /// Record the password fingerprint of the account now in the session
    pub async fn bind_auth_hash(&self, session: &Session, user: &User) -> Result<()> {
        session
            .insert(&SessionKeys::auth_hash(&self.realm), user.password_fingerprint())
            .await
            .map_err(UserError::session)
    }

    /// False once the account's password changed after the session was bound
    pub async fn auth_hash_matches(&self, session: &Session, user: &User) -> Result<bool> {
        let stored: Option<String> = session
            .get(&SessionKeys::auth_hash(&self.realm))
            .await
            .map_err(UserError::session)?;
        Ok(stored.is_some_and(|stored| {
            constant_time_eq(stored.as_bytes(), user.password_fingerprint().as_bytes())
        }))
    }

    /// The security token of this realm, if any
    pub async fn current_token(&self, session: &Session) -> Result<Option<SessionToken>> {
        session
            .get(&SessionKeys::token(&self.realm))
            .await
            .map_err(UserError::session)
    }

    /// Destroy the session (logout)
    pub async fn logout(&self, session: &Session) -> Result<()> {
        session.flush().await.map_err(UserError::session)?;
        debug!("Session destroyed");
        Ok(())
    }

    /// Get or create the CSRF token for `intention`
    pub async fn csrf_token(&self, session: &Session, intention: &str) -> Result<String> {
        let key = SessionKeys::csrf(intention);
        if let Some(token) = session
            .get::<String>(&key)
            .await
            .map_err(UserError::session)?
        {
            return Ok(token);
        }
        let token = generate_token();
        session
            .insert(&key, &token)
            .await
            .map_err(UserError::session)?;
        Ok(token)
    }

    pub async fn is_csrf_token_valid(
        &self,
        session: &Session,
        intention: &str,
        submitted: Option<&str>,
    ) -> Result<bool> {
        let expected: Option<String> = session
            .get(&SessionKeys::csrf(intention))
            .await
            .map_err(UserError::session)?;
        let valid = match (expected, submitted) {
            (Some(expected), Some(submitted)) => {
                constant_time_eq(expected.as_bytes(), submitted.as_bytes())
            }
            _ => false,
        };
        if !valid {
            warn!("Invalid CSRF token for intention '{}'", intention);
        }
        Ok(valid)
    }

    pub async fn add_flash(&self, session: &Session, flash: Flash) -> Result<()> {
        let mut flashes: Vec<Flash> = session
            .get(SessionKeys::FLASHES)
            .await
            .map_err(UserError::session)?
            .unwrap_or_default();
        flashes.push(flash);
        session
            .insert(SessionKeys::FLASHES, flashes)
            .await
            .map_err(UserError::session)
    }

    /// Remove and return all pending flash messages
    pub async fn take_flashes(&self, session: &Session) -> Result<Vec<Flash>> {
        let flashes: Option<Vec<Flash>> = session
            .remove(SessionKeys::FLASHES)
            .await
            .map_err(UserError::session)?;
        Ok(flashes.unwrap_or_default())
    }

    /// Target-path storage bound to `session`
    pub fn target_paths(&self, session: &Session) -> SessionTargetPathStore {
        SessionTargetPathStore::new(session.clone())
    }
}

/// Stores post-login target paths in the HTTP session
#[derive(Debug, Clone)]
pub struct SessionTargetPathStore {
    session: Session,
}

impl SessionTargetPathStore {
    fn new(session: Session) -> Self {
        Self { session }
    }
}

#[async_trait]
impl TargetPathStore for SessionTargetPathStore {
    type Error = UserError;

    async fn take_target_path(&self, realm: &str) -> Result<Option<String>> {
        self.session
            .remove(&target_path_key(realm))
            .await
            .map_err(UserError::session)
    }

    async fn save_target_path(&self, realm: &str, path: &str) -> Result<()> {
        debug!("Saving target path '{}' for realm '{}'", path, realm);
        self.session
            .insert(&target_path_key(realm), path)
            .await
            .map_err(UserError::session)
    }
}
