//! Authentication module for Inklog
//!
//! This module provides authentication functionality including:
//! - Email/password login through an axum-login backend
//! - Session tokens, CSRF tokens and flash messages with tower-sessions
//! - Persistent remember-me cookies

pub mod remember_me;
pub mod session;
pub mod store;
pub mod types;

use async_trait::async_trait;
use axum_login::{AuthnBackend, UserId};
use std::sync::Arc;
use tracing::{debug, info, warn};

pub use remember_me::{RememberMeCookie, RememberMeService, RememberedLogin};
pub use session::{SessionManager, SessionTargetPathStore};
pub use store::{SessionConfig, SqlxSessionStore};
pub use types::{AuthLevel, AuthState, Credentials, Flash, SessionToken};

use crate::{
    database::UserDatabase,
    error::{Result, UserError},
    model::{normalize_email, User},
    password::CredentialHasher,
    repository::UserRepository,
};

/// Authentication backend for axum-login
#[derive(Clone)]
pub struct AuthBackend {
    db: Arc<UserDatabase>,
    hasher: Arc<dyn CredentialHasher>,
    // Verified against when the account does not exist, so both failure
    // paths cost one hash verification.
    dummy_hash: Arc<str>,
}

impl AuthBackend {
    pub fn new(db: Arc<UserDatabase>, hasher: Arc<dyn CredentialHasher>) -> Result<Self> {
        let placeholder = User::new("", "");
        let dummy_hash = hasher.hash(&placeholder, &session::generate_token())?;
        Ok(Self {
            db,
            hasher,
            dummy_hash: dummy_hash.into(),
        })
    }

    pub fn hasher(&self) -> &dyn CredentialHasher {
        self.hasher.as_ref()
    }

    /// Resolve a session token to the account it names
    pub async fn load_state(&self, token: Option<SessionToken>) -> Result<AuthState> {
        let Some(token) = token else {
            return Ok(AuthState::Anonymous);
        };
        match self.db.find_by_id(token.user_id).await? {
            Some(user) => Ok(AuthState::Authenticated { user, token }),
            None => {
                warn!("Session refers to missing user {}", token.user_id);
                Ok(AuthState::Anonymous)
            }
        }
    }

    fn verify(&self, plain: &str, hash: &str) -> bool {
        self.hasher.verify(plain, hash).unwrap_or_else(|e| {
            warn!("Stored password hash could not be verified: {}", e);
            false
        })
    }
}

#[async_trait]
impl AuthnBackend for AuthBackend {
    type User = User;
    type Credentials = Credentials;
    type Error = UserError;

    async fn authenticate(&self, creds: Self::Credentials) -> Result<Option<Self::User>> {
        let email = normalize_email(&creds.email);
        info!("Authentication attempt for {}", email);

        let Some(mut user) = self.db.find_by_email(&email).await? else {
            self.verify(&creds.password, &self.dummy_hash);
            warn!("Authentication failed: unknown account {}", email);
            return Ok(None);
        };

        if !self.verify(&creds.password, user.password()) {
            warn!("Authentication failed: wrong password for {}", email);
            return Ok(None);
        }

        if self.hasher.needs_rehash(user.password()) {
            let upgraded = self.hasher.hash(&user, &creds.password)?;
            self.db.upgrade_password(&user, &upgraded).await?;
            user.set_password(upgraded);
        }

        info!("User {} authenticated successfully", email);
        Ok(Some(user))
    }

    async fn get_user(&self, user_id: &UserId<Self>) -> Result<Option<Self::User>> {
        debug!("Fetching user with ID: {}", user_id);
        self.db.find_by_id(*user_id).await
    }
}
