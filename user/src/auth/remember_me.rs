//! Persistent remember-me login.
//!
//! The cookie carries `series:token`. Only a keyed SHA-256 digest of the token
//! is stored. Each successful use rotates the token; presenting a stale token
//! for a known series means the cookie was copied, so the whole series is
//! revoked. The token replaced by the last rotation stays valid for a short
//! grace period so that parallel requests sent with the same cookie do not
//! look like theft.
//!
//! A series is bound to the password fingerprint of its account: changing the
//! password ends every remember-me login.

use std::sync::Arc;

use chrono::{Duration, Utc};
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use super::session::{constant_time_eq, generate_token};
use super::store::SessionConfig;
use crate::database::UserDatabase;
use crate::error::{Result, UserError};
use crate::model::User;
use crate::repository::UserRepository;

/// Parsed value of the remember-me cookie
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RememberMeCookie {
    pub series: String,
    pub token: String,
}

impl RememberMeCookie {
    pub fn parse(value: &str) -> Option<Self> {
        let (series, token) = value.trim().split_once(':')?;
        if series.is_empty() || token.is_empty() {
            return None;
        }
        Some(Self {
            series: series.to_string(),
            token: token.to_string(),
        })
    }

    /// Cookie value
    pub fn encode(&self) -> String {
        format!("{}:{}", self.series, self.token)
    }
}

/// A successful remember-me login
#[derive(Debug, Clone)]
pub struct RememberedLogin {
    pub user: User,
    /// Rotated cookie to send back. `None` when a parallel request already
    /// rotated the token within the grace period.
    pub cookie: Option<RememberMeCookie>,
}

#[derive(Clone)]
pub struct RememberMeService {
    db: Arc<UserDatabase>,
    secret: Vec<u8>,
    lifetime: Duration,
    rotation_grace: Duration,
}

impl RememberMeService {
    pub fn new(db: Arc<UserDatabase>, config: &SessionConfig) -> Self {
        Self {
            db,
            secret: config.secret_key.clone(),
            lifetime: Duration::seconds(config.remember_me_lifetime_seconds),
            rotation_grace: Duration::seconds(config.remember_me_rotation_grace_seconds),
        }
    }

    pub fn lifetime(&self) -> Duration {
        self.lifetime
    }

    fn digest(&self, token: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(&self.secret);
        hasher.update(token.as_bytes());
        hex::encode(hasher.finalize())
    }

    /// Start a new series for a stored account
    pub async fn issue(&self, user: &User) -> Result<RememberMeCookie> {
        let user_id = user
            .id
            .ok_or_else(|| UserError::UserNotFound(user.email().to_string()))?;
        let cookie = RememberMeCookie {
            series: generate_token(),
            token: generate_token(),
        };
        self.db
            .create_remember_me(
                &cookie.series,
                &self.digest(&cookie.token),
                user_id,
                user.password_fingerprint(),
                Utc::now(),
            )
            .await?;
        info!("Issued remember-me series for user {}", user_id);
        Ok(cookie)
    }

    /// Validate a cookie value and rotate its token.
    ///
    /// Returns `None` for malformed, unknown, expired or stolen cookies, and
    /// for series issued before the account's last password change.
    pub async fn consume(&self, value: &str) -> Result<Option<RememberedLogin>> {
        let Some(cookie) = RememberMeCookie::parse(value) else {
            debug!("Malformed remember-me cookie");
            return Ok(None);
        };
        let Some(record) = self.db.find_remember_me(&cookie.series).await? else {
            debug!("Unknown remember-me series");
            return Ok(None);
        };

        let now = Utc::now();
        if record.last_used + self.lifetime < now {
            debug!("Remember-me series expired for user {}", record.user_id);
            self.db.delete_remember_me(&cookie.series).await?;
            return Ok(None);
        }

        let presented = self.digest(&cookie.token);
        let current = constant_time_eq(presented.as_bytes(), record.token_digest.as_bytes());
        let just_rotated = !current
            && now - record.last_used < self.rotation_grace
            && record
                .previous_digest
                .as_deref()
                .is_some_and(|previous| constant_time_eq(presented.as_bytes(), previous.as_bytes()));
        if !current && !just_rotated {
            warn!(
                "Remember-me token mismatch for user {}; revoking series",
                record.user_id
            );
            self.db.delete_remember_me(&cookie.series).await?;
            return Ok(None);
        }

        let user = match self.db.find_by_id(record.user_id).await? {
            Some(user) if user.password_fingerprint() == record.password_fingerprint => user,
            Some(_) => {
                info!(
                    "Password of user {} changed; revoking remember-me series",
                    record.user_id
                );
                self.db.delete_remember_me(&cookie.series).await?;
                return Ok(None);
            }
            None => {
                self.db.delete_remember_me(&cookie.series).await?;
                return Ok(None);
            }
        };

        if just_rotated {
            debug!("Remember-me token of user {} rotated by a parallel request", user);
            return Ok(Some(RememberedLogin { user, cookie: None }));
        }

        let rotated = RememberMeCookie {
            series: cookie.series,
            token: generate_token(),
        };
        self.db
            .update_remember_me(&rotated.series, &self.digest(&rotated.token), now)
            .await?;
        debug!("Remember-me login for user {}", user);

        Ok(Some(RememberedLogin {
            user,
            cookie: Some(rotated),
        }))
    }

    /// Revoke the series named by a cookie value, if any
    pub async fn forget(&self, value: &str) -> Result<()> {
        if let Some(cookie) = RememberMeCookie::parse(value) {
            if self.db.delete_remember_me(&cookie.series).await? {
                info!("Remember-me series revoked");
            }
        }
        Ok(())
    }

    /// Delete series unused for longer than the lifetime
    pub async fn cleanup_expired(&self) -> Result<u64> {
        self.db
            .delete_remember_me_before(Utc::now() - self.lifetime)
            .await
    }
}
