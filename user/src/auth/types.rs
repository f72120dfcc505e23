//! Authentication types

use serde::{Deserialize, Serialize};

use crate::model::User;

/// Login form credentials
#[derive(Clone, Serialize, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"[redacted]")
            .finish()
    }
}

/// How the current session was authenticated
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AuthLevel {
    /// Credentials were presented in this session
    Full,
    /// Restored from a remember-me cookie
    Remembered,
}

impl std::fmt::Display for AuthLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthLevel::Full => write!(f, "full"),
            AuthLevel::Remembered => write!(f, "remembered"),
        }
    }
}

/// Security token stored in the session under `_security.<realm>.token`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionToken {
    pub user_id: i64,
    pub level: AuthLevel,
    /// Set while an administrator is impersonating `user_id`
    pub impersonator_id: Option<i64>,
}

impl SessionToken {
    pub fn new(user_id: i64, level: AuthLevel) -> Self {
        Self {
            user_id,
            level,
            impersonator_id: None,
        }
    }

    pub fn is_impersonating(&self) -> bool {
        self.impersonator_id.is_some()
    }

    pub fn is_fully_authenticated(&self) -> bool {
        self.level == AuthLevel::Full
    }
}

/// A flash message kept in the session until it is displayed
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Flash {
    pub kind: String,
    pub message: String,
}

impl Flash {
    pub fn new(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            message: message.into(),
        }
    }
}

/// Authentication state resolved for a request
#[derive(Debug, Clone)]
pub enum AuthState {
    /// User is authenticated
    Authenticated { user: User, token: SessionToken },
    /// User is not authenticated
    Anonymous,
}

impl AuthState {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, AuthState::Authenticated { .. })
    }

    pub fn user(&self) -> Option<&User> {
        match self {
            AuthState::Authenticated { user, .. } => Some(user),
            AuthState::Anonymous => None,
        }
    }

    pub fn token(&self) -> Option<&SessionToken> {
        match self {
            AuthState::Authenticated { token, .. } => Some(token),
            AuthState::Anonymous => None,
        }
    }

    pub fn is_fully_authenticated(&self) -> bool {
        self.token().is_some_and(SessionToken::is_fully_authenticated)
    }
}
