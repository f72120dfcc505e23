//! The `User` account model.

use std::any::Any;

use authz::{Principal, PrincipalId, RoleSet};
use axum_login::AuthUser;
use chrono::{DateTime, Utc};
use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};
use sha2::{Digest, Sha256};

/// Anything the user repository may be asked to persist a password for.
///
/// Only [`User`] is supported by this system's repository; other
/// implementations are rejected with `UserError::UnsupportedAccount`.
pub trait Account: Send + Sync {
    fn account_id(&self) -> Option<i64>;

    /// Short type name used in error messages.
    fn kind(&self) -> &'static str;

    fn as_any(&self) -> &dyn Any;
}

/// A blog account. The email is the login identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: Option<i64>,
    email: String,
    pub username: String,
    pub roles: RoleSet,
    password: String,
    fingerprint: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// A new, not yet persisted account with the baseline role and no password.
    pub fn new(email: &str, username: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: None,
            email: normalize_email(email),
            username: username.into(),
            roles: RoleSet::new(),
            password: String::new(),
            fingerprint: fingerprint(""),
            created_at: now,
            updated_at: now,
        }
    }

    /// Rebuilds a persisted account from its stored columns.
    pub(crate) fn restore(
        id: i64,
        email: &str,
        username: String,
        roles: RoleSet,
        password: String,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        let fingerprint = fingerprint(&password);
        Self {
            id: Some(id),
            email: normalize_email(email),
            username,
            roles,
            password,
            fingerprint,
            created_at,
            updated_at,
        }
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    /// Sets the email, trimmed and lowercased.
    pub fn set_email(&mut self, email: &str) {
        self.email = normalize_email(email);
    }

    /// The identifier used at login; same as the normalized email.
    pub fn identifier(&self) -> &str {
        &self.email
    }

    /// Role tokens including the baseline role.
    pub fn role_tokens(&self) -> Vec<&'static str> {
        self.roles.tokens()
    }

    /// The stored password hash.
    pub fn password(&self) -> &str {
        &self.password
    }

    pub fn set_password(&mut self, hash: impl Into<String>) {
        self.password = hash.into();
        self.fingerprint = fingerprint(&self.password);
    }

    /// SHA-256 of the password hash, hex encoded. Stands in for the hash
    /// wherever the account leaves the database.
    pub fn password_fingerprint(&self) -> &str {
        &self.fingerprint
    }

    pub fn principal(&self) -> Principal {
        Principal::new(self.id.map(PrincipalId), self.roles.clone())
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

impl std::fmt::Display for User {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.email)
    }
}

impl Serialize for User {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("User", 7)?;
        state.serialize_field("id", &self.id)?;
        state.serialize_field("email", &self.email)?;
        state.serialize_field("username", &self.username)?;
        state.serialize_field("roles", &self.roles)?;
        state.serialize_field("password", &self.fingerprint)?;
        state.serialize_field("created_at", &self.created_at)?;
        state.serialize_field("updated_at", &self.updated_at)?;
        state.end()
    }
}

impl Account for User {
    fn account_id(&self) -> Option<i64> {
        self.id
    }

    fn kind(&self) -> &'static str {
        "User"
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl AuthUser for User {
    type Id = i64;

    // Only persisted accounts reach a login session.
    fn id(&self) -> Self::Id {
        self.id.unwrap_or_default()
    }

    fn session_auth_hash(&self) -> &[u8] {
        self.fingerprint.as_bytes()
    }
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn fingerprint(hash: &str) -> String {
    hex::encode(Sha256::digest(hash.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use authz::Role;

    #[test]
    fn test_email_is_normalized() {
        let mut user = User::new("  Admin@TesT.FR  ", "Admin");
        assert_eq!(user.email(), "admin@test.fr");
        assert_eq!(user.identifier(), "admin@test.fr");

        user.set_email("Other@Example.COM ");
        assert_eq!(user.email(), "other@example.com");
    }

    #[test]
    fn test_roles_always_contain_baseline_and_are_unique() {
        let mut user = User::new("a@b.c", "a");
        user.roles = RoleSet::parse(["ROLE_ADMIN", "ROLE_USER", "ROLE_ADMIN"]).unwrap();
        assert_eq!(user.role_tokens(), vec!["ROLE_USER", "ROLE_ADMIN"]);

        user.roles = RoleSet::parse(Vec::<String>::new()).unwrap();
        assert_eq!(user.role_tokens(), vec!["ROLE_USER"]);
    }

    #[test]
    fn test_password_is_fingerprinted_in_serialization() {
        let mut user = User::new("x@y.z", "x");
        user.set_password("HASHED_DB_VALUE");

        let json = serde_json::to_value(&user).unwrap();
        let serialized = json["password"].as_str().unwrap();
        assert_ne!(serialized, "HASHED_DB_VALUE");
        assert_eq!(serialized, user.password_fingerprint());
        assert_eq!(serialized.len(), 64);
        assert!(!json.to_string().contains("HASHED_DB_VALUE"));
    }

    #[test]
    fn test_session_hash_changes_with_password() {
        let mut user = User::new("x@y.z", "x");
        user.set_password("first");
        let before = user.session_auth_hash().to_vec();
        user.set_password("second");
        assert_ne!(before, user.session_auth_hash());
    }

    #[test]
    fn test_principal_reflects_account() {
        let mut user = User::new("x@y.z", "x");
        user.id = Some(4);
        user.roles.insert(Role::Admin);
        let principal = user.principal();
        assert_eq!(principal.id, Some(PrincipalId(4)));
        assert!(principal.is_granted(Role::Admin));
        assert!(!principal.holds(Role::SuperAdmin));
    }
}
