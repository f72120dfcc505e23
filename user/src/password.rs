//! Password hashing.

use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};
use tracing::debug;

use crate::error::{Result, UserError};
use crate::model::User;

/// Hashes and verifies account passwords.
pub trait CredentialHasher: Send + Sync {
    fn hash(&self, account: &User, plain: &str) -> Result<String>;

    /// `Ok(false)` for a wrong password; `Err` only for a malformed hash.
    fn verify(&self, plain: &str, hash: &str) -> Result<bool>;

    /// Whether `hash` was produced with outdated parameters.
    fn needs_rehash(&self, hash: &str) -> bool;
}

/// Argon2id hasher.
#[derive(Debug, Clone)]
pub struct Argon2Hasher {
    params: Params,
}

impl Argon2Hasher {
    /// `m_cost` in KiB, `t_cost` iterations, `p_cost` lanes.
    pub fn new(m_cost: u32, t_cost: u32, p_cost: u32) -> Result<Self> {
        let params = Params::new(m_cost, t_cost, p_cost, None)
            .map_err(|e| UserError::PasswordHash(e.to_string()))?;
        Ok(Self { params })
    }

    /// Minimal parameters for tests and fixtures. Do not use in production.
    pub fn fast() -> Self {
        Self {
            params: Params::new(Params::MIN_M_COST.max(8), 1, 1, None)
                .unwrap_or_default(),
        }
    }

    fn argon2(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }
}

impl Default for Argon2Hasher {
    fn default() -> Self {
        Self {
            params: Params::default(),
        }
    }
}

impl CredentialHasher for Argon2Hasher {
    fn hash(&self, account: &User, plain: &str) -> Result<String> {
        let salt = SaltString::generate(&mut rand::rngs::OsRng);
        let hash = self
            .argon2()
            .hash_password(plain.as_bytes(), &salt)
            .map_err(|e| UserError::PasswordHash(e.to_string()))?;
        debug!("Hashed password for account {}", account);
        Ok(hash.to_string())
    }

    fn verify(&self, plain: &str, hash: &str) -> Result<bool> {
        let parsed =
            PasswordHash::new(hash).map_err(|e| UserError::PasswordHash(e.to_string()))?;
        match self.argon2().verify_password(plain.as_bytes(), &parsed) {
            Ok(()) => Ok(true),
            Err(argon2::password_hash::Error::Password) => Ok(false),
            Err(e) => Err(UserError::PasswordHash(e.to_string())),
        }
    }

    fn needs_rehash(&self, hash: &str) -> bool {
        let Ok(parsed) = PasswordHash::new(hash) else {
            return true;
        };
        if parsed.algorithm != Algorithm::Argon2id.ident() {
            return true;
        }
        match Params::try_from(&parsed) {
            Ok(params) => {
                params.m_cost() != self.params.m_cost()
                    || params.t_cost() != self.params.t_cost()
                    || params.p_cost() != self.params.p_cost()
            }
            Err(_) => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify() {
        let hasher = Argon2Hasher::fast();
        let user = User::new("alice@test.fr", "Miss Alice");
        let hash = hasher.hash(&user, "password").unwrap();

        assert!(hash.starts_with("$argon2id$"));
        assert!(hasher.verify("password", &hash).unwrap());
        assert!(!hasher.verify("wrong", &hash).unwrap());
    }

    #[test]
    fn test_malformed_hash_is_an_error() {
        let hasher = Argon2Hasher::fast();
        assert!(hasher.verify("password", "not-a-hash").is_err());
        assert!(hasher.needs_rehash("not-a-hash"));
    }

    #[test]
    fn test_needs_rehash_on_parameter_change() {
        let user = User::new("alice@test.fr", "Miss Alice");
        let weak = Argon2Hasher::fast();
        let hash = weak.hash(&user, "password").unwrap();
        assert!(!weak.needs_rehash(&hash));

        let stronger = Argon2Hasher::new(Params::MIN_M_COST.max(8) * 2, 2, 1).unwrap();
        assert!(stronger.needs_rehash(&hash));
        // Old hashes still verify after a parameter change.
        assert!(stronger.verify("password", &hash).unwrap());
    }
}
