//! Storage interface for user accounts.

use async_trait::async_trait;

use crate::error::Result;
use crate::model::{Account, User};

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_by_id(&self, id: i64) -> Result<Option<User>>;

    /// Looks up an account by email. The email is normalized first.
    async fn find_by_email(&self, email: &str) -> Result<Option<User>>;

    /// All accounts ordered by id.
    async fn list(&self) -> Result<Vec<User>>;

    /// Inserts or updates `user`, assigning its id on insert.
    async fn save(&self, user: &mut User) -> Result<()>;

    /// Returns whether an account was removed.
    async fn delete(&self, id: i64) -> Result<bool>;

    /// Replaces the stored password hash of `account`.
    ///
    /// Fails with `UserError::UnsupportedAccount` for account types other
    /// than [`User`].
    async fn upgrade_password(&self, account: &dyn Account, new_hash: &str) -> Result<()>;
}
