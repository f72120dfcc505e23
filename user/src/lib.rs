pub mod auth;
pub mod database;
pub mod error;
pub mod model;
pub mod password;
pub mod repository;

use std::sync::Arc;
use tracing::info;

use authz::RoleSet;
use sqlx::SqlitePool;

use auth::{AuthBackend, RememberMeService, SessionManager};
pub use auth::{SessionConfig, SqlxSessionStore};
use database::UserDatabase;
use password::{Argon2Hasher, CredentialHasher};

/// User management system with authentication
pub struct UserManager {
    database: Arc<UserDatabase>,
    auth_backend: AuthBackend,
    session_store: SqlxSessionStore,
    session_manager: SessionManager,
    remember_me: RememberMeService,
}

impl UserManager {
    /// Create a user manager with its own database file
    pub async fn new(
        db_config: database::UserDatabaseConfig,
        session_config: SessionConfig,
    ) -> error::Result<Self> {
        let database = UserDatabase::new(db_config).await?;
        Self::assemble(database, session_config, Arc::new(Argon2Hasher::default())).await
    }

    /// Create a user manager on a pool shared with the rest of the application
    pub async fn with_pool(
        pool: SqlitePool,
        session_config: SessionConfig,
        hasher: Arc<dyn CredentialHasher>,
    ) -> error::Result<Self> {
        let database = UserDatabase::from_pool(pool).await?;
        Self::assemble(database, session_config, hasher).await
    }

    async fn assemble(
        database: UserDatabase,
        session_config: SessionConfig,
        hasher: Arc<dyn CredentialHasher>,
    ) -> error::Result<Self> {
        info!("Initializing user management system with authentication");

        let database = Arc::new(database);
        let auth_backend = AuthBackend::new(database.clone(), hasher)?;
        let session_store = SqlxSessionStore::new(database.pool().clone()).await?;
        let remember_me = RememberMeService::new(database.clone(), &session_config);
        let session_manager = SessionManager::new(session_config);

        info!("User management system initialized successfully");

        Ok(Self {
            database,
            auth_backend,
            session_store,
            session_manager,
            remember_me,
        })
    }

    pub fn database(&self) -> &UserDatabase {
        &self.database
    }

    pub fn auth_backend(&self) -> &AuthBackend {
        &self.auth_backend
    }

    pub fn session_store(&self) -> &SqlxSessionStore {
        &self.session_store
    }

    pub fn session_manager(&self) -> &SessionManager {
        &self.session_manager
    }

    /// tower-sessions middleware backed by the shared pool
    pub fn session_layer(
        &self,
    ) -> tower_sessions::SessionManagerLayer<tower_sessions_sqlx_store::SqliteStore> {
        self.session_store.layer(self.session_manager.config())
    }

    pub fn session_config(&self) -> &SessionConfig {
        self.session_manager.config()
    }

    pub fn remember_me(&self) -> &RememberMeService {
        &self.remember_me
    }

    pub fn hasher(&self) -> &dyn CredentialHasher {
        self.auth_backend.hasher()
    }

    /// Create and persist an account with a plain-text password
    pub async fn create_user(
        &self,
        email: &str,
        username: &str,
        plain_password: &str,
        roles: RoleSet,
    ) -> error::Result<User> {
        let mut user = User::new(email, username.trim());
        user.roles = roles;
        validate_account(&user)?;
        validate_password(plain_password)?;

        user.set_password(self.hasher().hash(&user, plain_password)?);
        self.database.save(&mut user).await?;
        Ok(user)
    }

    /// Hash and store a new password for an existing account
    pub async fn change_password(&self, user: &mut User, plain_password: &str) -> error::Result<()> {
        validate_password(plain_password)?;
        let hash = self.hasher().hash(user, plain_password)?;
        self.database.upgrade_password(&*user, &hash).await?;
        user.set_password(hash);
        Ok(())
    }

    /// Verify system integrity
    pub async fn verify_integrity(&self) -> error::Result<bool> {
        self.database.verify_integrity().await
    }

    /// Clean up expired sessions and remember-me series
    pub async fn cleanup_expired(&self) -> error::Result<()> {
        let sessions = self.session_store.cleanup_expired().await?;
        let series = self.remember_me.cleanup_expired().await?;
        info!(
            "Cleaned up {} expired sessions and {} remember-me series",
            sessions, series
        );
        Ok(())
    }
}

/// Checks the account fields a form may submit
pub fn validate_account(user: &User) -> error::Result<()> {
    let email = user.email();
    let valid_email = email
        .split_once('@')
        .is_some_and(|(local, domain)| !local.is_empty() && domain.contains('.'));
    if !valid_email || email.len() > 180 {
        return Err(UserError::Validation {
            field: "email",
            message: "Please enter a valid email address.".to_string(),
        });
    }
    let username_len = user.username.chars().count();
    if !(2..=50).contains(&username_len) {
        return Err(UserError::Validation {
            field: "username",
            message: "Username must be between 2 and 50 characters.".to_string(),
        });
    }
    Ok(())
}

pub fn validate_password(plain: &str) -> error::Result<()> {
    if plain.chars().count() < 8 {
        return Err(UserError::Validation {
            field: "password",
            message: "Password must be at least 8 characters.".to_string(),
        });
    }
    Ok(())
}

// Re-export commonly used types
pub use auth::{AuthLevel, AuthState, Credentials, Flash, SessionToken};
pub use database::UserDatabaseConfig;
pub use error::{Result as UserResult, UserError};
pub use model::{Account, User};
pub use repository::UserRepository;
