use async_trait::async_trait;
use authz::{Role, RoleSet};
use chrono::{DateTime, Utc};
use sqlx::{migrate::MigrateDatabase, FromRow, Pool, Sqlite, SqlitePool};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::error::{Result, UserError};
use crate::model::{normalize_email, Account, User};
use crate::repository::UserRepository;

/// Configuration for the user database
#[derive(Debug, Clone)]
pub struct UserDatabaseConfig {
    /// Path to the database file
    pub database_path: PathBuf,
    /// Maximum number of connections in the pool
    pub max_connections: u32,
    /// Connection timeout in seconds
    pub connection_timeout: u64,
}

impl Default for UserDatabaseConfig {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from("data/inklog.db"),
            max_connections: 5,
            connection_timeout: 30,
        }
    }
}

#[derive(Debug, FromRow)]
struct UserRow {
    id: i64,
    email: String,
    username: String,
    roles: String,
    password: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = UserError;

    fn try_from(row: UserRow) -> Result<Self> {
        let tokens: Vec<String> = serde_json::from_str(&row.roles)?;
        Ok(User::restore(
            row.id,
            &row.email,
            row.username,
            RoleSet::parse(tokens)?,
            row.password,
            row.created_at,
            row.updated_at,
        ))
    }
}

/// A stored remember-me series.
#[derive(Debug, Clone, FromRow)]
pub struct RememberMeRecord {
    pub series: String,
    pub token_digest: String,
    /// Digest replaced by the last rotation
    pub previous_digest: Option<String>,
    pub user_id: i64,
    /// Password fingerprint of the account when the series was issued
    pub password_fingerprint: String,
    pub last_used: DateTime<Utc>,
}

/// SQLite-backed account storage
pub struct UserDatabase {
    pool: Pool<Sqlite>,
}

impl UserDatabase {
    /// Open (creating if needed) the database file and run migrations
    pub async fn new(config: UserDatabaseConfig) -> Result<Self> {
        if let Some(parent) = config.database_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let db_url = format!("sqlite:{}", config.database_path.display());

        if !Sqlite::database_exists(&db_url).await.unwrap_or(false) {
            info!(
                "Creating user database at: {}",
                config.database_path.display()
            );
            Sqlite::create_database(&db_url).await.map_err(|e| {
                UserError::Initialization(format!("Failed to create database: {}", e))
            })?;
        }

        let pool = sqlx::sqlite::SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.connection_timeout))
            .connect_with(
                sqlx::sqlite::SqliteConnectOptions::new()
                    .filename(&config.database_path)
                    .create_if_missing(true)
                    .foreign_keys(true),
            )
            .await?;

        Self::from_pool(pool).await
    }

    /// Use an existing pool (shared with the blog storage) and run migrations
    pub async fn from_pool(pool: SqlitePool) -> Result<Self> {
        let db = Self { pool };
        db.run_migrations().await?;
        info!("User database initialized successfully");
        Ok(db)
    }

    async fn run_migrations(&self) -> Result<()> {
        info!("Running user database migrations");

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS app_user (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                email TEXT NOT NULL UNIQUE,
                username TEXT NOT NULL,
                roles TEXT NOT NULL DEFAULT '[]',
                password TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS remember_me_token (
                series TEXT PRIMARY KEY,
                token_digest TEXT NOT NULL,
                previous_digest TEXT,
                user_id INTEGER NOT NULL,
                password_fingerprint TEXT NOT NULL,
                last_used TEXT NOT NULL,
                FOREIGN KEY (user_id) REFERENCES app_user(id) ON DELETE CASCADE
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_remember_me_user ON remember_me_token(user_id)",
        )
        .execute(&self.pool)
        .await?;

        info!("User database migrations completed");
        Ok(())
    }

    /// Get the database pool for external use
    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    pub async fn count(&self) -> Result<i64> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM app_user")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Number of accounts explicitly holding `role`.
    pub async fn count_with_role(&self, role: Role) -> Result<usize> {
        let users = self.list().await?;
        Ok(users.iter().filter(|user| user.roles.holds(role)).count())
    }

    /// Check that the account tables exist
    pub async fn verify_integrity(&self) -> Result<bool> {
        for table in ["app_user", "remember_me_token"] {
            let exists = sqlx::query_scalar::<_, bool>(
                "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type='table' AND name=?)",
            )
            .bind(table)
            .fetch_one(&self.pool)
            .await?;

            if !exists {
                warn!("Missing table: {}", table);
                return Ok(false);
            }
        }

        info!("User database integrity check passed");
        Ok(true)
    }

    pub async fn create_remember_me(
        &self,
        series: &str,
        token_digest: &str,
        user_id: i64,
        password_fingerprint: &str,
        now: DateTime<Utc>,
    ) -> Result<()> {
        sqlx::query(
            "INSERT INTO remember_me_token (series, token_digest, user_id, password_fingerprint, last_used) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(series)
        .bind(token_digest)
        .bind(user_id)
        .bind(password_fingerprint)
        .bind(now)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn find_remember_me(&self, series: &str) -> Result<Option<RememberMeRecord>> {
        let record = sqlx::query_as::<_, RememberMeRecord>(
            "SELECT series, token_digest, previous_digest, user_id, password_fingerprint, last_used \
             FROM remember_me_token WHERE series = ?",
        )
        .bind(series)
        .fetch_optional(&self.pool)
        .await?;
        Ok(record)
    }

    /// Rotate the token of an existing series, keeping the replaced digest
    pub async fn update_remember_me(
        &self,
        series: &str,
        token_digest: &str,
        now: DateTime<Utc>,
    ) -> Result<()> {
        sqlx::query(
            "UPDATE remember_me_token SET previous_digest = token_digest, token_digest = ?, last_used = ? \
             WHERE series = ?",
        )
        .bind(token_digest)
        .bind(now)
        .bind(series)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn delete_remember_me(&self, series: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM remember_me_token WHERE series = ?")
            .bind(series)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Remove series not used since `cutoff`
    pub async fn delete_remember_me_before(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        let result = sqlx::query("DELETE FROM remember_me_token WHERE last_used < ?")
            .bind(cutoff)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// Close the database connection
    pub async fn close(self) -> Result<()> {
        self.pool.close().await;
        info!("User database connection closed");
        Ok(())
    }
}

fn map_unique_violation(err: sqlx::Error, email: &str) -> UserError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            UserError::DuplicateEmail(email.to_string())
        }
        _ => UserError::Database(err),
    }
}

#[async_trait]
impl UserRepository for UserDatabase {
    async fn find_by_id(&self, id: i64) -> Result<Option<User>> {
        debug!("Fetching user with ID: {}", id);
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id, email, username, roles, password, created_at, updated_at FROM app_user WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(User::try_from).transpose()
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let email = normalize_email(email);
        debug!("Fetching user with email: {}", email);
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id, email, username, roles, password, created_at, updated_at FROM app_user WHERE email = ?",
        )
        .bind(&email)
        .fetch_optional(&self.pool)
        .await?;
        row.map(User::try_from).transpose()
    }

    async fn list(&self) -> Result<Vec<User>> {
        let rows = sqlx::query_as::<_, UserRow>(
            "SELECT id, email, username, roles, password, created_at, updated_at FROM app_user ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(User::try_from).collect()
    }

    async fn save(&self, user: &mut User) -> Result<()> {
        let roles = serde_json::to_string(&user.roles.assigned())?;
        user.touch();

        match user.id {
            Some(id) => {
                sqlx::query(
                    "UPDATE app_user SET email = ?, username = ?, roles = ?, password = ?, updated_at = ? WHERE id = ?",
                )
                .bind(user.email())
                .bind(&user.username)
                .bind(&roles)
                .bind(user.password())
                .bind(user.updated_at)
                .bind(id)
                .execute(&self.pool)
                .await
                .map_err(|e| map_unique_violation(e, user.email()))?;
                info!("Updated user {}", id);
            }
            None => {
                let result = sqlx::query(
                    "INSERT INTO app_user (email, username, roles, password, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?)",
                )
                .bind(user.email())
                .bind(&user.username)
                .bind(&roles)
                .bind(user.password())
                .bind(user.created_at)
                .bind(user.updated_at)
                .execute(&self.pool)
                .await
                .map_err(|e| map_unique_violation(e, user.email()))?;
                user.id = Some(result.last_insert_rowid());
                info!("Created user {} ({})", result.last_insert_rowid(), user.email());
            }
        }
        Ok(())
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM app_user WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        let deleted = result.rows_affected() > 0;
        if deleted {
            info!("Deleted user {}", id);
        }
        Ok(deleted)
    }

    async fn upgrade_password(&self, account: &dyn Account, new_hash: &str) -> Result<()> {
        let Some(user) = account.as_any().downcast_ref::<User>() else {
            error!(
                "Refusing to upgrade password for unsupported account type {}",
                account.kind()
            );
            return Err(UserError::UnsupportedAccount(account.kind().to_string()));
        };
        let id = user
            .id
            .ok_or_else(|| UserError::UserNotFound(user.email().to_string()))?;

        sqlx::query("UPDATE app_user SET password = ?, updated_at = ? WHERE id = ?")
            .bind(new_hash)
            .bind(Utc::now())
            .bind(id)
            .execute(&self.pool)
            .await?;
        info!("Upgraded password hash for user {}", id);
        Ok(())
    }
}
