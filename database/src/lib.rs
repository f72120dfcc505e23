//! SQLite persistence for Inklog blog content.
//!
//! [`Database`] owns the connection pool that every other crate shares;
//! [`BlogStorage`] maps articles, categories and tags onto it.

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite, SqlitePool};
use std::path::Path;
use tracing::{debug, info};

pub mod error;
pub mod init;
pub mod storage;

pub use error::{DatabaseError, Result};

// Re-export initialization functions for convenience
pub use init::{create_blog_tables, initialize_database, DatabaseConfig};
pub use storage::{BlogStorage, DashboardStats};

/// Database connection pool
#[derive(Debug, Clone)]
pub struct Database {
    pool: Pool<Sqlite>,
}

impl Database {
    /// Open (creating if needed) the database file at `database_path`
    pub async fn new(database_path: &Path, max_connections: u32) -> Result<Self> {
        // Ensure the data directory exists
        if let Some(parent) = database_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        info!("Connecting to database at: {}", database_path.display());

        let options = SqliteConnectOptions::new()
            .filename(database_path)
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await?;

        debug!("Database connection established");

        Ok(Self { pool })
    }

    /// A private in-memory database. One connection, so every query sees the same data.
    pub async fn in_memory() -> Result<Self> {
        let options = SqliteConnectOptions::new()
            .in_memory(true)
            .foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;
        Ok(Self { pool })
    }

    pub fn from_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Get a reference to the connection pool
    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    /// Check if a table exists
    pub async fn table_exists(&self, table_name: &str) -> Result<bool> {
        let query = r#"
            SELECT COUNT(*) as count
            FROM sqlite_master
            WHERE type='table' AND name=?
        "#;

        let result: (i64,) = sqlx::query_as(query)
            .bind(table_name)
            .fetch_one(&self.pool)
            .await?;

        Ok(result.0 > 0)
    }

    /// Execute raw SQL (for table creation, etc.)
    pub async fn execute_raw(&self, sql: &str) -> Result<()> {
        sqlx::query(sql).execute(&self.pool).await?;
        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_database_connection() {
        let temp_dir = TempDir::new().unwrap();
        let db = Database::new(&temp_dir.path().join("nested/test.db"), 2)
            .await
            .unwrap();
        assert!(db.pool().acquire().await.is_ok());
        assert!(temp_dir.path().join("nested/test.db").exists());
    }

    #[tokio::test]
    async fn test_table_exists() {
        let db = Database::in_memory().await.unwrap();

        db.execute_raw("CREATE TABLE test_table (id INTEGER PRIMARY KEY)")
            .await
            .unwrap();

        assert!(db.table_exists("test_table").await.unwrap());
        assert!(!db.table_exists("non_existent_table").await.unwrap());
    }
}
