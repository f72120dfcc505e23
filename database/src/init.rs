use crate::{Database, Result};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

/// Database initialization configuration
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// Path to the database file
    pub database_path: PathBuf,
    /// Maximum number of pooled connections
    pub max_connections: u32,
    /// Whether to create tables on initialization
    pub create_tables: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from("data").join("inklog.db"),
            max_connections: 5,
            create_tables: true,
        }
    }
}

impl DatabaseConfig {
    /// Create a new database configuration with default paths
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a custom database path
    pub fn with_database_path(mut self, path: PathBuf) -> Self {
        self.database_path = path;
        self
    }

    pub fn with_max_connections(mut self, max_connections: u32) -> Self {
        self.max_connections = max_connections.max(1);
        self
    }

    /// Set whether to create tables on initialization
    pub fn with_create_tables(mut self, create: bool) -> Self {
        self.create_tables = create;
        self
    }
}

/// Initialize the database with the given configuration
pub async fn initialize_database(config: DatabaseConfig) -> Result<Arc<Database>> {
    info!("Initializing database with configuration");

    let db = Database::new(&config.database_path, config.max_connections).await?;
    info!("Database connection established");

    if config.create_tables {
        create_blog_tables(&db).await?;
    }

    Ok(Arc::new(db))
}

const BLOG_SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS blog_category (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        description TEXT,
        slug TEXT NOT NULL UNIQUE
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS tag (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        slug TEXT NOT NULL UNIQUE
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS blog_article (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        title TEXT NOT NULL,
        summary TEXT,
        content TEXT NOT NULL,
        slug TEXT NOT NULL UNIQUE,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL,
        published_at TEXT,
        author_id INTEGER REFERENCES app_user(id) ON DELETE SET NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS article_tag (
        article_id INTEGER NOT NULL REFERENCES blog_article(id) ON DELETE CASCADE,
        tag_id INTEGER NOT NULL REFERENCES tag(id) ON DELETE CASCADE,
        PRIMARY KEY (article_id, tag_id)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS article_category (
        article_id INTEGER NOT NULL REFERENCES blog_article(id) ON DELETE CASCADE,
        category_id INTEGER NOT NULL REFERENCES blog_category(id) ON DELETE CASCADE,
        PRIMARY KEY (article_id, category_id)
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_blog_article_published_at ON blog_article(published_at)",
    "CREATE INDEX IF NOT EXISTS idx_blog_article_created_at ON blog_article(created_at)",
    "CREATE INDEX IF NOT EXISTS idx_blog_article_updated_at ON blog_article(updated_at)",
    "CREATE INDEX IF NOT EXISTS idx_article_tag_tag ON article_tag(tag_id)",
    "CREATE INDEX IF NOT EXISTS idx_article_category_category ON article_category(category_id)",
];

/// Create the article, category and tag tables.
///
/// `blog_article.author_id` references the `app_user` table owned by the
/// `user` crate; both sets of migrations must run on the same pool before
/// articles with an author are written.
pub async fn create_blog_tables(db: &Database) -> Result<()> {
    info!("Creating blog tables");
    for statement in BLOG_SCHEMA {
        db.execute_raw(statement).await?;
    }
    Ok(())
}
