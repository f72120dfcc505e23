use crate::{Database, DatabaseError, Result};
use chrono::{DateTime, Utc};
use content::{unique_slug, Article, ArticleInput, Category, FormErrors, Tag};
use serde::Serialize;
use sqlx::{FromRow, Sqlite, Transaction};
use std::collections::HashSet;
use tracing::{debug, info};

#[derive(Debug, FromRow)]
struct ArticleRow {
    id: i64,
    title: String,
    summary: Option<String>,
    content: String,
    slug: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    published_at: Option<DateTime<Utc>>,
    author_id: Option<i64>,
}

#[derive(Debug, FromRow)]
struct CategoryRow {
    id: i64,
    name: String,
    description: Option<String>,
    slug: String,
}

#[derive(Debug, FromRow)]
struct TagRow {
    id: i64,
    name: String,
    slug: String,
}

const ARTICLE_COLUMNS: &str =
    "a.id, a.title, a.summary, a.content, a.slug, a.created_at, a.updated_at, a.published_at, a.author_id";

/// Counters shown on the admin dashboard
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DashboardStats {
    pub articles: i64,
    pub published: i64,
    pub categories: i64,
    pub tags: i64,
}

/// Blog content storage operations
pub struct BlogStorage<'a> {
    db: &'a Database,
}

impl<'a> BlogStorage<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    // ---- articles ----

    /// Insert `article`, assigning its id and a unique slug
    pub async fn create_article(&self, article: &mut Article) -> Result<i64> {
        let slug = self
            .unique_slug_for("blog_article", &article.slug, None)
            .await?;

        let mut tx = self.db.pool().begin().await?;
        let id = sqlx::query(
            r#"
            INSERT INTO blog_article
                (title, summary, content, slug, created_at, updated_at, published_at, author_id)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&article.title)
        .bind(&article.summary)
        .bind(&article.content)
        .bind(&slug)
        .bind(article.created_at)
        .bind(article.updated_at)
        .bind(article.published_at)
        .bind(article.author_id)
        .execute(&mut *tx)
        .await?
        .last_insert_rowid();

        write_associations(&mut tx, id, article).await?;
        tx.commit().await?;

        article.id = Some(id);
        article.slug = slug;
        info!("Created article {} ({})", id, article.slug);
        Ok(id)
    }

    /// Persist every field of a stored article and replace its associations
    pub async fn update_article(&self, article: &Article) -> Result<()> {
        let id = article.id.ok_or_else(|| DatabaseError::Other(
            "Cannot update an article that was never saved".to_string(),
        ))?;

        let mut tx = self.db.pool().begin().await?;
        let result = sqlx::query(
            r#"
            UPDATE blog_article
            SET title = ?, summary = ?, content = ?, slug = ?, updated_at = ?,
                published_at = ?, author_id = ?
            WHERE id = ?
            "#,
        )
        .bind(&article.title)
        .bind(&article.summary)
        .bind(&article.content)
        .bind(&article.slug)
        .bind(article.updated_at)
        .bind(article.published_at)
        .bind(article.author_id)
        .bind(id)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound { kind: "Article", id });
        }

        sqlx::query("DELETE FROM article_tag WHERE article_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM article_category WHERE article_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        write_associations(&mut tx, id, article).await?;
        tx.commit().await?;

        debug!("Updated article {}", id);
        Ok(())
    }

    pub async fn get_article(&self, id: i64) -> Result<Option<Article>> {
        let sql = format!("SELECT {} FROM blog_article a WHERE a.id = ?", ARTICLE_COLUMNS);
        let row: Option<ArticleRow> = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(self.db.pool())
            .await?;
        match row {
            Some(row) => Ok(Some(self.hydrate(row).await?)),
            None => Ok(None),
        }
    }

    pub async fn find_article_by_slug(&self, slug: &str) -> Result<Option<Article>> {
        let sql = format!("SELECT {} FROM blog_article a WHERE a.slug = ?", ARTICLE_COLUMNS);
        let row: Option<ArticleRow> = sqlx::query_as(&sql)
            .bind(slug)
            .fetch_optional(self.db.pool())
            .await?;
        match row {
            Some(row) => Ok(Some(self.hydrate(row).await?)),
            None => Ok(None),
        }
    }

    /// All articles, newest first
    pub async fn list_articles(&self) -> Result<Vec<Article>> {
        let sql = format!(
            "SELECT {} FROM blog_article a ORDER BY a.created_at DESC, a.id DESC",
            ARTICLE_COLUMNS
        );
        let rows: Vec<ArticleRow> = sqlx::query_as(&sql).fetch_all(self.db.pool()).await?;
        self.hydrate_all(rows).await
    }

    /// Articles published at or before `now`, most recently published first
    pub async fn list_published(&self, now: DateTime<Utc>) -> Result<Vec<Article>> {
        let sql = format!(
            "SELECT {} FROM blog_article a
             WHERE a.published_at IS NOT NULL AND a.published_at <= ?
             ORDER BY a.published_at DESC, a.id DESC",
            ARTICLE_COLUMNS
        );
        let rows: Vec<ArticleRow> = sqlx::query_as(&sql)
            .bind(now)
            .fetch_all(self.db.pool())
            .await?;
        self.hydrate_all(rows).await
    }

    pub async fn articles_by_author(&self, author_id: i64) -> Result<Vec<Article>> {
        let sql = format!(
            "SELECT {} FROM blog_article a WHERE a.author_id = ?
             ORDER BY a.created_at DESC, a.id DESC",
            ARTICLE_COLUMNS
        );
        let rows: Vec<ArticleRow> = sqlx::query_as(&sql)
            .bind(author_id)
            .fetch_all(self.db.pool())
            .await?;
        self.hydrate_all(rows).await
    }

    pub async fn articles_with_tag(&self, tag_id: i64) -> Result<Vec<Article>> {
        let sql = format!(
            "SELECT {} FROM blog_article a
             JOIN article_tag t ON t.article_id = a.id
             WHERE t.tag_id = ?
             ORDER BY a.created_at DESC, a.id DESC",
            ARTICLE_COLUMNS
        );
        let rows: Vec<ArticleRow> = sqlx::query_as(&sql)
            .bind(tag_id)
            .fetch_all(self.db.pool())
            .await?;
        self.hydrate_all(rows).await
    }

    pub async fn articles_with_category(&self, category_id: i64) -> Result<Vec<Article>> {
        let sql = format!(
            "SELECT {} FROM blog_article a
             JOIN article_category c ON c.article_id = a.id
             WHERE c.category_id = ?
             ORDER BY a.created_at DESC, a.id DESC",
            ARTICLE_COLUMNS
        );
        let rows: Vec<ArticleRow> = sqlx::query_as(&sql)
            .bind(category_id)
            .fetch_all(self.db.pool())
            .await?;
        self.hydrate_all(rows).await
    }

    /// Returns whether a row was removed. Join rows go with it.
    pub async fn delete_article(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM blog_article WHERE id = ?")
            .bind(id)
            .execute(self.db.pool())
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Field errors for tag or category ids that do not exist
    pub async fn check_associations(&self, input: &ArticleInput) -> Result<()> {
        let mut errors = FormErrors::new();
        for id in &input.tag_ids {
            if !self.exists("tag", *id).await? {
                errors.add("tags", format!("Tag {} does not exist.", id));
            }
        }
        for id in &input.category_ids {
            if !self.exists("blog_category", *id).await? {
                errors.add("categories", format!("Category {} does not exist.", id));
            }
        }
        errors.into_result().map_err(DatabaseError::from)
    }

    async fn hydrate(&self, row: ArticleRow) -> Result<Article> {
        let tag_ids: Vec<(i64,)> =
            sqlx::query_as("SELECT tag_id FROM article_tag WHERE article_id = ? ORDER BY tag_id")
                .bind(row.id)
                .fetch_all(self.db.pool())
                .await?;
        let category_ids: Vec<(i64,)> = sqlx::query_as(
            "SELECT category_id FROM article_category WHERE article_id = ? ORDER BY category_id",
        )
        .bind(row.id)
        .fetch_all(self.db.pool())
        .await?;

        Ok(Article {
            id: Some(row.id),
            title: row.title,
            summary: row.summary,
            content: row.content,
            slug: row.slug,
            created_at: row.created_at,
            updated_at: row.updated_at,
            published_at: row.published_at,
            author_id: row.author_id,
            tag_ids: tag_ids.into_iter().map(|(id,)| id).collect(),
            category_ids: category_ids.into_iter().map(|(id,)| id).collect(),
        })
    }

    async fn hydrate_all(&self, rows: Vec<ArticleRow>) -> Result<Vec<Article>> {
        let mut articles = Vec::with_capacity(rows.len());
        for row in rows {
            articles.push(self.hydrate(row).await?);
        }
        Ok(articles)
    }

    // ---- categories ----

    pub async fn create_category(&self, category: &mut Category) -> Result<i64> {
        let slug = self
            .unique_slug_for("blog_category", &category.slug, None)
            .await?;
        let id = sqlx::query("INSERT INTO blog_category (name, description, slug) VALUES (?, ?, ?)")
            .bind(category.name())
            .bind(&category.description)
            .bind(&slug)
            .execute(self.db.pool())
            .await?
            .last_insert_rowid();

        category.id = Some(id);
        category.slug = slug;
        info!("Created category {} ({})", id, category.slug);
        Ok(id)
    }

    pub async fn update_category(&self, category: &Category) -> Result<()> {
        let id = category.id.ok_or_else(|| DatabaseError::Other(
            "Cannot update a category that was never saved".to_string(),
        ))?;
        let result =
            sqlx::query("UPDATE blog_category SET name = ?, description = ?, slug = ? WHERE id = ?")
                .bind(category.name())
                .bind(&category.description)
                .bind(&category.slug)
                .bind(id)
                .execute(self.db.pool())
                .await?;
        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound { kind: "Category", id });
        }
        Ok(())
    }

    pub async fn get_category(&self, id: i64) -> Result<Option<Category>> {
        let row: Option<CategoryRow> =
            sqlx::query_as("SELECT id, name, description, slug FROM blog_category WHERE id = ?")
                .bind(id)
                .fetch_optional(self.db.pool())
                .await?;
        Ok(row.map(|r| Category::restore(r.id, r.name, r.description, r.slug)))
    }

    /// All categories ordered by name
    pub async fn list_categories(&self) -> Result<Vec<Category>> {
        let rows: Vec<CategoryRow> = sqlx::query_as(
            "SELECT id, name, description, slug FROM blog_category ORDER BY name COLLATE NOCASE, id",
        )
        .fetch_all(self.db.pool())
        .await?;
        Ok(rows
            .into_iter()
            .map(|r| Category::restore(r.id, r.name, r.description, r.slug))
            .collect())
    }

    pub async fn delete_category(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM blog_category WHERE id = ?")
            .bind(id)
            .execute(self.db.pool())
            .await?;
        Ok(result.rows_affected() > 0)
    }

    // ---- tags ----

    pub async fn create_tag(&self, tag: &mut Tag) -> Result<i64> {
        let slug = self.unique_slug_for("tag", &tag.slug, None).await?;
        let id = sqlx::query("INSERT INTO tag (name, slug) VALUES (?, ?)")
            .bind(tag.name())
            .bind(&slug)
            .execute(self.db.pool())
            .await?
            .last_insert_rowid();

        tag.id = Some(id);
        tag.slug = slug;
        info!("Created tag {} ({})", id, tag.slug);
        Ok(id)
    }

    pub async fn update_tag(&self, tag: &Tag) -> Result<()> {
        let id = tag.id.ok_or_else(|| DatabaseError::Other(
            "Cannot update a tag that was never saved".to_string(),
        ))?;
        let result = sqlx::query("UPDATE tag SET name = ?, slug = ? WHERE id = ?")
            .bind(tag.name())
            .bind(&tag.slug)
            .bind(id)
            .execute(self.db.pool())
            .await?;
        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound { kind: "Tag", id });
        }
        Ok(())
    }

    pub async fn get_tag(&self, id: i64) -> Result<Option<Tag>> {
        let row: Option<TagRow> = sqlx::query_as("SELECT id, name, slug FROM tag WHERE id = ?")
            .bind(id)
            .fetch_optional(self.db.pool())
            .await?;
        Ok(row.map(|r| Tag::restore(r.id, r.name, r.slug)))
    }

    pub async fn list_tags(&self) -> Result<Vec<Tag>> {
        let rows: Vec<TagRow> =
            sqlx::query_as("SELECT id, name, slug FROM tag ORDER BY name COLLATE NOCASE, id")
                .fetch_all(self.db.pool())
                .await?;
        Ok(rows
            .into_iter()
            .map(|r| Tag::restore(r.id, r.name, r.slug))
            .collect())
    }

    pub async fn delete_tag(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM tag WHERE id = ?")
            .bind(id)
            .execute(self.db.pool())
            .await?;
        Ok(result.rows_affected() > 0)
    }

    // ---- shared ----

    pub async fn dashboard_stats(&self, now: DateTime<Utc>) -> Result<DashboardStats> {
        let (articles,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM blog_article")
            .fetch_one(self.db.pool())
            .await?;
        let (published,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM blog_article WHERE published_at IS NOT NULL AND published_at <= ?",
        )
        .bind(now)
        .fetch_one(self.db.pool())
        .await?;
        let (categories,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM blog_category")
            .fetch_one(self.db.pool())
            .await?;
        let (tags,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM tag")
            .fetch_one(self.db.pool())
            .await?;

        Ok(DashboardStats {
            articles,
            published,
            categories,
            tags,
        })
    }

    async fn exists(&self, table: &'static str, id: i64) -> Result<bool> {
        let sql = format!("SELECT EXISTS(SELECT 1 FROM {} WHERE id = ?)", table);
        let (found,): (i64,) = sqlx::query_as(&sql)
            .bind(id)
            .fetch_one(self.db.pool())
            .await?;
        Ok(found != 0)
    }

    /// `base` or the first free `base-N` in `table`, ignoring the row `exclude_id`
    async fn unique_slug_for(
        &self,
        table: &'static str,
        base: &str,
        exclude_id: Option<i64>,
    ) -> Result<String> {
        let base = if base.is_empty() { "n-a" } else { base };
        let sql = format!(
            "SELECT slug FROM {} WHERE (slug = ? OR slug LIKE ?) AND id IS NOT ?",
            table
        );
        let rows: Vec<(String,)> = sqlx::query_as(&sql)
            .bind(base)
            .bind(format!("{}-%", base))
            .bind(exclude_id)
            .fetch_all(self.db.pool())
            .await?;
        let taken: HashSet<String> = rows.into_iter().map(|(slug,)| slug).collect();
        Ok(unique_slug(base, |candidate| taken.contains(candidate)))
    }
}

async fn write_associations(
    tx: &mut Transaction<'_, Sqlite>,
    article_id: i64,
    article: &Article,
) -> Result<()> {
    for tag_id in &article.tag_ids {
        sqlx::query("INSERT OR IGNORE INTO article_tag (article_id, tag_id) VALUES (?, ?)")
            .bind(article_id)
            .bind(*tag_id)
            .execute(&mut **tx)
            .await?;
    }
    for category_id in &article.category_ids {
        sqlx::query(
            "INSERT OR IGNORE INTO article_category (article_id, category_id) VALUES (?, ?)",
        )
        .bind(article_id)
        .bind(*category_id)
        .execute(&mut **tx)
        .await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::create_blog_tables;
    use chrono::Duration;
    use content::{CategoryInput, TagInput};

    async fn setup_test_db() -> Database {
        let db = Database::in_memory().await.unwrap();
        // Minimal stand-in for the account table owned by the user crate
        db.execute_raw("CREATE TABLE app_user (id INTEGER PRIMARY KEY AUTOINCREMENT, email TEXT)")
            .await
            .unwrap();
        create_blog_tables(&db).await.unwrap();
        db
    }

    async fn category(storage: &BlogStorage<'_>, name: &str) -> i64 {
        let mut category = Category::new(CategoryInput {
            name: name.to_string(),
            description: None,
        });
        storage.create_category(&mut category).await.unwrap()
    }

    async fn tag(storage: &BlogStorage<'_>, name: &str) -> i64 {
        let mut tag = Tag::new(TagInput {
            name: name.to_string(),
        });
        storage.create_tag(&mut tag).await.unwrap()
    }

    fn article(title: &str, tag_ids: Vec<i64>, category_ids: Vec<i64>) -> Article {
        Article::new(
            ArticleInput {
                title: title.to_string(),
                summary: None,
                content: "Some article content".to_string(),
                tag_ids,
                category_ids,
            },
            None,
            Utc::now(),
        )
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let db = setup_test_db().await;
        let storage = BlogStorage::new(&db);
        let news = category(&storage, "News").await;
        let rust = tag(&storage, "Rust").await;

        let mut created = article("Hello World", vec![rust], vec![news]);
        let id = storage.create_article(&mut created).await.unwrap();
        assert_eq!(created.id, Some(id));

        let loaded = storage.get_article(id).await.unwrap().unwrap();
        assert_eq!(loaded.title, "Hello World");
        assert_eq!(loaded.slug, "hello-world");
        assert_eq!(loaded.tag_ids, vec![rust]);
        assert_eq!(loaded.category_ids, vec![news]);

        let by_slug = storage.find_article_by_slug("hello-world").await.unwrap();
        assert_eq!(by_slug.map(|a| a.id), Some(Some(id)));
        assert!(storage.get_article(id + 100).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_slugs_are_unique() {
        let db = setup_test_db().await;
        let storage = BlogStorage::new(&db);
        let news = category(&storage, "News").await;

        let mut first = article("Hello World", vec![], vec![news]);
        let mut second = article("Hello, world!", vec![], vec![news]);
        let mut third = article("Hello World", vec![], vec![news]);
        storage.create_article(&mut first).await.unwrap();
        storage.create_article(&mut second).await.unwrap();
        storage.create_article(&mut third).await.unwrap();

        assert_eq!(first.slug, "hello-world");
        assert_eq!(second.slug, "hello-world-1");
        assert_eq!(third.slug, "hello-world-2");

        let mut again = Category::new(CategoryInput {
            name: "  news ".to_string(),
            description: None,
        });
        storage.create_category(&mut again).await.unwrap();
        assert_eq!(again.slug, "news-1");
    }

    #[tokio::test]
    async fn test_update_replaces_associations() {
        let db = setup_test_db().await;
        let storage = BlogStorage::new(&db);
        let news = category(&storage, "News").await;
        let misc = category(&storage, "Misc").await;
        let rust = tag(&storage, "Rust").await;

        let mut stored = article("Draft title", vec![rust], vec![news]);
        let id = storage.create_article(&mut stored).await.unwrap();

        stored.apply(
            ArticleInput {
                title: "Final title".to_string(),
                summary: Some("Short".to_string()),
                content: "Rewritten content".to_string(),
                tag_ids: vec![],
                category_ids: vec![misc, news],
            },
            Utc::now(),
        );
        storage.update_article(&stored).await.unwrap();

        let loaded = storage.get_article(id).await.unwrap().unwrap();
        assert_eq!(loaded.title, "Final title");
        assert_eq!(loaded.slug, "draft-title");
        assert!(loaded.tag_ids.is_empty());
        assert_eq!(loaded.category_ids.len(), 2);

        stored.id = Some(999);
        assert!(matches!(
            storage.update_article(&stored).await,
            Err(DatabaseError::NotFound { kind: "Article", id: 999 })
        ));
    }

    #[tokio::test]
    async fn test_articles_by_tag_and_category() {
        let db = setup_test_db().await;
        let storage = BlogStorage::new(&db);
        let news = category(&storage, "News").await;
        let misc = category(&storage, "Misc").await;
        let rust = tag(&storage, "Rust").await;
        let web = tag(&storage, "Web").await;

        let mut a = article("First article", vec![rust, web], vec![news]);
        let mut b = article("Second article", vec![web], vec![misc]);
        storage.create_article(&mut a).await.unwrap();
        storage.create_article(&mut b).await.unwrap();

        assert_eq!(storage.articles_with_tag(rust).await.unwrap().len(), 1);
        assert_eq!(storage.articles_with_tag(web).await.unwrap().len(), 2);
        let in_misc = storage.articles_with_category(misc).await.unwrap();
        assert_eq!(in_misc.len(), 1);
        assert_eq!(in_misc[0].title, "Second article");
    }

    #[tokio::test]
    async fn test_delete_cascades() {
        let db = setup_test_db().await;
        let storage = BlogStorage::new(&db);
        let news = category(&storage, "News").await;
        let rust = tag(&storage, "Rust").await;

        let mut a = article("Doomed article", vec![rust], vec![news]);
        let id = storage.create_article(&mut a).await.unwrap();

        assert!(storage.delete_tag(rust).await.unwrap());
        let loaded = storage.get_article(id).await.unwrap().unwrap();
        assert!(loaded.tag_ids.is_empty());

        assert!(storage.delete_article(id).await.unwrap());
        assert!(!storage.delete_article(id).await.unwrap());
        assert!(storage.articles_with_category(news).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_deleting_author_keeps_article() {
        let db = setup_test_db().await;
        let storage = BlogStorage::new(&db);
        let news = category(&storage, "News").await;
        db.execute_raw("INSERT INTO app_user (id, email) VALUES (7, 'author@example.com')")
            .await
            .unwrap();

        let mut a = article("Authored article", vec![], vec![news]);
        a.author_id = Some(7);
        let id = storage.create_article(&mut a).await.unwrap();
        assert_eq!(storage.articles_by_author(7).await.unwrap().len(), 1);

        db.execute_raw("DELETE FROM app_user WHERE id = 7").await.unwrap();
        let loaded = storage.get_article(id).await.unwrap().unwrap();
        assert_eq!(loaded.author_id, None);
    }

    #[tokio::test]
    async fn test_publication_and_stats() {
        let db = setup_test_db().await;
        let storage = BlogStorage::new(&db);
        let news = category(&storage, "News").await;
        tag(&storage, "Rust").await;
        let now = Utc::now();

        let mut live = article("Live article", vec![], vec![news]);
        live.publish(now - Duration::hours(1));
        let mut scheduled = article("Scheduled article", vec![], vec![news]);
        scheduled.published_at = Some(now + Duration::days(1));
        let mut draft = article("Draft article", vec![], vec![news]);
        storage.create_article(&mut live).await.unwrap();
        storage.create_article(&mut scheduled).await.unwrap();
        storage.create_article(&mut draft).await.unwrap();

        let published = storage.list_published(now).await.unwrap();
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].title, "Live article");

        draft.publish(now);
        storage.update_article(&draft).await.unwrap();

        let stats = storage.dashboard_stats(now).await.unwrap();
        assert_eq!(
            stats,
            DashboardStats {
                articles: 3,
                published: 2,
                categories: 1,
                tags: 1,
            }
        );
        assert_eq!(storage.list_articles().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_check_associations() {
        let db = setup_test_db().await;
        let storage = BlogStorage::new(&db);
        let news = category(&storage, "News").await;

        let ok = ArticleInput {
            category_ids: vec![news],
            ..Default::default()
        };
        assert!(storage.check_associations(&ok).await.is_ok());

        let bad = ArticleInput {
            tag_ids: vec![42],
            category_ids: vec![news, 43],
            ..Default::default()
        };
        match storage.check_associations(&bad).await {
            Err(DatabaseError::Validation(errors)) => {
                assert_eq!(errors.get("tags"), ["Tag 42 does not exist."]);
                assert_eq!(errors.get("categories"), ["Category 43 does not exist."]);
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_category_and_tag_updates() {
        let db = setup_test_db().await;
        let storage = BlogStorage::new(&db);
        let id = category(&storage, "News").await;

        let mut stored = storage.get_category(id).await.unwrap().unwrap();
        stored.apply(CategoryInput {
            name: "World   News".to_string(),
            description: Some("Everything else".to_string()),
        });
        storage.update_category(&stored).await.unwrap();

        let categories = storage.list_categories().await.unwrap();
        assert_eq!(categories.len(), 1);
        assert_eq!(categories[0].name(), "World News");
        assert_eq!(categories[0].slug, "news");

        let tag_id = tag(&storage, "rust").await;
        let mut stored = storage.get_tag(tag_id).await.unwrap().unwrap();
        stored.apply(TagInput {
            name: "Rust".to_string(),
        });
        storage.update_tag(&stored).await.unwrap();
        assert_eq!(storage.list_tags().await.unwrap()[0].name(), "Rust");
        assert!(storage.delete_category(id).await.unwrap());
        assert!(storage.get_category(id).await.unwrap().is_none());
    }
}
