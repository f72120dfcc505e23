use authz::RoleChoices;
use chrono::{DateTime, Utc};
use content::{Article, ArticleInput, Category, CategoryInput, Tag, TagInput};
use database::DashboardStats;
use serde::{Deserialize, Serialize};
use user::{Flash, User};
use utoipa::ToSchema;

/// Account as shown to clients. Never carries the password hash.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserView {
    pub id: Option<i64>,
    pub email: String,
    pub username: String,
    pub roles: Vec<String>,
}

impl From<&User> for UserView {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email().to_string(),
            username: user.username.clone(),
            roles: user.role_tokens().into_iter().map(str::to_string).collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ArticleView {
    pub id: Option<i64>,
    pub title: String,
    pub summary: Option<String>,
    pub content: String,
    pub slug: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub published_at: Option<DateTime<Utc>>,
    pub published: bool,
    pub author_id: Option<i64>,
    pub tag_ids: Vec<i64>,
    pub category_ids: Vec<i64>,
}

impl ArticleView {
    pub fn new(article: &Article, now: DateTime<Utc>) -> Self {
        Self {
            id: article.id,
            title: article.title.clone(),
            summary: article.summary.clone(),
            content: article.content.clone(),
            slug: article.slug.clone(),
            created_at: article.created_at,
            updated_at: article.updated_at,
            published_at: article.published_at,
            published: article.is_published(now),
            author_id: article.author_id,
            tag_ids: article.tag_ids.clone(),
            category_ids: article.category_ids.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CategoryView {
    pub id: Option<i64>,
    pub name: String,
    pub description: Option<String>,
    pub slug: String,
}

impl From<&Category> for CategoryView {
    fn from(category: &Category) -> Self {
        Self {
            id: category.id,
            name: category.name().to_string(),
            description: category.description.clone(),
            slug: category.slug.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TagView {
    pub id: Option<i64>,
    pub name: String,
    pub slug: String,
}

impl From<&Tag> for TagView {
    fn from(tag: &Tag) -> Self {
        Self {
            id: tag.id,
            name: tag.name().to_string(),
            slug: tag.slug.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct FlashView {
    pub kind: String,
    pub message: String,
}

impl From<Flash> for FlashView {
    fn from(flash: Flash) -> Self {
        Self {
            kind: flash.kind,
            message: flash.message,
        }
    }
}

// ---- security ----

/// Login form as posted by the browser
#[derive(Deserialize, ToSchema)]
pub struct LoginForm {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(rename = "_csrf_token", default)]
    pub csrf_token: Option<String>,
    #[serde(rename = "_remember_me", default)]
    pub remember_me: Option<String>,
}

impl LoginForm {
    /// Checkbox semantics: any of `on`, `1`, `true`, `yes`
    pub fn wants_remember_me(&self) -> bool {
        matches!(
            self.remember_me.as_deref().map(str::to_ascii_lowercase).as_deref(),
            Some("on" | "1" | "true" | "yes")
        )
    }
}

#[derive(Deserialize, ToSchema)]
pub struct LogoutForm {
    #[serde(rename = "_csrf_token", default)]
    pub csrf_token: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct LoginPage {
    pub csrf_token: String,
    pub last_username: Option<String>,
    pub flashes: Vec<FlashView>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CsrfTokenResponse {
    pub intention: String,
    pub token: String,
}

// ---- pages ----

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HomePage {
    pub user: Option<UserView>,
    pub articles: Vec<ArticleView>,
    pub flashes: Vec<FlashView>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AuthorPage {
    pub user: UserView,
    pub impersonator_id: Option<i64>,
    pub articles: Vec<ArticleView>,
    pub flashes: Vec<FlashView>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DashboardPage {
    pub user: UserView,
    pub articles: i64,
    pub published: i64,
    pub categories: i64,
    pub tags: i64,
    pub users: i64,
    pub flashes: Vec<FlashView>,
}

impl DashboardPage {
    pub fn new(user: UserView, stats: DashboardStats, users: i64, flashes: Vec<FlashView>) -> Self {
        Self {
            user,
            articles: stats.articles,
            published: stats.published,
            categories: stats.categories,
            tags: stats.tags,
            users,
            flashes,
        }
    }
}

/// Any listing page
#[derive(Debug, Serialize, Deserialize)]
pub struct IndexPage<T> {
    pub items: Vec<T>,
    pub total: usize,
    pub flashes: Vec<FlashView>,
}

impl<T> IndexPage<T> {
    pub fn new(items: Vec<T>, flashes: Vec<FlashView>) -> Self {
        Self {
            total: items.len(),
            items,
            flashes,
        }
    }
}

// ---- forms ----

/// Token-only payload of delete/publish/unpublish requests
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct TokenForm {
    #[serde(rename = "_token", default)]
    pub token: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ArticleForm {
    #[serde(flatten)]
    pub input: ArticleInput,
    #[serde(rename = "_token", default)]
    pub token: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ArticleFormPage {
    pub article: Option<ArticleView>,
    pub categories: Vec<CategoryView>,
    pub tags: Vec<TagView>,
    pub csrf_token: String,
}

#[derive(Debug, Deserialize)]
pub struct CategoryForm {
    #[serde(flatten)]
    pub input: CategoryInput,
    #[serde(rename = "_token", default)]
    pub token: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CategoryFormPage {
    pub category: Option<CategoryView>,
    pub csrf_token: String,
}

#[derive(Debug, Deserialize)]
pub struct TagForm {
    #[serde(flatten)]
    pub input: TagInput,
    #[serde(rename = "_token", default)]
    pub token: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TagFormPage {
    pub tag: Option<TagView>,
    pub csrf_token: String,
}

/// User form. `roles: None` keeps the current roles.
#[derive(Debug, Deserialize, ToSchema)]
pub struct UserForm {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub password_confirmation: Option<String>,
    #[serde(default)]
    pub roles: Option<Vec<String>>,
    #[serde(rename = "_token", default)]
    pub token: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct UserFormPage {
    pub user: Option<UserView>,
    pub roles: RoleChoices,
    pub csrf_token: String,
}

/// Health check response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: DateTime<Utc>,
    pub database: DatabaseHealth,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DatabaseHealth {
    pub connected: bool,
    pub message: String,
}

/// Turn drained session flashes into views
pub fn flash_views(flashes: Vec<Flash>) -> Vec<FlashView> {
    flashes.into_iter().map(FlashView::from).collect()
}
