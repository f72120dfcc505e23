//! HTTP surface of Inklog: login/logout, the author page, the admin back
//! office and the firewall that guards them.

use axum::{
    middleware,
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use authz::{AccessDecisionEngine, PostAuthenticationRouter};
use database::{BlogStorage, Database};
use user::password::CredentialHasher;
use user::{SessionConfig, UserManager};

pub mod error;
pub mod handlers;
pub mod middleware_hooks;
pub mod models;
pub mod server;

#[cfg(test)]
mod middleware_hooks_tests;

// Re-export server functions for convenience
pub use server::{spawn_server, start_server, ApiConfig};

use crate::error::ApiResult;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Database>,
    pub users: Arc<UserManager>,
    pub engine: AccessDecisionEngine,
    pub router: PostAuthenticationRouter,
}

impl AppState {
    /// Build the state on `db`, running the account and blog migrations
    pub async fn new(
        db: Arc<Database>,
        session_config: SessionConfig,
        hasher: Arc<dyn CredentialHasher>,
    ) -> ApiResult<Self> {
        let users = UserManager::with_pool(db.pool().clone(), session_config, hasher).await?;
        database::create_blog_tables(&db).await?;

        Ok(Self {
            db,
            users: Arc::new(users),
            engine: AccessDecisionEngine::new(),
            router: PostAuthenticationRouter::default(),
        })
    }

    pub fn storage(&self) -> BlogStorage<'_> {
        BlogStorage::new(&self.db)
    }
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::security::login_page,
        handlers::security::login,
        handlers::security::logout,
        handlers::security::csrf_token,
        handlers::home::home,
        handlers::author::index,
        handlers::dashboard::dashboard,
        handlers::article::index,
        handlers::article::show,
        handlers::category::index,
        handlers::tag::index,
        handlers::user::index,
        handlers::user::delete,
        handlers::health::health_check,
    ),
    components(
        schemas(
            models::UserView,
            models::ArticleView,
            models::CategoryView,
            models::TagView,
            models::FlashView,
            models::LoginForm,
            models::LogoutForm,
            models::LoginPage,
            models::CsrfTokenResponse,
            models::HomePage,
            models::AuthorPage,
            models::DashboardPage,
            models::TokenForm,
            models::HealthResponse,
            models::DatabaseHealth,
            error::ApiErrorResponse,
            error::ErrorDetail,
        )
    ),
    tags(
        (name = "security", description = "Login, logout and CSRF tokens"),
        (name = "pages", description = "Public and author pages"),
        (name = "admin", description = "Back office"),
        (name = "health", description = "Health check endpoints"),
    ),
    info(
        title = "Inklog API",
        version = "1.0.0",
        description = "Blog back office and security endpoints",
    ),
)]
pub struct ApiDoc;

/// Create the application router with all routes and middleware
pub fn create_router(state: AppState) -> Router {
    let admin = Router::new()
        .route("/", get(handlers::dashboard::redirect_to_dashboard))
        .route("/dashboard", get(handlers::dashboard::dashboard))
        // Articles
        .route("/article", get(handlers::article::index))
        .route(
            "/article/new",
            get(handlers::article::new_form).post(handlers::article::create),
        )
        .route("/article/:id", get(handlers::article::show))
        .route(
            "/article/:id/edit",
            get(handlers::article::edit_form).post(handlers::article::update),
        )
        .route("/article/:id/delete", delete(handlers::article::delete))
        .route("/article/:id/publish", post(handlers::article::publish))
        .route("/article/:id/unpublish", post(handlers::article::unpublish))
        // Categories
        .route("/category", get(handlers::category::index))
        .route(
            "/category/new",
            get(handlers::category::new_form).post(handlers::category::create),
        )
        .route(
            "/category/:id/edit",
            get(handlers::category::edit_form).post(handlers::category::update),
        )
        .route("/category/:id/delete", delete(handlers::category::delete))
        // Tags
        .route("/tag", get(handlers::tag::index))
        .route(
            "/tag/new",
            get(handlers::tag::new_form).post(handlers::tag::create),
        )
        .route(
            "/tag/:id/edit",
            get(handlers::tag::edit_form).post(handlers::tag::update),
        )
        .route("/tag/:id/delete", delete(handlers::tag::delete))
        // Users
        .route("/user", get(handlers::user::index))
        .route(
            "/user/new",
            get(handlers::user::new_form).post(handlers::user::create),
        )
        .route(
            "/user/:id/edit",
            get(handlers::user::edit_form).post(handlers::user::update),
        )
        .route("/user/:id/delete", delete(handlers::user::delete));

    Router::new()
        .route("/", get(handlers::home::home))
        .route(
            "/login",
            get(handlers::security::login_page).post(handlers::security::login),
        )
        .route("/logout", post(handlers::security::logout))
        .route("/csrf/:intention", get(handlers::security::csrf_token))
        .route("/author", get(handlers::author::index))
        .route("/health", get(handlers::health::health_check))
        .nest("/admin", admin)
        .merge(SwaggerUi::new("/api/swagger").url("/api/openapi.json", ApiDoc::openapi()))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            middleware_hooks::firewall,
        ))
        .layer(state.users.session_layer())
        .layer(middleware::from_fn(middleware_hooks::response_middleware))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}
