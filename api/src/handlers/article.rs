//! Article back office.

use axum::{
    extract::{Path, State},
    response::Response,
    Extension, Json,
};
use chrono::Utc;
use content::Article;
use tower_sessions::Session;
use tracing::info;

use super::{check_form_token, csrf_token, flash_redirect, take_flashes, token_is_valid, INVALID_CSRF_TOKEN};
use crate::error::{ApiError, ApiResult};
use crate::middleware_hooks::CurrentUser;
use crate::models::{
    ArticleForm, ArticleFormPage, ArticleView, CategoryView, IndexPage, TagView, TokenForm,
};
use crate::AppState;

const INDEX_PATH: &str = "/admin/article";
const FORM_INTENTION: &str = "article";

async fn find(state: &AppState, id: i64) -> ApiResult<Article> {
    state
        .storage()
        .get_article(id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Article".to_string()))
}

async fn form_page(
    state: &AppState,
    session: &Session,
    article: Option<&Article>,
) -> ApiResult<ArticleFormPage> {
    let storage = state.storage();
    let now = Utc::now();
    Ok(ArticleFormPage {
        article: article.map(|a| ArticleView::new(a, now)),
        categories: storage.list_categories().await?.iter().map(CategoryView::from).collect(),
        tags: storage.list_tags().await?.iter().map(TagView::from).collect(),
        csrf_token: csrf_token(state, session, FORM_INTENTION).await?,
    })
}

/// All articles, most recently updated first
#[utoipa::path(
    get,
    path = "/admin/article",
    responses(
        (status = 200, description = "Articles and pending flashes"),
        (status = 403, description = "Not an administrator")
    ),
    tag = "admin"
)]
pub async fn index(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
) -> ApiResult<Json<IndexPage<ArticleView>>> {
    let now = Utc::now();
    let mut articles = state.storage().list_articles().await?;
    articles.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
    let items = articles.iter().map(|a| ArticleView::new(a, now)).collect();
    Ok(Json(IndexPage::new(items, take_flashes(&state, &session).await?)))
}

#[utoipa::path(
    get,
    path = "/admin/article/{id}",
    params(("id" = i64, Path, description = "Article id")),
    responses(
        (status = 200, description = "Article", body = ArticleView),
        (status = 404, description = "Article not found")
    ),
    tag = "admin"
)]
pub async fn show(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<ArticleView>> {
    let article = find(&state, id).await?;
    Ok(Json(ArticleView::new(&article, Utc::now())))
}

pub async fn new_form(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
) -> ApiResult<Json<ArticleFormPage>> {
    Ok(Json(form_page(&state, &session, None).await?))
}

/// Create an article authored by the current user
pub async fn create(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    current: CurrentUser,
    Json(form): Json<ArticleForm>,
) -> ApiResult<Response> {
    check_form_token(&state, &session, FORM_INTENTION, form.token.as_deref()).await?;
    form.input.validate()?;

    let storage = state.storage();
    storage.check_associations(&form.input).await?;
    let mut article = Article::new(form.input, current.user.id, Utc::now());
    let id = storage.create_article(&mut article).await?;
    info!("Article {} created by {}", id, current.user);

    flash_redirect(&state, &session, "success", "Article created successfully!", INDEX_PATH).await
}

pub async fn edit_form(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(id): Path<i64>,
) -> ApiResult<Json<ArticleFormPage>> {
    let article = find(&state, id).await?;
    Ok(Json(form_page(&state, &session, Some(&article)).await?))
}

pub async fn update(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(id): Path<i64>,
    Json(form): Json<ArticleForm>,
) -> ApiResult<Response> {
    let mut article = find(&state, id).await?;
    check_form_token(&state, &session, FORM_INTENTION, form.token.as_deref()).await?;
    form.input.validate()?;

    let storage = state.storage();
    storage.check_associations(&form.input).await?;
    article.apply(form.input, Utc::now());
    storage.update_article(&article).await?;
    info!("Article {} updated", id);

    flash_redirect(&state, &session, "success", "Article updated successfully!", INDEX_PATH).await
}

pub async fn delete(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(id): Path<i64>,
    Json(form): Json<TokenForm>,
) -> ApiResult<Response> {
    let article = find(&state, id).await?;
    if !token_is_valid(&state, &session, &format!("delete{}", id), form.token.as_deref()).await? {
        return flash_redirect(&state, &session, "danger", INVALID_CSRF_TOKEN, INDEX_PATH).await;
    }

    state.storage().delete_article(id).await?;
    info!("Article {} ({}) deleted", id, article);
    flash_redirect(&state, &session, "success", "Article deleted successfully!", INDEX_PATH).await
}

pub async fn publish(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(id): Path<i64>,
    Json(form): Json<TokenForm>,
) -> ApiResult<Response> {
    let mut article = find(&state, id).await?;
    if !token_is_valid(&state, &session, &format!("publish{}", id), form.token.as_deref()).await? {
        return flash_redirect(&state, &session, "danger", INVALID_CSRF_TOKEN, INDEX_PATH).await;
    }

    let now = Utc::now();
    if article.is_published(now) {
        return flash_redirect(&state, &session, "notice", "The article is already published.", INDEX_PATH).await;
    }
    article.publish(now);
    state.storage().update_article(&article).await?;
    info!("Article {} published", id);
    flash_redirect(&state, &session, "success", "Article published successfully!", INDEX_PATH).await
}

pub async fn unpublish(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(id): Path<i64>,
    Json(form): Json<TokenForm>,
) -> ApiResult<Response> {
    let mut article = find(&state, id).await?;
    if !token_is_valid(&state, &session, &format!("unpublish{}", id), form.token.as_deref()).await? {
        return flash_redirect(&state, &session, "danger", INVALID_CSRF_TOKEN, INDEX_PATH).await;
    }

    if !article.is_published(Utc::now()) {
        return flash_redirect(&state, &session, "notice", "The article is not published.", INDEX_PATH).await;
    }
    article.unpublish();
    state.storage().update_article(&article).await?;
    info!("Article {} unpublished", id);
    flash_redirect(&state, &session, "success", "Article unpublished successfully!", INDEX_PATH).await
}
