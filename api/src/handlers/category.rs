//! Category back office.

use axum::{
    extract::{Path, State},
    response::Response,
    Extension, Json,
};
use content::Category;
use tower_sessions::Session;
use tracing::info;

use super::{check_form_token, csrf_token, flash_redirect, take_flashes, token_is_valid, INVALID_CSRF_TOKEN};
use crate::error::{ApiError, ApiResult};
use crate::models::{CategoryForm, CategoryFormPage, CategoryView, IndexPage, TokenForm};
use crate::AppState;

const INDEX_PATH: &str = "/admin/category";
const FORM_INTENTION: &str = "category";

async fn find(state: &AppState, id: i64) -> ApiResult<Category> {
    state
        .storage()
        .get_category(id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Category".to_string()))
}

/// All categories by name
#[utoipa::path(
    get,
    path = "/admin/category",
    responses(
        (status = 200, description = "Categories and pending flashes"),
        (status = 403, description = "Not an administrator")
    ),
    tag = "admin"
)]
pub async fn index(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
) -> ApiResult<Json<IndexPage<CategoryView>>> {
    let categories = state.storage().list_categories().await?;
    let items = categories.iter().map(CategoryView::from).collect();
    Ok(Json(IndexPage::new(items, take_flashes(&state, &session).await?)))
}

pub async fn new_form(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
) -> ApiResult<Json<CategoryFormPage>> {
    Ok(Json(CategoryFormPage {
        category: None,
        csrf_token: csrf_token(&state, &session, FORM_INTENTION).await?,
    }))
}

pub async fn create(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Json(form): Json<CategoryForm>,
) -> ApiResult<Response> {
    check_form_token(&state, &session, FORM_INTENTION, form.token.as_deref()).await?;
    form.input.validate()?;

    let mut category = Category::new(form.input);
    let id = state.storage().create_category(&mut category).await?;
    info!("Category {} ({}) created", id, category);

    flash_redirect(&state, &session, "success", "Category created successfully!", INDEX_PATH).await
}

pub async fn edit_form(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(id): Path<i64>,
) -> ApiResult<Json<CategoryFormPage>> {
    let category = find(&state, id).await?;
    Ok(Json(CategoryFormPage {
        category: Some(CategoryView::from(&category)),
        csrf_token: csrf_token(&state, &session, FORM_INTENTION).await?,
    }))
}

pub async fn update(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(id): Path<i64>,
    Json(form): Json<CategoryForm>,
) -> ApiResult<Response> {
    let mut category = find(&state, id).await?;
    check_form_token(&state, &session, FORM_INTENTION, form.token.as_deref()).await?;
    form.input.validate()?;

    category.apply(form.input);
    state.storage().update_category(&category).await?;
    info!("Category {} updated", id);

    flash_redirect(&state, &session, "success", "Category updated successfully!", INDEX_PATH).await
}

pub async fn delete(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(id): Path<i64>,
    Json(form): Json<TokenForm>,
) -> ApiResult<Response> {
    find(&state, id).await?;
    if !token_is_valid(&state, &session, &format!("delete{}", id), form.token.as_deref()).await? {
        return flash_redirect(&state, &session, "danger", INVALID_CSRF_TOKEN, INDEX_PATH).await;
    }

    state.storage().delete_category(id).await?;
    info!("Category {} deleted", id);
    flash_redirect(&state, &session, "success", "Category deleted successfully!", INDEX_PATH).await
}
