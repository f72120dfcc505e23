//! Tag back office.

use axum::{
    extract::{Path, State},
    response::Response,
    Extension, Json,
};
use content::Tag;
use tower_sessions::Session;
use tracing::info;

use super::{check_form_token, csrf_token, flash_redirect, take_flashes, token_is_valid, INVALID_CSRF_TOKEN};
use crate::error::{ApiError, ApiResult};
use crate::models::{TagForm, TagFormPage, TagView, IndexPage, TokenForm};
use crate::AppState;

const INDEX_PATH: &str = "/admin/tag";
const FORM_INTENTION: &str = "tag";

async fn find(state: &AppState, id: i64) -> ApiResult<Tag> {
    state
        .storage()
        .get_tag(id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Tag".to_string()))
}

/// All tags by name
#[utoipa::path(
    get,
    path = "/admin/tag",
    responses(
        (status = 200, description = "Tags and pending flashes"),
        (status = 403, description = "Not an administrator")
    ),
    tag = "admin"
)]
pub async fn index(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
) -> ApiResult<Json<IndexPage<TagView>>> {
    let tags = state.storage().list_tags().await?;
    let items = tags.iter().map(TagView::from).collect();
    Ok(Json(IndexPage::new(items, take_flashes(&state, &session).await?)))
}

pub async fn new_form(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
) -> ApiResult<Json<TagFormPage>> {
    Ok(Json(TagFormPage {
        tag: None,
        csrf_token: csrf_token(&state, &session, FORM_INTENTION).await?,
    }))
}

pub async fn create(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Json(form): Json<TagForm>,
) -> ApiResult<Response> {
    check_form_token(&state, &session, FORM_INTENTION, form.token.as_deref()).await?;
    form.input.validate()?;

    let mut tag = Tag::new(form.input);
    let id = state.storage().create_tag(&mut tag).await?;
    info!("Tag {} ({}) created", id, tag);

    flash_redirect(&state, &session, "success", "Tag created successfully!", INDEX_PATH).await
}

pub async fn edit_form(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(id): Path<i64>,
) -> ApiResult<Json<TagFormPage>> {
    let tag = find(&state, id).await?;
    Ok(Json(TagFormPage {
        tag: Some(TagView::from(&tag)),
        csrf_token: csrf_token(&state, &session, FORM_INTENTION).await?,
    }))
}

pub async fn update(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(id): Path<i64>,
    Json(form): Json<TagForm>,
) -> ApiResult<Response> {
    let mut tag = find(&state, id).await?;
    check_form_token(&state, &session, FORM_INTENTION, form.token.as_deref()).await?;
    form.input.validate()?;

    tag.apply(form.input);
    state.storage().update_tag(&tag).await?;
    info!("Tag {} updated", id);

    flash_redirect(&state, &session, "success", "Tag updated successfully!", INDEX_PATH).await
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

    state.storage().delete_tag(id).await?;
    info!("Tag {} deleted", id);
    flash_redirect(&state, &session, "success", "Tag deleted successfully!", INDEX_PATH).await
}
