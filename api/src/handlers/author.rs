use axum::{extract::State, Extension, Json};
use chrono::Utc;
use tower_sessions::Session;

use super::take_flashes;
use crate::error::ApiResult;
use crate::middleware_hooks::CurrentUser;
use crate::models::{ArticleView, AuthorPage, UserView};
use crate::AppState;

/// Author home: the signed-in account and its articles
#[utoipa::path(
    get,
    path = "/author",
    responses(
        (status = 200, description = "Author page", body = AuthorPage),
        (status = 303, description = "Not signed in, redirect to the login page")
    ),
    tag = "pages"
)]
pub async fn index(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    current: CurrentUser,
) -> ApiResult<Json<AuthorPage>> {
    let now = Utc::now();
    let articles = match current.user.id {
        Some(id) => state.storage().articles_by_author(id).await?,
        None => Vec::new(),
    };

    Ok(Json(AuthorPage {
        user: UserView::from(&current.user),
        impersonator_id: current.token.impersonator_id,
        articles: articles
            .iter()
            .map(|article| ArticleView::new(article, now))
            .collect(),
        flashes: take_flashes(&state, &session).await?,
    }))
}
