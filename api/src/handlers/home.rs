use axum::{extract::State, Extension, Json};
use chrono::Utc;
use tower_sessions::Session;
use ::user::AuthState;

use super::take_flashes;
use crate::error::ApiResult;
use crate::models::{ArticleView, HomePage, UserView};
use crate::AppState;

/// Public home page with the published articles
#[utoipa::path(
    get,
    path = "/",
    responses(
        (status = 200, description = "Published articles", body = HomePage)
    ),
    tag = "pages"
)]
pub async fn home(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Extension(auth): Extension<AuthState>,
) -> ApiResult<Json<HomePage>> {
    let now = Utc::now();
    let articles = state
        .storage()
        .list_published(now)
        .await?
        .iter()
        .map(|article| ArticleView::new(article, now))
        .collect();

    Ok(Json(HomePage {
        user: auth.user().map(UserView::from),
        articles,
        flashes: take_flashes(&state, &session).await?,
    }))
}
