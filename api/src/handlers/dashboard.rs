use axum::{extract::State, response::Redirect, Extension, Json};
use chrono::Utc;
use tower_sessions::Session;

use super::take_flashes;
use crate::error::ApiResult;
use crate::middleware_hooks::CurrentUser;
use crate::models::{DashboardPage, UserView};
use crate::AppState;

pub async fn redirect_to_dashboard() -> Redirect {
    Redirect::to("/admin/dashboard")
}

/// Back office dashboard with content counters
#[utoipa::path(
    get,
    path = "/admin/dashboard",
    responses(
        (status = 200, description = "Dashboard counters", body = DashboardPage),
        (status = 403, description = "Not an administrator")
    ),
    tag = "admin"
)]
pub async fn dashboard(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    current: CurrentUser,
) -> ApiResult<Json<DashboardPage>> {
    let stats = state.storage().dashboard_stats(Utc::now()).await?;
    let users = state.users.database().count().await?;

    Ok(Json(DashboardPage::new(
        UserView::from(&current.user),
        stats,
        users,
        take_flashes(&state, &session).await?,
    )))
}
