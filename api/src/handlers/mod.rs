//! HTTP handlers, one module per area of the site.

pub mod article;
pub mod author;
pub mod category;
pub mod dashboard;
pub mod health;
pub mod home;
pub mod security;
pub mod tag;
pub mod user;

use axum::response::{IntoResponse, Redirect, Response};
use tower_sessions::Session;
use ::user::Flash;

use crate::error::{ApiError, ApiResult};
use crate::models::{flash_views, FlashView};
use crate::AppState;

pub const INVALID_CSRF_TOKEN: &str = "Invalid CSRF token.";

/// Reject a form submission whose `_token` does not match `intention`
pub(crate) async fn check_form_token(
    state: &AppState,
    session: &Session,
    intention: &str,
    token: Option<&str>,
) -> ApiResult<()> {
    let valid = state
        .users
        .session_manager()
        .is_csrf_token_valid(session, intention, token)
        .await?;
    if valid {
        Ok(())
    } else {
        Err(ApiError::field("_token", INVALID_CSRF_TOKEN))
    }
}

/// Whether `token` matches `intention`; used by actions that answer with a flash
pub(crate) async fn token_is_valid(
    state: &AppState,
    session: &Session,
    intention: &str,
    token: Option<&str>,
) -> ApiResult<bool> {
    Ok(state
        .users
        .session_manager()
        .is_csrf_token_valid(session, intention, token)
        .await?)
}

pub(crate) async fn csrf_token(
    state: &AppState,
    session: &Session,
    intention: &str,
) -> ApiResult<String> {
    Ok(state
        .users
        .session_manager()
        .csrf_token(session, intention)
        .await?)
}

/// Queue a flash message and redirect to `to`
pub(crate) async fn flash_redirect(
    state: &AppState,
    session: &Session,
    kind: &str,
    message: &str,
    to: &str,
) -> ApiResult<Response> {
    state
        .users
        .session_manager()
        .add_flash(session, Flash::new(kind, message))
        .await?;
    Ok(Redirect::to(to).into_response())
}

/// Drain the pending flash messages
pub(crate) async fn take_flashes(state: &AppState, session: &Session) -> ApiResult<Vec<FlashView>> {
    let flashes = state.users.session_manager().take_flashes(session).await?;
    Ok(flash_views(flashes))
}
