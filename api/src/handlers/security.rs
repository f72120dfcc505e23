//! Login, logout and CSRF token endpoints.

use axum::{
    extract::{Path, State},
    http::HeaderMap,
    response::{IntoResponse, Redirect, Response},
    Extension, Form, Json,
};
use axum_login::AuthnBackend;
use tower_sessions::Session;
use tracing::{info, warn};
use ::user::{AuthLevel, Credentials};

use super::{flash_redirect, take_flashes, INVALID_CSRF_TOKEN};
use crate::error::{ApiError, ApiResult};
use crate::middleware_hooks::{
    clear_remember_me_cookie, cookie_value, remember_me_cookie, with_cookie, LOGIN_PATH,
};
use crate::models::{CsrfTokenResponse, LoginForm, LoginPage, LogoutForm};
use crate::AppState;

pub const AUTHENTICATE_INTENTION: &str = "authenticate";
pub const LOGOUT_INTENTION: &str = "logout";
pub const LAST_USERNAME_KEY: &str = "_security.last_username";
pub const INVALID_CREDENTIALS: &str = "Invalid credentials.";

/// Login page
#[utoipa::path(
    get,
    path = "/login",
    responses(
        (status = 200, description = "CSRF token and last submitted username", body = LoginPage)
    ),
    tag = "security"
)]
pub async fn login_page(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
) -> ApiResult<Json<LoginPage>> {
    let csrf_token = super::csrf_token(&state, &session, AUTHENTICATE_INTENTION).await?;
    let last_username: Option<String> = session.get(LAST_USERNAME_KEY).await?;
    let flashes = take_flashes(&state, &session).await?;

    Ok(Json(LoginPage {
        csrf_token,
        last_username,
        flashes,
    }))
}

/// Form login
///
/// Redirects to the stored target path, else to the landing page of the
/// highest role. Failures redirect back to the login page with a flash.
#[utoipa::path(
    post,
    path = "/login",
    request_body(content = LoginForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 303, description = "Redirect after the login attempt")
    ),
    tag = "security"
)]
pub async fn login(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Form(form): Form<LoginForm>,
) -> ApiResult<Response> {
    let manager = state.users.session_manager();

    let token_valid = manager
        .is_csrf_token_valid(&session, AUTHENTICATE_INTENTION, form.csrf_token.as_deref())
        .await?;
    if !token_valid {
        return flash_redirect(&state, &session, "danger", INVALID_CSRF_TOKEN, LOGIN_PATH).await;
    }

    session.insert(LAST_USERNAME_KEY, &form.email).await?;
    let remember = form.wants_remember_me();
    let credentials = Credentials {
        email: form.email,
        password: form.password,
    };
    let Some(user) = state.users.auth_backend().authenticate(credentials).await? else {
        return flash_redirect(&state, &session, "danger", INVALID_CREDENTIALS, LOGIN_PATH).await;
    };

    manager.login(&session, &user, AuthLevel::Full).await?;
    session.remove::<String>(LAST_USERNAME_KEY).await?;

    let mut cookie = None;
    if remember {
        let issued = state.users.remember_me().issue(&user).await?;
        cookie = remember_me_cookie(manager.config(), &issued.encode());
    }

    let target = state
        .router
        .route_after_login(&manager.target_paths(&session), |role| {
            user.roles.grants(role)
        })
        .await?;
    info!("User {} logged in, redirecting to {}", user, target);

    Ok(with_cookie(Redirect::to(target.path()).into_response(), cookie))
}

/// Logout
///
/// Only POST with a valid token logs out; the route answers 405 to GET.
#[utoipa::path(
    post,
    path = "/logout",
    request_body(content = LogoutForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 303, description = "Logged out, redirect to the home page"),
        (status = 403, description = "Invalid CSRF token")
    ),
    tag = "security"
)]
pub async fn logout(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    headers: HeaderMap,
    Form(form): Form<LogoutForm>,
) -> ApiResult<Response> {
    let manager = state.users.session_manager();
    let token_valid = manager
        .is_csrf_token_valid(&session, LOGOUT_INTENTION, form.csrf_token.as_deref())
        .await?;
    if !token_valid {
        warn!("Logout rejected: invalid CSRF token");
        return Err(ApiError::Forbidden(INVALID_CSRF_TOKEN.to_string()));
    }

    let config = manager.config();
    if let Some(value) = cookie_value(&headers, &config.remember_me_cookie) {
        state.users.remember_me().forget(&value).await?;
    }
    manager.logout(&session).await?;

    Ok(with_cookie(
        Redirect::to("/").into_response(),
        clear_remember_me_cookie(config),
    ))
}

/// CSRF token for a form intention
#[utoipa::path(
    get,
    path = "/csrf/{intention}",
    params(
        ("intention" = String, Path, description = "Form intention, e.g. `logout` or `delete12`")
    ),
    responses(
        (status = 200, description = "Token bound to the session", body = CsrfTokenResponse)
    ),
    tag = "security"
)]
pub async fn csrf_token(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(intention): Path<String>,
) -> ApiResult<Json<CsrfTokenResponse>> {
    let token = super::csrf_token(&state, &session, &intention).await?;
    Ok(Json(CsrfTokenResponse { intention, token }))
}
