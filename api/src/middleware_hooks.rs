//! Request middleware: the security firewall and response post-processing.
//!
//! The firewall resolves who is making the request (session token, then the
//! remember-me cookie), handles `?_switch_user=`, enforces the access rules
//! and hands the resolved [`AuthState`] to handlers through the request
//! extensions.

use authz::{Role, TargetPathStore};
use axum::{
    async_trait,
    body::Body,
    extract::{FromRequestParts, Query, State},
    http::{header, request::Parts, HeaderMap, HeaderValue, Method, Request, Uri},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use std::collections::HashMap;
use std::time::Instant;
use tower_sessions::cookie::{time::Duration, Cookie, SameSite};
use tower_sessions::Session;
use tracing::{debug, info, warn};
use user::{AuthLevel, AuthState, SessionConfig, SessionToken, User, UserRepository};

use crate::error::{ApiError, ApiResult};
use crate::AppState;

pub const LOGIN_PATH: &str = "/login";
pub const SWITCH_USER_PARAM: &str = "_switch_user";
pub const EXIT_SWITCH_USER: &str = "_exit";

/// What a path requires from the requester
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessRule {
    Public,
    /// The baseline role; a remember-me login is enough.
    Authenticated,
    /// ROLE_ADMIN and a login in this session.
    AdminFullyAuthenticated,
}

impl AccessRule {
    /// First matching prefix wins
    pub fn for_path(path: &str) -> Self {
        if path.starts_with("/admin") {
            AccessRule::AdminFullyAuthenticated
        } else if path.starts_with("/author") {
            AccessRule::Authenticated
        } else {
            AccessRule::Public
        }
    }

    pub fn allows(&self, auth: &AuthState) -> bool {
        match self {
            AccessRule::Public => true,
            AccessRule::Authenticated => auth.user().is_some_and(|u| u.roles.grants(Role::User)),
            AccessRule::AdminFullyAuthenticated => {
                auth.is_fully_authenticated()
                    && auth.user().is_some_and(|u| u.roles.grants(Role::Admin))
            }
        }
    }
}

/// Security firewall
///
/// Denials for anonymous or remember-me requests start a login (GET requests
/// remember where they were going); denials for fully authenticated users
/// are a 403.
pub async fn firewall(
    State(state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> ApiResult<Response> {
    let session = request
        .extensions()
        .get::<Session>()
        .cloned()
        .ok_or_else(|| ApiError::InternalError("Session layer is not installed".to_string()))?;
    let manager = state.users.session_manager();
    let config = manager.config();

    let mut token = manager.current_token(&session).await?;
    let mut set_cookie = None;

    if token.is_none() {
        if let Some(value) = cookie_value(request.headers(), &config.remember_me_cookie) {
            match remember_me_login(&state, &session, &value).await? {
                Some((remembered, rotated)) => {
                    token = Some(remembered);
                    set_cookie = rotated.and_then(|value| remember_me_cookie(config, &value));
                }
                None => set_cookie = clear_remember_me_cookie(config),
            }
        }
    }

    let mut auth = state.users.auth_backend().load_state(token).await?;
    if let AuthState::Authenticated { user, .. } = &auth {
        if !manager.auth_hash_matches(&session, user).await? {
            warn!("Password of user {} changed; ending session", user);
            manager.logout(&session).await?;
            if let Some(value) = cookie_value(request.headers(), &config.remember_me_cookie) {
                state.users.remember_me().forget(&value).await?;
                set_cookie = clear_remember_me_cookie(config);
            }
            auth = AuthState::Anonymous;
        }
    }

    // The request body is not Sync; only owned parts are held across awaits.
    let method = request.method().clone();
    let uri = request.uri().clone();

    if let Some(target) = switch_user_param(&uri) {
        let response = switch_user(&state, &session, &auth, &target, &method, &uri).await?;
        return Ok(with_cookie(response, set_cookie));
    }

    let rule = AccessRule::for_path(uri.path());
    if !rule.allows(&auth) {
        if !auth.is_fully_authenticated() {
            let response = start_authentication(&state, &session, &method, &uri).await?;
            return Ok(with_cookie(response, set_cookie));
        }
        warn!(
            "Access denied to {} for {}",
            uri.path(),
            auth.user().map(User::identifier).unwrap_or_default()
        );
        return Err(ApiError::forbidden());
    }

    request.extensions_mut().insert(auth);
    let response = next.run(request).await;
    Ok(with_cookie(response, set_cookie))
}

/// Log in from a remember-me cookie. Returns the token and, when the token
/// was rotated, the new cookie value.
async fn remember_me_login(
    state: &AppState,
    session: &Session,
    value: &str,
) -> ApiResult<Option<(SessionToken, Option<String>)>> {
    let Some(login) = state.users.remember_me().consume(value).await? else {
        return Ok(None);
    };
    let manager = state.users.session_manager();
    let token = manager
        .login(session, &login.user, AuthLevel::Remembered)
        .await?;
    info!("User {} authenticated from remember-me cookie", login.user);
    Ok(Some((token, login.cookie.map(|cookie| cookie.encode()))))
}

/// Redirect to the login page, remembering the requested URI for GET requests
async fn start_authentication(
    state: &AppState,
    session: &Session,
    method: &Method,
    uri: &Uri,
) -> ApiResult<Response> {
    if method == Method::GET {
        let target = uri.path_and_query().map(|pq| pq.as_str()).unwrap_or("/");
        let store = state.users.session_manager().target_paths(session);
        store.save_target_path(state.router.realm(), target).await?;
    }
    debug!("Authentication required for {}", uri);
    Ok(Redirect::to(LOGIN_PATH).into_response())
}

/// Whether `actor` may act as `target`. Nobody impersonates an account
/// ranked above their own.
pub fn may_impersonate(actor: &User, target: &User) -> bool {
    actor.roles.grants(Role::Admin) && actor.roles.highest() >= target.roles.highest()
}

async fn switch_user(
    state: &AppState,
    session: &Session,
    auth: &AuthState,
    target: &str,
    method: &Method,
    uri: &Uri,
) -> ApiResult<Response> {
    let AuthState::Authenticated { user, token } = auth else {
        return start_authentication(state, session, method, uri).await;
    };
    let manager = state.users.session_manager();
    let back = Redirect::to(&strip_switch_user(uri)).into_response();

    if target == EXIT_SWITCH_USER {
        if let Some(restored) = manager.exit_impersonation(session, token).await? {
            if let Some(original) = state.users.database().find_by_id(restored.user_id).await? {
                manager.bind_auth_hash(session, &original).await?;
            }
        }
        return Ok(back);
    }

    if !user.roles.grants(Role::Admin) {
        warn!("User {} may not switch user", user);
        return Err(ApiError::forbidden());
    }
    if token.is_impersonating() {
        warn!("User {} is already impersonating", user);
        return Err(ApiError::Forbidden(
            "You are already switched to another user.".to_string(),
        ));
    }
    let Some(impersonated) = state.users.database().find_by_email(target).await? else {
        warn!("Switch user target {} does not exist", target);
        return Err(ApiError::forbidden());
    };
    if !may_impersonate(user, &impersonated) {
        warn!(
            "User {} may not switch to higher-ranked user {}",
            user, impersonated
        );
        return Err(ApiError::forbidden());
    }

    manager
        .start_impersonation(session, token, &impersonated)
        .await?;
    Ok(back)
}

/// Value of `?_switch_user=`, if present and non-empty
pub fn switch_user_param(uri: &Uri) -> Option<String> {
    let Query(params) = Query::<HashMap<String, String>>::try_from_uri(uri).ok()?;
    params
        .get(SWITCH_USER_PARAM)
        .filter(|value| !value.is_empty())
        .cloned()
}

/// The request path and query without the `_switch_user` parameter
pub fn strip_switch_user(uri: &Uri) -> String {
    let kept: Vec<&str> = uri
        .query()
        .unwrap_or_default()
        .split('&')
        .filter(|pair| !pair.is_empty() && pair.split('=').next() != Some(SWITCH_USER_PARAM))
        .collect();
    if kept.is_empty() {
        uri.path().to_string()
    } else {
        format!("{}?{}", uri.path(), kept.join("&"))
    }
}

/// Value of the cookie `name` in the request headers
pub fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    for value in headers.get_all(header::COOKIE) {
        let Ok(raw) = value.to_str() else {
            continue;
        };
        for cookie in Cookie::split_parse(raw).flatten() {
            if cookie.name() == name {
                return Some(cookie.value().to_string());
            }
        }
    }
    None
}

pub fn remember_me_cookie(config: &SessionConfig, value: &str) -> Option<HeaderValue> {
    let cookie = Cookie::build((config.remember_me_cookie.clone(), value.to_string()))
        .path("/")
        .http_only(true)
        .secure(config.secure)
        .same_site(SameSite::from(config.same_site))
        .max_age(Duration::seconds(config.remember_me_lifetime_seconds))
        .build();
    HeaderValue::from_str(&cookie.to_string()).ok()
}

pub fn clear_remember_me_cookie(config: &SessionConfig) -> Option<HeaderValue> {
    let cookie = Cookie::build((config.remember_me_cookie.clone(), String::new()))
        .path("/")
        .max_age(Duration::ZERO)
        .build();
    HeaderValue::from_str(&cookie.to_string()).ok()
}

pub fn with_cookie(mut response: Response, cookie: Option<HeaderValue>) -> Response {
    if let Some(cookie) = cookie {
        response.headers_mut().append(header::SET_COOKIE, cookie);
    }
    response
}

/// The authenticated account of the current request.
///
/// Rejects with 401 when the firewall resolved no user.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub user: User,
    pub token: SessionToken,
}

impl CurrentUser {
    pub fn principal(&self) -> authz::Principal {
        self.user.principal()
    }
}

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        match parts.extensions.get::<AuthState>() {
            Some(AuthState::Authenticated { user, token }) => Ok(Self {
                user: user.clone(),
                token: token.clone(),
            }),
            _ => Err(ApiError::Unauthorized),
        }
    }
}

/// Response processing middleware hook
pub async fn response_middleware(request: Request<Body>, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let start = Instant::now();

    let mut response = next.run(request).await;

    let headers = response.headers_mut();
    headers.insert(
        "X-Inklog-Version",
        HeaderValue::from_static(env!("CARGO_PKG_VERSION")),
    );

    debug!(
        "{} {} -> {} in {:?}",
        method,
        uri,
        response.status(),
        start.elapsed()
    );
    response
}
