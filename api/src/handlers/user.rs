//! Account administration.
//!
//! Role fields are computed by the access decision engine and every
//! submission is re-checked against it. Deleting an account goes through the
//! engine's vote before the CSRF token is even looked at.

use authz::{Action, Decision, Principal, RoleSet, Subject};
use axum::{
    extract::{Path, State},
    response::Response,
    Extension, Json,
};
use tower_sessions::Session;
use tracing::{info, warn};
use ::user::{validate_account, validate_password, User, UserRepository};

use super::{check_form_token, csrf_token, flash_redirect, take_flashes, token_is_valid, INVALID_CSRF_TOKEN};
use crate::error::{ApiError, ApiResult};
use crate::middleware_hooks::CurrentUser;
use crate::models::{IndexPage, TokenForm, UserForm, UserFormPage, UserView};
use crate::AppState;

const INDEX_PATH: &str = "/admin/user";
const FORM_INTENTION: &str = "user";

async fn find(state: &AppState, id: i64) -> ApiResult<User> {
    state
        .users
        .database()
        .find_by_id(id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User".to_string()))
}

/// The submitted password, checked against its confirmation
fn submitted_password(form: &UserForm) -> ApiResult<Option<&str>> {
    let Some(password) = form.password.as_deref().filter(|p| !p.is_empty()) else {
        return Ok(None);
    };
    if form.password_confirmation.as_deref() != Some(password) {
        return Err(ApiError::field(
            "password_confirmation",
            "The password fields must match.",
        ));
    }
    validate_password(password)?;
    Ok(Some(password))
}

/// All accounts
#[utoipa::path(
    get,
    path = "/admin/user",
    responses(
        (status = 200, description = "Accounts and pending flashes"),
        (status = 403, description = "Not an administrator")
    ),
    tag = "admin"
)]
pub async fn index(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
) -> ApiResult<Json<IndexPage<UserView>>> {
    let users = state.users.database().list().await?;
    let items = users.iter().map(UserView::from).collect();
    Ok(Json(IndexPage::new(items, take_flashes(&state, &session).await?)))
}

pub async fn new_form(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    current: CurrentUser,
) -> ApiResult<Json<UserFormPage>> {
    let roles = state
        .engine
        .assignable_roles(&current.principal(), &Principal::transient([]), true);
    Ok(Json(UserFormPage {
        user: None,
        roles,
        csrf_token: csrf_token(&state, &session, FORM_INTENTION).await?,
    }))
}

pub async fn create(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    current: CurrentUser,
    Json(form): Json<UserForm>,
) -> ApiResult<Response> {
    check_form_token(&state, &session, FORM_INTENTION, form.token.as_deref()).await?;

    let roles = RoleSet::parse(form.roles.clone().unwrap_or_default())?;
    state.engine.check_role_submission(
        &current.principal(),
        &Principal::new(None, roles.clone()),
        true,
        &roles,
    )?;
    let password = submitted_password(&form)?
        .ok_or_else(|| ApiError::field("password", "Please enter a password."))?;

    let user = state
        .users
        .create_user(&form.email, &form.username, password, roles)
        .await?;
    info!("User {} created by {}", user, current.user);

    flash_redirect(&state, &session, "success", "User created successfully!", INDEX_PATH).await
}

pub async fn edit_form(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    current: CurrentUser,
    Path(id): Path<i64>,
) -> ApiResult<Json<UserFormPage>> {
    let target = find(&state, id).await?;
    let roles = state
        .engine
        .assignable_roles(&current.principal(), &target.principal(), false);
    Ok(Json(UserFormPage {
        user: Some(UserView::from(&target)),
        roles,
        csrf_token: csrf_token(&state, &session, FORM_INTENTION).await?,
    }))
}

/// Update an account. Omitting `roles` keeps the current ones.
pub async fn update(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    current: CurrentUser,
    Path(id): Path<i64>,
    Json(form): Json<UserForm>,
) -> ApiResult<Response> {
    let mut target = find(&state, id).await?;
    check_form_token(&state, &session, FORM_INTENTION, form.token.as_deref()).await?;

    let roles = match &form.roles {
        Some(tokens) => RoleSet::parse(tokens)?,
        None => target.roles.clone(),
    };
    state
        .engine
        .check_role_submission(&current.principal(), &target.principal(), false, &roles)?;

    target.set_email(&form.email);
    target.username = form.username.trim().to_string();
    target.roles = roles;
    validate_account(&target)?;
    if let Some(password) = submitted_password(&form)? {
        let hash = state.users.hasher().hash(&target, password)?;
        target.set_password(hash);
    }
    state.users.database().save(&mut target).await?;

    // Keep the editor signed in after changing their own password
    if target.id == current.user.id {
        state
            .users
            .session_manager()
            .bind_auth_hash(&session, &target)
            .await?;
    }
    info!("User {} updated by {}", target, current.user);

    flash_redirect(&state, &session, "success", "User updated successfully!", INDEX_PATH).await
}

/// Delete an account
#[utoipa::path(
    delete,
    path = "/admin/user/{id}/delete",
    params(("id" = i64, Path, description = "Account id")),
    request_body = TokenForm,
    responses(
        (status = 303, description = "Deleted, or the token was invalid; redirect to the index with a flash"),
        (status = 403, description = "The access decision engine denied the deletion"),
        (status = 404, description = "Account not found")
    ),
    tag = "admin"
)]
pub async fn delete(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    current: CurrentUser,
    Path(id): Path<i64>,
    Json(form): Json<TokenForm>,
) -> ApiResult<Response> {
    let target = find(&state, id).await?;

    let acting = current.principal();
    let vote = state.engine.vote(
        Some(&acting),
        Action::Delete,
        Subject::Account(&target.principal()),
    );
    if Decision::resolve(vote) == Decision::Denied {
        warn!("User {} may not delete {}", current.user, target);
        return Err(ApiError::forbidden());
    }

    if !token_is_valid(&state, &session, &format!("delete{}", id), form.token.as_deref()).await? {
        return flash_redirect(&state, &session, "error", INVALID_CSRF_TOKEN, INDEX_PATH).await;
    }

    state.users.database().delete(id).await?;
    info!("User {} deleted by {}", target, current.user);
    flash_redirect(&state, &session, "success", "User deleted successfully!", INDEX_PATH).await
}
