use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use content::FormErrors;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::error;
use user::UserError;

/// API Error types
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("Validation failed")]
    Validation(FormErrors),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("{0}")]
    Forbidden(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal server error: {0}")]
    InternalError(String),
}

/// Error response structure for OpenAPI documentation
#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct ApiErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    pub fn forbidden() -> Self {
        ApiError::Forbidden("Access Denied.".to_string())
    }

    /// A single field error
    pub fn field(field: &str, message: impl Into<String>) -> Self {
        ApiError::Validation(FormErrors::single(field, message))
    }

    /// Convert error to HTTP status code
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::DatabaseError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get error code for the error type
    pub fn error_code(&self) -> &str {
        match self {
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::Validation(_) => "VALIDATION_ERROR",
            ApiError::DatabaseError(_) => "DATABASE_ERROR",
            ApiError::Unauthorized => "UNAUTHORIZED",
            ApiError::Forbidden(_) => "FORBIDDEN",
            ApiError::BadRequest(_) => "BAD_REQUEST",
            ApiError::InternalError(_) => "INTERNAL_ERROR",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!("Request failed: {}", self);
        }
        let details = match &self {
            ApiError::Validation(errors) => serde_json::to_value(errors).ok(),
            _ => None,
        };
        let error_response = ApiErrorResponse {
            error: ErrorDetail {
                code: self.error_code().to_string(),
                message: self.to_string(),
                details,
            },
        };

        (status, Json(error_response)).into_response()
    }
}

impl From<FormErrors> for ApiError {
    fn from(errors: FormErrors) -> Self {
        ApiError::Validation(errors)
    }
}

impl From<authz::RoleViolation> for ApiError {
    fn from(violation: authz::RoleViolation) -> Self {
        ApiError::field(violation.field, violation.message)
    }
}

impl From<authz::AuthzError> for ApiError {
    fn from(err: authz::AuthzError) -> Self {
        ApiError::field("roles", err.to_string())
    }
}

impl From<tower_sessions::session::Error> for ApiError {
    fn from(err: tower_sessions::session::Error) -> Self {
        ApiError::InternalError(format!("Session error: {}", err))
    }
}

/// Convert database errors to API errors
impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => ApiError::NotFound("Resource".to_string()),
            _ => ApiError::DatabaseError(err.to_string()),
        }
    }
}

impl From<database::DatabaseError> for ApiError {
    fn from(err: database::DatabaseError) -> Self {
        use database::DatabaseError;
        match err {
            DatabaseError::NotFound { kind, .. } => ApiError::NotFound(kind.to_string()),
            DatabaseError::Validation(errors) => ApiError::Validation(errors),
            DatabaseError::Connection(e) => e.into(),
            other => ApiError::InternalError(other.to_string()),
        }
    }
}

impl From<UserError> for ApiError {
    fn from(err: UserError) -> Self {
        match err {
            UserError::Validation { field, message } => ApiError::field(field, message),
            UserError::DuplicateEmail(_) => {
                ApiError::field("email", "There is already an account with this email.")
            }
            UserError::Role(e) => ApiError::field("roles", e.to_string()),
            UserError::UserNotFound(_) => ApiError::NotFound("User".to_string()),
            UserError::InvalidCredentials => ApiError::Unauthorized,
            UserError::Database(e) => e.into(),
            other => ApiError::InternalError(other.to_string()),
        }
    }
}

/// Result type for API operations
pub type ApiResult<T> = Result<T, ApiError>;
