use thiserror::Error;

#[derive(Error, Debug)]
pub enum UserError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid role: {0}")]
    Role(#[from] authz::AuthzError),

    #[error("User not found: {0}")]
    UserNotFound(String),

    #[error("Invalid credentials.")]
    InvalidCredentials,

    #[error("Email already registered: {0}")]
    DuplicateEmail(String),

    #[error("Validation failed on {field}: {message}")]
    Validation { field: &'static str, message: String },

    #[error("Unsupported account type: {0}")]
    UnsupportedAccount(String),

    #[error("Password hashing error: {0}")]
    PasswordHash(String),

    #[error("Session error: {0}")]
    Session(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Initialization error: {0}")]
    Initialization(String),
}

impl UserError {
    pub(crate) fn session(err: impl std::fmt::Display) -> Self {
        UserError::Session(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, UserError>;
