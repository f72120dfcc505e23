use content::FormErrors;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, DatabaseError>;

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("Database connection error: {0}")]
    Connection(#[from] sqlx::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: i64 },

    #[error("Validation error: {0}")]
    Validation(FormErrors),

    #[error("Other error: {0}")]
    Other(String),
}

impl From<FormErrors> for DatabaseError {
    fn from(errors: FormErrors) -> Self {
        DatabaseError::Validation(errors)
    }
}
