//! Error types for content operations

use thiserror::Error;

use crate::validation::FormErrors;

/// Errors that can occur during content operations
#[derive(Error, Debug)]
pub enum ContentError {
    /// A submission failed field validation
    #[error("Content validation failed: {0}")]
    Validation(FormErrors),

    #[error("Invalid slug: {0}")]
    InvalidSlug(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

impl From<FormErrors> for ContentError {
    fn from(errors: FormErrors) -> Self {
        ContentError::Validation(errors)
    }
}
