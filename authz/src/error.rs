//! Error types for the authorization crate.
//!
//! Policy outcomes (denials, abstentions, rejected role submissions) are
//! ordinary return values and never appear here. These errors only cover
//! malformed input reaching the policy layer.

use thiserror::Error;

/// Errors that can occur while building authorization inputs.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthzError {
    /// A role token did not match any role of the hierarchy.
    ///
    /// Raised when parsing stored or submitted role lists.
    #[error("Unknown role: {0}")]
    UnknownRole(String),
}

/// A specialized Result type for authorization operations.
pub type Result<T> = std::result::Result<T, AuthzError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = AuthzError::UnknownRole("ROLE_EDITOR".to_string());
        assert_eq!(err.to_string(), "Unknown role: ROLE_EDITOR");
    }
}
