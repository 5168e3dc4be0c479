//! Error kinds surfaced by the domain rules.
//!
//! The enclosing layer maps these to transport status codes; nothing in this
//! crate retries or recovers from them.

use thiserror::Error;

/// Errors returned by basket and order operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// A referenced product, order or user does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The operation clashes with existing state (e.g. two pending orders).
    #[error("conflict: {0}")]
    Conflict(String),

    /// Input is malformed or a required field is missing.
    #[error("invalid {field}: {reason}")]
    Invalid {
        /// Name of the offending field.
        field: &'static str,
        /// Human-readable description of the problem.
        reason: String,
    },
}

impl CoreError {
    /// Shorthand for [`CoreError::Invalid`].
    pub fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            field,
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(
            CoreError::NotFound("product p1".to_owned()).to_string(),
            "not found: product p1"
        );
        assert_eq!(
            CoreError::invalid("place", "must not be blank").to_string(),
            "invalid place: must not be blank"
        );
    }
}
