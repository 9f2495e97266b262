//! Domain error types

use thiserror::Error;

/// Errors that can occur in domain operations.
///
/// Expected runtime conditions (placeholder nodes, empty pools, remote
/// failures) are not errors; they are sentinel results the callers branch
/// on. These variants cover genuinely invalid input, which is fatal at
/// construction time.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Access mask outside the valid `0..=7` range.
    #[error("Access mask out of bounds: {0}")]
    MaskOutOfBounds(i32),

    /// Permission string too short or not octal.
    #[error("Malformed permission string: {0}")]
    MalformedPermissions(String),

    /// Transfer direction that is neither pull nor push.
    #[error("Invalid transfer direction")]
    InvalidDirection,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        assert_eq!(
            DomainError::MaskOutOfBounds(9).to_string(),
            "Access mask out of bounds: 9"
        );
        assert_eq!(
            DomainError::MalformedPermissions("06".into()).to_string(),
            "Malformed permission string: 06"
        );
    }
}
