//! Application-level errors

use domain::DomainError;
use thiserror::Error;

/// Errors that can occur in the application layer
#[derive(Debug, Error)]
pub enum ApplicationError {
    /// Domain-level error (validation, malformed identifiers)
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// The addressed record does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Outbound call to an external service failed
    #[error("External service error: {0}")]
    ExternalService(String),

    /// Internal error (store connectivity, constraint violation, ...)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApplicationError {
    /// Whether this error represents a missing record
    pub const fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::NotFound(_) | Self::Domain(DomainError::NotFound { .. })
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_is_detected() {
        assert!(ApplicationError::NotFound("Task 1".into()).is_not_found());
        assert!(ApplicationError::Domain(DomainError::not_found("Task", "1")).is_not_found());
    }

    #[test]
    fn internal_is_not_not_found() {
        assert!(!ApplicationError::Internal("db down".into()).is_not_found());
    }

    #[test]
    fn domain_error_is_transparent() {
        let err: ApplicationError = DomainError::InvalidTaskId("x".into()).into();
        assert_eq!(err.to_string(), "Invalid task ID: x");
    }
}
