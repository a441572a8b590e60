//! Common error types for Mystery Digits components.

use thiserror::Error;

/// Common errors across Mystery Digits components
#[derive(Debug, Error)]
pub enum DigitsError {
    /// Missing or non-numeric digit input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Artifact write or directory scan failure
    #[error("Storage error: {0}")]
    Storage(#[from] std::io::Error),

    /// PNG encoding failure
    #[error("Encoding error: {0}")]
    Encode(String),

    /// Invalid configuration or recipe
    #[error("Configuration error: {0}")]
    Config(String),

    /// Referenced artifact does not exist
    #[error("Artifact not found: {0}")]
    NotFound(String),
}

impl DigitsError {
    /// Returns the HTTP status code for this error
    pub fn status_code(&self) -> u16 {
        match self {
            Self::InvalidInput(_) => 400,
            Self::Storage(_) => 503,
            Self::Encode(_) => 500,
            Self::Config(_) => 500,
            Self::NotFound(_) => 404,
        }
    }

    /// Returns true if this error should be retried
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Storage(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(DigitsError::InvalidInput("x".into()).status_code(), 400);
        assert_eq!(DigitsError::NotFound("x".into()).status_code(), 404);

        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err = DigitsError::from(io);
        assert_eq!(err.status_code(), 503);
        assert!(err.is_retryable());
        assert!(!DigitsError::InvalidInput("x".into()).is_retryable());
    }
}
