//! Error types for all-to-all KNN.
//!
//! Every fallible operation returns [`KnnError`], a status-style error that
//! pairs an [`ErrorCode`] with a human readable message.

use std::fmt;
use thiserror::Error;

/// Error codes for the failure classes of a KNN run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// Invalid argument or input data (dimension mismatch, K >= N, ...).
    InvalidArgument,
    /// A batch or output allocation could not be satisfied.
    ResourceExhausted,
    /// A named dataset does not exist in the store.
    NotFound,
    /// A named dataset already exists and will not be overwritten.
    AlreadyExists,
    /// Stored data is corrupt or malformed.
    DataLoss,
    /// Internal error.
    Internal,
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorCode::InvalidArgument => write!(f, "INVALID_ARGUMENT"),
            ErrorCode::ResourceExhausted => write!(f, "RESOURCE_EXHAUSTED"),
            ErrorCode::NotFound => write!(f, "NOT_FOUND"),
            ErrorCode::AlreadyExists => write!(f, "ALREADY_EXISTS"),
            ErrorCode::DataLoss => write!(f, "DATA_LOSS"),
            ErrorCode::Internal => write!(f, "INTERNAL"),
        }
    }
}

/// Main error type for KNN operations.
#[derive(Error, Debug, Clone)]
#[error("{code}: {message}")]
pub struct KnnError {
    code: ErrorCode,
    message: String,
}

impl KnnError {
    /// Create a new error with the given code and message.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Get the error code.
    pub fn code(&self) -> ErrorCode {
        self.code
    }

    /// Get the error message.
    pub fn message(&self) -> &str {
        &self.message
    }

    // Convenience constructors

    /// Create an invalid argument error.
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidArgument, msg)
    }

    /// Create a resource exhausted error.
    pub fn resource_exhausted(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::ResourceExhausted, msg)
    }

    /// Create a not found error.
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::NotFound, msg)
    }

    /// Create an already exists error.
    pub fn already_exists(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::AlreadyExists, msg)
    }

    /// Create a data loss error.
    pub fn data_loss(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::DataLoss, msg)
    }

    /// Create an internal error.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::Internal, msg)
    }

    /// Check if this error came from input validation.
    pub fn is_invalid_argument(&self) -> bool {
        self.code == ErrorCode::InvalidArgument
    }
}

impl From<std::io::Error> for KnnError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => Self::not_found(err.to_string()),
            std::io::ErrorKind::OutOfMemory => Self::resource_exhausted(err.to_string()),
            _ => Self::internal(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for KnnError {
    fn from(err: serde_json::Error) -> Self {
        Self::data_loss(format!("malformed JSON: {err}"))
    }
}

impl From<std::collections::TryReserveError> for KnnError {
    fn from(err: std::collections::TryReserveError) -> Self {
        Self::resource_exhausted(format!("allocation failed: {err}"))
    }
}

/// Result type alias for KNN operations.
pub type Result<T> = std::result::Result<T, KnnError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = KnnError::invalid_argument("bad value");
        assert_eq!(err.code(), ErrorCode::InvalidArgument);
        assert_eq!(err.message(), "bad value");
        assert!(err.is_invalid_argument());
    }

    #[test]
    fn test_error_display() {
        let err = KnnError::not_found("train");
        let display = format!("{}", err);
        assert!(display.contains("NOT_FOUND"));
        assert!(display.contains("train"));
    }

    #[test]
    fn test_try_reserve_maps_to_resource_exhausted() {
        let mut v: Vec<f32> = Vec::new();
        let err = v.try_reserve_exact(usize::MAX).unwrap_err();
        let err: KnnError = err.into();
        assert_eq!(err.code(), ErrorCode::ResourceExhausted);
    }

    #[test]
    fn test_io_not_found_mapping() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: KnnError = io.into();
        assert_eq!(err.code(), ErrorCode::NotFound);
    }
}
