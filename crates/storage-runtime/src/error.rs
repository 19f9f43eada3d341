//! Error types for the primitive storage services.

use thiserror::Error;

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;

/// Errors surfaced by queue and blob service operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Queue not found: {queue}")]
    QueueNotFound { queue: String },

    #[error("Message not found or receipt expired: {receipt}")]
    MessageNotFound { receipt: String },

    #[error("Message too large: {size} bytes (max: {max_size} encoded characters)")]
    MessageTooLarge { size: usize, max_size: usize },

    #[error("Connection failed: {message}")]
    ConnectionFailed { message: String },

    #[error("Operation timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("Service error ({code}): {message}")]
    ServiceError { code: String, message: String },

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl StorageError {
    /// Check if error is transient and worth retrying
    ///
    /// Transient errors are temporary server-side conditions that may resolve:
    /// connection failures, timeouts, and 5xx-class service errors. Not-found
    /// and validation errors never resolve by retrying.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::ConnectionFailed { .. } | Self::Timeout { .. } | Self::ServiceError { .. }
        )
    }

    /// Check if error reports a missing target resource
    ///
    /// Callers typically treat these as an empty result or a lazy-create
    /// trigger rather than a fault.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::QueueNotFound { .. } | Self::MessageNotFound { .. }
        )
    }
}

/// Validation errors for names and identifiers
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Required field missing: {field}")]
    Required { field: String },

    #[error("Invalid format for {field}: {message}")]
    InvalidFormat { field: String, message: String },

    #[error("Value out of range for {field}: {message}")]
    OutOfRange { field: String, message: String },
}
