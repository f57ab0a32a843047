//! Error types for cache operations
//!
//! Only a few of these ever reach callers of `get_or_compute`: invalid keys,
//! the computation's own outcome, and the caller's own timeout or
//! cancellation. Backend failures are absorbed by the single-flight layer and
//! show up in logs and stats instead.

use std::sync::Arc;
use thiserror::Error;

/// Main error type for cache operations
#[derive(Error, Debug, Clone)]
pub enum CacheError {
    /// Empty or malformed logical key or group
    #[error("Invalid cache key: {0}")]
    InvalidKey(String),

    /// Backend is disabled or disconnected
    #[error("Cache backend unavailable: {0}")]
    BackendUnavailable(String),

    /// Backend rejected a write
    #[error("Cache backend write failed for {key}: {reason}")]
    BackendWriteFailed { key: String, reason: String },

    /// Backend could not be flushed
    #[error("Cache backend flush failed: {0}")]
    BackendFlushFailed(String),

    /// Generic backend failure (reads, deletes)
    #[error("Cache backend error: {0}")]
    BackendError(String),

    /// The wrapped computation failed; shared verbatim by every joined caller
    #[error("{0}")]
    ComputeFailed(Arc<anyhow::Error>),

    /// The wrapped computation panicked
    #[error("Computation for {key} panicked")]
    ComputePanicked { key: String },

    /// The computation task was aborted before producing a result
    #[error("Computation for {key} was aborted")]
    ComputeAborted { key: String },

    /// This caller stopped waiting after its timeout
    #[error("Operation timed out after {timeout_ms}ms: {key}")]
    Timeout { timeout_ms: u64, key: String },

    /// This caller was cancelled while waiting
    #[error("Operation cancelled while waiting for {key}")]
    Cancelled { key: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Serialization/Deserialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),
}

/// Result type alias for cache operations
pub type Result<T> = std::result::Result<T, CacheError>;

impl CacheError {
    /// Wrap a computation error so it can be shared between joined callers
    pub fn compute(err: impl Into<anyhow::Error>) -> Self {
        CacheError::ComputeFailed(Arc::new(err.into()))
    }

    /// The computation's own error, if this is a compute failure
    pub fn compute_error(&self) -> Option<&anyhow::Error> {
        match self {
            CacheError::ComputeFailed(err) => Some(err),
            _ => None,
        }
    }

    /// Whether this error originates from the backend rather than the caller
    pub fn is_backend(&self) -> bool {
        matches!(
            self,
            CacheError::BackendUnavailable(_)
                | CacheError::BackendWriteFailed { .. }
                | CacheError::BackendFlushFailed(_)
                | CacheError::BackendError(_)
        )
    }
}

impl From<serde_json::Error> for CacheError {
    fn from(err: serde_json::Error) -> Self {
        CacheError::SerializationError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = CacheError::InvalidKey("logical key is empty".to_string());
        assert_eq!(error.to_string(), "Invalid cache key: logical key is empty");

        let timeout_error = CacheError::Timeout {
            timeout_ms: 250,
            key: "posts".to_string(),
        };
        assert!(timeout_error.to_string().contains("timed out after 250ms"));

        let write_error = CacheError::BackendWriteFailed {
            key: "posts".to_string(),
            reason: "disk full".to_string(),
        };
        assert!(write_error.to_string().contains("disk full"));
    }

    #[test]
    fn test_compute_error_is_verbatim() {
        let error = CacheError::compute(anyhow::anyhow!("upstream returned 503"));
        assert_eq!(error.to_string(), "upstream returned 503");
        assert!(error.compute_error().is_some());

        let cloned = error.clone();
        assert_eq!(cloned.to_string(), error.to_string());
    }

    #[test]
    fn test_backend_classification() {
        assert!(CacheError::BackendUnavailable("down".into()).is_backend());
        assert!(CacheError::BackendFlushFailed("nope".into()).is_backend());
        assert!(!CacheError::InvalidKey("".into()).is_backend());
        assert!(!CacheError::compute(anyhow::anyhow!("x")).is_backend());
    }
}
