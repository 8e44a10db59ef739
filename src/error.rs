//! Error types for the cache
//!
//! Provides unified error handling using thiserror.

use std::path::PathBuf;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Boxed error produced by a codec implementation.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

// == Cache Error Enum ==
/// Unified error type for every cache implementation.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Logical miss: the key is absent or its entry has expired
    #[error("Key not found: {0}")]
    NotFound(String),

    /// The caller's context was cancelled before the operation started
    #[error("Operation cancelled")]
    Cancelled,

    /// The caller's deadline passed before the operation started
    #[error("Deadline exceeded")]
    DeadlineExceeded,

    /// Filesystem failure
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A cache file with a malformed header
    #[error("Corrupt cache file {}: {reason}", .path.display())]
    Corrupt { path: PathBuf, reason: String },

    /// Encoding or decoding failed
    #[error("Codec error: {0}")]
    Codec(#[source] BoxError),

    /// Several failures collected from one batch operation
    #[error("{} errors occurred: {}", .0.len(), join_errors(.0))]
    Multiple(Vec<CacheError>),

    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CacheError {
    /// Builds an `Io` error tagged with the path it happened on.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        CacheError::Io {
            path: path.into(),
            source,
        }
    }

    /// Wraps any codec failure.
    pub fn codec(err: impl Into<BoxError>) -> Self {
        CacheError::Codec(err.into())
    }

    /// Returns true for a logical cache miss.
    pub fn is_not_found(&self) -> bool {
        matches!(self, CacheError::NotFound(_))
    }

    /// Folds the failures of a batch into a single result.
    ///
    /// No failures is `Ok`, a single failure is returned as is, and
    /// anything more is reported together as `Multiple`.
    pub fn aggregate(mut errors: Vec<CacheError>) -> Result<()> {
        match errors.len() {
            0 => Ok(()),
            1 => Err(errors.remove(0)),
            _ => Err(CacheError::Multiple(errors)),
        }
    }
}

fn join_errors(errors: &[CacheError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

// == IntoResponse Implementation ==
impl IntoResponse for CacheError {
    fn into_response(self) -> Response {
        let status = match &self {
            CacheError::NotFound(_) => StatusCode::NOT_FOUND,
            CacheError::InvalidRequest(_) | CacheError::Config(_) => StatusCode::BAD_REQUEST,
            CacheError::Cancelled | CacheError::DeadlineExceeded => StatusCode::GATEWAY_TIMEOUT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({
            "error": self.to_string()
        }));

        (status, body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the cache.
pub type Result<T> = std::result::Result<T, CacheError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aggregate_empty_is_ok() {
        assert!(CacheError::aggregate(Vec::new()).is_ok());
    }

    #[test]
    fn test_aggregate_single_error_is_unwrapped() {
        let result = CacheError::aggregate(vec![CacheError::Internal("boom".into())]);
        assert!(matches!(result, Err(CacheError::Internal(msg)) if msg == "boom"));
    }

    #[test]
    fn test_aggregate_keeps_every_error() {
        let result = CacheError::aggregate(vec![
            CacheError::Internal("first".into()),
            CacheError::Internal("second".into()),
        ]);

        match result {
            Err(CacheError::Multiple(errors)) => assert_eq!(errors.len(), 2),
            other => panic!("expected Multiple, got {:?}", other),
        }
    }

    #[test]
    fn test_multiple_display_lists_all_errors() {
        let err = CacheError::Multiple(vec![
            CacheError::Internal("first".into()),
            CacheError::Internal("second".into()),
        ]);
        let msg = err.to_string();
        assert!(msg.starts_with("2 errors occurred"));
        assert!(msg.contains("first"));
        assert!(msg.contains("second"));
    }

    #[test]
    fn test_is_not_found() {
        assert!(CacheError::NotFound("k".into()).is_not_found());
        assert!(!CacheError::Cancelled.is_not_found());
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(
            CacheError::NotFound("k".into()).into_response().status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            CacheError::InvalidRequest("bad".into())
                .into_response()
                .status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            CacheError::DeadlineExceeded.into_response().status(),
            StatusCode::GATEWAY_TIMEOUT
        );
        assert_eq!(
            CacheError::Internal("x".into()).into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
