//! Error types for the sync layer.

use holdfast_store::StoreError;
use thiserror::Error;

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors that can occur during sync operations.
///
/// A single journal entry's remote failure is deliberately *not* a variant
/// that escapes a drain pass: it is recorded in the entry's retry count and
/// the pass summary. Only store-level failures propagate.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Store error while reading or updating the journal.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Network or transport error for one remote call.
    #[error("transport error: {0}")]
    Transport(String),

    /// The remote service answered with a non-success status.
    #[error("remote rejected {route}: status {status}: {detail}")]
    Rejected {
        /// The route that was called.
        route: String,
        /// The HTTP status code.
        status: u16,
        /// An excerpt of the response body, for diagnostics.
        detail: String,
    },
}

impl SyncError {
    /// Creates a transport error.
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = SyncError::transport("connection reset");
        assert_eq!(err.to_string(), "transport error: connection reset");

        let err = SyncError::Rejected {
            route: "/slides/s1".into(),
            status: 500,
            detail: "slide locked by another session".into(),
        };
        assert!(err.to_string().contains("500"));
        assert!(err.to_string().contains("/slides/s1"));
        assert!(err.to_string().contains("slide locked"));
    }

    #[test]
    fn store_error_conversion() {
        let store = StoreError::unavailable("gone");
        let err: SyncError = store.into();
        assert!(matches!(err, SyncError::Store(_)));
    }
}
