//! Error types for the store.

use holdfast_storage::StorageError;
use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur in store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The durable medium cannot be opened or used.
    ///
    /// This is fatal to the whole subsystem: durability is the store's
    /// reason to exist, so it is surfaced to the caller rather than
    /// retried or swallowed.
    #[error("store unavailable: {message}")]
    Unavailable {
        /// Description of why the medium is unusable.
        message: String,
    },

    /// The log contains an undecodable record before the tail.
    #[error("log corruption: {message}")]
    Corrupted {
        /// Description of the corruption.
        message: String,
    },

    /// A record failed to encode.
    #[error("codec error: {message}")]
    Codec {
        /// Description of the failure.
        message: String,
    },

    /// A storage backend operation failed.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// A journal entry id was not found.
    #[error("pending change not found: {id}")]
    ChangeNotFound {
        /// The journal entry id.
        id: String,
    },
}

impl StoreError {
    /// Creates an unavailable error.
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }

    /// Creates a corruption error.
    pub fn corrupted(message: impl Into<String>) -> Self {
        Self::Corrupted {
            message: message.into(),
        }
    }

    /// Creates a codec error.
    pub fn codec(message: impl Into<String>) -> Self {
        Self::Codec {
            message: message.into(),
        }
    }
}
