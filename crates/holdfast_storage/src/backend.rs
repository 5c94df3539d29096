//! Log backend trait definition.

use crate::error::StorageResult;

/// A low-level durable log for Holdfast.
///
/// Log backends are **opaque byte logs** - they read the whole log, append
/// to it, and rewrite it during compaction. The store crate owns all record
/// framing; backends do not understand snapshots or journal entries.
///
/// # Invariants
///
/// - `append` adds bytes at the end; earlier bytes are never modified
/// - `read_all` returns exactly the bytes appended so far, in order
/// - `flush` makes all appended data survive process termination
/// - `replace` atomically substitutes the entire log contents
/// - Backends must be `Send + Sync` for concurrent access
///
/// # Implementors
///
/// - [`super::MemoryLog`] - For testing
/// - [`super::FileLog`] - For persistent storage
pub trait LogBackend: Send + Sync {
    /// Reads the entire log contents.
    ///
    /// # Errors
    ///
    /// Returns an error if an I/O error occurs.
    fn read_all(&self) -> StorageResult<Vec<u8>>;

    /// Appends data to the end of the log.
    ///
    /// # Errors
    ///
    /// Returns an error if an I/O error occurs.
    fn append(&mut self, data: &[u8]) -> StorageResult<()>;

    /// Flushes all pending writes to the OS.
    ///
    /// # Errors
    ///
    /// Returns an error if the flush fails.
    fn flush(&mut self) -> StorageResult<()>;

    /// Syncs data and metadata to durable storage.
    ///
    /// A stronger guarantee than `flush`: after this returns, the data
    /// survives power loss, not just process termination.
    ///
    /// # Errors
    ///
    /// Returns an error if the sync fails.
    fn sync(&mut self) -> StorageResult<()>;

    /// Replaces the entire log contents in one step.
    ///
    /// Used by compaction to rewrite the log to its live state. The
    /// replacement must be all-or-nothing: a crash during `replace` leaves
    /// either the old contents or the new contents, never a mix.
    ///
    /// # Errors
    ///
    /// Returns an error if the rewrite fails.
    fn replace(&mut self, data: &[u8]) -> StorageResult<()>;
}
