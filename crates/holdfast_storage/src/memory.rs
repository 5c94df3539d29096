//! In-memory log backend for testing.

use crate::backend::LogBackend;
use crate::error::StorageResult;
use parking_lot::RwLock;

/// An in-memory log backend.
///
/// Keeps all bytes in memory; suitable for tests and ephemeral stores that
/// don't need persistence.
///
/// # Example
///
/// ```rust
/// use holdfast_storage::{LogBackend, MemoryLog};
///
/// let mut log = MemoryLog::new();
/// log.append(b"test data").unwrap();
/// assert_eq!(log.read_all().unwrap(), b"test data");
/// ```
#[derive(Debug, Default)]
pub struct MemoryLog {
    data: RwLock<Vec<u8>>,
}

impl MemoryLog {
    /// Creates a new empty in-memory log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an in-memory log with pre-existing bytes.
    ///
    /// Useful for testing recovery scenarios.
    #[must_use]
    pub fn with_data(data: Vec<u8>) -> Self {
        Self {
            data: RwLock::new(data),
        }
    }
}

impl LogBackend for MemoryLog {
    fn read_all(&self) -> StorageResult<Vec<u8>> {
        Ok(self.data.read().clone())
    }

    fn append(&mut self, data: &[u8]) -> StorageResult<()> {
        self.data.write().extend_from_slice(data);
        Ok(())
    }

    fn flush(&mut self) -> StorageResult<()> {
        Ok(())
    }

    fn sync(&mut self) -> StorageResult<()> {
        Ok(())
    }

    fn replace(&mut self, data: &[u8]) -> StorageResult<()> {
        *self.data.write() = data.to_vec();
        Ok(())
    }
}
