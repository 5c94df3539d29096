//! Store configuration.

/// Configuration for a [`crate::LocalStore`].
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Create the log file if it doesn't exist.
    pub create_if_missing: bool,
    /// Call `sync()` (fsync) after every durable write, not just `flush()`.
    /// Slower but survives power loss, not just process death.
    pub sync_on_write: bool,
    /// Rewrite the log when more than this fraction of its records are
    /// dead (overwritten snapshots, removed journal entries, stale retry
    /// bumps). Checked at open and after mutations.
    pub compact_dead_ratio: f64,
    /// Never compact below this many total records.
    pub compact_min_records: u64,
}

impl StoreConfig {
    /// Disables fsync-per-write.
    pub fn without_sync_on_write(mut self) -> Self {
        self.sync_on_write = false;
        self
    }

    /// Sets the dead-record fraction that triggers compaction.
    pub fn with_compact_dead_ratio(mut self, ratio: f64) -> Self {
        self.compact_dead_ratio = ratio;
        self
    }

    /// Sets the minimum record count before compaction is considered.
    pub fn with_compact_min_records(mut self, min: u64) -> Self {
        self.compact_min_records = min;
        self
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            create_if_missing: true,
            sync_on_write: true,
            compact_dead_ratio: 0.5,
            compact_min_records: 1024,
        }
    }
}
