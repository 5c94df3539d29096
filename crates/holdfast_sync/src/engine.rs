//! The journal drain engine.

use crate::config::SyncConfig;
use crate::connectivity::ConnectivityMonitor;
use crate::error::SyncResult;
use crate::remote::Remote;
use holdfast_store::LocalStore;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Summary of one drain pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrainReport {
    /// Entries whose remote call succeeded and that left the journal.
    pub success: u64,
    /// Entries whose remote call failed; they stay queued with their
    /// retry count incremented.
    pub failed: u64,
    /// Entries dropped by the retry cap (zero unless a cap is configured).
    pub abandoned: u64,
}

/// Replays the pending-change journal against the remote service.
///
/// A drain pass walks the journal oldest-first and issues one remote call
/// per entry. At most one pass runs at a time: a `drain()` while another
/// pass is active (or while offline) is a no-op returning the zero report.
/// A single failing entry never aborts the pass - it stays queued with its
/// retry count incremented, and the only way an entry leaves the journal
/// is explicit success (or the opt-in retry cap).
pub struct SyncEngine<R: Remote> {
    store: Arc<LocalStore>,
    remote: R,
    monitor: Arc<ConnectivityMonitor>,
    config: SyncConfig,
    in_progress: AtomicBool,
}

impl<R: Remote> SyncEngine<R> {
    /// Creates a new engine over the given store, remote and monitor.
    pub fn new(
        store: Arc<LocalStore>,
        remote: R,
        monitor: Arc<ConnectivityMonitor>,
        config: SyncConfig,
    ) -> Self {
        Self {
            store,
            remote,
            monitor,
            config,
            in_progress: AtomicBool::new(false),
        }
    }

    /// Returns the remote this engine drains against.
    pub fn remote(&self) -> &R {
        &self.remote
    }

    /// Returns true while a drain pass is active.
    pub fn in_progress(&self) -> bool {
        self.in_progress.load(Ordering::SeqCst)
    }

    /// Runs one drain pass.
    ///
    /// Offline, or with a pass already active, this returns the zero
    /// report immediately - neither case is an error.
    ///
    /// # Errors
    ///
    /// Propagates store failures while reading or updating the journal.
    /// Per-item remote failures never propagate; they are aggregated into
    /// the report.
    pub fn drain(&self) -> SyncResult<DrainReport> {
        if !self.monitor.is_online() {
            return Ok(DrainReport::default());
        }

        // Single-flight: first caller wins, everyone else gets a no-op.
        if self
            .in_progress
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Ok(DrainReport::default());
        }
        let _guard = InProgressGuard(&self.in_progress);

        let changes = self.store.list_pending_changes()?;
        let mut report = DrainReport::default();

        for change in changes {
            if let Some(cap) = self.config.max_retries {
                if change.retry_count >= cap {
                    tracing::warn!(
                        id = %change.id,
                        retries = change.retry_count,
                        "abandoning change past retry cap"
                    );
                    self.store.remove_pending_change(&change.id)?;
                    report.abandoned += 1;
                    continue;
                }
            }

            match self.remote.apply(&change) {
                Ok(()) => {
                    self.store.remove_pending_change(&change.id)?;
                    report.success += 1;
                    tracing::debug!(id = %change.id, "change synced");
                }
                Err(error) => {
                    self.store.increment_retry_count(&change.id)?;
                    report.failed += 1;
                    tracing::debug!(id = %change.id, %error, "change sync failed, kept queued");
                }
            }
        }

        Ok(report)
    }
}

/// Clears the in-progress flag on every exit path, including errors.
struct InProgressGuard<'a>(&'a AtomicBool);

impl Drop for InProgressGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}
