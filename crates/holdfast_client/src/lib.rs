//! # Holdfast Client
//!
//! The offline durability and sync facade for interactive editing apps.
//!
//! [`OfflineClient`] is the single entry point callers use: durable
//! save/load/delete, pending-count introspection, connectivity-change
//! subscription, and manual sync. It owns the wiring between the store,
//! the connectivity monitor and the drain engine and contains no logic of
//! its own.
//!
//! ## Example
//!
//! ```rust
//! use holdfast_client::{ClientConfig, MockRemote, OfflineClient};
//!
//! let client = OfflineClient::open_in_memory(
//!     MockRemote::new(),
//!     ClientConfig::default().starting_offline(),
//! ).unwrap();
//!
//! // Edits keep working while offline and are journaled for later.
//! client.save("p1", "presentation", br#"{"title":"A"}"#.to_vec()).unwrap();
//! assert_eq!(client.pending_count(), 1);
//!
//! // Reconnecting drains the journal automatically.
//! client.set_online(true);
//! assert_eq!(client.pending_count(), 0);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

use std::path::Path;
use std::sync::Arc;

use holdfast_storage::MemoryLog;
use holdfast_store::LocalStore;

pub use holdfast_store::{
    ChangeAction, EntitySnapshot, PendingChange, StoreConfig, StoreError, StoreResult, SyncStatus,
};
pub use holdfast_sync::{
    ConnectivityMonitor, DrainReport, HttpClient, HttpMethod, HttpRequest, HttpResponse,
    MockRemote, Remote, RestRemote, Subscription, SyncConfig, SyncEngine, SyncError, SyncResult,
};

/// Configuration for an [`OfflineClient`].
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Store configuration.
    pub store: StoreConfig,
    /// Drain engine configuration.
    pub sync: SyncConfig,
    /// The platform's reachability state at construction.
    pub initially_online: bool,
    /// Trigger a drain pass automatically on every offline-to-online
    /// transition, after listeners have been notified. On by default.
    pub auto_sync: bool,
}

impl ClientConfig {
    /// Sets the store configuration.
    pub fn with_store(mut self, store: StoreConfig) -> Self {
        self.store = store;
        self
    }

    /// Sets the sync configuration.
    pub fn with_sync(mut self, sync: SyncConfig) -> Self {
        self.sync = sync;
        self
    }

    /// Starts the client in the offline state.
    pub fn starting_offline(mut self) -> Self {
        self.initially_online = false;
        self
    }

    /// Disables the automatic drain on reconnect; `sync()` stays manual.
    pub fn without_auto_sync(mut self) -> Self {
        self.auto_sync = false;
        self
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            store: StoreConfig::default(),
            sync: SyncConfig::default(),
            initially_online: true,
            auto_sync: true,
        }
    }
}

/// The single entry point for the offline layer.
///
/// Opening a client opens the durable store first; no handle exists before
/// initialization has completed, so every operation observes a fully
/// recovered store. Saves are durable before they return. While offline,
/// every mutation is additionally journaled; the journal drains against
/// the remote service on reconnect (or via [`OfflineClient::sync`]).
///
/// Sync failures never block editing: a failing entry stays journaled and
/// the surrounding app can keep showing "N changes pending" from
/// [`OfflineClient::pending_count`].
pub struct OfflineClient<R: Remote + 'static> {
    store: Arc<LocalStore>,
    monitor: Arc<ConnectivityMonitor>,
    engine: Arc<SyncEngine<R>>,
    auto_sync: bool,
}

impl<R: Remote + 'static> OfflineClient<R> {
    /// Opens a client backed by a log file at the given path.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Unavailable`] if the durable medium cannot be
    /// opened, and [`StoreError::Corrupted`] if its contents are
    /// undecodable. Both are surfaced rather than swallowed - durability
    /// is this layer's entire reason to exist.
    pub fn open(path: &Path, remote: R, config: ClientConfig) -> StoreResult<Self> {
        let store = Arc::new(LocalStore::open_with_config(path, config.store.clone())?);
        Ok(Self::assemble(store, remote, config))
    }

    /// Opens a non-persistent client for testing.
    ///
    /// # Errors
    ///
    /// See [`OfflineClient::open`].
    pub fn open_in_memory(remote: R, config: ClientConfig) -> StoreResult<Self> {
        let store = Arc::new(LocalStore::open_with_backend(
            Box::new(MemoryLog::new()),
            config.store.clone(),
        )?);
        Ok(Self::assemble(store, remote, config))
    }

    fn assemble(store: Arc<LocalStore>, remote: R, config: ClientConfig) -> Self {
        let monitor = Arc::new(ConnectivityMonitor::new(config.initially_online));
        let engine = Arc::new(SyncEngine::new(
            Arc::clone(&store),
            remote,
            Arc::clone(&monitor),
            config.sync,
        ));

        Self {
            store,
            monitor,
            engine,
            auto_sync: config.auto_sync,
        }
    }

    /// Durably saves an entity, journaling an update when offline.
    ///
    /// When online the write is recorded as already synced: the caller's
    /// normal API path is assumed to have delivered it, and no journal
    /// entry is created. When offline the snapshot is saved as pending and
    /// exactly one update is journaled; a journal-append failure on this
    /// path is logged, not raised, since the snapshot itself is already
    /// durable.
    ///
    /// # Errors
    ///
    /// Returns an error if the snapshot cannot be written durably.
    pub fn save(&self, id: &str, entity_type: &str, payload: Vec<u8>) -> StoreResult<()> {
        self.write(id, entity_type, payload, ChangeAction::Update)
    }

    /// Durably saves a newly created entity, journaling a create when
    /// offline. Identical to [`OfflineClient::save`] apart from the
    /// journaled action.
    ///
    /// # Errors
    ///
    /// Returns an error if the snapshot cannot be written durably.
    pub fn create(&self, id: &str, entity_type: &str, payload: Vec<u8>) -> StoreResult<()> {
        self.write(id, entity_type, payload, ChangeAction::Create)
    }

    fn write(
        &self,
        id: &str,
        entity_type: &str,
        payload: Vec<u8>,
        action: ChangeAction,
    ) -> StoreResult<()> {
        if self.monitor.is_online() {
            return self.store.save(id, entity_type, payload, SyncStatus::Synced);
        }

        self.store
            .save(id, entity_type, payload.clone(), SyncStatus::Pending)?;
        if let Err(error) =
            self.store
                .append_pending_change(entity_type, id, action, Some(payload))
        {
            tracing::error!(%error, id, "failed to journal offline write");
        }
        Ok(())
    }

    /// Returns the snapshot for `id`, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the store is unusable.
    pub fn load(&self, id: &str) -> StoreResult<Option<EntitySnapshot>> {
        self.store.load(id)
    }

    /// Removes an entity, journaling a delete when offline.
    ///
    /// Deleting an unknown id is a no-op. The journaled delete reuses the
    /// removed snapshot's entity type; as with saves, a journal-append
    /// failure is logged rather than raised.
    ///
    /// # Errors
    ///
    /// Returns an error if the removal cannot be written durably.
    pub fn delete(&self, id: &str) -> StoreResult<()> {
        let removed = self.store.delete(id)?;
        if self.monitor.is_online() {
            return Ok(());
        }

        if let Some(snapshot) = removed {
            if let Err(error) = self.store.append_pending_change(
                &snapshot.entity_type,
                id,
                ChangeAction::Delete,
                None,
            ) {
                tracing::error!(%error, id, "failed to journal offline delete");
            }
        }
        Ok(())
    }

    /// Returns all snapshots, ordered by write timestamp.
    ///
    /// # Errors
    ///
    /// Returns an error if the store is unusable.
    pub fn get_all(&self) -> StoreResult<Vec<EntitySnapshot>> {
        self.store.get_all()
    }

    /// Runs one drain pass now.
    ///
    /// Callable in addition to the automatic reconnect trigger; while
    /// offline or with a pass already running this is a no-op returning
    /// the zero report.
    ///
    /// # Errors
    ///
    /// Propagates store failures; per-item remote failures are aggregated
    /// into the report instead.
    pub fn sync(&self) -> SyncResult<DrainReport> {
        self.engine.drain()
    }

    /// Returns the current connectivity state.
    pub fn is_online(&self) -> bool {
        self.monitor.is_online()
    }

    /// Records a reachability signal from the platform.
    ///
    /// An offline-to-online transition notifies subscribers first, then
    /// (unless disabled) drains the journal before this call returns.
    /// Subscribers therefore observe the pre-drain state: a listener that
    /// checks [`OfflineClient::pending_count`] still sees the queued
    /// changes.
    pub fn set_online(&self, online: bool) {
        let transitioned = self.monitor.set_online(online);
        if !transitioned || !online || !self.auto_sync {
            return;
        }

        match self.engine.drain() {
            Ok(report) => tracing::info!(
                success = report.success,
                failed = report.failed,
                "journal drained after reconnect"
            ),
            Err(error) => tracing::error!(%error, "drain after reconnect failed"),
        }
    }

    /// Registers a callback for connectivity transitions.
    ///
    /// The listener stays registered for the lifetime of the returned
    /// handle.
    pub fn on_online_status_change(
        &self,
        callback: impl Fn(bool) + Send + Sync + 'static,
    ) -> Subscription {
        self.monitor.subscribe(callback)
    }

    /// Returns the number of changes awaiting sync.
    pub fn pending_count(&self) -> usize {
        self.store.count_pending_changes()
    }

    /// Returns the journal contents, oldest first.
    ///
    /// Useful after a drain pass to inspect which entries failed and how
    /// often they have been retried.
    ///
    /// # Errors
    ///
    /// Returns an error if the store is unusable.
    pub fn pending_changes(&self) -> StoreResult<Vec<PendingChange>> {
        self.store.list_pending_changes()
    }

    /// Returns the remote this client syncs against.
    pub fn remote(&self) -> &R {
        self.engine.remote()
    }
}
