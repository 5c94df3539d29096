//! Core data model: snapshots and pending changes.

use serde::{Deserialize, Serialize};

/// Sync state of a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SyncStatus {
    /// Written locally while offline; not yet acknowledged remotely.
    Pending,
    /// A drain pass is currently replaying this entity's change.
    Syncing,
    /// The remote service has acknowledged the latest value.
    Synced,
    /// The last sync attempt for this entity failed.
    Error,
}

/// The kind of mutation recorded in the journal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChangeAction {
    /// Entity was created.
    Create,
    /// Entity was updated.
    Update,
    /// Entity was deleted.
    Delete,
}

impl ChangeAction {
    /// Returns the lowercase name used in journal entry ids.
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeAction::Create => "create",
            ChangeAction::Update => "update",
            ChangeAction::Delete => "delete",
        }
    }
}

/// The latest known value of one entity, independent of sync state.
///
/// Exactly one snapshot exists per id at any time; a save replaces the
/// prior value in place. The payload is opaque bytes - the store never
/// interprets entity shapes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntitySnapshot {
    /// Caller-supplied id, unique per entity.
    pub id: String,
    /// Entity type tag ("presentation", "slide", "block", or arbitrary).
    pub entity_type: String,
    /// Opaque payload bytes, caller-defined shape.
    pub payload: Vec<u8>,
    /// Write time in milliseconds since the Unix epoch. Last write wins;
    /// monotonicity per id is not guaranteed.
    pub timestamp: u64,
    /// Sync state of this snapshot.
    pub sync_status: SyncStatus,
}

/// One not-yet-acknowledged mutation in the journal.
///
/// Multiple entries may exist for the same entity; the id embeds the
/// creation time and a per-store sequence number so entries never collide.
/// Nothing mutates an entry after append except `retry_count`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingChange {
    /// Unique journal entry id, derived from type, entity id and enqueue time.
    pub id: String,
    /// Entity type tag.
    pub entity_type: String,
    /// The entity this change applies to.
    pub entity_id: String,
    /// The kind of mutation.
    pub action: ChangeAction,
    /// Opaque payload bytes; `None` for deletes.
    pub payload: Option<Vec<u8>>,
    /// Enqueue time in milliseconds since the Unix epoch. Defines global
    /// replay order across all entities.
    pub timestamp: u64,
    /// Per-store sequence number; breaks ties between entries enqueued in
    /// the same millisecond.
    pub seq: u64,
    /// Number of failed sync attempts so far.
    pub retry_count: u32,
}

impl PendingChange {
    /// Returns the global replay ordering key (oldest first).
    pub fn order_key(&self) -> (u64, u64) {
        (self.timestamp, self.seq)
    }
}
