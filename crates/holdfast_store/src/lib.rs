//! # Holdfast Store
//!
//! Entity snapshots and the pending-change journal for Holdfast.
//!
//! This crate is the durability core of the offline layer. It keeps two
//! logical collections in one append-only log:
//!
//! - **Snapshots** - the latest known value per entity id
//! - **Pending-change journal** - the ordered log of mutations not yet
//!   acknowledged by the remote service
//!
//! ## Durability Model
//!
//! Every mutation is encoded as one length-prefixed CBOR record and appended
//! to the log before the call returns. Opening a store replays the log to
//! rebuild both collections. A truncated trailing record (crash mid-write)
//! is discarded; an undecodable record earlier in the log is corruption and
//! the store refuses to open.
//!
//! ## Key Invariants
//!
//! - Exactly one snapshot per entity id (last write replaces in place)
//! - Journal entries are append-only; only `retry_count` is ever mutated
//! - A journal entry leaves the journal only by explicit removal
//! - Replay is deterministic: the same log always yields the same state

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod error;
mod record;
mod store;
mod types;

pub use config::StoreConfig;
pub use error::{StoreError, StoreResult};
pub use record::{decode_records, encode_record, Record};
pub use store::LocalStore;
pub use types::{ChangeAction, EntitySnapshot, PendingChange, SyncStatus};
