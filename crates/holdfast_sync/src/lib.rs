//! # Holdfast Sync
//!
//! Connectivity monitoring and the journal drain engine for Holdfast.
//!
//! This crate provides:
//! - Connectivity state and an observer registry for transitions
//! - A remote transport abstraction (HTTP client trait + REST mapping)
//! - The drain engine that replays the pending-change journal
//!
//! ## Architecture
//!
//! The engine implements a **single-flight FIFO drain**: when triggered
//! (manually or by an offline-to-online transition), it replays the whole
//! journal against the remote service oldest-first, one entry at a time.
//! A failing entry is retried on the next pass; it never aborts the pass
//! and never leaves the journal except by explicit success (or the opt-in
//! retry cap).
//!
//! ## Key Invariants
//!
//! - At most one drain pass runs at a time
//! - Replay order is global enqueue order across all entities
//! - Per-item failures are bookkeeping, not errors
//! - The engine performs no probing; connectivity is signal-driven

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod connectivity;
mod engine;
mod error;
mod remote;

pub use config::SyncConfig;
pub use connectivity::{ConnectivityMonitor, Subscription};
pub use engine::{DrainReport, SyncEngine};
pub use error::{SyncError, SyncResult};
pub use remote::{HttpClient, HttpMethod, HttpRequest, HttpResponse, MockRemote, Remote, RestRemote};
