//! # Holdfast Storage
//!
//! Durable log medium trait and implementations for Holdfast.
//!
//! This crate provides the lowest-level storage abstraction for Holdfast.
//! Log backends are **opaque byte logs** - they do not interpret the data
//! they store.
//!
//! ## Design Principles
//!
//! - Backends are simple append-only byte logs (read, append, flush, replace)
//! - No knowledge of Holdfast record framing, snapshots, or the journal
//! - Must be `Send + Sync` for concurrent access
//! - The store crate owns all record interpretation
//!
//! ## Available Backends
//!
//! - [`MemoryLog`] - For testing and ephemeral state
//! - [`FileLog`] - For persistent storage using OS file APIs
//!
//! ## Example
//!
//! ```rust
//! use holdfast_storage::{LogBackend, MemoryLog};
//!
//! let mut log = MemoryLog::new();
//! log.append(b"hello").unwrap();
//! log.append(b" world").unwrap();
//! assert_eq!(log.read_all().unwrap(), b"hello world");
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod backend;
mod error;
mod file;
mod memory;

pub use backend::LogBackend;
pub use error::{StorageError, StorageResult};
pub use file::FileLog;
pub use memory::MemoryLog;
