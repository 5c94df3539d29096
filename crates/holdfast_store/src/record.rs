//! Durable record framing.
//!
//! Every mutation is one record in the log:
//!
//! ```text
//! | length (4, LE) | CBOR payload (N) |
//! ```
//!
//! ## Recovery Policy
//!
//! Replay distinguishes **tolerated** and **fatal** conditions:
//!
//! - A truncated trailing frame (fewer bytes than the length prefix
//!   promises, or a partial prefix) is a crash mid-write before flush
//!   completed. It is discarded and replay ends cleanly.
//! - An undecodable CBOR payload inside a complete frame is corruption.
//!   The store refuses to open rather than risk silent data loss.

use crate::error::{StoreError, StoreResult};
use crate::types::{EntitySnapshot, PendingChange};
use serde::{Deserialize, Serialize};

/// One durable mutation record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Record {
    /// A snapshot was written or overwritten.
    PutSnapshot(EntitySnapshot),
    /// A snapshot was removed.
    DeleteSnapshot {
        /// The entity id.
        id: String,
    },
    /// A journal entry was appended.
    AppendChange(PendingChange),
    /// A journal entry was removed (synced or abandoned).
    RemoveChange {
        /// The journal entry id.
        id: String,
    },
    /// A journal entry's retry count was incremented.
    BumpRetry {
        /// The journal entry id.
        id: String,
    },
}

/// Encodes a record as one length-prefixed CBOR frame.
pub fn encode_record(record: &Record) -> StoreResult<Vec<u8>> {
    let mut frame = vec![0u8; 4];
    ciborium::ser::into_writer(record, &mut frame)
        .map_err(|e| StoreError::codec(e.to_string()))?;

    let len = (frame.len() - 4) as u32;
    frame[..4].copy_from_slice(&len.to_le_bytes());
    Ok(frame)
}

/// Decodes all complete records from a log buffer.
///
/// Returns the decoded records and the number of bytes consumed. A
/// truncated trailing frame is dropped (consumed stops before it); an
/// undecodable payload in a complete frame is a [`StoreError::Corrupted`].
pub fn decode_records(buf: &[u8]) -> StoreResult<(Vec<Record>, usize)> {
    let mut records = Vec::new();
    let mut pos = 0usize;

    while buf.len() - pos >= 4 {
        let len = u32::from_le_bytes([buf[pos], buf[pos + 1], buf[pos + 2], buf[pos + 3]]) as usize;

        let body_start = pos + 4;
        let body_end = match body_start.checked_add(len) {
            Some(end) if end <= buf.len() => end,
            // Partial frame at the tail: crash mid-write, discard.
            _ => break,
        };

        let record: Record = ciborium::de::from_reader(&buf[body_start..body_end])
            .map_err(|e| StoreError::corrupted(format!("record at offset {pos}: {e}")))?;

        records.push(record);
        pos = body_end;
    }

    Ok((records, pos))
}
