//! Events: the discrete records batched into blocks.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::canonical::{canonicalize_payload, PayloadEncoding};
use crate::digest::{Digest, Hasher};
use crate::error::Result;

/// An event identifier, `digest(canonical(payload))`.
///
/// Byte-identical canonical payloads share an id. Nothing deduplicates them.
pub type EventId = Digest;

/// A submitted record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// Content address of the canonical payload.
    pub id: EventId,
    /// Canonical payload bytes.
    pub payload: Bytes,
    /// When the event entered the queue (Unix ms).
    pub enqueued_at: i64,
}

impl Event {
    /// Canonicalize `payload` and derive its id.
    pub fn new(
        hasher: &Hasher,
        encoding: PayloadEncoding,
        payload: &[u8],
        max_payload_bytes: usize,
        enqueued_at: i64,
    ) -> Result<Self> {
        let canonical = canonicalize_payload(encoding, payload, max_payload_bytes)?;
        Ok(Self::from_canonical(hasher, Bytes::from(canonical), enqueued_at))
    }

    /// Build an event from bytes that are already canonical.
    pub fn from_canonical(hasher: &Hasher, payload: Bytes, enqueued_at: i64) -> Self {
        Self {
            id: hasher.digest(&payload),
            payload,
            enqueued_at,
        }
    }
}
