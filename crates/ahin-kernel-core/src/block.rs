//! Blocks: immutable batches of events linked into a chain.
//!
//! ```text
//! block_hash = digest(merkle_root || prev_block_hash || timestamp_be_i64)
//! ```
//!
//! The genesis block links to [`Digest::ZERO`]. A block never changes after
//! [`Block::seal`]; the only way to get one from persisted data is
//! [`Block::restore`], which re-derives both the root and the hash.

use serde::{Deserialize, Serialize};

use crate::digest::{Digest, Hasher};
use crate::error::{CoreError, Result};
use crate::event::{Event, EventId};
use crate::merkle::{self, InclusionProof};

/// Number of hex characters of the block hash used in the metadata reference.
const METADATA_REF_HEX_LEN: usize = 46;

/// An immutable, hash-linked batch of events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Block {
    sequence: u64,
    merkle_root: Digest,
    prev_block_hash: Digest,
    timestamp: i64,
    events: Vec<Event>,
    event_count: u64,
    block_hash: Digest,
}

impl Block {
    /// Compute the hash that links a block into the chain.
    pub fn compute_hash(
        hasher: &Hasher,
        merkle_root: &Digest,
        prev_block_hash: &Digest,
        timestamp: i64,
    ) -> Digest {
        hasher.digest_parts(&[
            merkle_root.as_bytes(),
            prev_block_hash.as_bytes(),
            &timestamp.to_be_bytes(),
        ])
    }

    /// Commit `events` and seal the block.
    pub fn seal(
        hasher: &Hasher,
        sequence: u64,
        prev_block_hash: Digest,
        timestamp: i64,
        events: Vec<Event>,
    ) -> Self {
        let leaves: Vec<Digest> = events.iter().map(|e| e.id).collect();
        let merkle_root = merkle::compute_root(hasher, &leaves);
        let block_hash = Self::compute_hash(hasher, &merkle_root, &prev_block_hash, timestamp);

        Self {
            sequence,
            merkle_root,
            prev_block_hash,
            timestamp,
            event_count: events.len() as u64,
            events,
            block_hash,
        }
    }

    /// Rebuild a block from persisted parts, checking the stored hash.
    pub fn restore(hasher: &Hasher, parts: BlockParts) -> Result<Self> {
        if parts.sequence == 0 {
            return Err(CoreError::MalformedBlock("sequence must be >= 1".into()));
        }
        if parts.events.is_empty() {
            return Err(CoreError::MalformedBlock(format!(
                "block {} has no events",
                parts.sequence
            )));
        }

        if let Some(bad) = parts
            .events
            .iter()
            .find(|e| hasher.digest(&e.payload) != e.id)
        {
            return Err(CoreError::MalformedBlock(format!(
                "block {} holds event {} whose payload does not hash to its id",
                parts.sequence, bad.id
            )));
        }

        let stored = parts.block_hash;
        let block = Self::seal(
            hasher,
            parts.sequence,
            parts.prev_block_hash,
            parts.timestamp,
            parts.events,
        );

        if block.block_hash != stored {
            return Err(CoreError::BlockHashMismatch {
                sequence: block.sequence,
                stored: stored.to_string(),
                derived: block.block_hash.to_string(),
            });
        }
        Ok(block)
    }

    /// Decompose into persistable parts.
    pub fn to_parts(&self) -> BlockParts {
        BlockParts {
            sequence: self.sequence,
            prev_block_hash: self.prev_block_hash,
            timestamp: self.timestamp,
            events: self.events.clone(),
            block_hash: self.block_hash,
        }
    }

    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    pub fn merkle_root(&self) -> &Digest {
        &self.merkle_root
    }

    pub fn prev_block_hash(&self) -> &Digest {
        &self.prev_block_hash
    }

    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn event_count(&self) -> u64 {
        self.event_count
    }

    pub fn block_hash(&self) -> &Digest {
        &self.block_hash
    }

    /// Leaf digests in commitment order.
    pub fn leaves(&self) -> Vec<Digest> {
        self.events.iter().map(|e| e.id).collect()
    }

    /// Index of the first event with the given id.
    pub fn position_of(&self, id: &EventId) -> Option<usize> {
        self.events.iter().position(|e| &e.id == id)
    }

    /// Inclusion proof for the first event with the given id.
    pub fn proof_for(&self, hasher: &Hasher, id: &EventId) -> Option<InclusionProof> {
        let index = self.position_of(id)?;
        let siblings = merkle::build_proof(hasher, &self.leaves(), index)?;
        Some(InclusionProof {
            leaf: *id,
            index: index as u64,
            siblings,
            block_sequence: self.sequence,
            merkle_root: self.merkle_root,
        })
    }

    /// Content reference handed to the ledger alongside the root.
    pub fn metadata_ref(&self) -> String {
        format!("ipfs://Qm{}", &self.block_hash.to_hex()[..METADATA_REF_HEX_LEN])
    }

    /// Lightweight view without the event bodies.
    pub fn summary(&self) -> BlockSummary {
        BlockSummary {
            sequence: self.sequence,
            merkle_root: self.merkle_root,
            prev_block_hash: self.prev_block_hash,
            block_hash: self.block_hash,
            event_count: self.event_count,
            timestamp: self.timestamp,
        }
    }
}

/// The persisted form of a block. Root and count are derived on restore.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockParts {
    pub sequence: u64,
    pub prev_block_hash: Digest,
    pub timestamp: i64,
    pub events: Vec<Event>,
    pub block_hash: Digest,
}

/// Block header fields without the events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockSummary {
    pub sequence: u64,
    pub merkle_root: Digest,
    pub prev_block_hash: Digest,
    pub block_hash: Digest,
    pub event_count: u64,
    pub timestamp: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canonical::PayloadEncoding;
    use crate::digest::DigestAlgorithm;

    fn hasher() -> Hasher {
        Hasher::new(DigestAlgorithm::Keccak256)
    }

    fn events(range: std::ops::Range<u32>) -> Vec<Event> {
        range
            .map(|n| {
                let payload = format!("{{\"n\":{n}}}");
                Event::new(&hasher(), PayloadEncoding::Json, payload.as_bytes(), 1024, 0).unwrap()
            })
            .collect()
    }

    #[test]
    fn test_seal_golden_block() {
        let block = Block::seal(&hasher(), 1, Digest::ZERO, 1_700_000_000_000, events(1..4));
        assert_eq!(
            block.merkle_root().to_hex(),
            "d380890e2ab92d307007026ed1b5f004b1d1ba6e40b7dfef57b9461352ece90a"
        );
        assert_eq!(
            block.block_hash().to_hex(),
            "361cb568013b1810bc99f38b7f6414338a1c4cc19942854c46a2d5fb47de1e05"
        );
        assert_eq!(
            block.metadata_ref(),
            "ipfs://Qm361cb568013b1810bc99f38b7f6414338a1c4cc1994285"
        );
        assert_eq!(block.event_count(), 3);
    }

    #[test]
    fn test_hash_covers_every_field() {
        let h = hasher();
        let base = Block::seal(&h, 1, Digest::ZERO, 10, events(1..3));
        let other_ts = Block::seal(&h, 1, Digest::ZERO, 11, events(1..3));
        let other_prev = Block::seal(&h, 1, *base.block_hash(), 10, events(1..3));
        let other_events = Block::seal(&h, 1, Digest::ZERO, 10, events(2..4));
        assert_ne!(base.block_hash(), other_ts.block_hash());
        assert_ne!(base.block_hash(), other_prev.block_hash());
        assert_ne!(base.block_hash(), other_events.block_hash());
    }

    #[test]
    fn test_restore_roundtrip_and_tamper() {
        let h = hasher();
        let block = Block::seal(&h, 2, h.digest(b"prev"), 99, events(1..6));
        let restored = Block::restore(&h, block.to_parts()).unwrap();
        assert_eq!(restored, block);

        let mut parts = block.to_parts();
        parts.timestamp += 1;
        assert!(matches!(
            Block::restore(&h, parts),
            Err(CoreError::BlockHashMismatch { sequence: 2, .. })
        ));

        let mut forged = block.to_parts();
        forged.events[0].payload = bytes::Bytes::from_static(br#"{"n":99}"#);
        assert!(matches!(Block::restore(&h, forged), Err(CoreError::MalformedBlock(_))));

        let mut empty = block.to_parts();
        empty.events.clear();
        assert!(matches!(Block::restore(&h, empty), Err(CoreError::MalformedBlock(_))));
    }

    #[test]
    fn test_proof_for_every_event() {
        let h = hasher();
        let block = Block::seal(&h, 1, Digest::ZERO, 0, events(0..9));
        for event in block.events() {
            let proof = block.proof_for(&h, &event.id).unwrap();
            assert_eq!(proof.block_sequence, 1);
            assert!(proof.verify(&h));
        }
        assert!(block.proof_for(&h, &h.digest(b"absent")).is_none());
    }
}
