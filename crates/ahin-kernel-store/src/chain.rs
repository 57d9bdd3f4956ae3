//! The append-only chain of committed blocks.

use std::collections::HashMap;

use ahin_kernel_core::{Block, BlockParts, ChainHead, EventId, Hasher, InclusionProof};
use serde::{Deserialize, Serialize};

use crate::error::{Result, StoreError};
use crate::queue::EventQueue;

/// Counters over the chain and the queue feeding it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ChainStats {
    pub block_count: u64,
    pub total_events: u64,
    pub pending_events: u64,
}

/// Strictly ordered, append-only sequence of blocks.
///
/// Keeps an `event id -> block index` map so proof lookups do not scan. When an
/// id occurs more than once, the earliest block wins.
#[derive(Debug)]
pub struct ChainStore {
    hasher: Hasher,
    blocks: Vec<Block>,
    index: HashMap<EventId, usize>,
    total_events: u64,
}

impl ChainStore {
    /// Create an empty chain.
    pub fn new(hasher: Hasher) -> Self {
        Self {
            hasher,
            blocks: Vec::new(),
            index: HashMap::new(),
            total_events: 0,
        }
    }

    /// Rebuild a chain from persisted blocks, re-checking every hash and link.
    pub fn restore(hasher: Hasher, parts: Vec<BlockParts>) -> Result<Self> {
        let mut chain = Self::new(hasher);
        for part in parts {
            let block = Block::restore(&hasher, part)?;
            chain.append(block)?;
        }
        Ok(chain)
    }

    /// The hasher this chain was built with.
    pub fn hasher(&self) -> &Hasher {
        &self.hasher
    }

    /// Number of blocks.
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    /// Whether the chain has no blocks.
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// The most recent block.
    pub fn last(&self) -> Option<&Block> {
        self.blocks.last()
    }

    /// Block by 1-based sequence number.
    pub fn get(&self, sequence: u64) -> Option<&Block> {
        let idx = usize::try_from(sequence).ok()?.checked_sub(1)?;
        self.blocks.get(idx)
    }

    /// All blocks in order.
    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    /// Where the next block must attach.
    pub fn head(&self) -> ChainHead {
        match self.blocks.last() {
            Some(last) => ChainHead {
                next_sequence: last.sequence() + 1,
                prev_block_hash: *last.block_hash(),
            },
            None => ChainHead::GENESIS,
        }
    }

    /// Append a block that extends the current head.
    pub fn append(&mut self, block: Block) -> Result<()> {
        let head = self.head();

        if block.sequence() != head.next_sequence {
            return Err(self.violation(
                block.sequence(),
                format!("expected sequence {}, got {}", head.next_sequence, block.sequence()),
            ));
        }
        if *block.prev_block_hash() != head.prev_block_hash {
            return Err(self.violation(
                block.sequence(),
                format!(
                    "prev_block_hash {} does not match head {}",
                    block.prev_block_hash(),
                    head.prev_block_hash
                ),
            ));
        }

        let position = self.blocks.len();
        for event in block.events() {
            self.index.entry(event.id).or_insert(position);
        }
        self.total_events += block.event_count();
        self.blocks.push(block);
        Ok(())
    }

    /// The block containing `id`.
    pub fn find_block_containing(&self, id: &EventId) -> Result<&Block> {
        self.index
            .get(id)
            .map(|&i| &self.blocks[i])
            .ok_or(StoreError::NotFound(*id))
    }

    /// Inclusion proof for `id` against its block's root.
    pub fn proof_for(&self, id: &EventId) -> Result<InclusionProof> {
        let block = self.find_block_containing(id)?;
        block
            .proof_for(&self.hasher, id)
            .ok_or(StoreError::NotFound(*id))
    }

    /// Re-check the link between every adjacent pair of blocks.
    pub fn verify_linkage(&self) -> Result<()> {
        for pair in self.blocks.windows(2) {
            let (prev, next) = (&pair[0], &pair[1]);
            if next.prev_block_hash() != prev.block_hash()
                || next.sequence() != prev.sequence() + 1
            {
                return Err(StoreError::ChainIntegrityViolation {
                    sequence: next.sequence(),
                    reason: format!("broken link after block {}", prev.sequence()),
                });
            }
        }
        Ok(())
    }

    /// Block and event counters, including what is still queued.
    pub fn stats(&self, queue: &EventQueue) -> ChainStats {
        ChainStats {
            block_count: self.blocks.len() as u64,
            total_events: self.total_events,
            pending_events: queue.len() as u64,
        }
    }

    fn violation(&self, sequence: u64, reason: String) -> StoreError {
        tracing::error!(sequence, chain_len = self.blocks.len(), %reason, "chain integrity violation");
        StoreError::ChainIntegrityViolation { sequence, reason }
    }
}
