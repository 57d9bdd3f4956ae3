//! Block construction from the pending queue.

use std::sync::Arc;

use ahin_kernel_core::{Block, ChainHead, Clock, Hasher};

use crate::chain::ChainStore;
use crate::queue::EventQueue;

/// Drains a batch from the queue and seals it onto a chain head.
///
/// The builder does not append; the caller owns the chain and appends the
/// returned block. Events drained here are gone from the queue even if the
/// caller later fails.
pub struct BlockBuilder {
    hasher: Hasher,
    batch_size: usize,
    clock: Arc<dyn Clock>,
}

impl BlockBuilder {
    /// Create a builder producing blocks of at most `batch_size` events.
    pub fn new(hasher: Hasher, batch_size: usize, clock: Arc<dyn Clock>) -> Self {
        Self {
            hasher,
            batch_size,
            clock,
        }
    }

    /// Maximum events per block.
    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Build the next block for `chain`, or `None` if nothing is pending.
    pub fn build(&self, queue: &EventQueue, chain: &ChainStore) -> Option<Block> {
        self.build_on(queue, chain.head())
    }

    /// Build a block extending an explicit head.
    pub fn build_on(&self, queue: &EventQueue, head: ChainHead) -> Option<Block> {
        let events = queue.drain(self.batch_size);
        if events.is_empty() {
            return None;
        }

        let block = Block::seal(
            &self.hasher,
            head.next_sequence,
            head.prev_block_hash,
            self.clock.now_millis(),
            events,
        );

        tracing::debug!(
            sequence = block.sequence(),
            events = block.event_count(),
            merkle_root = %block.merkle_root(),
            "block sealed"
        );
        Some(block)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ahin_kernel_core::{Digest, DigestAlgorithm, ManualClock, PayloadEncoding};

    fn setup(batch: usize) -> (EventQueue, ChainStore, BlockBuilder, Arc<ManualClock>) {
        let hasher = Hasher::new(DigestAlgorithm::Keccak256);
        let clock = Arc::new(ManualClock::new(1_000));
        let queue = EventQueue::new(hasher, PayloadEncoding::Json, 1024, clock.clone());
        let chain = ChainStore::new(hasher);
        let builder = BlockBuilder::new(hasher, batch, clock.clone());
        (queue, chain, builder, clock)
    }

    #[test]
    fn test_empty_queue_builds_nothing() {
        let (queue, chain, builder, _) = setup(10);
        assert!(builder.build(&queue, &chain).is_none());
        assert_eq!(chain.len(), 0);
    }

    #[test]
    fn test_genesis_block() {
        let (queue, chain, builder, _) = setup(10);
        queue.enqueue(br#"{"a":1}"#).unwrap();
        let block = builder.build(&queue, &chain).unwrap();
        assert_eq!(block.sequence(), 1);
        assert_eq!(*block.prev_block_hash(), Digest::ZERO);
        assert_eq!(block.timestamp(), 1_000);
        assert_eq!(block.event_count(), 1);
        assert_eq!(block.merkle_root(), &block.events()[0].id);
    }

    #[test]
    fn test_batch_size_bounds_block() {
        let (queue, mut chain, builder, clock) = setup(4);
        for i in 0..10 {
            queue.enqueue(format!("{{\"i\":{i}}}").as_bytes()).unwrap();
        }

        let mut counts = Vec::new();
        while let Some(block) = builder.build(&queue, &chain) {
            counts.push(block.event_count());
            chain.append(block).unwrap();
            clock.advance(1);
        }
        assert_eq!(counts, vec![4, 4, 2]);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_sequential_blocks_link() {
        let (queue, mut chain, builder, clock) = setup(100);
        let hasher = Hasher::new(DigestAlgorithm::Keccak256);

        queue.enqueue(br#"{"batch":1}"#).unwrap();
        let b1 = builder.build(&queue, &chain).unwrap();
        chain.append(b1.clone()).unwrap();

        clock.advance(5_000);
        queue.enqueue(br#"{"batch":2}"#).unwrap();
        let b2 = builder.build(&queue, &chain).unwrap();

        let expected = hasher.digest_parts(&[
            b1.merkle_root().as_bytes(),
            b1.prev_block_hash().as_bytes(),
            &b1.timestamp().to_be_bytes(),
        ]);
        assert_eq!(*b2.prev_block_hash(), expected);
        assert_eq!(b2.sequence(), 2);
    }
}
