//! Test fixtures and helpers.
//!
//! Common setup code for integration tests.

use std::sync::Arc;

use ahin_kernel::{CycleOutcome, CycleReport, Kernel, KernelConfig};
use ahin_kernel_anchor::MemoryLedger;
use ahin_kernel_core::{Block, Digest, EventId, Hasher, ManualClock};

use crate::vectors::{events, GOLDEN_T0};

/// A memory-only kernel wired to an in-memory ledger and a manual clock.
pub struct TestFixture {
    pub kernel: Arc<Kernel>,
    pub ledger: Arc<MemoryLedger>,
    pub clock: Arc<ManualClock>,
}

impl TestFixture {
    /// Default configuration, clock at [`GOLDEN_T0`].
    pub fn new() -> Self {
        Self::with_config(KernelConfig::default())
    }

    /// Custom configuration, clock at [`GOLDEN_T0`].
    pub fn with_config(config: KernelConfig) -> Self {
        let ledger = Arc::new(MemoryLedger::new(config.hasher()));
        let clock = Arc::new(ManualClock::new(GOLDEN_T0));
        let kernel = Kernel::with_clock(config, ledger.clone(), clock.clone())
            .expect("fixture config is valid");
        Self {
            kernel: Arc::new(kernel),
            ledger,
            clock,
        }
    }

    /// Enqueue `{"n":first}` through `{"n":last}`.
    pub fn enqueue_range(&self, first: u32, last: u32) -> Vec<EventId> {
        (first..=last)
            .map(|n| {
                self.kernel
                    .enqueue(format!("{{\"n\":{n}}}").as_bytes())
                    .expect("fixture payloads are valid")
            })
            .collect()
    }

    /// Run one cycle, panicking if another is in flight.
    pub async fn cycle(&self) -> CycleReport {
        match self.kernel.trigger_anchor_cycle().await {
            Ok(CycleOutcome::Ran(report)) => report,
            Ok(CycleOutcome::Busy) => panic!("anchor cycle unexpectedly busy"),
            Err(e) => panic!("anchor cycle failed: {e}"),
        }
    }

    /// Advance the kernel clock.
    pub fn advance(&self, millis: i64) {
        self.clock.advance(millis);
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}

/// Seal a linked chain of `blocks` blocks holding `per_block` events each.
///
/// Block `k` holds payloads continuing the `{"n":…}` numbering and is
/// timestamped `GOLDEN_T0 + (k - 1) * 1000`.
pub fn linked_chain(hasher: &Hasher, blocks: u32, per_block: u32) -> Vec<Block> {
    let mut prev = Digest::ZERO;
    (0..blocks)
        .map(|k| {
            let first = k * per_block + 1;
            let block = Block::seal(
                hasher,
                u64::from(k) + 1,
                prev,
                GOLDEN_T0 + i64::from(k) * 1_000,
                events(hasher, first, first + per_block - 1),
            );
            prev = *block.block_hash();
            block
        })
        .collect()
}
