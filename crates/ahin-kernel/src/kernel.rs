//! The Kernel: unified API for the AHIN batching engine.
//!
//! The Kernel owns the queue, the chain and the anchor bookkeeping, and wires
//! them to an injected [`AnchorClient`], [`Clock`] and optional [`Journal`].

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::{Deserialize, Serialize};

use ahin_kernel_anchor::{AnchorClient, AnchorLog, AnchorRecord};
use ahin_kernel_core::{
    Block, BlockSummary, Clock, EventId, Hasher, InclusionProof, SystemClock,
};
use ahin_kernel_store::{BlockBuilder, ChainStore, EventQueue, Journal, JournalExt};

use crate::config::KernelConfig;
use crate::error::Result;

/// Snapshot of chain, queue and anchoring counters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KernelStats {
    pub block_count: u64,
    pub total_events: u64,
    pub pending_events: u64,
    pub unanchored_blocks: u64,
    pub latest_block: Option<BlockSummary>,
}

/// Local anchoring state compared with what the ledger reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerStats {
    /// Blocks this kernel has seen confirmed.
    pub local_anchored: u64,
    /// Commitments the ledger holds.
    pub ledger_committed: u64,
    pub unanchored_blocks: u64,
}

impl LedgerStats {
    /// Whether the ledger holds exactly what this kernel anchored.
    pub fn in_sync(&self) -> bool {
        self.local_anchored == self.ledger_committed
    }
}

/// The main Kernel struct.
///
/// Provides a unified API for:
/// - Enqueueing events
/// - Looking up inclusion proofs for committed events
/// - Running anchor cycles (see [`Kernel::trigger_anchor_cycle`])
/// - Reconciling with the external ledger
///
/// Share it as `Arc<Kernel>`; every method takes `&self`.
pub struct Kernel {
    pub(crate) config: KernelConfig,
    pub(crate) hasher: Hasher,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) queue: EventQueue,
    pub(crate) builder: BlockBuilder,
    pub(crate) chain: RwLock<ChainStore>,
    pub(crate) anchors: RwLock<AnchorLog>,
    pub(crate) client: Arc<dyn AnchorClient>,
    pub(crate) journal: Option<Arc<dyn Journal>>,
    /// Highest block sequence known to be in the journal.
    pub(crate) journaled: AtomicU64,
    /// Held for the duration of one anchor cycle.
    pub(crate) cycle: tokio::sync::Mutex<()>,
}

impl Kernel {
    /// Create a memory-only kernel on the system clock.
    pub fn new(config: KernelConfig, client: Arc<dyn AnchorClient>) -> Result<Self> {
        Self::with_clock(config, client, Arc::new(SystemClock))
    }

    /// Create a memory-only kernel on an injected clock.
    pub fn with_clock(
        config: KernelConfig,
        client: Arc<dyn AnchorClient>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        config.validate()?;
        let hasher = config.hasher();
        Ok(Self::assemble(
            config,
            client,
            clock,
            None,
            ChainStore::new(hasher),
            AnchorLog::new(),
        ))
    }

    /// Open a journaled kernel, replaying whatever the journal already holds.
    pub async fn recover(
        config: KernelConfig,
        client: Arc<dyn AnchorClient>,
        journal: Arc<dyn Journal>,
    ) -> Result<Self> {
        Self::recover_with_clock(config, client, journal, Arc::new(SystemClock)).await
    }

    /// Like [`Kernel::recover`], on an injected clock.
    ///
    /// Every persisted block goes back through [`ChainStore::append`], so
    /// linkage and hashes are re-checked. Blocks without a persisted anchor
    /// come back unanchored and are retried by the next cycle.
    pub async fn recover_with_clock(
        config: KernelConfig,
        client: Arc<dyn AnchorClient>,
        journal: Arc<dyn Journal>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        config.validate()?;
        journal.bind_algorithm(config.digest).await?;

        let hasher = config.hasher();
        let chain = ChainStore::restore(hasher, journal.load_blocks().await?)?;

        let mut anchors = AnchorLog::new();
        for block in chain.blocks() {
            anchors.open(block.sequence());
        }
        for entry in journal.load_anchors().await? {
            anchors.mark_anchored(entry.sequence, entry.external_ref, entry.anchored_at);
        }

        tracing::info!(
            blocks = chain.len(),
            unanchored = anchors.unanchored_count(),
            digest = %config.digest,
            "kernel recovered from journal"
        );

        Ok(Self::assemble(config, client, clock, Some(journal), chain, anchors))
    }

    fn assemble(
        config: KernelConfig,
        client: Arc<dyn AnchorClient>,
        clock: Arc<dyn Clock>,
        journal: Option<Arc<dyn Journal>>,
        chain: ChainStore,
        anchors: AnchorLog,
    ) -> Self {
        let hasher = config.hasher();
        let queue = EventQueue::new(
            hasher,
            config.payload_encoding,
            config.max_payload_bytes,
            Arc::clone(&clock),
        );
        let builder = BlockBuilder::new(hasher, config.batch_size, Arc::clone(&clock));
        let journaled = chain.last().map(Block::sequence).unwrap_or(0);

        Self {
            config,
            hasher,
            clock,
            queue,
            builder,
            chain: RwLock::new(chain),
            anchors: RwLock::new(anchors),
            client,
            journal,
            journaled: AtomicU64::new(journaled),
            cycle: tokio::sync::Mutex::new(()),
        }
    }

    /// The configuration this kernel runs with.
    pub fn config(&self) -> &KernelConfig {
        &self.config
    }

    /// The hasher shared by every component.
    pub fn hasher(&self) -> &Hasher {
        &self.hasher
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Events and proofs
    // ─────────────────────────────────────────────────────────────────────────

    /// Canonicalize and queue a payload, returning its event id.
    ///
    /// Never waits on an anchor cycle; only the queue lock is taken.
    pub fn enqueue(&self, payload: &[u8]) -> Result<EventId> {
        Ok(self.queue.enqueue(payload)?)
    }

    /// Inclusion proof for a committed event.
    ///
    /// Pending and unknown ids are both `NotFound`.
    pub fn proof_for(&self, id: &EventId) -> Result<InclusionProof> {
        Ok(self.chain_read().proof_for(id)?)
    }

    /// Whether `id` is still waiting in the queue.
    pub fn is_pending(&self, id: &EventId) -> bool {
        self.queue.contains(id)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Queries
    // ─────────────────────────────────────────────────────────────────────────

    /// Current counters.
    pub fn stats(&self) -> KernelStats {
        let chain = self.chain_read();
        let chain_stats = chain.stats(&self.queue);
        KernelStats {
            block_count: chain_stats.block_count,
            total_events: chain_stats.total_events,
            pending_events: chain_stats.pending_events,
            unanchored_blocks: self.anchors_read().unanchored_count(),
            latest_block: chain.last().map(Block::summary),
        }
    }

    /// Copy of the block at `sequence`.
    pub fn block(&self, sequence: u64) -> Option<Block> {
        self.chain_read().get(sequence).cloned()
    }

    /// Summaries of every block, oldest first.
    pub fn block_summaries(&self) -> Vec<BlockSummary> {
        self.chain_read().blocks().iter().map(Block::summary).collect()
    }

    /// Anchoring status of the block at `sequence`.
    pub fn anchor_record(&self, sequence: u64) -> Option<AnchorRecord> {
        self.anchors_read().get(sequence).cloned()
    }

    /// Re-check the hash link between every pair of blocks.
    pub fn verify_chain(&self) -> Result<()> {
        Ok(self.chain_read().verify_linkage()?)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Ledger reconciliation
    // ─────────────────────────────────────────────────────────────────────────

    /// Compare local anchor counts with the ledger's committed count.
    pub async fn ledger_stats(&self) -> Result<LedgerStats> {
        let ledger_committed = self.client.current_committed_count().await?;
        let anchors = self.anchors_read();
        Ok(LedgerStats {
            local_anchored: anchors.anchored_count(),
            ledger_committed,
            unanchored_blocks: anchors.unanchored_count(),
        })
    }

    /// [`Kernel::ledger_stats`], warning when the two sides disagree.
    ///
    /// A ledger shared with other writers legitimately holds more; fewer means
    /// confirmed anchors were lost on the ledger side.
    pub async fn reconcile(&self) -> Result<LedgerStats> {
        let stats = self.ledger_stats().await?;
        if stats.in_sync() {
            tracing::debug!(anchored = stats.local_anchored, "ledger reconciled");
        } else {
            tracing::warn!(
                local_anchored = stats.local_anchored,
                ledger_committed = stats.ledger_committed,
                unanchored = stats.unanchored_blocks,
                "ledger committed count diverges from local anchors"
            );
        }
        Ok(stats)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Internal helpers
    // ─────────────────────────────────────────────────────────────────────────

    pub(crate) fn chain_read(&self) -> RwLockReadGuard<'_, ChainStore> {
        self.chain.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn chain_write(&self) -> RwLockWriteGuard<'_, ChainStore> {
        self.chain.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn anchors_read(&self) -> RwLockReadGuard<'_, AnchorLog> {
        self.anchors.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn anchors_write(&self) -> RwLockWriteGuard<'_, AnchorLog> {
        self.anchors.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Write every block not yet in the journal, oldest first.
    pub(crate) async fn persist_blocks(&self) -> Result<()> {
        let Some(journal) = &self.journal else {
            return Ok(());
        };

        let from = self.journaled.load(Ordering::SeqCst);
        let unwritten: Vec<Block> = self
            .chain_read()
            .blocks()
            .iter()
            .skip(from as usize)
            .cloned()
            .collect();

        for block in unwritten {
            if let Err(e) = journal.append_block(&block).await {
                tracing::error!(sequence = block.sequence(), error = %e, "journal append failed");
                return Err(e.into());
            }
            self.journaled.store(block.sequence(), Ordering::SeqCst);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::KernelError;
    use ahin_kernel_anchor::MemoryLedger;
    use ahin_kernel_core::ManualClock;

    fn kernel() -> Kernel {
        let config = KernelConfig::default();
        let ledger = Arc::new(MemoryLedger::new(config.hasher()));
        Kernel::with_clock(config, ledger, Arc::new(ManualClock::new(1_000))).unwrap()
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = KernelConfig {
            batch_size: 0,
            ..KernelConfig::default()
        };
        let ledger = Arc::new(MemoryLedger::new(config.hasher()));
        assert!(matches!(Kernel::new(config, ledger), Err(KernelError::Config(_))));
    }

    #[test]
    fn test_enqueue_rejects_invalid_payload() {
        let k = kernel();
        assert!(matches!(k.enqueue(b"{oops"), Err(KernelError::InvalidPayload(_))));
        assert!(matches!(k.enqueue(b""), Err(KernelError::InvalidPayload(_))));
        assert_eq!(k.stats().pending_events, 0);
    }

    #[test]
    fn test_pending_event_has_no_proof() {
        let k = kernel();
        let id = k.enqueue(br#"{"pending":true}"#).unwrap();
        assert!(k.is_pending(&id));
        assert!(matches!(k.proof_for(&id), Err(KernelError::NotFound(missing)) if missing == id));
    }

    #[test]
    fn test_fresh_stats() {
        let k = kernel();
        k.enqueue(b"[1]").unwrap();
        k.enqueue(b"[2]").unwrap();
        assert_eq!(
            k.stats(),
            KernelStats {
                block_count: 0,
                total_events: 0,
                pending_events: 2,
                unanchored_blocks: 0,
                latest_block: None,
            }
        );
        k.verify_chain().unwrap();
    }
}
