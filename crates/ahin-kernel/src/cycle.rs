//! The anchor cycle.
//!
//! ```text
//! Idle ─► Retrying ─► Building ─► Anchoring ─► Idle
//!            │            │            │
//!            └ stop at    └ nothing    └ commit ok: anchored
//!              first        pending      commit err / timeout: stays pending
//!              failure
//! ```
//!
//! Unanchored blocks are always committed oldest first. A new block is still
//! built and appended while an older one is stuck, but its commit waits.

use serde::{Deserialize, Serialize};

use ahin_kernel_anchor::AnchorError;
use ahin_kernel_core::BlockSummary;
use ahin_kernel_store::StoreError;

use crate::error::Result;
use crate::kernel::Kernel;

/// What a call to [`Kernel::trigger_anchor_cycle`] did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CycleOutcome {
    /// Another cycle was in flight; this trigger did nothing.
    Busy,
    /// The cycle ran to completion.
    Ran(CycleReport),
}

impl CycleOutcome {
    pub fn is_busy(&self) -> bool {
        matches!(self, Self::Busy)
    }

    pub fn report(&self) -> Option<&CycleReport> {
        match self {
            Self::Busy => None,
            Self::Ran(report) => Some(report),
        }
    }
}

/// Result of one completed cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleReport {
    /// The block built this cycle, if any events were pending.
    pub built: Option<BlockSummary>,
    /// Sequences confirmed by the ledger this cycle.
    pub anchored: Vec<u64>,
    /// Sequences whose commit failed or timed out.
    pub failed: Vec<u64>,
    /// Sequences not attempted because an older block is still unanchored.
    pub deferred: Vec<u64>,
}

impl CycleReport {
    /// Nothing was built and nothing was attempted.
    pub fn is_idle(&self) -> bool {
        self.built.is_none() && self.anchored.is_empty() && self.failed.is_empty()
    }
}

impl Kernel {
    /// Run one anchor cycle now, unless one is already running.
    ///
    /// Timer ticks and manual triggers share this entry point. Ledger failures
    /// are absorbed into the report and the blocks' anchor records. Errors are
    /// returned only for chain integrity violations and journal failures.
    pub async fn trigger_anchor_cycle(&self) -> Result<CycleOutcome> {
        let Ok(_guard) = self.cycle.try_lock() else {
            tracing::debug!("anchor cycle already in flight");
            return Ok(CycleOutcome::Busy);
        };

        let report = self.run_cycle().await?;
        if report.is_idle() {
            tracing::debug!(deferred = report.deferred.len(), "anchor cycle idle");
        }
        Ok(CycleOutcome::Ran(report))
    }

    async fn run_cycle(&self) -> Result<CycleReport> {
        let mut report = CycleReport::default();

        self.persist_blocks().await?;

        let mut blocked = false;
        let pending = self.anchors_read().pending();
        for sequence in pending {
            if blocked {
                report.deferred.push(sequence);
            } else if self.anchor_block(sequence).await? {
                report.anchored.push(sequence);
            } else {
                report.failed.push(sequence);
                blocked = true;
            }
        }

        let Some(summary) = self.build_and_append()? else {
            return Ok(report);
        };
        report.built = Some(summary);

        self.persist_blocks().await?;

        if blocked {
            tracing::debug!(
                sequence = summary.sequence,
                "new block waits behind an unanchored predecessor"
            );
            report.deferred.push(summary.sequence);
        } else if self.anchor_block(summary.sequence).await? {
            report.anchored.push(summary.sequence);
        } else {
            report.failed.push(summary.sequence);
        }

        Ok(report)
    }

    /// Drain a batch, seal it and append it. The chain lock is held throughout.
    fn build_and_append(&self) -> Result<Option<BlockSummary>> {
        let summary = {
            let mut chain = self.chain_write();
            let Some(block) = self.builder.build(&self.queue, &chain) else {
                return Ok(None);
            };
            let summary = block.summary();
            chain.append(block)?;
            // Lock order is chain then anchors.
            self.anchors_write().open(summary.sequence);
            summary
        };

        tracing::info!(
            sequence = summary.sequence,
            events = summary.event_count,
            merkle_root = %summary.merkle_root,
            block_hash = %summary.block_hash,
            "block appended"
        );
        Ok(Some(summary))
    }

    /// Commit one block. `Ok(false)` means the ledger did not confirm.
    async fn anchor_block(&self, sequence: u64) -> Result<bool> {
        let (merkle_root, event_count, metadata_ref) = {
            let chain = self.chain_read();
            let block = chain
                .get(sequence)
                .ok_or_else(|| StoreError::ChainIntegrityViolation {
                    sequence,
                    reason: "anchor record without a block".into(),
                })?;
            (*block.merkle_root(), block.event_count(), block.metadata_ref())
        };

        self.anchors_write().record_attempt(sequence);

        let timeout = self.config.commit_timeout;
        let committed = match tokio::time::timeout(
            timeout,
            self.client.commit(&merkle_root, event_count, &metadata_ref),
        )
        .await
        {
            Ok(res) => res,
            Err(_) => Err(AnchorError::Timeout(timeout)),
        };

        let external_ref = match committed {
            Ok(external_ref) => external_ref,
            Err(e) => {
                tracing::warn!(sequence, error = %e, "anchor commit failed; retrying next cycle");
                self.anchors_write().record_failure(sequence, e.to_string());
                return Ok(false);
            }
        };

        let anchored_at = self.clock.now_millis();
        let flipped = self
            .anchors_write()
            .mark_anchored(sequence, external_ref.clone(), anchored_at);
        if flipped {
            tracing::info!(
                sequence,
                tx_hash = %external_ref.tx_hash,
                ledger_block = external_ref.ledger_block,
                "block anchored"
            );
        }

        if let Some(journal) = &self.journal {
            if let Err(e) = journal.mark_anchored(sequence, &external_ref, anchored_at).await {
                // The ledger is idempotent, so a lost record only costs a re-commit after restart.
                tracing::warn!(sequence, error = %e, "failed to journal anchor");
            }
        }
        Ok(true)
    }
}
