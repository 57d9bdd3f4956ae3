//! Journal trait: the optional persistence collaborator.
//!
//! The chain itself lives in memory. A journal records every sealed block and
//! every confirmed anchor so a restarted process can rebuild the chain and
//! retry whatever was never anchored.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use ahin_kernel_core::{Block, BlockParts, DigestAlgorithm, ExternalRef};

use crate::error::{Result, StoreError};

/// A confirmed anchor as persisted by a journal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnchoredEntry {
    /// Sequence number of the anchored block.
    pub sequence: u64,
    /// Where the ledger recorded it.
    pub external_ref: ExternalRef,
    /// When the anchor was confirmed (Unix ms).
    pub anchored_at: i64,
}

/// Async interface for durable chain records.
///
/// # Design Notes
///
/// - **Idempotent appends**: appending a block already present with the same
///   hash succeeds; a different hash at the same sequence is a `Conflict`.
/// - **Idempotent anchors**: marking an already anchored block again is a no-op.
/// - **Ordered loads**: `load_blocks` returns blocks by ascending sequence.
#[async_trait]
pub trait Journal: Send + Sync {
    /// The digest algorithm the journal was created with, if recorded.
    async fn digest_algorithm(&self) -> Result<Option<DigestAlgorithm>>;

    /// Record the digest algorithm. Only called when none is recorded.
    async fn set_digest_algorithm(&self, algorithm: DigestAlgorithm) -> Result<()>;

    /// Persist a sealed block.
    async fn append_block(&self, block: &Block) -> Result<()>;

    /// Persist a confirmed anchor for the block at `sequence`.
    async fn mark_anchored(
        &self,
        sequence: u64,
        external_ref: &ExternalRef,
        anchored_at: i64,
    ) -> Result<()>;

    /// All persisted blocks, ordered by sequence.
    async fn load_blocks(&self) -> Result<Vec<BlockParts>>;

    /// All confirmed anchors, ordered by sequence.
    async fn load_anchors(&self) -> Result<Vec<AnchoredEntry>>;
}

/// Extension trait for common journal patterns.
pub trait JournalExt: Journal {
    /// Record `configured` on first use, or fail if a different one is recorded.
    fn bind_algorithm(
        &self,
        configured: DigestAlgorithm,
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

impl<J: Journal + ?Sized> JournalExt for J {
    async fn bind_algorithm(&self, configured: DigestAlgorithm) -> Result<()> {
        match self.digest_algorithm().await? {
            Some(stored) if stored != configured => Err(StoreError::AlgorithmMismatch {
                stored,
                configured,
            }),
            Some(_) => Ok(()),
            None => self.set_digest_algorithm(configured).await,
        }
    }
}
