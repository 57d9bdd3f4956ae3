//! In-memory implementation of the Journal trait.
//!
//! This is primarily for testing. It has the same semantics as SQLite
//! but keeps everything in memory with no persistence.

use std::collections::BTreeMap;
use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;

use ahin_kernel_core::{Block, BlockParts, DigestAlgorithm, ExternalRef};

use crate::error::{Result, StoreError};
use crate::traits::{AnchoredEntry, Journal};

/// In-memory journal.
///
/// All data is lost when the journal is dropped. Thread-safe via RwLock.
pub struct MemoryJournal {
    inner: RwLock<MemoryJournalInner>,
}

#[derive(Default)]
struct MemoryJournalInner {
    algorithm: Option<DigestAlgorithm>,
    blocks: BTreeMap<u64, BlockParts>,
    anchors: BTreeMap<u64, AnchoredEntry>,
}

impl MemoryJournal {
    /// Create a new empty in-memory journal.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(MemoryJournalInner::default()),
        }
    }
}

impl Default for MemoryJournal {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Journal for MemoryJournal {
    async fn digest_algorithm(&self) -> Result<Option<DigestAlgorithm>> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        Ok(inner.algorithm)
    }

    async fn set_digest_algorithm(&self, algorithm: DigestAlgorithm) -> Result<()> {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        inner.algorithm = Some(algorithm);
        Ok(())
    }

    async fn append_block(&self, block: &Block) -> Result<()> {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);

        if let Some(existing) = inner.blocks.get(&block.sequence()) {
            if existing.block_hash == *block.block_hash() {
                return Ok(());
            }
            return Err(StoreError::Conflict {
                sequence: block.sequence(),
                existing: existing.block_hash.to_string(),
            });
        }

        inner.blocks.insert(block.sequence(), block.to_parts());
        Ok(())
    }

    async fn mark_anchored(
        &self,
        sequence: u64,
        external_ref: &ExternalRef,
        anchored_at: i64,
    ) -> Result<()> {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);

        if !inner.blocks.contains_key(&sequence) {
            return Err(StoreError::InvalidData(format!(
                "cannot anchor unknown block {sequence}"
            )));
        }

        inner.anchors.entry(sequence).or_insert_with(|| AnchoredEntry {
            sequence,
            external_ref: external_ref.clone(),
            anchored_at,
        });
        Ok(())
    }

    async fn load_blocks(&self) -> Result<Vec<BlockParts>> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        Ok(inner.blocks.values().cloned().collect())
    }

    async fn load_anchors(&self) -> Result<Vec<AnchoredEntry>> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        Ok(inner.anchors.values().cloned().collect())
    }
}
