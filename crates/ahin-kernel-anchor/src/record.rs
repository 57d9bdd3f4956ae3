//! Per-block anchoring status.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use ahin_kernel_core::ExternalRef;

/// External-commitment status of one block.
///
/// Created unanchored when the block is built. It flips to anchored exactly
/// once, on the first confirmed commit, and never flips back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnchorRecord {
    /// Sequence number of the block.
    pub block: u64,
    pub anchored: bool,
    pub external_ref: Option<ExternalRef>,
    /// When the commit was confirmed (Unix ms).
    pub anchored_at: Option<i64>,
    /// Commit attempts so far, successful or not.
    pub attempts: u32,
    pub last_error: Option<String>,
}

impl AnchorRecord {
    fn pending(block: u64) -> Self {
        Self {
            block,
            anchored: false,
            external_ref: None,
            anchored_at: None,
            attempts: 0,
            last_error: None,
        }
    }
}

/// Anchor records for every block, keyed by sequence.
#[derive(Debug, Default)]
pub struct AnchorLog {
    records: BTreeMap<u64, AnchorRecord>,
}

impl AnchorLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track a freshly built block. Opening an existing record is a no-op.
    pub fn open(&mut self, block: u64) -> &AnchorRecord {
        self.records
            .entry(block)
            .or_insert_with(|| AnchorRecord::pending(block))
    }

    /// Record a confirmed commit.
    ///
    /// Returns `true` if this call flipped the record; `false` if it was
    /// already anchored, in which case the original reference is kept.
    pub fn mark_anchored(&mut self, block: u64, external_ref: ExternalRef, anchored_at: i64) -> bool {
        let record = self
            .records
            .entry(block)
            .or_insert_with(|| AnchorRecord::pending(block));
        if record.anchored {
            return false;
        }
        record.anchored = true;
        record.external_ref = Some(external_ref);
        record.anchored_at = Some(anchored_at);
        record.last_error = None;
        true
    }

    /// Count one commit attempt against `block`.
    pub fn record_attempt(&mut self, block: u64) {
        if let Some(record) = self.records.get_mut(&block) {
            record.attempts = record.attempts.saturating_add(1);
        }
    }

    /// Remember why the latest attempt failed.
    pub fn record_failure(&mut self, block: u64, error: impl Into<String>) {
        if let Some(record) = self.records.get_mut(&block) {
            record.last_error = Some(error.into());
        }
    }

    pub fn get(&self, block: u64) -> Option<&AnchorRecord> {
        self.records.get(&block)
    }

    /// Unanchored block sequences, oldest first.
    pub fn pending(&self) -> Vec<u64> {
        self.records
            .values()
            .filter(|r| !r.anchored)
            .map(|r| r.block)
            .collect()
    }

    pub fn unanchored_count(&self) -> u64 {
        self.records.values().filter(|r| !r.anchored).count() as u64
    }

    pub fn anchored_count(&self) -> u64 {
        self.records.values().filter(|r| r.anchored).count() as u64
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// All records in block order.
    pub fn records(&self) -> impl Iterator<Item = &AnchorRecord> {
        self.records.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ext(n: u64) -> ExternalRef {
        ExternalRef {
            tx_hash: format!("0x{n:064x}"),
            ledger_block: n,
        }
    }

    #[test]
    fn test_open_is_pending() {
        let mut log = AnchorLog::new();
        let record = log.open(1).clone();
        assert!(!record.anchored);
        assert!(record.external_ref.is_none());
        assert_eq!(log.pending(), vec![1]);
    }

    #[test]
    fn test_mark_anchored_once() {
        let mut log = AnchorLog::new();
        log.open(1);
        assert!(log.mark_anchored(1, ext(10), 100));
        assert!(!log.mark_anchored(1, ext(11), 200));

        let record = log.get(1).unwrap();
        assert!(record.anchored);
        assert_eq!(record.external_ref, Some(ext(10)));
        assert_eq!(record.anchored_at, Some(100));
        assert!(log.pending().is_empty());
    }

    #[test]
    fn test_pending_is_oldest_first() {
        let mut log = AnchorLog::new();
        for seq in [3, 1, 4, 2] {
            log.open(seq);
        }
        log.mark_anchored(2, ext(1), 0);
        assert_eq!(log.pending(), vec![1, 3, 4]);
        assert_eq!(log.unanchored_count(), 3);
        assert_eq!(log.anchored_count(), 1);
    }

    #[test]
    fn test_attempts_and_errors() {
        let mut log = AnchorLog::new();
        log.open(1);
        log.record_attempt(1);
        log.record_failure(1, "ledger unavailable");
        log.record_attempt(1);
        log.mark_anchored(1, ext(5), 9);

        let record = log.get(1).unwrap();
        assert_eq!(record.attempts, 2);
        assert!(record.last_error.is_none());

        log.record_attempt(99);
        assert!(log.get(99).is_none());
    }
}
