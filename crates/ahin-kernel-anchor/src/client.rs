//! The external ledger seam.
//!
//! The kernel never talks to a ledger directly. It hands block summaries to an
//! [`AnchorClient`]; a real deployment binds one to its chain RPC, tests bind
//! [`memory::MemoryLedger`].

use async_trait::async_trait;

use ahin_kernel_core::{Digest, ExternalRef};

use crate::error::Result;

/// Capability to commit block summaries to a tamper-evident ledger.
///
/// Implementations must be thread-safe (Send + Sync). `commit` must be
/// idempotent for a repeated `(merkle_root, metadata_ref)`: the kernel retries
/// after timeouts without knowing whether the first attempt landed.
#[async_trait]
pub trait AnchorClient: Send + Sync {
    /// Commit a block summary and return where the ledger recorded it.
    async fn commit(
        &self,
        merkle_root: &Digest,
        event_count: u64,
        metadata_ref: &str,
    ) -> Result<ExternalRef>;

    /// Number of commitments the ledger currently holds.
    ///
    /// Used for reconciliation and statistics only.
    async fn current_committed_count(&self) -> Result<u64>;
}

/// An in-memory ledger for testing.
///
/// Anchors are numbered from 1 and empty blocks are refused, as on the anchor
/// contract. A repeated commitment returns the original reference instead of
/// anchoring twice, which is the idempotency [`AnchorClient::commit`] requires.
pub mod memory {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::{Mutex, MutexGuard, PoisonError};
    use std::time::Duration;

    use ahin_kernel_core::{merkle, Hasher};
    use serde::{Deserialize, Serialize};

    use crate::error::AnchorError;

    /// One commitment stored by the ledger.
    #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
    pub struct LedgerAnchor {
        /// 1-based position on the ledger.
        pub anchor_number: u64,
        pub merkle_root: Digest,
        pub event_count: u64,
        pub metadata_ref: String,
        pub external_ref: ExternalRef,
    }

    #[derive(Default)]
    struct LedgerState {
        anchors: Vec<LedgerAnchor>,
        by_commitment: HashMap<(Digest, String), usize>,
        fail_next: u32,
        offline: bool,
        latency: Duration,
    }

    /// In-memory ledger with failure and latency injection.
    pub struct MemoryLedger {
        hasher: Hasher,
        genesis_height: u64,
        state: Mutex<LedgerState>,
        commit_calls: AtomicU64,
    }

    impl MemoryLedger {
        /// Create an empty ledger whose transaction hashes use `hasher`.
        pub fn new(hasher: Hasher) -> Self {
            Self::with_height(hasher, 0)
        }

        /// Create an empty ledger whose first anchor lands at `genesis_height + 1`.
        pub fn with_height(hasher: Hasher, genesis_height: u64) -> Self {
            Self {
                hasher,
                genesis_height,
                state: Mutex::new(LedgerState::default()),
                commit_calls: AtomicU64::new(0),
            }
        }

        /// Fail the next `n` commit calls with [`AnchorError::Unavailable`].
        pub fn fail_next(&self, n: u32) {
            self.lock().fail_next = n;
        }

        /// Fail every commit while `offline` is set.
        pub fn set_offline(&self, offline: bool) {
            self.lock().offline = offline;
        }

        /// Delay every commit by `latency` before it is processed.
        pub fn set_latency(&self, latency: Duration) {
            self.lock().latency = latency;
        }

        /// Total commit calls received, including failed and repeated ones.
        pub fn commit_calls(&self) -> u64 {
            self.commit_calls.load(Ordering::SeqCst)
        }

        /// Snapshot of every stored commitment in anchor order.
        pub fn anchors(&self) -> Vec<LedgerAnchor> {
            self.lock().anchors.clone()
        }

        /// Commitment by 1-based anchor number.
        pub fn anchor(&self, anchor_number: u64) -> Option<LedgerAnchor> {
            let idx = usize::try_from(anchor_number).ok()?.checked_sub(1)?;
            self.lock().anchors.get(idx).cloned()
        }

        /// Check a leaf against a stored root the way the contract does.
        pub fn verify_inclusion(&self, anchor_number: u64, leaf: &Digest, siblings: &[Digest]) -> bool {
            match self.anchor(anchor_number) {
                Some(anchor) => merkle::verify(&self.hasher, leaf, siblings, &anchor.merkle_root),
                None => false,
            }
        }

        fn lock(&self) -> MutexGuard<'_, LedgerState> {
            self.state.lock().unwrap_or_else(PoisonError::into_inner)
        }
    }

    #[async_trait]
    impl AnchorClient for MemoryLedger {
        async fn commit(
            &self,
            merkle_root: &Digest,
            event_count: u64,
            metadata_ref: &str,
        ) -> Result<ExternalRef> {
            self.commit_calls.fetch_add(1, Ordering::SeqCst);

            let latency = self.lock().latency;
            if !latency.is_zero() {
                tokio::time::sleep(latency).await;
            }

            let mut state = self.lock();
            if state.offline {
                return Err(AnchorError::Unavailable("ledger offline".into()));
            }
            if state.fail_next > 0 {
                state.fail_next -= 1;
                return Err(AnchorError::Unavailable("injected failure".into()));
            }
            if event_count == 0 {
                return Err(AnchorError::Rejected("zero events".into()));
            }

            let key = (*merkle_root, metadata_ref.to_owned());
            if let Some(&idx) = state.by_commitment.get(&key) {
                tracing::debug!(anchor_number = idx + 1, "repeated commitment, returning existing anchor");
                return Ok(state.anchors[idx].external_ref.clone());
            }

            let anchor_number = state.anchors.len() as u64 + 1;
            let tx_hash = self.hasher.digest_parts(&[
                merkle_root.as_bytes(),
                metadata_ref.as_bytes(),
                &anchor_number.to_be_bytes(),
            ]);
            let external_ref = ExternalRef {
                tx_hash: tx_hash.to_string(),
                ledger_block: self.genesis_height + anchor_number,
            };

            let position = state.anchors.len();
            state.by_commitment.insert(key, position);
            state.anchors.push(LedgerAnchor {
                anchor_number,
                merkle_root: *merkle_root,
                event_count,
                metadata_ref: metadata_ref.to_owned(),
                external_ref: external_ref.clone(),
            });
            tracing::debug!(anchor_number, event_count, %merkle_root, "ledger anchor stored");
            Ok(external_ref)
        }

        async fn current_committed_count(&self) -> Result<u64> {
            let state = self.lock();
            if state.offline {
                return Err(AnchorError::Unavailable("ledger offline".into()));
            }
            Ok(state.anchors.len() as u64)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::memory::MemoryLedger;
    use super::*;
    use crate::error::AnchorError;
    use ahin_kernel_core::{DigestAlgorithm, Hasher, MerkleTree};
    use std::sync::Arc;
    use std::time::Duration;

    fn ledger() -> MemoryLedger {
        MemoryLedger::new(Hasher::new(DigestAlgorithm::Keccak256))
    }

    #[tokio::test]
    async fn test_sequential_anchor_numbers() {
        let ledger = ledger();
        let h = Hasher::default();

        let a = ledger.commit(&h.digest(b"a"), 3, "ipfs://Qma").await.unwrap();
        let b = ledger.commit(&h.digest(b"b"), 1, "ipfs://Qmb").await.unwrap();

        assert_eq!(a.ledger_block, 1);
        assert_eq!(b.ledger_block, 2);
        assert_ne!(a.tx_hash, b.tx_hash);
        assert!(a.tx_hash.starts_with("0x"));
        assert_eq!(ledger.current_committed_count().await.unwrap(), 2);
        assert_eq!(ledger.anchor(2).unwrap().event_count, 1);
    }

    #[tokio::test]
    async fn test_repeated_commit_is_idempotent() {
        let ledger = ledger();
        let root = Hasher::default().digest(b"root");

        let first = ledger.commit(&root, 4, "ipfs://Qmx").await.unwrap();
        let second = ledger.commit(&root, 4, "ipfs://Qmx").await.unwrap();

        assert_eq!(first, second);
        assert_eq!(ledger.current_committed_count().await.unwrap(), 1);
        assert_eq!(ledger.commit_calls(), 2);
    }

    #[tokio::test]
    async fn test_rejects_zero_events() {
        let ledger = ledger();
        let err = ledger
            .commit(&Hasher::default().digest(b"r"), 0, "ipfs://Qm0")
            .await
            .unwrap_err();
        assert!(matches!(err, AnchorError::Rejected(_)));
        assert_eq!(ledger.current_committed_count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_failure_injection() {
        let ledger = ledger();
        let root = Hasher::default().digest(b"r");

        ledger.fail_next(2);
        assert!(ledger.commit(&root, 1, "m").await.is_err());
        assert!(ledger.commit(&root, 1, "m").await.is_err());
        assert!(ledger.commit(&root, 1, "m").await.is_ok());

        ledger.set_offline(true);
        assert!(matches!(
            ledger.current_committed_count().await,
            Err(AnchorError::Unavailable(_))
        ));
        ledger.set_offline(false);
        assert_eq!(ledger.current_committed_count().await.unwrap(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_latency_can_be_cut_by_timeout() {
        let ledger = Arc::new(ledger());
        ledger.set_latency(Duration::from_secs(60));
        let root = Hasher::default().digest(b"slow");

        let res = tokio::time::timeout(Duration::from_secs(30), ledger.commit(&root, 1, "m")).await;
        assert!(res.is_err());
        assert_eq!(ledger.current_committed_count().await.unwrap(), 0);

        ledger.set_latency(Duration::ZERO);
        assert!(ledger.commit(&root, 1, "m").await.is_ok());
    }

    #[tokio::test]
    async fn test_verify_inclusion_matches_tree() {
        let ledger = ledger();
        let h = Hasher::new(DigestAlgorithm::Keccak256);
        let leaves: Vec<Digest> = (0..5u8).map(|i| h.digest(&[i])).collect();
        let tree = MerkleTree::build(&h, &leaves);

        ledger.commit(&tree.root(), 5, "ipfs://Qmtree").await.unwrap();

        for (i, leaf) in leaves.iter().enumerate() {
            let siblings = tree.proof(i).unwrap();
            assert!(ledger.verify_inclusion(1, leaf, &siblings));
        }
        let siblings = tree.proof(0).unwrap();
        assert!(!ledger.verify_inclusion(1, &h.digest(b"outsider"), &siblings));
        assert!(!ledger.verify_inclusion(2, &leaves[0], &siblings));
    }
}
