//! Restarting a kernel from its journal.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

use ahin_kernel::anchor::MemoryLedger;
use ahin_kernel::core::{Block, BlockParts, DigestAlgorithm, ExternalRef, ManualClock};
use ahin_kernel::store::{
    AnchoredEntry, Journal, MemoryJournal, SqliteJournal, StoreError,
};
use ahin_kernel::{AnchorClient, Kernel, KernelConfig, KernelError};

const T0: i64 = 1_700_000_000_000;

async fn open(
    config: KernelConfig,
    ledger: &Arc<MemoryLedger>,
    journal: Arc<dyn Journal>,
) -> ahin_kernel::Result<Kernel> {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    Kernel::recover_with_clock(config, ledger.clone(), journal, Arc::new(ManualClock::new(T0))).await
}

#[tokio::test]
async fn test_unanchored_block_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ahin.db");
    let config = KernelConfig::default();
    let ledger = Arc::new(MemoryLedger::new(config.hasher()));

    let (ids, block_hash) = {
        let kernel = open(config.clone(), &ledger, Arc::new(SqliteJournal::open(&path).unwrap()))
            .await
            .unwrap();
        let ids: Vec<_> = (0..4)
            .map(|i| kernel.enqueue(format!("{{\"i\":{i}}}").as_bytes()).unwrap())
            .collect();
        ledger.set_offline(true);
        kernel.trigger_anchor_cycle().await.unwrap();
        assert_eq!(kernel.stats().unanchored_blocks, 1);
        (ids, *kernel.block(1).unwrap().block_hash())
    };

    ledger.set_offline(false);
    let kernel = open(config.clone(), &ledger, Arc::new(SqliteJournal::open(&path).unwrap()))
        .await
        .unwrap();

    let stats = kernel.stats();
    assert_eq!(stats.block_count, 1);
    assert_eq!(stats.total_events, 4);
    assert_eq!(stats.unanchored_blocks, 1);
    assert_eq!(*kernel.block(1).unwrap().block_hash(), block_hash);
    assert!(kernel.proof_for(&ids[3]).unwrap().verify(kernel.hasher()));

    let outcome = kernel.trigger_anchor_cycle().await.unwrap();
    assert_eq!(outcome.report().unwrap().anchored, vec![1]);
    drop(kernel);

    let kernel = open(config, &ledger, Arc::new(SqliteJournal::open(&path).unwrap()))
        .await
        .unwrap();
    assert_eq!(kernel.stats().unanchored_blocks, 0);
    let record = kernel.anchor_record(1).unwrap();
    assert_eq!(record.external_ref.unwrap().ledger_block, 1);
    assert_eq!(ledger.current_committed_count().await.unwrap(), 1);
}

#[tokio::test]
async fn test_new_blocks_extend_recovered_chain() {
    let journal = Arc::new(MemoryJournal::new());
    let config = KernelConfig::default();
    let ledger = Arc::new(MemoryLedger::new(config.hasher()));

    {
        let kernel = open(config.clone(), &ledger, journal.clone()).await.unwrap();
        kernel.enqueue(br#"{"epoch":1}"#).unwrap();
        kernel.trigger_anchor_cycle().await.unwrap();
    }

    let kernel = open(config, &ledger, journal.clone()).await.unwrap();
    kernel.enqueue(br#"{"epoch":2}"#).unwrap();
    kernel.trigger_anchor_cycle().await.unwrap();

    assert_eq!(kernel.stats().block_count, 2);
    kernel.verify_chain().unwrap();
    assert_eq!(journal.load_blocks().await.unwrap().len(), 2);
    assert_eq!(journal.load_anchors().await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_digest_cannot_change_mid_chain() {
    let journal = Arc::new(MemoryJournal::new());
    let ledger = Arc::new(MemoryLedger::new(KernelConfig::default().hasher()));
    open(KernelConfig::default(), &ledger, journal.clone()).await.unwrap();

    let blake = KernelConfig {
        digest: DigestAlgorithm::Blake3,
        ..KernelConfig::default()
    };
    let err = open(blake, &ledger, journal).await.err().unwrap();
    assert!(matches!(
        err,
        KernelError::Store(StoreError::AlgorithmMismatch { .. })
    ));
}

/// Journal whose block appends fail while `down` is set.
#[derive(Default)]
struct FlakyJournal {
    inner: MemoryJournal,
    down: AtomicBool,
}

#[async_trait]
impl Journal for FlakyJournal {
    async fn digest_algorithm(&self) -> ahin_kernel::store::Result<Option<DigestAlgorithm>> {
        self.inner.digest_algorithm().await
    }

    async fn set_digest_algorithm(&self, algorithm: DigestAlgorithm) -> ahin_kernel::store::Result<()> {
        self.inner.set_digest_algorithm(algorithm).await
    }

    async fn append_block(&self, block: &Block) -> ahin_kernel::store::Result<()> {
        if self.down.load(Ordering::SeqCst) {
            return Err(StoreError::InvalidData("disk full".into()));
        }
        self.inner.append_block(block).await
    }

    async fn mark_anchored(
        &self,
        sequence: u64,
        external_ref: &ExternalRef,
        anchored_at: i64,
    ) -> ahin_kernel::store::Result<()> {
        self.inner.mark_anchored(sequence, external_ref, anchored_at).await
    }

    async fn load_blocks(&self) -> ahin_kernel::store::Result<Vec<BlockParts>> {
        self.inner.load_blocks().await
    }

    async fn load_anchors(&self) -> ahin_kernel::store::Result<Vec<AnchoredEntry>> {
        self.inner.load_anchors().await
    }
}

#[tokio::test]
async fn test_journal_failure_surfaces_and_catches_up() {
    let journal = Arc::new(FlakyJournal::default());
    let config = KernelConfig::default();
    let ledger = Arc::new(MemoryLedger::new(config.hasher()));
    let kernel = open(config, &ledger, journal.clone()).await.unwrap();

    kernel.enqueue(br#"{"durable":false}"#).unwrap();
    journal.down.store(true, Ordering::SeqCst);
    let err = kernel.trigger_anchor_cycle().await.unwrap_err();
    assert!(matches!(err, KernelError::Store(StoreError::InvalidData(_))));

    // The block is in the chain but was not committed.
    assert_eq!(kernel.stats().block_count, 1);
    assert_eq!(kernel.stats().unanchored_blocks, 1);
    assert_eq!(ledger.commit_calls(), 0);

    journal.down.store(false, Ordering::SeqCst);
    let outcome = kernel.trigger_anchor_cycle().await.unwrap();
    assert_eq!(outcome.report().unwrap().anchored, vec![1]);
    assert_eq!(journal.load_blocks().await.unwrap().len(), 1);
    assert_eq!(journal.load_anchors().await.unwrap().len(), 1);
}
