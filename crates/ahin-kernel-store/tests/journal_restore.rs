//! Rebuilding a chain from a journal.
//!
//! Blocks written through either journal must come back as an identical,
//! linkage-checked chain, and a tampered row must be refused on restore.

use std::sync::Arc;

use ahin_kernel_core::{DigestAlgorithm, Hasher, ManualClock, PayloadEncoding};
use ahin_kernel_store::{
    BlockBuilder, ChainStore, EventQueue, Journal, JournalExt, MemoryJournal, SqliteJournal,
    StoreError,
};

struct Pipeline {
    queue: EventQueue,
    builder: BlockBuilder,
    chain: ChainStore,
    clock: Arc<ManualClock>,
}

fn pipeline(batch: usize) -> Pipeline {
    let hasher = Hasher::new(DigestAlgorithm::Keccak256);
    let clock = Arc::new(ManualClock::new(1_700_000_000_000));
    Pipeline {
        queue: EventQueue::new(hasher, PayloadEncoding::Json, 4096, clock.clone()),
        builder: BlockBuilder::new(hasher, batch, clock.clone()),
        chain: ChainStore::new(hasher),
        clock,
    }
}

async fn fill<J: Journal + ?Sized>(p: &mut Pipeline, journal: &J, events: usize) {
    for i in 0..events {
        p.queue
            .enqueue(format!(r#"{{"kind":"transfer","n":{i}}}"#).as_bytes())
            .unwrap();
    }
    while let Some(block) = p.builder.build(&p.queue, &p.chain) {
        journal.append_block(&block).await.unwrap();
        p.chain.append(block).unwrap();
        p.clock.advance(300_000);
    }
}

#[tokio::test]
async fn test_sqlite_restore_after_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("chain.db");
    let mut p = pipeline(7);

    {
        let journal = SqliteJournal::open(&path).unwrap();
        journal.bind_algorithm(DigestAlgorithm::Keccak256).await.unwrap();
        fill(&mut p, &journal, 20).await;
    }
    assert_eq!(p.chain.len(), 3);

    let journal = SqliteJournal::open(&path).unwrap();
    let restored = ChainStore::restore(
        Hasher::new(DigestAlgorithm::Keccak256),
        journal.load_blocks().await.unwrap(),
    )
    .unwrap();

    assert_eq!(restored.blocks(), p.chain.blocks());
    assert_eq!(restored.head(), p.chain.head());
    restored.verify_linkage().unwrap();

    let last = p.chain.last().unwrap();
    let id = last.events()[0].id;
    let proof = restored.proof_for(&id).unwrap();
    assert_eq!(proof.block_sequence, 3);
    assert!(proof.verify(restored.hasher()));
}

#[tokio::test]
async fn test_restore_with_wrong_algorithm_fails() {
    let journal = MemoryJournal::new();
    let mut p = pipeline(5);
    fill(&mut p, &journal, 5).await;

    let err = ChainStore::restore(
        Hasher::new(DigestAlgorithm::Sha256),
        journal.load_blocks().await.unwrap(),
    )
    .unwrap_err();
    assert!(matches!(err, StoreError::Core(_)));
}

#[tokio::test]
async fn test_restore_detects_substituted_event() {
    let journal = MemoryJournal::new();
    let mut p = pipeline(4);
    fill(&mut p, &journal, 8).await;

    let mut parts = journal.load_blocks().await.unwrap();
    parts[1].events[0] = parts[0].events[0].clone();

    let err = ChainStore::restore(Hasher::new(DigestAlgorithm::Keccak256), parts).unwrap_err();
    assert!(matches!(err, StoreError::Core(_)));
}
