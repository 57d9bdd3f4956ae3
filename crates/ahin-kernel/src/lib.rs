//! # AHIN Kernel
//!
//! The unified API for the AHIN batching engine: events are queued, batched
//! into hash-linked blocks under a Merkle commitment, and each block's root is
//! periodically anchored on an external ledger.
//!
//! ## Overview
//!
//! ```text
//! producers ─► EventQueue ─► BlockBuilder ─► ChainStore ─► AnchorClient.commit
//!                              (MerkleTree)       │
//!                                                 └─► proof_for(id)
//! ```
//!
//! - **Events** are content-addressed: `id = digest(canonical payload)`.
//! - **Blocks** commit their events with a sorted-pair Merkle root and link to
//!   their predecessor through `block_hash`.
//! - **Anchoring** runs on a timer or on demand; only one cycle runs at a time
//!   and a failed commit leaves the block in the chain for a later retry.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use ahin_kernel::{AnchorScheduler, Kernel, KernelConfig};
//! use ahin_kernel::anchor::MemoryLedger;
//!
//! async fn example() -> ahin_kernel::Result<()> {
//!     let config = KernelConfig::from_env()?;
//!     let ledger = Arc::new(MemoryLedger::new(config.hasher()));
//!     let kernel = Arc::new(Kernel::new(config, ledger)?);
//!
//!     let scheduler = AnchorScheduler::spawn(Arc::clone(&kernel));
//!
//!     let id = kernel.enqueue(br#"{"kind":"claim","subject":"did:ahin:42"}"#)?;
//!     kernel.trigger_anchor_cycle().await?;
//!
//!     let proof = kernel.proof_for(&id)?;
//!     assert!(proof.verify(kernel.hasher()));
//!
//!     scheduler.shutdown().await;
//!     Ok(())
//! }
//! ```
//!
//! ## Re-exports
//!
//! - `ahin_kernel::core` - Digests, events, Merkle trees, blocks
//! - `ahin_kernel::store` - Queue, builder, chain and journals
//! - `ahin_kernel::anchor` - Ledger client trait and in-memory ledger

pub mod config;
pub mod cycle;
pub mod error;
pub mod kernel;
pub mod scheduler;

// Re-export component crates
pub use ahin_kernel_anchor as anchor;
pub use ahin_kernel_core as core;
pub use ahin_kernel_store as store;

// Re-export main types for convenience
pub use config::KernelConfig;
pub use cycle::{CycleOutcome, CycleReport};
pub use error::{KernelError, Result};
pub use kernel::{Kernel, KernelStats, LedgerStats};
pub use scheduler::{AnchorScheduler, SchedulerHandle};

// Re-export commonly used component types
pub use ahin_kernel_anchor::{AnchorClient, AnchorError, AnchorRecord};
pub use ahin_kernel_core::{
    Block, BlockSummary, Digest, DigestAlgorithm, EventId, ExternalRef, Hasher, InclusionProof,
    PayloadEncoding,
};
