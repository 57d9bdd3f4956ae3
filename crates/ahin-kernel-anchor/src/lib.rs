//! # AHIN Kernel Anchor
//!
//! The seam between the kernel and the external ledger that notarizes block
//! summaries.
//!
//! ## Key Types
//!
//! - [`AnchorClient`] - Capability to commit `(root, count, metadata ref)` and
//!   read the committed count
//! - [`AnchorRecord`] / [`AnchorLog`] - Per-block anchoring status
//! - [`MemoryLedger`] - In-memory ledger with the contract's numbering and
//!   proof check, idempotent commits, and failure and latency injection for tests
//!
//! ## Compatibility
//!
//! Proofs produced by the kernel are only meaningful if the ledger verifies
//! them with the same sorted-pair rule. [`MemoryLedger::verify_inclusion`]
//! uses exactly the kernel's rule so tests can check the two agree.

pub mod client;
pub mod error;
pub mod record;

pub use client::{
    memory::{LedgerAnchor, MemoryLedger},
    AnchorClient,
};
pub use error::{AnchorError, Result};
pub use record::{AnchorLog, AnchorRecord};
