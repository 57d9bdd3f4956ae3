//! # AHIN Kernel Core
//!
//! Pure primitives for the AHIN Kernel: digests, events, Merkle commitments,
//! and hash-linked blocks.
//!
//! This crate contains no I/O, no storage, no networking. It is pure computation
//! over cryptographic data structures. The only source of non-determinism is the
//! injected [`Clock`].
//!
//! ## Key Types
//!
//! - [`Digest`] - 32-byte content address, ordered byte-lexicographically
//! - [`Hasher`] - The single hash primitive bound to a [`DigestAlgorithm`]
//! - [`Event`] - A payload waiting to be (or already) committed in a block
//! - [`MerkleTree`] - Sorted-pair, duplicate-last Merkle commitment
//! - [`Block`] - Immutable batch of events linked to its predecessor
//!
//! ## Compatibility
//!
//! The Merkle combination rule in [`merkle`] must match the verifier on the
//! external ledger bit for bit. See [`merkle::combine`].

pub mod block;
pub mod canonical;
pub mod clock;
pub mod digest;
pub mod error;
pub mod event;
pub mod merkle;
pub mod types;

pub use block::{Block, BlockParts, BlockSummary};
pub use canonical::{canonical_json, canonicalize_payload, PayloadEncoding};
pub use clock::{Clock, ManualClock, SystemClock};
pub use digest::{Digest, DigestAlgorithm, Hasher};
pub use error::{CoreError, Result};
pub use event::{Event, EventId};
pub use merkle::{InclusionProof, MerkleTree};
pub use types::{ChainHead, ExternalRef};
