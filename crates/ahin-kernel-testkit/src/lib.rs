//! # AHIN Kernel Testkit
//!
//! Testing utilities for the AHIN Kernel.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Golden vectors**: Merkle roots and block hashes with known outputs, for
//!   checking any verifier (including the ledger's) against the kernel
//! - **Generators**: Proptest strategies for digests, leaf lists and payloads
//! - **Fixtures**: A kernel wired to an in-memory ledger and a manual clock
//!
//! ## Golden Vectors
//!
//! ```rust
//! use ahin_kernel_testkit::vectors::verify_all_vectors;
//!
//! verify_all_vectors().expect("tree rule changed");
//! ```
//!
//! ## Property Testing
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use ahin_kernel_core::{merkle, Hasher};
//! use ahin_kernel_testkit::generators::leaves_with_index;
//!
//! proptest! {
//!     #[test]
//!     fn proof_round_trips((leaves, i) in leaves_with_index(128)) {
//!         let h = Hasher::default();
//!         let proof = merkle::build_proof(&h, &leaves, i).unwrap();
//!         prop_assert!(merkle::verify(&h, &leaves[i], &proof, &merkle::compute_root(&h, &leaves)));
//!     }
//! }
//! ```
//!
//! ## Test Fixtures
//!
//! ```rust,ignore
//! use ahin_kernel_testkit::TestFixture;
//!
//! let fixture = TestFixture::new();
//! fixture.enqueue_range(1, 3);
//! let report = fixture.cycle().await;
//! ```

pub mod fixtures;
pub mod generators;
pub mod vectors;

pub use fixtures::{linked_chain, TestFixture};
pub use vectors::{block_vectors, merkle_vectors, verify_all_vectors, BlockVector, MerkleVector};
