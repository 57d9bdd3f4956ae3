//! Golden test vectors for deterministic verification.
//!
//! Leaves are the ids of the canonical JSON payloads `{"n":1}`, `{"n":2}`, ...
//! Any implementation of the sorted-pair, duplicate-last tree must reproduce
//! these roots byte for byte, including the verifier on the ledger.

use serde::Serialize;

use ahin_kernel_core::{
    merkle, Block, Digest, DigestAlgorithm, Event, Hasher, PayloadEncoding,
};

/// Timestamp of the first golden block (Unix ms).
pub const GOLDEN_T0: i64 = 1_700_000_000_000;

/// A Merkle root vector.
#[derive(Debug, Clone, Serialize)]
pub struct MerkleVector {
    pub name: &'static str,
    pub algorithm: DigestAlgorithm,
    /// Leaves are `{"n":1}` through `{"n":leaf_count}`.
    pub leaf_count: u32,
    /// Expected root (hex, no prefix).
    pub expected_root: &'static str,
}

/// A sealed block vector.
#[derive(Debug, Clone, Serialize)]
pub struct BlockVector {
    pub name: &'static str,
    pub sequence: u64,
    /// Payloads `{"n":first}` through `{"n":last}`.
    pub first: u32,
    pub last: u32,
    pub prev_block_hash: &'static str,
    pub timestamp: i64,
    pub expected_root: &'static str,
    pub expected_block_hash: &'static str,
}

/// The canonical payload for leaf `n`.
pub fn leaf_payload(n: u32) -> String {
    format!("{{\"n\":{n}}}")
}

/// Leaf digests `1..=count` under `algorithm`.
pub fn leaves(algorithm: DigestAlgorithm, count: u32) -> Vec<Digest> {
    let hasher = Hasher::new(algorithm);
    (1..=count)
        .map(|n| hasher.digest(leaf_payload(n).as_bytes()))
        .collect()
}

/// Events for payloads `first..=last`, all enqueued at time zero.
pub fn events(hasher: &Hasher, first: u32, last: u32) -> Vec<Event> {
    (first..=last)
        .map(|n| {
            Event::new(hasher, PayloadEncoding::Json, leaf_payload(n).as_bytes(), 64, 0)
                .expect("golden payloads are valid JSON")
        })
        .collect()
}

/// Get all Merkle vectors.
pub fn merkle_vectors() -> Vec<MerkleVector> {
    use DigestAlgorithm::{Keccak256, Sha256};

    vec![
        MerkleVector {
            name: "keccak single leaf is its own root",
            algorithm: Keccak256,
            leaf_count: 1,
            expected_root: "232f233e61375896b50467077a0a746f4b74c418ab0effaa362493b69c58e46b",
        },
        MerkleVector {
            name: "keccak pair",
            algorithm: Keccak256,
            leaf_count: 2,
            expected_root: "0328308d95d680ae3feef2df327fdeaf22829a64812b863ad044106446b6ad51",
        },
        MerkleVector {
            name: "keccak odd count duplicates last",
            algorithm: Keccak256,
            leaf_count: 3,
            expected_root: "d380890e2ab92d307007026ed1b5f004b1d1ba6e40b7dfef57b9461352ece90a",
        },
        MerkleVector {
            name: "keccak full level",
            algorithm: Keccak256,
            leaf_count: 4,
            expected_root: "787f0231d76c705304140787cd11eb0d45ffc42dc8fa65e4d703cfd10877e7e8",
        },
        MerkleVector {
            name: "keccak odd count at two levels",
            algorithm: Keccak256,
            leaf_count: 5,
            expected_root: "6cfd1056f62ed87e131c2762dd3c1c2f66311dc77903e333c8dfdf141cd5b496",
        },
        MerkleVector {
            name: "sha256 single leaf",
            algorithm: Sha256,
            leaf_count: 1,
            expected_root: "2bfd14f43d17fc7cea24e0917a8879b4b2f880b8baeec1b9d90fbaad655e71bd",
        },
        MerkleVector {
            name: "sha256 pair",
            algorithm: Sha256,
            leaf_count: 2,
            expected_root: "8931dc18f9f1f2c4302649e231c4cbdfdd90f54998a5a45b6989aadebd496262",
        },
        MerkleVector {
            name: "sha256 odd count duplicates last",
            algorithm: Sha256,
            leaf_count: 3,
            expected_root: "55130ec290d9fe9885124af75961392228e415cb031e150272a0ba88fbd1da42",
        },
        MerkleVector {
            name: "sha256 full level",
            algorithm: Sha256,
            leaf_count: 4,
            expected_root: "43b0b5234300aa2514229e93d866ab28e0f55577e904169adf0e1647de61678e",
        },
        MerkleVector {
            name: "sha256 odd count at two levels",
            algorithm: Sha256,
            leaf_count: 5,
            expected_root: "663c8f569da0c729196457a986da4a66b8d2e0c5334eefb98a2ee85cdcd1e782",
        },
    ]
}

/// Get all block vectors. They form a two-block keccak chain.
pub fn block_vectors() -> Vec<BlockVector> {
    vec![
        BlockVector {
            name: "genesis block of three events",
            sequence: 1,
            first: 1,
            last: 3,
            prev_block_hash: "0000000000000000000000000000000000000000000000000000000000000000",
            timestamp: GOLDEN_T0,
            expected_root: "d380890e2ab92d307007026ed1b5f004b1d1ba6e40b7dfef57b9461352ece90a",
            expected_block_hash: "361cb568013b1810bc99f38b7f6414338a1c4cc19942854c46a2d5fb47de1e05",
        },
        BlockVector {
            name: "second block one interval later",
            sequence: 2,
            first: 4,
            last: 5,
            prev_block_hash: "361cb568013b1810bc99f38b7f6414338a1c4cc19942854c46a2d5fb47de1e05",
            timestamp: GOLDEN_T0 + 300_000,
            expected_root: "ea1f668d108d40519b6f0192f9db86b6ec4abaacddbd58a1e56540a736a1afeb",
            expected_block_hash: "b3e1034c1f2e1cf68dc13946678306e9ced6dad9704a9c945f091465a062611c",
        },
    ]
}

/// Seal the block a vector describes.
pub fn block_from_vector(vector: &BlockVector) -> Block {
    let hasher = Hasher::new(DigestAlgorithm::Keccak256);
    let prev = Digest::from_hex(vector.prev_block_hash).expect("golden hex is valid");
    Block::seal(
        &hasher,
        vector.sequence,
        prev,
        vector.timestamp,
        events(&hasher, vector.first, vector.last),
    )
}

/// Check every vector, returning the names of those that fail.
pub fn verify_all_vectors() -> Result<(), Vec<String>> {
    let mut failures = Vec::new();

    for v in merkle_vectors() {
        let hasher = Hasher::new(v.algorithm);
        let root = merkle::compute_root(&hasher, &leaves(v.algorithm, v.leaf_count));
        if root.to_hex() != v.expected_root {
            failures.push(format!("{}: got {}", v.name, root.to_hex()));
        }
    }

    for v in block_vectors() {
        let block = block_from_vector(&v);
        if block.merkle_root().to_hex() != v.expected_root
            || block.block_hash().to_hex() != v.expected_block_hash
        {
            failures.push(format!("{}: got {}", v.name, block.block_hash().to_hex()));
        }
    }

    if failures.is_empty() {
        Ok(())
    } else {
        Err(failures)
    }
}
