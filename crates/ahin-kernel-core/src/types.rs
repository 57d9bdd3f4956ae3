//! Small shared value types.

use serde::{Deserialize, Serialize};

use crate::digest::Digest;

/// Reference to a confirmed commitment on the external ledger.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExternalRef {
    /// Ledger transaction hash.
    pub tx_hash: String,
    /// Ledger block number that included the transaction.
    pub ledger_block: u64,
}

/// The position the next block must link to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChainHead {
    /// Sequence number the next block must carry.
    pub next_sequence: u64,
    /// Hash the next block must carry as `prev_block_hash`.
    pub prev_block_hash: Digest,
}

impl ChainHead {
    /// Head of an empty chain.
    pub const GENESIS: Self = Self {
        next_sequence: 1,
        prev_block_hash: Digest::ZERO,
    };
}
