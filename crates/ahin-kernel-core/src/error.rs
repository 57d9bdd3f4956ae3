//! Error types for the AHIN Kernel Core.

use thiserror::Error;

/// Core errors that can occur while hashing, canonicalizing or assembling blocks.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid payload: {0}")]
    InvalidPayload(String),

    #[error("unknown digest algorithm: {0}")]
    UnknownAlgorithm(String),

    #[error("invalid digest: {0}")]
    InvalidDigest(String),

    #[error("block {sequence} hash mismatch: stored {stored}, derived {derived}")]
    BlockHashMismatch {
        sequence: u64,
        stored: String,
        derived: String,
    },

    #[error("malformed block: {0}")]
    MalformedBlock(String),
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
