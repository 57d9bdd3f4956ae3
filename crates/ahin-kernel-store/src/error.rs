//! Error types for the store module.

use ahin_kernel_core::{CoreError, DigestAlgorithm, EventId};
use thiserror::Error;

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Payload rejection or block reconstruction failure.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A block does not extend the current head.
    #[error("chain integrity violation at block {sequence}: {reason}")]
    ChainIntegrityViolation { sequence: u64, reason: String },

    /// No committed block contains the event.
    #[error("event not found in any committed block: {0}")]
    NotFound(EventId),

    /// The journal was written with a different digest algorithm.
    #[error("digest algorithm mismatch: journal uses {stored}, configured {configured}")]
    AlgorithmMismatch {
        stored: DigestAlgorithm,
        configured: DigestAlgorithm,
    },

    /// A different block is already persisted at this sequence.
    #[error("journal conflict at block {sequence}: existing hash {existing}")]
    Conflict { sequence: u64, existing: String },

    /// Database error from SQLite.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Event list serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Invalid data in storage.
    #[error("invalid data: {0}")]
    InvalidData(String),

    /// Migration error.
    #[error("migration error: {0}")]
    Migration(String),
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
