//! Error types for anchoring.

use std::time::Duration;

use thiserror::Error;

/// Why a commit to the external ledger did not confirm.
///
/// Every variant is non-fatal to the kernel: the block stays in the chain and
/// the commit is attempted again on a later cycle.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AnchorError {
    /// The commit did not complete within the configured bound.
    #[error("commit timed out after {0:?}")]
    Timeout(Duration),

    /// The ledger refused the commitment.
    #[error("ledger rejected commit: {0}")]
    Rejected(String),

    /// The ledger could not be reached.
    #[error("ledger unavailable: {0}")]
    Unavailable(String),

    /// Any other ledger-side failure.
    #[error("ledger error: {0}")]
    Ledger(String),
}

/// Result type for anchoring operations.
pub type Result<T> = std::result::Result<T, AnchorError>;
