//! Error types for the Kernel.

use ahin_kernel_anchor::AnchorError;
use ahin_kernel_core::{CoreError, EventId};
use ahin_kernel_store::StoreError;
use thiserror::Error;

/// Errors that can occur during Kernel operations.
///
/// Anchoring failures inside a cycle are absorbed and recorded on the block's
/// anchor record; `Anchor` only surfaces from calls that talk to the ledger
/// directly, such as [`crate::Kernel::ledger_stats`].
#[derive(Debug, Error)]
pub enum KernelError {
    /// Payload rejected at enqueue; it never entered the queue.
    #[error("invalid payload: {0}")]
    InvalidPayload(String),

    /// No committed block contains this event id.
    #[error("event not found in any committed block: {0}")]
    NotFound(EventId),

    /// Core primitive error.
    #[error("core error: {0}")]
    Core(CoreError),

    /// Chain or journal error, including integrity violations.
    #[error("storage error: {0}")]
    Store(StoreError),

    /// Ledger error.
    #[error("anchor error: {0}")]
    Anchor(#[from] AnchorError),

    /// Invalid configuration.
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl From<CoreError> for KernelError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::InvalidPayload(reason) => Self::InvalidPayload(reason),
            other => Self::Core(other),
        }
    }
}

impl From<StoreError> for KernelError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(id) => Self::NotFound(id),
            StoreError::Core(core) => core.into(),
            other => Self::Store(other),
        }
    }
}

impl KernelError {
    /// Whether this error means the chain's linkage invariant was broken.
    pub fn is_integrity_violation(&self) -> bool {
        matches!(self, Self::Store(StoreError::ChainIntegrityViolation { .. }))
    }
}

/// Result type for Kernel operations.
pub type Result<T> = std::result::Result<T, KernelError>;
