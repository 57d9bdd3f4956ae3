//! # AHIN Kernel Store
//!
//! In-process state for the AHIN Kernel, plus an optional persistence seam.
//!
//! ## Key Types
//!
//! - [`EventQueue`] - FIFO of events not yet in a block; safe under many producers
//! - [`BlockBuilder`] - Drains a batch and seals it onto the chain head
//! - [`ChainStore`] - Append-only, linkage-checked sequence of blocks
//! - [`Journal`] - Async trait for durable block/anchor records
//! - [`MemoryJournal`] / [`SqliteJournal`] - Journal implementations
//!
//! ## Design Notes
//!
//! - **Single writer**: only one caller may build and append at a time; the
//!   kernel's anchor cycle enforces this. `append` still re-checks linkage and
//!   reports [`StoreError::ChainIntegrityViolation`] if the discipline breaks.
//! - **Drain is final**: events leave the queue the moment they are drained and
//!   are never re-queued, whatever happens to the block afterwards.
//! - **Memory by default**: without a journal, a restart loses every block.

pub mod builder;
pub mod chain;
pub mod error;
pub mod memory;
pub mod migration;
pub mod queue;
pub mod sqlite;
pub mod traits;

pub use builder::BlockBuilder;
pub use chain::{ChainStats, ChainStore};
pub use error::{Result, StoreError};
pub use memory::MemoryJournal;
pub use queue::EventQueue;
pub use sqlite::SqliteJournal;
pub use traits::{AnchoredEntry, Journal, JournalExt};
