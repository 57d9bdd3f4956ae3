//! Kernel configuration.

use std::time::Duration;

use ahin_kernel_core::{DigestAlgorithm, Hasher, PayloadEncoding};

use crate::error::{KernelError, Result};

/// Default maximum events per block.
pub const DEFAULT_BATCH_SIZE: usize = 100;
/// Default time between scheduled anchor cycles.
pub const DEFAULT_ANCHOR_INTERVAL: Duration = Duration::from_secs(300);
/// Default bound on a single ledger commit.
pub const DEFAULT_COMMIT_TIMEOUT: Duration = Duration::from_secs(30);
/// Default maximum canonical payload size.
pub const DEFAULT_MAX_PAYLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Configuration for the Kernel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KernelConfig {
    /// Maximum events drained into one block.
    pub batch_size: usize,
    /// Time between scheduled anchor cycles.
    pub anchor_interval: Duration,
    /// How long a single commit may take before it counts as failed.
    pub commit_timeout: Duration,
    /// Hash primitive for ids, tree nodes and block hashes.
    ///
    /// Fixed for the lifetime of a chain.
    pub digest: DigestAlgorithm,
    /// How payloads are canonicalized before hashing.
    pub payload_encoding: PayloadEncoding,
    /// Largest accepted payload, in bytes.
    pub max_payload_bytes: usize,
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            anchor_interval: DEFAULT_ANCHOR_INTERVAL,
            commit_timeout: DEFAULT_COMMIT_TIMEOUT,
            digest: DigestAlgorithm::default(),
            payload_encoding: PayloadEncoding::default(),
            max_payload_bytes: DEFAULT_MAX_PAYLOAD_BYTES,
        }
    }
}

impl KernelConfig {
    /// Defaults overridden by `AHIN_*` environment variables.
    ///
    /// | Variable | Field | Unit |
    /// |----------|-------|------|
    /// | `AHIN_BATCH_SIZE` | `batch_size` | events |
    /// | `AHIN_ANCHOR_INTERVAL` | `anchor_interval` | ms |
    /// | `AHIN_COMMIT_TIMEOUT` | `commit_timeout` | ms |
    /// | `AHIN_DIGEST` | `digest` | `keccak256`, `blake3`, `sha256` |
    /// | `AHIN_PAYLOAD_ENCODING` | `payload_encoding` | `json`, `raw` |
    /// | `AHIN_MAX_PAYLOAD_BYTES` | `max_payload_bytes` | bytes |
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`KernelConfig::from_env`], reading variables through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(v) = lookup("AHIN_BATCH_SIZE") {
            config.batch_size = parse_number("AHIN_BATCH_SIZE", &v)? as usize;
        }
        if let Some(v) = lookup("AHIN_ANCHOR_INTERVAL") {
            config.anchor_interval = Duration::from_millis(parse_number("AHIN_ANCHOR_INTERVAL", &v)?);
        }
        if let Some(v) = lookup("AHIN_COMMIT_TIMEOUT") {
            config.commit_timeout = Duration::from_millis(parse_number("AHIN_COMMIT_TIMEOUT", &v)?);
        }
        if let Some(v) = lookup("AHIN_DIGEST") {
            config.digest = v
                .trim()
                .parse()
                .map_err(|e| KernelError::Config(format!("AHIN_DIGEST: {e}")))?;
        }
        if let Some(v) = lookup("AHIN_PAYLOAD_ENCODING") {
            config.payload_encoding = v
                .trim()
                .parse()
                .map_err(|e| KernelError::Config(format!("AHIN_PAYLOAD_ENCODING: {e}")))?;
        }
        if let Some(v) = lookup("AHIN_MAX_PAYLOAD_BYTES") {
            config.max_payload_bytes = parse_number("AHIN_MAX_PAYLOAD_BYTES", &v)? as usize;
        }

        config.validate()?;
        Ok(config)
    }

    /// Reject settings the kernel cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(KernelError::Config("batch_size must be at least 1".into()));
        }
        if self.anchor_interval.is_zero() {
            return Err(KernelError::Config("anchor_interval must be non-zero".into()));
        }
        if self.commit_timeout.is_zero() {
            return Err(KernelError::Config("commit_timeout must be non-zero".into()));
        }
        if self.max_payload_bytes == 0 {
            return Err(KernelError::Config("max_payload_bytes must be at least 1".into()));
        }
        Ok(())
    }

    /// The hasher every component of this kernel shares.
    pub fn hasher(&self) -> Hasher {
        Hasher::new(self.digest)
    }
}

fn parse_number(key: &str, value: &str) -> Result<u64> {
    value
        .trim()
        .parse()
        .map_err(|e| KernelError::Config(format!("{key}={value:?}: {e}")))
}
