//! The hash primitive shared by every content-addressing call site.
//!
//! Event ids, Merkle pair combination and block hashes all go through one
//! [`Hasher`]. A deployment picks a [`DigestAlgorithm`] once; mixing two
//! algorithms anywhere invalidates every proof checked by the external ledger.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::Digest as _;
use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;

/// A 32-byte digest.
///
/// Ordering is byte-lexicographic, which is the order the Merkle pair rule
/// relies on.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Digest(pub [u8; 32]);

impl Digest {
    /// The zero digest (sentinel for empty trees and the genesis link).
    pub const ZERO: Self = Self([0u8; 32]);

    /// Create from raw bytes.
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes.
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Whether this is the zero sentinel.
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }

    /// Convert to a bare hex string (no prefix).
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse from hex, with or without a `0x` prefix.
    pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
        let s = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(s)?;
        if bytes.len() != 32 {
            return Err(hex::FromHexError::InvalidStringLength);
        }
        let mut arr = [0u8; 32];
        arr.copy_from_slice(&bytes);
        Ok(Self(arr))
    }
}

impl fmt::Debug for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Digest({})", &self.to_hex()[..16])
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", self.to_hex())
    }
}

impl FromStr for Digest {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s).map_err(|e| CoreError::InvalidDigest(format!("{s}: {e}")))
    }
}

impl AsRef<[u8]> for Digest {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<[u8; 32]> for Digest {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl TryFrom<&[u8]> for Digest {
    type Error = std::array::TryFromSliceError;

    fn try_from(slice: &[u8]) -> Result<Self, Self::Error> {
        let arr: [u8; 32] = slice.try_into()?;
        Ok(Self(arr))
    }
}

impl Serialize for Digest {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Digest {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Digest::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

/// The hash function a deployment is bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DigestAlgorithm {
    /// Keccak-256, as used by EVM anchor contracts.
    #[default]
    Keccak256,
    /// BLAKE3 with 32-byte output.
    Blake3,
    /// SHA-256.
    Sha256,
}

impl DigestAlgorithm {
    /// Stable identifier, used in configuration and persisted metadata.
    pub const fn as_str(&self) -> &'static str {
        match self {
            DigestAlgorithm::Keccak256 => "keccak256",
            DigestAlgorithm::Blake3 => "blake3",
            DigestAlgorithm::Sha256 => "sha256",
        }
    }
}

impl fmt::Display for DigestAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DigestAlgorithm {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "keccak256" | "keccak-256" | "keccak" => Ok(DigestAlgorithm::Keccak256),
            "blake3" => Ok(DigestAlgorithm::Blake3),
            "sha256" | "sha-256" => Ok(DigestAlgorithm::Sha256),
            other => Err(CoreError::UnknownAlgorithm(other.to_string())),
        }
    }
}

/// Deterministic content-addressing primitive.
///
/// Cheap to copy; pass the same value to every component of one deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Hasher {
    algorithm: DigestAlgorithm,
}

impl Hasher {
    /// Create a hasher for the given algorithm.
    pub const fn new(algorithm: DigestAlgorithm) -> Self {
        Self { algorithm }
    }

    /// The algorithm this hasher is bound to.
    pub const fn algorithm(&self) -> DigestAlgorithm {
        self.algorithm
    }

    /// Hash a single byte string.
    pub fn digest(&self, data: &[u8]) -> Digest {
        self.digest_parts(&[data])
    }

    /// Hash the concatenation of `parts` without allocating the joined buffer.
    pub fn digest_parts(&self, parts: &[&[u8]]) -> Digest {
        match self.algorithm {
            DigestAlgorithm::Keccak256 => {
                let mut h = sha3::Keccak256::new();
                for part in parts {
                    h.update(part);
                }
                Digest(h.finalize().into())
            }
            DigestAlgorithm::Blake3 => {
                let mut h = blake3::Hasher::new();
                for part in parts {
                    h.update(part);
                }
                Digest(*h.finalize().as_bytes())
            }
            DigestAlgorithm::Sha256 => {
                let mut h = sha2::Sha256::new();
                for part in parts {
                    h.update(part);
                }
                Digest(h.finalize().into())
            }
        }
    }
}
