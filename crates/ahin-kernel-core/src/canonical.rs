//! Canonical payload encoding for deterministic event ids.
//!
//! An event id is `digest(canonical(payload))`, so two producers that submit the
//! same logical JSON document with different key order or whitespace receive the
//! same id. Canonical JSON here means:
//! - Object keys sorted by byte comparison
//! - No insignificant whitespace
//! - Strings and numbers rendered as serde_json renders them

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

use crate::error::{CoreError, Result};

/// How incoming payload bytes are interpreted before hashing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PayloadEncoding {
    /// Payload must be a JSON document; it is re-encoded canonically.
    #[default]
    Json,
    /// Payload is opaque; hashed and stored verbatim.
    Raw,
}

impl fmt::Display for PayloadEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PayloadEncoding::Json => f.write_str("json"),
            PayloadEncoding::Raw => f.write_str("raw"),
        }
    }
}

impl FromStr for PayloadEncoding {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(PayloadEncoding::Json),
            "raw" => Ok(PayloadEncoding::Raw),
            other => Err(CoreError::InvalidPayload(format!(
                "unknown payload encoding: {other}"
            ))),
        }
    }
}

/// Validate and canonicalize a payload.
///
/// Rejects empty payloads and payloads larger than `max_bytes`. In JSON mode
/// the bytes must parse as a JSON document.
pub fn canonicalize_payload(
    encoding: PayloadEncoding,
    payload: &[u8],
    max_bytes: usize,
) -> Result<Vec<u8>> {
    if payload.is_empty() {
        return Err(CoreError::InvalidPayload("payload is empty".into()));
    }
    if payload.len() > max_bytes {
        return Err(CoreError::InvalidPayload(format!(
            "payload is {} bytes, limit is {}",
            payload.len(),
            max_bytes
        )));
    }

    match encoding {
        PayloadEncoding::Raw => Ok(payload.to_vec()),
        PayloadEncoding::Json => {
            let value: Value = serde_json::from_slice(payload)
                .map_err(|e| CoreError::InvalidPayload(format!("not valid JSON: {e}")))?;
            Ok(canonical_json(&value))
        }
    }
}

/// Encode a JSON value canonically.
pub fn canonical_json(value: &Value) -> Vec<u8> {
    let mut out = Vec::new();
    write_value(value, &mut out);
    out
}

fn write_value(value: &Value, out: &mut Vec<u8>) {
    match value {
        Value::Array(items) => {
            out.push(b'[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(b',');
                }
                write_value(item, out);
            }
            out.push(b']');
        }
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_by(|a, b| a.0.as_bytes().cmp(b.0.as_bytes()));

            out.push(b'{');
            for (i, (key, item)) in entries.into_iter().enumerate() {
                if i > 0 {
                    out.push(b',');
                }
                // Display on a Value::String performs JSON escaping.
                out.extend_from_slice(Value::String(key.clone()).to_string().as_bytes());
                out.push(b':');
                write_value(item, out);
            }
            out.push(b'}');
        }
        scalar => out.extend_from_slice(scalar.to_string().as_bytes()),
    }
}
