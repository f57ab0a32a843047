//! Payload helpers: falsy detection and the typed JSON layer

use crate::error::Result;
use bytes::Bytes;
use serde::{de::DeserializeOwned, Serialize};

/// Whether a raw payload is empty under the empty-as-miss policy
///
/// Raw payloads are opaque, so only the empty string and a bare `0` count.
pub fn is_falsy(payload: &[u8]) -> bool {
    payload.is_empty() || payload == b"0"
}

/// JSON encodings of values that are falsy in loosely typed hosts
const FALSY_JSON: &[&[u8]] = &[
    b"0",
    b"0.0",
    b"false",
    b"null",
    b"\"\"",
    b"\"0\"",
    b"[]",
    b"{}",
];

/// Whether a JSON payload encodes an empty or falsy value
///
/// Used by the typed layer, where payloads are known to be JSON.
pub fn is_falsy_json(payload: &[u8]) -> bool {
    let trimmed = payload.trim_ascii();
    trimmed.is_empty() || FALSY_JSON.iter().any(|literal| *literal == trimmed)
}

/// Serialize a value for storage
pub fn encode_json<T: Serialize>(value: &T) -> Result<Bytes> {
    Ok(Bytes::from(serde_json::to_vec(value)?))
}

/// Deserialize a stored payload
pub fn decode_json<T: DeserializeOwned>(payload: &[u8]) -> Result<T> {
    Ok(serde_json::from_slice(payload)?)
}
