//! Serialization codec for durable records and index snapshots.
//!
//! A bijective mapping between domain values and JSON bytes. Decode failures
//! are reported as [`CodecError::Malformed`] and must propagate: a record
//! that exists but does not parse indicates store corruption or version
//! skew, never absence.

use bytes::Bytes;
use serde::{Serialize, de::DeserializeOwned};
use thiserror::Error;

pub const CONTENT_TYPE_JSON: &str = "application/json";

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("failed to encode record: {0}")]
    Encode(#[source] serde_json::Error),
    #[error("malformed record: {0}")]
    Malformed(#[source] serde_json::Error),
}

pub fn encode<T: Serialize>(value: &T) -> Result<Bytes, CodecError> {
    serde_json::to_vec(value)
        .map(Bytes::from)
        .map_err(CodecError::Encode)
}

pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, CodecError> {
    serde_json::from_slice(bytes).map_err(CodecError::Malformed)
}
