//! Cached payloads and their on-disk encoding.

use crate::error::{CacheError, CacheResult};
use serde::{Serialize, de::DeserializeOwned};

/// Header flag for raw scalar payloads.
const SCALAR_FLAG: u8 = b'0';

/// Header flag for payloads that must be deserialized on read.
const STRUCTURED_FLAG: u8 = b'1';

/// Separator between the header flag and the payload.
const HEADER_SEPARATOR: u8 = b'|';

/// A value held by a cache backend.
///
/// Scalars are stored verbatim, which is what lets backends adjust
/// integer counters in place. Structured values are serialized to JSON
/// on write and parsed back on read.
#[derive(Debug, Clone, PartialEq)]
pub enum CacheValue {
    /// Raw scalar text
    Scalar(String),
    /// Structured value requiring (de)serialization
    Structured(serde_json::Value),
}

impl CacheValue {
    /// Build a structured value from anything serializable.
    pub fn structured<T: Serialize>(value: &T) -> CacheResult<Self> {
        serde_json::to_value(value)
            .map(Self::Structured)
            .map_err(|e| CacheError::Serialization(e.to_string()))
    }

    /// Convert the value into a typed result.
    ///
    /// Scalars are parsed as JSON first and fall back to a JSON string, so
    /// a scalar `"42"` reads back as `42u64` and a scalar `"baggins"` as
    /// `String::from("baggins")`.
    pub fn deserialize<T: DeserializeOwned>(&self) -> CacheResult<T> {
        let result = match self {
            Self::Structured(value) => serde_json::from_value(value.clone()),
            Self::Scalar(text) => serde_json::from_str(text)
                .or_else(|_| serde_json::from_value(serde_json::Value::String(text.clone()))),
        };
        result.map_err(|e| CacheError::Deserialization(e.to_string()))
    }

    /// Interpret a scalar as an integer counter.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Scalar(text) => text.trim().parse().ok(),
            Self::Structured(serde_json::Value::Number(n)) => n.as_i64(),
            Self::Structured(_) => None,
        }
    }

    /// Borrow the scalar text, if this is a scalar.
    pub fn as_scalar(&self) -> Option<&str> {
        match self {
            Self::Scalar(text) => Some(text),
            Self::Structured(_) => None,
        }
    }

    /// Whether this value needs deserialization on read.
    pub fn is_structured(&self) -> bool {
        matches!(self, Self::Structured(_))
    }

    /// Encode with the one-byte flag header: `0|<raw>` or `1|<json>`.
    pub fn encode(&self) -> CacheResult<Vec<u8>> {
        let (flag, payload) = match self {
            Self::Scalar(text) => (SCALAR_FLAG, text.clone()),
            Self::Structured(value) => (
                STRUCTURED_FLAG,
                serde_json::to_string(value)
                    .map_err(|e| CacheError::Serialization(e.to_string()))?,
            ),
        };

        let mut bytes = Vec::with_capacity(payload.len() + 2);
        bytes.push(flag);
        bytes.push(HEADER_SEPARATOR);
        bytes.extend_from_slice(payload.as_bytes());
        Ok(bytes)
    }

    /// Decode bytes written by [`CacheValue::encode`].
    pub fn decode(bytes: &[u8]) -> CacheResult<Self> {
        let (header, payload) = split_header(bytes)
            .ok_or_else(|| CacheError::Deserialization("missing value header".to_string()))?;

        let payload = std::str::from_utf8(payload)
            .map_err(|e| CacheError::Deserialization(e.to_string()))?;

        match header {
            STRUCTURED_FLAG => serde_json::from_str(payload)
                .map(Self::Structured)
                .map_err(|e| CacheError::Deserialization(e.to_string())),
            _ => Ok(Self::Scalar(payload.to_string())),
        }
    }
}

/// Split `<flag>|<payload>` into its parts.
pub(crate) fn split_header(bytes: &[u8]) -> Option<(u8, &[u8])> {
    match bytes {
        [flag, HEADER_SEPARATOR, rest @ ..] => Some((*flag, rest)),
        _ => None,
    }
}

/// Re-encode an adjusted counter, keeping its original header flag.
pub(crate) fn encode_counter(flag: u8, value: i64) -> Vec<u8> {
    let mut bytes = vec![flag, HEADER_SEPARATOR];
    bytes.extend_from_slice(value.to_string().as_bytes());
    bytes
}

impl From<&str> for CacheValue {
    fn from(value: &str) -> Self {
        Self::Scalar(value.to_string())
    }
}

impl From<String> for CacheValue {
    fn from(value: String) -> Self {
        Self::Scalar(value)
    }
}

impl From<i64> for CacheValue {
    fn from(value: i64) -> Self {
        Self::Scalar(value.to_string())
    }
}

impl From<u64> for CacheValue {
    fn from(value: u64) -> Self {
        Self::Scalar(value.to_string())
    }
}

impl From<serde_json::Value> for CacheValue {
    fn from(value: serde_json::Value) -> Self {
        Self::Structured(value)
    }
}
