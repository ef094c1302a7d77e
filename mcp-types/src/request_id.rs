use std::fmt;

use serde::de::Error as DeError;
use serde::Deserialize;
use serde::Deserializer;
use serde::Serialize;
use serde::Serializer;

/// Identifier carried by a JSON-RPC request/response pair.
///
/// Per the JSON-RPC 2.0 spec an id is either a string or a number; this type
/// treats the two variants as disjoint for equality and hashing purposes, so
/// `RequestId::Integer(1)` never matches `RequestId::String("1".into())`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RequestId {
    String(String),
    Integer(i64),
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestId::String(s) => f.write_str(s),
            RequestId::Integer(i) => write!(f, "{i}"),
        }
    }
}

impl From<i64> for RequestId {
    fn from(value: i64) -> Self {
        RequestId::Integer(value)
    }
}

impl From<String> for RequestId {
    fn from(value: String) -> Self {
        RequestId::String(value)
    }
}

impl From<&str> for RequestId {
    fn from(value: &str) -> Self {
        RequestId::String(value.to_string())
    }
}

impl Serialize for RequestId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            RequestId::String(s) => serializer.serialize_str(s),
            RequestId::Integer(i) => serializer.serialize_i64(*i),
        }
    }
}

impl<'de> Deserialize<'de> for RequestId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = serde_json::Value::deserialize(deserializer)?;
        match value {
            serde_json::Value::String(s) => Ok(RequestId::String(s)),
            serde_json::Value::Number(n) => n
                .as_i64()
                .map(RequestId::Integer)
                .ok_or_else(|| DeError::custom("request id number is not a valid i64")),
            other => Err(DeError::custom(format!(
                "request id must be a string or integer, got {other}"
            ))),
        }
    }
}

/// Correlation key for `notifications/progress`. Shares the same on-wire
/// shape as [`RequestId`] but is kept as a distinct type since a progress
/// token is never used to key the pending-request map.
pub type ProgressToken = RequestId;
