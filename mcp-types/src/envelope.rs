use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::error_code::ErrorCode;
use crate::request_id::RequestId;

/// Literal JSON-RPC protocol version this crate speaks on the wire.
pub const JSONRPC_VERSION: &str = "2.0";

/// `{id, method, params?}` — expects a matching [`JSONRPCResponse`] or
/// [`JSONRPCError`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JSONRPCRequest {
    pub jsonrpc: String,
    pub id: RequestId,
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

/// `{method, params?}` — no `id`, no response expected.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JSONRPCNotification {
    pub jsonrpc: String,
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

/// `{id, result}` — a successful reply.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JSONRPCResponse {
    pub jsonrpc: String,
    pub id: RequestId,
    pub result: Value,
}

/// The `{code, message, data?}` triple carried by [`JSONRPCError`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JsonRpcErrorObject {
    pub code: ErrorCode,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// `{id, error:{code,message,data?}}` — a failed reply. `id` is `null` when
/// the peer could not read an id out of a malformed request (parse failure).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JSONRPCError {
    pub jsonrpc: String,
    pub id: Option<RequestId>,
    pub error: JsonRpcErrorObject,
}

/// Any one JSON-RPC message observed on the wire.
///
/// Deserialization discriminates structurally (presence of `id`/`method`/
/// `result`/`error`) rather than via a tag field, since JSON-RPC has none.
/// Messages that parse as a JSON object but match none of the four shapes
/// fall back to [`JSONRPCMessage::Unknown`] rather than failing outright, so
/// that a newer peer's not-yet-understood message shape does not take down
/// the reader loop.
#[derive(Debug, Clone, PartialEq)]
pub enum JSONRPCMessage {
    Request(JSONRPCRequest),
    Notification(JSONRPCNotification),
    Response(JSONRPCResponse),
    Error(JSONRPCError),
    /// Structurally valid JSON that matched none of the above; the raw value
    /// is preserved for diagnostics.
    Unknown(Value),
}

impl Serialize for JSONRPCMessage {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        match self {
            JSONRPCMessage::Request(r) => r.serialize(serializer),
            JSONRPCMessage::Notification(n) => n.serialize(serializer),
            JSONRPCMessage::Response(r) => r.serialize(serializer),
            JSONRPCMessage::Error(e) => e.serialize(serializer),
            JSONRPCMessage::Unknown(v) => v.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for JSONRPCMessage {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        let has_id = value.get("id").is_some();
        let has_method = value.get("method").is_some();
        let has_result = value.get("result").is_some();
        let has_error = value.get("error").is_some();

        let parsed = if has_id && has_method {
            serde_json::from_value(value.clone()).ok().map(JSONRPCMessage::Request)
        } else if has_method && !has_id {
            serde_json::from_value(value.clone()).ok().map(JSONRPCMessage::Notification)
        } else if has_id && has_result {
            serde_json::from_value(value.clone()).ok().map(JSONRPCMessage::Response)
        } else if has_error {
            serde_json::from_value(value.clone()).ok().map(JSONRPCMessage::Error)
        } else {
            None
        };

        Ok(parsed.unwrap_or(JSONRPCMessage::Unknown(value)))
    }
}

impl From<JSONRPCRequest> for JSONRPCMessage {
    fn from(value: JSONRPCRequest) -> Self {
        JSONRPCMessage::Request(value)
    }
}

impl From<JSONRPCNotification> for JSONRPCMessage {
    fn from(value: JSONRPCNotification) -> Self {
        JSONRPCMessage::Notification(value)
    }
}

impl From<JSONRPCResponse> for JSONRPCMessage {
    fn from(value: JSONRPCResponse) -> Self {
        JSONRPCMessage::Response(value)
    }
}

impl From<JSONRPCError> for JSONRPCMessage {
    fn from(value: JSONRPCError) -> Self {
        JSONRPCMessage::Error(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn round_trips_request() {
        let msg = JSONRPCMessage::Request(JSONRPCRequest {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id: RequestId::Integer(7),
            method: "ping".to_string(),
            params: None,
        });
        let json = serde_json::to_value(&msg).unwrap();
        let back: JSONRPCMessage = serde_json::from_value(json).unwrap();
        assert_eq!(msg, back);
    }

    #[test]
    fn round_trips_notification() {
        let msg = JSONRPCMessage::Notification(JSONRPCNotification {
            jsonrpc: JSONRPC_VERSION.to_string(),
            method: "notifications/initialized".to_string(),
            params: None,
        });
        let json = serde_json::to_value(&msg).unwrap();
        let back: JSONRPCMessage = serde_json::from_value(json).unwrap();
        assert_eq!(msg, back);
    }

    #[test]
    fn round_trips_error() {
        let msg = JSONRPCMessage::Error(JSONRPCError {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id: Some(RequestId::Integer(1)),
            error: JsonRpcErrorObject {
                code: ErrorCode::METHOD_NOT_FOUND,
                message: "not found".to_string(),
                data: None,
            },
        });
        let json = serde_json::to_value(&msg).unwrap();
        let back: JSONRPCMessage = serde_json::from_value(json).unwrap();
        assert_eq!(msg, back);
    }

    #[test]
    fn unrecognized_shape_falls_back_to_unknown() {
        let value = serde_json::json!({"jsonrpc": "2.0", "foo": "bar"});
        let msg: JSONRPCMessage = serde_json::from_value(value.clone()).unwrap();
        assert_eq!(msg, JSONRPCMessage::Unknown(value));
    }

    #[test]
    fn request_id_variants_are_disjoint() {
        assert_ne!(RequestId::Integer(1), RequestId::String("1".to_string()));
    }
}
