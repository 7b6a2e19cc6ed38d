//! JSON-RPC 2.0 Codec
//!
//! This module implements the JSON wire dialect, compatible with the
//! JSON-RPC 2.0 specification:
//!
//! - Request format: `{"jsonrpc": "2.0", "id": ..., "method": "...", "params": [...]}`
//! - Notification format: `{"jsonrpc": "2.0", "method": "...", "params": [...]}`
//! - Response format: `{"jsonrpc": "2.0", "id": ..., "result": ...}` or
//!   `{"jsonrpc": "2.0", "id": ..., "error": ...}`
//!
//! # Deviations from the specification
//!
//! - Request ids must be integers that fit in 32 bits; string and
//!   fractional ids are rejected.
//! - `params` must be an array when present (by-name parameters are not
//!   supported); an omitted `params` is treated as an empty array.
//! - Batch requests are not supported: a top-level array decodes as
//!   [`RpcError::BadMessage`].
//!
//! # Example
//!
//! ```
//! use duorpc_common::protocol::{Codec, JsonCodec, Message};
//! use serde_json::json;
//!
//! let codec = JsonCodec::default();
//! let encoded = codec
//!     .encode(&Message::request(7, "add", vec![json!(1), json!(2)]))
//!     .unwrap();
//! assert!(std::str::from_utf8(&encoded).unwrap().contains("\"jsonrpc\":\"2.0\""));
//! ```

use serde_json::{json, Map, Value};

use super::error::{Result, RpcError};
use super::message::{Message, RequestId, RpcValue};
use super::Codec;
use crate::framing::JsonFramer;

/// JSON-RPC protocol version stamped on every encoded message and required
/// on every decoded one.
pub const JSONRPC_VERSION: &str = "2.0";

/// The JSON wire dialect.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    type Framer = JsonFramer;

    fn encode(&self, message: &Message) -> Result<Vec<u8>> {
        let value = match message {
            Message::Request { id, method, params } => json!({
                "jsonrpc": JSONRPC_VERSION,
                "id": id,
                "method": method,
                "params": params,
            }),
            Message::Notification { method, params } => json!({
                "jsonrpc": JSONRPC_VERSION,
                "method": method,
                "params": params,
            }),
            Message::Response { id, reply } => match reply {
                Ok(result) => json!({
                    "jsonrpc": JSONRPC_VERSION,
                    "id": id,
                    "result": result,
                }),
                Err(error) => json!({
                    "jsonrpc": JSONRPC_VERSION,
                    "id": id,
                    "error": error,
                }),
            },
        };
        serde_json::to_vec(&value).map_err(|e| RpcError::bad_message(e.to_string()))
    }

    fn decode(&self, bytes: &[u8]) -> Result<Message> {
        let value: Value = serde_json::from_slice(bytes)
            .map_err(|e| RpcError::bad_message(format!("invalid JSON: {}", e)))?;

        let object = match value {
            Value::Object(object) => object,
            Value::Array(_) => {
                return Err(RpcError::bad_message("batch requests are not supported"))
            }
            other => {
                return Err(RpcError::bad_message(format!(
                    "expected a JSON object, got {}",
                    kind_of(&other)
                )))
            }
        };

        match object.get("jsonrpc").and_then(Value::as_str) {
            Some(JSONRPC_VERSION) => {}
            _ => return Err(RpcError::bad_message("missing or wrong jsonrpc version")),
        }

        if object.contains_key("method") {
            decode_call(object)
        } else {
            decode_response(object)
        }
    }
}

fn decode_call(object: Map<String, Value>) -> Result<Message> {
    let method = match object.get("method") {
        Some(Value::String(method)) => method.clone(),
        _ => return Err(RpcError::bad_message("method must be a string")),
    };

    let params = match object.get("params") {
        None => Vec::new(),
        Some(Value::Array(params)) => params.clone(),
        Some(other) => {
            return Err(RpcError::bad_message(format!(
                "params must be an array, got {}",
                kind_of(other)
            )))
        }
    };

    match object.get("id") {
        None => Ok(Message::Notification { method, params }),
        Some(id) => Ok(Message::Request { id: decode_id(id)?, method, params }),
    }
}

fn decode_response(object: Map<String, Value>) -> Result<Message> {
    let id = match object.get("id") {
        Some(id) => decode_id(id)?,
        None => return Err(RpcError::bad_message("response is missing an id")),
    };

    let reply = match (object.get("result"), object.get("error")) {
        (Some(result), None) => Ok(result.clone()),
        (None, Some(error)) => Err(error.clone()),
        (Some(_), Some(_)) => {
            return Err(RpcError::bad_message("response has both result and error"))
        }
        (None, None) => {
            return Err(RpcError::bad_message("response has neither result nor error"))
        }
    };

    Ok(Message::Response { id, reply })
}

/// Ids must be integers fitting the 32-bit id space; everything else is a
/// structural error.
fn decode_id(id: &Value) -> Result<RequestId> {
    id.as_u64()
        .filter(|id| *id <= u64::from(u32::MAX))
        .map(|id| id as RequestId)
        .ok_or_else(|| RpcError::bad_message(format!("invalid request id: {}", id)))
}

fn kind_of(value: &RpcValue) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_round_trip() {
        let codec = JsonCodec::default();
        let message = Message::request(42, "add", vec![json!(1), json!("two")]);
        let encoded = codec.encode(&message).unwrap();
        assert_eq!(codec.decode(&encoded).unwrap(), message);
    }

    #[test]
    fn test_notification_round_trip() {
        let codec = JsonCodec::default();
        let message = Message::notification("log", vec![json!({"level": "info"})]);
        let encoded = codec.encode(&message).unwrap();
        assert_eq!(codec.decode(&encoded).unwrap(), message);
    }

    #[test]
    fn test_response_round_trip() {
        let codec = JsonCodec::default();
        for reply in [
            Ok(json!([1, 2, 3])),
            Err(json!("boom")),
            Ok(Value::Null),
            // a null error is representable here: the error key is present
            Err(Value::Null),
        ] {
            let message = Message::response(7, reply);
            let encoded = codec.encode(&message).unwrap();
            assert_eq!(codec.decode(&encoded).unwrap(), message);
        }
    }

    #[test]
    fn test_missing_params_is_empty_array() {
        let codec = JsonCodec::default();
        let decoded = codec
            .decode(br#"{"jsonrpc":"2.0","id":1,"method":"ping"}"#)
            .unwrap();
        assert_eq!(decoded, Message::request(1, "ping", vec![]));
    }

    #[test]
    fn test_wrong_version_rejected() {
        let codec = JsonCodec::default();
        for raw in [
            br#"{"jsonrpc":"1.0","id":1,"method":"ping"}"#.as_slice(),
            br#"{"id":1,"method":"ping"}"#.as_slice(),
        ] {
            assert!(matches!(codec.decode(raw), Err(RpcError::BadMessage(_))));
        }
    }

    #[test]
    fn test_non_integer_id_rejected() {
        let codec = JsonCodec::default();
        for raw in [
            br#"{"jsonrpc":"2.0","id":"abc","method":"ping","params":[]}"#.as_slice(),
            br#"{"jsonrpc":"2.0","id":1.5,"method":"ping","params":[]}"#.as_slice(),
            br#"{"jsonrpc":"2.0","id":-1,"method":"ping","params":[]}"#.as_slice(),
            br#"{"jsonrpc":"2.0","id":4294967296,"method":"ping","params":[]}"#.as_slice(),
        ] {
            assert!(matches!(codec.decode(raw), Err(RpcError::BadMessage(_))));
        }
    }

    #[test]
    fn test_params_must_be_array() {
        let codec = JsonCodec::default();
        let raw = br#"{"jsonrpc":"2.0","id":1,"method":"ping","params":{"a":1}}"#;
        assert!(matches!(codec.decode(raw), Err(RpcError::BadMessage(_))));
    }

    #[test]
    fn test_batch_rejected() {
        let codec = JsonCodec::default();
        let raw = br#"[{"jsonrpc":"2.0","id":1,"method":"ping","params":[]}]"#;
        assert!(matches!(codec.decode(raw), Err(RpcError::BadMessage(_))));
    }

    #[test]
    fn test_response_must_pick_one_outcome() {
        let codec = JsonCodec::default();
        for raw in [
            br#"{"jsonrpc":"2.0","id":1,"result":1,"error":"x"}"#.as_slice(),
            br#"{"jsonrpc":"2.0","id":1}"#.as_slice(),
        ] {
            assert!(matches!(codec.decode(raw), Err(RpcError::BadMessage(_))));
        }
    }
}
