//! MessagePack-RPC Codec
//!
//! This module implements the packed wire dialect. Each message is a
//! fixed-length MessagePack array whose first element is an integer tag:
//!
//! - Request: `[0, id, method, params]`
//! - Response: `[1, id, error, result]` (at most one of error/result non-nil)
//! - Notification: `[2, method, params]`
//!
//! A nil error slot is what marks a response as successful, so a `null`
//! error *value* has no representation of its own: encoding substitutes
//! the default error text for it, keeping error replies distinguishable
//! from successes.
//!
//! Parameters and results cross between the MessagePack value model and the
//! neutral [`RpcValue`] at this boundary. Payloads the neutral model cannot
//! represent (non-UTF-8 strings, raw binary, extension types, non-string map
//! keys, non-finite floats) are rejected as [`RpcError::BadMessage`].

use rmpv::Value as WireValue;
use serde_json::Value;

use super::error::{Result, RpcError};
use super::message::{Message, RequestId, RpcValue};
use super::Codec;
use crate::framing::MsgpackFramer;

const TAG_REQUEST: u64 = 0;
const TAG_RESPONSE: u64 = 1;
const TAG_NOTIFICATION: u64 = 2;

/// Substituted for a `null` error payload: a nil error slot marks success
/// on this wire, so a nil error value must never reach it.
const NIL_ERROR_TEXT: &str = "Error during call";

/// The packed (MessagePack-RPC) wire dialect.
#[derive(Debug, Default, Clone, Copy)]
pub struct MsgpackCodec;

impl Codec for MsgpackCodec {
    type Framer = MsgpackFramer;

    fn encode(&self, message: &Message) -> Result<Vec<u8>> {
        let envelope = match message {
            Message::Request { id, method, params } => WireValue::Array(vec![
                WireValue::from(TAG_REQUEST),
                WireValue::from(*id),
                WireValue::from(method.as_str()),
                to_wire_params(params),
            ]),
            Message::Notification { method, params } => WireValue::Array(vec![
                WireValue::from(TAG_NOTIFICATION),
                WireValue::from(method.as_str()),
                to_wire_params(params),
            ]),
            Message::Response { id, reply } => {
                let (error, result) = match reply {
                    Ok(result) => (WireValue::Nil, to_wire(result)),
                    Err(error) => {
                        let error = match to_wire(error) {
                            WireValue::Nil => WireValue::from(NIL_ERROR_TEXT),
                            error => error,
                        };
                        (error, WireValue::Nil)
                    }
                };
                WireValue::Array(vec![
                    WireValue::from(TAG_RESPONSE),
                    WireValue::from(*id),
                    error,
                    result,
                ])
            }
        };

        let mut buf = Vec::new();
        rmpv::encode::write_value(&mut buf, &envelope)
            .map_err(|e| RpcError::bad_message(e.to_string()))?;
        Ok(buf)
    }

    fn decode(&self, bytes: &[u8]) -> Result<Message> {
        let mut rest = bytes;
        let envelope = rmpv::decode::read_value(&mut rest)
            .map_err(|e| RpcError::bad_message(format!("invalid msgpack: {}", e)))?;
        if !rest.is_empty() {
            return Err(RpcError::bad_message("trailing bytes after message"));
        }

        let fields = match envelope {
            WireValue::Array(fields) => fields,
            other => {
                return Err(RpcError::bad_message(format!(
                    "expected an array envelope, got {}",
                    other
                )))
            }
        };

        let tag = fields
            .first()
            .and_then(WireValue::as_u64)
            .ok_or_else(|| RpcError::bad_message("missing message tag"))?;

        match tag {
            TAG_REQUEST => {
                let [_, id, method, params] = expect_arity::<4>(fields)?;
                Ok(Message::Request {
                    id: decode_id(&id)?,
                    method: decode_method(method)?,
                    params: decode_params(params)?,
                })
            }
            TAG_NOTIFICATION => {
                let [_, method, params] = expect_arity::<3>(fields)?;
                Ok(Message::Notification {
                    method: decode_method(method)?,
                    params: decode_params(params)?,
                })
            }
            TAG_RESPONSE => {
                let [_, id, error, result] = expect_arity::<4>(fields)?;
                let id = decode_id(&id)?;
                let reply = match (error, result) {
                    (WireValue::Nil, result) => Ok(from_wire(result)?),
                    (error, WireValue::Nil) => Err(from_wire(error)?),
                    _ => {
                        return Err(RpcError::bad_message(
                            "response has both error and result",
                        ))
                    }
                };
                Ok(Message::Response { id, reply })
            }
            tag => Err(RpcError::bad_message(format!("unknown message tag {}", tag))),
        }
    }
}

fn expect_arity<const N: usize>(fields: Vec<WireValue>) -> Result<[WireValue; N]> {
    let len = fields.len();
    fields
        .try_into()
        .map_err(|_| RpcError::bad_message(format!("expected {} elements, got {}", N, len)))
}

fn decode_id(id: &WireValue) -> Result<RequestId> {
    id.as_u64()
        .filter(|id| *id <= u64::from(u32::MAX))
        .map(|id| id as RequestId)
        .ok_or_else(|| RpcError::bad_message(format!("invalid request id: {}", id)))
}

fn decode_method(method: WireValue) -> Result<String> {
    match method {
        WireValue::String(s) => s
            .into_str()
            .ok_or_else(|| RpcError::bad_message("method name is not UTF-8")),
        other => Err(RpcError::bad_message(format!(
            "method must be a string, got {}",
            other
        ))),
    }
}

fn decode_params(params: WireValue) -> Result<Vec<RpcValue>> {
    match params {
        WireValue::Array(items) => items.into_iter().map(from_wire).collect(),
        other => Err(RpcError::bad_message(format!(
            "params must be an array, got {}",
            other
        ))),
    }
}

fn to_wire_params(params: &[RpcValue]) -> WireValue {
    WireValue::Array(params.iter().map(to_wire).collect())
}

/// Neutral value → MessagePack value. Total: every JSON value has a packed
/// representation.
fn to_wire(value: &RpcValue) -> WireValue {
    match value {
        Value::Null => WireValue::Nil,
        Value::Bool(b) => WireValue::from(*b),
        Value::Number(n) => {
            if let Some(u) = n.as_u64() {
                WireValue::from(u)
            } else if let Some(i) = n.as_i64() {
                WireValue::from(i)
            } else {
                // serde_json numbers are u64, i64 or finite f64
                WireValue::F64(n.as_f64().unwrap_or(0.0))
            }
        }
        Value::String(s) => WireValue::from(s.as_str()),
        Value::Array(items) => WireValue::Array(items.iter().map(to_wire).collect()),
        Value::Object(map) => WireValue::Map(
            map.iter()
                .map(|(k, v)| (WireValue::from(k.as_str()), to_wire(v)))
                .collect(),
        ),
    }
}

/// MessagePack value → neutral value. Partial: see the module docs for the
/// rejected shapes.
fn from_wire(value: WireValue) -> Result<RpcValue> {
    match value {
        WireValue::Nil => Ok(Value::Null),
        WireValue::Boolean(b) => Ok(Value::Bool(b)),
        WireValue::Integer(i) => {
            if let Some(u) = i.as_u64() {
                Ok(Value::from(u))
            } else if let Some(n) = i.as_i64() {
                Ok(Value::from(n))
            } else {
                Err(RpcError::bad_message(format!("unrepresentable integer {}", i)))
            }
        }
        WireValue::F32(f) => decode_float(f64::from(f)),
        WireValue::F64(f) => decode_float(f),
        WireValue::String(s) => s
            .into_str()
            .map(Value::String)
            .ok_or_else(|| RpcError::bad_message("non-UTF-8 string payload")),
        WireValue::Array(items) => items
            .into_iter()
            .map(from_wire)
            .collect::<Result<Vec<_>>>()
            .map(Value::Array),
        WireValue::Map(entries) => {
            let mut map = serde_json::Map::with_capacity(entries.len());
            for (key, value) in entries {
                let key = match key {
                    WireValue::String(s) => s.into_str().ok_or_else(|| {
                        RpcError::bad_message("non-UTF-8 map key")
                    })?,
                    other => {
                        return Err(RpcError::bad_message(format!(
                            "map keys must be strings, got {}",
                            other
                        )))
                    }
                };
                map.insert(key, from_wire(value)?);
            }
            Ok(Value::Object(map))
        }
        WireValue::Binary(_) => Err(RpcError::bad_message("binary payloads are not supported")),
        WireValue::Ext(kind, _) => Err(RpcError::bad_message(format!(
            "extension type {} is not supported",
            kind
        ))),
    }
}

fn decode_float(f: f64) -> Result<RpcValue> {
    serde_json::Number::from_f64(f)
        .map(Value::Number)
        .ok_or_else(|| RpcError::bad_message("non-finite float payload"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_round_trip() {
        let codec = MsgpackCodec::default();
        let message = Message::request(
            42,
            "concat",
            vec![json!("a"), json!([1, 2.5, null]), json!({"k": true})],
        );
        let encoded = codec.encode(&message).unwrap();
        assert_eq!(codec.decode(&encoded).unwrap(), message);
    }

    #[test]
    fn test_notification_round_trip() {
        let codec = MsgpackCodec::default();
        let message = Message::notification("sink", vec![json!(-3)]);
        let encoded = codec.encode(&message).unwrap();
        assert_eq!(codec.decode(&encoded).unwrap(), message);
    }

    #[test]
    fn test_response_round_trip() {
        let codec = MsgpackCodec::default();
        for reply in [Ok(json!(84)), Err(json!("Unknown function")), Ok(Value::Null)] {
            let message = Message::response(9, reply);
            let encoded = codec.encode(&message).unwrap();
            assert_eq!(codec.decode(&encoded).unwrap(), message);
        }
    }

    #[test]
    fn test_null_error_does_not_collide_with_success() {
        let codec = MsgpackCodec::default();
        let encoded = codec
            .encode(&Message::response(9, Err(Value::Null)))
            .unwrap();
        // must decode as an error, never as a successful null result
        match codec.decode(&encoded).unwrap() {
            Message::Response { id: 9, reply: Err(error) } => {
                assert_eq!(error, json!(NIL_ERROR_TEXT));
            }
            other => panic!("unexpected decode: {:?}", other),
        }
    }

    #[test]
    fn test_wrong_tag_rejected() {
        let codec = MsgpackCodec::default();
        let mut buf = Vec::new();
        let envelope = WireValue::Array(vec![
            WireValue::from(7u64),
            WireValue::from(1u32),
            WireValue::from("m"),
            WireValue::Array(vec![]),
        ]);
        rmpv::encode::write_value(&mut buf, &envelope).unwrap();
        assert!(matches!(codec.decode(&buf), Err(RpcError::BadMessage(_))));
    }

    #[test]
    fn test_wrong_arity_rejected() {
        let codec = MsgpackCodec::default();
        let mut buf = Vec::new();
        // a request with a trailing extension element
        let envelope = WireValue::Array(vec![
            WireValue::from(TAG_REQUEST),
            WireValue::from(1u32),
            WireValue::from("m"),
            WireValue::Array(vec![]),
            WireValue::Nil,
        ]);
        rmpv::encode::write_value(&mut buf, &envelope).unwrap();
        assert!(matches!(codec.decode(&buf), Err(RpcError::BadMessage(_))));
    }

    #[test]
    fn test_non_array_envelope_rejected() {
        let codec = MsgpackCodec::default();
        let mut buf = Vec::new();
        rmpv::encode::write_value(&mut buf, &WireValue::from("hello")).unwrap();
        assert!(matches!(codec.decode(&buf), Err(RpcError::BadMessage(_))));
    }

    #[test]
    fn test_response_with_both_outcomes_rejected() {
        let codec = MsgpackCodec::default();
        let mut buf = Vec::new();
        let envelope = WireValue::Array(vec![
            WireValue::from(TAG_RESPONSE),
            WireValue::from(1u32),
            WireValue::from("err"),
            WireValue::from("res"),
        ]);
        rmpv::encode::write_value(&mut buf, &envelope).unwrap();
        assert!(matches!(codec.decode(&buf), Err(RpcError::BadMessage(_))));
    }
}
