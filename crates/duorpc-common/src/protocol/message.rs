//! The dialect-neutral RPC message model.

use serde_json::Value;

/// Unique identifier for an in-flight request.
///
/// Ids are allocated from a circular 32-bit space by the client; the peer
/// echoes the id back in the matching response.
pub type RequestId = u32;

/// Neutral parameter/result value, shared by both dialects.
///
/// The packed dialect converts to and from MessagePack values at the codec
/// boundary; everything above the codec works with JSON values.
pub type RpcValue = Value;

/// One RPC message.
///
/// A response carries `Ok(result)` or `Err(error)`, which makes a reply
/// with both result and error populated unrepresentable. A `null` error
/// value round-trips through the JSON dialect but not through the packed
/// one, where a nil error slot marks success: its codec substitutes the
/// default error text on encode.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    Request {
        id: RequestId,
        method: String,
        params: Vec<RpcValue>,
    },
    Notification {
        method: String,
        params: Vec<RpcValue>,
    },
    Response {
        id: RequestId,
        reply: Result<RpcValue, RpcValue>,
    },
}

impl Message {
    pub fn request(id: RequestId, method: impl Into<String>, params: Vec<RpcValue>) -> Self {
        Message::Request { id, method: method.into(), params }
    }

    pub fn notification(method: impl Into<String>, params: Vec<RpcValue>) -> Self {
        Message::Notification { method: method.into(), params }
    }

    pub fn response(id: RequestId, reply: Result<RpcValue, RpcValue>) -> Self {
        Message::Response { id, reply }
    }

    /// The method name, for requests and notifications.
    pub fn method(&self) -> Option<&str> {
        match self {
            Message::Request { method, .. } | Message::Notification { method, .. } => {
                Some(method)
            }
            Message::Response { .. } => None,
        }
    }
}
