//! duorpc Common Types, Codecs and Framers
//!
//! This crate provides the protocol layer shared by the duorpc client and
//! server: the message model, the two wire codecs, the incremental stream
//! framers, and the byte-stream transport seam.
//!
//! # Overview
//!
//! duorpc speaks two wire dialects over any reliable byte-stream transport:
//!
//! - **Packed dialect** (MessagePack-RPC): each message is a fixed-length
//!   MessagePack array tagged with an integer message kind.
//! - **JSON dialect** (JSON-RPC 2.0): each message is a JSON object carrying
//!   `"jsonrpc": "2.0"`.
//!
//! Both dialects share one in-memory message model ([`protocol::Message`])
//! with `serde_json::Value` as the neutral representation for parameters and
//! results, so handlers and callers are dialect-agnostic.
//!
//! # Components
//!
//! - [`protocol`] - Message model, error type, and the two codecs
//! - [`framing`] - Incremental framers turning byte chunks into message frames
//! - [`transport`] - Listener seam and TCP / UNIX-socket connect helpers
//!
//! # Example
//!
//! ```
//! use duorpc_common::protocol::{Codec, JsonCodec, Message};
//! use serde_json::json;
//!
//! let codec = JsonCodec::default();
//! let request = Message::request(1, "echo", vec![json!(42)]);
//!
//! let encoded = codec.encode(&request).unwrap();
//! let decoded = codec.decode(&encoded).unwrap();
//! assert_eq!(request, decoded);
//! ```

pub mod framing;
pub mod protocol;
pub mod transport;

pub use protocol::{Codec, JsonCodec, Message, MsgpackCodec, RpcError, Result};
