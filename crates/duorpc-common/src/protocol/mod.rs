//! duorpc Protocol Definitions
//!
//! This module defines the message model shared by both wire dialects and the
//! codecs that map it onto the wire.
//!
//! # Protocol Types
//!
//! - **[`Message`]**: the tagged sum of request, notification and response
//! - **[`RpcError`]**: error type surfaced to callers and sessions
//! - **[`Codec`]**: the contract both dialects implement
//! - **[`MsgpackCodec`]** / **[`JsonCodec`]**: the two implementations
//!
//! # Type Aliases
//!
//! - [`RequestId`] - Unique identifier (u32) for each in-flight request
//! - [`RpcValue`] - JSON value used as the neutral parameter/result model
//!
//! # Wire Formats
//!
//! The packed dialect serializes each message as a fixed-length MessagePack
//! array whose first element is an integer tag (0=request, 1=response,
//! 2=notification). The JSON dialect uses JSON-RPC 2.0 objects. See the
//! codec modules for the exact layouts.

pub mod error;
pub mod jsonrpc;
pub mod message;
pub mod msgpack;


pub use error::{Result, RpcError};
pub use jsonrpc::JsonCodec;
pub use message::{Message, RequestId, RpcValue};
pub use msgpack::MsgpackCodec;

use crate::framing::Framer;

/// The contract both wire dialects implement.
///
/// A codec encodes one [`Message`] into a byte buffer and decodes one
/// complete message frame back into a [`Message`]. Frames are produced by
/// the codec's associated [`Framer`]; the codec re-parses every frame it is
/// handed, so framers only need to find message boundaries.
pub trait Codec: Default + Send + Sync + 'static {
    /// The incremental framer matching this codec's wire format.
    type Framer: Framer;

    /// Encode a message to its wire representation.
    fn encode(&self, message: &Message) -> Result<Vec<u8>>;

    /// Decode one complete message frame.
    ///
    /// Fails with [`RpcError::BadMessage`] on structural mismatch: wrong
    /// tag, wrong arity, missing field, or wrong protocol version.
    fn decode(&self, bytes: &[u8]) -> Result<Message>;
}
