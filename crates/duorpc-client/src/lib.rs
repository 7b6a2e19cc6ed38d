//! duorpc Client
//!
//! This crate provides the calling side of the runtime: it serializes
//! requests and notifications onto a byte stream, correlates responses back
//! to their callers by request id, and enforces an optional per-call
//! timeout.
//!
//! # Architecture
//!
//! A [`Client`] owns the write half of its stream and a call table mapping
//! in-flight request ids to one-shot completions. The read half is driven
//! by a background task, started lazily on the first call or notification,
//! which feeds the dialect's framer and routes each decoded response to the
//! matching completion. Whichever of {response, timeout, write failure}
//! claims a call-table entry first delivers the outcome; the losers find
//! the entry gone and back off, so every call resolves exactly once.
//!
//! # Example
//!
//! ```no_run
//! use duorpc_client::Client;
//! use duorpc_common::protocol::MsgpackCodec;
//! use duorpc_common::transport::connect_tcp;
//! use serde_json::json;
//!
//! # async fn run() -> duorpc_common::Result<()> {
//! let stream = connect_tcp("127.0.0.1:9000").await?;
//! let client: Client<MsgpackCodec> = Client::new(stream);
//!
//! let doubled = client.call("double", vec![json!(21)]).await?;
//! assert_eq!(doubled, json!(42));
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
mod pending;

pub use client::Client;
pub use config::ClientConfig;
