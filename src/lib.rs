//! duorpc — an asynchronous dual-dialect RPC runtime.
//!
//! duorpc speaks MessagePack-RPC and JSON-RPC 2.0 over any reliable byte
//! stream (TCP, UNIX-domain sockets), with symmetric client and server
//! sides sharing one framing and dispatch engine.
//!
//! This crate is a facade over the workspace members:
//!
//! - [`duorpc_common`] — message model, codecs, framers, transport seam
//! - [`duorpc_client`] — the calling side: correlation, timeouts
//! - [`duorpc_server`] — the serving side: dispatcher, sessions
//!
//! # Quick start
//!
//! ```no_run
//! use duorpc::{Client, Dispatcher, MsgpackCodec, Server};
//! use duorpc::transport::connect_tcp;
//! use serde_json::json;
//!
//! # async fn run() -> duorpc::Result<()> {
//! let listener = tokio::net::TcpListener::bind("127.0.0.1:9000").await?;
//! let mut server: Server<MsgpackCodec, _> = Server::new(listener);
//! server.dispatcher().add("double", |(x,): (i64,)| 2 * x);
//! tokio::spawn(async move { server.serve_forever().await });
//!
//! let client: Client<MsgpackCodec> = Client::new(connect_tcp("127.0.0.1:9000").await?);
//! assert_eq!(client.call("double", vec![json!(21)]).await?, json!(42));
//! # Ok(())
//! # }
//! ```

pub use duorpc_common::framing;
pub use duorpc_common::protocol;
pub use duorpc_common::transport;
pub use duorpc_common::{Codec, JsonCodec, Message, MsgpackCodec, Result, RpcError};

pub use duorpc_client::{Client, ClientConfig};
pub use duorpc_server::{CompletionHandler, Dispatcher, Server, Session};
