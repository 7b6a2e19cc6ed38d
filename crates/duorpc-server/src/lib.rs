//! duorpc Server
//!
//! This crate provides the serving side of the runtime: a shared
//! name→handler registry, per-connection sessions, and the accept glue
//! binding them to a listener.
//!
//! # Architecture
//!
//! A [`Server`] accepts connections and produces a [`Session`] per
//! connection, all bound to one shared [`Dispatcher`]. Each session runs a
//! read loop (framer → codec → dispatch) and a writer task draining a FIFO
//! reply queue, so replies hit the wire in the order their handlers
//! completed regardless of which task produced them.
//!
//! # Handler kinds
//!
//! The dispatcher stores three kinds of handlers:
//!
//! - **Sync** ([`Dispatcher::add`]): a plain function of typed arguments,
//!   run on the session task.
//! - **Async** ([`Dispatcher::add_async`]): receives a
//!   [`CompletionHandler`], a movable one-shot reply capability, and may
//!   complete from any task or thread. Dropping it without replying sends
//!   a "Call finished with no result" error.
//! - **Future** ([`Dispatcher::add_future`]): returns a future that is
//!   spawned on a caller-supplied runtime handle; its output becomes the
//!   reply.
//!
//! # Example
//!
//! ```no_run
//! use duorpc_common::protocol::MsgpackCodec;
//! use duorpc_server::Server;
//! use tokio::net::TcpListener;
//!
//! # async fn run() -> duorpc_common::Result<()> {
//! let listener = TcpListener::bind("127.0.0.1:9000").await?;
//! let mut server: Server<MsgpackCodec, _> = Server::new(listener);
//!
//! server.dispatcher().add("double", |(x,): (i64,)| 2 * x);
//! server.serve_forever().await
//! # }
//! ```

pub mod args;
pub mod dispatcher;
pub mod handler;
pub mod server;
pub mod session;

pub use args::FromParams;
pub use dispatcher::{Dispatcher, INCOMPATIBLE_ARGUMENTS, UNKNOWN_FUNCTION};
pub use handler::{CompletionHandler, ERROR_DURING_CALL, NO_RESULT};
pub use server::Server;
pub use session::Session;
