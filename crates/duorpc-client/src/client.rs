//! The client core: request serialization, response correlation, timeouts.

use std::io;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::de::DeserializeOwned;
use tokio::io::{AsyncReadExt, AsyncWriteExt, ReadHalf, WriteHalf};
use tokio::task::JoinHandle;

use duorpc_common::framing::Framer;
use duorpc_common::protocol::{Codec, Message, Result, RpcError, RpcValue};
use duorpc_common::transport::{BoxedStream, ByteStream};

use crate::config::ClientConfig;
use crate::pending::{CallOutcome, CallTable};

/// An RPC client over one connection.
///
/// `Client` is cheap to share behind an `Arc`; [`call`] and [`notify`] take
/// `&self` and may run concurrently from any task. Requests are correlated
/// to responses through the call table; see the crate docs for the
/// exactly-once claim discipline.
///
/// Dropping the client aborts its background read task and cancels all
/// pending I/O. Outstanding calls then resolve with
/// [`RpcError::Closed`].
///
/// [`call`]: Client::call
/// [`notify`]: Client::notify
pub struct Client<C: Codec> {
    codec: Arc<C>,
    calls: Arc<CallTable>,
    next_id: AtomicU32,
    config: ClientConfig,
    writer: Arc<tokio::sync::Mutex<WriteHalf<BoxedStream>>>,
    reader: Mutex<ReaderSlot>,
}

/// The read half sits here until the first call or notification starts the
/// read task; afterwards the slot holds the task for abort-on-drop.
struct ReaderSlot {
    stream: Option<ReadHalf<BoxedStream>>,
    task: Option<JoinHandle<()>>,
}

impl<C: Codec> Client<C> {
    /// Wrap an established byte stream.
    pub fn new(stream: impl ByteStream + 'static) -> Self {
        Self::with_config(stream, ClientConfig::default())
    }

    pub fn with_config(stream: impl ByteStream + 'static, config: ClientConfig) -> Self {
        let (read, write) = tokio::io::split(Box::new(stream) as BoxedStream);
        Self {
            codec: Arc::new(C::default()),
            calls: Arc::new(CallTable::default()),
            next_id: AtomicU32::new(0),
            config,
            writer: Arc::new(tokio::sync::Mutex::new(write)),
            reader: Mutex::new(ReaderSlot { stream: Some(read), task: None }),
        }
    }

    /// Set the per-call timeout applied to every subsequent call.
    pub fn set_timeout(&mut self, timeout: Option<Duration>) {
        self.config.timeout = timeout;
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.config.timeout
    }

    /// Send a notification. Resolves once the bytes are written; no reply
    /// is ever expected.
    pub async fn notify(&self, method: &str, params: Vec<RpcValue>) -> Result<()> {
        tracing::trace!(method, "notify");
        let buf = self.codec.encode(&Message::notification(method, params))?;
        self.ensure_reading();
        self.write(&buf)
            .await
            .map_err(|e| RpcError::Write(e.to_string()))
    }

    /// Call a remote method and await its outcome.
    ///
    /// Resolves with the result value, or with [`RpcError::Call`] if the
    /// peer answered with an error, [`RpcError::Timeout`] if the configured
    /// timeout expired first, [`RpcError::Write`] if the request could not
    /// be written, or [`RpcError::Closed`] if the connection went away.
    pub async fn call(&self, method: &str, params: Vec<RpcValue>) -> Result<RpcValue> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(method, id, "call");
        let buf = self.codec.encode(&Message::request(id, method, params))?;

        let mut rx = self.calls.insert(id);
        self.ensure_reading();

        if let Err(e) = self.write(&buf).await {
            // cancel the call; nobody else may complete it anymore
            self.calls.remove(id);
            return Err(RpcError::Write(e.to_string()));
        }

        match self.config.timeout {
            None => await_outcome(&mut rx).await,
            Some(limit) => match tokio::time::timeout(limit, &mut rx).await {
                Ok(outcome) => flatten(outcome),
                Err(_) => {
                    if self.calls.remove(id).is_some() {
                        tracing::debug!(id, "call timed out");
                        Err(RpcError::Timeout)
                    } else {
                        // the response claimed the entry first; take its
                        // outcome instead of reporting a timeout
                        await_outcome(&mut rx).await
                    }
                }
            },
        }
    }

    /// [`call`] plus a typed decode of the result value.
    ///
    /// [`call`]: Client::call
    pub async fn call_as<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Vec<RpcValue>,
    ) -> Result<T> {
        let value = self.call(method, params).await?;
        serde_json::from_value(value)
            .map_err(|e| RpcError::bad_message(format!("unexpected result type: {}", e)))
    }

    async fn write(&self, buf: &[u8]) -> io::Result<()> {
        let mut writer = self.writer.lock().await;
        writer.write_all(buf).await?;
        writer.flush().await
    }

    /// Start the background read task if it is not already running. At
    /// most one read chain is ever active.
    fn ensure_reading(&self) {
        let mut slot = self.reader.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(read) = slot.stream.take() {
            let codec = Arc::clone(&self.codec);
            let calls = Arc::clone(&self.calls);
            let reserve = self.config.read_buffer;
            slot.task = Some(tokio::spawn(read_loop(read, codec, calls, reserve)));
        }
    }
}

impl<C: Codec> Drop for Client<C> {
    fn drop(&mut self) {
        let slot = self.reader.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(task) = &slot.task {
            task.abort();
        }
    }
}

async fn await_outcome(rx: &mut tokio::sync::oneshot::Receiver<CallOutcome>) -> Result<RpcValue> {
    match rx.await {
        Ok(outcome) => outcome,
        Err(_) => Err(RpcError::Closed),
    }
}

fn flatten(
    outcome: std::result::Result<CallOutcome, tokio::sync::oneshot::error::RecvError>,
) -> Result<RpcValue> {
    match outcome {
        Ok(outcome) => outcome,
        Err(_) => Err(RpcError::Closed),
    }
}

/// Feed the framer until the connection dies, routing every response to its
/// caller. A response-shaped protocol violation or a framing error stops
/// the task; outstanding calls are then failed so nobody hangs.
async fn read_loop<C: Codec>(
    mut read: ReadHalf<BoxedStream>,
    codec: Arc<C>,
    calls: Arc<CallTable>,
    reserve: usize,
) {
    let mut framer = C::Framer::default();
    'io: loop {
        let chunk = framer.reserve(reserve);
        match read.read(chunk).await {
            Ok(0) => {
                tracing::debug!("connection closed by peer");
                break;
            }
            Ok(n) => framer.consumed(n),
            Err(e) => {
                tracing::warn!("read error: {}", e);
                break;
            }
        }

        loop {
            match framer.next() {
                Ok(Some(frame)) => match codec.decode(&frame) {
                    Ok(Message::Response { id, reply }) => {
                        calls.complete(id, reply.map_err(RpcError::Call));
                    }
                    Ok(message) => {
                        tracing::error!(
                            "unexpected {:?} message on a client connection",
                            message.method()
                        );
                        break 'io;
                    }
                    Err(e) => {
                        tracing::error!("decode error: {}", e);
                        break 'io;
                    }
                },
                Ok(None) => break,
                Err(e) => {
                    tracing::error!("framing error: {}", e);
                    break 'io;
                }
            }
        }
    }

    let drained = calls.drain();
    if drained > 0 {
        tracing::debug!("failed {} outstanding calls on teardown", drained);
    }
}
