//! Per-connection server state: the read loop and the reply writer.

use std::sync::Arc;

use tokio::io::{AsyncReadExt, AsyncWriteExt, ReadHalf, WriteHalf};
use tokio::sync::mpsc;

use duorpc_common::framing::Framer;
use duorpc_common::protocol::{Codec, Message, RequestId, RpcValue};
use duorpc_common::transport::BoxedStream;

use crate::dispatcher::{Dispatcher, Handler, UNKNOWN_FUNCTION};
use crate::handler::{CompletionHandler, ReplySender, ERROR_DURING_CALL};

/// How many bytes each read reserves in the framer.
const READ_RESERVE: usize = 4096;

/// One accepted connection, not yet running.
///
/// [`start`] consumes the session and spawns its two tasks: a reader
/// driving framer → codec → dispatch, and a writer draining the reply
/// queue. The session ends when the peer disconnects, a framing or decode
/// error occurs, or a write fails.
///
/// [`start`]: Session::start
pub struct Session<C: Codec> {
    stream: BoxedStream,
    dispatcher: Arc<Dispatcher>,
    codec: C,
}

impl<C: Codec> Session<C> {
    pub(crate) fn new(stream: BoxedStream, dispatcher: Arc<Dispatcher>) -> Self {
        Self { stream, dispatcher, codec: C::default() }
    }

    /// Start serving the connection in the background.
    pub fn start(self) {
        tracing::debug!("starting session");
        let (read, write) = tokio::io::split(self.stream);
        let (reply_tx, reply_rx) = mpsc::unbounded_channel();
        tokio::spawn(write_loop(self.codec, write, reply_rx));
        tokio::spawn(read_loop::<C>(read, self.dispatcher, reply_tx));
    }
}

/// Encode and write completed replies in the order they fired. A write
/// failure ends the session; later replies find the queue closed and are
/// dropped silently.
async fn write_loop<C: Codec>(
    codec: C,
    mut write: WriteHalf<BoxedStream>,
    mut replies: mpsc::UnboundedReceiver<(RequestId, Result<RpcValue, RpcValue>)>,
) {
    while let Some((id, reply)) = replies.recv().await {
        let buf = match codec.encode(&Message::response(id, reply)) {
            Ok(buf) => buf,
            Err(e) => {
                tracing::error!(id, "failed to encode reply: {}", e);
                continue;
            }
        };
        if let Err(e) = write.write_all(&buf).await {
            tracing::warn!("write error: {}", e);
            break;
        }
    }
    tracing::debug!("session writer stopped");
}

async fn read_loop<C: Codec>(
    mut read: ReadHalf<BoxedStream>,
    dispatcher: Arc<Dispatcher>,
    replies: ReplySender,
) {
    let codec = C::default();
    let mut framer = C::Framer::default();

    'io: loop {
        // the writer half may have died on a write error
        if replies.is_closed() {
            break;
        }

        let chunk = framer.reserve(READ_RESERVE);
        match read.read(chunk).await {
            Ok(0) => {
                tracing::debug!("peer disconnected");
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
                    Ok(Message::Request { id, method, params }) => {
                        let completion = CompletionHandler::new(id, replies.clone());
                        dispatch(&dispatcher, &method, params, completion);
                    }
                    Ok(Message::Notification { method, params }) => {
                        dispatch(&dispatcher, &method, params, CompletionHandler::detached());
                    }
                    Ok(Message::Response { id, .. }) => {
                        tracing::error!(id, "unexpected response on a server connection");
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
    tracing::debug!("session reader stopped");
}

/// Resolve the method and invoke its handler. For notifications the
/// completion is detached, so nothing here can produce a reply.
fn dispatch(
    dispatcher: &Dispatcher,
    method: &str,
    params: Vec<RpcValue>,
    completion: CompletionHandler,
) {
    let Some(handler) = dispatcher.get(method) else {
        tracing::debug!(method, "unknown function");
        completion.error(UNKNOWN_FUNCTION);
        return;
    };

    tracing::trace!(method, "dispatch");
    match &*handler {
        Handler::Sync(run) => match run(&params) {
            Ok(value) => completion.complete_value(value),
            Err(error) => completion.error_value(error),
        },
        Handler::Async(run) => run(completion, params),
        Handler::Future { handle, run } => {
            let task = handle.spawn(run(params));
            handle.spawn(async move {
                match task.await {
                    Ok(Ok(value)) => completion.complete_value(value),
                    Ok(Err(error)) => completion.error_value(error),
                    Err(e) => {
                        // a panicking handler must not tear down the session
                        tracing::error!("handler task failed: {}", e);
                        completion.error(ERROR_DURING_CALL);
                    }
                }
            });
        }
    }
}
