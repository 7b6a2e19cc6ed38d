//! The one-shot reply capability handed to server handlers.

use serde::Serialize;
use tokio::sync::mpsc;

use duorpc_common::protocol::{RequestId, RpcValue};

/// Error value sent when a handler fails without a message of its own.
pub const ERROR_DURING_CALL: &str = "Error during call";

/// Error value sent when a handler is dropped without replying.
pub const NO_RESULT: &str = "Call finished with no result";

/// Replies travel to the session's writer task as (id, outcome) pairs and
/// are flushed in the order the completions fired.
pub(crate) type ReplySender = mpsc::UnboundedSender<(RequestId, Result<RpcValue, RpcValue>)>;

/// A movable, one-shot reply capability.
///
/// Async handlers receive one of these and may carry it across tasks and
/// threads. The first of [`complete`] / [`error`] wins — both consume the
/// handler, so a second reply is unrepresentable — and dropping the handler
/// without replying sends exactly one `"Call finished with no result"`
/// error.
///
/// For notifications a detached handler is used: it swallows every reply,
/// so no reply is ever sent. Replies into a session that has already gone
/// away are dropped silently.
///
/// [`complete`]: CompletionHandler::complete
/// [`error`]: CompletionHandler::error
pub struct CompletionHandler {
    reply: Option<(RequestId, ReplySender)>,
}

impl CompletionHandler {
    pub(crate) fn new(id: RequestId, sender: ReplySender) -> Self {
        Self { reply: Some((id, sender)) }
    }

    /// A handler that swallows replies, used for notifications.
    pub(crate) fn detached() -> Self {
        Self { reply: None }
    }

    /// Reply with a result value.
    pub fn complete(mut self, value: impl Serialize) {
        match serde_json::to_value(value) {
            Ok(value) => self.send(Ok(value)),
            Err(e) => {
                tracing::error!("unserializable result: {}", e);
                self.send(Err(RpcValue::from(ERROR_DURING_CALL)));
            }
        }
    }

    /// Reply with an error message.
    pub fn error(mut self, message: impl Into<String>) {
        let message = message.into();
        self.send(Err(RpcValue::String(message)));
    }

    /// Reply with the default error message.
    pub fn error_default(self) {
        self.error(ERROR_DURING_CALL)
    }

    pub(crate) fn complete_value(mut self, value: RpcValue) {
        self.send(Ok(value));
    }

    pub(crate) fn error_value(mut self, value: RpcValue) {
        self.send(Err(value));
    }

    fn send(&mut self, reply: Result<RpcValue, RpcValue>) {
        if let Some((id, sender)) = self.reply.take() {
            if sender.send((id, reply)).is_err() {
                tracing::debug!(id, "session is gone, dropping reply");
            }
        }
    }
}

impl Drop for CompletionHandler {
    fn drop(&mut self) {
        if self.reply.is_some() {
            tracing::debug!("handler dropped without replying");
            self.send(Err(RpcValue::from(NO_RESULT)));
        }
    }
}
