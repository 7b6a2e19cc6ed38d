use thiserror::Error;

use super::message::RpcValue;

/// Errors surfaced to callers and sessions.
///
/// The `Display` form of each variant is stable; it is what gets embedded in
/// response values where the protocol calls for a string-form error (for
/// example a timed-out call resolves with the `"Timeout"` string).
#[derive(Error, Debug)]
pub enum RpcError {
    /// The call did not complete within the configured timeout.
    #[error("Timeout")]
    Timeout,

    /// The peer answered with an error value (unknown method, bad
    /// arguments, or a handler-provided error).
    #[error("Call error: {0}")]
    Call(RpcValue),

    /// Writing the request or notification to the transport failed. The
    /// call was cancelled before a response could arrive.
    #[error("Write error: {0}")]
    Write(String),

    /// Structurally invalid message: bad framing, wrong tag, wrong arity,
    /// missing field, or wrong protocol version. Fatal to the connection.
    #[error("Bad message: {0}")]
    BadMessage(String),

    /// The connection went away while the call was outstanding.
    #[error("Connection closed")]
    Closed,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, RpcError>;

impl RpcError {
    /// Shorthand used by the codecs and framers.
    pub fn bad_message(context: impl Into<String>) -> Self {
        RpcError::BadMessage(context.into())
    }
}
