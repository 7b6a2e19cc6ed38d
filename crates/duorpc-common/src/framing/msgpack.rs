//! Incremental framer for the packed dialect.

use super::{Framer, ReadBuffer};
use crate::protocol::{Result, RpcError};

/// Finds MessagePack message boundaries by streaming a value parse over the
/// buffered bytes. A parse that runs out of input means the message is
/// still incomplete; any other parse failure is a protocol error.
#[derive(Default)]
pub struct MsgpackFramer {
    buffer: ReadBuffer,
}

impl Framer for MsgpackFramer {
    fn reserve(&mut self, n: usize) -> &mut [u8] {
        self.buffer.reserve(n)
    }

    fn consumed(&mut self, n: usize) {
        self.buffer.consumed(n)
    }

    fn next(&mut self) -> Result<Option<Vec<u8>>> {
        if self.buffer.is_empty() {
            return Ok(None);
        }

        let data = self.buffer.data();
        let mut rest = data;
        match rmpv::decode::read_value(&mut rest) {
            Ok(_) => {
                let end = data.len() - rest.len();
                let frame = data[..end].to_vec();
                self.buffer.drain_front(end);
                Ok(Some(frame))
            }
            Err(ref e) if is_incomplete(e) => Ok(None),
            Err(e) => Err(RpcError::bad_message(format!("invalid msgpack stream: {}", e))),
        }
    }
}

/// An unexpected end of input just means more bytes are needed.
fn is_incomplete(e: &rmpv::decode::Error) -> bool {
    use rmpv::decode::Error;
    match e {
        Error::InvalidMarkerRead(io) | Error::InvalidDataRead(io) => {
            io.kind() == std::io::ErrorKind::UnexpectedEof
        }
        _ => false,
    }
}
