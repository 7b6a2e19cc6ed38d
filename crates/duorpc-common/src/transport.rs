//! Byte-Stream Transport Seam
//!
//! The runtime works over any reliable byte stream. This module provides
//! the small seam the server binds to ([`Listener`]) and the connect
//! helpers clients typically use. Both TCP and UNIX-domain stream sockets
//! are supported; anything implementing tokio's `AsyncRead + AsyncWrite`
//! can be plugged in directly.

use std::future::Future;
use std::io;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::{TcpListener, TcpStream, ToSocketAddrs};
#[cfg(unix)]
use tokio::net::{UnixListener, UnixStream};

/// Any reliable byte stream the runtime can drive.
pub trait ByteStream: AsyncRead + AsyncWrite + Send + Unpin {}

impl<T: AsyncRead + AsyncWrite + Send + Unpin> ByteStream for T {}

/// A type-erased stream, used so sessions and clients are not generic over
/// the concrete socket type.
pub type BoxedStream = Box<dyn ByteStream>;

/// Accept side of a transport.
pub trait Listener: Send {
    type Stream: AsyncRead + AsyncWrite + Send + Unpin + 'static;

    /// Wait for the next inbound connection.
    fn accept(&mut self) -> impl Future<Output = io::Result<Self::Stream>> + Send;
}

impl Listener for TcpListener {
    type Stream = TcpStream;

    async fn accept(&mut self) -> io::Result<TcpStream> {
        let (stream, peer) = TcpListener::accept(self).await?;
        tracing::debug!("accepted connection from {}", peer);
        stream.set_nodelay(true)?;
        Ok(stream)
    }
}

#[cfg(unix)]
impl Listener for UnixListener {
    type Stream = UnixStream;

    async fn accept(&mut self) -> io::Result<UnixStream> {
        let (stream, _) = UnixListener::accept(self).await?;
        tracing::debug!("accepted unix-socket connection");
        Ok(stream)
    }
}

/// Connect to a TCP peer, with Nagle's algorithm disabled.
pub async fn connect_tcp(addr: impl ToSocketAddrs) -> io::Result<TcpStream> {
    let stream = TcpStream::connect(addr).await?;
    stream.set_nodelay(true)?;
    Ok(stream)
}

/// Connect to a UNIX-domain stream socket.
#[cfg(unix)]
pub async fn connect_unix(path: impl AsRef<std::path::Path>) -> io::Result<UnixStream> {
    UnixStream::connect(path).await
}
