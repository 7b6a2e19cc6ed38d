//! Accept glue: turn inbound connections into running sessions.

use std::marker::PhantomData;
use std::sync::Arc;

use duorpc_common::protocol::{Codec, Result};
use duorpc_common::transport::{BoxedStream, Listener};

use crate::dispatcher::Dispatcher;
use crate::session::Session;

/// An RPC server bound to a listener.
///
/// Every accepted connection becomes a [`Session`] sharing the server's
/// [`Dispatcher`]. Several servers (say, a TCP and a UNIX-socket endpoint,
/// or one endpoint per dialect) may share a single dispatcher; all of them
/// then serve the same method set.
pub struct Server<C: Codec, L: Listener> {
    listener: L,
    dispatcher: Arc<Dispatcher>,
    _codec: PhantomData<C>,
}

impl<C: Codec, L: Listener> Server<C, L> {
    /// Create a server with its own empty dispatcher.
    pub fn new(listener: L) -> Self {
        Self::with_dispatcher(listener, Arc::new(Dispatcher::new()))
    }

    /// Create a server on an existing (possibly shared) dispatcher.
    pub fn with_dispatcher(listener: L, dispatcher: Arc<Dispatcher>) -> Self {
        Self { listener, dispatcher, _codec: PhantomData }
    }

    /// The shared method registry.
    pub fn dispatcher(&self) -> Arc<Dispatcher> {
        Arc::clone(&self.dispatcher)
    }

    /// Accept one connection and hand the new session to `on_session`.
    ///
    /// The session does nothing until [`Session::start`] is called, so the
    /// callback may inspect or decorate before starting it.
    pub async fn serve(&mut self, on_session: impl FnOnce(Session<C>)) -> Result<()> {
        let stream = self.listener.accept().await?;
        let session = Session::new(Box::new(stream) as BoxedStream, Arc::clone(&self.dispatcher));
        on_session(session);
        Ok(())
    }

    /// Accept connections forever, starting every session immediately.
    /// Resolves only with the first accept error.
    pub async fn serve_forever(&mut self) -> Result<()> {
        loop {
            self.serve(Session::start).await?;
        }
    }
}
