//! The name→handler registry shared by all sessions of one or more servers.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::future::Future;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard};

use serde::Serialize;
use tokio::runtime::Handle;

use duorpc_common::protocol::RpcValue;

use crate::args::FromParams;
use crate::handler::{CompletionHandler, ERROR_DURING_CALL};

/// Error value sent back for a request naming no registered method.
pub const UNKNOWN_FUNCTION: &str = "Unknown function";

/// Error value sent back when the params array does not match the handler's
/// declared signature.
pub const INCOMPATIBLE_ARGUMENTS: &str = "Incompatible arguments";

pub(crate) type BoxFuture = Pin<Box<dyn Future<Output = Result<RpcValue, RpcValue>> + Send>>;

type SyncHandler = Box<dyn Fn(&[RpcValue]) -> Result<RpcValue, RpcValue> + Send + Sync>;
type AsyncHandler = Box<dyn Fn(CompletionHandler, Vec<RpcValue>) + Send + Sync>;
type FutureHandler = Box<dyn Fn(Vec<RpcValue>) -> BoxFuture + Send + Sync>;

/// The registered handler kinds. Each `add*` method wraps the user
/// function in an adapter that performs typed argument decoding, so the
/// variants only deal in raw params.
pub(crate) enum Handler {
    Sync(SyncHandler),
    Async(AsyncHandler),
    Future { handle: Handle, run: FutureHandler },
}

/// Name→handler registry.
///
/// May be shared between any number of servers and sessions; all of them
/// dispatch against the same method set. The internal mutex is held only
/// for lookup, insertion and removal — user handlers always run outside it.
#[derive(Default)]
pub struct Dispatcher {
    handlers: Mutex<HashMap<String, Arc<Handler>>>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a synchronous handler.
    ///
    /// Returns false (and leaves the registry unchanged) if `name` is
    /// already registered. The handler runs on the session task; a panic
    /// inside it is caught and converted into an `"Error during call"`
    /// reply.
    ///
    /// # Example
    ///
    /// ```
    /// use duorpc_server::Dispatcher;
    ///
    /// let dispatcher = Dispatcher::new();
    /// assert!(dispatcher.add("add", |(a, b): (i64, i64)| a + b));
    /// assert!(!dispatcher.add("add", |(x,): (i64,)| x));
    /// ```
    pub fn add<Args, R, F>(&self, name: impl Into<String>, f: F) -> bool
    where
        Args: FromParams,
        R: Serialize,
        F: Fn(Args) -> R + Send + Sync + 'static,
    {
        let run = move |params: &[RpcValue]| -> Result<RpcValue, RpcValue> {
            let args = Args::from_params(params)?;
            let output = catch_unwind(AssertUnwindSafe(|| f(args))).map_err(|_| {
                tracing::error!("handler panicked");
                RpcValue::from(ERROR_DURING_CALL)
            })?;
            serde_json::to_value(output).map_err(|_| RpcValue::from(ERROR_DURING_CALL))
        };
        self.insert(name.into(), Handler::Sync(Box::new(run)))
    }

    /// Register an asynchronous handler.
    ///
    /// The handler receives a [`CompletionHandler`] it may move anywhere;
    /// the reply is whatever it eventually does with it (including the
    /// drop-without-reply error).
    pub fn add_async<Args, F>(&self, name: impl Into<String>, f: F) -> bool
    where
        Args: FromParams,
        F: Fn(CompletionHandler, Args) + Send + Sync + 'static,
    {
        let run = move |completion: CompletionHandler, params: Vec<RpcValue>| {
            match Args::from_params(&params) {
                Ok(args) => f(completion, args),
                Err(e) => completion.error_value(e),
            }
        };
        self.insert(name.into(), Handler::Async(Box::new(run)))
    }

    /// Register a future-returning handler.
    ///
    /// The returned future is spawned on `handle`; its output (or its
    /// panic, converted to an error reply) becomes the response.
    pub fn add_future<Args, R, F, Fut>(&self, name: impl Into<String>, handle: Handle, f: F) -> bool
    where
        Args: FromParams,
        R: Serialize,
        F: Fn(Args) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R, RpcValue>> + Send + 'static,
    {
        let run = move |params: Vec<RpcValue>| -> BoxFuture {
            match Args::from_params(&params) {
                Err(e) => Box::pin(std::future::ready(Err(e))),
                Ok(args) => {
                    let fut = f(args);
                    Box::pin(async move {
                        let output = fut.await?;
                        serde_json::to_value(output).map_err(|_| RpcValue::from(ERROR_DURING_CALL))
                    })
                }
            }
        };
        self.insert(name.into(), Handler::Future { handle, run: Box::new(run) })
    }

    pub fn has(&self, name: &str) -> bool {
        self.lock().contains_key(name)
    }

    /// Unregister a method. Idempotent; returns whether it was present.
    pub fn remove(&self, name: &str) -> bool {
        self.lock().remove(name).is_some()
    }

    /// Unregister everything, returning how many methods were registered.
    pub fn clear(&self) -> usize {
        let mut handlers = self.lock();
        let size = handlers.len();
        handlers.clear();
        size
    }

    /// Snapshot of the registered method names.
    pub fn known(&self) -> Vec<String> {
        self.lock().keys().cloned().collect()
    }

    pub(crate) fn get(&self, name: &str) -> Option<Arc<Handler>> {
        self.lock().get(name).cloned()
    }

    fn insert(&self, name: String, handler: Handler) -> bool {
        match self.lock().entry(name) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(Arc::new(handler));
                true
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Arc<Handler>>> {
        self.handlers.lock().unwrap_or_else(|e| e.into_inner())
    }
}
