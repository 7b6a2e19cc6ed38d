//! The call table: in-flight request ids mapped to their completions.

use std::collections::HashMap;
use std::sync::Mutex;

use tokio::sync::oneshot;

use duorpc_common::protocol::{RequestId, RpcError, RpcValue};

/// What a finished call resolves to.
pub(crate) type CallOutcome = Result<RpcValue, RpcError>;

/// Concurrency-safe id → completion map.
///
/// The mutex is held only for insert/remove; outcomes are delivered outside
/// the lock through the removed sender. Removal is the atomic "claim" step:
/// response routing, timeout expiry and write failure all race through
/// [`remove`], and whichever gets the sender delivers the one outcome.
///
/// [`remove`]: CallTable::remove
#[derive(Default)]
pub(crate) struct CallTable {
    entries: Mutex<HashMap<RequestId, oneshot::Sender<CallOutcome>>>,
}

impl CallTable {
    pub(crate) fn insert(&self, id: RequestId) -> oneshot::Receiver<CallOutcome> {
        let (tx, rx) = oneshot::channel();
        self.lock().insert(id, tx);
        rx
    }

    pub(crate) fn remove(&self, id: RequestId) -> Option<oneshot::Sender<CallOutcome>> {
        self.lock().remove(&id)
    }

    /// Route a response to its caller. Outcomes for ids no longer in the
    /// table (already timed out or cancelled) are dropped silently.
    pub(crate) fn complete(&self, id: RequestId, outcome: CallOutcome) {
        match self.remove(id) {
            Some(tx) => {
                let _ = tx.send(outcome);
            }
            None => tracing::debug!(id, "dropping response for unknown id"),
        }
    }

    /// Fail every outstanding call. Used on connection teardown so that
    /// calls without a timeout do not hang forever.
    pub(crate) fn drain(&self) -> usize {
        let entries = std::mem::take(&mut *self.lock());
        let drained = entries.len();
        for (_, tx) in entries {
            let _ = tx.send(Err(RpcError::Closed));
        }
        drained
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<RequestId, oneshot::Sender<CallOutcome>>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.lock().len()
    }
}
