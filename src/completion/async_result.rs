//! The awaitable handed back by an asynchronous wrapped call.
//!
//! `AsyncResult` is a completion handle with continuation registration. It does
//! not poll anything itself: whoever holds the [`AsyncCompleter`] completes it,
//! and every registered continuation then runs on that completing thread (or is
//! posted to the execution context it was registered with).

use super::execution_context::ExecutionContext;
use crate::error::CallError;
use crate::model::Value;
use futures::FutureExt;
use parking_lot::Mutex;
use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::runtime::Handle;

/// How an awaited operation finished.
#[derive(Debug, Clone)]
pub enum AsyncOutcome {
    Completed(Option<Value>),
    Faulted(CallError),
    Cancelled,
}

impl AsyncOutcome {
    /// Cancellation counts as a fault.
    pub fn is_faulted(&self) -> bool {
        !matches!(self, AsyncOutcome::Completed(_))
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, AsyncOutcome::Cancelled)
    }

    /// The error to record for a faulted outcome.
    pub fn fault(&self) -> Option<CallError> {
        match self {
            AsyncOutcome::Completed(_) => None,
            AsyncOutcome::Faulted(error) => Some(error.clone()),
            AsyncOutcome::Cancelled => Some(CallError::cancelled()),
        }
    }
}

type Continuation = Box<dyn FnOnce(AsyncOutcome) + Send>;

enum Slot {
    Pending(Vec<Continuation>),
    Complete(AsyncOutcome),
}

struct Shared {
    slot: Mutex<Slot>,
}

impl Shared {
    fn complete(&self, outcome: AsyncOutcome) {
        let continuations = {
            let mut slot = self.slot.lock();
            match std::mem::replace(&mut *slot, Slot::Complete(outcome.clone())) {
                Slot::Pending(continuations) => continuations,
                Slot::Complete(previous) => {
                    // First completion wins
                    *slot = Slot::Complete(previous);
                    return;
                }
            }
        };

        for continuation in continuations {
            continuation(outcome.clone());
        }
    }
}

/// A pending or finished asynchronous result. Clones share the same state.
#[derive(Clone)]
pub struct AsyncResult {
    shared: Arc<Shared>,
}

impl AsyncResult {
    /// A pending result plus the handle that completes it.
    pub fn pending() -> (AsyncResult, AsyncCompleter) {
        let shared = Arc::new(Shared {
            slot: Mutex::new(Slot::Pending(Vec::new())),
        });
        (
            AsyncResult {
                shared: Arc::clone(&shared),
            },
            AsyncCompleter {
                shared: Some(shared),
            },
        )
    }

    /// An already finished result.
    pub fn from_outcome(outcome: AsyncOutcome) -> Self {
        Self {
            shared: Arc::new(Shared {
                slot: Mutex::new(Slot::Complete(outcome)),
            }),
        }
    }

    /// Drive `future` on `handle`; the result completes on the runtime thread that
    /// finishes it. A panic becomes a fault and an aborted task a cancellation.
    pub fn spawn<F>(handle: &Handle, future: F) -> Self
    where
        F: Future<Output = Result<Option<Value>, CallError>> + Send + 'static,
    {
        let (result, completer) = Self::pending();
        handle.spawn(async move {
            let outcome = match AssertUnwindSafe(future).catch_unwind().await {
                Ok(Ok(value)) => AsyncOutcome::Completed(value),
                Ok(Err(error)) => AsyncOutcome::Faulted(error),
                Err(panic) => AsyncOutcome::Faulted(CallError::from_panic(panic.as_ref())),
            };
            completer.complete(outcome);
        });
        result
    }

    pub fn is_completed(&self) -> bool {
        matches!(*self.shared.slot.lock(), Slot::Complete(_))
    }

    pub fn outcome(&self) -> Option<AsyncOutcome> {
        match &*self.shared.slot.lock() {
            Slot::Complete(outcome) => Some(outcome.clone()),
            Slot::Pending(_) => None,
        }
    }

    /// Register a continuation.
    ///
    /// Without a context the continuation runs synchronously on the completing
    /// thread, or immediately on the caller if the result is already complete.
    /// With a context it is posted there.
    pub fn continue_with<F>(&self, context: Option<Arc<dyn ExecutionContext>>, continuation: F)
    where
        F: FnOnce(AsyncOutcome) + Send + 'static,
    {
        let continuation: Continuation = match context {
            Some(context) => Box::new(move |outcome| {
                context.post(Box::new(move || continuation(outcome)));
            }),
            None => Box::new(continuation),
        };

        let ready = {
            let mut slot = self.shared.slot.lock();
            match &mut *slot {
                Slot::Pending(continuations) => {
                    continuations.push(continuation);
                    return;
                }
                Slot::Complete(outcome) => outcome.clone(),
            }
        };

        continuation(ready);
    }

    /// Wait for the outcome from async code.
    pub async fn wait(&self) -> AsyncOutcome {
        let (tx, rx) = tokio::sync::oneshot::channel();
        self.continue_with(None, move |outcome| {
            let _ = tx.send(outcome);
        });
        rx.await.unwrap_or(AsyncOutcome::Cancelled)
    }
}

impl fmt::Debug for AsyncResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AsyncResult")
            .field("outcome", &self.outcome())
            .finish()
    }
}

/// Completes an [`AsyncResult`]. Dropping it without completing cancels the result.
pub struct AsyncCompleter {
    shared: Option<Arc<Shared>>,
}

impl AsyncCompleter {
    pub fn complete(mut self, outcome: AsyncOutcome) {
        if let Some(shared) = self.shared.take() {
            shared.complete(outcome);
        }
    }

    pub fn succeed(self, value: Option<Value>) {
        self.complete(AsyncOutcome::Completed(value));
    }

    pub fn fault(self, error: CallError) {
        self.complete(AsyncOutcome::Faulted(error));
    }

    pub fn cancel(self) {
        self.complete(AsyncOutcome::Cancelled);
    }
}

impl Drop for AsyncCompleter {
    fn drop(&mut self) {
        if let Some(shared) = self.shared.take() {
            shared.complete(AsyncOutcome::Cancelled);
        }
    }
}
