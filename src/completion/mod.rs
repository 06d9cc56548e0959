//! # Completion Protocol
//!
//! What happens after the wrapped call returns. A before-call thunk hands the
//! host an [`AfterCall`]; the host reports the outcome through it, and the
//! delegate drives the segment and transaction to their end.
//!
//! Asynchronous calls return an [`AsyncResult`]. Finalization is then deferred
//! to a continuation, which runs on the captured [`ExecutionContext`] when one
//! exists and on the completing thread otherwise.

pub mod after_call;
pub mod async_result;
pub mod execution_context;
pub mod finalizer;
pub mod protocol;

pub use after_call::{AfterCall, ReturnValue};
pub use async_result::{AsyncCompleter, AsyncOutcome, AsyncResult};
pub use execution_context::{
    ExecutionContext, Job, QueueDrain, QueueExecutionContext, TokioExecutionContext,
};
pub use finalizer::{CallFinalizer, CompletionState};
pub use protocol::{async_completion, handle_exceptions, sync_completion};
