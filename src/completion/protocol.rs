//! Completion delegates shared by the built-in wrappers.

use super::after_call::AfterCall;
use super::execution_context::ExecutionContext;
use super::finalizer::CallFinalizer;
use crate::error::panic_message;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use tracing::error;

/// Run agent-side continuation work, containing any panic it raises.
pub fn handle_exceptions<F: FnOnce()>(operation: &str, work: F) {
    if let Err(panic) = catch_unwind(AssertUnwindSafe(work)) {
        error!(
            operation = operation,
            error = %panic_message(panic.as_ref()),
            "❌ Agent continuation panicked"
        );
    }
}

/// Delegate for a synchronous call: finalize on either path.
pub fn sync_completion(finalizer: Arc<CallFinalizer>) -> AfterCall {
    AfterCall::finally(move |error| {
        finalizer.finish(error.as_ref());
    })
}

/// Delegate for a call that may return an awaitable.
///
/// - failure: record the error, end segment, end transaction;
/// - success without an awaitable: end segment and transaction;
/// - success with an awaitable: detach the transaction, pop the segment off the
///   call stack, and finalize from a continuation that runs on `context` when
///   given, otherwise on the thread that completes the awaitable.
pub fn async_completion(
    finalizer: Arc<CallFinalizer>,
    context: Option<Arc<dyn ExecutionContext>>,
) -> AfterCall {
    let on_failure = Arc::clone(&finalizer);
    AfterCall::for_async(
        move |pending| {
            let Some(result) = pending else {
                finalizer.finish(None);
                return;
            };
            if !finalizer.hand_off() {
                return;
            }
            if let Some(transaction) = finalizer.transaction() {
                transaction.detach();
            }
            finalizer.segment().remove_from_call_stack();

            result.continue_with(context, move |outcome| {
                handle_exceptions("async continuation", || {
                    let fault = outcome.fault();
                    finalizer.finish(fault.as_ref());
                });
            });
        },
        move |error| {
            on_failure.finish(Some(&error));
        },
    )
}
