//! The completion delegate returned by every before-call thunk.

use super::async_result::AsyncResult;
use crate::error::CallError;
use crate::model::Value;
use std::fmt;
use std::sync::Arc;
use tracing::warn;

/// What the wrapped call returned.
#[derive(Debug, Clone)]
pub enum ReturnValue {
    /// An ordinary return value
    Value(Value),
    /// An awaitable still in flight (or already finished)
    Pending(AsyncResult),
}

impl ReturnValue {
    /// The awaitable carried by this return value, if there is one.
    ///
    /// A plain value holding an [`AsyncResult`] counts as awaitable too.
    pub fn into_async(self) -> Option<AsyncResult> {
        match self {
            ReturnValue::Pending(result) => Some(result),
            ReturnValue::Value(value) => value
                .downcast::<AsyncResult>()
                .ok()
                .map(|result| AsyncResult::clone(&result)),
        }
    }
}

/// Take the closure out of `slot` and run it after the lock is released.
fn run_once<F, A>(slot: &parking_lot::Mutex<Option<F>>, arg: A)
where
    F: FnOnce(A),
{
    let taken = slot.lock().take();
    if let Some(f) = taken {
        f(arg);
    }
}

pub(crate) type SuccessCallback = Box<dyn FnOnce(Option<ReturnValue>) + Send>;
pub(crate) type FailureCallback = Box<dyn FnOnce(CallError) + Send>;

/// A one-shot completion callback pair.
///
/// The host invokes exactly one of [`AfterCall::on_success`] or
/// [`AfterCall::on_failure`] when the wrapped call returns. Both consume the
/// delegate, so neither can run twice.
pub struct AfterCall {
    on_success: Option<SuccessCallback>,
    on_failure: Option<FailureCallback>,
    noop: bool,
}

impl AfterCall {
    pub fn new<S, F>(on_success: S, on_failure: F) -> Self
    where
        S: FnOnce(Option<ReturnValue>) + Send + 'static,
        F: FnOnce(CallError) + Send + 'static,
    {
        Self {
            on_success: Some(Box::new(on_success)),
            on_failure: Some(Box::new(on_failure)),
            noop: false,
        }
    }

    /// A delegate that does nothing on either path.
    pub fn noop() -> Self {
        Self {
            on_success: None,
            on_failure: None,
            noop: true,
        }
    }

    /// Run `finally` on either path, passing the error on failure.
    pub fn finally<F>(finally: F) -> Self
    where
        F: FnOnce(Option<CallError>) + Send + 'static,
    {
        let finally = Arc::new(parking_lot::Mutex::new(Some(finally)));
        let on_failure = Arc::clone(&finally);
        Self::new(
            move |_| run_once(&*finally, None),
            move |error| run_once(&*on_failure, Some(error)),
        )
    }

    /// A delegate for calls that may return an awaitable. The success callback
    /// receives the awaitable, or `None` when the call returned no awaitable.
    pub fn for_async<S, F>(on_success: S, on_failure: F) -> Self
    where
        S: FnOnce(Option<AsyncResult>) + Send + 'static,
        F: FnOnce(CallError) + Send + 'static,
    {
        Self::new(
            move |result: Option<ReturnValue>| on_success(result.and_then(ReturnValue::into_async)),
            on_failure,
        )
    }

    pub fn is_noop(&self) -> bool {
        self.noop
    }

    /// The wrapped call returned normally.
    pub fn on_success(mut self, result: Option<ReturnValue>) {
        self.on_failure = None;
        if let Some(callback) = self.on_success.take() {
            callback(result);
        }
    }

    /// The wrapped call raised `error`.
    pub fn on_failure(mut self, error: CallError) {
        self.on_success = None;
        if let Some(callback) = self.on_failure.take() {
            callback(error);
        }
    }

    /// Wrap both callbacks with `wrap_success` / `wrap_failure`, keeping one-shot semantics.
    pub(crate) fn map_callbacks<S, F>(mut self, wrap_success: S, wrap_failure: F) -> Self
    where
        S: FnOnce(SuccessCallback) -> SuccessCallback,
        F: FnOnce(FailureCallback) -> FailureCallback,
    {
        if self.noop {
            return self;
        }
        let on_success = self.on_success.take().map(wrap_success);
        let on_failure = self.on_failure.take().map(wrap_failure);
        Self {
            on_success,
            on_failure,
            noop: false,
        }
    }
}

impl fmt::Debug for AfterCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AfterCall")
            .field("noop", &self.noop)
            .field("pending", &self.on_success.is_some())
            .finish()
    }
}

impl Drop for AfterCall {
    fn drop(&mut self) {
        if !self.noop && self.on_success.is_some() && self.on_failure.is_some() {
            warn!("⚠️ Completion delegate dropped without being invoked, segment will not be finalized");
        }
    }
}
