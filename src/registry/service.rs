//! # Wrapper Service
//!
//! The host-facing entry point. Resolves and caches a wrapper per call site,
//! runs it before the wrapped call, and contains every instrumentation failure.
//!
//! Failures are counted on the tracked wrapper. Once a wrapper has failed more
//! than `max_consecutive_failures` times in a row, the failing call site is
//! switched to the no-op wrapper for the rest of the process lifetime.

use super::tracked_wrapper::TrackedWrapper;
use super::wrapper_map::WrapperMap;
use crate::agent::Agent;
use crate::completion::after_call::{FailureCallback, SuccessCallback};
use crate::completion::{AfterCall, ReturnValue};
use crate::config::DispatchConfig;
use crate::error::{panic_message, CallError, WrapperError};
use crate::logging::log_instrumentation_failure;
use crate::model::{CallSite, MethodCall};
use dashmap::DashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{trace, warn};

struct ServiceState {
    map: Arc<WrapperMap>,
    cache: DashMap<Arc<CallSite>, Arc<TrackedWrapper>>,
    max_consecutive_failures: u32,
}

impl ServiceState {
    fn tracked_for(&self, call_site: &Arc<CallSite>) -> Arc<TrackedWrapper> {
        if let Some(entry) = self.cache.get(call_site.as_ref()) {
            return Arc::clone(entry.value());
        }
        let resolved = self.map.get(call_site);
        let entry = self.cache.entry(Arc::clone(call_site)).or_insert(resolved);
        Arc::clone(entry.value())
    }

    fn handle_failure(
        &self,
        call_site: &Arc<CallSite>,
        tracked: &TrackedWrapper,
        error: &WrapperError,
    ) {
        let failures = tracked.notice_failure();
        let method = call_site.method();
        log_instrumentation_failure(
            call_site.id(),
            tracked.name(),
            &format!("{}.{}", method.declaring_type().full_name(), method.name()),
            failures,
            &error.to_string(),
        );

        if failures > self.max_consecutive_failures {
            warn!(
                call_site_id = call_site.id(),
                wrapper = tracked.name(),
                consecutive_failures = failures,
                max_consecutive_failures = self.max_consecutive_failures,
                "🚫 Disabling instrumentation for call site after repeated failures"
            );
            self.cache.insert(Arc::clone(call_site), self.map.noop_wrapper());
        }
    }
}

/// Runs wrappers for the call-interception collaborator.
pub struct WrapperService {
    state: Arc<ServiceState>,
    agent: Arc<dyn Agent>,
}

impl WrapperService {
    pub fn new(map: Arc<WrapperMap>, agent: Arc<dyn Agent>, config: &DispatchConfig) -> Self {
        Self {
            state: Arc::new(ServiceState {
                map,
                cache: DashMap::new(),
                max_consecutive_failures: config.max_consecutive_failures,
            }),
            agent,
        }
    }

    pub fn map(&self) -> &Arc<WrapperMap> {
        &self.state.map
    }

    /// The wrapper currently cached for `call_site`, if it has been resolved.
    pub fn tracked_wrapper(&self, call_site: &CallSite) -> Option<Arc<TrackedWrapper>> {
        self.state
            .cache
            .get(call_site)
            .map(|entry| Arc::clone(entry.value()))
    }

    pub fn cached_call_sites(&self) -> usize {
        self.state.cache.len()
    }

    /// Run the resolved wrapper for `call`. Never fails and never panics: any
    /// instrumentation failure yields a no-op delegate.
    pub fn before_wrapped_method(&self, call: &MethodCall) -> AfterCall {
        let call_site = call.call_site();
        let tracked = self.state.tracked_for(call_site);
        let wrapper = tracked.wrapper();

        let transaction = self
            .agent
            .current_transaction()
            .filter(|transaction| transaction.is_valid());
        if wrapper.is_transaction_required() && transaction.is_none() {
            trace!(
                call_site_id = call_site.id(),
                wrapper = wrapper.name(),
                "No active transaction, skipping wrapper"
            );
            return AfterCall::noop();
        }

        let outcome = catch_unwind(AssertUnwindSafe(|| {
            wrapper.before_wrapped_method(call, &self.agent, transaction)
        }));
        match outcome {
            Ok(Ok(after)) => self.guard(after, call_site, tracked),
            Ok(Err(error)) => {
                self.state.handle_failure(call_site, &tracked, &error);
                AfterCall::noop()
            }
            Err(panic) => {
                let error = WrapperError::Panicked(panic_message(panic.as_ref()));
                self.state.handle_failure(call_site, &tracked, &error);
                AfterCall::noop()
            }
        }
    }

    /// Wrap the delegate so a panic inside either callback is contained and
    /// counted, and a clean completion resets the failure count.
    fn guard(
        &self,
        after: AfterCall,
        call_site: &Arc<CallSite>,
        tracked: Arc<TrackedWrapper>,
    ) -> AfterCall {
        let success_state = Arc::clone(&self.state);
        let success_site = Arc::clone(call_site);
        let success_tracked = Arc::clone(&tracked);
        let failure_state = Arc::clone(&self.state);
        let failure_site = Arc::clone(call_site);
        let failure_tracked = tracked;

        after.map_callbacks(
            move |on_success: SuccessCallback| -> SuccessCallback {
                Box::new(move |result: Option<ReturnValue>| {
                    match catch_unwind(AssertUnwindSafe(|| on_success(result))) {
                        Ok(()) => success_tracked.notice_success(),
                        Err(panic) => success_state.handle_failure(
                            &success_site,
                            &success_tracked,
                            &WrapperError::Panicked(panic_message(panic.as_ref())),
                        ),
                    }
                })
            },
            move |on_failure: FailureCallback| -> FailureCallback {
                Box::new(move |error: CallError| {
                    match catch_unwind(AssertUnwindSafe(|| on_failure(error))) {
                        Ok(()) => failure_tracked.notice_success(),
                        Err(panic) => failure_state.handle_failure(
                            &failure_site,
                            &failure_tracked,
                            &WrapperError::Panicked(panic_message(panic.as_ref())),
                        ),
                    }
                })
            },
        )
    }
}

impl std::fmt::Debug for WrapperService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WrapperService")
            .field("cached_call_sites", &self.cached_call_sites())
            .field(
                "max_consecutive_failures",
                &self.state.max_consecutive_failures,
            )
            .finish()
    }
}
