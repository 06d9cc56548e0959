//! Default-tier wrappers: a segment inside whatever transaction is already active.

use super::{legacy_rejection, require_transaction};
use crate::agent::{Agent, SegmentName, Transaction};
use crate::completion::{async_completion, sync_completion, AfterCall, CallFinalizer};
use crate::config::HostEnvironment;
use crate::constants::wrapper_names;
use crate::error::WrapperError;
use crate::model::{CallSite, MethodCall};
use crate::registry::{ProbeResult, Wrapper, WrapperKind};
use std::sync::Arc;

fn requests_default(call_site: &CallSite) -> bool {
    let requested = call_site.requested_wrapper_name();
    requested.is_empty() || wrapper_names::DEFAULT_NAMES.contains(&requested)
}

/// Times synchronous methods as a segment of the current transaction.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultWrapper;

impl Wrapper for DefaultWrapper {
    fn name(&self) -> &str {
        wrapper_names::DEFAULT
    }

    fn kind(&self) -> WrapperKind {
        WrapperKind::Default
    }

    fn probe(&self, call_site: &CallSite) -> ProbeResult {
        ProbeResult::from_bool(!call_site.is_async() && requests_default(call_site))
    }

    fn before_wrapped_method(
        &self,
        call: &MethodCall,
        _agent: &Arc<dyn Agent>,
        transaction: Option<Arc<dyn Transaction>>,
    ) -> Result<AfterCall, WrapperError> {
        let transaction = require_transaction(transaction)?;
        let segment = transaction.start_segment(call, SegmentName::for_call(call));
        Ok(sync_completion(CallFinalizer::segment_only(segment)))
    }
}

/// Times async methods; the segment ends when the returned awaitable completes.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultWrapperAsync {
    environment: HostEnvironment,
}

impl DefaultWrapperAsync {
    pub fn new(environment: HostEnvironment) -> Self {
        Self { environment }
    }
}

impl Wrapper for DefaultWrapperAsync {
    fn name(&self) -> &str {
        wrapper_names::DEFAULT_ASYNC
    }

    fn kind(&self) -> WrapperKind {
        WrapperKind::Default
    }

    fn probe(&self, call_site: &CallSite) -> ProbeResult {
        if !call_site.is_async() || !requests_default(call_site) {
            return ProbeResult::no_match();
        }
        legacy_rejection(self.name(), call_site, self.environment)
            .unwrap_or_else(ProbeResult::matched)
    }

    fn before_wrapped_method(
        &self,
        call: &MethodCall,
        _agent: &Arc<dyn Agent>,
        transaction: Option<Arc<dyn Transaction>>,
    ) -> Result<AfterCall, WrapperError> {
        let transaction = require_transaction(transaction)?;
        let segment = transaction.start_segment(call, SegmentName::for_call(call));
        Ok(async_completion(
            CallFinalizer::segment_only(segment),
            call.execution_context().cloned(),
        ))
    }
}
