//! Wrappers that act on the current transaction instead of timing the method.

use super::require_transaction;
use crate::agent::{Agent, Transaction};
use crate::completion::AfterCall;
use crate::constants::wrapper_names;
use crate::error::WrapperError;
use crate::model::{CallSite, MethodCall};
use crate::registry::{ProbeResult, Wrapper};
use std::sync::Arc;

/// Discards the current transaction.
#[derive(Debug, Default, Clone, Copy)]
pub struct IgnoreTransactionWrapper;

impl Wrapper for IgnoreTransactionWrapper {
    fn name(&self) -> &str {
        wrapper_names::IGNORE_TRANSACTION
    }

    fn probe(&self, call_site: &CallSite) -> ProbeResult {
        ProbeResult::from_bool(call_site.requested_wrapper_name() == wrapper_names::IGNORE_TRANSACTION)
    }

    fn before_wrapped_method(
        &self,
        _call: &MethodCall,
        _agent: &Arc<dyn Agent>,
        transaction: Option<Arc<dyn Transaction>>,
    ) -> Result<AfterCall, WrapperError> {
        require_transaction(transaction)?.ignore();
        Ok(AfterCall::noop())
    }
}

/// Detaches the current transaction from the calling thread.
#[derive(Debug, Default, Clone, Copy)]
pub struct DetachWrapper;

impl Wrapper for DetachWrapper {
    fn name(&self) -> &str {
        wrapper_names::DETACH
    }

    fn probe(&self, call_site: &CallSite) -> ProbeResult {
        ProbeResult::from_bool(call_site.requested_wrapper_name() == wrapper_names::DETACH)
    }

    fn before_wrapped_method(
        &self,
        _call: &MethodCall,
        _agent: &Arc<dyn Agent>,
        transaction: Option<Arc<dyn Transaction>>,
    ) -> Result<AfterCall, WrapperError> {
        require_transaction(transaction)?.detach();
        Ok(AfterCall::noop())
    }
}

/// Makes the current transaction follow the asynchronous flow of the call.
#[derive(Debug, Default, Clone, Copy)]
pub struct AttachToAsyncWrapper;

impl Wrapper for AttachToAsyncWrapper {
    fn name(&self) -> &str {
        wrapper_names::ATTACH_TO_ASYNC
    }

    fn probe(&self, call_site: &CallSite) -> ProbeResult {
        ProbeResult::from_bool(call_site.requested_wrapper_name() == wrapper_names::ATTACH_TO_ASYNC)
    }

    fn before_wrapped_method(
        &self,
        _call: &MethodCall,
        _agent: &Arc<dyn Agent>,
        transaction: Option<Arc<dyn Transaction>>,
    ) -> Result<AfterCall, WrapperError> {
        require_transaction(transaction)?.attach_to_async();
        Ok(AfterCall::noop())
    }
}
