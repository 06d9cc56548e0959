//! Tracks work a transaction hands to another thread.
//!
//! Instrumentation places this wrapper on thread-start style methods. The
//! method gets a segment in the current transaction, named after the method
//! itself, so time spent spinning up the worker stays attributed.

use super::require_transaction;
use crate::agent::{Agent, SegmentName, Transaction};
use crate::completion::{sync_completion, AfterCall, CallFinalizer};
use crate::constants::wrapper_names;
use crate::error::WrapperError;
use crate::model::{CallSite, MethodCall};
use crate::registry::{ProbeResult, Wrapper};
use std::sync::Arc;

#[derive(Debug, Default, Clone, Copy)]
pub struct MultithreadedTrackingWrapper;

impl Wrapper for MultithreadedTrackingWrapper {
    fn name(&self) -> &str {
        wrapper_names::MULTITHREADED_TRACKING
    }

    fn probe(&self, call_site: &CallSite) -> ProbeResult {
        ProbeResult::from_bool(
            call_site.requested_wrapper_name() == wrapper_names::MULTITHREADED_TRACKING,
        )
    }

    fn before_wrapped_method(
        &self,
        call: &MethodCall,
        _agent: &Arc<dyn Agent>,
        transaction: Option<Arc<dyn Transaction>>,
    ) -> Result<AfterCall, WrapperError> {
        let transaction = require_transaction(transaction)?;
        let method = call.call_site().method();
        let segment = transaction.start_segment(
            call,
            SegmentName::Method {
                type_name: method.declaring_type().full_name().to_string(),
                method_name: method.name().to_string(),
            },
        );
        Ok(sync_completion(CallFinalizer::segment_only(segment)))
    }
}
