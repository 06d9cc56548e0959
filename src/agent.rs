//! # Agent Collaborator Interfaces
//!
//! The transaction/segment data model lives outside this crate. Wrappers see it
//! only through these narrow, object-safe traits; the engine treats every handle
//! as opaque and calls it in the sequences the completion protocol prescribes.

use crate::error::CallError;
use crate::model::{MethodCall, NamePriority};
use std::sync::Arc;

/// What a new segment should be named after.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SegmentName {
    /// Named after the instrumented method
    Method { type_name: String, method_name: String },
    /// Named by an explicit metric name
    Custom(String),
}

impl SegmentName {
    /// Custom name when the call site requests one, otherwise the method name.
    pub fn for_call(call: &MethodCall) -> Self {
        let site = call.call_site();
        match site.requested_metric_name() {
            Some(metric_name) => SegmentName::Custom(metric_name.to_string()),
            None => SegmentName::Method {
                type_name: site.method().declaring_type().full_name().to_string(),
                method_name: site.method().name().to_string(),
            },
        }
    }
}

/// The agent handle passed to every wrapper.
pub trait Agent: Send + Sync {
    fn create_web_transaction(&self, category: &str, name: &str) -> Arc<dyn Transaction>;

    fn create_other_transaction(&self, category: &str, name: &str) -> Arc<dyn Transaction>;

    /// The transaction active on the calling flow, if any.
    fn current_transaction(&self) -> Option<Arc<dyn Transaction>>;
}

/// A top-level unit of observed work.
pub trait Transaction: Send + Sync {
    fn start_segment(&self, call: &MethodCall, name: SegmentName) -> Arc<dyn Segment>;

    fn set_custom_name(&self, name: &str, priority: NamePriority);

    fn notice_error(&self, error: &CallError);

    fn end(&self);

    /// Detach from the calling thread's synchronous flow.
    fn detach(&self);

    /// Make the transaction follow the asynchronous flow of the current call.
    fn attach_to_async(&self);

    /// Discard the transaction's data.
    fn ignore(&self);

    fn is_valid(&self) -> bool {
        true
    }
}

/// A timed unit of work within a transaction.
pub trait Segment: Send + Sync {
    fn end(&self);

    /// Pop the segment off the active call stack without ending it.
    fn remove_from_call_stack(&self);
}
