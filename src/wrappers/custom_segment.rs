use super::{legacy_rejection, require_transaction};
use crate::agent::{Agent, SegmentName, Transaction};
use crate::completion::{async_completion, sync_completion, AfterCall, CallFinalizer};
use crate::config::HostEnvironment;
use crate::constants::wrapper_names;
use crate::error::WrapperError;
use crate::model::{CallSite, MethodCall};
use crate::registry::{ProbeResult, Wrapper};
use std::sync::Arc;

/// Records the method as a segment of the current transaction, named by the
/// call site's metric name when it has one.
#[derive(Debug, Default, Clone, Copy)]
pub struct CustomSegmentWrapper {
    environment: HostEnvironment,
}

impl CustomSegmentWrapper {
    pub fn new(environment: HostEnvironment) -> Self {
        Self { environment }
    }
}

impl Wrapper for CustomSegmentWrapper {
    fn name(&self) -> &str {
        wrapper_names::CUSTOM_SEGMENT
    }

    fn probe(&self, call_site: &CallSite) -> ProbeResult {
        if call_site.requested_wrapper_name() != wrapper_names::CUSTOM_SEGMENT {
            return ProbeResult::no_match();
        }
        if call_site.is_async() {
            if let Some(rejection) = legacy_rejection(self.name(), call_site, self.environment) {
                return rejection;
            }
        }
        ProbeResult::matched()
    }

    fn before_wrapped_method(
        &self,
        call: &MethodCall,
        _agent: &Arc<dyn Agent>,
        transaction: Option<Arc<dyn Transaction>>,
    ) -> Result<AfterCall, WrapperError> {
        let transaction = require_transaction(transaction)?;
        let segment = transaction.start_segment(call, SegmentName::for_call(call));
        let finalizer = CallFinalizer::segment_only(segment);

        if call.call_site().is_async() {
            Ok(async_completion(finalizer, call.execution_context().cloned()))
        } else {
            Ok(sync_completion(finalizer))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Method, TypeDescriptor};
    use crate::test_helpers::{Event, RecordingAgent};

    #[test]
    fn test_segment_named_by_metric_name() {
        let agent = RecordingAgent::new();
        let transaction = agent.begin_transaction("Web/Checkout");
        let dyn_agent: Arc<dyn Agent> = agent.clone();

        let method = Method::new(
            TypeDescriptor::new("Shop.Cart", "Shop"),
            "Total",
            std::iter::empty::<&str>(),
        );
        let site = CallSite::builder(11, method)
            .wrapper_name(wrapper_names::CUSTOM_SEGMENT)
            .metric_name("Cart/Total")
            .build();
        let call = MethodCall::new(Arc::new(site), None, Vec::new());

        let wrapper = CustomSegmentWrapper::default();
        assert!(wrapper.probe(call.call_site()).matched);

        wrapper
            .before_wrapped_method(&call, &dyn_agent, Some(transaction))
            .unwrap()
            .on_success(None);

        assert_eq!(
            agent.events(),
            vec![Event::SegmentStarted("Cart/Total".into()), Event::SegmentEnded]
        );
    }
}
