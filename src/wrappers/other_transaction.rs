//! Wrappers that start a new transaction around the instrumented method.

use super::{legacy_rejection, requests_any};
use crate::agent::{Agent, SegmentName, Transaction};
use crate::completion::{async_completion, sync_completion, AfterCall, CallFinalizer};
use crate::config::HostEnvironment;
use crate::constants::{wrapper_names, CUSTOM_CATEGORY};
use crate::error::WrapperError;
use crate::model::{CallSite, MethodCall};
use crate::registry::{ProbeResult, Wrapper};
use std::sync::Arc;
use tracing::debug;

/// Create the transaction for `call`, named `{type}/{method}`.
fn start_transaction(call: &MethodCall, agent: &Arc<dyn Agent>) -> (Arc<dyn Transaction>, String) {
    let site = call.call_site();
    let method = site.method();
    let name = format!("{}/{}", method.declaring_type().full_name(), method.name());

    let transaction = if site.start_web_transaction() {
        agent.create_web_transaction(CUSTOM_CATEGORY, &name)
    } else {
        agent.create_other_transaction(CUSTOM_CATEGORY, &name)
    };

    (transaction, name)
}

fn start_segment(
    call: &MethodCall,
    transaction: &Arc<dyn Transaction>,
    name: &str,
) -> Arc<CallFinalizer> {
    let site = call.call_site();
    if let Some(metric_name) = site.requested_metric_name() {
        let priority = site.requested_name_priority().unwrap_or_default();
        transaction.set_custom_name(metric_name, priority);
    }
    debug!(
        call_site_id = site.id(),
        transaction = name,
        "Started transaction for instrumented method"
    );

    let segment = transaction.start_segment(call, SegmentName::for_call(call));
    CallFinalizer::new(segment, Arc::clone(transaction))
}

/// Starts a transaction around a synchronous method.
#[derive(Debug, Default, Clone, Copy)]
pub struct OtherTransactionWrapper;

impl Wrapper for OtherTransactionWrapper {
    fn name(&self) -> &str {
        wrapper_names::OTHER_TRANSACTION
    }

    fn probe(&self, call_site: &CallSite) -> ProbeResult {
        ProbeResult::from_bool(
            !call_site.is_async() && requests_any(call_site, wrapper_names::OTHER_TRANSACTION_NAMES),
        )
    }

    fn is_transaction_required(&self) -> bool {
        false
    }

    fn before_wrapped_method(
        &self,
        call: &MethodCall,
        agent: &Arc<dyn Agent>,
        _transaction: Option<Arc<dyn Transaction>>,
    ) -> Result<AfterCall, WrapperError> {
        let (transaction, name) = start_transaction(call, agent);
        let finalizer = start_segment(call, &transaction, &name);
        Ok(sync_completion(finalizer))
    }
}

/// Starts a transaction around an async method and ends it when the returned
/// awaitable completes.
#[derive(Debug, Default, Clone, Copy)]
pub struct OtherTransactionWrapperAsync {
    environment: HostEnvironment,
}

impl OtherTransactionWrapperAsync {
    pub fn new(environment: HostEnvironment) -> Self {
        Self { environment }
    }
}

impl Wrapper for OtherTransactionWrapperAsync {
    fn name(&self) -> &str {
        wrapper_names::OTHER_TRANSACTION_ASYNC
    }

    fn probe(&self, call_site: &CallSite) -> ProbeResult {
        if !call_site.is_async()
            || !requests_any(call_site, wrapper_names::OTHER_TRANSACTION_NAMES)
        {
            return ProbeResult::no_match();
        }
        legacy_rejection(self.name(), call_site, self.environment)
            .unwrap_or_else(ProbeResult::matched)
    }

    fn is_transaction_required(&self) -> bool {
        false
    }

    fn before_wrapped_method(
        &self,
        call: &MethodCall,
        agent: &Arc<dyn Agent>,
        _transaction: Option<Arc<dyn Transaction>>,
    ) -> Result<AfterCall, WrapperError> {
        let (transaction, name) = start_transaction(call, agent);
        transaction.attach_to_async();
        let finalizer = start_segment(call, &transaction, &name);
        Ok(async_completion(finalizer, call.execution_context().cloned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Method, NamePriority, TypeDescriptor};
    use crate::test_helpers::{Event, RecordingAgent};

    fn site(wrapper_name: &str, is_async: bool) -> CallSite {
        let method = Method::new(
            TypeDescriptor::new("Jobs.Nightly", "Jobs"),
            "Execute",
            std::iter::empty::<&str>(),
        );
        CallSite::builder(3, method)
            .wrapper_name(wrapper_name)
            .asynchronous(is_async)
            .build()
    }

    #[test]
    fn test_probe_accepts_all_other_transaction_names() {
        for name in wrapper_names::OTHER_TRANSACTION_NAMES {
            assert!(OtherTransactionWrapper.probe(&site(name, false)).matched);
            assert!(
                OtherTransactionWrapperAsync::new(HostEnvironment::default())
                    .probe(&site(name, true))
                    .matched
            );
        }
        assert!(!OtherTransactionWrapper.probe(&site("", false)).matched);
        assert!(!OtherTransactionWrapper.probe(&site(wrapper_names::OTHER_TRANSACTION, true)).matched);
    }

    #[test]
    fn test_sync_failure_records_error_before_ending() {
        let agent = RecordingAgent::new();
        let dyn_agent: Arc<dyn Agent> = agent.clone();
        let call = MethodCall::new(
            Arc::new(site(wrapper_names::OTHER_TRANSACTION, false)),
            None,
            Vec::new(),
        );

        let after = OtherTransactionWrapper
            .before_wrapped_method(&call, &dyn_agent, None)
            .unwrap();
        after.on_failure(crate::error::CallError::new("TimeoutException", "slow"));

        assert_eq!(
            agent.events(),
            vec![
                Event::TransactionCreated {
                    web: false,
                    name: "Jobs.Nightly/Execute".into()
                },
                Event::SegmentStarted("Jobs.Nightly.Execute".into()),
                Event::ErrorNoticed("TimeoutException".into()),
                Event::SegmentEnded,
                Event::TransactionEnded,
            ]
        );
    }

    #[test]
    fn test_metric_name_sets_custom_name_and_segment() {
        let agent = RecordingAgent::new();
        let dyn_agent: Arc<dyn Agent> = agent.clone();
        let method = Method::new(
            TypeDescriptor::new("Jobs.Nightly", "Jobs"),
            "Execute",
            std::iter::empty::<&str>(),
        );
        let site = CallSite::builder(4, method)
            .wrapper_name(wrapper_names::OTHER_TRANSACTION)
            .metric_name("Nightly/Run")
            .name_priority(NamePriority::USER)
            .web_transaction(true)
            .build();
        let call = MethodCall::new(Arc::new(site), None, Vec::new());

        OtherTransactionWrapper
            .before_wrapped_method(&call, &dyn_agent, None)
            .unwrap()
            .on_success(None);

        let events = agent.events();
        assert_eq!(
            events[0],
            Event::TransactionCreated {
                web: true,
                name: "Jobs.Nightly/Execute".into()
            }
        );
        assert_eq!(
            events[1],
            Event::CustomNameSet {
                name: "Nightly/Run".into(),
                priority: NamePriority::USER.0
            }
        );
        assert_eq!(events[2], Event::SegmentStarted("Nightly/Run".into()));
    }
}
