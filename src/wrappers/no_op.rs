use crate::agent::{Agent, Transaction};
use crate::completion::AfterCall;
use crate::constants::wrapper_names;
use crate::error::WrapperError;
use crate::model::{CallSite, MethodCall};
use crate::registry::{ProbeResult, Wrapper, WrapperKind};
use std::sync::Arc;

/// Does nothing. Requested explicitly to mark a library as seen without timing
/// it, and used as the fallback when no other wrapper matches.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOpWrapper;

impl Wrapper for NoOpWrapper {
    fn name(&self) -> &str {
        wrapper_names::NO_OP
    }

    fn kind(&self) -> WrapperKind {
        WrapperKind::NoOp
    }

    fn probe(&self, call_site: &CallSite) -> ProbeResult {
        ProbeResult::from_bool(call_site.requested_wrapper_name() == wrapper_names::NO_OP)
    }

    fn is_transaction_required(&self) -> bool {
        false
    }

    fn before_wrapped_method(
        &self,
        _call: &MethodCall,
        _agent: &Arc<dyn Agent>,
        _transaction: Option<Arc<dyn Transaction>>,
    ) -> Result<AfterCall, WrapperError> {
        Ok(AfterCall::noop())
    }
}
