//! One actual invocation of an instrumented call site.

use super::call_site::CallSite;
use crate::completion::ExecutionContext;
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// An untyped value from the monitored application.
pub type Value = Arc<dyn Any + Send + Sync>;

/// A call argument; `None` stands for a null reference.
pub type Argument = Option<Value>;

/// Wrap a concrete value as an untyped [`Value`].
pub fn value<T: Any + Send + Sync>(v: T) -> Value {
    Arc::new(v)
}

/// Per-call data: the call site, invocation target, arguments, and the execution
/// context captured when the call started (if any). Cloning is cheap.
#[derive(Clone)]
pub struct MethodCall {
    call_site: Arc<CallSite>,
    target: Option<Value>,
    arguments: Arc<[Argument]>,
    execution_context: Option<Arc<dyn ExecutionContext>>,
}

impl MethodCall {
    pub fn new(call_site: Arc<CallSite>, target: Option<Value>, arguments: Vec<Argument>) -> Self {
        Self {
            call_site,
            target,
            arguments: arguments.into(),
            execution_context: None,
        }
    }

    /// Record the execution context that continuations should resume on.
    #[must_use]
    pub fn with_execution_context(mut self, context: Arc<dyn ExecutionContext>) -> Self {
        self.execution_context = Some(context);
        self
    }

    pub fn call_site(&self) -> &Arc<CallSite> {
        &self.call_site
    }

    pub fn target(&self) -> Option<&Value> {
        self.target.as_ref()
    }

    pub fn arguments(&self) -> &[Argument] {
        &self.arguments
    }

    pub fn execution_context(&self) -> Option<&Arc<dyn ExecutionContext>> {
        self.execution_context.as_ref()
    }
}

impl fmt::Debug for MethodCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodCall")
            .field("call_site", &self.call_site.id())
            .field("method", &self.call_site.method().name())
            .field("has_target", &self.target.is_some())
            .field("arguments", &self.arguments.len())
            .field("execution_context", &self.execution_context)
            .finish()
    }
}
