//! # Wrapper Strategy Trait
//!
//! A wrapper is an instrumentation strategy: it decides whether it can handle a
//! call site (`probe`) and, when chosen, runs before the wrapped call and hands
//! back the completion delegate (`before_wrapped_method`).

use crate::agent::{Agent, Transaction};
use crate::completion::AfterCall;
use crate::error::WrapperError;
use crate::model::{CallSite, MethodCall};
use std::fmt;
use std::sync::Arc;

/// Which resolution tier a wrapper belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WrapperKind {
    /// Matches particular methods or requested names
    Specific,
    /// Generic fallback used when nothing specific matches
    Default,
    /// The inert wrapper of last resort
    NoOp,
}

/// Result of asking a wrapper whether it can handle a call site.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProbeResult {
    pub matched: bool,
    /// Optional explanation, logged by the resolution engine
    pub diagnostic: Option<String>,
}

impl ProbeResult {
    pub fn matched() -> Self {
        Self {
            matched: true,
            diagnostic: None,
        }
    }

    pub fn no_match() -> Self {
        Self::default()
    }

    /// A negative result that explains itself.
    pub fn rejected(diagnostic: impl Into<String>) -> Self {
        Self {
            matched: false,
            diagnostic: Some(diagnostic.into()),
        }
    }

    pub fn from_bool(matched: bool) -> Self {
        Self {
            matched,
            diagnostic: None,
        }
    }

    #[must_use]
    pub fn with_diagnostic(mut self, diagnostic: impl Into<String>) -> Self {
        self.diagnostic = Some(diagnostic.into());
        self
    }
}

/// An instrumentation strategy.
///
/// Implementations must be shareable across threads: the same instance serves
/// every call site it is resolved for.
pub trait Wrapper: Send + Sync + fmt::Debug {
    /// Name used in logs and for requested-name matching.
    fn name(&self) -> &str;

    fn kind(&self) -> WrapperKind {
        WrapperKind::Specific
    }

    /// Whether this strategy can handle `call_site`.
    fn probe(&self, call_site: &CallSite) -> ProbeResult;

    /// Whether a current transaction must exist for this strategy to run.
    fn is_transaction_required(&self) -> bool {
        true
    }

    /// Run before the wrapped call; return the completion delegate.
    fn before_wrapped_method(
        &self,
        call: &MethodCall,
        agent: &Arc<dyn Agent>,
        transaction: Option<Arc<dyn Transaction>>,
    ) -> Result<AfterCall, WrapperError>;
}
