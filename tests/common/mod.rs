#![allow(dead_code)]

//! Shared fixtures for the integration tests: sample strategy types and
//! call-site builders.

pub mod strategies;
pub mod tracing_capture;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use wrapper_dispatch::agent::{Agent, SegmentName, Transaction};
use wrapper_dispatch::completion::{sync_completion, AfterCall, CallFinalizer};
use wrapper_dispatch::error::{ConstructionError, WrapperError};
use wrapper_dispatch::model::{CallSite, Method, MethodCall, TypeDescriptor};
use wrapper_dispatch::registry::{
    Intercept, MethodWrapper, ProbeResult, Wrapper, WrapperContext, WrapperDefinition,
};

pub const GREETER_TYPE: &str = "App.Greeter";
pub const REPOSITORY_INTERFACE: &str = "App.IRepository";
pub const SQL_REPOSITORY_TYPE: &str = "App.SqlRepository";

pub fn greeter_type() -> TypeDescriptor {
    TypeDescriptor::new(GREETER_TYPE, "App")
}

pub fn repository_interface() -> TypeDescriptor {
    TypeDescriptor::new(REPOSITORY_INTERFACE, "App")
}

pub fn sql_repository_type() -> TypeDescriptor {
    TypeDescriptor::new(SQL_REPOSITORY_TYPE, "App.Data").implementing([REPOSITORY_INTERFACE])
}

pub fn site(id: u64, declaring: TypeDescriptor, method: &str, params: &[&str]) -> CallSite {
    CallSite::builder(id, Method::new(declaring, method, params.iter().copied())).build()
}

pub fn named_site(id: u64, wrapper_name: &str, is_async: bool) -> CallSite {
    CallSite::builder(
        id,
        Method::new(greeter_type(), "Work", std::iter::empty::<&str>()),
    )
    .wrapper_name(wrapper_name)
    .asynchronous(is_async)
    .build()
}

pub fn call(site: CallSite) -> MethodCall {
    MethodCall::new(Arc::new(site), None, Vec::new())
}

/// The invocation target for [`GreeterWrapper`].
pub struct Greeter {
    pub greeting: String,
}

/// Intercepts `App.Greeter.Foo(System.String)` and times it as a segment.
pub struct GreeterWrapper {
    context: WrapperContext<Greeter>,
}

impl GreeterWrapper {
    fn foo(&self, _name: Option<&String>) -> Result<AfterCall, WrapperError> {
        let call = self.context.call()?;
        let transaction = self.context.transaction()?;
        let segment = transaction.start_segment(call, SegmentName::for_call(call));
        Ok(sync_completion(CallFinalizer::segment_only(segment)))
    }
}

impl MethodWrapper for GreeterWrapper {
    type Target = Greeter;

    fn definition() -> WrapperDefinition<Self> {
        WrapperDefinition::new("GreeterWrapper")
            .target(greeter_type())
            .intercept(
                Intercept::<Self>::method("Foo", &["System.String"])
                    .handle1::<String, _>(|wrapper, name| wrapper.foo(name)),
            )
    }

    fn construct(context: WrapperContext<Greeter>) -> Result<Self, ConstructionError> {
        Ok(Self { context })
    }
}

/// A second strategy for the same method, used to check precedence.
pub struct ShadowGreeterWrapper;

impl MethodWrapper for ShadowGreeterWrapper {
    type Target = Greeter;

    fn definition() -> WrapperDefinition<Self> {
        WrapperDefinition::new("ShadowGreeterWrapper")
            .target(greeter_type())
            .intercept(
                Intercept::<Self>::method("Foo", &["System.String"])
                    .handle1::<String, _>(|_, _| Ok(AfterCall::noop())),
            )
    }

    fn construct(_context: WrapperContext<Greeter>) -> Result<Self, ConstructionError> {
        Ok(Self)
    }
}

/// Written against the repository interface, with interface matching.
pub struct RepositoryWrapper;

impl MethodWrapper for RepositoryWrapper {
    type Target = ();

    fn definition() -> WrapperDefinition<Self> {
        WrapperDefinition::new("RepositoryWrapper")
            .target(repository_interface())
            .match_interface()
            .intercept(
                Intercept::<Self>::method("Save", &[])
                    .transaction_required(false)
                    .handle0(|_| Ok(AfterCall::noop())),
            )
    }

    fn construct(_context: WrapperContext<()>) -> Result<Self, ConstructionError> {
        Ok(Self)
    }
}

/// Same target as [`RepositoryWrapper`] but exact-type matching only.
pub struct ExactRepositoryWrapper;

impl MethodWrapper for ExactRepositoryWrapper {
    type Target = ();

    fn definition() -> WrapperDefinition<Self> {
        WrapperDefinition::new("ExactRepositoryWrapper")
            .target(repository_interface())
            .intercept(
                Intercept::<Self>::method("Save", &[])
                    .transaction_required(false)
                    .handle0(|_| Ok(AfterCall::noop())),
            )
    }

    fn construct(_context: WrapperContext<()>) -> Result<Self, ConstructionError> {
        Ok(Self)
    }
}

/// Only matches call sites that request it by name.
pub struct NamedLibraryWrapper;

impl MethodWrapper for NamedLibraryWrapper {
    type Target = ();

    fn definition() -> WrapperDefinition<Self> {
        WrapperDefinition::new("NamedLibraryWrapper")
            .target(greeter_type())
            .accepts_wrapper_name("NamedLibraryWrapper")
            .intercept(
                Intercept::<Self>::method("Work", &[])
                    .transaction_required(false)
                    .handle0(|_| Ok(AfterCall::noop())),
            )
    }

    fn construct(_context: WrapperContext<()>) -> Result<Self, ConstructionError> {
        Ok(Self)
    }
}

/// Declares no intercepts.
pub struct EmptyWrapper;

impl MethodWrapper for EmptyWrapper {
    type Target = ();

    fn definition() -> WrapperDefinition<Self> {
        WrapperDefinition::new("EmptyWrapper").target(greeter_type())
    }

    fn construct(_context: WrapperContext<()>) -> Result<Self, ConstructionError> {
        Ok(Self)
    }
}

/// Declares two target types.
pub struct AmbiguousTargetWrapper;

impl MethodWrapper for AmbiguousTargetWrapper {
    type Target = ();

    fn definition() -> WrapperDefinition<Self> {
        WrapperDefinition::new("AmbiguousTargetWrapper")
            .target(greeter_type())
            .target(repository_interface())
            .intercept(Intercept::<Self>::method("Foo", &[]).handle0(|_| Ok(AfterCall::noop())))
    }

    fn construct(_context: WrapperContext<()>) -> Result<Self, ConstructionError> {
        Ok(Self)
    }
}

/// Declares two parameters but handles one.
pub struct ArityMismatchWrapper;

impl MethodWrapper for ArityMismatchWrapper {
    type Target = ();

    fn definition() -> WrapperDefinition<Self> {
        WrapperDefinition::new("ArityMismatchWrapper")
            .target(greeter_type())
            .intercept(
                Intercept::<Self>::method("Foo", &["System.String", "System.Int32"])
                    .handle1::<String, _>(|_, _| Ok(AfterCall::noop())),
            )
    }

    fn construct(_context: WrapperContext<()>) -> Result<Self, ConstructionError> {
        Ok(Self)
    }
}

/// Construction always fails.
pub struct UnbuildableWrapper;

impl MethodWrapper for UnbuildableWrapper {
    type Target = Greeter;

    fn definition() -> WrapperDefinition<Self> {
        WrapperDefinition::new("UnbuildableWrapper")
            .target(greeter_type())
            .intercept(
                Intercept::<Self>::method("Foo", &["System.String"])
                    .handle1::<String, _>(|_, _| Ok(AfterCall::noop())),
            )
    }

    fn construct(context: WrapperContext<Greeter>) -> Result<Self, ConstructionError> {
        context.target()?;
        Ok(Self)
    }
}

/// Construction panics.
pub struct PanickingConstructorWrapper;

impl MethodWrapper for PanickingConstructorWrapper {
    type Target = ();

    fn definition() -> WrapperDefinition<Self> {
        WrapperDefinition::new("PanickingConstructorWrapper")
            .target(greeter_type())
            .intercept(
                Intercept::<Self>::method("Foo", &["System.String"])
                    .handle1::<String, _>(|_, _| Ok(AfterCall::noop())),
            )
    }

    fn construct(_context: WrapperContext<()>) -> Result<Self, ConstructionError> {
        panic!("constructor dereferenced a missing agent");
    }
}

/// Fails every before-call, matched by requesting `FailingWrapper`.
#[derive(Debug, Default)]
pub struct FailingWrapper {
    pub calls: AtomicUsize,
}

impl Wrapper for FailingWrapper {
    fn name(&self) -> &str {
        "FailingWrapper"
    }

    fn probe(&self, call_site: &CallSite) -> ProbeResult {
        ProbeResult::from_bool(call_site.requested_wrapper_name() == "FailingWrapper")
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
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(WrapperError::Failed("database driver not loaded".to_string()))
    }
}

/// Panics in before-call, matched by requesting `PanickingWrapper`.
#[derive(Debug, Default)]
pub struct PanickingWrapper;

impl Wrapper for PanickingWrapper {
    fn name(&self) -> &str {
        "PanickingWrapper"
    }

    fn probe(&self, call_site: &CallSite) -> ProbeResult {
        ProbeResult::from_bool(call_site.requested_wrapper_name() == "PanickingWrapper")
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
        panic!("index out of range");
    }
}

/// Succeeds in before-call but panics when the call completes.
#[derive(Debug, Default)]
pub struct PanickingAfterWrapper;

impl Wrapper for PanickingAfterWrapper {
    fn name(&self) -> &str {
        "PanickingAfterWrapper"
    }

    fn probe(&self, call_site: &CallSite) -> ProbeResult {
        ProbeResult::from_bool(call_site.requested_wrapper_name() == "PanickingAfterWrapper")
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
        Ok(AfterCall::finally(|_| panic!("segment already ended")))
    }
}

/// Probe that explains itself, for diagnostic logging checks.
#[derive(Debug)]
pub struct ExplainingWrapper {
    pub matched: bool,
}

impl Wrapper for ExplainingWrapper {
    fn name(&self) -> &str {
        "ExplainingWrapper"
    }

    fn probe(&self, call_site: &CallSite) -> ProbeResult {
        if call_site.requested_wrapper_name() != "ExplainingWrapper" {
            return ProbeResult::no_match();
        }
        ProbeResult::from_bool(self.matched).with_diagnostic("explained")
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
