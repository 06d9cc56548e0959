//! # Wrapper Registration
//!
//! Turns a strategy type into one [`Registration`] per declared intercept.
//!
//! A strategy implements [`MethodWrapper`]: it names the single invocation-target
//! type it handles, declares its intercepts through a [`WrapperDefinition`], and
//! knows how to build itself from a [`WrapperContext`]. The [`Registrar`] then:
//!
//! 1. checks the definition (exactly one target type, at least one intercept,
//!    each handler's arity equal to its declared parameter list);
//! 2. builds the construction thunk once and validates it by invoking it with
//!    every input empty;
//! 3. produces a registration per intercept, sharing the one construction thunk.
//!
//! Definition errors are fatal for that strategy and are returned to the caller.
//! A failed validation is logged and the strategy contributes nothing.
//!
//! ## Example
//!
//! ```rust,ignore
//! struct QueueWrapper { context: WrapperContext<MessageQueue> }
//!
//! impl MethodWrapper for QueueWrapper {
//!     type Target = MessageQueue;
//!
//!     fn definition() -> WrapperDefinition<Self> {
//!         WrapperDefinition::new("QueueWrapper")
//!             .target(TypeDescriptor::new("Acme.MessageQueue", "Acme"))
//!             .intercept(
//!                 Intercept::<Self>::method("Send", &["System.String"])
//!                     .handle1::<String, _>(|wrapper, message| wrapper.send(message)),
//!             )
//!     }
//!
//!     fn construct(context: WrapperContext<MessageQueue>) -> Result<Self, ConstructionError> {
//!         Ok(Self { context })
//!     }
//! }
//! ```

use super::wrapper::{ProbeResult, Wrapper, WrapperKind};
use crate::agent::{Agent, Transaction};
use crate::completion::AfterCall;
use crate::config::HostEnvironment;
use crate::error::{panic_message, ConstructionError, RegistrationError, WrapperError};
use crate::logging::log_registration_operation;
use crate::model::{Argument, CallSite, MethodCall, TypeDescriptor, Value};
use std::any::{type_name, Any};
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{debug, error};

/// Inputs available to a strategy while it is being constructed.
///
/// Every field is empty when the construction thunk is validated at
/// registration time, so `construct` must not insist on them; accessors return
/// [`ConstructionError::Missing`] for use inside handlers instead.
pub struct WrapperContext<T> {
    agent: Option<Arc<dyn Agent>>,
    transaction: Option<Arc<dyn Transaction>>,
    call: Option<MethodCall>,
    target: Option<Arc<T>>,
    environment: HostEnvironment,
}

impl<T> WrapperContext<T> {
    pub fn agent(&self) -> Result<&Arc<dyn Agent>, ConstructionError> {
        self.agent.as_ref().ok_or(ConstructionError::Missing("agent"))
    }

    pub fn transaction(&self) -> Result<&Arc<dyn Transaction>, ConstructionError> {
        self.transaction
            .as_ref()
            .ok_or(ConstructionError::Missing("transaction"))
    }

    pub fn call(&self) -> Result<&MethodCall, ConstructionError> {
        self.call.as_ref().ok_or(ConstructionError::Missing("method call"))
    }

    pub fn target(&self) -> Result<&Arc<T>, ConstructionError> {
        self.target
            .as_ref()
            .ok_or(ConstructionError::Missing("invocation target"))
    }

    pub fn environment(&self) -> HostEnvironment {
        self.environment
    }
}

/// A strategy type that can be registered.
pub trait MethodWrapper: Send + Sync + Sized + 'static {
    /// The invocation-target type this strategy is written against.
    type Target: Any + Send + Sync;

    fn definition() -> WrapperDefinition<Self>;

    fn construct(context: WrapperContext<Self::Target>) -> Result<Self, ConstructionError>;
}

type Handler<S> = Box<dyn Fn(&S, &[Argument]) -> Result<AfterCall, WrapperError> + Send + Sync>;

/// One intercepted method declared by a strategy.
pub struct Intercept<S> {
    method: String,
    parameter_types: Vec<String>,
    arity: usize,
    handler: Option<Handler<S>>,
    transaction_required: bool,
    uses_continuation: bool,
}

impl<S: 'static> Intercept<S> {
    /// Intercept `method` with exactly these parameter types, in order.
    pub fn method(method: impl Into<String>, parameter_types: &[&str]) -> Self {
        Self {
            method: method.into(),
            parameter_types: parameter_types.iter().map(|p| (*p).to_string()).collect(),
            arity: 0,
            handler: None,
            transaction_required: true,
            uses_continuation: false,
        }
    }

    #[must_use]
    pub fn transaction_required(mut self, required: bool) -> Self {
        self.transaction_required = required;
        self
    }

    /// Mark the intercept as continuation-based; it will not match in a legacy environment.
    #[must_use]
    pub fn uses_continuation(mut self, uses_continuation: bool) -> Self {
        self.uses_continuation = uses_continuation;
        self
    }

    #[must_use]
    pub fn handle0<F>(mut self, handler: F) -> Self
    where
        F: Fn(&S) -> Result<AfterCall, WrapperError> + Send + Sync + 'static,
    {
        self.arity = 0;
        self.handler = Some(Box::new(move |wrapper: &S, _: &[Argument]| handler(wrapper)));
        self
    }

    #[must_use]
    pub fn handle1<A, F>(mut self, handler: F) -> Self
    where
        A: Any,
        F: Fn(&S, Option<&A>) -> Result<AfterCall, WrapperError> + Send + Sync + 'static,
    {
        let method = self.method.clone();
        self.arity = 1;
        self.handler = Some(Box::new(move |wrapper: &S, args: &[Argument]| {
            let a = cast_argument::<A>(&method, args, 0)?;
            handler(wrapper, a)
        }));
        self
    }

    #[must_use]
    pub fn handle2<A, B, F>(mut self, handler: F) -> Self
    where
        A: Any,
        B: Any,
        F: Fn(&S, Option<&A>, Option<&B>) -> Result<AfterCall, WrapperError>
            + Send
            + Sync
            + 'static,
    {
        let method = self.method.clone();
        self.arity = 2;
        self.handler = Some(Box::new(move |wrapper: &S, args: &[Argument]| {
            let a = cast_argument::<A>(&method, args, 0)?;
            let b = cast_argument::<B>(&method, args, 1)?;
            handler(wrapper, a, b)
        }));
        self
    }

    #[must_use]
    pub fn handle3<A, B, C, F>(mut self, handler: F) -> Self
    where
        A: Any,
        B: Any,
        C: Any,
        F: Fn(&S, Option<&A>, Option<&B>, Option<&C>) -> Result<AfterCall, WrapperError>
            + Send
            + Sync
            + 'static,
    {
        let method = self.method.clone();
        self.arity = 3;
        self.handler = Some(Box::new(move |wrapper: &S, args: &[Argument]| {
            let a = cast_argument::<A>(&method, args, 0)?;
            let b = cast_argument::<B>(&method, args, 1)?;
            let c = cast_argument::<C>(&method, args, 2)?;
            handler(wrapper, a, b, c)
        }));
        self
    }
}

fn cast_argument<'a, A: Any>(
    method: &str,
    args: &'a [Argument],
    index: usize,
) -> Result<Option<&'a A>, WrapperError> {
    match args.get(index) {
        Some(Some(value)) => (**value)
            .downcast_ref::<A>()
            .map(Some)
            .ok_or_else(|| WrapperError::ArgumentType {
                method: method.to_string(),
                index,
                expected: type_name::<A>(),
            }),
        Some(None) => Ok(None),
        None => Err(WrapperError::ArgumentCount {
            method: method.to_string(),
            expected: index + 1,
            actual: args.len(),
        }),
    }
}

/// Declarative description of a strategy type.
pub struct WrapperDefinition<S> {
    name: String,
    kind: WrapperKind,
    targets: Vec<TypeDescriptor>,
    match_interface: bool,
    accepted_names: Vec<String>,
    intercepts: Vec<Intercept<S>>,
}

impl<S: 'static> WrapperDefinition<S> {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: WrapperKind::Specific,
            targets: Vec::new(),
            match_interface: false,
            accepted_names: Vec::new(),
            intercepts: Vec::new(),
        }
    }

    /// The invocation-target type. Must be declared exactly once.
    #[must_use]
    pub fn target(mut self, target: TypeDescriptor) -> Self {
        self.targets.push(target);
        self
    }

    /// Match declaring types that implement the target instead of only the exact type.
    #[must_use]
    pub fn match_interface(mut self) -> Self {
        self.match_interface = true;
        self
    }

    /// Only match call sites that request one of these wrapper names.
    #[must_use]
    pub fn accepts_wrapper_name(mut self, name: impl Into<String>) -> Self {
        self.accepted_names.push(name.into());
        self
    }

    #[must_use]
    pub fn kind(mut self, kind: WrapperKind) -> Self {
        self.kind = kind;
        self
    }

    #[must_use]
    pub fn intercept(mut self, intercept: Intercept<S>) -> Self {
        self.intercepts.push(intercept);
        self
    }
}

struct ConstructionInputs {
    agent: Option<Arc<dyn Agent>>,
    transaction: Option<Arc<dyn Transaction>>,
    call: Option<MethodCall>,
    target: Option<Value>,
}

impl ConstructionInputs {
    fn empty() -> Self {
        Self {
            agent: None,
            transaction: None,
            call: None,
            target: None,
        }
    }
}

type ConstructionThunk<S> =
    Arc<dyn Fn(ConstructionInputs) -> Result<S, ConstructionError> + Send + Sync>;

type InvocationThunk =
    Box<dyn Fn(ConstructionInputs, &[Argument]) -> Result<AfterCall, WrapperError> + Send + Sync>;

fn construction_thunk<S: MethodWrapper>(environment: HostEnvironment) -> ConstructionThunk<S> {
    Arc::new(move |inputs: ConstructionInputs| {
        let target = match inputs.target {
            Some(target) => Some(target.downcast::<S::Target>().map_err(|_| {
                ConstructionError::TargetType {
                    expected: type_name::<S::Target>(),
                }
            })?),
            None => None,
        };
        S::construct(WrapperContext {
            agent: inputs.agent,
            transaction: inputs.transaction,
            call: inputs.call,
            target,
            environment,
        })
    })
}

/// A single registered intercept: applicability predicate plus prebuilt thunk.
pub struct Registration {
    wrapper_name: String,
    kind: WrapperKind,
    target_type: TypeDescriptor,
    match_interface: bool,
    accepted_names: Arc<[String]>,
    method_name: String,
    parameter_types: Vec<String>,
    transaction_required: bool,
    uses_continuation: bool,
    environment: HostEnvironment,
    invoke: InvocationThunk,
}

impl Registration {
    pub fn method_name(&self) -> &str {
        &self.method_name
    }

    pub fn parameter_types(&self) -> &[String] {
        &self.parameter_types
    }

    pub fn target_type(&self) -> &TypeDescriptor {
        &self.target_type
    }

    pub fn uses_continuation(&self) -> bool {
        self.uses_continuation
    }

    fn declaring_type_matches(&self, call_site: &CallSite) -> bool {
        let declaring_type = call_site.method().declaring_type();
        if self.match_interface {
            declaring_type.is_assignable_to(&self.target_type)
        } else {
            *declaring_type == self.target_type
        }
    }
}

impl Wrapper for Registration {
    fn name(&self) -> &str {
        &self.wrapper_name
    }

    fn kind(&self) -> WrapperKind {
        self.kind
    }

    fn probe(&self, call_site: &CallSite) -> ProbeResult {
        let method = call_site.method();
        let identity_matches = self.declaring_type_matches(call_site)
            && method.name() == self.method_name
            && method.has_signature(&self.parameter_types);
        if !identity_matches {
            return ProbeResult::no_match();
        }

        if !self.accepted_names.is_empty()
            && !self
                .accepted_names
                .iter()
                .any(|name| name == call_site.requested_wrapper_name())
        {
            return ProbeResult::no_match();
        }

        if self.uses_continuation && !self.environment.supports_continuations() {
            return ProbeResult::rejected(format!(
                "{} uses continuations, which are not supported by the legacy async pipeline. \
                 {}.{} will not be instrumented",
                self.wrapper_name,
                method.declaring_type().full_name(),
                method.name()
            ));
        }

        ProbeResult::matched()
    }

    fn is_transaction_required(&self) -> bool {
        self.transaction_required
    }

    fn before_wrapped_method(
        &self,
        call: &MethodCall,
        agent: &Arc<dyn Agent>,
        transaction: Option<Arc<dyn Transaction>>,
    ) -> Result<AfterCall, WrapperError> {
        let actual = call.arguments().len();
        if actual != self.parameter_types.len() {
            return Err(WrapperError::ArgumentCount {
                method: self.method_name.clone(),
                expected: self.parameter_types.len(),
                actual,
            });
        }

        let inputs = ConstructionInputs {
            agent: Some(Arc::clone(agent)),
            transaction,
            call: Some(call.clone()),
            target: call.target().cloned(),
        };
        (self.invoke)(inputs, call.arguments())
    }
}

impl fmt::Debug for Registration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registration")
            .field("wrapper", &self.wrapper_name)
            .field("target_type", &self.target_type.full_name())
            .field("method", &self.method_name)
            .field("parameter_types", &self.parameter_types)
            .field("match_interface", &self.match_interface)
            .field("transaction_required", &self.transaction_required)
            .finish()
    }
}

/// Builds registrations for strategy types.
#[derive(Debug, Clone, Copy, Default)]
pub struct Registrar {
    environment: HostEnvironment,
}

impl Registrar {
    pub fn new(environment: HostEnvironment) -> Self {
        Self { environment }
    }

    pub fn environment(&self) -> HostEnvironment {
        self.environment
    }

    /// Register strategy `S`, producing one registration per intercept.
    ///
    /// Returns an empty list if the construction thunk fails validation.
    pub fn register<S: MethodWrapper>(&self) -> Result<Vec<Arc<Registration>>, RegistrationError> {
        let definition = S::definition();
        let wrapper_name = definition.name;

        let target_type = match definition.targets.as_slice() {
            [target] => target.clone(),
            other => {
                return Err(RegistrationError::InvalidTargetType {
                    wrapper: wrapper_name,
                    found: other.len(),
                })
            }
        };

        if definition.intercepts.is_empty() {
            return Err(RegistrationError::NoInterceptMethods {
                wrapper: wrapper_name,
            });
        }

        for intercept in &definition.intercepts {
            if intercept.handler.is_none() {
                return Err(RegistrationError::MissingHandler {
                    wrapper: wrapper_name,
                    method: intercept.method.clone(),
                });
            }
            if intercept.arity != intercept.parameter_types.len() {
                return Err(RegistrationError::SignatureMismatch {
                    wrapper: wrapper_name,
                    method: intercept.method.clone(),
                    declared: intercept.parameter_types.len(),
                    arity: intercept.arity,
                });
            }
        }

        let construct = construction_thunk::<S>(self.environment);
        if let Err(reason) = validate_construction(&construct) {
            error!(
                wrapper = %wrapper_name,
                error = %reason,
                "❌ Wrapper construction failed validation, skipping its registrations"
            );
            log_registration_operation(
                "register",
                &wrapper_name,
                "validation_failed",
                0,
                Some(&reason),
            );
            return Ok(Vec::new());
        }

        let accepted_names: Arc<[String]> = definition.accepted_names.into();
        let registrations: Vec<Arc<Registration>> = definition
            .intercepts
            .into_iter()
            .filter_map(|intercept| {
                let handler = intercept.handler?;
                let construct = Arc::clone(&construct);
                let invoke: InvocationThunk =
                    Box::new(move |inputs: ConstructionInputs, args: &[Argument]| {
                        let instance = construct(inputs)?;
                        handler(&instance, args)
                    });
                Some(Arc::new(Registration {
                    wrapper_name: wrapper_name.clone(),
                    kind: definition.kind,
                    target_type: target_type.clone(),
                    match_interface: definition.match_interface,
                    accepted_names: Arc::clone(&accepted_names),
                    method_name: intercept.method,
                    parameter_types: intercept.parameter_types,
                    transaction_required: intercept.transaction_required,
                    uses_continuation: intercept.uses_continuation,
                    environment: self.environment,
                    invoke,
                }))
            })
            .collect();

        debug!(
            wrapper = %wrapper_name,
            target_type = %target_type.full_name(),
            intercepts = registrations.len(),
            "Registered wrapper"
        );
        log_registration_operation(
            "register",
            &wrapper_name,
            "registered",
            registrations.len(),
            None,
        );
        Ok(registrations)
    }
}

fn validate_construction<S>(construct: &ConstructionThunk<S>) -> Result<(), String> {
    match catch_unwind(AssertUnwindSafe(|| construct(ConstructionInputs::empty()))) {
        Ok(Ok(_)) => Ok(()),
        Ok(Err(error)) => Err(error.to_string()),
        Err(panic) => Err(format!("panicked: {}", panic_message(panic.as_ref()))),
    }
}
