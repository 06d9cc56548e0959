#![allow(clippy::doc_markdown)] // Allow technical terms in docs
#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Wrapper Dispatch
//!
//! The dispatch core of a method-interception instrumentation agent.
//!
//! ## Overview
//!
//! Given a call site about to execute inside a monitored application, the
//! dispatcher selects an interception strategy ("wrapper"), runs its pre-call
//! logic, and arranges for post-call logic to run exactly once, whether the
//! call completes synchronously or through an awaited result.
//!
//! ## Architecture
//!
//! ```text
//! CallSite ──► WrapperMap::get ──► TrackedWrapper ──► before_wrapped_method
//!                (tiered probe)     (failure count)          │
//!                                                            ▼
//!                                   CallFinalizer ◄──── AfterCall
//!                                (exactly-once end)  (sync or continuation)
//! ```
//!
//! Nothing in this crate surfaces an error or a panic to the monitored
//! application: resolution degrades to the no-op wrapper and instrumentation
//! failures degrade to a no-op completion delegate.
//!
//! ## Module Organization
//!
//! - [`model`] - Method identities, call sites, and per-call data
//! - [`agent`] - Transaction/segment collaborator interfaces
//! - [`registry`] - Strategy registration, resolution engine, wrapper service
//! - [`completion`] - Completion delegates, awaitables, execution contexts
//! - [`wrappers`] - Built-in strategies
//! - [`config`] - Configuration loading
//! - [`error`] - Structured error handling
//! - [`logging`] - Structured logging setup
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use wrapper_dispatch::config::DispatchConfig;
//! use wrapper_dispatch::registry::{WrapperMap, WrapperService};
//! use wrapper_dispatch::test_helpers::RecordingAgent;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = DispatchConfig::load(None)?;
//! wrapper_dispatch::logging::init_structured_logging(&config.logging);
//!
//! let map = Arc::new(WrapperMap::builder(config.host_environment()).build());
//! let service = WrapperService::new(map, RecordingAgent::new(), &config);
//! # let _ = service;
//! # Ok(())
//! # }
//! ```

pub mod agent;
pub mod completion;
pub mod config;
pub mod constants;
pub mod error;
pub mod logging;
pub mod model;
pub mod registry;
pub mod test_helpers;
pub mod wrappers;

pub use agent::{Agent, Segment, SegmentName, Transaction};
pub use completion::{
    AfterCall, AsyncCompleter, AsyncOutcome, AsyncResult, CallFinalizer, CompletionState,
    ExecutionContext, QueueExecutionContext, ReturnValue, TokioExecutionContext,
};
pub use config::{DispatchConfig, HostEnvironment, LoggingConfig};
pub use error::{
    CallError, ConfigurationError, ConstructionError, DispatchError, RegistrationError, Result,
    WrapperError,
};
pub use model::{value, Argument, CallSite, Method, MethodCall, NamePriority, TypeDescriptor, Value};
pub use registry::{
    DynamicWrapperSource, Intercept, MethodWrapper, ProbeResult, Registrar, Registration,
    StaticWrapperSource, TrackedWrapper, Wrapper, WrapperContext, WrapperDefinition, WrapperKind,
    WrapperMap, WrapperMapBuilder, WrapperMapStats, WrapperService,
};
