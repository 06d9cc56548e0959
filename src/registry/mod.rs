//! # Wrapper Registry
//!
//! Registration, resolution, and failure tracking for instrumentation strategies.
//!
//! ## Components
//!
//! - [`Wrapper`]: the strategy trait, with its [`ProbeResult`]
//! - [`Registrar`]: builds [`Registration`]s from [`MethodWrapper`] types
//! - [`TrackedWrapper`]: a resolved strategy plus its consecutive-failure counter
//! - [`WrapperMap`]: the tiered resolution engine
//! - [`DynamicWrapperSource`]: name-based lookup consulted between tiers
//! - [`WrapperService`]: per-call-site caching and failure containment for the host

pub mod dynamic_source;
pub mod registration;
pub mod service;
pub mod tracked_wrapper;
pub mod wrapper;
pub mod wrapper_map;

pub use dynamic_source::{DynamicWrapperSource, StaticWrapperSource};
pub use registration::{
    Intercept, MethodWrapper, Registrar, Registration, WrapperContext, WrapperDefinition,
};
pub use service::WrapperService;
pub use tracked_wrapper::TrackedWrapper;
pub use wrapper::{ProbeResult, Wrapper, WrapperKind};
pub use wrapper_map::{WrapperMap, WrapperMapBuilder, WrapperMapStats};
