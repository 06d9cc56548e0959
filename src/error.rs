//! # Error Types
//!
//! Error taxonomy for the dispatch core.
//!
//! - [`RegistrationError`]: a strategy is authored incorrectly; fatal to that strategy.
//! - [`ConstructionError`]: building a strategy instance failed.
//! - [`WrapperError`]: invoking a strategy's before-call thunk failed.
//! - [`CallError`]: the error value produced by the *wrapped* call itself.
//! - [`ConfigurationError`]: loading or validating [`crate::config::DispatchConfig`].
//!
//! None of these ever reach the monitored application. The resolution engine degrades
//! to the no-op wrapper, and the wrapper service turns instrumentation failures into
//! a no-op completion delegate.

use std::any::Any;
use thiserror::Error;

/// Fatal authoring errors for a strategy type, raised by the registration step.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistrationError {
    #[error("{wrapper} has an invalid invocation target: expected exactly one target type, found {found}")]
    InvalidTargetType { wrapper: String, found: usize },

    #[error("Wrapper {wrapper} did not define any intercept methods")]
    NoInterceptMethods { wrapper: String },

    #[error("{wrapper}.{method} declares {declared} parameter types but its handler takes {arity} arguments")]
    SignatureMismatch {
        wrapper: String,
        method: String,
        declared: usize,
        arity: usize,
    },

    #[error("{wrapper}.{method} has no handler")]
    MissingHandler { wrapper: String, method: String },
}

/// Failure to build a strategy instance from its construction thunk.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConstructionError {
    #[error("Invocation target is not a {expected}")]
    TargetType { expected: &'static str },

    #[error("Missing {0} for wrapper construction")]
    Missing(&'static str),

    #[error("Wrapper construction failed: {0}")]
    Failed(String),
}

/// Failure raised while running a wrapper's before-call logic.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WrapperError {
    #[error(transparent)]
    Construction(#[from] ConstructionError),

    #[error("{method} expects {expected} arguments, got {actual}")]
    ArgumentCount {
        method: String,
        expected: usize,
        actual: usize,
    },

    #[error("Argument {index} of {method} is not a {expected}")]
    ArgumentType {
        method: String,
        index: usize,
        expected: &'static str,
    },

    #[error("Wrapper failed: {0}")]
    Failed(String),

    #[error("Wrapper panicked: {0}")]
    Panicked(String),
}

/// The error value of a wrapped call, or of the awaited operation it returned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{type_name}: {message}")]
pub struct CallError {
    pub type_name: String,
    pub message: String,
}

impl CallError {
    pub const CANCELLED_TYPE: &'static str = "OperationCanceled";

    pub fn new(type_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            message: message.into(),
        }
    }

    /// Error surfaced to continuations when the awaited operation was cancelled.
    pub fn cancelled() -> Self {
        Self::new(Self::CANCELLED_TYPE, "The operation was canceled.")
    }

    pub fn is_cancellation(&self) -> bool {
        self.type_name == Self::CANCELLED_TYPE
    }

    /// Build an error from a caught panic payload.
    pub fn from_panic(payload: &(dyn Any + Send)) -> Self {
        Self::new("Panic", panic_message(payload))
    }
}

/// Configuration loading and validation errors.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Invalid value '{value}' for field '{field}': {context}")]
    InvalidValue {
        field: String,
        value: String,
        context: String,
    },
}

/// Crate-level error.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("Registration error: {0}")]
    Registration(#[from] RegistrationError),

    #[error("Construction error: {0}")]
    Construction(#[from] ConstructionError),

    #[error("Wrapper error: {0}")]
    Wrapper(#[from] WrapperError),

    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),
}

pub type Result<T> = std::result::Result<T, DispatchError>;

/// Extract a readable message from a `catch_unwind` payload.
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "Unknown panic".to_string()
    }
}
