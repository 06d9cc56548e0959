//! # Constants
//!
//! Wrapper names understood by the built-in strategies and default thresholds.

/// Environment variable prefix for configuration overrides
pub const ENV_PREFIX: &str = "WRAPPER_DISPATCH";

pub const DEFAULT_MAX_CONSECUTIVE_FAILURES: u32 = 5;

pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Transaction category used by transaction-creating built-in wrappers
pub const CUSTOM_CATEGORY: &str = "Custom";

/// Requested wrapper names recognized by the built-in strategies.
pub mod wrapper_names {
    pub const DEFAULT: &str = "DefaultWrapper";
    pub const DEFAULT_ASYNC: &str = "DefaultWrapperAsync";
    pub const DEFAULT_TRACER_FACTORY: &str = "DefaultTracerFactory";
    pub const NO_OP: &str = "NoOpWrapper";
    pub const OTHER_TRANSACTION: &str = "OtherTransactionWrapper";
    pub const OTHER_TRANSACTION_ASYNC: &str = "OtherTransactionWrapperAsync";
    pub const BACKGROUND_THREAD_TRACER_FACTORY: &str = "BackgroundThreadTracerFactory";
    pub const CUSTOM_SEGMENT: &str = "CustomSegmentWrapper";
    pub const IGNORE_TRANSACTION: &str = "IgnoreTransactionWrapper";
    pub const DETACH: &str = "DetachWrapper";
    pub const ATTACH_TO_ASYNC: &str = "AttachToAsyncWrapper";
    pub const MULTITHREADED_TRACKING: &str = "MultithreadedTrackingWrapper";

    /// Names that request a new non-web ("other") transaction.
    pub const OTHER_TRANSACTION_NAMES: &[&str] = &[
        BACKGROUND_THREAD_TRACER_FACTORY,
        OTHER_TRANSACTION,
        OTHER_TRANSACTION_ASYNC,
    ];

    /// Names handled by the default tier. An empty requested name also selects it.
    pub const DEFAULT_NAMES: &[&str] = &[DEFAULT, DEFAULT_ASYNC, DEFAULT_TRACER_FACTORY];
}
