//! # Dispatch Configuration
//!
//! Configuration is read from an optional TOML file and then overridden by
//! environment variables prefixed with `WRAPPER_DISPATCH`:
//!
//! ```bash
//! export WRAPPER_DISPATCH__MAX_CONSECUTIVE_FAILURES=3
//! export WRAPPER_DISPATCH__LEGACY_ASYNC_PIPELINE=true
//! export WRAPPER_DISPATCH__LOGGING__LEVEL=debug
//! ```
//!
//! ```rust,no_run
//! use wrapper_dispatch::config::DispatchConfig;
//! use std::path::Path;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = DispatchConfig::load(Some(Path::new("config/dispatch.toml")))?;
//! let environment = config.host_environment();
//! # Ok(())
//! # }
//! ```

use crate::constants::{DEFAULT_LOG_LEVEL, DEFAULT_MAX_CONSECUTIVE_FAILURES, ENV_PREFIX};
use crate::error::ConfigurationError;
use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

/// Root configuration for the dispatch core.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Consecutive failures after which a call site's wrapper is replaced by the no-op wrapper
    pub max_consecutive_failures: u32,

    /// Whether the host runs the legacy pipeline that cannot support continuation-based wrappers
    pub legacy_async_pipeline: bool,

    pub logging: LoggingConfig,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            max_consecutive_failures: DEFAULT_MAX_CONSECUTIVE_FAILURES,
            legacy_async_pipeline: false,
            logging: LoggingConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is not set
    pub level: String,
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: DEFAULT_LOG_LEVEL.to_string(),
            json: false,
        }
    }
}

impl DispatchConfig {
    /// Load from an optional TOML file plus `WRAPPER_DISPATCH__*` environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigurationError> {
        let mut builder = Config::builder();

        if let Some(path) = path {
            debug!(path = %path.display(), "Loading dispatch configuration file");
            builder = builder.add_source(File::from(path).format(FileFormat::Toml).required(false));
        }

        let config: DispatchConfig = builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from a TOML string, without environment overrides.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigurationError> {
        let config: DispatchConfig = Config::builder()
            .add_source(File::from_str(contents, FileFormat::Toml))
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.max_consecutive_failures == 0 {
            return Err(ConfigurationError::InvalidValue {
                field: "max_consecutive_failures".to_string(),
                value: self.max_consecutive_failures.to_string(),
                context: "must be greater than zero".to_string(),
            });
        }

        if self.logging.level.trim().is_empty() {
            return Err(ConfigurationError::InvalidValue {
                field: "logging.level".to_string(),
                value: self.logging.level.clone(),
                context: "must be a non-empty filter directive".to_string(),
            });
        }

        Ok(())
    }

    pub fn host_environment(&self) -> HostEnvironment {
        HostEnvironment {
            legacy_async_pipeline: self.legacy_async_pipeline,
        }
    }
}

/// Facts about the hosting environment that gate strategy applicability.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HostEnvironment {
    pub legacy_async_pipeline: bool,
}

impl HostEnvironment {
    /// An environment in which continuation-based wrappers cannot be supported.
    pub fn legacy() -> Self {
        Self {
            legacy_async_pipeline: true,
        }
    }

    pub fn supports_continuations(&self) -> bool {
        !self.legacy_async_pipeline
    }
}
