//! # Structured Logging Module
//!
//! Console logging through the tracing ecosystem. The dispatch core runs inside a
//! monitored process, so initialization never panics and never replaces a subscriber
//! the host already installed.

use crate::config::LoggingConfig;
use chrono::Utc;
use std::sync::OnceLock;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

static LOGGER_INITIALIZED: OnceLock<()> = OnceLock::new();

/// Initialize structured logging from configuration. `RUST_LOG` wins over `config.level`.
pub fn init_structured_logging(config: &LoggingConfig) {
    LOGGER_INITIALIZED.get_or_init(|| {
        let filter = build_filter(&config.level);

        let layer = if config.json {
            fmt::layer()
                .with_target(true)
                .with_thread_ids(true)
                .json()
                .with_filter(filter)
                .boxed()
        } else {
            fmt::layer()
                .with_target(true)
                .with_thread_ids(true)
                .with_ansi(std::io::IsTerminal::is_terminal(&std::io::stdout()))
                .with_filter(filter)
                .boxed()
        };

        if tracing_subscriber::registry().with(layer).try_init().is_err() {
            tracing::debug!(
                "Global tracing subscriber already initialized - continuing with existing subscriber"
            );
        }

        tracing::info!(
            level = %config.level,
            json = config.json,
            "🔧 STRUCTURED LOGGING: Initialized"
        );
    });
}

fn build_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new(crate::constants::DEFAULT_LOG_LEVEL))
}

/// Log a wrapper registration outcome.
pub fn log_registration_operation(
    operation: &str,
    wrapper: &str,
    status: &str,
    registrations: usize,
    details: Option<&str>,
) {
    tracing::info!(
        operation = %operation,
        wrapper = %wrapper,
        status = %status,
        registrations = registrations,
        details = details,
        timestamp = %Utc::now().to_rfc3339(),
        "📚 REGISTRATION_OPERATION"
    );
}

/// Log a contained instrumentation failure for a call site.
pub fn log_instrumentation_failure(
    call_site_id: u64,
    wrapper: &str,
    method: &str,
    consecutive_failures: u32,
    error: &str,
) {
    tracing::error!(
        call_site_id = call_site_id,
        wrapper = %wrapper,
        method = %method,
        consecutive_failures = consecutive_failures,
        error = %error,
        timestamp = %Utc::now().to_rfc3339(),
        "❌ INSTRUMENTATION_FAILURE"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_is_idempotent() {
        let config = LoggingConfig::default();
        init_structured_logging(&config);
        init_structured_logging(&config);
        assert!(LOGGER_INITIALIZED.get().is_some());
    }

    #[test]
    fn test_invalid_level_falls_back() {
        // Must not panic on a malformed directive
        let _filter = build_filter("not==a==directive");
    }
}
