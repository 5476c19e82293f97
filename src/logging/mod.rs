//! Logging and observability
//!
//! This module provides:
//! - Structured JSON logs on the console, with an optional rolling file
//! - Configurable log levels, overridable with `RUST_LOG`
//! - Elastic APM transaction reporting ([`apm::ApmReporter`])
//!
//! # Example
//!
//! ```no_run
//! use railpos::logging::init_logging;
//! use railpos::config::LoggingConfig;
//!
//! let config = LoggingConfig::default();
//! let _guard = init_logging("info", &config).expect("Failed to initialize logging");
//!
//! tracing::info!(index = "wmata-rail-position", "Application started");
//! ```

pub mod apm;
pub mod structured;

// Re-export commonly used items
pub use apm::ApmReporter;
pub use structured::{init_logging, LoggingGuard};

/// Log an error with context
///
/// # Example
///
/// ```no_run
/// use railpos::log_error_with_context;
/// use railpos::domain::RailposError;
///
/// let error = RailposError::Configuration("feed.url cannot be empty".to_string());
/// log_error_with_context!(&error, "Failed to load configuration");
/// ```
#[macro_export]
macro_rules! log_error_with_context {
    ($error:expr, $context:expr) => {
        tracing::error!(
            error = %$error,
            context = $context,
            "Error occurred"
        );
    };
}
