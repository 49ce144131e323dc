//! Shared logging utilities for consistent tracing across the bootstrap pipeline

use crate::types::Stage;
use chrono::{DateTime, Utc};
use tracing::{error, info};

/// Build the filter directive used when `RUST_LOG` is not set
pub fn default_filter(log_level: Option<&str>) -> String {
    let base_level = log_level.unwrap_or("info");
    format!("bootstrap={base_level},shared={base_level},reqwest=warn,hyper=warn")
}

/// Initialize the stdout tracing subscriber
///
/// `RUST_LOG` takes precedence over `log_level`. Calling this more than once is
/// harmless, which lets every test binary call it from its own setup.
pub fn init_tracing(log_level: Option<&str>) {
    use tracing_subscriber::{EnvFilter, fmt};

    let env_filter = match std::env::var("RUST_LOG") {
        Ok(directives) if !directives.trim().is_empty() => EnvFilter::new(directives),
        _ => EnvFilter::new(default_filter(log_level)),
    };

    let _ = fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .try_init();
}

/// Get formatted timestamp for consistent logging
pub fn format_timestamp() -> String {
    let now: DateTime<Utc> = Utc::now();
    now.format("%H:%M:%S%.3f").to_string()
}

/// Macro for stage-aware info logging
#[macro_export]
macro_rules! stage_info {
    ($stage:expr, $($arg:tt)*) => {
        tracing::info!(
            stage = %$stage,
            timestamp = $crate::logging::format_timestamp(),
            $($arg)*
        );
    };
}

/// Macro for stage-aware warning logging
#[macro_export]
macro_rules! stage_warn {
    ($stage:expr, $($arg:tt)*) => {
        tracing::warn!(
            stage = %$stage,
            timestamp = $crate::logging::format_timestamp(),
            $($arg)*
        );
    };
}

/// Macro for stage-aware error logging
#[macro_export]
macro_rules! stage_error {
    ($stage:expr, $($arg:tt)*) => {
        tracing::error!(
            stage = %$stage,
            timestamp = $crate::logging::format_timestamp(),
            $($arg)*
        );
    };
}

/// Macro for stage-aware debug logging
#[macro_export]
macro_rules! stage_debug {
    ($stage:expr, $($arg:tt)*) => {
        tracing::debug!(
            stage = %$stage,
            timestamp = $crate::logging::format_timestamp(),
            $($arg)*
        );
    };
}

/// Contextual logging helper for startup messages
pub fn log_startup(stage: Stage, details: &str) {
    info!(
        stage = %stage,
        timestamp = format_timestamp(),
        "🚀 Starting {}",
        details
    );
}

/// Contextual logging helper for error conditions
pub fn log_error(stage: Stage, context: &str, error: &dyn std::fmt::Display) {
    error!(
        stage = %stage,
        timestamp = format_timestamp(),
        error = %error,
        "❌ {} failed: {}",
        context,
        error
    );
}

/// Contextual logging helper for success conditions
pub fn log_success(stage: Stage, message: &str) {
    info!(
        stage = %stage,
        timestamp = format_timestamp(),
        "✅ {}",
        message
    );
}
