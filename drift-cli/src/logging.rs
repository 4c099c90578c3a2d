//! Logging setup for the `drift` binary.
//!
//! # Environment Variables
//!
//! - `DRIFT_DEBUG=true` (or `1`, `yes`) - Enable debug logging
//! - `DRIFT_LOG_LEVEL=trace|debug|info|warn|error` - Set a specific level
//! - `DRIFT_LOG_FORMAT=pretty|compact|json` - Set the output format
//!
//! Logs go to stderr so that `--format json` output on stdout stays clean.

use std::env;

use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Log output formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Multi-line, human-readable
    Pretty,
    /// One line per event
    Compact,
    /// Structured JSON
    Json,
}

impl LogFormat {
    /// Parse a format name, falling back to compact.
    pub fn parse(value: &str) -> Self {
        match value.to_lowercase().as_str() {
            "pretty" => Self::Pretty,
            "json" => Self::Json,
            _ => Self::Compact,
        }
    }
}

/// Check whether a `DRIFT_DEBUG` value enables debug logging.
pub fn is_debug_value(value: &str) -> bool {
    matches!(value.to_lowercase().as_str(), "true" | "1" | "yes")
}

/// Resolve the log level from the `DRIFT_LOG_LEVEL` and `DRIFT_DEBUG` values.
///
/// Defaults to "debug" when debug is enabled, otherwise "warn".
pub fn resolve_level(level: Option<&str>, debug: Option<&str>) -> &'static str {
    let fallback = if debug.is_some_and(is_debug_value) {
        "debug"
    } else {
        "warn"
    };
    match level.map(str::to_lowercase).as_deref() {
        Some("trace") => "trace",
        Some("debug") => "debug",
        Some("info") => "info",
        Some("warn") => "warn",
        Some("error") => "error",
        _ => fallback,
    }
}

/// Install the global tracing subscriber.
///
/// Call once at startup.
pub fn init() {
    let level = resolve_level(
        env::var("DRIFT_LOG_LEVEL").ok().as_deref(),
        env::var("DRIFT_DEBUG").ok().as_deref(),
    );
    let format = LogFormat::parse(&env::var("DRIFT_LOG_FORMAT").unwrap_or_default());

    let directives = ["drift", "drift_core", "drift_postgres", "drift_sqlite", "drift_cli"]
        .map(|target| format!("{target}={level}"))
        .join(",");
    let filter = EnvFilter::try_new(directives).unwrap_or_else(|_| EnvFilter::new("warn"));

    let registry = tracing_subscriber::registry().with(filter);
    let result = match format {
        LogFormat::Json => registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init(),
        LogFormat::Compact => registry
            .with(fmt::layer().compact().with_writer(std::io::stderr))
            .try_init(),
        LogFormat::Pretty => registry
            .with(fmt::layer().pretty().with_writer(std::io::stderr))
            .try_init(),
    };

    if result.is_ok() {
        tracing::debug!(level, ?format, "Logging initialized");
    }
}
