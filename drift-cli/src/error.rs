//! CLI error types and result alias.

use miette::Diagnostic;
use thiserror::Error;

/// Result type alias for CLI operations
pub type CliResult<T> = Result<T, CliError>;

/// CLI error types
#[derive(Error, Debug, Diagnostic)]
pub enum CliError {
    /// IO error
    #[error("IO error: {0}")]
    #[diagnostic(code(drift::io))]
    Io(#[from] std::io::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    #[diagnostic(
        code(drift::config),
        help("see `drift reconcile --help` for the accepted flags and environment variables")
    )]
    Config(String),

    /// The run could not produce a report
    #[error("Reconciliation failed: {0}")]
    #[diagnostic(code(drift::reconcile))]
    Reconcile(#[from] drift::ReconcileError),

    /// The run finished but some steps failed
    #[error("{0} step(s) failed")]
    #[diagnostic(code(drift::failures))]
    Failures(usize),

    /// Report rendering error
    #[error("Output error: {0}")]
    #[diagnostic(code(drift::output))]
    Output(String),
}

impl From<toml::de::Error> for CliError {
    fn from(err: toml::de::Error) -> Self {
        CliError::Config(format!("Failed to parse TOML: {}", err))
    }
}

impl From<serde_json::Error> for CliError {
    fn from(err: serde_json::Error) -> Self {
        CliError::Output(format!("Failed to serialize JSON: {}", err))
    }
}
