//! CLI argument definitions using clap.

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::config::CONFIG_FILE_NAME;

/// drift - Declarative schema drift reconciliation
#[derive(Parser, Debug)]
#[command(name = "drift")]
#[command(author = "Pegasus Heavy Industries LLC")]
#[command(version)]
#[command(
    about = "drift - Reconcile a database schema against a reference database",
    long_about = None
)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Bring the target schema in line with the source schema
    Reconcile(ReconcileArgs),

    /// Show how the target schema differs from the source schema
    Diff(DiffArgs),
}

// =============================================================================
// Shared Arguments
// =============================================================================

/// Connection and filtering arguments shared by every command
#[derive(Args, Debug, Clone, Default)]
pub struct ConnectionArgs {
    /// Source-of-truth database URL
    #[arg(short, long, env = "DRIFT_SOURCE_URL")]
    pub source: Option<String>,

    /// Database URL to reconcile
    #[arg(short, long, env = "DRIFT_TARGET_URL")]
    pub target: Option<String>,

    /// Path to the configuration file
    #[arg(short, long, default_value = CONFIG_FILE_NAME)]
    pub config: PathBuf,

    /// Table to ignore (repeatable)
    #[arg(short, long = "exclude", value_name = "TABLE")]
    pub exclude: Vec<String>,

    /// Only consider these tables (repeatable)
    #[arg(short, long = "include", value_name = "TABLE")]
    pub include: Vec<String>,

    /// Output format
    #[arg(short, long, default_value = "text")]
    pub format: OutputFormat,
}

/// Report output formats
#[derive(ValueEnum, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Coloured, human-readable text
    #[default]
    Text,
    /// JSON document on stdout
    Json,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

// =============================================================================
// Reconcile Command
// =============================================================================

/// Arguments for the `reconcile` command
#[derive(Args, Debug, Clone)]
pub struct ReconcileArgs {
    #[command(flatten)]
    pub connection: ConnectionArgs,

    /// Render the DDL without executing it
    #[arg(long)]
    pub dry_run: bool,
}

// =============================================================================
// Diff Command
// =============================================================================

/// Arguments for the `diff` command
#[derive(Args, Debug, Clone)]
pub struct DiffArgs {
    #[command(flatten)]
    pub connection: ConnectionArgs,
}
