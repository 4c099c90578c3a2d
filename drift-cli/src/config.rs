//! CLI configuration handling.
//!
//! Settings come from three places, highest priority first: command-line
//! flags, the `DRIFT_SOURCE_URL`/`DRIFT_TARGET_URL` environment variables
//! (handled by clap), and `drift.toml`.

use serde::{Deserialize, Serialize};
use std::path::Path;

use drift::{IntrospectionConfig, ReconcileConfig};

use crate::cli::ConnectionArgs;
use crate::error::{CliError, CliResult};

/// Default config file name (lives in the working directory)
pub const CONFIG_FILE_NAME: &str = "drift.toml";

/// drift CLI configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Source-of-truth database
    pub source: DatabaseConfig,

    /// Database to reconcile
    pub target: DatabaseConfig,

    /// Reconciliation settings
    pub reconcile: ReconcileSection,
}

/// One database endpoint
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DatabaseConfig {
    /// Connection URL
    pub url: Option<String>,
}

/// The `[reconcile]` table
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReconcileSection {
    /// Render DDL without executing it
    pub dry_run: bool,

    /// Tables to ignore, on top of the migration bookkeeping tables
    pub exclude_tables: Vec<String>,

    /// Only consider these tables (empty means all)
    pub include_tables: Vec<String>,
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> CliResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parse configuration from TOML text
    pub fn parse(content: &str) -> CliResult<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Load `path` if it exists.
    ///
    /// A missing file is only an error when it was asked for explicitly.
    pub fn load_or_default(path: &Path) -> CliResult<Self> {
        if path.exists() {
            Self::load(path)
        } else if path == Path::new(CONFIG_FILE_NAME) {
            Ok(Self::default())
        } else {
            Err(CliError::Config(format!(
                "configuration file not found: {}",
                path.display()
            )))
        }
    }
}

/// Everything a command needs to start a run.
#[derive(Debug, Clone)]
pub struct RunSettings {
    /// Source URL
    pub source: String,
    /// Target URL
    pub target: String,
    /// Engine configuration
    pub reconcile: ReconcileConfig,
}

impl RunSettings {
    /// Merge command-line arguments over the configuration file.
    pub fn resolve(args: &ConnectionArgs, dry_run: bool, config: &Config) -> CliResult<Self> {
        let source = args
            .source
            .clone()
            .or_else(|| config.source.url.clone())
            .ok_or_else(|| missing_url("source", "--source", "DRIFT_SOURCE_URL"))?;
        let target = args
            .target
            .clone()
            .or_else(|| config.target.url.clone())
            .ok_or_else(|| missing_url("target", "--target", "DRIFT_TARGET_URL"))?;

        let include = if args.include.is_empty() {
            config.reconcile.include_tables.clone()
        } else {
            args.include.clone()
        };

        let introspection = config
            .reconcile
            .exclude_tables
            .iter()
            .chain(&args.exclude)
            .fold(IntrospectionConfig::new().include_tables(include), |c, t| {
                c.exclude_table(t.clone())
            });

        Ok(Self {
            source,
            target,
            reconcile: ReconcileConfig::new()
                .introspection(introspection)
                .dry_run(dry_run || config.reconcile.dry_run),
        })
    }
}

fn missing_url(side: &str, flag: &str, env: &str) -> CliError {
    CliError::Config(format!(
        "no {} database URL; pass {}, set {} or add [{}] url to {}",
        side, flag, env, side, CONFIG_FILE_NAME
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::path::PathBuf;

    fn args() -> ConnectionArgs {
        ConnectionArgs {
            config: PathBuf::from(CONFIG_FILE_NAME),
            ..Default::default()
        }
    }

    #[test]
    fn test_parse_full_config() {
        let config = Config::parse(
            r#"
            [source]
            url = "postgres://localhost/reference"

            [target]
            url = "sqlite://./replica.db"

            [reconcile]
            dry_run = true
            exclude_tables = ["audit_log"]
            "#,
        )
        .unwrap();

        assert_eq!(
            config.source.url.as_deref(),
            Some("postgres://localhost/reference")
        );
        assert_eq!(config.target.url.as_deref(), Some("sqlite://./replica.db"));
        assert!(config.reconcile.dry_run);
        assert_eq!(config.reconcile.exclude_tables, vec!["audit_log"]);
        assert!(config.reconcile.include_tables.is_empty());
    }

    #[test]
    fn test_parse_rejects_unknown_keys() {
        let err = Config::parse("[reconcile]\nprune = true\n").unwrap_err();
        assert!(matches!(err, CliError::Config(_)));
    }

    #[test]
    fn test_missing_default_file_is_empty_config() {
        let dir = tempfile::tempdir().unwrap();
        let explicit = dir.path().join("custom.toml");

        assert!(Config::load_or_default(Path::new(CONFIG_FILE_NAME)).is_ok());
        assert!(Config::load_or_default(&explicit).is_err());

        std::fs::write(&explicit, "[source]\nurl = \"sqlite::memory:\"\n").unwrap();
        let config = Config::load_or_default(&explicit).unwrap();
        assert_eq!(config.source.url.as_deref(), Some("sqlite::memory:"));
    }

    #[test]
    fn test_flags_override_file() {
        let mut config = Config::default();
        config.source.url = Some("sqlite://file-source.db".to_string());
        config.target.url = Some("sqlite://file-target.db".to_string());
        config.reconcile.include_tables = vec!["users".to_string()];

        let mut args = args();
        args.target = Some("sqlite://flag-target.db".to_string());
        args.include = vec!["posts".to_string()];

        let settings = RunSettings::resolve(&args, false, &config).unwrap();
        assert_eq!(settings.source, "sqlite://file-source.db");
        assert_eq!(settings.target, "sqlite://flag-target.db");
        assert_eq!(
            settings.reconcile.introspection.include_tables,
            vec!["posts".to_string()]
        );
    }

    #[test]
    fn test_excludes_extend_defaults() {
        let mut config = Config::default();
        config.reconcile.exclude_tables = vec!["audit_log".to_string()];

        let mut args = args();
        args.source = Some("sqlite::memory:".to_string());
        args.target = Some("sqlite::memory:".to_string());
        args.exclude = vec!["sessions".to_string()];

        let settings = RunSettings::resolve(&args, false, &config).unwrap();
        let introspection = &settings.reconcile.introspection;
        assert!(!introspection.should_include_table("schema_migrations"));
        assert!(!introspection.should_include_table("audit_log"));
        assert!(!introspection.should_include_table("sessions"));
        assert!(introspection.should_include_table("users"));
    }

    #[test]
    fn test_dry_run_from_either_source() {
        let mut args = args();
        args.source = Some("sqlite::memory:".to_string());
        args.target = Some("sqlite::memory:".to_string());

        let mut config = Config::default();
        assert!(!RunSettings::resolve(&args, false, &config).unwrap().reconcile.dry_run);
        assert!(RunSettings::resolve(&args, true, &config).unwrap().reconcile.dry_run);

        config.reconcile.dry_run = true;
        assert!(RunSettings::resolve(&args, false, &config).unwrap().reconcile.dry_run);
    }

    #[test]
    fn test_missing_url_names_all_sources() {
        let err = RunSettings::resolve(&args(), false, &Config::default()).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("--source"));
        assert!(message.contains("DRIFT_SOURCE_URL"));
    }
}
