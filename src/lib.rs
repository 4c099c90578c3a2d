//! # drift
//!
//! Declarative schema drift reconciliation for PostgreSQL and SQLite.
//!
//! drift compares a target database with a source-of-truth database and
//! applies the DDL needed to bring the target in line:
//! - Missing tables are created with all of their columns and indexes
//! - Missing columns are added
//! - Missing indexes are created
//! - Tables that exist only in the target are reported, never dropped
//!
//! Every corrective action runs in its own transaction, and every difference
//! ends up in the [`RunReport`] as applied, skipped or failed.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use drift::{ReconcileConfig, reconcile_urls};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), drift::ReconcileError> {
//!     let report = reconcile_urls(
//!         "postgresql://localhost/reference",
//!         "sqlite://./replica.db",
//!         ReconcileConfig::new(),
//!     )
//!     .await?;
//!
//!     for entry in &report.entries {
//!         println!("{}: {:?}", entry.difference, entry.outcome);
//!     }
//!     Ok(())
//! }
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub use drift_core::*;

/// PostgreSQL driver.
#[cfg(feature = "postgres")]
pub mod postgres {
    pub use drift_postgres::*;
}

/// SQLite driver.
#[cfg(feature = "sqlite")]
pub mod sqlite {
    pub use drift_sqlite::*;
}

/// Database backends recognized in URLs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    /// `postgres://` or `postgresql://`.
    Postgres,
    /// `sqlite:`, `sqlite://` or `sqlite::memory:`.
    Sqlite,
}

impl Backend {
    /// Detect the backend from a URL scheme.
    pub fn from_url(url: &str) -> Option<Self> {
        if url.starts_with("postgres://") || url.starts_with("postgresql://") {
            Some(Self::Postgres)
        } else if url.starts_with("sqlite:") {
            Some(Self::Sqlite)
        } else {
            None
        }
    }
}

/// Open a database handle, choosing the driver from the URL scheme.
pub async fn connect(url: &str, side: Side) -> ReconcileResult<Box<dyn DatabaseHandle>> {
    tracing::debug!(%side, "Opening database");
    match Backend::from_url(url) {
        #[cfg(feature = "postgres")]
        Some(Backend::Postgres) => {
            let db = drift_postgres::PgDatabase::connect_url(url)
                .await
                .map_err(|e| ReconcileError::connection(side, e.to_string()))?;
            Ok(Box::new(db))
        }
        #[cfg(feature = "sqlite")]
        Some(Backend::Sqlite) => {
            let db = drift_sqlite::SqliteDatabase::open_url(url)
                .await
                .map_err(|e| ReconcileError::connection(side, e.to_string()))?;
            Ok(Box::new(db))
        }
        #[allow(unreachable_patterns)]
        Some(backend) => Err(ReconcileError::connection(
            side,
            format!("support for {:?} is not enabled in this build", backend),
        )),
        None => Err(ReconcileError::connection(
            side,
            "unsupported database URL; expected postgres://, postgresql:// or sqlite:",
        )),
    }
}

/// A [`ConnectionProvider`] over two database URLs of any supported backend.
///
/// Source and target may use different backends.
#[derive(Debug, Clone)]
pub struct DatabaseUrlProvider {
    source: String,
    target: String,
}

impl DatabaseUrlProvider {
    /// Create a provider from two URLs.
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
        }
    }

    /// The source URL.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// The target URL.
    pub fn target(&self) -> &str {
        &self.target
    }
}

#[async_trait::async_trait]
impl ConnectionProvider for DatabaseUrlProvider {
    async fn open_source(&self) -> ReconcileResult<Box<dyn DatabaseHandle>> {
        connect(&self.source, Side::Source).await
    }

    async fn open_target(&self) -> ReconcileResult<Box<dyn DatabaseHandle>> {
        connect(&self.target, Side::Target).await
    }
}

/// Reconcile the target URL against the source URL in one call.
pub async fn reconcile_urls(
    source: &str,
    target: &str,
    config: ReconcileConfig,
) -> ReconcileResult<RunReport> {
    Reconciler::new(config)
        .reconcile(&DatabaseUrlProvider::new(source, target))
        .await
}

/// Like [`reconcile_urls`], stopping once `cancel` fires. An in-flight action
/// still commits or rolls back.
pub async fn reconcile_urls_with_cancellation(
    source: &str,
    target: &str,
    config: ReconcileConfig,
    cancel: CancellationToken,
) -> ReconcileResult<RunReport> {
    Reconciler::new(config)
        .reconcile_with_cancellation(&DatabaseUrlProvider::new(source, target), cancel)
        .await
}
