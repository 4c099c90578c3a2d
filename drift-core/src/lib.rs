//! # drift-core
//!
//! Schema reconciliation engine for drift.
//!
//! This crate provides:
//! - A normalized, dialect-neutral schema model
//! - Introspection of live databases through the [`DatabaseHandle`] trait
//! - Diffing of a source-of-truth schema against a target schema
//! - Translation of differences into an ordered corrective plan
//! - Dialect-aware DDL synthesis with identifier validation
//! - Transactional, per-action execution with a structured run report
//!
//! ## Architecture
//!
//! Source and target are introspected concurrently. The differ compares the
//! two snapshots, the plan builder resolves each difference against the source
//! schema, and the executor applies each action in its own transaction.
//!
//! ```text
//! ┌──────────────┐     ┌────────────────┐     ┌──────────────┐
//! │ Source DB    │────▶│ Introspector   │────▶│              │
//! └──────────────┘     └────────────────┘     │ Schema       │
//! ┌──────────────┐     ┌────────────────┐     │ Differ       │
//! │ Target DB    │────▶│ Introspector   │────▶│              │
//! └──────────────┘     └────────────────┘     └──────────────┘
//!        ▲                                           │
//!        │                                           ▼
//! ┌──────────────┐     ┌────────────────┐     ┌──────────────┐
//! │ Executor     │◀────│ Dialect (DDL)  │◀────│ Plan Builder │
//! └──────────────┘     └────────────────┘     └──────────────┘
//!        │
//!        ▼
//! ┌──────────────┐
//! │ Run Report   │
//! └──────────────┘
//! ```
//!
//! ## Example
//!
//! ```rust,ignore
//! use drift_core::{ReconcileConfig, Reconciler};
//!
//! async fn run(provider: &dyn drift_core::ConnectionProvider) -> drift_core::ReconcileResult<()> {
//!     let reconciler = Reconciler::new(ReconcileConfig::new().dry_run(true));
//!     let report = reconciler.reconcile(provider).await?;
//!
//!     for entry in &report.entries {
//!         println!("{}: {:?}", entry.difference, entry.outcome);
//!     }
//!     println!("{}", report.summary());
//!     Ok(())
//! }
//! ```
//!
//! ## Semantics
//!
//! - The source is authoritative. Objects that exist only in the target are
//!   reported but never dropped.
//! - Column type changes, renames, constraints other than indexes, and data
//!   are out of scope.
//! - An "already exists" error from the target is reported as skipped only
//!   when the object the action creates is already in place.
//! - Expression and partial indexes are left out of the model and reported
//!   as introspection warnings.

pub mod diff;
pub mod engine;
pub mod error;
pub mod executor;
pub mod handle;
pub mod introspect;
pub mod model;
pub mod plan;
pub mod report;
pub mod sql;

#[cfg(test)]
mod mock;

// Re-exports
pub use diff::{Difference, SchemaDiff, SchemaDiffer};
pub use engine::{ReconcileConfig, Reconciler, RunState};
pub use error::{DriverError, ReconcileError, ReconcileResult, Side};
pub use executor::Executor;
pub use handle::{ConnectionProvider, DatabaseHandle, DriverResult, UnsupportedIndex};
pub use introspect::{IntrospectionConfig, IntrospectionResult, Introspector, SkippedTable};
pub use model::{Column, ColumnType, Index, Schema, Table};
pub use plan::{Action, Plan, PlanBuilder, PlanError, PlanStep, Resolution};
pub use report::{
    DiffReport, FailureKind, IntrospectionWarning, Outcome, ReportEntry, RunReport,
};
pub use sql::{DdlError, Dialect};

pub use tokio_util::sync::CancellationToken;
