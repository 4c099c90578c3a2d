//! Reconciliation orchestrator.
//!
//! A run moves through `Idle → Introspecting → Diffing → Planning → Executing
//! → Done`. The only other terminal state is `Aborted`, reachable from
//! `Introspecting` when neither database can be enumerated.

use std::fmt;
use std::time::Instant;

use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::diff::{SchemaDiff, SchemaDiffer};
use crate::error::{ReconcileError, ReconcileResult, Side};
use crate::executor::Executor;
use crate::handle::{ConnectionProvider, DatabaseHandle};
use crate::introspect::{IntrospectionConfig, IntrospectionResult, Introspector};
use crate::model::Schema;
use crate::plan::{PlanBuilder, Resolution};
use crate::report::{
    DiffReport, FailureKind, IntrospectionWarning, Outcome, ReportEntry, RunReport,
};

/// Configuration for a reconciliation run.
#[derive(Debug, Clone, Default)]
pub struct ReconcileConfig {
    /// Introspection settings, applied to both sides.
    pub introspection: IntrospectionConfig,
    /// Render DDL without executing it.
    pub dry_run: bool,
}

impl ReconcileConfig {
    /// Create a new configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the introspection configuration.
    pub fn introspection(mut self, config: IntrospectionConfig) -> Self {
        self.introspection = config;
        self
    }

    /// Enable dry-run mode.
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }
}

/// Stage of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    /// Not started.
    Idle,
    /// Reading both schemas.
    Introspecting,
    /// Comparing schemas.
    Diffing,
    /// Resolving differences into actions.
    Planning,
    /// Applying actions to the target.
    Executing,
    /// Finished; a report was produced.
    Done,
    /// Stopped before diffing.
    Aborted,
    /// Cancelled before any action was planned.
    Cancelled,
}

impl RunState {
    /// Whether a run may move from `self` to `next`.
    pub fn can_transition_to(self, next: RunState) -> bool {
        matches!(
            (self, next),
            (Self::Idle, Self::Introspecting)
                | (Self::Idle, Self::Cancelled)
                | (Self::Introspecting, Self::Diffing)
                | (Self::Introspecting, Self::Aborted)
                | (Self::Introspecting, Self::Cancelled)
                | (Self::Diffing, Self::Planning)
                | (Self::Planning, Self::Executing)
                | (Self::Executing, Self::Done)
        )
    }

    /// Whether this state ends a run.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Aborted | Self::Cancelled)
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Introspecting => "introspecting",
            Self::Diffing => "diffing",
            Self::Planning => "planning",
            Self::Executing => "executing",
            Self::Done => "done",
            Self::Aborted => "aborted",
            Self::Cancelled => "cancelled",
        };
        f.write_str(name)
    }
}

struct Run {
    state: RunState,
}

impl Run {
    fn new() -> Self {
        Self {
            state: RunState::Idle,
        }
    }

    fn advance(&mut self, next: RunState) {
        debug_assert!(
            self.state.can_transition_to(next),
            "invalid transition {} -> {}",
            self.state,
            next
        );
        info!(from = %self.state, to = %next, "Reconciliation stage");
        self.state = next;
    }
}

struct Introspected {
    source: Schema,
    target: Schema,
    target_available: bool,
    warnings: Vec<IntrospectionWarning>,
}

/// Drives a reconciliation run from introspection to the report.
#[derive(Debug, Clone, Default)]
pub struct Reconciler {
    config: ReconcileConfig,
}

impl Reconciler {
    /// Create a reconciler.
    pub fn new(config: ReconcileConfig) -> Self {
        Self { config }
    }

    /// Get the configuration.
    pub fn config(&self) -> &ReconcileConfig {
        &self.config
    }

    /// Run once without a cancellation signal.
    pub async fn reconcile(&self, provider: &dyn ConnectionProvider) -> ReconcileResult<RunReport> {
        self.reconcile_with_cancellation(provider, CancellationToken::new())
            .await
    }

    /// Run once.
    ///
    /// Cancellation while connecting or introspecting ends the run with an
    /// empty, cancelled report. Once actions are being applied it is honored
    /// between actions.
    pub async fn reconcile_with_cancellation(
        &self,
        provider: &dyn ConnectionProvider,
        cancel: CancellationToken,
    ) -> ReconcileResult<RunReport> {
        let started = Instant::now();
        let mut run = Run::new();

        let prepared = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            prepared = self.connect_and_introspect(&mut run, provider) => Some(prepared),
        };
        let Some(prepared) = prepared else {
            info!("Run cancelled before any action was planned");
            run.advance(RunState::Cancelled);
            return Ok(RunReport {
                entries: Vec::new(),
                warnings: Vec::new(),
                state: run.state,
                cancelled: true,
                dry_run: self.config.dry_run,
                duration_ms: elapsed_ms(started),
            });
        };
        let (
            target,
            Introspected {
                source: source_schema,
                target: target_schema,
                target_available,
                warnings,
            },
        ) = prepared?;

        run.advance(RunState::Diffing);
        let diff = SchemaDiffer::new(&source_schema, &target_schema).diff();
        info!(differences = diff.len(), summary = %diff.summary(), "Diff computed");

        run.advance(RunState::Planning);
        let plan = PlanBuilder::new(&source_schema).build(&diff);

        run.advance(RunState::Executing);
        let executor = Executor::new(target.dialect()).dry_run(self.config.dry_run);
        let mut entries = Vec::with_capacity(plan.len());
        let mut cancelled = false;

        for step in plan {
            let (action, statements, outcome) = match step.resolution {
                Resolution::Skip(reason) => (None, Vec::new(), Outcome::skipped(reason)),
                Resolution::Reject(err) => {
                    warn!(difference = %step.difference, error = %err, "Plan step rejected");
                    (
                        None,
                        Vec::new(),
                        Outcome::failed(FailureKind::Plan, err.to_string()),
                    )
                }
                Resolution::Apply(action) => {
                    if !target_available {
                        let outcome = Outcome::skipped("target schema could not be introspected");
                        (Some(action), Vec::new(), outcome)
                    } else if cancelled || cancel.is_cancelled() {
                        if !cancelled {
                            info!("Run cancelled; remaining actions are skipped");
                        }
                        cancelled = true;
                        (Some(action), Vec::new(), Outcome::skipped("run cancelled"))
                    } else {
                        let (statements, outcome) =
                            executor.apply_with_statements(&action, target.as_ref()).await;
                        (Some(action), statements, outcome)
                    }
                }
            };

            entries.push(ReportEntry {
                difference: step.difference,
                action,
                statements,
                outcome,
            });
        }

        run.advance(RunState::Done);

        let report = RunReport {
            entries,
            warnings,
            state: run.state,
            cancelled,
            dry_run: self.config.dry_run,
            duration_ms: elapsed_ms(started),
        };
        info!(summary = %report.summary(), "Reconciliation finished");

        Ok(report)
    }

    /// Introspect and diff both databases without planning or executing.
    pub async fn diff(&self, provider: &dyn ConnectionProvider) -> ReconcileResult<DiffReport> {
        let mut run = Run::new();
        let (_, introspected) = self.connect_and_introspect(&mut run, provider).await?;

        run.advance(RunState::Diffing);
        let differences: SchemaDiff =
            SchemaDiffer::new(&introspected.source, &introspected.target).diff();
        info!(summary = %differences.summary(), "Diff computed");

        Ok(DiffReport {
            differences,
            warnings: introspected.warnings,
        })
    }

    /// Open both databases and read their schemas. The target handle is
    /// returned for execution.
    async fn connect_and_introspect(
        &self,
        run: &mut Run,
        provider: &dyn ConnectionProvider,
    ) -> ReconcileResult<(Box<dyn DatabaseHandle>, Introspected)> {
        let source = provider.open_source().await?;
        let target = provider.open_target().await?;
        let introspected = self
            .introspect(run, source.as_ref(), target.as_ref())
            .await?;
        Ok((target, introspected))
    }

    async fn introspect(
        &self,
        run: &mut Run,
        source: &dyn DatabaseHandle,
        target: &dyn DatabaseHandle,
    ) -> ReconcileResult<Introspected> {
        run.advance(RunState::Introspecting);

        let introspector = Introspector::new(self.config.introspection.clone());
        let (source_result, target_result) = tokio::join!(
            introspector.introspect(Side::Source, source),
            introspector.introspect(Side::Target, target),
        );

        if let (Err(source_err), Err(target_err)) = (&source_result, &target_result) {
            run.advance(RunState::Aborted);
            return Err(ReconcileError::aborted(format!(
                "neither database could be introspected: {}; {}",
                source_err, target_err
            )));
        }

        let mut warnings = Vec::new();
        let source = collect(Side::Source, source_result, &mut warnings);
        let target = collect(Side::Target, target_result, &mut warnings);
        let target_available = target.is_some();

        Ok(Introspected {
            source: source.unwrap_or_default(),
            target: target.unwrap_or_default(),
            target_available,
            warnings,
        })
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}

/// Fold one side's introspection result into a schema and warnings.
fn collect(
    side: Side,
    result: ReconcileResult<IntrospectionResult>,
    warnings: &mut Vec<IntrospectionWarning>,
) -> Option<Schema> {
    match result {
        Ok(result) => {
            warnings.extend(result.skipped_tables.into_iter().map(|t| IntrospectionWarning {
                side,
                table: Some(t.name),
                message: t.reason,
            }));
            warnings.extend(result.skipped_indexes.into_iter().map(|i| IntrospectionWarning {
                side,
                table: Some(i.table),
                message: format!("index `{}` skipped: {}", i.name, i.reason),
            }));
            Some(result.schema)
        }
        Err(e) => {
            warn!(%side, error = %e, "Treating database as empty");
            warnings.push(IntrospectionWarning {
                side,
                table: None,
                message: format!("{}; treated as empty", e),
            });
            None
        }
    }
}
