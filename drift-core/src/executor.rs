//! Transactional DDL execution.
//!
//! Each action runs in its own transaction. On any failure the transaction is
//! rolled back before the outcome is returned, so a failed action never leaves
//! a partially applied change behind.

use tracing::{debug, warn};

use crate::error::DriverError;
use crate::handle::DatabaseHandle;
use crate::plan::Action;
use crate::report::{FailureKind, Outcome};
use crate::sql::Dialect;

/// Applies actions to a target database.
#[derive(Debug, Clone, Copy)]
pub struct Executor {
    dialect: Dialect,
    dry_run: bool,
}

impl Executor {
    /// Create an executor for the given dialect.
    pub fn new(dialect: Dialect) -> Self {
        Self {
            dialect,
            dry_run: false,
        }
    }

    /// Render statements without executing them.
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Apply one action.
    pub async fn apply(&self, action: &Action, handle: &dyn DatabaseHandle) -> Outcome {
        self.apply_with_statements(action, handle).await.1
    }

    /// Apply one action, also returning the statements that were rendered.
    pub async fn apply_with_statements(
        &self,
        action: &Action,
        handle: &dyn DatabaseHandle,
    ) -> (Vec<String>, Outcome) {
        let statements = match self.dialect.render(action) {
            Ok(statements) => statements,
            Err(e) => {
                let kind = if e.is_identifier_safety() {
                    FailureKind::IdentifierSafety
                } else {
                    FailureKind::Execution
                };
                warn!(%action, error = %e, "Refusing to render action");
                return (Vec::new(), Outcome::failed(kind, e.to_string()));
            }
        };

        if self.dry_run {
            for sql in &statements {
                debug!(sql = %sql, "Dry run");
            }
            return (statements, Outcome::skipped("dry run"));
        }

        let outcome = self.execute(action, &statements, handle).await;
        (statements, outcome)
    }

    async fn execute(
        &self,
        action: &Action,
        statements: &[String],
        handle: &dyn DatabaseHandle,
    ) -> Outcome {
        if let Err(e) = handle.begin_transaction().await {
            warn!(%action, error = %e, "Failed to begin transaction");
            return Outcome::failed(
                FailureKind::Execution,
                format!("failed to begin transaction: {}", e),
            );
        }

        for (position, sql) in statements.iter().enumerate() {
            debug!(sql = %sql, "Executing DDL");
            if let Err(e) = handle.execute_ddl(sql).await {
                let rollback = rollback(handle).await;
                let already_applied = matches!(e, DriverError::AlreadyExists(_))
                    && rollback.is_none()
                    && target_already_has(action, position, handle).await;
                if already_applied {
                    debug!(%action, "Object already exists");
                    return Outcome::skipped(e.to_string());
                }
                warn!(%action, error = %e, "DDL failed");
                return Outcome::failed(
                    FailureKind::Execution,
                    with_rollback(e.to_string(), rollback),
                );
            }
        }

        if let Err(e) = handle.commit().await {
            warn!(%action, error = %e, "Commit failed");
            let rollback = rollback(handle).await;
            return Outcome::failed(
                FailureKind::Execution,
                with_rollback(format!("commit failed: {}", e), rollback),
            );
        }

        debug!(%action, "Applied");
        Outcome::Applied
    }
}

/// Whether an "already exists" error at `position` means the object this
/// action creates is already in place.
///
/// Index names are global per schema, so a name taken by an index on another
/// table is a real failure.
async fn target_already_has(
    action: &Action,
    position: usize,
    handle: &dyn DatabaseHandle,
) -> bool {
    match action {
        Action::CreateTable(_) => position == 0,
        Action::AddColumn { .. } => true,
        Action::CreateIndex { table, index } => match handle.table_indexes(table).await {
            Ok(indexes) => indexes.iter().any(|i| i.name == index.name),
            Err(e) => {
                warn!(error = %e, "Could not check existing indexes");
                false
            }
        },
    }
}

/// Roll back, returning the rollback error message if it failed.
async fn rollback(handle: &dyn DatabaseHandle) -> Option<String> {
    match handle.rollback().await {
        Ok(()) => None,
        Err(e) => {
            warn!(error = %e, "Rollback failed");
            Some(e.to_string())
        }
    }
}

fn with_rollback(message: String, rollback: Option<String>) -> String {
    match rollback {
        Some(r) => format!("{}; rollback failed: {}", message, r),
        None => message,
    }
}
