//! Run reports.

use std::fmt;

use serde::Serialize;

use crate::diff::{Difference, SchemaDiff};
use crate::engine::RunState;
use crate::error::Side;
use crate::plan::Action;

/// Category of a failed step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The difference no longer matched the source.
    Plan,
    /// The target rejected the DDL.
    Execution,
    /// A name or type could not be rendered safely.
    IdentifierSafety,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Plan => write!(f, "plan"),
            Self::Execution => write!(f, "execution"),
            Self::IdentifierSafety => write!(f, "identifier safety"),
        }
    }
}

/// Outcome of one plan step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    /// The action was committed.
    Applied,
    /// Nothing was changed.
    Skipped {
        /// Why.
        reason: String,
    },
    /// The step failed; the target is unchanged by it.
    Failed {
        /// Failure category.
        kind: FailureKind,
        /// Error message.
        message: String,
    },
}

impl Outcome {
    /// Create a skipped outcome.
    pub fn skipped(reason: impl Into<String>) -> Self {
        Self::Skipped {
            reason: reason.into(),
        }
    }

    /// Create a failed outcome.
    pub fn failed(kind: FailureKind, message: impl Into<String>) -> Self {
        Self::Failed {
            kind,
            message: message.into(),
        }
    }

    /// Check if the step was applied.
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied)
    }

    /// Check if the step was skipped.
    pub fn is_skipped(&self) -> bool {
        matches!(self, Self::Skipped { .. })
    }

    /// Check if the step failed.
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

/// One line of a run report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportEntry {
    /// The difference that produced this entry.
    pub difference: Difference,
    /// The corrective action, if one was planned.
    pub action: Option<Action>,
    /// Rendered DDL, empty when nothing was rendered.
    pub statements: Vec<String>,
    /// What happened.
    pub outcome: Outcome,
}

/// A non-fatal introspection problem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IntrospectionWarning {
    /// Database the warning concerns.
    pub side: Side,
    /// Table, when the problem is specific to one.
    pub table: Option<String>,
    /// Description.
    pub message: String,
}

impl fmt::Display for IntrospectionWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.table {
            Some(table) => write!(f, "{}: table `{}` skipped: {}", self.side, table, self.message),
            None => write!(f, "{}: {}", self.side, self.message),
        }
    }
}

/// Result of a reconciliation run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    /// Entries in plan order.
    pub entries: Vec<ReportEntry>,
    /// Introspection warnings.
    pub warnings: Vec<IntrospectionWarning>,
    /// Terminal state of the run.
    pub state: RunState,
    /// Whether the run was cancelled before all actions ran.
    pub cancelled: bool,
    /// Whether DDL was rendered without being executed.
    pub dry_run: bool,
    /// Total duration in milliseconds.
    pub duration_ms: u64,
}

impl RunReport {
    /// Number of applied actions.
    pub fn applied_count(&self) -> usize {
        self.entries.iter().filter(|e| e.outcome.is_applied()).count()
    }

    /// Number of skipped steps.
    pub fn skipped_count(&self) -> usize {
        self.entries.iter().filter(|e| e.outcome.is_skipped()).count()
    }

    /// Number of failed steps.
    pub fn failed_count(&self) -> usize {
        self.entries.iter().filter(|e| e.outcome.is_failed()).count()
    }

    /// Check if any step failed.
    pub fn has_failures(&self) -> bool {
        self.entries.iter().any(|e| e.outcome.is_failed())
    }

    /// Entries that failed.
    pub fn failures(&self) -> impl Iterator<Item = &ReportEntry> {
        self.entries.iter().filter(|e| e.outcome.is_failed())
    }

    /// Get a summary of the run.
    pub fn summary(&self) -> String {
        let mut parts = Vec::new();

        let applied = self.applied_count();
        if applied > 0 {
            parts.push(format!("{} applied", applied));
        }
        let skipped = self.skipped_count();
        if skipped > 0 {
            parts.push(format!("{} skipped", skipped));
        }
        let failed = self.failed_count();
        if failed > 0 {
            parts.push(format!("{} failed", failed));
        }

        if parts.is_empty() {
            format!("Nothing to apply in {}ms", self.duration_ms)
        } else {
            format!("{} in {}ms", parts.join(", "), self.duration_ms)
        }
    }
}

/// Result of introspecting and diffing without planning or executing.
#[derive(Debug, Clone, Serialize)]
pub struct DiffReport {
    /// Differences in diff order.
    pub differences: SchemaDiff,
    /// Introspection warnings.
    pub warnings: Vec<IntrospectionWarning>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn entry(outcome: Outcome) -> ReportEntry {
        ReportEntry {
            difference: Difference::TableMissingInTarget {
                table: "users".to_string(),
            },
            action: None,
            statements: Vec::new(),
            outcome,
        }
    }

    fn report(entries: Vec<ReportEntry>) -> RunReport {
        RunReport {
            entries,
            warnings: Vec::new(),
            state: RunState::Done,
            cancelled: false,
            dry_run: false,
            duration_ms: 5,
        }
    }

    #[test]
    fn test_counts_and_summary() {
        let report = report(vec![
            entry(Outcome::Applied),
            entry(Outcome::Applied),
            entry(Outcome::skipped("already exists: users")),
            entry(Outcome::failed(FailureKind::Execution, "syntax error")),
        ]);

        assert_eq!(report.applied_count(), 2);
        assert_eq!(report.skipped_count(), 1);
        assert_eq!(report.failed_count(), 1);
        assert!(report.has_failures());
        assert_eq!(report.summary(), "2 applied, 1 skipped, 1 failed in 5ms");
    }

    #[test]
    fn test_empty_summary() {
        let report = report(Vec::new());
        assert!(!report.has_failures());
        assert_eq!(report.summary(), "Nothing to apply in 5ms");
    }

    #[test]
    fn test_report_serializes() {
        let report = report(vec![entry(Outcome::failed(
            FailureKind::IdentifierSafety,
            "unsafe identifier",
        ))]);
        let json = serde_json::to_value(&report).unwrap();

        assert_eq!(json["state"], "done");
        assert_eq!(json["entries"][0]["outcome"]["status"], "failed");
        assert_eq!(json["entries"][0]["outcome"]["kind"], "identifier_safety");
        assert_eq!(json["entries"][0]["difference"]["kind"], "table_missing_in_target");
    }

    #[test]
    fn test_warning_display() {
        let warning = IntrospectionWarning {
            side: Side::Target,
            table: Some("orders".to_string()),
            message: "permission denied".to_string(),
        };
        assert_eq!(
            warning.to_string(),
            "target: table `orders` skipped: permission denied"
        );
    }
}
