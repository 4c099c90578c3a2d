//! Translation of differences into corrective actions.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::diff::{Difference, SchemaDiff};
use crate::model::{Column, Index, Schema, Table};

/// Errors raised when a difference no longer matches the source schema.
#[derive(Debug, Clone, Error, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PlanError {
    /// The source has no such table.
    #[error("table `{table}` not found in source")]
    TableNotFound {
        /// Table name.
        table: String,
    },

    /// The source table has no such column.
    #[error("column `{table}.{column}` not found in source")]
    ColumnNotFound {
        /// Table name.
        table: String,
        /// Column name.
        column: String,
    },

    /// The source table has no such index.
    #[error("index `{index}` on `{table}` not found in source")]
    IndexNotFound {
        /// Table name.
        table: String,
        /// Index name.
        index: String,
    },
}

/// A single structural change applied to the target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Action {
    /// Create a table with all of its columns and indexes.
    CreateTable(Table),
    /// Add a column to an existing table.
    AddColumn {
        /// Table name.
        table: String,
        /// Column definition.
        column: Column,
    },
    /// Create an index on an existing table.
    CreateIndex {
        /// Table name.
        table: String,
        /// Index definition.
        index: Index,
    },
}

impl Action {
    /// The table this action changes.
    pub fn table(&self) -> &str {
        match self {
            Self::CreateTable(table) => &table.name,
            Self::AddColumn { table, .. } | Self::CreateIndex { table, .. } => table,
        }
    }

    fn rank(&self) -> u8 {
        match self {
            Self::CreateTable(_) => 0,
            Self::AddColumn { .. } => 1,
            Self::CreateIndex { .. } => 2,
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CreateTable(table) => write!(f, "create table `{}`", table.name),
            Self::AddColumn { table, column } => {
                write!(f, "add column `{}.{}`", table, column.name)
            }
            Self::CreateIndex { table, index } => {
                write!(f, "create index `{}` on `{}`", index.name, table)
            }
        }
    }
}

/// How a difference is resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Apply this action.
    Apply(Action),
    /// Nothing to do, for the given reason.
    Skip(String),
    /// The difference cannot be turned into an action.
    Reject(PlanError),
}

/// One difference and its resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanStep {
    /// The difference being resolved.
    pub difference: Difference,
    /// What to do about it.
    pub resolution: Resolution,
}

impl PlanStep {
    /// The action to apply, if any.
    pub fn action(&self) -> Option<&Action> {
        match &self.resolution {
            Resolution::Apply(action) => Some(action),
            _ => None,
        }
    }

    fn rank(&self) -> u8 {
        match (&self.resolution, &self.difference) {
            (Resolution::Apply(action), _) => action.rank(),
            (
                _,
                Difference::TableMissingInTarget { .. } | Difference::TableMissingInSource { .. },
            ) => 0,
            (_, Difference::ColumnMissing { .. }) => 1,
            (_, Difference::IndexMissing { .. }) => 2,
        }
    }
}

/// An ordered corrective plan.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Plan {
    steps: Vec<PlanStep>,
}

impl Plan {
    /// Steps in execution order.
    pub fn steps(&self) -> &[PlanStep] {
        &self.steps
    }

    /// Iterate over the actions to apply, in order.
    pub fn actions(&self) -> impl Iterator<Item = &Action> {
        self.steps.iter().filter_map(PlanStep::action)
    }

    /// Number of steps.
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Whether the plan has no steps.
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Get a human-readable summary of the plan.
    pub fn summary(&self) -> String {
        let mut tables = 0;
        let mut columns = 0;
        let mut indexes = 0;
        for action in self.actions() {
            match action {
                Action::CreateTable(_) => tables += 1,
                Action::AddColumn { .. } => columns += 1,
                Action::CreateIndex { .. } => indexes += 1,
            }
        }
        let skipped = self
            .steps
            .iter()
            .filter(|s| matches!(s.resolution, Resolution::Skip(_)))
            .count();
        let rejected = self
            .steps
            .iter()
            .filter(|s| matches!(s.resolution, Resolution::Reject(_)))
            .count();

        let mut parts = Vec::new();
        if tables > 0 {
            parts.push(format!("Create {} tables", tables));
        }
        if columns > 0 {
            parts.push(format!("Add {} columns", columns));
        }
        if indexes > 0 {
            parts.push(format!("Create {} indexes", indexes));
        }
        if skipped > 0 {
            parts.push(format!("Skip {}", skipped));
        }
        if rejected > 0 {
            parts.push(format!("Reject {}", rejected));
        }

        if parts.is_empty() {
            "No changes".to_string()
        } else {
            parts.join(", ")
        }
    }
}

impl IntoIterator for Plan {
    type Item = PlanStep;
    type IntoIter = std::vec::IntoIter<PlanStep>;

    fn into_iter(self) -> Self::IntoIter {
        self.steps.into_iter()
    }
}

/// Builds a [`Plan`] from a diff, reading definitions from the source schema.
pub struct PlanBuilder<'a> {
    source: &'a Schema,
}

impl<'a> PlanBuilder<'a> {
    /// Create a plan builder over the source schema.
    pub fn new(source: &'a Schema) -> Self {
        Self { source }
    }

    /// Build the plan.
    pub fn build(&self, diff: &SchemaDiff) -> Plan {
        let created: HashSet<&str> = diff
            .iter()
            .filter_map(|d| match d {
                Difference::TableMissingInTarget { table } if self.source.contains_table(table) => {
                    Some(table.as_str())
                }
                _ => None,
            })
            .collect();

        let mut seen = HashSet::new();
        let mut steps: Vec<PlanStep> = diff
            .iter()
            .map(|difference| {
                let resolution = if !seen.insert(difference) {
                    Resolution::Skip("duplicate difference".to_string())
                } else if !difference.is_table_level() && created.contains(difference.table()) {
                    Resolution::Skip("covered by CreateTable".to_string())
                } else {
                    self.resolve(difference)
                };
                PlanStep {
                    difference: difference.clone(),
                    resolution,
                }
            })
            .collect();

        // stable: keeps diff order within each group
        steps.sort_by_key(PlanStep::rank);

        let plan = Plan { steps };
        debug!(steps = plan.len(), summary = %plan.summary(), "Plan built");
        plan
    }

    fn resolve(&self, difference: &Difference) -> Resolution {
        let result = match difference {
            Difference::TableMissingInTarget { table } => {
                self.table(table).map(|t| Action::CreateTable(t.clone()))
            }
            Difference::TableMissingInSource { .. } => {
                return Resolution::Skip(
                    "present only in target; drops are not performed".to_string(),
                );
            }
            Difference::ColumnMissing { table, column } => self.table(table).and_then(|t| {
                t.get_column(column)
                    .map(|c| Action::AddColumn {
                        table: table.clone(),
                        column: c.clone(),
                    })
                    .ok_or_else(|| PlanError::ColumnNotFound {
                        table: table.clone(),
                        column: column.clone(),
                    })
            }),
            Difference::IndexMissing { table, index } => self.table(table).and_then(|t| {
                t.get_index(index)
                    .map(|i| Action::CreateIndex {
                        table: table.clone(),
                        index: i.clone(),
                    })
                    .ok_or_else(|| PlanError::IndexNotFound {
                        table: table.clone(),
                        index: index.clone(),
                    })
            }),
        };

        match result {
            Ok(action) => Resolution::Apply(action),
            Err(err) => Resolution::Reject(err),
        }
    }

    fn table(&self, name: &str) -> Result<&'a Table, PlanError> {
        self.source.table(name).ok_or_else(|| PlanError::TableNotFound {
            table: name.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::SchemaDiffer;
    use crate::diff::tests::arb_schema;
    use crate::model::ColumnType;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn users() -> Table {
        Table::new("users")
            .column(Column::new("id", ColumnType::Int).not_null())
            .column(Column::new("name", ColumnType::Text))
            .column(Column::new("email", ColumnType::Text))
            .index(Index::new("idx_name", ["name"]))
    }

    fn missing_table(table: &str) -> Difference {
        Difference::TableMissingInTarget {
            table: table.to_string(),
        }
    }

    fn missing_column(table: &str, column: &str) -> Difference {
        Difference::ColumnMissing {
            table: table.to_string(),
            column: column.to_string(),
        }
    }

    fn missing_index(table: &str, index: &str) -> Difference {
        Difference::IndexMissing {
            table: table.to_string(),
            index: index.to_string(),
        }
    }

    #[test]
    fn test_create_table_carries_full_definition() {
        let source = Schema::new().with_table(users());
        let plan = PlanBuilder::new(&source).build(&SchemaDiff::from(vec![missing_table("users")]));

        let actions: Vec<_> = plan.actions().cloned().collect();
        assert_eq!(actions, vec![Action::CreateTable(users())]);
    }

    #[test]
    fn test_orphan_table_is_skipped() {
        let source = Schema::new();
        let plan = PlanBuilder::new(&source).build(&SchemaDiff::from(vec![
            Difference::TableMissingInSource {
                table: "orders".to_string(),
            },
        ]));

        assert_eq!(plan.actions().count(), 0);
        assert_eq!(
            plan.steps()[0].resolution,
            Resolution::Skip("present only in target; drops are not performed".to_string())
        );
    }

    #[test]
    fn test_add_column_uses_source_definition() {
        let source = Schema::new().with_table(users());
        let plan =
            PlanBuilder::new(&source).build(&SchemaDiff::from(vec![missing_column("users", "id")]));

        assert_eq!(
            plan.actions().next(),
            Some(&Action::AddColumn {
                table: "users".to_string(),
                column: Column::new("id", ColumnType::Int).not_null(),
            })
        );
    }

    #[test]
    fn test_missing_source_objects_rejected() {
        let source = Schema::new().with_table(users());
        let plan = PlanBuilder::new(&source).build(&SchemaDiff::from(vec![
            missing_table("ghost"),
            missing_column("users", "phone"),
            missing_index("users", "idx_phone"),
        ]));

        let rejections: Vec<_> = plan
            .steps()
            .iter()
            .map(|s| s.resolution.clone())
            .collect();
        assert_eq!(
            rejections,
            vec![
                Resolution::Reject(PlanError::TableNotFound {
                    table: "ghost".to_string()
                }),
                Resolution::Reject(PlanError::ColumnNotFound {
                    table: "users".to_string(),
                    column: "phone".to_string()
                }),
                Resolution::Reject(PlanError::IndexNotFound {
                    table: "users".to_string(),
                    index: "idx_phone".to_string()
                }),
            ]
        );
    }

    #[test]
    fn test_items_of_created_table_are_covered() {
        let source = Schema::new().with_table(users());
        let plan = PlanBuilder::new(&source).build(&SchemaDiff::from(vec![
            missing_column("users", "email"),
            missing_table("users"),
            missing_index("users", "idx_name"),
        ]));

        assert_eq!(plan.actions().count(), 1);
        let covered = plan
            .steps()
            .iter()
            .filter(|s| s.resolution == Resolution::Skip("covered by CreateTable".to_string()))
            .count();
        assert_eq!(covered, 2);
    }

    #[test]
    fn test_duplicates_are_skipped() {
        let source = Schema::new().with_table(users());
        let plan = PlanBuilder::new(&source).build(&SchemaDiff::from(vec![
            missing_column("users", "email"),
            missing_column("users", "email"),
        ]));

        assert_eq!(plan.actions().count(), 1);
        assert_eq!(
            plan.steps()[1].resolution,
            Resolution::Skip("duplicate difference".to_string())
        );
    }

    #[test]
    fn test_grouped_by_kind() {
        let source = Schema::new()
            .with_table(users())
            .with_table(Table::new("posts").column(Column::new("id", ColumnType::Int)));
        let plan = PlanBuilder::new(&source).build(&SchemaDiff::from(vec![
            missing_index("users", "idx_name"),
            missing_column("users", "email"),
            missing_table("posts"),
        ]));

        let kinds: Vec<_> = plan.actions().map(Action::rank).collect();
        assert_eq!(kinds, vec![0, 1, 2]);
        assert_eq!(plan.summary(), "Create 1 tables, Add 1 columns, Create 1 indexes");
    }

    proptest! {
        #[test]
        fn test_create_table_precedes_table_actions(
            source in arb_schema(),
            target in arb_schema(),
            extra in prop::collection::vec(0usize..64, 0..8),
        ) {
            let base: Vec<_> = SchemaDiffer::new(&source, &target).diff().into_iter().collect();
            let mut differences = base.clone();
            if !base.is_empty() {
                for i in extra {
                    differences.insert(0, base[i % base.len()].clone());
                }
            }

            let plan = PlanBuilder::new(&source).build(&SchemaDiff::from(differences));
            let actions: Vec<_> = plan.actions().collect();

            for (i, action) in actions.iter().enumerate() {
                if let Action::CreateTable(table) = action {
                    prop_assert!(!actions[..i].iter().any(|a| a.table() == table.name));
                    prop_assert!(!actions[i + 1..].iter().any(|a| a.table() == table.name));
                }
            }

            let unique: HashSet<_> = actions.iter().map(|a| a.to_string()).collect();
            prop_assert_eq!(unique.len(), actions.len());
        }
    }
}
