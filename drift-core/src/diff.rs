//! Schema diffing.
//!
//! The source schema is authoritative: the differ reports what the target
//! lacks, plus tables that exist only in the target. Columns and indexes that
//! exist only in the target are not reported.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::model::Schema;

/// A single structural difference between source and target.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Difference {
    /// The table exists in the source but not in the target.
    TableMissingInTarget {
        /// Table name.
        table: String,
    },
    /// The table exists in the target but not in the source.
    TableMissingInSource {
        /// Table name.
        table: String,
    },
    /// A source column is absent from the target table.
    ColumnMissing {
        /// Table name.
        table: String,
        /// Column name.
        column: String,
    },
    /// A source index is absent from the target table.
    IndexMissing {
        /// Table name.
        table: String,
        /// Index name.
        index: String,
    },
}

impl Difference {
    /// The table this difference concerns.
    pub fn table(&self) -> &str {
        match self {
            Self::TableMissingInTarget { table }
            | Self::TableMissingInSource { table }
            | Self::ColumnMissing { table, .. }
            | Self::IndexMissing { table, .. } => table,
        }
    }

    /// Whether this is a table-level difference.
    pub fn is_table_level(&self) -> bool {
        matches!(
            self,
            Self::TableMissingInTarget { .. } | Self::TableMissingInSource { .. }
        )
    }
}

impl fmt::Display for Difference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TableMissingInTarget { table } => {
                write!(f, "table `{}` is missing in target", table)
            }
            Self::TableMissingInSource { table } => {
                write!(f, "table `{}` exists only in target", table)
            }
            Self::ColumnMissing { table, column } => {
                write!(f, "column `{}.{}` is missing in target", table, column)
            }
            Self::IndexMissing { table, index } => {
                write!(f, "index `{}` on `{}` is missing in target", index, table)
            }
        }
    }
}

/// An ordered list of differences.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SchemaDiff {
    differences: Vec<Difference>,
}

impl SchemaDiff {
    /// Check if there are any differences.
    pub fn is_empty(&self) -> bool {
        self.differences.is_empty()
    }

    /// Number of differences.
    pub fn len(&self) -> usize {
        self.differences.len()
    }

    /// Iterate over differences in order.
    pub fn iter(&self) -> std::slice::Iter<'_, Difference> {
        self.differences.iter()
    }

    /// Whether any difference calls for a corrective action.
    pub fn has_corrective_work(&self) -> bool {
        self.differences
            .iter()
            .any(|d| !matches!(d, Difference::TableMissingInSource { .. }))
    }

    /// Get a human-readable summary of the diff.
    pub fn summary(&self) -> String {
        let count = |pred: fn(&Difference) -> bool| {
            self.differences.iter().filter(|d| pred(d)).count()
        };

        let create_tables = count(|d| matches!(d, Difference::TableMissingInTarget { .. }));
        let orphans = count(|d| matches!(d, Difference::TableMissingInSource { .. }));
        let columns = count(|d| matches!(d, Difference::ColumnMissing { .. }));
        let indexes = count(|d| matches!(d, Difference::IndexMissing { .. }));

        let mut parts = Vec::new();
        if create_tables > 0 {
            parts.push(format!("Create {} tables", create_tables));
        }
        if columns > 0 {
            parts.push(format!("Add {} columns", columns));
        }
        if indexes > 0 {
            parts.push(format!("Create {} indexes", indexes));
        }
        if orphans > 0 {
            parts.push(format!("{} tables only in target", orphans));
        }

        if parts.is_empty() {
            "No changes".to_string()
        } else {
            parts.join(", ")
        }
    }
}

impl From<Vec<Difference>> for SchemaDiff {
    fn from(differences: Vec<Difference>) -> Self {
        Self { differences }
    }
}

impl IntoIterator for SchemaDiff {
    type Item = Difference;
    type IntoIter = std::vec::IntoIter<Difference>;

    fn into_iter(self) -> Self::IntoIter {
        self.differences.into_iter()
    }
}

impl<'a> IntoIterator for &'a SchemaDiff {
    type Item = &'a Difference;
    type IntoIter = std::slice::Iter<'a, Difference>;

    fn into_iter(self) -> Self::IntoIter {
        self.differences.iter()
    }
}

/// Computes differences between two schemas.
pub struct SchemaDiffer<'a> {
    source: &'a Schema,
    target: &'a Schema,
}

impl<'a> SchemaDiffer<'a> {
    /// Create a new differ.
    pub fn new(source: &'a Schema, target: &'a Schema) -> Self {
        Self { source, target }
    }

    /// Compute the differences.
    pub fn diff(&self) -> SchemaDiff {
        let names: BTreeSet<&str> = self
            .source
            .table_names()
            .chain(self.target.table_names())
            .collect();

        let mut differences = Vec::new();

        for name in names {
            match (self.source.table(name), self.target.table(name)) {
                (Some(_), None) => differences.push(Difference::TableMissingInTarget {
                    table: name.to_string(),
                }),
                (None, Some(_)) => differences.push(Difference::TableMissingInSource {
                    table: name.to_string(),
                }),
                (Some(source), Some(target)) => {
                    for column in source.columns() {
                        if !target.has_column(&column.name) {
                            differences.push(Difference::ColumnMissing {
                                table: name.to_string(),
                                column: column.name.clone(),
                            });
                        }
                    }
                    for index in source.indexes() {
                        if !target.has_index(&index.name) {
                            differences.push(Difference::IndexMissing {
                                table: name.to_string(),
                                index: index.name.clone(),
                            });
                        }
                    }
                }
                (None, None) => {}
            }
        }

        SchemaDiff::from(differences)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::model::{Column, ColumnType, Index, Table};
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn users(columns: &[&str]) -> Table {
        columns.iter().fold(Table::new("users"), |t, c| {
            t.column(Column::new(*c, ColumnType::Text))
        })
    }

    #[test]
    fn test_missing_table_in_target() {
        let source = Schema::new().with_table(users(&["id", "name"]));
        let target = Schema::new();

        let diff = SchemaDiffer::new(&source, &target).diff();
        assert_eq!(
            diff.iter().cloned().collect::<Vec<_>>(),
            vec![Difference::TableMissingInTarget {
                table: "users".to_string()
            }]
        );
        assert!(diff.has_corrective_work());
    }

    #[test]
    fn test_orphan_table_reported_only() {
        let source = Schema::new().with_table(users(&["id", "name"]));
        let target = Schema::new()
            .with_table(users(&["id", "name"]))
            .with_table(Table::new("orders").column(Column::new("id", ColumnType::Int)));

        let diff = SchemaDiffer::new(&source, &target).diff();
        assert_eq!(
            diff.iter().cloned().collect::<Vec<_>>(),
            vec![Difference::TableMissingInSource {
                table: "orders".to_string()
            }]
        );
        assert!(!diff.has_corrective_work());
    }

    #[test]
    fn test_missing_columns_then_indexes() {
        let source = Schema::new().with_table(
            users(&["id", "name", "email", "age"]).index(Index::new("idx_email", ["email"])),
        );
        let target = Schema::new().with_table(users(&["id", "name"]));

        let diff = SchemaDiffer::new(&source, &target).diff();
        assert_eq!(
            diff.into_iter().collect::<Vec<_>>(),
            vec![
                Difference::ColumnMissing {
                    table: "users".to_string(),
                    column: "email".to_string()
                },
                Difference::ColumnMissing {
                    table: "users".to_string(),
                    column: "age".to_string()
                },
                Difference::IndexMissing {
                    table: "users".to_string(),
                    index: "idx_email".to_string()
                },
            ]
        );
    }

    #[test]
    fn test_target_only_columns_not_reported() {
        let source = Schema::new().with_table(users(&["id"]));
        let target = Schema::new().with_table(users(&["id", "legacy"]));

        assert!(SchemaDiffer::new(&source, &target).diff().is_empty());
    }

    #[test]
    fn test_tables_in_lexicographic_order() {
        let source = Schema::new()
            .with_table(Table::new("zebra"))
            .with_table(Table::new("apple"));
        let target = Schema::new().with_table(Table::new("mango"));

        let tables: Vec<_> = SchemaDiffer::new(&source, &target)
            .diff()
            .iter()
            .map(|d| d.table().to_string())
            .collect();
        assert_eq!(tables, vec!["apple", "mango", "zebra"]);
    }

    #[test]
    fn test_summary() {
        let diff = SchemaDiff::from(vec![
            Difference::TableMissingInTarget {
                table: "a".to_string(),
            },
            Difference::ColumnMissing {
                table: "b".to_string(),
                column: "c".to_string(),
            },
            Difference::TableMissingInSource {
                table: "z".to_string(),
            },
        ]);
        assert_eq!(
            diff.summary(),
            "Create 1 tables, Add 1 columns, 1 tables only in target"
        );
        assert_eq!(SchemaDiff::default().summary(), "No changes");
    }

    #[test]
    fn test_difference_serializes_tagged() {
        let json = serde_json::to_string(&Difference::IndexMissing {
            table: "users".to_string(),
            index: "idx".to_string(),
        })
        .unwrap();
        assert_eq!(json, r#"{"kind":"index_missing","table":"users","index":"idx"}"#);
    }

    pub(crate) fn arb_schema() -> impl Strategy<Value = Schema> {
        let column = ("[a-e]", prop::bool::ANY)
            .prop_map(|(name, nullable)| Column::new(name, ColumnType::Text).nullable(nullable));
        let index = ("idx_[a-c]", prop::collection::vec("[a-e]", 1..3))
            .prop_map(|(name, columns)| Index::new(name, columns));
        let table = (
            "t_[a-f]",
            prop::collection::vec(column, 0..5),
            prop::collection::vec(index, 0..3),
        )
            .prop_map(|(name, columns, indexes)| {
                let mut table = Table::new(name);
                for c in columns {
                    table.add_column(c);
                }
                for i in indexes {
                    table.add_index(i);
                }
                table
            });

        prop::collection::vec(table, 0..6).prop_map(|tables| {
            let mut schema = Schema::new();
            for t in tables {
                schema.add_table(t);
            }
            schema
        })
    }

    proptest! {
        #[test]
        fn test_diff_of_identical_schemas_is_empty(schema in arb_schema()) {
            prop_assert!(SchemaDiffer::new(&schema, &schema).diff().is_empty());
        }

        #[test]
        fn test_table_level_precedes_table_items(source in arb_schema(), target in arb_schema()) {
            let diff = SchemaDiffer::new(&source, &target).diff();
            let differences: Vec<_> = diff.iter().collect();
            for (i, d) in differences.iter().enumerate() {
                if !d.is_table_level() {
                    prop_assert!(!differences[i..]
                        .iter()
                        .any(|later| later.is_table_level() && later.table() == d.table()));
                }
            }
        }
    }
}
