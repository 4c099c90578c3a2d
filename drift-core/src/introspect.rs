//! Database introspection into the normalized schema model.
//!
//! The introspector enumerates tables through a [`DatabaseHandle`] and reads
//! each table's columns and indexes. A table whose metadata cannot be read is
//! skipped and reported, never silently dropped.

use tracing::{debug, warn};

use crate::error::{ReconcileError, ReconcileResult, Side};
use crate::handle::{DatabaseHandle, UnsupportedIndex};
use crate::model::{Schema, Table};

/// Result of introspecting a database.
#[derive(Debug, Clone, Default)]
pub struct IntrospectionResult {
    /// The normalized schema.
    pub schema: Schema,
    /// Tables that could not be introspected.
    pub skipped_tables: Vec<SkippedTable>,
    /// Indexes left out of the schema because the model cannot represent them.
    pub skipped_indexes: Vec<UnsupportedIndex>,
    /// Tables left out by configuration.
    pub excluded: Vec<String>,
}

/// A table that was skipped during introspection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedTable {
    /// Table name.
    pub name: String,
    /// Reason it was skipped.
    pub reason: String,
}

/// Configuration for introspection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntrospectionConfig {
    /// Tables to include (empty = all).
    pub include_tables: Vec<String>,
    /// Tables to exclude.
    pub exclude_tables: Vec<String>,
}

impl Default for IntrospectionConfig {
    fn default() -> Self {
        Self {
            include_tables: Vec::new(),
            exclude_tables: vec![
                "_prax_migrations".to_string(),
                "_sqlx_migrations".to_string(),
                "__diesel_schema_migrations".to_string(),
                "schema_migrations".to_string(),
            ],
        }
    }
}

impl IntrospectionConfig {
    /// Create a new introspection config.
    pub fn new() -> Self {
        Self::default()
    }

    /// Include only these tables.
    pub fn include_tables(mut self, tables: Vec<String>) -> Self {
        self.include_tables = tables;
        self
    }

    /// Exclude these tables.
    pub fn exclude_tables(mut self, tables: Vec<String>) -> Self {
        self.exclude_tables = tables;
        self
    }

    /// Exclude one more table on top of the current list.
    pub fn exclude_table(mut self, table: impl Into<String>) -> Self {
        self.exclude_tables.push(table.into());
        self
    }

    /// Check if a table should be included.
    pub fn should_include_table(&self, name: &str) -> bool {
        if self.exclude_tables.iter().any(|t| t == name) {
            return false;
        }
        if self.include_tables.is_empty() {
            return true;
        }
        self.include_tables.iter().any(|t| t == name)
    }
}

/// Builds a [`Schema`] from a live database.
#[derive(Debug, Clone, Default)]
pub struct Introspector {
    config: IntrospectionConfig,
}

impl Introspector {
    /// Create an introspector.
    pub fn new(config: IntrospectionConfig) -> Self {
        Self { config }
    }

    /// Introspect one database.
    ///
    /// Fails only if the table list itself cannot be read.
    pub async fn introspect(
        &self,
        side: Side,
        handle: &dyn DatabaseHandle,
    ) -> ReconcileResult<IntrospectionResult> {
        let names = handle
            .list_tables()
            .await
            .map_err(|e| ReconcileError::introspection(side, e.to_string()))?;

        let mut result = IntrospectionResult::default();

        for name in names {
            if !self.config.should_include_table(&name) {
                debug!(%side, table = %name, "Table excluded by configuration");
                result.excluded.push(name);
                continue;
            }

            match read_table(handle, &name).await {
                Ok((table, unsupported)) => {
                    for index in &unsupported {
                        warn!(
                            %side,
                            table = %name,
                            index = %index.name,
                            reason = %index.reason,
                            "Skipping index"
                        );
                    }
                    result.skipped_indexes.extend(unsupported);
                    if result.schema.add_table(table).is_some() {
                        warn!(
                            %side,
                            table = %name,
                            "Table listed twice; keeping the last definition"
                        );
                    }
                }
                Err(reason) => {
                    warn!(%side, table = %name, %reason, "Skipping table");
                    result.skipped_tables.push(SkippedTable { name, reason });
                }
            }
        }

        debug!(
            %side,
            tables = result.schema.len(),
            skipped = result.skipped_tables.len(),
            "Introspection finished"
        );

        Ok(result)
    }
}

async fn read_table(
    handle: &dyn DatabaseHandle,
    name: &str,
) -> Result<(Table, Vec<UnsupportedIndex>), String> {
    let columns = handle
        .table_columns(name)
        .await
        .map_err(|e| format!("failed to read columns: {}", e))?;
    let indexes = handle
        .table_indexes(name)
        .await
        .map_err(|e| format!("failed to read indexes: {}", e))?;
    let unsupported = handle
        .unsupported_indexes(name)
        .await
        .map_err(|e| format!("failed to read indexes: {}", e))?;

    let mut table = Table::new(name);
    for column in columns {
        table.add_column(column);
    }
    for index in indexes {
        table.add_index(index);
    }
    Ok((table, unsupported))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockDatabase;
    use crate::model::{Column, ColumnType, Index};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_config_should_include_table() {
        let config = IntrospectionConfig::default();
        assert!(config.should_include_table("users"));
        assert!(!config.should_include_table("_prax_migrations"));
    }

    #[test]
    fn test_config_include_specific_tables() {
        let config = IntrospectionConfig::new().include_tables(vec!["users".to_string()]);
        assert!(config.should_include_table("users"));
        assert!(!config.should_include_table("posts"));
    }

    #[test]
    fn test_config_exclude_wins_over_include() {
        let config = IntrospectionConfig::new()
            .include_tables(vec!["users".to_string()])
            .exclude_table("users");
        assert!(!config.should_include_table("users"));
    }

    #[tokio::test]
    async fn test_introspect_builds_schema() {
        let db = MockDatabase::new().with_table(
            Table::new("users")
                .column(Column::new("id", ColumnType::Int).not_null())
                .column(Column::new("name", ColumnType::Text))
                .index(Index::new("idx_name", ["name"])),
        );

        let result = Introspector::default()
            .introspect(Side::Source, &db)
            .await
            .unwrap();

        let users = result.schema.table("users").unwrap();
        assert_eq!(users.column_count(), 2);
        assert!(users.has_index("idx_name"));
        assert!(result.skipped_tables.is_empty());
    }

    #[tokio::test]
    async fn test_introspect_skips_broken_table() {
        let db = MockDatabase::new()
            .with_table(Table::new("users").column(Column::new("id", ColumnType::Int)))
            .with_table(Table::new("orders").column(Column::new("id", ColumnType::Int)))
            .fail_columns_for("orders");

        let result = Introspector::default()
            .introspect(Side::Target, &db)
            .await
            .unwrap();

        assert!(result.schema.contains_table("users"));
        assert!(!result.schema.contains_table("orders"));
        assert_eq!(result.skipped_tables.len(), 1);
        assert_eq!(result.skipped_tables[0].name, "orders");
        assert!(result.skipped_tables[0].reason.contains("columns"));
    }

    #[tokio::test]
    async fn test_introspect_reports_unsupported_indexes() {
        let db = MockDatabase::new()
            .with_table(
                Table::new("users")
                    .column(Column::new("email", ColumnType::Text))
                    .index(Index::new("idx_email", ["email"])),
            )
            .with_unsupported_index("users", "idx_lower_email", "expression index");

        let result = Introspector::default()
            .introspect(Side::Source, &db)
            .await
            .unwrap();

        let users = result.schema.table("users").unwrap();
        assert_eq!(users.index_count(), 1);
        assert!(!users.has_index("idx_lower_email"));
        assert_eq!(
            result.skipped_indexes,
            vec![UnsupportedIndex::new("users", "idx_lower_email", "expression index")]
        );
        assert!(result.skipped_tables.is_empty());
    }

    #[tokio::test]
    async fn test_introspect_records_excluded() {
        let db = MockDatabase::new()
            .with_table(Table::new("users"))
            .with_table(Table::new("schema_migrations"));

        let result = Introspector::default()
            .introspect(Side::Source, &db)
            .await
            .unwrap();

        assert_eq!(result.excluded, vec!["schema_migrations".to_string()]);
        assert!(!result.schema.contains_table("schema_migrations"));
    }

    #[tokio::test]
    async fn test_introspect_fails_when_listing_fails() {
        let db = MockDatabase::new().unreachable();

        let err = Introspector::default()
            .introspect(Side::Source, &db)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            ReconcileError::Introspection {
                side: Side::Source,
                ..
            }
        ));
    }
}
