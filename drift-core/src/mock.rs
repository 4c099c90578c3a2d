//! In-memory database handle for unit tests.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use tokio_util::sync::CancellationToken;

use crate::error::{DriverError, ReconcileError, ReconcileResult, Side};
use crate::handle::{ConnectionProvider, DatabaseHandle, DriverResult, UnsupportedIndex};
use crate::model::{Column, Index, Schema, Table};
use crate::sql::Dialect;

/// A scripted database that records every statement it receives.
#[derive(Debug, Clone, Default)]
pub struct MockDatabase {
    schema: Schema,
    unreachable: bool,
    broken_tables: HashSet<String>,
    fail_on: Vec<String>,
    exists_on: Vec<String>,
    unsupported: Vec<UnsupportedIndex>,
    cancel_on: Option<(String, CancellationToken)>,
    fail_commit: bool,
    log: Arc<Mutex<Vec<String>>>,
}

impl MockDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_table(mut self, table: Table) -> Self {
        self.schema.add_table(table);
        self
    }

    /// Make `list_tables` fail.
    pub fn unreachable(mut self) -> Self {
        self.unreachable = true;
        self
    }

    /// Make column reads fail for one table.
    pub fn fail_columns_for(mut self, table: &str) -> Self {
        self.broken_tables.insert(table.to_string());
        self
    }

    /// Fail any statement containing `fragment`.
    pub fn fail_on(mut self, fragment: &str) -> Self {
        self.fail_on.push(fragment.to_string());
        self
    }

    /// Report "already exists" for any statement containing `fragment`.
    pub fn exists_on(mut self, fragment: &str) -> Self {
        self.exists_on.push(fragment.to_string());
        self
    }

    /// Report an index the model cannot represent.
    pub fn with_unsupported_index(mut self, table: &str, name: &str, reason: &str) -> Self {
        self.unsupported.push(UnsupportedIndex::new(table, name, reason));
        self
    }

    /// Cancel `token` once a statement containing `fragment` has run.
    pub fn cancel_on(mut self, fragment: &str, token: CancellationToken) -> Self {
        self.cancel_on = Some((fragment.to_string(), token));
        self
    }

    pub fn fail_commit(mut self) -> Self {
        self.fail_commit = true;
        self
    }

    /// Everything the handle received, in order.
    pub fn log(&self) -> Vec<String> {
        self.log.lock().map(|l| l.clone()).unwrap_or_default()
    }

    fn record(&self, entry: &str) {
        if let Ok(mut log) = self.log.lock() {
            log.push(entry.to_string());
        }
    }
}

#[async_trait::async_trait]
impl DatabaseHandle for MockDatabase {
    fn dialect(&self) -> Dialect {
        Dialect::Sqlite
    }

    async fn list_tables(&self) -> DriverResult<Vec<String>> {
        if self.unreachable {
            return Err(DriverError::connection("unreachable"));
        }
        Ok(self.schema.table_names().map(String::from).collect())
    }

    async fn table_columns(&self, table: &str) -> DriverResult<Vec<Column>> {
        if self.broken_tables.contains(table) {
            return Err(DriverError::query("permission denied"));
        }
        Ok(self
            .schema
            .table(table)
            .map(|t| t.columns().cloned().collect())
            .unwrap_or_default())
    }

    async fn table_indexes(&self, table: &str) -> DriverResult<Vec<Index>> {
        Ok(self
            .schema
            .table(table)
            .map(|t| t.indexes().cloned().collect())
            .unwrap_or_default())
    }

    async fn unsupported_indexes(&self, table: &str) -> DriverResult<Vec<UnsupportedIndex>> {
        Ok(self
            .unsupported
            .iter()
            .filter(|i| i.table == table)
            .cloned()
            .collect())
    }

    async fn execute_ddl(&self, statement: &str) -> DriverResult<()> {
        self.record(statement);
        if self.exists_on.iter().any(|f| statement.contains(f.as_str())) {
            return Err(DriverError::already_exists(statement));
        }
        if self.fail_on.iter().any(|f| statement.contains(f.as_str())) {
            return Err(DriverError::query(format!("rejected: {}", statement)));
        }
        if let Some((fragment, token)) = &self.cancel_on {
            if statement.contains(fragment.as_str()) {
                token.cancel();
            }
        }
        Ok(())
    }

    async fn begin_transaction(&self) -> DriverResult<()> {
        self.record("BEGIN");
        Ok(())
    }

    async fn commit(&self) -> DriverResult<()> {
        self.record("COMMIT");
        if self.fail_commit {
            return Err(DriverError::query("commit failed"));
        }
        Ok(())
    }

    async fn rollback(&self) -> DriverResult<()> {
        self.record("ROLLBACK");
        Ok(())
    }
}

/// Hands out clones of two mock databases.
#[derive(Debug, Clone, Default)]
pub struct MockProvider {
    pub source: MockDatabase,
    pub target: MockDatabase,
    pub refuse_target: bool,
    /// Never finish opening the target.
    pub stall_target: bool,
}

#[async_trait::async_trait]
impl ConnectionProvider for MockProvider {
    async fn open_source(&self) -> ReconcileResult<Box<dyn DatabaseHandle>> {
        Ok(Box::new(self.source.clone()))
    }

    async fn open_target(&self) -> ReconcileResult<Box<dyn DatabaseHandle>> {
        if self.stall_target {
            std::future::pending::<()>().await;
        }
        if self.refuse_target {
            return Err(ReconcileError::connection(Side::Target, "connection refused"));
        }
        Ok(Box::new(self.target.clone()))
    }
}
