//! Database handle and connection provider traits.
//!
//! Drivers implement [`DatabaseHandle`] to expose catalog reads and DDL
//! execution; the engine never talks to a database any other way.

use crate::error::{DriverError, ReconcileResult};
use crate::model::{Column, Index};
use crate::sql::Dialect;

/// Result type for handle operations.
pub type DriverResult<T> = Result<T, DriverError>;

/// An index the schema model cannot represent, such as an expression or
/// partial index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnsupportedIndex {
    /// Table the index belongs to.
    pub table: String,
    /// Index name.
    pub name: String,
    /// Why it cannot be represented.
    pub reason: String,
}

impl UnsupportedIndex {
    /// Create a new unsupported index entry.
    pub fn new(
        table: impl Into<String>,
        name: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            table: table.into(),
            name: name.into(),
            reason: reason.into(),
        }
    }
}

/// A live connection to one database.
#[async_trait::async_trait]
pub trait DatabaseHandle: Send + Sync {
    /// SQL dialect spoken by this database.
    fn dialect(&self) -> Dialect;

    /// List base table names in the reconciled schema.
    async fn list_tables(&self) -> DriverResult<Vec<String>>;

    /// Columns of a table, in ordinal order.
    async fn table_columns(&self, table: &str) -> DriverResult<Vec<Column>>;

    /// Secondary indexes of a table. Primary-key indexes are not included,
    /// nor are indexes reported by [`unsupported_indexes`](Self::unsupported_indexes).
    async fn table_indexes(&self, table: &str) -> DriverResult<Vec<Index>>;

    /// Secondary indexes of a table that the schema model cannot represent.
    async fn unsupported_indexes(&self, _table: &str) -> DriverResult<Vec<UnsupportedIndex>> {
        Ok(Vec::new())
    }

    /// Execute a single DDL statement.
    async fn execute_ddl(&self, statement: &str) -> DriverResult<()>;

    /// Begin a transaction.
    async fn begin_transaction(&self) -> DriverResult<()>;

    /// Commit the open transaction.
    async fn commit(&self) -> DriverResult<()>;

    /// Roll back the open transaction.
    async fn rollback(&self) -> DriverResult<()>;
}

/// Supplies handles to the source and target databases of a run.
#[async_trait::async_trait]
pub trait ConnectionProvider: Send + Sync {
    /// Open a read-capable handle to the source database.
    async fn open_source(&self) -> ReconcileResult<Box<dyn DatabaseHandle>>;

    /// Open a read/write-capable handle to the target database.
    async fn open_target(&self) -> ReconcileResult<Box<dyn DatabaseHandle>>;
}
