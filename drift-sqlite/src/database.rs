//! SQLite database handle.

use drift_core::{
    Column, ColumnType, ConnectionProvider, DatabaseHandle, Dialect, DriverResult, Index,
    ReconcileError, ReconcileResult, Side, UnsupportedIndex,
};
use tokio_rusqlite::Connection;
use tracing::debug;

use crate::config::{DatabasePath, SqliteConfig};
use crate::error::{SqliteError, SqliteResult};

/// Catalog queries. Table names are bound as parameters to the
/// table-valued pragma functions.
pub mod queries {
    /// User tables.
    pub const TABLES: &str = "SELECT name FROM sqlite_master \
         WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name";

    /// Columns of a table, in ordinal order.
    pub const COLUMNS: &str =
        "SELECT name, type, \"notnull\" FROM pragma_table_info(?1) ORDER BY cid";

    /// Indexes created with `CREATE INDEX`.
    pub const INDEXES: &str = "SELECT name, \"unique\", partial FROM pragma_index_list(?1) \
         WHERE origin = 'c' ORDER BY name";

    /// Key columns of an index. Expression columns have a NULL name.
    pub const INDEX_COLUMNS: &str = "SELECT name FROM pragma_index_info(?1) ORDER BY seqno";
}

/// A connection to one SQLite database.
#[derive(Clone)]
pub struct SqliteDatabase {
    conn: Connection,
    path: DatabasePath,
}

impl SqliteDatabase {
    /// Open a database using the given configuration.
    pub async fn open(config: &SqliteConfig) -> SqliteResult<Self> {
        debug!(path = %config.path.display(), "Opening SQLite database");

        let conn = match &config.path {
            DatabasePath::Memory => Connection::open_in_memory().await,
            DatabasePath::File(path) => Connection::open(path).await,
        }
        .map_err(|e| {
            let cause = SqliteError::from(e);
            SqliteError::connection(format!("failed to open database: {}", cause))
        })?;

        let init_sql = config.init_sql();
        let busy_timeout = config.busy_timeout_duration();
        conn.call(move |conn| {
            conn.execute_batch(&init_sql)?;
            if let Some(timeout) = busy_timeout {
                conn.busy_timeout(timeout)?;
            }
            Ok(())
        })
        .await?;

        Ok(Self {
            conn,
            path: config.path.clone(),
        })
    }

    /// Open a fresh in-memory database.
    pub async fn memory() -> SqliteResult<Self> {
        Self::open(&SqliteConfig::memory()).await
    }

    /// Open a database from a URL.
    pub async fn open_url(url: &str) -> SqliteResult<Self> {
        Self::open(&SqliteConfig::from_url(url)?).await
    }

    /// Location of this database.
    pub fn path(&self) -> &DatabasePath {
        &self.path
    }

    /// Run arbitrary SQL outside of reconciliation, e.g. to seed a database.
    pub async fn execute_batch(&self, sql: &str) -> SqliteResult<()> {
        let sql = sql.to_string();
        self.conn
            .call(move |conn| {
                conn.execute_batch(&sql)?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    /// Read a table's explicit indexes, splitting off those that cover
    /// expressions or rows matching a predicate.
    async fn read_indexes(
        &self,
        table: &str,
    ) -> DriverResult<(Vec<Index>, Vec<UnsupportedIndex>)> {
        let table = table.to_string();
        let read = self
            .conn
            .call(move |conn| {
                let listed = {
                    let mut stmt = conn.prepare(queries::INDEXES)?;
                    let rows = stmt.query_map([&table], |row| {
                        Ok((
                            row.get::<_, String>(0)?,
                            row.get::<_, bool>(1)?,
                            row.get::<_, bool>(2)?,
                        ))
                    })?;
                    rows.collect::<Result<Vec<_>, _>>()?
                };

                let mut indexes = Vec::with_capacity(listed.len());
                let mut unsupported = Vec::new();
                let mut stmt = conn.prepare(queries::INDEX_COLUMNS)?;
                for (name, unique, partial) in listed {
                    let columns = stmt
                        .query_map([&name], |row| row.get::<_, Option<String>>(0))?
                        .collect::<Result<Vec<_>, _>>()?;

                    let expression = columns.iter().any(Option::is_none);
                    if partial || expression {
                        let reason = if partial { "partial index" } else { "expression index" };
                        unsupported.push(UnsupportedIndex::new(&table, name, reason));
                        continue;
                    }
                    let index = Index::new(name, columns.into_iter().flatten());
                    indexes.push(if unique { index.unique() } else { index });
                }
                Ok((indexes, unsupported))
            })
            .await
            .map_err(SqliteError::from)?;
        Ok(read)
    }

    async fn batch(&self, sql: &'static str) -> DriverResult<()> {
        self.conn
            .call(move |conn| {
                conn.execute_batch(sql)?;
                Ok(())
            })
            .await
            .map_err(|e| SqliteError::from(e).into())
    }
}

#[async_trait::async_trait]
impl DatabaseHandle for SqliteDatabase {
    fn dialect(&self) -> Dialect {
        Dialect::Sqlite
    }

    async fn list_tables(&self) -> DriverResult<Vec<String>> {
        let tables = self
            .conn
            .call(|conn| {
                let mut stmt = conn.prepare(queries::TABLES)?;
                let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
                Ok(rows.collect::<Result<Vec<_>, _>>()?)
            })
            .await
            .map_err(SqliteError::from)?;
        Ok(tables)
    }

    async fn table_columns(&self, table: &str) -> DriverResult<Vec<Column>> {
        let table = table.to_string();
        let columns = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(queries::COLUMNS)?;
                let rows = stmt.query_map([&table], |row| {
                    let name: String = row.get(0)?;
                    let declared: String = row.get(1)?;
                    let not_null: bool = row.get(2)?;
                    Ok(Column::new(name, ColumnType::from_sqlite(&declared)).nullable(!not_null))
                })?;
                Ok(rows.collect::<Result<Vec<_>, _>>()?)
            })
            .await
            .map_err(SqliteError::from)?;
        Ok(columns)
    }

    async fn table_indexes(&self, table: &str) -> DriverResult<Vec<Index>> {
        let (indexes, _) = self.read_indexes(table).await?;
        Ok(indexes)
    }

    async fn unsupported_indexes(&self, table: &str) -> DriverResult<Vec<UnsupportedIndex>> {
        let (_, unsupported) = self.read_indexes(table).await?;
        Ok(unsupported)
    }

    async fn execute_ddl(&self, statement: &str) -> DriverResult<()> {
        debug!(sql = %statement, "Executing DDL");
        let statement = statement.to_string();
        self.conn
            .call(move |conn| {
                conn.execute_batch(&statement)?;
                Ok(())
            })
            .await
            .map_err(|e| SqliteError::from(e).into())
    }

    async fn begin_transaction(&self) -> DriverResult<()> {
        self.batch("BEGIN").await
    }

    async fn commit(&self) -> DriverResult<()> {
        self.batch("COMMIT").await
    }

    async fn rollback(&self) -> DriverResult<()> {
        self.batch("ROLLBACK").await
    }
}

#[derive(Clone)]
enum Endpoint {
    Config(SqliteConfig),
    Open(SqliteDatabase),
}

impl Endpoint {
    async fn open(&self, side: Side) -> ReconcileResult<Box<dyn DatabaseHandle>> {
        match self {
            Self::Config(config) => {
                let db = SqliteDatabase::open(config)
                    .await
                    .map_err(|e| ReconcileError::connection(side, e.to_string()))?;
                Ok(Box::new(db))
            }
            Self::Open(db) => Ok(Box::new(db.clone())),
        }
    }
}

/// Opens source and target SQLite databases.
///
/// An in-memory database lives only as long as its connection, so a provider
/// can also wrap databases that are already open.
#[derive(Clone)]
pub struct SqliteProvider {
    source: Endpoint,
    target: Endpoint,
}

impl SqliteProvider {
    /// Create a provider from two configurations.
    pub fn new(source: SqliteConfig, target: SqliteConfig) -> Self {
        Self {
            source: Endpoint::Config(source),
            target: Endpoint::Config(target),
        }
    }

    /// Create a provider from two database URLs.
    pub fn from_urls(source: &str, target: &str) -> SqliteResult<Self> {
        Ok(Self::new(
            SqliteConfig::from_url(source)?,
            SqliteConfig::from_url(target)?,
        ))
    }

    /// Create a provider over two open databases.
    pub fn from_databases(source: SqliteDatabase, target: SqliteDatabase) -> Self {
        Self {
            source: Endpoint::Open(source),
            target: Endpoint::Open(target),
        }
    }
}

#[async_trait::async_trait]
impl ConnectionProvider for SqliteProvider {
    async fn open_source(&self) -> ReconcileResult<Box<dyn DatabaseHandle>> {
        self.source.open(Side::Source).await
    }

    async fn open_target(&self) -> ReconcileResult<Box<dyn DatabaseHandle>> {
        self.target.open(Side::Target).await
    }
}
