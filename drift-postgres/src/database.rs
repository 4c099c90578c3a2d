//! PostgreSQL database handle.

use drift_core::{
    Column, ColumnType, ConnectionProvider, DatabaseHandle, Dialect, DriverResult, Index,
    ReconcileError, ReconcileResult, Side, UnsupportedIndex,
};
use tokio_postgres::{Client, NoTls};
use tracing::{debug, error};

use crate::config::PgConfig;
use crate::error::{PgError, PgResult};

/// Catalog queries. Every input is bound as a parameter.
pub mod queries {
    /// Base tables in a schema.
    pub const TABLES: &str = r#"
        SELECT table_name::text
        FROM information_schema.tables
        WHERE table_schema::text = $1 AND table_type = 'BASE TABLE'
        ORDER BY table_name
    "#;

    /// Columns of a table, in ordinal order.
    pub const COLUMNS: &str = r#"
        SELECT
            column_name::text,
            udt_name::text,
            is_nullable = 'YES' AS is_nullable,
            character_maximum_length::int4,
            numeric_precision::int4,
            numeric_scale::int4
        FROM information_schema.columns
        WHERE table_schema::text = $1 AND table_name::text = $2
        ORDER BY ordinal_position
    "#;

    /// Secondary indexes of a table, primary keys excepted. Only key columns
    /// are listed; expression entries (attnum 0) have no attribute and are
    /// flagged through `indexprs` instead.
    pub const INDEXES: &str = r#"
        SELECT
            i.relname::text AS index_name,
            ix.indisunique AS is_unique,
            ix.indexprs IS NOT NULL AS has_expressions,
            ix.indpred IS NOT NULL AS is_partial,
            ARRAY(
                SELECT a.attname::text
                FROM unnest(ix.indkey) WITH ORDINALITY AS k(attnum, ord)
                JOIN pg_attribute a ON a.attrelid = t.oid AND a.attnum = k.attnum
                WHERE k.ord <= ix.indnkeyatts
                ORDER BY k.ord
            ) AS columns
        FROM pg_index ix
        JOIN pg_class i ON ix.indexrelid = i.oid
        JOIN pg_class t ON ix.indrelid = t.oid
        JOIN pg_namespace n ON t.relnamespace = n.oid
        WHERE n.nspname::text = $1 AND t.relname::text = $2 AND NOT ix.indisprimary
        ORDER BY i.relname
    "#;
}

/// One row of [`queries::INDEXES`].
#[derive(Debug, Clone, PartialEq, Eq)]
struct IndexRow {
    name: String,
    unique: bool,
    has_expressions: bool,
    partial: bool,
    columns: Vec<String>,
}

impl IndexRow {
    /// Convert to a model index, or explain why the model cannot hold it.
    fn into_index(self, table: &str) -> Result<Index, UnsupportedIndex> {
        if self.partial {
            return Err(UnsupportedIndex::new(table, self.name, "partial index"));
        }
        if self.has_expressions {
            return Err(UnsupportedIndex::new(table, self.name, "expression index"));
        }
        let index = Index::new(self.name, self.columns);
        Ok(if self.unique { index.unique() } else { index })
    }
}

/// A connection to one PostgreSQL database, scoped to one schema.
pub struct PgDatabase {
    client: Client,
    schema: String,
}

impl PgDatabase {
    /// Connect using the given configuration.
    pub async fn connect(config: &PgConfig) -> PgResult<Self> {
        debug!(host = %config.host, database = %config.database, "Connecting to PostgreSQL");

        let (client, connection) = config
            .to_pg_config()
            .connect(NoTls)
            .await
            .map_err(|e| PgError::connection(format!("failed to connect: {}", e)))?;

        tokio::spawn(async move {
            if let Err(e) = connection.await {
                error!(error = %e, "PostgreSQL connection error");
            }
        });

        // Unqualified names in generated DDL resolve to the reconciled schema.
        let search_path = format!(
            "SET search_path TO {}",
            Dialect::Postgres
                .quote_identifier(&config.schema)
                .map_err(|e| PgError::config(e.to_string()))?
        );
        client.batch_execute(&search_path).await?;

        Ok(Self {
            client,
            schema: config.schema.clone(),
        })
    }

    /// Connect using a database URL.
    pub async fn connect_url(url: &str) -> PgResult<Self> {
        Self::connect(&PgConfig::from_url(url)?).await
    }

    /// The schema this handle reconciles.
    pub fn schema(&self) -> &str {
        &self.schema
    }

    async fn read_indexes(
        &self,
        table: &str,
    ) -> DriverResult<Vec<Result<Index, UnsupportedIndex>>> {
        let rows = self
            .client
            .query(queries::INDEXES, &[&self.schema, &table])
            .await
            .map_err(PgError::from)?;

        Ok(rows
            .iter()
            .map(|row| {
                IndexRow {
                    name: row.get(0),
                    unique: row.get(1),
                    has_expressions: row.get(2),
                    partial: row.get(3),
                    columns: row.get(4),
                }
                .into_index(table)
            })
            .collect())
    }

    async fn batch(&self, sql: &str) -> DriverResult<()> {
        self.client
            .batch_execute(sql)
            .await
            .map_err(|e| PgError::from(e).into())
    }
}

#[async_trait::async_trait]
impl DatabaseHandle for PgDatabase {
    fn dialect(&self) -> Dialect {
        Dialect::Postgres
    }

    async fn list_tables(&self) -> DriverResult<Vec<String>> {
        let rows = self
            .client
            .query(queries::TABLES, &[&self.schema])
            .await
            .map_err(PgError::from)?;
        Ok(rows.iter().map(|row| row.get(0)).collect())
    }

    async fn table_columns(&self, table: &str) -> DriverResult<Vec<Column>> {
        let rows = self
            .client
            .query(queries::COLUMNS, &[&self.schema, &table])
            .await
            .map_err(PgError::from)?;

        Ok(rows
            .iter()
            .map(|row| {
                let name: String = row.get(0);
                let udt_name: String = row.get(1);
                let nullable: bool = row.get(2);
                let max_length: Option<i32> = row.get(3);
                let precision: Option<i32> = row.get(4);
                let scale: Option<i32> = row.get(5);

                Column::new(
                    name,
                    ColumnType::from_postgres(&udt_name, max_length, precision, scale),
                )
                .nullable(nullable)
            })
            .collect())
    }

    async fn table_indexes(&self, table: &str) -> DriverResult<Vec<Index>> {
        let read = self.read_indexes(table).await?;
        Ok(read.into_iter().filter_map(Result::ok).collect())
    }

    async fn unsupported_indexes(&self, table: &str) -> DriverResult<Vec<UnsupportedIndex>> {
        let read = self.read_indexes(table).await?;
        Ok(read.into_iter().filter_map(Result::err).collect())
    }

    async fn execute_ddl(&self, statement: &str) -> DriverResult<()> {
        debug!(sql = %statement, "Executing DDL");
        self.batch(statement).await
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

/// Opens source and target PostgreSQL databases.
#[derive(Debug, Clone)]
pub struct PgProvider {
    source: PgConfig,
    target: PgConfig,
}

impl PgProvider {
    /// Create a provider from two configurations.
    pub fn new(source: PgConfig, target: PgConfig) -> Self {
        Self { source, target }
    }

    /// Create a provider from two database URLs.
    pub fn from_urls(source: &str, target: &str) -> PgResult<Self> {
        Ok(Self::new(PgConfig::from_url(source)?, PgConfig::from_url(target)?))
    }
}

#[async_trait::async_trait]
impl ConnectionProvider for PgProvider {
    async fn open_source(&self) -> ReconcileResult<Box<dyn DatabaseHandle>> {
        let db = PgDatabase::connect(&self.source)
            .await
            .map_err(|e| ReconcileError::connection(Side::Source, e.to_string()))?;
        Ok(Box::new(db))
    }

    async fn open_target(&self) -> ReconcileResult<Box<dyn DatabaseHandle>> {
        let db = PgDatabase::connect(&self.target)
            .await
            .map_err(|e| ReconcileError::connection(Side::Target, e.to_string()))?;
        Ok(Box::new(db))
    }
}
