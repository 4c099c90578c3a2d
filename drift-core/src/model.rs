//! Normalized, dialect-neutral schema model.
//!
//! A [`Schema`] is a snapshot of one database at one point in time. Tables are
//! keyed by name, and each table owns its columns and indexes, so the
//! uniqueness invariants (table names per schema, column and index names per
//! table) hold by construction.

use std::collections::BTreeMap;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// A normalized database schema.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    tables: BTreeMap<String, Table>,
}

impl Schema {
    /// Create an empty schema.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a table, replacing any table with the same name.
    ///
    /// Returns the replaced table, if any.
    pub fn add_table(&mut self, table: Table) -> Option<Table> {
        self.tables.insert(table.name.clone(), table)
    }

    /// Builder-style variant of [`Schema::add_table`].
    pub fn with_table(mut self, table: Table) -> Self {
        self.add_table(table);
        self
    }

    /// Look up a table by name.
    pub fn table(&self, name: &str) -> Option<&Table> {
        self.tables.get(name)
    }

    /// Check whether a table exists.
    pub fn contains_table(&self, name: &str) -> bool {
        self.tables.contains_key(name)
    }

    /// Iterate over tables in name order.
    pub fn tables(&self) -> impl Iterator<Item = &Table> {
        self.tables.values()
    }

    /// Iterate over table names in lexicographic order.
    pub fn table_names(&self) -> impl Iterator<Item = &str> {
        self.tables.keys().map(String::as_str)
    }

    /// Number of tables.
    pub fn len(&self) -> usize {
        self.tables.len()
    }

    /// Whether the schema has no tables.
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

/// A table definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    /// Table name.
    pub name: String,
    columns: IndexMap<String, Column>,
    indexes: IndexMap<String, Index>,
}

impl Table {
    /// Create a table with no columns or indexes.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: IndexMap::new(),
            indexes: IndexMap::new(),
        }
    }

    /// Add a column, replacing any column with the same name in place.
    pub fn add_column(&mut self, column: Column) -> Option<Column> {
        self.columns.insert(column.name.clone(), column)
    }

    /// Add an index, replacing any index with the same name in place.
    pub fn add_index(&mut self, index: Index) -> Option<Index> {
        self.indexes.insert(index.name.clone(), index)
    }

    /// Builder-style variant of [`Table::add_column`].
    pub fn column(mut self, column: Column) -> Self {
        self.add_column(column);
        self
    }

    /// Builder-style variant of [`Table::add_index`].
    pub fn index(mut self, index: Index) -> Self {
        self.add_index(index);
        self
    }

    /// Look up a column by name.
    pub fn get_column(&self, name: &str) -> Option<&Column> {
        self.columns.get(name)
    }

    /// Look up an index by name.
    pub fn get_index(&self, name: &str) -> Option<&Index> {
        self.indexes.get(name)
    }

    /// Check whether a column exists.
    pub fn has_column(&self, name: &str) -> bool {
        self.columns.contains_key(name)
    }

    /// Check whether an index exists.
    pub fn has_index(&self, name: &str) -> bool {
        self.indexes.contains_key(name)
    }

    /// Columns in ordinal order.
    pub fn columns(&self) -> impl Iterator<Item = &Column> {
        self.columns.values()
    }

    /// Indexes in discovery order.
    pub fn indexes(&self) -> impl Iterator<Item = &Index> {
        self.indexes.values()
    }

    /// Number of columns.
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Number of indexes.
    pub fn index_count(&self) -> usize {
        self.indexes.len()
    }
}

/// A column definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    /// Column name.
    pub name: String,
    /// Declared type.
    pub column_type: ColumnType,
    /// Whether the column accepts NULL.
    pub nullable: bool,
}

impl Column {
    /// Create a nullable column.
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
            nullable: true,
        }
    }

    /// Mark the column as NOT NULL.
    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    /// Set nullability.
    pub fn nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }
}

/// An index definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Index {
    /// Index name.
    pub name: String,
    /// Covered columns, in key order.
    pub columns: Vec<String>,
    /// Whether this is a unique index.
    pub unique: bool,
}

impl Index {
    /// Create a non-unique index.
    pub fn new<I, S>(name: impl Into<String>, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            columns: columns.into_iter().map(Into::into).collect(),
            unique: false,
        }
    }

    /// Mark the index as unique.
    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }
}

/// Dialect-neutral column type descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ColumnType {
    SmallInt,
    Int,
    BigInt,
    Float,
    Double,
    Decimal {
        precision: Option<u32>,
        scale: Option<u32>,
    },
    Text,
    Char {
        length: Option<u32>,
    },
    VarChar {
        length: Option<u32>,
    },
    Bytes,
    Boolean,
    /// Timestamp without time zone.
    Timestamp,
    /// Timestamp with time zone.
    TimestampTz,
    Date,
    /// Time of day without time zone.
    Time,
    /// Time of day with time zone.
    TimeTz,
    Json {
        /// Stored decomposed (`jsonb`) rather than as text.
        binary: bool,
    },
    Uuid,
    Array {
        element: Box<ColumnType>,
    },
    /// A type this model does not understand, kept by name.
    Other {
        name: String,
    },
}

impl ColumnType {
    /// Normalize a PostgreSQL `udt_name` plus the `information_schema`
    /// length/precision/scale columns.
    pub fn from_postgres(
        udt_name: &str,
        max_length: Option<i32>,
        precision: Option<i32>,
        scale: Option<i32>,
    ) -> Self {
        let length = max_length.and_then(to_u32);
        match udt_name.to_lowercase().as_str() {
            "int2" | "smallint" => Self::SmallInt,
            "int4" | "integer" | "int" => Self::Int,
            "int8" | "bigint" => Self::BigInt,
            "float4" | "real" => Self::Float,
            "float8" | "double precision" => Self::Double,
            "numeric" | "decimal" => Self::Decimal {
                precision: precision.and_then(to_u32),
                scale: scale.and_then(to_u32),
            },
            "text" => Self::Text,
            "varchar" | "character varying" => Self::VarChar { length },
            "bpchar" | "char" | "character" => Self::Char { length },
            "bytea" => Self::Bytes,
            "bool" | "boolean" => Self::Boolean,
            "timestamp" | "timestamp without time zone" => Self::Timestamp,
            "timestamptz" | "timestamp with time zone" => Self::TimestampTz,
            "date" => Self::Date,
            "time" | "time without time zone" => Self::Time,
            "timetz" | "time with time zone" => Self::TimeTz,
            "json" => Self::Json { binary: false },
            "jsonb" => Self::Json { binary: true },
            "uuid" => Self::Uuid,
            // information_schema reports array element types with a leading underscore
            other if other.starts_with('_') => Self::Array {
                element: Box::new(Self::from_postgres(&other[1..], None, None, None)),
            },
            other => Self::Other {
                name: other.to_string(),
            },
        }
    }

    /// Normalize a SQLite declared column type such as `VARCHAR(255)`.
    pub fn from_sqlite(declared: &str) -> Self {
        let declared = declared.trim().to_lowercase();
        let (base, params) = split_type_params(&declared);

        match base {
            "smallint" | "int2" | "tinyint" => Self::SmallInt,
            "integer" | "int" | "int4" | "mediumint" => Self::Int,
            "bigint" | "int8" => Self::BigInt,
            "real" | "float" => Self::Float,
            "double" | "double precision" => Self::Double,
            "numeric" | "decimal" => Self::Decimal {
                precision: params.first().copied(),
                scale: params.get(1).copied(),
            },
            "text" | "clob" | "" => Self::Text,
            "char" | "character" | "nchar" => Self::Char {
                length: params.first().copied(),
            },
            "varchar" | "character varying" | "nvarchar" => Self::VarChar {
                length: params.first().copied(),
            },
            "blob" | "bytea" => Self::Bytes,
            "boolean" | "bool" => Self::Boolean,
            "timestamp" | "datetime" => Self::Timestamp,
            "timestamptz" => Self::TimestampTz,
            "date" => Self::Date,
            "time" => Self::Time,
            "timetz" => Self::TimeTz,
            "json" => Self::Json { binary: false },
            "jsonb" => Self::Json { binary: true },
            "uuid" => Self::Uuid,
            _ => Self::Other {
                name: declared.clone(),
            },
        }
    }
}

fn to_u32(value: i32) -> Option<u32> {
    u32::try_from(value).ok()
}

/// Split `varchar(255)` into (`varchar`, `[255]`).
fn split_type_params(declared: &str) -> (&str, Vec<u32>) {
    match declared.split_once('(') {
        Some((base, rest)) => {
            let params = rest
                .trim_end_matches(')')
                .split(',')
                .filter_map(|p| p.trim().parse().ok())
                .collect();
            (base.trim(), params)
        }
        None => (declared, Vec::new()),
    }
}
