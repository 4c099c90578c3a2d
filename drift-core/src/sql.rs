//! DDL synthesis for the supported dialects.
//!
//! Every identifier passes through [`Dialect::quote_identifier`] before it is
//! placed in a statement, and unrecognized type names are emitted only when
//! they look like a plain type declaration.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::{Column, ColumnType, Index, Table};
use crate::plan::Action;

/// Maximum identifier length in bytes on PostgreSQL (NAMEDATALEN - 1).
const POSTGRES_MAX_IDENTIFIER_LEN: usize = 63;

/// Errors raised while rendering DDL.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DdlError {
    /// A name cannot be quoted safely.
    #[error("unsafe identifier {name:?}: {reason}")]
    UnsafeIdentifier {
        /// The offending name.
        name: String,
        /// Why it was rejected.
        reason: String,
    },

    /// An unrecognized type name contains characters that are not allowed.
    #[error("unsafe type name {name:?}")]
    UnsafeTypeName {
        /// The offending type name.
        name: String,
    },

    /// An index without columns.
    #[error("index {index:?} on table {table:?} has no columns")]
    EmptyIndex {
        /// Table name.
        table: String,
        /// Index name.
        index: String,
    },

    /// A table without columns.
    #[error("table {table:?} has no columns")]
    EmptyTable {
        /// Table name.
        table: String,
    },
}

impl DdlError {
    fn unsafe_identifier(name: &str, reason: impl Into<String>) -> Self {
        Self::UnsafeIdentifier {
            name: name.to_string(),
            reason: reason.into(),
        }
    }

    /// Whether this error is about name or type safety rather than an
    /// unrenderable definition.
    pub fn is_identifier_safety(&self) -> bool {
        matches!(
            self,
            Self::UnsafeIdentifier { .. } | Self::UnsafeTypeName { .. }
        )
    }
}

/// SQL dialect of a database.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dialect {
    /// PostgreSQL.
    Postgres,
    /// SQLite.
    Sqlite,
}

impl std::fmt::Display for Dialect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Postgres => write!(f, "postgres"),
            Self::Sqlite => write!(f, "sqlite"),
        }
    }
}

impl Dialect {
    /// Quote an identifier, rejecting names that cannot be quoted safely.
    pub fn quote_identifier(&self, name: &str) -> Result<String, DdlError> {
        if name.is_empty() {
            return Err(DdlError::unsafe_identifier(name, "empty name"));
        }
        if name.contains('\0') {
            return Err(DdlError::unsafe_identifier(name, "contains NUL"));
        }
        if name.chars().any(char::is_control) {
            return Err(DdlError::unsafe_identifier(
                name,
                "contains control characters",
            ));
        }
        if *self == Self::Postgres && name.len() > POSTGRES_MAX_IDENTIFIER_LEN {
            return Err(DdlError::unsafe_identifier(
                name,
                format!("longer than {} bytes", POSTGRES_MAX_IDENTIFIER_LEN),
            ));
        }

        Ok(format!("\"{}\"", name.replace('"', "\"\"")))
    }

    /// Map a column type to this dialect's type name.
    pub fn column_type(&self, column_type: &ColumnType) -> Result<String, DdlError> {
        let sql = match (self, column_type) {
            (_, ColumnType::SmallInt) => "SMALLINT".to_string(),
            (_, ColumnType::Int) => "INTEGER".to_string(),
            (_, ColumnType::BigInt) => "BIGINT".to_string(),
            (_, ColumnType::Float) => "REAL".to_string(),
            (Self::Postgres, ColumnType::Double) => "DOUBLE PRECISION".to_string(),
            (Self::Sqlite, ColumnType::Double) => "DOUBLE".to_string(),
            (_, ColumnType::Decimal { precision, scale }) => match (precision, scale) {
                (Some(p), Some(s)) => format!("NUMERIC({}, {})", p, s),
                (Some(p), None) => format!("NUMERIC({})", p),
                _ => "NUMERIC".to_string(),
            },
            (_, ColumnType::Text) => "TEXT".to_string(),
            (_, ColumnType::Char { length }) => with_length("CHAR", *length),
            (_, ColumnType::VarChar { length }) => with_length("VARCHAR", *length),
            (Self::Postgres, ColumnType::Bytes) => "BYTEA".to_string(),
            (Self::Sqlite, ColumnType::Bytes) => "BLOB".to_string(),
            (_, ColumnType::Boolean) => "BOOLEAN".to_string(),
            (_, ColumnType::Timestamp) => "TIMESTAMP".to_string(),
            (_, ColumnType::TimestampTz) => "TIMESTAMPTZ".to_string(),
            (_, ColumnType::Date) => "DATE".to_string(),
            (_, ColumnType::Time) => "TIME".to_string(),
            (Self::Postgres, ColumnType::TimeTz) => "TIMETZ".to_string(),
            // SQLite has no zoned time; the declared name only sets affinity
            (Self::Sqlite, ColumnType::TimeTz) => "TIME".to_string(),
            (Self::Postgres, ColumnType::Json { binary: true }) => "JSONB".to_string(),
            (Self::Postgres, ColumnType::Json { binary: false }) => "JSON".to_string(),
            (Self::Sqlite, ColumnType::Json { .. }) => "TEXT".to_string(),
            (Self::Postgres, ColumnType::Uuid) => "UUID".to_string(),
            (Self::Sqlite, ColumnType::Uuid) => "TEXT".to_string(),
            (Self::Postgres, ColumnType::Array { element }) => {
                format!("{}[]", self.column_type(element)?)
            }
            (Self::Sqlite, ColumnType::Array { .. }) => "TEXT".to_string(),
            (_, ColumnType::Other { name }) => {
                if !is_safe_type_name(name) {
                    return Err(DdlError::UnsafeTypeName { name: name.clone() });
                }
                name.to_uppercase()
            }
        };
        Ok(sql)
    }

    /// Render an action into the statements that carry it out.
    pub fn render(&self, action: &Action) -> Result<Vec<String>, DdlError> {
        match action {
            Action::CreateTable(table) => {
                let mut statements = vec![self.create_table(table)?];
                for index in table.indexes() {
                    statements.push(self.create_index(&table.name, index)?);
                }
                Ok(statements)
            }
            Action::AddColumn { table, column } => Ok(vec![format!(
                "ALTER TABLE {} ADD COLUMN {};",
                self.quote_identifier(table)?,
                self.column_definition(column)?
            )]),
            Action::CreateIndex { table, index } => Ok(vec![self.create_index(table, index)?]),
        }
    }

    fn create_table(&self, table: &Table) -> Result<String, DdlError> {
        if table.column_count() == 0 {
            return Err(DdlError::EmptyTable {
                table: table.name.clone(),
            });
        }

        let columns = table
            .columns()
            .map(|c| self.column_definition(c))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(format!(
            "CREATE TABLE {} (\n    {}\n);",
            self.quote_identifier(&table.name)?,
            columns.join(",\n    ")
        ))
    }

    fn column_definition(&self, column: &Column) -> Result<String, DdlError> {
        let mut sql = format!(
            "{} {}",
            self.quote_identifier(&column.name)?,
            self.column_type(&column.column_type)?
        );
        if !column.nullable {
            sql.push_str(" NOT NULL");
        }
        Ok(sql)
    }

    fn create_index(&self, table: &str, index: &Index) -> Result<String, DdlError> {
        if index.columns.is_empty() {
            return Err(DdlError::EmptyIndex {
                table: table.to_string(),
                index: index.name.clone(),
            });
        }

        let columns = index
            .columns
            .iter()
            .map(|c| self.quote_identifier(c))
            .collect::<Result<Vec<_>, _>>()?;
        let unique = if index.unique { "UNIQUE " } else { "" };

        Ok(format!(
            "CREATE {}INDEX {} ON {} ({});",
            unique,
            self.quote_identifier(&index.name)?,
            self.quote_identifier(table)?,
            columns.join(", ")
        ))
    }
}

fn with_length(base: &str, length: Option<u32>) -> String {
    match length {
        Some(n) => format!("{}({})", base, n),
        None => base.to_string(),
    }
}

fn is_safe_type_name(name: &str) -> bool {
    let allowed = |c: char| {
        c.is_ascii_alphanumeric() || matches!(c, ' ' | '_' | '(' | ')' | ',' | '[' | ']')
    };
    !name.trim().is_empty() && name.chars().all(allowed)
}
