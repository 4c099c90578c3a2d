//! Error types for PostgreSQL operations.

use drift_core::DriverError;
use thiserror::Error;
use tokio_postgres::error::SqlState;

/// Result type for PostgreSQL operations.
pub type PgResult<T> = Result<T, PgError>;

/// Errors that can occur during PostgreSQL operations.
#[derive(Error, Debug)]
pub enum PgError {
    /// PostgreSQL error.
    #[error("postgres error: {0}")]
    Postgres(#[from] tokio_postgres::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Connection error.
    #[error("connection error: {0}")]
    Connection(String),
}

impl PgError {
    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a connection error.
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection(message.into())
    }

    /// Check if this is a connection error.
    pub fn is_connection_error(&self) -> bool {
        match self {
            Self::Connection(_) => true,
            Self::Postgres(e) => e.is_closed(),
            Self::Config(_) => false,
        }
    }
}

impl From<PgError> for DriverError {
    fn from(err: PgError) -> Self {
        if err.is_connection_error() {
            return DriverError::connection(err.to_string());
        }
        match err {
            PgError::Postgres(e) => classify(e.code(), e.to_string()),
            PgError::Config(msg) => DriverError::connection(msg),
            PgError::Connection(msg) => DriverError::connection(msg),
        }
    }
}

/// Map a SQLSTATE to a driver error.
fn classify(code: Option<&SqlState>, message: String) -> DriverError {
    match code {
        Some(code)
            if *code == SqlState::DUPLICATE_TABLE
                || *code == SqlState::DUPLICATE_SCHEMA
                || *code == SqlState::DUPLICATE_COLUMN
                || *code == SqlState::DUPLICATE_OBJECT =>
        {
            DriverError::already_exists(message)
        }
        _ => DriverError::query(message),
    }
}
