//! Error types for SQLite operations.

use drift_core::DriverError;
use thiserror::Error;

/// Result type for SQLite operations.
pub type SqliteResult<T> = Result<T, SqliteError>;

/// Error type for SQLite operations.
#[derive(Debug, Error)]
pub enum SqliteError {
    /// SQLite driver error.
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// The connection's background thread has shut down.
    #[error("Connection closed")]
    ConnectionClosed,

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Connection error.
    #[error("Connection error: {0}")]
    Connection(String),
}

impl SqliteError {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a connection error.
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection(msg.into())
    }

    /// Check if this is a connection error.
    pub fn is_connection_error(&self) -> bool {
        matches!(self, Self::Connection(_) | Self::ConnectionClosed)
    }

    /// Check if SQLite refused to create an object because it already exists.
    pub fn is_already_exists(&self) -> bool {
        match self {
            Self::Sqlite(rusqlite::Error::SqliteFailure(_, Some(message))) => {
                is_already_exists(message)
            }
            _ => false,
        }
    }
}

impl From<tokio_rusqlite::Error> for SqliteError {
    fn from(err: tokio_rusqlite::Error) -> Self {
        match err {
            tokio_rusqlite::Error::Rusqlite(e) => Self::Sqlite(e),
            tokio_rusqlite::Error::ConnectionClosed => Self::ConnectionClosed,
            tokio_rusqlite::Error::Close((_, e)) => Self::Sqlite(e),
            other => Self::Connection(other.to_string()),
        }
    }
}

impl From<SqliteError> for DriverError {
    fn from(err: SqliteError) -> Self {
        if err.is_connection_error() {
            DriverError::connection(err.to_string())
        } else if err.is_already_exists() {
            DriverError::already_exists(err.to_string())
        } else {
            DriverError::query(err.to_string())
        }
    }
}

/// SQLite reports duplicates with the generic error code, so the engine's
/// message is the only signal.
fn is_already_exists(message: &str) -> bool {
    let object_exists = ["table ", "index ", "view ", "trigger "]
        .iter()
        .any(|kind| message.starts_with(kind))
        && message.ends_with(" already exists");
    object_exists || message.starts_with("duplicate column name: ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn failure(message: &str) -> SqliteError {
        SqliteError::Sqlite(rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(1),
            Some(message.to_string()),
        ))
    }

    #[test]
    fn test_error_display() {
        let err = SqliteError::config("invalid path");
        assert!(err.to_string().contains("Configuration error"));
        assert!(err.to_string().contains("invalid path"));
    }

    #[test]
    fn test_driver_error_display_is_unwrapped() {
        let err: SqliteError =
            tokio_rusqlite::Error::Rusqlite(rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error::new(1),
                Some("no such table: users".to_string()),
            ))
            .into();
        assert_eq!(err.to_string(), "SQLite error: no such table: users");
    }

    #[test]
    fn test_connection_errors() {
        assert!(SqliteError::connection("gone").is_connection_error());
        assert!(SqliteError::from(tokio_rusqlite::Error::ConnectionClosed).is_connection_error());
        assert!(!SqliteError::config("bad").is_connection_error());
    }

    #[test]
    fn test_already_exists_detection() {
        assert!(is_already_exists("table users already exists"));
        assert!(is_already_exists("index idx_email already exists"));
        assert!(is_already_exists("duplicate column name: email"));
        assert!(!is_already_exists("no such table: users"));
        assert!(!is_already_exists("no such column: already exists"));
    }

    #[test]
    fn test_only_sqlite_failures_are_already_exists() {
        assert!(failure("index idx_name already exists").is_already_exists());
        assert!(!failure("near \"already\": syntax error").is_already_exists());
        assert!(!SqliteError::config("index idx already exists").is_already_exists());
        assert!(!SqliteError::connection("table users already exists").is_already_exists());
    }

    #[test]
    fn test_into_driver_error() {
        let err: DriverError = SqliteError::connection("closed").into();
        assert!(err.is_connection_error());

        let err: DriverError = failure("table users already exists").into();
        assert!(matches!(err, DriverError::AlreadyExists(_)));

        let err: DriverError = SqliteError::config("index idx already exists").into();
        assert!(matches!(err, DriverError::Query(_)));
    }
}
