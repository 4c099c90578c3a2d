//! Error types for the reconciliation engine.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for reconciliation operations.
pub type ReconcileResult<T> = Result<T, ReconcileError>;

/// Which database of a run an error or warning concerns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    /// The source-of-truth database.
    Source,
    /// The database being corrected.
    Target,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Source => write!(f, "source"),
            Self::Target => write!(f, "target"),
        }
    }
}

/// Errors that can occur during a reconciliation run.
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// A database could not be reached at all.
    #[error("Connection error ({side}): {message}")]
    Connection {
        /// Which database failed.
        side: Side,
        /// Underlying message.
        message: String,
    },

    /// A database could not be enumerated.
    #[error("Introspection error ({side}): {message}")]
    Introspection {
        /// Which database failed.
        side: Side,
        /// Underlying message.
        message: String,
    },

    /// The run was aborted before any work was done.
    #[error("Reconciliation aborted: {0}")]
    Aborted(String),
}

impl ReconcileError {
    /// Create a connection error.
    pub fn connection(side: Side, msg: impl Into<String>) -> Self {
        Self::Connection {
            side,
            message: msg.into(),
        }
    }

    /// Create an introspection error.
    pub fn introspection(side: Side, msg: impl Into<String>) -> Self {
        Self::Introspection {
            side,
            message: msg.into(),
        }
    }

    /// Create an aborted error.
    pub fn aborted(msg: impl Into<String>) -> Self {
        Self::Aborted(msg.into())
    }

    /// Whether this error ends the run instead of being recorded per item.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Connection { .. } | Self::Aborted(_))
    }
}

/// Errors reported by a [`DatabaseHandle`](crate::handle::DatabaseHandle).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DriverError {
    /// The connection is gone or could not be established.
    #[error("connection error: {0}")]
    Connection(String),

    /// The object being created already exists.
    #[error("already exists: {0}")]
    AlreadyExists(String),

    /// Any other statement failure.
    #[error("query error: {0}")]
    Query(String),
}

impl DriverError {
    /// Create a connection error.
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection(msg.into())
    }

    /// Create an already-exists error.
    pub fn already_exists(msg: impl Into<String>) -> Self {
        Self::AlreadyExists(msg.into())
    }

    /// Create a query error.
    pub fn query(msg: impl Into<String>) -> Self {
        Self::Query(msg.into())
    }

    /// Check if this is a connection error.
    pub fn is_connection_error(&self) -> bool {
        matches!(self, Self::Connection(_))
    }
}
