//! SQLite database driver for drift.
//!
//! This crate provides SQLite support for drift, using `tokio-rusqlite`
//! for asynchronous database operations.
//!
//! # Features
//!
//! - Async/await support via `tokio-rusqlite`
//! - Catalog reads through the `pragma_*` table-valued functions
//! - Transactional DDL
//! - In-memory and file-based databases
//!
//! # Example
//!
//! ```rust,ignore
//! use drift_core::{ReconcileConfig, Reconciler};
//! use drift_sqlite::SqliteProvider;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let provider = SqliteProvider::from_urls("sqlite://./reference.db", "sqlite://./app.db")?;
//!     let report = Reconciler::new(ReconcileConfig::new()).reconcile(&provider).await?;
//!
//!     println!("{}", report.summary());
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod database;
pub mod error;

pub use config::{DatabasePath, SqliteConfig};
pub use database::{SqliteDatabase, SqliteProvider};
pub use error::{SqliteError, SqliteResult};
