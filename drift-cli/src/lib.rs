//! drift CLI - Command-line interface for drift schema reconciliation.
//!
//! This crate provides the `drift` binary, which compares a target database
//! with a source-of-truth database and either reports the differences
//! (`drift diff`) or applies the missing tables, columns and indexes
//! (`drift reconcile`).

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod logging;
pub mod output;
