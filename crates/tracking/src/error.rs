//! Tracking Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};
use std::path::PathBuf;

/// A tracking error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for tracking operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// The database file could not be opened or created.
    #[display("tracking store unavailable: {}", _0.display())]
    Unavailable(#[error(not(source))] PathBuf),
    /// The database exists but has no tracking table (only reported for
    /// read-only connections, which never run migrations).
    #[display("tracking store has no schema: {}", _0.display())]
    MissingSchema(#[error(not(source))] PathBuf),
    #[display("database error")]
    Database,
    #[display("database migration error")]
    Migration,
    /// Serialization/deserialization error.
    #[display("invalid tracking data: {_0}")]
    InvalidData(#[error(not(source))] &'static str),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        false
    }
}
