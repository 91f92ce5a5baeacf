//! Library Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};
use std::path::PathBuf;

/// A library error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for library operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// The metadata database is missing, unreadable or not a Calibre library.
    /// Nothing can be processed.
    #[display("calibre library unavailable: {}", _0.display())]
    Unavailable(#[error(not(source))] PathBuf),
    /// A query against an open library failed.
    #[display("could not read calibre library")]
    Query,
    /// Only affects the one book.
    #[display("cover file not found: {}", _0.display())]
    CoverMissing(#[error(not(source))] PathBuf),
    #[display("could not read cover file: {}", _0.display())]
    CoverUnreadable(#[error(not(source))] PathBuf),
    /// Row data that cannot be represented (e.g. a negative id).
    #[display("invalid library data: {_0}")]
    InvalidData(#[error(not(source))] &'static str),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        false
    }
}
