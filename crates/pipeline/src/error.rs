//! Pipeline Error Types
//!
//! Only run-ending failures are errors. Anything limited to one book is
//! recorded in the [`Report`](crate::Report) instead and the run carries on.

use derive_more::{Display, Error};

/// A pipeline error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for pipeline operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// The Calibre library could not be read; nothing to process.
    #[display("calibre library unavailable")]
    Library,
    /// The tracking store could not be read or written. Continuing would
    /// upload covers without recording them.
    #[display("tracking store unavailable")]
    Tracking,
    /// The object store rejected the credentials or the bucket is
    /// unreachable. Every following upload would fail the same way.
    #[display("object storage unusable: {_0}")]
    Storage(#[error(not(source))] String),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        false
    }
}
