//! Thumbnail Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};

/// A thumbnail error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for thumbnail operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// Source image is unreadable, corrupt or in an unsupported format. Don't
    /// retry with the same input.
    #[display("could not decode image")]
    Decode,
    /// Re-encoding a resized image failed.
    #[display("could not encode {_0} thumbnail")]
    Encode(#[error(not(source))] &'static str),
    /// Not one of `original`, `sm`, `md`, `lg`.
    #[display("unknown resolution: {_0}")]
    UnknownResolution(#[error(not(source))] String),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        false
    }
}
