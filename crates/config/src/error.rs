//! Configuration Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};
use std::path::PathBuf;

/// A configuration error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for configuration operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Every variant is fatal and reported before any I/O takes place.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// Required settings that no layer (file, environment, flags) provided.
    #[display("missing required configuration: {}", _0.join(", "))]
    Missing(#[error(not(source))] Vec<&'static str>),
    /// A setting was provided but its value is unusable.
    #[display("invalid configuration: {_0}")]
    Invalid(#[error(not(source))] String),
    /// An explicitly requested configuration file does not exist or has an
    /// unsupported extension.
    #[display("configuration file unusable: {}", _0.display())]
    File(#[error(not(source))] PathBuf),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        false
    }
}
