//! Storage Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};

/// A storage error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for storage operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// Object or bucket does not exist.
    #[display("not found: {_0}")]
    NotFound(#[error(not(source))] String),
    /// Credentials were rejected or lack permission. Every following request
    /// will fail the same way.
    #[display("permission denied: {_0}")]
    PermissionDenied(#[error(not(source))] String),
    /// Object key is empty, contains invalid characters or escapes the prefix.
    #[display("invalid key: {_0}")]
    InvalidKey(#[error(not(source))] String),
    /// Network-related error (timeouts, dropped connections, DNS).
    #[display("network error: {_0}")]
    Network(#[error(not(source))] String),
    /// The service asked us to slow down.
    #[display("request throttled: {_0}")]
    Throttled(#[error(not(source))] String),
    /// Backend-specific error
    #[display("backend error: {_0}")]
    BackendError(#[error(not(source))] String),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Network(_) | Self::Throttled(_) | Self::BackendError(_))
    }

    /// Returns `true` if no further request against this backend can succeed.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::PermissionDenied(_))
    }
}
