//! Storage backend trait and implementations.
//!
//! This module defines the `StorageBackend` trait, which provides a unified
//! interface for writing cover images to object storage (S3-compatible
//! services, or memory during tests).

#[cfg(any(test, feature = "mock"))]
mod mock;
mod retry;
#[cfg(feature = "s3")]
mod s3;

#[cfg(any(test, feature = "mock"))]
pub use self::mock::MockBackend;
pub use self::retry::{RetryBackend, RetryPolicy};
#[cfg(feature = "s3")]
pub use self::s3::S3Backend;
use crate::error::Result;
use crate::models::{Object, Receipt};
use async_trait::async_trait;

/// Unified interface for object storage backends.
///
/// All operations are asynchronous to efficiently handle network operations.
/// Keys are relative to the backend's root (or configured prefix) and must be
/// validated using [`validate_key`](crate::validate_key) before use.
/// Implementations should enforce this validation.
///
/// # Examples
///
/// ```
/// use coverup_storage::{Object, backend::StorageBackend, error::Result};
///
/// async fn upload_once(backend: &dyn StorageBackend, bytes: Vec<u8>) -> Result<bool> {
///     let key = "cw-cover/59/cover.jpg";
///     if backend.exists(key).await? {
///         return Ok(false);
///     }
///     backend.put(key, Object::new(bytes, "image/jpeg")).await?;
///     Ok(true)
/// }
/// ```
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Name of the configured backend (used for logging only).
    fn name(&self) -> &str;

    /// Check that the backend is reachable and the credentials are accepted.
    ///
    /// Returns [`PermissionDenied`](crate::error::ErrorKind::PermissionDenied)
    /// if the credentials are rejected and [`NotFound`](crate::error::ErrorKind::NotFound)
    /// if the bucket does not exist.
    async fn check(&self) -> Result<()>;

    /// Check if an object exists.
    async fn exists(&self, key: &str) -> Result<bool>;

    /// Write an object.
    ///
    /// Creates a new object or overwrites an existing object under the same
    /// key, so repeating a write is harmless.
    async fn put(&self, key: &str, object: Object) -> Result<Receipt>;
}
