//! Retrying storage backend.
//!
//! This module provides a storage backend implementation that wraps other
//! implementations and retries failed requests with exponential back-off when
//! the failure is marked as retryable.

use crate::error::{ErrorKind, Result};
use crate::{BackendHandle, Object, Receipt, StorageBackend};
use async_trait::async_trait;
use std::future::Future;
use std::time::Duration;

/// Bounded exponential back-off.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total number of attempts, including the first one. Never less than 1.
    pub attempts: u32,
    /// Delay before the second attempt; doubled for every attempt after that.
    pub backoff: Duration,
}
impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            backoff: Duration::from_millis(500),
        }
    }
}
impl RetryPolicy {
    /// Delay to wait after the given (1-based) failed attempt.
    pub fn delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        self.backoff.saturating_mul(1 << exponent)
    }
}

/// Retrying storage backend.
///
/// Wraps another backend and repeats requests that fail with a
/// [retryable](crate::error::ErrorKind::is_retryable) error, logging a
/// [`warn event`](tracing::Event) per retry. Other errors are returned
/// immediately.
#[derive(Clone)]
pub struct RetryBackend {
    inner: BackendHandle,
    policy: RetryPolicy,
}
impl RetryBackend {
    pub fn new(inner: BackendHandle, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    async fn retry<T, F, Fut>(&self, key: &str, mut operation: F) -> Result<T>
    where
        F: FnMut() -> Fut + Send,
        Fut: Future<Output = Result<T>> + Send,
        T: Send,
    {
        let attempts = self.policy.attempts.max(1);
        let mut attempt = 1;
        loop {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(e) if attempt < attempts && e.is_retryable() => {
                    let delay = self.policy.delay(attempt);
                    let kind: &ErrorKind = &e;
                    tracing::warn!(backend = self.inner.name(), key, attempt, delay_ms = delay.as_millis() as u64, error = %kind, "Retrying failed storage request");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                },
                Err(e) => return Err(e),
            }
        }
    }
}

#[async_trait]
impl StorageBackend for RetryBackend {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn check(&self) -> Result<()> {
        self.retry("", || self.inner.check()).await
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        self.retry(key, || self.inner.exists(key)).await
    }

    async fn put(&self, key: &str, object: Object) -> Result<Receipt> {
        self.retry(key, || self.inner.put(key, object.clone())).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MockBackend;
    use std::sync::Arc;

    fn policy(attempts: u32) -> RetryPolicy {
        RetryPolicy {
            attempts,
            backoff: Duration::from_millis(1),
        }
    }

    #[test]
    fn test_delay_doubles() {
        let policy = RetryPolicy {
            attempts: 4,
            backoff: Duration::from_millis(100),
        };
        assert_eq!(policy.delay(1), Duration::from_millis(100));
        assert_eq!(policy.delay(2), Duration::from_millis(200));
        assert_eq!(policy.delay(3), Duration::from_millis(400));
    }

    #[tokio::test]
    async fn test_transient_failures_are_retried() {
        let mock = Arc::new(MockBackend::default());
        mock.fail_next(ErrorKind::Network("connection reset".to_string()));
        mock.fail_next(ErrorKind::Throttled("SlowDown".to_string()));
        let backend = RetryBackend::new(mock.clone(), policy(3));
        let receipt = backend.put("cw-cover/1/cover.jpg", Object::new(b"jpeg".to_vec(), "image/jpeg")).await.unwrap();
        assert_eq!(receipt.size, 4);
        assert_eq!(mock.put_calls(), 3);
        assert!(mock.contains("cw-cover/1/cover.jpg"));
    }

    #[tokio::test]
    async fn test_gives_up_after_attempts() {
        let mock = Arc::new(MockBackend::default());
        for _ in 0..3 {
            mock.fail_next(ErrorKind::Network("timeout".to_string()));
        }
        let backend = RetryBackend::new(mock.clone(), policy(3));
        let err = backend.put("cw-cover/1/cover.jpg", Object::new(b"jpeg".to_vec(), "image/jpeg")).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::Network(_)));
        assert_eq!(mock.put_calls(), 3);
    }

    #[tokio::test]
    async fn test_permission_denied_is_not_retried() {
        let mock = Arc::new(MockBackend::default());
        mock.fail_next(ErrorKind::PermissionDenied("AccessDenied".to_string()));
        let backend = RetryBackend::new(mock.clone(), policy(3));
        let err = backend.put("cw-cover/1/cover.jpg", Object::new(b"jpeg".to_vec(), "image/jpeg")).await.unwrap_err();
        assert!(err.is_fatal());
        assert_eq!(mock.put_calls(), 1);
    }
}
