//! In-memory storage backend for testing.

use crate::error::{ErrorKind, Result};
use crate::key::validate as validate_key;
use crate::{Object, Receipt, StorageBackend};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// In-memory storage backend for testing.
///
/// Objects are stored in a `HashMap` behind a [`Mutex`], so all trait methods
/// can operate on `&self` without external synchronisation, and tests can
/// inspect the contents synchronously. Failures can be queued up to simulate
/// network or credential problems.
///
/// # Examples
///
/// ```
/// use coverup_storage::backend::{MockBackend, StorageBackend};
/// use coverup_storage::Object;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let backend = MockBackend::with_objects([("cw-cover/1/cover.jpg", b"jpeg")]);
/// assert!(backend.contains("cw-cover/1/cover.jpg"));
///
/// backend.put("cw-cover/2/cover.jpg", Object::new(b"data".to_vec(), "image/jpeg")).await.unwrap();
/// assert_eq!(backend.put_calls(), 1);
/// # Ok(())
/// # }
/// ```
pub struct MockBackend {
    name: String,
    storage: Mutex<HashMap<String, Object>>,
    put_failures: Mutex<VecDeque<ErrorKind>>,
    check_failure: Mutex<Option<ErrorKind>>,
    put_calls: AtomicUsize,
}

impl MockBackend {
    /// Create a mock backend pre-populated with objects.
    ///
    /// Panics if any key fails validation. If test setup is wrong, then test
    /// should not pass.
    pub fn with_objects(objects: impl IntoIterator<Item = (impl Into<String>, impl Into<Vec<u8>>)>) -> Self {
        let mut map = HashMap::new();
        for (key, data) in objects {
            let key = key.into();
            let Ok(validated) = validate_key(&key) else {
                // The panic here is DELIBERATE. MockBackend is intended to be
                // used in tests; panics are expected. There is no error result.
                panic!("MockBackend::with_objects: invalid key {key}");
            };
            map.insert(validated, Object::new(data, "application/octet-stream"));
        }
        Self {
            name: "mock".to_string(),
            storage: Mutex::new(map),
            put_failures: Mutex::new(VecDeque::new()),
            check_failure: Mutex::new(None),
            put_calls: AtomicUsize::new(0),
        }
    }

    /// Queue a failure for an upcoming [`put()`](StorageBackend::put). Queued
    /// failures are consumed in order, one per call.
    pub fn fail_next(&self, kind: ErrorKind) {
        lock(&self.put_failures).push_back(kind);
    }

    /// Make every [`check()`](StorageBackend::check) fail.
    pub fn fail_check(&self, kind: ErrorKind) {
        *lock(&self.check_failure) = Some(kind);
    }

    /// Number of `put()` calls made so far, including failed ones.
    pub fn put_calls(&self) -> usize {
        self.put_calls.load(Ordering::SeqCst)
    }

    pub fn contains(&self, key: &str) -> bool {
        lock(&self.storage).contains_key(key)
    }

    pub fn get(&self, key: &str) -> Option<Object> {
        lock(&self.storage).get(key).cloned()
    }

    /// All stored keys, sorted.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = lock(&self.storage).keys().cloned().collect();
        keys.sort();
        keys
    }

    pub fn remove(&self, key: &str) -> bool {
        lock(&self.storage).remove(key).is_some()
    }
}
impl Default for MockBackend {
    fn default() -> Self {
        let objects: [(&str, &[u8]); 0] = [];
        Self::with_objects(objects)
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[async_trait]
impl StorageBackend for MockBackend {
    fn name(&self) -> &str {
        &self.name
    }

    async fn check(&self) -> Result<()> {
        match lock(&self.check_failure).clone() {
            Some(kind) => Err(exn::Exn::from(kind)),
            None => Ok(()),
        }
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        let key = validate_key(key)?;
        Ok(lock(&self.storage).contains_key(&key))
    }

    async fn put(&self, key: &str, object: Object) -> Result<Receipt> {
        self.put_calls.fetch_add(1, Ordering::SeqCst);
        let key = validate_key(key)?;
        if let Some(kind) = lock(&self.put_failures).pop_front() {
            return Err(exn::Exn::from(kind));
        }
        let size = object.len();
        let etag = format!("{:016x}", fingerprint(&object.bytes));
        lock(&self.storage).insert(key.clone(), object);
        Ok(Receipt { key, size, etag: Some(etag) })
    }
}

/// FNV-1a, good enough for a fake ETag.
fn fingerprint(bytes: &[u8]) -> u64 {
    bytes.iter().fold(0xcbf29ce484222325, |hash, byte| (hash ^ u64::from(*byte)).wrapping_mul(0x100000001b3))
}
