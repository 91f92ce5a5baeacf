//! Storage models.

/// An object ready to be written to a storage backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Object {
    pub bytes: Vec<u8>,
    /// MIME type sent as the `Content-Type` header.
    pub content_type: String,
    /// Sent as the `Cache-Control` header, if set.
    pub cache_control: Option<String>,
}
impl Object {
    pub fn new(bytes: impl Into<Vec<u8>>, content_type: impl Into<String>) -> Self {
        Self {
            bytes: bytes.into(),
            content_type: content_type.into(),
            cache_control: None,
        }
    }

    pub fn with_cache_control(mut self, cache_control: impl Into<String>) -> Self {
        self.cache_control = Some(cache_control.into());
        self
    }

    pub fn len(&self) -> u64 {
        self.bytes.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Acknowledgement returned by a backend after a successful write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Receipt {
    /// Full key the object was stored under (including any backend prefix).
    pub key: String,
    /// Number of bytes written.
    pub size: u64,
    /// Entity tag reported by the backend, quotes stripped.
    pub etag: Option<String>,
}
