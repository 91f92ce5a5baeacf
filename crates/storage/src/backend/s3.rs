//! S3-compatible storage backend.
//!
//! This module provides a storage backend implementation for S3-compatible
//! services including AWS S3, Backblaze B2, Tigris (Fly.io), and others.
//!
//! # Credentials
//!
//! Credentials are provided explicitly via the configuration (file, environment
//! or command-line). There is no fallback to the AWS credential chain.
//!
//! # Retries
//!
//! The SDK's own retry loop is disabled: retries are the job of
//! [`RetryBackend`](super::RetryBackend), which knows which of our
//! [`ErrorKind`]s are worth repeating.

use crate::{
    Object, Receipt, StorageBackend,
    error::{ErrorKind, Result},
    validate_key,
};
use async_trait::async_trait;
use aws_sdk_s3::{
    Client,
    config::{BehaviorVersion, Credentials, Region, http::HttpResponse, retry::RetryConfig, timeout::TimeoutConfig},
    error::{ProvideErrorMetadata, SdkError},
    primitives::ByteStream,
};
use std::time::Duration;

/// Error codes (as returned in the S3 XML error body) that mean the
/// credentials are bad or lack permission.
const AUTH_ERROR_CODES: &[&str] = &[
    "AccessDenied",
    "AllAccessDisabled",
    "AccountProblem",
    "ExpiredToken",
    "InvalidAccessKeyId",
    "InvalidToken",
    "SignatureDoesNotMatch",
    "TokenRefreshRequired",
];
const THROTTLE_ERROR_CODES: &[&str] = &["SlowDown", "Throttling", "ThrottlingException", "RequestLimitExceeded"];
const NOT_FOUND_ERROR_CODES: &[&str] = &["NoSuchBucket", "NoSuchKey", "NotFound"];

/// S3-compatible storage backend.
///
/// Stores objects in an S3 bucket, optionally under a key prefix. All keys are
/// relative to the configured prefix (if any).
///
/// # Supported Services
///
/// - AWS S3
/// - Backblaze B2 (via S3-compatible API)
/// - Tigris (Fly.io storage)
/// - MinIO
/// - Other S3-compatible services
///
/// # Examples
///
/// ```no_run
/// use coverup_storage::backend::S3Backend;
/// use std::time::Duration;
///
/// # fn example() -> coverup_storage::error::Result<()> {
/// let backend = S3Backend::new(
///     "covers",
///     "my-bucket",
///     None,
///     "us-east-1",
///     None::<String>,
///     "access_key_id",
///     "secret_access_key",
///     Some(Duration::from_secs(60)),
/// )?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct S3Backend {
    name: String,
    client: Client,
    bucket: String,
    prefix: Option<String>,
}

impl S3Backend {
    /// Create a new S3 storage backend.
    ///
    /// # Arguments
    /// * `name` - A name for this backend (used in display/logging)
    /// * `bucket` - S3 bucket name
    /// * `prefix` - Optional key prefix (acts as virtual directory)
    /// * `region` - AWS region or provider-specific region (e.g., "us-west-004" for Backblaze)
    /// * `endpoint` - Custom endpoint URL for S3-compatible services
    /// * `key_id` - AWS/provider access key ID
    /// * `key_secret` - AWS/provider secret access key
    /// * `timeout` - Upper bound on a single operation, including upload time
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        name: impl Into<String>,
        bucket: impl Into<String>,
        prefix: Option<String>,
        region: impl Into<String>,
        endpoint: Option<impl Into<String>>,
        key_id: impl Into<String>,
        key_secret: impl Into<String>,
        timeout: Option<Duration>,
    ) -> Result<Self> {
        let prefix = prefix.map(validate_key).transpose()?;
        let region = Region::new(region.into());
        let credentials = Credentials::new(key_id, key_secret, None, None, "coverup-config");
        let mut timeouts = TimeoutConfig::builder();
        if let Some(timeout) = timeout {
            timeouts = timeouts.operation_timeout(timeout);
        }
        let mut config_builder = aws_sdk_s3::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .credentials_provider(credentials)
            .region(region)
            .retry_config(RetryConfig::disabled())
            .timeout_config(timeouts.build())
            // Use path-style addressing for better compatibility with
            // S3-compatible services (Backblaze, MinIO, etc.)
            .force_path_style(true);
        // Set custom endpoint for non-AWS services
        if let Some(endpoint_url) = endpoint {
            config_builder = config_builder.endpoint_url(endpoint_url);
        }
        let client = Client::from_conf(config_builder.build());
        Ok(Self::from_client(name, client, bucket, prefix))
    }

    /// Wrap an already configured client.
    pub fn from_client(name: impl Into<String>, client: Client, bucket: impl Into<String>, prefix: Option<String>) -> Self {
        Self {
            name: name.into(),
            client,
            bucket: bucket.into(),
            prefix,
        }
    }

    /// Construct the full S3 key from a relative key.
    fn full_key(&self, key: &str) -> Result<String> {
        let validated = validate_key(key)?;
        Ok(join_prefix(self.prefix.as_deref(), &validated))
    }
}

fn join_prefix(prefix: Option<&str>, key: &str) -> String {
    match prefix {
        Some(prefix) => format!("{}/{}", prefix.trim_end_matches('/'), key),
        None => key.to_string(),
    }
}

/// Map an S3 error code and/or HTTP status to an actionable error kind.
///
/// HEAD requests carry no body, so only the status is available for those.
fn classify(code: Option<&str>, status: Option<u16>, message: String) -> ErrorKind {
    match (code, status) {
        (Some(code), _) if AUTH_ERROR_CODES.contains(&code) => ErrorKind::PermissionDenied(message),
        (Some(code), _) if THROTTLE_ERROR_CODES.contains(&code) => ErrorKind::Throttled(message),
        (Some(code), _) if NOT_FOUND_ERROR_CODES.contains(&code) => ErrorKind::NotFound(message),
        (_, Some(401 | 403)) => ErrorKind::PermissionDenied(message),
        (_, Some(404)) => ErrorKind::NotFound(message),
        (_, Some(429 | 503)) => ErrorKind::Throttled(message),
        _ => ErrorKind::BackendError(message),
    }
}

/// Convert an SDK error into a storage error.
fn sdk_error<E>(err: SdkError<E, HttpResponse>, context: &str) -> ErrorKind
where
    E: ProvideErrorMetadata + std::error::Error + 'static,
{
    match &err {
        SdkError::TimeoutError(_) => ErrorKind::Network(format!("{context}: timed out")),
        SdkError::DispatchFailure(failure) => ErrorKind::Network(format!("{context}: {failure:?}")),
        SdkError::ConstructionFailure(_) => ErrorKind::BackendError(format!("{context}: could not build request")),
        _ => {
            let status = err.raw_response().map(|response| response.status().as_u16());
            let code = err.code().map(str::to_string);
            let message = match (&code, err.message()) {
                (Some(code), Some(message)) => format!("{context}: {code}: {message}"),
                (Some(code), None) => format!("{context}: {code}"),
                (None, _) => format!("{context}: HTTP {}", status.map_or("?".to_string(), |s| s.to_string())),
            };
            classify(code.as_deref(), status, message)
        },
    }
}

#[async_trait]
impl StorageBackend for S3Backend {
    fn name(&self) -> &str {
        &self.name
    }

    async fn check(&self) -> Result<()> {
        self.client
            .head_bucket()
            .bucket(&self.bucket)
            .send()
            .await
            .map_err(|e| exn::Exn::from(sdk_error(e, &self.bucket)))?;
        tracing::debug!(backend = %self.name, bucket = %self.bucket, "Bucket is reachable");
        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        let full_key = self.full_key(key)?;
        match self.client.head_object().bucket(&self.bucket).key(&full_key).send().await {
            Ok(_) => Ok(true),
            Err(e) => match sdk_error(e, &full_key) {
                ErrorKind::NotFound(_) => Ok(false),
                kind => Err(exn::Exn::from(kind)),
            },
        }
    }

    async fn put(&self, key: &str, object: Object) -> Result<Receipt> {
        let full_key = self.full_key(key)?;
        let size = object.len();
        let mut request = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(&full_key)
            .content_type(object.content_type)
            .body(ByteStream::from(object.bytes));
        if let Some(cache_control) = object.cache_control {
            request = request.cache_control(cache_control);
        }
        let output = request.send().await.map_err(|e| exn::Exn::from(sdk_error(e, &full_key)))?;
        let etag = output.e_tag().map(|tag| tag.trim_matches('"').to_string());
        tracing::debug!(backend = %self.name, key = %full_key, bytes = size, "Uploaded object");
        Ok(Receipt { key: full_key, size, etag })
    }
}
