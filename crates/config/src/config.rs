use crate::error::{Error, ErrorKind, Result};
use crate::layers::{self, Overrides, RawConfig};
use crate::paths::{TrackingLocation, expand_home, tracking_candidates};
use figment::Figment;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Fully resolved and validated configuration. Immutable once loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Calibre library root (the directory containing `metadata.db`).
    pub library: PathBuf,
    /// Explicit tracking database path. When absent the well-known candidate
    /// locations are searched, see [`Config::tracking_location`].
    pub tracking: Option<PathBuf>,
    pub s3: S3Config,
    pub upload: UploadConfig,
    pub thumbnail: ThumbnailConfig,
}

#[derive(Clone, PartialEq, Eq)]
pub struct S3Config {
    pub bucket: String,
    pub region: String,
    pub access_key: String,
    pub secret_key: String,
    /// Custom endpoint for S3-compatible services.
    pub endpoint: Option<String>,
    /// Key prefix prepended to every object key.
    pub prefix: Option<String>,
    /// Public base URL objects are served from.
    pub cdn_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadConfig {
    /// Total attempts per upload, including the first. Always at least one.
    pub attempts: u32,
    /// Delay before the first retry; doubled for every further retry.
    pub backoff: Duration,
    pub timeout: Option<Duration>,
    pub cache_control: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThumbnailConfig {
    /// JPEG quality, `1..=100`.
    pub quality: u8,
}

impl Config {
    /// Load configuration from every layer.
    pub fn load(file: Option<&Path>, overrides: &Overrides) -> Result<Self> {
        Self::from_figment(&layers::figment(file, overrides)?)
    }

    /// Extract and validate from an already built figment.
    pub fn from_figment(figment: &Figment) -> Result<Self> {
        let raw: RawConfig = match figment.extract() {
            Ok(raw) => raw,
            Err(e) => exn::bail!(ErrorKind::Invalid(e.to_string())),
        };
        Self::try_from(raw)
    }

    /// Where the tracking database lives.
    ///
    /// An explicitly configured path always wins. Otherwise the first existing
    /// candidate is used, falling back to creating the first candidate.
    pub fn tracking_location(&self) -> TrackingLocation {
        match &self.tracking {
            Some(path) => TrackingLocation::at(path.clone()),
            None => TrackingLocation::search(&tracking_candidates()),
        }
    }
}

impl S3Config {
    /// Public URL an object key is served from.
    ///
    /// Uses the CDN base when configured, then the custom endpoint (path-style)
    /// and finally the regional AWS endpoint.
    pub fn public_url(&self, key: &str) -> String {
        let key = match &self.prefix {
            Some(prefix) => format!("{}/{}", prefix.trim_matches('/'), key),
            None => key.to_string(),
        };
        match (&self.cdn_url, &self.endpoint) {
            (Some(cdn), _) => format!("{}/{}", cdn.trim_end_matches('/'), key),
            (None, Some(endpoint)) => format!("{}/{}/{}", endpoint.trim_end_matches('/'), self.bucket, key),
            (None, None) => format!("https://s3.{}.amazonaws.com/{}/{}", self.region, self.bucket, key),
        }
    }
}

// Never print credentials.
impl fmt::Debug for S3Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("S3Config")
            .field("bucket", &self.bucket)
            .field("region", &self.region)
            .field("access_key", &"<redacted>")
            .field("secret_key", &"<redacted>")
            .field("endpoint", &self.endpoint)
            .field("prefix", &self.prefix)
            .field("cdn_url", &self.cdn_url)
            .finish()
    }
}

/// Blank values count as unset.
fn present(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

impl TryFrom<RawConfig> for Config {
    type Error = Error;
    fn try_from(raw: RawConfig) -> Result<Self> {
        let bucket = present(raw.s3.bucket);
        let region = present(raw.s3.region);
        let access_key = present(raw.s3.access_key);
        let secret_key = present(raw.s3.secret_key);
        let missing: Vec<&'static str> = [
            ("s3.bucket", bucket.is_none()),
            ("s3.region", region.is_none()),
            ("s3.access_key", access_key.is_none()),
            ("s3.secret_key", secret_key.is_none()),
        ]
        .into_iter()
        .filter_map(|(name, missing)| missing.then_some(name))
        .collect();
        let (Some(bucket), Some(region), Some(access_key), Some(secret_key)) = (bucket, region, access_key, secret_key)
        else {
            exn::bail!(ErrorKind::Missing(missing));
        };

        let attempts = raw.upload.attempts.unwrap_or(layers::DEFAULT_ATTEMPTS);
        if attempts == 0 {
            exn::bail!(ErrorKind::Invalid("upload.attempts must be at least 1".to_string()));
        }
        let quality = raw.thumbnail.quality.unwrap_or(layers::DEFAULT_QUALITY);
        if !(1..=100).contains(&quality) {
            exn::bail!(ErrorKind::Invalid(format!("thumbnail.quality must be between 1 and 100, got {quality}")));
        }
        let library = raw.library.unwrap_or_else(|| PathBuf::from(layers::DEFAULT_LIBRARY));

        Ok(Self {
            library: expand_home(&library),
            tracking: raw.tracking.as_deref().map(expand_home),
            s3: S3Config {
                bucket,
                region,
                access_key,
                secret_key,
                endpoint: present(raw.s3.endpoint),
                prefix: present(raw.s3.prefix).map(|p| p.trim_matches('/').to_string()).filter(|p| !p.is_empty()),
                cdn_url: present(raw.s3.cdn_url),
            },
            upload: UploadConfig {
                attempts,
                backoff: Duration::from_millis(raw.upload.backoff_ms.unwrap_or(layers::DEFAULT_BACKOFF_MS)),
                timeout: match raw.upload.timeout_secs.unwrap_or(layers::DEFAULT_TIMEOUT_SECS) {
                    0 => None,
                    secs => Some(Duration::from_secs(secs)),
                },
                cache_control: present(raw.upload.cache_control)
                    .unwrap_or_else(|| layers::DEFAULT_CACHE_CONTROL.to_string()),
            },
            thumbnail: ThumbnailConfig { quality },
        })
    }
}
