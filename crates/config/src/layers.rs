use crate::error::{ErrorKind, Result};
use figment::Figment;
use figment::providers::{Env, Format, Json, Serialized, Toml, Yaml};
use serde::{Deserialize, Deserializer, Serialize};
use std::path::{Path, PathBuf};

/// Name of the configuration file looked for in the platform config directory.
pub const CONFIG_FILENAME: &str = "coverup.toml";

pub(crate) const DEFAULT_LIBRARY: &str = "~/calibre-web";
pub(crate) const DEFAULT_REGION: &str = "us-east-1";
pub(crate) const DEFAULT_ATTEMPTS: u32 = 3;
pub(crate) const DEFAULT_BACKOFF_MS: u64 = 500;
pub(crate) const DEFAULT_TIMEOUT_SECS: u64 = 60;
pub(crate) const DEFAULT_CACHE_CONTROL: &str = "public, max-age=31536000";
pub(crate) const DEFAULT_QUALITY: u8 = 85;

/// Object store settings that can come straight from `S3_*` variables.
const S3_ENV_KEYS: &[&str] = &["bucket", "region", "access_key", "secret_key", "endpoint", "prefix", "cdn_url"];

/// `coverup.toml` in the platform configuration directory, e.g.
/// `~/.config/coverup/coverup.toml` on Linux.
pub fn default_config_file() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "coverup").map(|dirs| dirs.config_dir().join(CONFIG_FILENAME))
}

/// Settings given on the command line. `None` leaves lower layers untouched.
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub library: Option<PathBuf>,
    pub tracking: Option<PathBuf>,
    pub bucket: Option<String>,
    pub region: Option<String>,
    pub access_key: Option<String>,
    pub secret_key: Option<String>,
    pub endpoint: Option<String>,
    pub prefix: Option<String>,
}

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct RawConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) library: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) tracking: Option<PathBuf>,
    pub(crate) s3: RawS3,
    pub(crate) upload: RawUpload,
    pub(crate) thumbnail: RawThumbnail,
}

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct RawS3 {
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "string_like")]
    pub(crate) bucket: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "string_like")]
    pub(crate) region: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "string_like")]
    pub(crate) access_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "string_like")]
    pub(crate) secret_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "string_like")]
    pub(crate) endpoint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "string_like")]
    pub(crate) prefix: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "string_like")]
    pub(crate) cdn_url: Option<String>,
}

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct RawUpload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) attempts: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) backoff_ms: Option<u64>,
    /// Zero disables the timeout.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) timeout_secs: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) cache_control: Option<String>,
}

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct RawThumbnail {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) quality: Option<u8>,
}

impl RawConfig {
    pub(crate) fn defaults() -> Self {
        Self {
            library: Some(PathBuf::from(DEFAULT_LIBRARY)),
            tracking: None,
            s3: RawS3 { region: Some(DEFAULT_REGION.to_string()), ..Default::default() },
            upload: RawUpload {
                attempts: Some(DEFAULT_ATTEMPTS),
                backoff_ms: Some(DEFAULT_BACKOFF_MS),
                timeout_secs: Some(DEFAULT_TIMEOUT_SECS),
                cache_control: Some(DEFAULT_CACHE_CONTROL.to_string()),
            },
            thumbnail: RawThumbnail { quality: Some(DEFAULT_QUALITY) },
        }
    }
}

impl From<&Overrides> for RawConfig {
    fn from(overrides: &Overrides) -> Self {
        Self {
            library: overrides.library.clone(),
            tracking: overrides.tracking.clone(),
            s3: RawS3 {
                bucket: overrides.bucket.clone(),
                region: overrides.region.clone(),
                access_key: overrides.access_key.clone(),
                secret_key: overrides.secret_key.clone(),
                endpoint: overrides.endpoint.clone(),
                prefix: overrides.prefix.clone(),
                cdn_url: None,
            },
            ..Default::default()
        }
    }
}

/// Build the layered figment. `file` must exist if given; without it the
/// default configuration file is used when present.
pub(crate) fn figment(file: Option<&Path>, overrides: &Overrides) -> Result<Figment> {
    let figment = Figment::from(Serialized::defaults(RawConfig::defaults()));
    let figment = match file {
        Some(path) if !path.is_file() => exn::bail!(ErrorKind::File(path.to_path_buf())),
        Some(path) => merge_file(figment, path)?,
        None => match default_config_file().filter(|path| path.is_file()) {
            Some(path) => merge_file(figment, &path)?,
            None => figment,
        },
    };
    Ok(figment
        .merge(
            Env::prefixed("S3_")
                .only(S3_ENV_KEYS)
                .map(|key| format!("s3.{}", key.as_str().to_ascii_lowercase()).into()),
        )
        .merge(Env::prefixed("COVERUP_").split("__"))
        .merge(Serialized::defaults(RawConfig::from(overrides))))
}

fn merge_file(figment: Figment, path: &Path) -> Result<Figment> {
    tracing::debug!(path = %path.display(), "Loading configuration file");
    let extension = path.extension().and_then(|ext| ext.to_str()).map(str::to_ascii_lowercase);
    Ok(match extension.as_deref() {
        Some("toml") => figment.merge(Toml::file_exact(path)),
        Some("yaml" | "yml") => figment.merge(Yaml::file_exact(path)),
        Some("json") => figment.merge(Json::file_exact(path)),
        _ => exn::bail!(ErrorKind::File(path.to_path_buf())),
    })
}

/// Environment values that look like numbers or booleans arrive as such; keys
/// and bucket names must still be read as strings.
fn string_like<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Option<String>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum StringLike {
        String(String),
        Unsigned(u64),
        Signed(i64),
        Float(f64),
        Bool(bool),
    }
    Ok(Option::<StringLike>::deserialize(deserializer)?.map(|value| match value {
        StringLike::String(s) => s,
        StringLike::Unsigned(n) => n.to_string(),
        StringLike::Signed(n) => n.to_string(),
        StringLike::Float(n) => n.to_string(),
        StringLike::Bool(b) => b.to_string(),
    }))
}
