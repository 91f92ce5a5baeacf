//! Configuration for a cover migration run.
//!
//! Settings are layered with [`figment`], later layers winning:
//!
//! 1. built-in defaults,
//! 2. an optional configuration file (TOML, YAML or JSON),
//! 3. the environment (`S3_*` for the object store, `COVERUP_*` for the rest),
//! 4. command-line [`Overrides`].
//!
//! The result is validated once into an immutable [`Config`] which is then
//! passed by reference to everything that needs it.

mod config;
pub mod error;
mod layers;
mod paths;

pub use crate::config::{Config, S3Config, ThumbnailConfig, UploadConfig};
pub use crate::layers::{CONFIG_FILENAME, Overrides, default_config_file};
pub use crate::paths::{TrackingLocation, expand_home, tracking_candidates};
