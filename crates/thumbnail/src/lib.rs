//! Cover resolutions and thumbnail generation.
//!
//! A cover is published at four [`Resolution`]s: the untouched original and
//! three downscaled JPEG thumbnails. Thumbnails are never upscaled: when the
//! source is not larger than a target, that resolution is simply omitted.

pub mod error;
mod generate;
mod resolution;

pub use crate::generate::{Dimensions, Generator, Planned, THUMBNAIL_CONTENT_TYPE, Variant, scaled_dimensions};
pub use crate::resolution::{KEY_ROOT, Resolution, destination_key};
