use crate::Resolution;
use crate::error::{ErrorKind, Result};
use exn::{OptionExt, ResultExt};
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat, ImageReader};
use std::io::Cursor;

/// Content type of every generated thumbnail.
pub const THUMBNAIL_CONTENT_TYPE: &str = "image/jpeg";
const DEFAULT_QUALITY: u8 = 85;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
    /// Detected from the magic bytes, not from the file name.
    pub format: ImageFormat,
}
impl Dimensions {
    pub fn longest_edge(&self) -> u32 {
        self.width.max(self.height)
    }
}

/// What would happen to one resolution of a given source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Planned {
    Produce { resolution: Resolution, width: u32, height: u32 },
    /// The source is not larger than the target; thumbnails are never
    /// upscaled, so the resolution is omitted.
    TooSmall { resolution: Resolution },
}
impl Planned {
    pub fn resolution(&self) -> Resolution {
        match self {
            Self::Produce { resolution, .. } | Self::TooSmall { resolution } => *resolution,
        }
    }

    pub fn is_produced(&self) -> bool {
        matches!(self, Self::Produce { .. })
    }
}

/// One encoded resolution of a cover, ready to upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Variant {
    pub resolution: Resolution,
    pub bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub content_type: &'static str,
}

/// Scale `(width, height)` so the longer edge equals `max_edge`, preserving the
/// aspect ratio. Returns `None` when the source already fits.
///
/// ```
/// use coverup_thumbnail::scaled_dimensions;
/// assert_eq!(scaled_dimensions(1000, 1500, 200), Some((133, 200)));
/// assert_eq!(scaled_dimensions(150, 150, 200), None);
/// ```
pub fn scaled_dimensions(width: u32, height: u32, max_edge: u32) -> Option<(u32, u32)> {
    let longest = width.max(height);
    if longest <= max_edge || longest == 0 {
        return None;
    }
    let scale = |edge: u32| -> u32 {
        let scaled = (u64::from(edge) * u64::from(max_edge) + u64::from(longest) / 2) / u64::from(longest);
        // Bounded by `max_edge`, so always fits.
        u32::try_from(scaled).unwrap_or(max_edge).max(1)
    };
    if width >= height { Some((max_edge, scale(height))) } else { Some((scale(width), max_edge)) }
}

/// Produces the resolutions of a cover from its source bytes.
///
/// Purely CPU-bound and synchronous; async callers should run it on a blocking
/// thread.
#[derive(Debug, Clone, Copy)]
pub struct Generator {
    quality: u8,
}
impl Default for Generator {
    fn default() -> Self {
        Self { quality: DEFAULT_QUALITY }
    }
}
impl Generator {
    /// JPEG quality for thumbnails, clamped to `1..=100`.
    pub fn new(quality: u8) -> Self {
        Self { quality: quality.clamp(1, 100) }
    }

    pub fn quality(&self) -> u8 {
        self.quality
    }

    /// Read the image header only. Cheap: nothing is decoded.
    pub fn inspect(&self, bytes: &[u8]) -> Result<Dimensions> {
        let reader = ImageReader::new(Cursor::new(bytes)).with_guessed_format().or_raise(|| ErrorKind::Decode)?;
        let format = reader.format().ok_or_raise(|| ErrorKind::Decode)?;
        let (width, height) = reader.into_dimensions().or_raise(|| ErrorKind::Decode)?;
        Ok(Dimensions { width, height, format })
    }

    /// Decide, for each wanted resolution, whether it would be produced and at
    /// what size.
    pub fn plan(&self, source: &Dimensions, wanted: &[Resolution]) -> Vec<Planned> {
        let mut wanted = wanted.to_vec();
        wanted.sort();
        wanted.dedup();
        wanted
            .into_iter()
            .map(|resolution| match resolution.max_edge() {
                None => Planned::Produce { resolution, width: source.width, height: source.height },
                Some(max_edge) => match scaled_dimensions(source.width, source.height, max_edge) {
                    Some((width, height)) => Planned::Produce { resolution, width, height },
                    None => Planned::TooSmall { resolution },
                },
            })
            .collect()
    }

    /// Produce every wanted resolution that the source is large enough for.
    ///
    /// The original is passed through byte for byte, but is still fully
    /// decoded first so that a corrupt source fails the whole book rather than
    /// being uploaded. Omitted resolutions are simply absent from the result;
    /// use [`Generator::plan`] to find out which ones those are.
    pub fn generate(&self, bytes: &[u8], wanted: &[Resolution]) -> Result<Vec<Variant>> {
        let source = self.inspect(bytes)?;
        let image = image::load_from_memory_with_format(bytes, source.format).or_raise(|| ErrorKind::Decode)?;
        let mut variants = Vec::with_capacity(wanted.len());
        for planned in self.plan(&source, wanted) {
            let Planned::Produce { resolution, width, height } = planned else {
                tracing::trace!(resolution = %planned.resolution(), longest_edge = source.longest_edge(), "Source too small, omitting");
                continue;
            };
            let variant = match resolution {
                Resolution::Original => Variant {
                    resolution,
                    bytes: bytes.to_vec(),
                    width,
                    height,
                    content_type: source.format.to_mime_type(),
                },
                _ => Variant {
                    resolution,
                    bytes: self.encode(&image.resize_exact(width, height, FilterType::Lanczos3), resolution)?,
                    width,
                    height,
                    content_type: THUMBNAIL_CONTENT_TYPE,
                },
            };
            variants.push(variant);
        }
        Ok(variants)
    }

    /// Encode as a baseline JPEG at the configured quality, with the standard
    /// Huffman tables (no optimisation pass). Alpha and palette images are
    /// flattened to RGB.
    fn encode(&self, image: &DynamicImage, resolution: Resolution) -> Result<Vec<u8>> {
        let rgb = image.to_rgb8();
        let mut buffer = Vec::new();
        JpegEncoder::new_with_quality(&mut buffer, self.quality)
            .encode_image(&rgb)
            .or_raise(|| ErrorKind::Encode(resolution.as_str()))?;
        Ok(buffer)
    }
}
