//! Decoding, encoding, and the output-format allow-list.
//!
//! Decoding guesses the container from the bytes themselves (never from the
//! request path) and takes the first frame of animated sources, so a GIF or
//! animated WebP origin decodes instead of failing.
//!
//! Encoding is per-format:
//!
//! | Format | Encoder | Quality |
//! |---|---|---|
//! | JPEG | `JpegEncoder::new_with_quality` | honored (encoder default when absent) |
//! | PNG | `DynamicImage::write_to` | lossless, ignored |
//! | WebP | `WebPEncoder::new_lossless` | ignored (the `image` crate only ships the lossless encoder) |
//! | GIF | `DynamicImage::write_to` | ignored |

use crate::ops::Quality;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::webp::WebPEncoder;
use image::{DynamicImage, ImageFormat, ImageReader};
use std::io::Cursor;
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum TransformError {
    #[error("source image format not recognized")]
    UnknownFormat,
    #[error("failed to decode source image: {0}")]
    Decode(String),
    #[error("failed to encode output image: {0}")]
    Encode(String),
    #[error("invalid resize target {width}x{height}")]
    InvalidResize { width: u32, height: u32 },
}

/// Content type reported when the origin object declares none and no
/// format conversion happened.
pub const DEFAULT_CONTENT_TYPE: &str = "image/jpeg";

/// Output formats a request may ask for. Anything else falls back to the
/// pass-through format instead of erroring.
///
/// `Jpeg` and `Jpg` are the same codec but distinct allow-list entries,
/// because their content-type values differ — see [`content_type`](Self::content_type).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Jpeg,
    Jpg,
    Png,
    WebP,
}

impl OutputFormat {
    /// Parse an allow-list member; exact lowercase match only.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "jpeg" => Some(Self::Jpeg),
            "jpg" => Some(Self::Jpg),
            "png" => Some(Self::Png),
            "webp" => Some(Self::WebP),
            _ => None,
        }
    }

    /// Content type served after a conversion to this format.
    ///
    /// `jpeg`/`jpg` are intentionally crossed (`jpeg` → `image/jpg`,
    /// `jpg` → `image/jpeg`): the original service shipped this table and
    /// cached variants under these types, so correcting it would change
    /// responses for existing URLs. Do not "fix" silently.
    pub fn content_type(self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpg",
            Self::Jpg => "image/jpeg",
            Self::Png => "image/png",
            Self::WebP => "image/webp",
        }
    }

    /// The codec used to encode this format.
    pub fn image_format(self) -> ImageFormat {
        match self {
            Self::Jpeg | Self::Jpg => ImageFormat::Jpeg,
            Self::Png => ImageFormat::Png,
            Self::WebP => ImageFormat::WebP,
        }
    }
}

/// Decode origin bytes, returning the image and the detected container
/// format (used as the pass-through output format).
pub fn decode(bytes: &[u8]) -> Result<(DynamicImage, ImageFormat), TransformError> {
    let reader = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| TransformError::Decode(e.to_string()))?;
    let format = reader.format().ok_or(TransformError::UnknownFormat)?;
    let img = reader
        .decode()
        .map_err(|e| TransformError::Decode(e.to_string()))?;
    Ok((img, format))
}

/// Encode `img` as `format`, passing `quality` where the encoder takes one.
pub fn encode(
    img: &DynamicImage,
    format: ImageFormat,
    quality: Option<Quality>,
) -> Result<Vec<u8>, TransformError> {
    let mut out = Cursor::new(Vec::new());
    match format {
        ImageFormat::Jpeg => {
            // The JPEG encoder has no alpha channel; drop it up front
            // instead of letting the encoder reject the pixel type.
            let img = flatten_alpha(img);
            let result = match quality {
                Some(q) => {
                    let encoder = JpegEncoder::new_with_quality(&mut out, q.value() as u8);
                    img.write_with_encoder(encoder)
                }
                None => img.write_with_encoder(JpegEncoder::new(&mut out)),
            };
            result.map_err(|e| TransformError::Encode(e.to_string()))?;
        }
        ImageFormat::WebP => {
            if quality.is_some() {
                debug!("webp encoder is lossless, quality ignored");
            }
            // Lossless WebP takes Rgb8/Rgba8 only.
            let rgba = DynamicImage::ImageRgba8(img.to_rgba8());
            rgba.write_with_encoder(WebPEncoder::new_lossless(&mut out))
                .map_err(|e| TransformError::Encode(e.to_string()))?;
        }
        ImageFormat::Gif => {
            let rgba = DynamicImage::ImageRgba8(img.to_rgba8());
            rgba.write_to(&mut out, ImageFormat::Gif)
                .map_err(|e| TransformError::Encode(e.to_string()))?;
        }
        other => {
            img.write_to(&mut out, other)
                .map_err(|e| TransformError::Encode(e.to_string()))?;
        }
    }
    Ok(out.into_inner())
}

/// Composite any alpha away for encoders that cannot carry it.
fn flatten_alpha(img: &DynamicImage) -> DynamicImage {
    if img.color().has_alpha() {
        DynamicImage::ImageRgb8(img.to_rgb8())
    } else {
        img.clone()
    }
}
