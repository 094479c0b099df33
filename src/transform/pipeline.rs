//! Fixed-order application of a transform plan.
//!
//! Order: resize → grayscale → rotate → flip → format/quality. The order is
//! part of the service contract: a cached variant was produced under it, so
//! a reordered pipeline would serve visually different bytes for the same
//! URL.

use super::codec::{self, DEFAULT_CONTENT_TYPE, TransformError};
use crate::ops::{TransformPlan, TransformRequest};
use image::DynamicImage;
use image::imageops::FilterType;
use imageproc::geometric_transformations::{Interpolation, rotate_about_center};

/// Output of the pipeline: encoded bytes plus the content type to serve
/// and to record on the stored variant. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformResult {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

/// Apply `plan` to origin bytes.
///
/// A [`TransformPlan::PassThrough`] returns the origin bytes untouched with
/// the origin's content type (`image/jpeg` when the origin declared none).
/// Otherwise the bytes are decoded, operations run in the fixed order, and
/// the result is re-encoded — to the requested format when one was allowed,
/// to the detected input format when not.
pub fn apply(
    bytes: &[u8],
    origin_content_type: Option<&str>,
    plan: &TransformPlan,
) -> Result<TransformResult, TransformError> {
    let passthrough_type = origin_content_type.unwrap_or(DEFAULT_CONTENT_TYPE);

    let TransformPlan::Apply(request) = plan else {
        return Ok(TransformResult {
            bytes: bytes.to_vec(),
            content_type: passthrough_type.to_string(),
        });
    };

    let (img, input_format) = codec::decode(bytes)?;
    let img = run_operations(img, request)?;

    match request.format {
        Some(format) => Ok(TransformResult {
            bytes: codec::encode(&img, format.image_format(), request.quality)?,
            content_type: format.content_type().to_string(),
        }),
        // No allowed format requested: keep the input codec and the
        // origin's declared content type. Quality only rides along with an
        // explicit format conversion.
        None => Ok(TransformResult {
            bytes: codec::encode(&img, input_format, None)?,
            content_type: passthrough_type.to_string(),
        }),
    }
}

fn run_operations(
    mut img: DynamicImage,
    request: &TransformRequest,
) -> Result<DynamicImage, TransformError> {
    if let Some((width, height)) = request.resize {
        if width == 0 || height == 0 {
            return Err(TransformError::InvalidResize { width, height });
        }
        // Cover semantics: scale to fill the target box, center-crop the
        // overflow, so output dimensions are exactly width x height.
        img = img.resize_to_fill(width, height, FilterType::Lanczos3);
    }

    if request.grayscale {
        img = img.grayscale();
    }

    if let Some(degrees) = request.rotate {
        img = rotate(img, degrees);
    }

    if request.flip {
        img = img.flipv();
    }

    Ok(img)
}

/// Rotate clockwise by an arbitrary number of degrees.
///
/// Multiples of 90 use exact pixel remapping (the canvas swaps dimensions
/// for 90/270). Other angles interpolate about the center onto a
/// same-sized canvas with black fill.
fn rotate(img: DynamicImage, degrees: i32) -> DynamicImage {
    match degrees.rem_euclid(360) {
        0 => img,
        90 => img.rotate90(),
        180 => img.rotate180(),
        270 => img.rotate270(),
        _ => {
            let theta = (degrees as f32).to_radians();
            let rotated = rotate_about_center(
                &img.to_rgba8(),
                theta,
                Interpolation::Bilinear,
                image::Rgba([0, 0, 0, 255]),
            );
            DynamicImage::ImageRgba8(rotated)
        }
    }
}
