//! Shared test utilities: synthetic image fixtures.
//!
//! Every image used in tests is generated in-memory — the suite never
//! depends on binary fixture files. The gradient fill makes resize and
//! grayscale effects observable without being sensitive to codec noise.

use image::codecs::gif::GifEncoder;
use image::codecs::jpeg::JpegEncoder;
use image::{Delay, Frame, ImageEncoder, ImageFormat, RgbImage, RgbaImage};
use std::io::Cursor;

fn gradient(width: u32, height: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x % 256) as u8, (y % 256) as u8, 128])
    })
}

/// A valid JPEG with the given dimensions.
pub fn jpeg_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = gradient(width, height);
    let mut out = Cursor::new(Vec::new());
    JpegEncoder::new_with_quality(&mut out, 90)
        .write_image(
            img.as_raw(),
            width,
            height,
            image::ExtendedColorType::Rgb8,
        )
        .unwrap();
    out.into_inner()
}

/// A valid PNG with an alpha channel, for encoder pixel-type edge cases.
pub fn png_rgba_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = RgbaImage::from_fn(width, height, |x, y| {
        image::Rgba([(x % 256) as u8, (y % 256) as u8, 128, 200])
    });
    let mut out = Cursor::new(Vec::new());
    image::DynamicImage::ImageRgba8(img)
        .write_to(&mut out, ImageFormat::Png)
        .unwrap();
    out.into_inner()
}

/// A two-frame animated GIF. Decoding must take the first frame rather
/// than fail.
pub fn animated_gif_bytes(width: u32, height: u32) -> Vec<u8> {
    let frame_at = |offset: u8| {
        let img = RgbaImage::from_fn(width, height, |x, y| {
            image::Rgba([
                ((x + u32::from(offset)) % 256) as u8,
                (y % 256) as u8,
                128,
                255,
            ])
        });
        Frame::from_parts(img, 0, 0, Delay::from_numer_denom_ms(100, 1))
    };

    let mut out = Cursor::new(Vec::new());
    {
        let mut encoder = GifEncoder::new(&mut out);
        encoder.encode_frame(frame_at(0)).unwrap();
        encoder.encode_frame(frame_at(64)).unwrap();
    }
    out.into_inner()
}
