//! Conversions between uploaded bytes and in-memory RGB pixel buffers.

use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::RgbImage;
use thiserror::Error;

/// JPEG quality used when forwarding an image to the explainer.
const ATTACHMENT_JPEG_QUALITY: u8 = 85;

#[derive(Error, Debug)]
pub enum ImageCodecError {
    #[error("Unsupported or corrupt image: {0}")]
    Decode(image::ImageError),

    #[error("Failed to encode image: {0}")]
    Encode(image::ImageError),
}

/// Decode any supported format and normalise it to 8-bit, 3-channel RGB.
pub fn decode_rgb(bytes: &[u8]) -> Result<RgbImage, ImageCodecError> {
    let image = image::load_from_memory(bytes).map_err(ImageCodecError::Decode)?;
    Ok(image.to_rgb8())
}

/// Encode an image as JPEG for inline transport, shrinking it first so the
/// longest side is at most `max_side` pixels.
pub fn encode_attachment(image: &RgbImage, max_side: u32) -> Result<Vec<u8>, ImageCodecError> {
    let (width, height) = image.dimensions();
    let longest = width.max(height);

    let mut buf = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut buf, ATTACHMENT_JPEG_QUALITY);

    if longest > max_side && max_side > 0 {
        let scale = f64::from(max_side) / f64::from(longest);
        let new_width = ((f64::from(width) * scale).round() as u32).max(1);
        let new_height = ((f64::from(height) * scale).round() as u32).max(1);
        let resized = image::imageops::resize(image, new_width, new_height, FilterType::Triangle);
        resized
            .write_with_encoder(encoder)
            .map_err(ImageCodecError::Encode)?;
    } else {
        image
            .write_with_encoder(encoder)
            .map_err(ImageCodecError::Encode)?;
    }

    Ok(buf)
}

#[cfg(test)]
pub(crate) fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    use image::{DynamicImage, ImageFormat, Rgb};
    use std::io::Cursor;

    let image = RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x * 7 % 256) as u8, (y * 13 % 256) as u8, 128])
    });
    let mut buf = Vec::new();
    DynamicImage::ImageRgb8(image)
        .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
        .expect("encode png");
    buf
}
