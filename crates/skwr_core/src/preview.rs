//! Flat preview export.
//!
//! Resolves every deep pixel with front-to-back "over" compositing and
//! writes an 8-bit RGBA PNG.

use std::path::Path;

use image::RgbaImage;
use skwr_math::Spectrum;
use thiserror::Error;

use crate::DeepImageBuffer;

/// Errors that can occur while writing a preview.
#[derive(Error, Debug)]
pub enum PreviewError {
    #[error("Image encoding error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Preview size {0}x{1} is empty")]
    Empty(u32, u32),
}

/// Apply gamma correction (gamma = 2.0).
#[inline]
pub fn linear_to_gamma(linear: f32) -> f32 {
    if linear > 0.0 {
        linear.sqrt()
    } else {
        0.0
    }
}

/// Convert a straight (unpremultiplied) color and alpha to 8-bit RGBA.
pub fn color_to_rgba(color: Spectrum, alpha: f32) -> [u8; 4] {
    let to_byte = |v: f32| (255.0 * v.clamp(0.0, 1.0)) as u8;
    [
        to_byte(linear_to_gamma(color.x)),
        to_byte(linear_to_gamma(color.y)),
        to_byte(linear_to_gamma(color.z)),
        to_byte(alpha),
    ]
}

/// Flatten the deep buffer into row-major RGBA bytes.
pub fn flatten_to_rgba8(buffer: &DeepImageBuffer) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(buffer.pixels().len() * 4);
    for pixel in buffer.pixels() {
        let (premultiplied, alpha) = pixel.flatten();
        let straight = if alpha > 0.0 {
            premultiplied / alpha
        } else {
            Spectrum::ZERO
        };
        bytes.extend_from_slice(&color_to_rgba(straight, alpha));
    }
    bytes
}

/// Write a flattened PNG preview of the buffer.
pub fn save_preview_png(buffer: &DeepImageBuffer, path: impl AsRef<Path>) -> Result<(), PreviewError> {
    let (width, height) = (buffer.width(), buffer.height());
    let image = RgbaImage::from_raw(width, height, flatten_to_rgba8(buffer))
        .filter(|_| width > 0 && height > 0)
        .ok_or(PreviewError::Empty(width, height))?;
    image.save(path.as_ref())?;
    log::info!("Saved preview {}", path.as_ref().display());
    Ok(())
}
