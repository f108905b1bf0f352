//! Foreground pixel extraction.
//!
//! First stage of the detector: binary mask in, [`PixelSet`] out.
//! Pixels are collected in row-major order, which keeps every later
//! stage deterministic.

use image::GrayImage;

use crate::types::{Pixel, PixelSet};

/// Collect the coordinates of every non-zero pixel.
///
/// An image with no foreground yields an empty set; that is not an
/// error and every later stage tolerates it.
#[must_use = "returns the extracted pixel set"]
pub fn extract_features(image: &GrayImage) -> PixelSet {
    let pixels = image
        .enumerate_pixels()
        .filter(|(_, _, p)| p.0[0] != 0)
        .map(|(x, y, _)| Pixel::new(i64::from(x), i64::from(y)))
        .collect();
    PixelSet::new(pixels)
}
