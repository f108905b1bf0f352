//! Binary mask decoding.
//!
//! Accepts raw image bytes (PNG, JPEG, BMP, WebP) and produces the
//! single-channel mask the detector consumes. Any non-zero pixel is
//! foreground; [`binarize`] is available for sources that are not
//! already strictly binary (e.g. lossy JPEG masks).

use image::GrayImage;

use crate::types::LaneError;

/// Foreground value written by [`binarize`].
pub const FOREGROUND: u8 = 255;

/// Decode raw image bytes into an 8-bit single-channel image.
///
/// Color inputs are reduced with the standard luminance weights; the
/// values are otherwise left untouched.
///
/// # Errors
///
/// Returns [`LaneError::EmptyInput`] if `bytes` is empty.
/// Returns [`LaneError::ImageDecode`] if the image format is
/// unrecognized or the data is corrupt.
#[must_use = "returns the decoded mask"]
pub fn decode_binary(bytes: &[u8]) -> Result<GrayImage, LaneError> {
    if bytes.is_empty() {
        return Err(LaneError::EmptyInput);
    }

    let img = image::load_from_memory(bytes)?;
    Ok(img.to_luma8())
}

/// Threshold a grayscale image into a strict 0/255 mask.
///
/// Values strictly greater than `threshold` become [`FOREGROUND`],
/// everything else becomes 0.
#[must_use = "returns the thresholded mask"]
pub fn binarize(image: &GrayImage, threshold: u8) -> GrayImage {
    GrayImage::from_fn(image.width(), image.height(), |x, y| {
        if image.get_pixel(x, y).0[0] > threshold {
            image::Luma([FOREGROUND])
        } else {
            image::Luma([0])
        }
    })
}
