//! Lane overlay rendering.
//!
//! The mask is replicated into three channels, the area between the two
//! boundaries is filled with one horizontal segment per sampled row,
//! and a small circle marks the lane center at the reference row.
//!
//! Rows are sampled as `height` evenly spaced values over `0..=height`
//! and truncated, so the bottom row of the canvas is never filled.
//!
//! Rendering needs both curves. When either is missing the unannotated
//! base image is returned with `success == false` and offset `0`; the
//! check happens before any curve is evaluated.

use image::{GrayImage, Rgb, RgbImage};
use imageproc::drawing::{draw_hollow_circle_mut, draw_line_segment_mut};

use crate::center::measure_center;
use crate::fit::FittedCurves;
use crate::types::{LaneConfig, LaneCurve, LaneDetection};

/// Color of the lane fill.
pub const LINE_COLOR: Rgb<u8> = Rgb([0, 255, 0]);

/// Color of the lane-center marker.
pub const MARKER_COLOR: Rgb<u8> = Rgb([0, 0, 255]);

/// Radius of the lane-center marker in pixels.
pub const MARKER_RADIUS: i32 = 2;

/// Copy a single-channel image into all three channels.
#[must_use = "returns the three-channel image"]
pub fn replicate_channels(image: &GrayImage) -> RgbImage {
    RgbImage::from_fn(image.width(), image.height(), |x, y| {
        let v = image.get_pixel(x, y).0[0];
        Rgb([v, v, v])
    })
}

/// `count` evenly spaced values from `0` to `end`, both inclusive.
#[allow(clippy::cast_precision_loss)]
pub fn sample_rows(end: u32, count: u32) -> impl Iterator<Item = f64> {
    let step = if count > 1 {
        f64::from(end) / f64::from(count - 1)
    } else {
        0.0
    };
    (0..count).map(move |i| f64::from(i) * step)
}

/// Render the detection result for one frame.
#[must_use = "returns the rendered detection"]
pub fn render_overlay(
    image: &GrayImage,
    curves: &FittedCurves,
    config: &LaneConfig,
) -> LaneDetection {
    let mut overlay = replicate_channels(image);

    let Some((left, right)) = curves.both() else {
        return LaneDetection {
            overlay,
            success: false,
            offset: 0,
            left_curve: curves.left,
            right_curve: curves.right,
        };
    };

    draw_lane_fill(&mut overlay, left, right);

    let offset = measure_center(left, right, config.reference_row);
    if (0..=i64::from(config.reference_width)).contains(&offset)
        && let (Ok(x), Ok(y)) = (i32::try_from(offset), i32::try_from(config.reference_row))
    {
        draw_hollow_circle_mut(&mut overlay, (x, y), MARKER_RADIUS, MARKER_COLOR);
    }

    LaneDetection {
        overlay,
        success: true,
        offset,
        left_curve: Some(*left),
        right_curve: Some(*right),
    }
}

/// Draw one horizontal segment per sampled row between the boundaries.
///
/// Sample rows and boundary columns are truncated toward zero. Columns
/// are clamped to one pixel beyond each image edge first; segments on a
/// single row lose nothing visible by this and far-off evaluations stay
/// cheap.
#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
fn draw_lane_fill(overlay: &mut RgbImage, left: &LaneCurve, right: &LaneCurve) {
    let (width, height) = overlay.dimensions();
    let max_x = f64::from(width);

    for sample in sample_rows(height, height) {
        let y = sample.trunc();
        if y >= f64::from(height) {
            continue;
        }
        let xl = left.evaluate(sample).trunc();
        let xr = right.evaluate(sample).trunc();
        if !(xl.is_finite() && xr.is_finite()) {
            continue;
        }
        let xl = xl.clamp(-1.0, max_x) as f32;
        let xr = xr.clamp(-1.0, max_x) as f32;
        let y = y as f32;
        draw_line_segment_mut(overlay, (xl, y), (xr, y), LINE_COLOR);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::fit::Mirroring;

    fn curves(left: Option<LaneCurve>, right: Option<LaneCurve>) -> FittedCurves {
        FittedCurves {
            left,
            right,
            mirroring: Mirroring::None,
            left_points: 0,
            right_points: 0,
        }
    }

    fn vertical(x: f64) -> LaneCurve {
        LaneCurve::new(0.0, 0.0, x)
    }

    fn config(reference_width: u32, reference_row: u32) -> LaneConfig {
        LaneConfig {
            reference_width,
            reference_row,
            ..LaneConfig::default()
        }
    }

    #[test]
    fn replicate_copies_value_into_each_channel() {
        let mut img = GrayImage::new(3, 2);
        img.put_pixel(1, 1, image::Luma([7]));
        let rgb = replicate_channels(&img);
        assert_eq!(rgb.get_pixel(1, 1), &Rgb([7, 7, 7]));
        assert_eq!(rgb.get_pixel(0, 0), &Rgb([0, 0, 0]));
    }

    #[test]
    #[allow(clippy::float_cmp)]
    fn sample_rows_span_both_ends() {
        let rows: Vec<f64> = sample_rows(10, 6).collect();
        assert_eq!(rows, vec![0.0, 2.0, 4.0, 6.0, 8.0, 10.0]);
        assert_eq!(sample_rows(10, 1).collect::<Vec<_>>(), vec![0.0]);
        assert_eq!(sample_rows(10, 0).count(), 0);
    }

    #[test]
    fn missing_curve_returns_unannotated_image() {
        let mut img = GrayImage::new(20, 10);
        img.put_pixel(3, 3, image::Luma([255]));

        for fitted in [
            curves(None, None),
            curves(Some(vertical(5.0)), None),
            curves(None, Some(vertical(15.0))),
        ] {
            let detection = render_overlay(&img, &fitted, &config(20, 5));
            assert!(!detection.success);
            assert_eq!(detection.offset, 0);
            assert_eq!(detection.overlay, replicate_channels(&img));
            assert_eq!(detection.left_curve, fitted.left);
            assert_eq!(detection.right_curve, fitted.right);
        }
    }

    #[test]
    fn fill_spans_between_boundaries_above_the_bottom_row() {
        let img = GrayImage::new(30, 12);
        // Marker row outside the image so only the fill is drawn.
        let detection = render_overlay(
            &img,
            &curves(Some(vertical(5.0)), Some(vertical(20.0))),
            &config(30, 100),
        );
        assert!(detection.success);
        assert_eq!(detection.offset, 12);

        for y in 0..12 {
            for x in 0..30 {
                let expected = if y < 11 && (5..=20).contains(&x) {
                    LINE_COLOR
                } else {
                    Rgb([0, 0, 0])
                };
                assert_eq!(detection.overlay.get_pixel(x, y), &expected, "({x}, {y})");
            }
        }
    }

    #[test]
    fn fill_is_clipped_to_the_canvas() {
        let img = GrayImage::new(10, 4);
        let detection = render_overlay(
            &img,
            &curves(Some(vertical(-1.0e9)), Some(vertical(1.0e9))),
            &config(10, 100),
        );
        assert!(detection.success);
        for (_, y, pixel) in detection.overlay.enumerate_pixels() {
            let expected = if y < 3 { LINE_COLOR } else { Rgb([0, 0, 0]) };
            assert_eq!(pixel, &expected, "row {y}");
        }
    }

    #[test]
    fn marker_drawn_at_center_on_reference_row() {
        let img = GrayImage::new(40, 40);
        // Boundaries off to the sides so the fill does not cover the marker.
        let detection = render_overlay(
            &img,
            &curves(Some(vertical(-10.0)), Some(vertical(50.0))),
            &config(40, 20),
        );
        assert_eq!(detection.offset, 20);
        // Radius-2 hollow circle around (20, 20).
        assert_eq!(detection.overlay.get_pixel(22, 20), &MARKER_COLOR);
        assert_eq!(detection.overlay.get_pixel(18, 20), &MARKER_COLOR);
        assert_eq!(detection.overlay.get_pixel(20, 22), &MARKER_COLOR);
        assert_eq!(detection.overlay.get_pixel(20, 18), &MARKER_COLOR);
    }

    #[test]
    fn marker_skipped_when_center_outside_reference_width() {
        let img = GrayImage::new(40, 40);
        let detection = render_overlay(
            &img,
            &curves(Some(vertical(-100.0)), Some(vertical(-60.0))),
            &config(40, 20),
        );
        assert!(detection.success);
        assert_eq!(detection.offset, -80);
        assert!(detection.overlay.pixels().all(|p| *p != MARKER_COLOR));
    }
}
