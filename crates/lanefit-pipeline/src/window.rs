//! Sliding-window boundary tracking.
//!
//! The image is cut into `window_count` horizontal bands of equal
//! height. Walking bands bottom to top, each side keeps a current
//! column; the pixels inside a `2·margin`-wide window around it are
//! assigned to that side, and when there are enough of them the column
//! moves to their mean. Following dense pixels band by band lets the
//! search bend with curved boundaries.
//!
//! Bands are `height / window_count` rows tall (integer division), so
//! up to `window_count - 1` rows at the top of the image are never
//! searched. Neighbouring windows share their boundary row because the
//! window predicate is closed.

use serde::{Deserialize, Serialize};

use crate::base::BasePositions;
use crate::types::{LaneConfig, Pixel, PixelSet, Side, Window};

/// What happened to one side's window within a single band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BandSide {
    /// Window center column used for this band.
    pub center: i64,
    /// Pixels found inside the window.
    pub found: usize,
    /// Center column carried into the next band.
    pub next_center: i64,
}

impl BandSide {
    /// Whether this band moved the window.
    ///
    /// Note a recenter onto the same column counts as not moved; use
    /// `found` against the threshold to tell the two apart.
    #[must_use]
    pub const fn moved(&self) -> bool {
        self.center != self.next_center
    }
}

/// Record of one band of the search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BandTrace {
    /// Center row of the band.
    pub center_y: i64,
    /// Left window.
    pub left: BandSide,
    /// Right window.
    pub right: BandSide,
}

impl BandTrace {
    /// The record for one side.
    #[must_use]
    pub const fn side(&self, side: Side) -> &BandSide {
        match side {
            Side::Left => &self.left,
            Side::Right => &self.right,
        }
    }
}

/// Pixels assigned to each boundary, plus a per-band trace.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackedPixels {
    /// Pixels assigned to the left boundary, band by band.
    pub left: Vec<Pixel>,
    /// Pixels assigned to the right boundary, band by band.
    pub right: Vec<Pixel>,
    /// Height of each band in rows.
    pub band_height: i64,
    /// One entry per band, bottom band first.
    pub bands: Vec<BandTrace>,
}

impl TrackedPixels {
    /// The pixels assigned to one side.
    #[must_use]
    pub fn side(&self, side: Side) -> &[Pixel] {
        match side {
            Side::Left => &self.left,
            Side::Right => &self.right,
        }
    }

    /// Number of bands in which `side` found more pixels than `threshold`.
    #[must_use]
    pub fn recenter_count(&self, side: Side, threshold: usize) -> usize {
        self.bands
            .iter()
            .filter(|band| band.side(side).found > threshold)
            .count()
    }
}

/// Walk the bands bottom to top from the given seeds.
///
/// The first band is centered half a band above the bottom edge, i.e.
/// the cursor starts at `height + band_height / 2` and steps up one band
/// before each search. Windows may hang past the image edges; they
/// simply select fewer pixels.
///
/// A side's column moves to the truncated mean column of the pixels it
/// found iff it found strictly more than `config.min_pixels_to_recenter`;
/// otherwise the column carries over unchanged.
#[must_use = "returns the pixels assigned to each boundary"]
pub fn track_lanes(
    pixels: &PixelSet,
    bases: BasePositions,
    height: u32,
    config: &LaneConfig,
) -> TrackedPixels {
    let window_count = config.window_count.max(1);
    let band_height = i64::from(height) / i64::from(window_count);
    let margin = i64::from(config.margin);

    let mut left_x = bases.left;
    let mut right_x = bases.right;
    let mut cursor_y = i64::from(height) + band_height / 2;

    let mut tracked = TrackedPixels {
        band_height,
        bands: Vec::with_capacity(window_count as usize),
        ..TrackedPixels::default()
    };

    for _ in 0..window_count {
        cursor_y -= band_height;

        let left = search_band(
            pixels,
            Window::new(left_x, cursor_y, margin, band_height / 2),
            config.min_pixels_to_recenter,
            &mut tracked.left,
        );
        let right = search_band(
            pixels,
            Window::new(right_x, cursor_y, margin, band_height / 2),
            config.min_pixels_to_recenter,
            &mut tracked.right,
        );

        if left.moved() || right.moved() {
            log::debug!(
                "band y={cursor_y}: left {}->{} ({} px), right {}->{} ({} px)",
                left.center,
                left.next_center,
                left.found,
                right.center,
                right.next_center,
                right.found,
            );
        }

        left_x = left.next_center;
        right_x = right.next_center;
        tracked.bands.push(BandTrace {
            center_y: cursor_y,
            left,
            right,
        });
    }

    tracked
}

/// Select the pixels inside `window`, append them to `accumulator`, and
/// decide the next center.
fn search_band(
    pixels: &PixelSet,
    window: Window,
    min_pixels_to_recenter: usize,
    accumulator: &mut Vec<Pixel>,
) -> BandSide {
    let found = pixels.within(&window);
    let next_center = if found.len() > min_pixels_to_recenter {
        mean_column(&found)
    } else {
        window.center_x
    };
    accumulator.extend_from_slice(&found);
    BandSide {
        center: window.center_x,
        found: found.len(),
        next_center,
    }
}

/// Mean column truncated toward zero. Callers guarantee `found` is
/// non-empty.
fn mean_column(found: &[Pixel]) -> i64 {
    let sum: i64 = found.iter().map(|p| p.x).sum();
    #[allow(clippy::cast_possible_wrap)]
    let count = found.len() as i64;
    sum / count
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(window_count: u32, margin: u32, min_pixels_to_recenter: usize) -> LaneConfig {
        LaneConfig {
            window_count,
            margin,
            min_pixels_to_recenter,
            ..LaneConfig::default()
        }
    }

    fn bases(left: i64, right: i64) -> BasePositions {
        BasePositions {
            left,
            right,
            flat: false,
        }
    }

    #[test]
    fn band_centers_step_up_from_bottom() {
        let tracked = track_lanes(&PixelSet::default(), bases(0, 0), 90, &config(3, 10, 0));
        assert_eq!(tracked.band_height, 30);
        let rows: Vec<i64> = tracked.bands.iter().map(|b| b.center_y).collect();
        assert_eq!(rows, vec![75, 45, 15]);
    }

    #[test]
    fn empty_bands_carry_center_forward() {
        let tracked = track_lanes(&PixelSet::default(), bases(40, 160), 100, &config(4, 20, 5));
        assert!(tracked.left.is_empty());
        assert!(tracked.right.is_empty());
        for band in &tracked.bands {
            assert_eq!(band.left.center, 40);
            assert_eq!(band.left.next_center, 40);
            assert_eq!(band.right.center, 160);
            assert_eq!(band.right.next_center, 160);
        }
    }

    #[test]
    fn recenter_requires_strictly_more_than_threshold() {
        // 5 pixels in the bottom band at column 50, window seeded at 45.
        let pixels = PixelSet::new((80..85).map(|y| Pixel::new(50, y)).collect());

        let at_threshold = track_lanes(&pixels, bases(45, 500), 100, &config(1, 10, 5));
        assert_eq!(at_threshold.bands[0].left.found, 5);
        assert_eq!(at_threshold.bands[0].left.next_center, 45);

        let below_threshold = track_lanes(&pixels, bases(45, 500), 100, &config(1, 10, 4));
        assert_eq!(below_threshold.bands[0].left.next_center, 50);
    }

    #[test]
    fn mean_column_truncates() {
        let found = [Pixel::new(1, 0), Pixel::new(2, 0)];
        assert_eq!(mean_column(&found), 1);
        let negative = [Pixel::new(-1, 0), Pixel::new(-2, 0)];
        assert_eq!(mean_column(&negative), -1);
    }

    #[test]
    fn windows_outside_image_select_nothing() {
        let pixels = PixelSet::new(vec![Pixel::new(5, 5)]);
        let tracked = track_lanes(&pixels, bases(-500, 5000), 10, &config(1, 10, 0));
        assert!(tracked.left.is_empty());
        assert!(tracked.right.is_empty());
    }

    #[test]
    fn pixels_are_assigned_to_the_side_whose_window_contains_them() {
        let mut pixels = Vec::new();
        for y in 0..60 {
            pixels.push(Pixel::new(20, y));
            pixels.push(Pixel::new(80, y));
            pixels.push(Pixel::new(50, y)); // between the windows
        }
        let set = PixelSet::new(pixels);
        let tracked = track_lanes(&set, bases(20, 80), 60, &config(3, 5, 100));
        assert!(tracked.left.iter().all(|p| p.x == 20));
        assert!(tracked.right.iter().all(|p| p.x == 80));
        assert!(!tracked.left.is_empty());
        assert_eq!(tracked.recenter_count(Side::Left, 100), 0);
    }

    #[test]
    fn shared_boundary_rows_are_counted_in_both_bands() {
        // Band height 10, half-height 5: band centers at 15 and 5 both
        // include row 10.
        let pixels = PixelSet::new(vec![Pixel::new(0, 10)]);
        let tracked = track_lanes(&pixels, bases(0, 1000), 20, &config(2, 1, 10));
        assert_eq!(tracked.left.len(), 2);
    }
}
