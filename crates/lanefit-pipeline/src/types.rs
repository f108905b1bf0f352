//! Shared types for the lanefit pipeline.

use serde::{Deserialize, Serialize};

/// Re-export `GrayImage` so downstream crates can hand binary masks to
/// the detector without depending on `image` directly.
pub use image::GrayImage;

/// Re-export `RgbImage`, the type of every rendered overlay.
pub use image::RgbImage;

/// A foreground pixel coordinate in image space.
///
/// Coordinates are signed: mirrored points and search windows may lie
/// outside the image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Pixel {
    /// Column (pixels from left edge).
    pub x: i64,
    /// Row (pixels from top edge).
    pub y: i64,
}

impl Pixel {
    /// Create a new pixel coordinate.
    #[must_use]
    pub const fn new(x: i64, y: i64) -> Self {
        Self { x, y }
    }
}

/// An unordered collection of pixel coordinates.
///
/// Built once per frame by [`crate::features::extract_features`] and
/// read-only afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PixelSet(Vec<Pixel>);

impl PixelSet {
    /// Create a pixel set from a vector of coordinates.
    #[must_use]
    pub const fn new(pixels: Vec<Pixel>) -> Self {
        Self(pixels)
    }

    /// Returns `true` if the set holds no pixels.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of pixels in the set.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns a slice of all pixels.
    #[must_use]
    pub fn pixels(&self) -> &[Pixel] {
        &self.0
    }

    /// Iterate over the pixels.
    pub fn iter(&self) -> std::slice::Iter<'_, Pixel> {
        self.0.iter()
    }

    /// Consumes the set and returns the underlying vector.
    #[must_use]
    pub fn into_pixels(self) -> Vec<Pixel> {
        self.0
    }

    /// All members that fall inside `window` (closed rectangle).
    #[must_use]
    pub fn within(&self, window: &Window) -> Vec<Pixel> {
        self.0
            .iter()
            .filter(|p| window.contains(**p))
            .copied()
            .collect()
    }
}

impl<'a> IntoIterator for &'a PixelSet {
    type Item = &'a Pixel;
    type IntoIter = std::slice::Iter<'a, Pixel>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// A search rectangle used as a query predicate over a [`PixelSet`].
///
/// Covers `[center_x - half_width, center_x + half_width]` horizontally
/// and `[center_y - half_height, center_y + half_height]` vertically,
/// both ends inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Window {
    /// Horizontal center.
    pub center_x: i64,
    /// Vertical center.
    pub center_y: i64,
    /// Half of the horizontal extent.
    pub half_width: i64,
    /// Half of the vertical extent.
    pub half_height: i64,
}

impl Window {
    /// Create a window around `(center_x, center_y)`.
    #[must_use]
    pub const fn new(center_x: i64, center_y: i64, half_width: i64, half_height: i64) -> Self {
        Self {
            center_x,
            center_y,
            half_width,
            half_height,
        }
    }

    /// Leftmost column inside the window.
    #[must_use]
    pub const fn left(&self) -> i64 {
        self.center_x - self.half_width
    }

    /// Rightmost column inside the window.
    #[must_use]
    pub const fn right(&self) -> i64 {
        self.center_x + self.half_width
    }

    /// Topmost row inside the window.
    #[must_use]
    pub const fn top(&self) -> i64 {
        self.center_y - self.half_height
    }

    /// Bottommost row inside the window.
    #[must_use]
    pub const fn bottom(&self) -> i64 {
        self.center_y + self.half_height
    }

    /// Whether `pixel` lies inside the closed rectangle.
    #[must_use]
    pub const fn contains(&self, pixel: Pixel) -> bool {
        self.left() <= pixel.x
            && pixel.x <= self.right()
            && self.top() <= pixel.y
            && pixel.y <= self.bottom()
    }
}

/// One of the two tracked lane boundaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    /// The boundary left of the vehicle.
    Left,
    /// The boundary right of the vehicle.
    Right,
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Left => f.write_str("left"),
            Self::Right => f.write_str("right"),
        }
    }
}

/// A lane boundary modeled as `x = a·y² + b·y + c`.
///
/// `x` is a function of the row `y` because boundaries in a top-down
/// view run roughly vertically.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LaneCurve {
    /// Quadratic coefficient.
    pub a: f64,
    /// Linear coefficient.
    pub b: f64,
    /// Constant term.
    pub c: f64,
}

impl LaneCurve {
    /// Create a curve from its coefficients.
    #[must_use]
    pub const fn new(a: f64, b: f64, c: f64) -> Self {
        Self { a, b, c }
    }

    /// Column of the boundary at row `y`.
    #[must_use]
    pub fn evaluate(&self, y: f64) -> f64 {
        self.a.mul_add(y * y, self.b.mul_add(y, self.c))
    }

    /// Coefficients as `[a, b, c]`, highest degree first.
    #[must_use]
    pub const fn coefficients(&self) -> [f64; 3] {
        [self.a, self.b, self.c]
    }
}

/// Image dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Dimensions {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Dimensions {
    /// Dimensions of an existing image.
    #[must_use]
    pub fn of<P: image::Pixel, C>(image: &image::ImageBuffer<P, C>) -> Self
    where
        C: std::ops::Deref<Target = [P::Subpixel]>,
    {
        Self {
            width: image.width(),
            height: image.height(),
        }
    }
}

/// Hyperparameters of the lane detector, fixed at construction.
///
/// All parameters have defaults matching the rectified 1280×720 frames
/// the surrounding perception pipeline produces.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LaneConfig {
    /// Number of vertical search bands.
    pub window_count: u32,

    /// Half-width in pixels of each search window.
    pub margin: u32,

    /// A window is recentered on its pixels' mean column only when it
    /// found strictly more than this many pixels.
    pub min_pixels_to_recenter: usize,

    /// A curve is fitted only when its side has strictly more than this
    /// many points (after mirroring).
    pub min_pixels_to_fit: usize,

    /// Horizontal offset in pixels between the two boundaries assumed by
    /// the mirroring fallback.
    pub lane_width_fallback: i64,

    /// Columns on each side of the image midpoint that the base
    /// estimator ignores, keeping the two searches apart.
    pub seed_buffer: u32,

    /// Nominal frame width of the surrounding pipeline. The center
    /// marker is drawn only when the offset lies in `[0, reference_width]`.
    pub reference_width: u32,

    /// Row at which the lane-center offset is measured.
    pub reference_row: u32,
}

impl LaneConfig {
    /// Default number of vertical bands.
    pub const DEFAULT_WINDOW_COUNT: u32 = 9;
    /// Default window half-width.
    pub const DEFAULT_MARGIN: u32 = 100;
    /// Default recenter threshold.
    pub const DEFAULT_MIN_PIXELS_TO_RECENTER: usize = 50;
    /// Default fit threshold.
    pub const DEFAULT_MIN_PIXELS_TO_FIT: usize = 500;
    /// Default mirroring offset.
    pub const DEFAULT_LANE_WIDTH_FALLBACK: i64 = 800;
    /// Default midpoint exclusion for base estimation.
    pub const DEFAULT_SEED_BUFFER: u32 = 50;
    /// Default nominal frame width.
    pub const DEFAULT_REFERENCE_WIDTH: u32 = 1280;
    /// Default measurement row (the nominal frame height).
    pub const DEFAULT_REFERENCE_ROW: u32 = 720;

    /// Check the configuration for values the detector cannot run with.
    ///
    /// # Errors
    ///
    /// Returns [`LaneError::InvalidConfig`] if `window_count` is zero.
    pub fn validate(&self) -> Result<(), LaneError> {
        if self.window_count == 0 {
            return Err(LaneError::InvalidConfig(
                "window_count must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for LaneConfig {
    fn default() -> Self {
        Self {
            window_count: Self::DEFAULT_WINDOW_COUNT,
            margin: Self::DEFAULT_MARGIN,
            min_pixels_to_recenter: Self::DEFAULT_MIN_PIXELS_TO_RECENTER,
            min_pixels_to_fit: Self::DEFAULT_MIN_PIXELS_TO_FIT,
            lane_width_fallback: Self::DEFAULT_LANE_WIDTH_FALLBACK,
            seed_buffer: Self::DEFAULT_SEED_BUFFER,
            reference_width: Self::DEFAULT_REFERENCE_WIDTH,
            reference_row: Self::DEFAULT_REFERENCE_ROW,
        }
    }
}

/// Result of running the detector on one frame.
///
/// Detection failure is a value, not an error: `success == false`
/// means at least one curve could not be fitted, the overlay is the
/// unannotated input, and `offset` is `0`.
#[derive(Debug, Clone)]
pub struct LaneDetection {
    /// Three-channel rendering of the input with lane fill and center
    /// marker (unannotated when `success` is `false`).
    pub overlay: RgbImage,
    /// Whether both boundaries were fitted.
    pub success: bool,
    /// Lane-center column at the reference row, or `0` on failure.
    pub offset: i64,
    /// The left boundary fitted this frame, if any.
    pub left_curve: Option<LaneCurve>,
    /// The right boundary fitted this frame, if any.
    pub right_curve: Option<LaneCurve>,
}

/// Errors raised by the lanefit pipeline.
///
/// Per-frame detection never fails; these cover configuration and
/// input decoding only.
#[derive(Debug, thiserror::Error)]
pub enum LaneError {
    /// Failed to decode the input image.
    #[error("failed to decode image: {0}")]
    ImageDecode(#[from] image::ImageError),

    /// The input image bytes were empty.
    #[error("input image data is empty")]
    EmptyInput,

    /// Detector configuration is invalid.
    #[error("invalid lane configuration: {0}")]
    InvalidConfig(String),
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    // --- Window tests ---

    #[test]
    fn window_bounds_are_closed() {
        let w = Window::new(10, 20, 3, 2);
        assert!(w.contains(Pixel::new(7, 18)));
        assert!(w.contains(Pixel::new(13, 22)));
        assert!(!w.contains(Pixel::new(6, 20)));
        assert!(!w.contains(Pixel::new(14, 20)));
        assert!(!w.contains(Pixel::new(10, 17)));
        assert!(!w.contains(Pixel::new(10, 23)));
    }

    #[test]
    fn window_may_extend_past_the_origin() {
        let w = Window::new(-5, -5, 10, 10);
        assert_eq!(w.left(), -15);
        assert_eq!(w.top(), -15);
        assert!(w.contains(Pixel::new(0, 0)));
    }

    #[test]
    fn zero_size_window_contains_only_its_center() {
        let w = Window::new(4, 4, 0, 0);
        assert!(w.contains(Pixel::new(4, 4)));
        assert!(!w.contains(Pixel::new(4, 5)));
    }

    // --- PixelSet tests ---

    #[test]
    fn pixel_set_within_selects_members_inside_window() {
        let set = PixelSet::new(vec![
            Pixel::new(0, 0),
            Pixel::new(5, 5),
            Pixel::new(6, 5),
            Pixel::new(50, 50),
        ]);
        let inside = set.within(&Window::new(5, 5, 1, 1));
        assert_eq!(inside, vec![Pixel::new(5, 5), Pixel::new(6, 5)]);
    }

    #[test]
    fn empty_pixel_set_selects_nothing() {
        let set = PixelSet::default();
        assert!(set.is_empty());
        assert!(set.within(&Window::new(0, 0, 100, 100)).is_empty());
    }

    // --- LaneCurve tests ---

    #[test]
    fn curve_evaluates_quadratic() {
        let curve = LaneCurve::new(0.5, -2.0, 10.0);
        assert!((curve.evaluate(0.0) - 10.0).abs() < 1e-12);
        assert!((curve.evaluate(4.0) - 10.0).abs() < 1e-12);
        assert!((curve.evaluate(10.0) - 40.0).abs() < 1e-12);
        assert_eq!(curve.coefficients(), [0.5, -2.0, 10.0]);
    }

    // --- Side tests ---

    #[test]
    fn side_display() {
        assert_eq!(Side::Left.to_string(), "left");
        assert_eq!(Side::Right.to_string(), "right");
    }

    // --- LaneConfig tests ---

    #[test]
    fn lane_config_defaults() {
        let config = LaneConfig::default();
        assert_eq!(config.window_count, 9);
        assert_eq!(config.margin, 100);
        assert_eq!(config.min_pixels_to_recenter, 50);
        assert_eq!(config.min_pixels_to_fit, 500);
        assert_eq!(config.lane_width_fallback, 800);
        assert_eq!(config.seed_buffer, 50);
        assert_eq!(config.reference_width, 1280);
        assert_eq!(config.reference_row, 720);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn zero_windows_is_invalid() {
        let config = LaneConfig {
            window_count: 0,
            ..LaneConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid lane configuration: window_count must be at least 1",
        );
    }

    #[test]
    fn partial_config_json_fills_defaults() {
        let config: LaneConfig = serde_json::from_str(r#"{"margin": 60}"#).unwrap();
        assert_eq!(config.margin, 60);
        assert_eq!(config.window_count, LaneConfig::DEFAULT_WINDOW_COUNT);
        assert_eq!(config.reference_row, LaneConfig::DEFAULT_REFERENCE_ROW);
    }

    // --- LaneError tests ---

    #[test]
    fn error_empty_input_display() {
        assert_eq!(LaneError::EmptyInput.to_string(), "input image data is empty");
    }

    // --- Dimensions tests ---

    #[test]
    fn dimensions_of_image() {
        let img = GrayImage::new(17, 31);
        assert_eq!(
            Dimensions::of(&img),
            Dimensions {
                width: 17,
                height: 31
            }
        );
    }
}
