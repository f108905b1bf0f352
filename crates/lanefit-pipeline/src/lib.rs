//! lanefit-pipeline: Lane boundary detection on binary road masks (sans-IO).
//!
//! Finds the left and right lane boundaries in a bird's-eye binary image
//! through:
//! foreground extraction -> column histogram seeds -> sliding-window
//! tracking -> quadratic fit (with mirroring of a sparse side) ->
//! overlay rendering and lane-center estimate.
//!
//! This crate has **no I/O dependencies** -- it operates on in-memory
//! images and returns structured data. Reading and writing image files
//! lives in `lanefit-cli`.

pub mod base;
pub mod binary;
pub mod center;
pub mod detector;
pub mod diagnostics;
pub mod features;
pub mod fit;
pub mod pipeline;
pub mod render;
pub mod types;
pub mod window;

pub use detector::LaneDetector;
pub use diagnostics::{FrameDiagnostics, StageDiagnostics, StageMetrics};
pub use fit::{FittedCurves, Mirroring};
pub use pipeline::Pipeline;
pub use types::{
    Dimensions, GrayImage, LaneConfig, LaneCurve, LaneDetection, LaneError, Pixel, PixelSet,
    RgbImage, Side, Window,
};

/// Run a single detection without keeping detector state.
///
/// # Errors
///
/// Returns [`LaneError::InvalidConfig`] if `config` is rejected.
pub fn detect(image: &GrayImage, config: &LaneConfig) -> Result<LaneDetection, LaneError> {
    config.validate()?;
    Ok(Pipeline::new(image, config)
        .extract_features()
        .estimate_bases()
        .track_windows()
        .fit_curves()
        .render()
        .into_result())
}
