//! Incremental pipeline: advance stage-by-stage, inspecting each
//! intermediate result before continuing.
//!
//! ```rust
//! # use lanefit_pipeline::{GrayImage, LaneConfig, Pipeline};
//! # fn run(mask: &GrayImage) {
//! let config = LaneConfig::default();
//! let rendered = Pipeline::new(mask, &config)
//!     .extract_features()
//!     .estimate_bases()
//!     .track_windows()
//!     .fit_curves()
//!     .render();
//!
//! let detection = rendered.into_result();
//! # }
//! ```
//!
//! Each stage method consumes `self` and returns the next pipeline
//! state, carrying all previously computed intermediates. None of the
//! stages can fail: a frame without a usable lane still renders, with
//! `success == false`.

use crate::base::{BasePositions, column_profile, estimate_bases};
use crate::diagnostics::StageMetrics;
use crate::features::extract_features;
use crate::fit::{FittedCurves, fit_curves};
use crate::render::render_overlay;
use crate::types::{Dimensions, GrayImage, LaneConfig, LaneDetection, PixelSet, Side};
use crate::window::{TrackedPixels, track_lanes};

// ───────────────────────── Stage 0: Pending ──────────────────────────

/// Pipeline state before any processing has occurred.
#[must_use = "pipeline stages are consumed by advancing — call .extract_features() to continue"]
pub struct Pending<'a> {
    image: &'a GrayImage,
    config: &'a LaneConfig,
}

impl<'a> Pending<'a> {
    /// The binary input image.
    #[must_use]
    pub const fn image(&self) -> &GrayImage {
        self.image
    }

    /// Collect the foreground pixels and advance to [`FeaturesExtracted`].
    pub fn extract_features(self) -> FeaturesExtracted<'a> {
        FeaturesExtracted {
            image: self.image,
            config: self.config,
            pixels: extract_features(self.image),
            dimensions: Dimensions::of(self.image),
        }
    }
}

// ───────────────────────── Stage 1: FeaturesExtracted ────────────────

/// Pipeline state after foreground extraction.
#[must_use = "pipeline stages are consumed by advancing — call .estimate_bases() to continue"]
pub struct FeaturesExtracted<'a> {
    image: &'a GrayImage,
    config: &'a LaneConfig,
    pixels: PixelSet,
    dimensions: Dimensions,
}

impl<'a> FeaturesExtracted<'a> {
    /// Foreground pixels in row-major order.
    #[must_use]
    pub const fn pixels(&self) -> &PixelSet {
        &self.pixels
    }

    /// Image dimensions.
    #[must_use]
    pub const fn dimensions(&self) -> Dimensions {
        self.dimensions
    }

    /// Stage metrics for diagnostics.
    #[must_use]
    pub const fn metrics(&self) -> StageMetrics {
        StageMetrics::FeatureExtraction {
            width: self.dimensions.width,
            height: self.dimensions.height,
            foreground_pixels: self.pixels.len(),
        }
    }

    /// Build the lower-half column profile and pick both seeds.
    pub fn estimate_bases(self) -> BasesEstimated<'a> {
        let profile = column_profile(&self.pixels, self.dimensions);
        let bases = estimate_bases(&profile, self.config.seed_buffer);
        BasesEstimated {
            image: self.image,
            config: self.config,
            pixels: self.pixels,
            dimensions: self.dimensions,
            profile,
            bases,
        }
    }
}

// ───────────────────────── Stage 2: BasesEstimated ───────────────────

/// Pipeline state after seed selection.
#[must_use = "pipeline stages are consumed by advancing — call .track_windows() to continue"]
pub struct BasesEstimated<'a> {
    image: &'a GrayImage,
    config: &'a LaneConfig,
    pixels: PixelSet,
    dimensions: Dimensions,
    profile: Vec<u32>,
    bases: BasePositions,
}

impl<'a> BasesEstimated<'a> {
    /// The seed columns.
    #[must_use]
    pub const fn bases(&self) -> BasePositions {
        self.bases
    }

    /// Per-column foreground counts over the lower half.
    #[must_use]
    pub fn profile(&self) -> &[u32] {
        &self.profile
    }

    /// Stage metrics for diagnostics.
    #[must_use]
    pub const fn metrics(&self) -> StageMetrics {
        StageMetrics::BaseEstimation {
            left_seed: self.bases.left,
            right_seed: self.bases.right,
            flat: self.bases.flat,
        }
    }

    /// Run the sliding-window search from the seeds.
    pub fn track_windows(self) -> WindowsTracked<'a> {
        let tracked = track_lanes(
            &self.pixels,
            self.bases,
            self.dimensions.height,
            self.config,
        );
        WindowsTracked {
            image: self.image,
            config: self.config,
            pixels: self.pixels,
            dimensions: self.dimensions,
            bases: self.bases,
            tracked,
        }
    }
}

// ───────────────────────── Stage 3: WindowsTracked ───────────────────

/// Pipeline state after the sliding-window search.
#[must_use = "pipeline stages are consumed by advancing — call .fit_curves() to continue"]
pub struct WindowsTracked<'a> {
    image: &'a GrayImage,
    config: &'a LaneConfig,
    pixels: PixelSet,
    dimensions: Dimensions,
    bases: BasePositions,
    tracked: TrackedPixels,
}

impl<'a> WindowsTracked<'a> {
    /// Pixels assigned to each boundary, with the per-band trace.
    #[must_use]
    pub const fn tracked(&self) -> &TrackedPixels {
        &self.tracked
    }

    /// Stage metrics for diagnostics.
    #[must_use]
    pub fn metrics(&self) -> StageMetrics {
        let threshold = self.config.min_pixels_to_recenter;
        StageMetrics::WindowTracking {
            band_count: self.tracked.bands.len(),
            band_height: self.tracked.band_height,
            left_pixels: self.tracked.left.len(),
            right_pixels: self.tracked.right.len(),
            left_recenters: self.tracked.recenter_count(Side::Left, threshold),
            right_recenters: self.tracked.recenter_count(Side::Right, threshold),
        }
    }

    /// Mirror a sparse side if needed and fit both boundaries.
    pub fn fit_curves(self) -> CurvesFitted<'a> {
        let curves = fit_curves(&self.tracked, self.config);
        CurvesFitted {
            image: self.image,
            config: self.config,
            pixels: self.pixels,
            dimensions: self.dimensions,
            bases: self.bases,
            tracked: self.tracked,
            curves,
        }
    }
}

// ───────────────────────── Stage 4: CurvesFitted ─────────────────────

/// Pipeline state after curve fitting.
#[must_use = "pipeline stages are consumed by advancing — call .render() to continue"]
pub struct CurvesFitted<'a> {
    image: &'a GrayImage,
    config: &'a LaneConfig,
    pixels: PixelSet,
    dimensions: Dimensions,
    bases: BasePositions,
    tracked: TrackedPixels,
    curves: FittedCurves,
}

impl CurvesFitted<'_> {
    /// The fitted boundaries.
    #[must_use]
    pub const fn curves(&self) -> &FittedCurves {
        &self.curves
    }

    /// Stage metrics for diagnostics.
    #[must_use]
    pub const fn metrics(&self) -> StageMetrics {
        StageMetrics::CurveFitting {
            mirroring: self.curves.mirroring,
            left_points: self.curves.left_points,
            right_points: self.curves.right_points,
            left_fitted: self.curves.left.is_some(),
            right_fitted: self.curves.right.is_some(),
        }
    }

    /// Draw the overlay and measure the lane center.
    pub fn render(self) -> Rendered {
        let detection = render_overlay(self.image, &self.curves, self.config);
        Rendered {
            pixels: self.pixels,
            dimensions: self.dimensions,
            bases: self.bases,
            tracked: self.tracked,
            curves: self.curves,
            detection,
        }
    }
}

// ───────────────────────── Stage 5: Rendered ─────────────────────────

/// Pipeline state after rendering — the final stage.
#[must_use = "call .into_result() to extract the LaneDetection"]
pub struct Rendered {
    pixels: PixelSet,
    dimensions: Dimensions,
    bases: BasePositions,
    tracked: TrackedPixels,
    curves: FittedCurves,
    detection: LaneDetection,
}

impl Rendered {
    /// The rendered detection.
    #[must_use]
    pub const fn detection(&self) -> &LaneDetection {
        &self.detection
    }

    /// Stage metrics for diagnostics.
    #[must_use]
    pub const fn metrics(&self) -> StageMetrics {
        StageMetrics::Render {
            success: self.detection.success,
            offset: self.detection.offset,
        }
    }

    /// Consume the pipeline and return only the detection.
    #[must_use]
    pub fn into_result(self) -> LaneDetection {
        self.detection
    }

    /// Consume the pipeline and return the detection with every
    /// intermediate.
    #[must_use]
    pub fn into_staged(self) -> StagedDetection {
        StagedDetection {
            detection: self.detection,
            pixels: self.pixels,
            dimensions: self.dimensions,
            bases: self.bases,
            tracked: self.tracked,
            curves: self.curves,
        }
    }
}

/// A detection together with the intermediates that produced it.
#[derive(Debug, Clone)]
pub struct StagedDetection {
    /// The rendered result.
    pub detection: LaneDetection,
    /// Foreground pixels of the input.
    pub pixels: PixelSet,
    /// Input dimensions.
    pub dimensions: Dimensions,
    /// Seed columns.
    pub bases: BasePositions,
    /// Sliding-window assignment.
    pub tracked: TrackedPixels,
    /// Fitted boundaries.
    pub curves: FittedCurves,
}

// ───────────────────────── PipelineStage trait ───────────────────────

/// Total number of stages in the pipeline.
pub const STAGE_COUNT: usize = 6;

/// Trait implemented by every pipeline stage.
pub trait PipelineStage: Sized {
    /// Human-readable name of this stage.
    const NAME: &str;

    /// Zero-based index of this stage (`0` for [`Pending`] through `5`
    /// for [`Rendered`]).
    const INDEX: usize;

    /// Run all remaining stages and return every intermediate.
    fn complete(self) -> StagedDetection;
}

impl PipelineStage for Pending<'_> {
    const NAME: &'static str = "source";
    const INDEX: usize = 0;

    fn complete(self) -> StagedDetection {
        self.extract_features().complete()
    }
}

impl PipelineStage for FeaturesExtracted<'_> {
    const NAME: &'static str = "features";
    const INDEX: usize = 1;

    fn complete(self) -> StagedDetection {
        self.estimate_bases().complete()
    }
}

impl PipelineStage for BasesEstimated<'_> {
    const NAME: &'static str = "bases";
    const INDEX: usize = 2;

    fn complete(self) -> StagedDetection {
        self.track_windows().complete()
    }
}

impl PipelineStage for WindowsTracked<'_> {
    const NAME: &'static str = "windows";
    const INDEX: usize = 3;

    fn complete(self) -> StagedDetection {
        self.fit_curves().complete()
    }
}

impl PipelineStage for CurvesFitted<'_> {
    const NAME: &'static str = "fit";
    const INDEX: usize = 4;

    fn complete(self) -> StagedDetection {
        self.render().complete()
    }
}

impl PipelineStage for Rendered {
    const NAME: &'static str = "render";
    const INDEX: usize = 5;

    fn complete(self) -> StagedDetection {
        self.into_staged()
    }
}

/// Entry point for the staged pipeline.
///
/// Each stage method consumes the current state and returns the next,
/// making it a compile-time error to skip stages or call them out of
/// order.
pub struct Pipeline;

impl Pipeline {
    /// Create a new pipeline over a binary image.
    ///
    /// No processing is performed until the first stage is advanced.
    #[allow(clippy::new_ret_no_self)]
    pub const fn new<'a>(image: &'a GrayImage, config: &'a LaneConfig) -> Pending<'a> {
        Pending { image, config }
    }
}
