//! Stateful per-frame entry point.
//!
//! [`LaneDetector`] owns a validated [`LaneConfig`] and remembers what
//! the most recent frame produced. Curves are cleared at the start of
//! every [`forward`](LaneDetector::forward) call, so a frame never sees
//! its predecessor's fit and the same input always gives the same
//! output.

use crate::diagnostics::{FrameDiagnostics, detect_with_diagnostics};
use crate::pipeline::{Pipeline, PipelineStage, StagedDetection};
use crate::types::{
    Dimensions, GrayImage, LaneConfig, LaneCurve, LaneDetection, LaneError, PixelSet,
};

/// Lane detector holding the configuration and last-frame state.
#[derive(Debug, Clone)]
pub struct LaneDetector {
    config: LaneConfig,
    left_curve: Option<LaneCurve>,
    right_curve: Option<LaneCurve>,
    dimensions: Option<Dimensions>,
    pixels: PixelSet,
}

impl LaneDetector {
    /// Create a detector after validating `config`.
    ///
    /// # Errors
    ///
    /// Returns [`LaneError::InvalidConfig`] if the configuration is
    /// rejected by [`LaneConfig::validate`].
    pub fn new(config: LaneConfig) -> Result<Self, LaneError> {
        config.validate()?;
        Ok(Self {
            config,
            left_curve: None,
            right_curve: None,
            dimensions: None,
            pixels: PixelSet::default(),
        })
    }

    /// Detect the lane in one binary frame.
    ///
    /// Never fails. When either boundary cannot be fitted the returned
    /// detection has `success == false`, offset `0`, and an unannotated
    /// overlay.
    #[must_use = "returns the rendered detection"]
    pub fn forward(&mut self, image: &GrayImage) -> LaneDetection {
        self.left_curve = None;
        self.right_curve = None;
        let staged = Pipeline::new(image, &self.config).complete();
        self.absorb(staged)
    }

    /// Like [`forward`](Self::forward), also timing every stage.
    #[must_use = "returns the rendered detection and its diagnostics"]
    pub fn forward_with_diagnostics(
        &mut self,
        image: &GrayImage,
    ) -> (LaneDetection, FrameDiagnostics) {
        self.left_curve = None;
        self.right_curve = None;
        detect_with_diagnostics(self, image)
    }

    /// Store the state a finished frame leaves behind and hand back its
    /// detection.
    pub(crate) fn absorb(&mut self, staged: StagedDetection) -> LaneDetection {
        self.left_curve = staged.curves.left;
        self.right_curve = staged.curves.right;
        self.dimensions = Some(staged.dimensions);
        self.pixels = staged.pixels;
        staged.detection
    }

    /// The configuration this detector was built with.
    #[must_use]
    pub const fn config(&self) -> &LaneConfig {
        &self.config
    }

    /// Left boundary fitted by the most recent frame.
    #[must_use]
    pub const fn left_curve(&self) -> Option<&LaneCurve> {
        self.left_curve.as_ref()
    }

    /// Right boundary fitted by the most recent frame.
    #[must_use]
    pub const fn right_curve(&self) -> Option<&LaneCurve> {
        self.right_curve.as_ref()
    }

    /// Dimensions of the most recent frame, if any frame was processed.
    #[must_use]
    pub const fn dimensions(&self) -> Option<Dimensions> {
        self.dimensions
    }

    /// Foreground pixels of the most recent frame.
    #[must_use]
    pub const fn pixels(&self) -> &PixelSet {
        &self.pixels
    }

    /// Forget everything the last frame left behind.
    pub fn reset(&mut self) {
        self.left_curve = None;
        self.right_curve = None;
        self.dimensions = None;
        self.pixels = PixelSet::default();
    }
}
