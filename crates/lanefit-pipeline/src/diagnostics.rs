//! Per-frame diagnostics: timing and counts for each detection stage.
//!
//! [`detect_with_diagnostics`] drives the staged [`Pipeline`] one step
//! at a time, timing each step and collecting the metrics the stage
//! reports about itself. The detector is updated exactly as
//! [`LaneDetector::forward`] would update it.
//!
//! Timestamps are captured via the `web-time` crate, which uses
//! `performance.now()` on WASM and `std::time::Instant` on native.
//! Durations are serialized as fractional seconds (`f64`) for JSON
//! compatibility, since `std::time::Duration` does not implement serde
//! traits.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use web_time::Instant;

use crate::detector::LaneDetector;
use crate::fit::Mirroring;
use crate::pipeline::Pipeline;
use crate::types::{GrayImage, LaneDetection};

/// Serde support for `std::time::Duration` as fractional seconds.
mod duration_serde {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    /// Serialize a `Duration` as fractional seconds (`f64`).
    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        duration.as_secs_f64().serialize(serializer)
    }

    /// Deserialize a `Duration` from fractional seconds (`f64`).
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(|_| {
            serde::de::Error::custom(
                "duration seconds must be finite, non-negative, and representable as a Duration",
            )
        })
    }
}

/// Diagnostics collected from a single detection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrameDiagnostics {
    /// Foreground pixel extraction.
    pub feature_extraction: StageDiagnostics,
    /// Column histogram and seed selection.
    pub base_estimation: StageDiagnostics,
    /// Sliding-window search.
    pub window_tracking: StageDiagnostics,
    /// Mirroring and quadratic fit.
    pub curve_fitting: StageDiagnostics,
    /// Overlay drawing and center estimate.
    pub render: StageDiagnostics,
    /// Wall-clock duration of the whole detection (seconds).
    #[serde(with = "duration_serde")]
    pub total_duration: Duration,
    /// Summary of the frame.
    pub summary: FrameSummary,
}

/// Diagnostics for a single stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageDiagnostics {
    /// Wall-clock duration of this stage (seconds).
    #[serde(with = "duration_serde")]
    pub duration: Duration,
    /// Stage-specific metrics.
    pub metrics: StageMetrics,
}

/// Stage-specific metrics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StageMetrics {
    /// Foreground pixel extraction.
    FeatureExtraction {
        /// Image width in pixels.
        width: u32,
        /// Image height in pixels.
        height: u32,
        /// Number of non-zero pixels.
        foreground_pixels: usize,
    },
    /// Seed selection.
    BaseEstimation {
        /// Left seed column.
        left_seed: i64,
        /// Right seed column.
        right_seed: i64,
        /// The lower-half histogram was empty.
        flat: bool,
    },
    /// Sliding-window search.
    WindowTracking {
        /// Number of bands searched.
        band_count: usize,
        /// Rows per band.
        band_height: i64,
        /// Pixels assigned to the left boundary.
        left_pixels: usize,
        /// Pixels assigned to the right boundary.
        right_pixels: usize,
        /// Bands in which the left window recentered.
        left_recenters: usize,
        /// Bands in which the right window recentered.
        right_recenters: usize,
    },
    /// Mirroring and fitting.
    CurveFitting {
        /// Which side, if any, was synthesized.
        mirroring: Mirroring,
        /// Left points after mirroring.
        left_points: usize,
        /// Right points after mirroring.
        right_points: usize,
        /// Whether a left curve was produced.
        left_fitted: bool,
        /// Whether a right curve was produced.
        right_fitted: bool,
    },
    /// Rendering.
    Render {
        /// Both curves were present.
        success: bool,
        /// Lane-center column at the reference row (`0` on failure).
        offset: i64,
    },
}

/// High-level summary of a frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrameSummary {
    /// Image width in pixels.
    pub image_width: u32,
    /// Image height in pixels.
    pub image_height: u32,
    /// Number of foreground pixels.
    pub foreground_pixels: usize,
    /// Whether both boundaries were found.
    pub success: bool,
    /// Lane-center column at the reference row.
    pub offset: i64,
}

impl FrameDiagnostics {
    /// Format diagnostics as a human-readable report.
    #[must_use]
    pub fn report(&self) -> String {
        let mut lines = Vec::new();

        lines.push(format!("Lane Detection Report\n{}", "=".repeat(60)));
        lines.push(format!(
            "Image: {}x{} ({} foreground pixels)",
            self.summary.image_width, self.summary.image_height, self.summary.foreground_pixels,
        ));
        lines.push(format!(
            "Total duration: {:.3}ms",
            duration_ms(self.total_duration),
        ));
        lines.push(String::new());

        lines.push(format!(
            "{:<24} {:>10} {:>10}  {}",
            "Stage", "Duration", "% Total", "Details"
        ));
        lines.push("-".repeat(80));

        let total_ms = duration_ms(self.total_duration);
        let stages = [
            ("Feature Extraction", &self.feature_extraction),
            ("Base Estimation", &self.base_estimation),
            ("Window Tracking", &self.window_tracking),
            ("Curve Fitting", &self.curve_fitting),
            ("Render", &self.render),
        ];

        for (name, diag) in stages {
            let ms = duration_ms(diag.duration);
            let pct = if total_ms > 0.0 {
                ms / total_ms * 100.0
            } else {
                0.0
            };
            let details = format_metrics(&diag.metrics);
            lines.push(format!("{name:<24} {ms:>8.3}ms {pct:>9.1}%  {details}"));
        }

        lines.push(String::new());
        if self.summary.success {
            lines.push(format!(
                "Lane found  |  Center offset: {}",
                self.summary.offset
            ));
        } else {
            lines.push("Lane not found".to_string());
        }

        lines.join("\n")
    }
}

/// Convert a `Duration` to milliseconds as `f64`.
fn duration_ms(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}

/// Format stage metrics into a compact detail string.
fn format_metrics(metrics: &StageMetrics) -> String {
    match metrics {
        StageMetrics::FeatureExtraction {
            width,
            height,
            foreground_pixels,
        } => {
            #[allow(clippy::cast_precision_loss)]
            let density = {
                let total = u64::from(*width) * u64::from(*height);
                if total > 0 {
                    *foreground_pixels as f64 / total as f64 * 100.0
                } else {
                    0.0
                }
            };
            format!("{width}x{height} fg={foreground_pixels} ({density:.1}%)")
        }
        StageMetrics::BaseEstimation {
            left_seed,
            right_seed,
            flat,
        } => {
            let flat = if *flat { " (flat)" } else { "" };
            format!("left={left_seed} right={right_seed}{flat}")
        }
        StageMetrics::WindowTracking {
            band_count,
            band_height,
            left_pixels,
            right_pixels,
            left_recenters,
            right_recenters,
        } => {
            format!(
                "{band_count}x{band_height}px L={left_pixels} ({left_recenters} moves) R={right_pixels} ({right_recenters} moves)",
            )
        }
        StageMetrics::CurveFitting {
            mirroring,
            left_points,
            right_points,
            left_fitted,
            right_fitted,
        } => {
            format!(
                "mirror={mirroring} L={left_points}{} R={right_points}{}",
                fitted_mark(*left_fitted),
                fitted_mark(*right_fitted),
            )
        }
        StageMetrics::Render { success, offset } => {
            if *success {
                format!("offset={offset}")
            } else {
                "no lane".to_string()
            }
        }
    }
}

const fn fitted_mark(fitted: bool) -> &'static str {
    if fitted { " fit" } else { " -" }
}

/// Run one detection through `detector`, timing every stage.
///
/// Produces the same [`LaneDetection`] and leaves the detector in the
/// same state as [`LaneDetector::forward`].
pub fn detect_with_diagnostics(
    detector: &mut LaneDetector,
    image: &GrayImage,
) -> (LaneDetection, FrameDiagnostics) {
    let total_start = Instant::now();

    let start = Instant::now();
    let features = Pipeline::new(image, detector.config()).extract_features();
    let feature_extraction = timed(start, features.metrics());

    let start = Instant::now();
    let bases = features.estimate_bases();
    let base_estimation = timed(start, bases.metrics());

    let start = Instant::now();
    let tracked = bases.track_windows();
    let window_tracking = timed(start, tracked.metrics());

    let start = Instant::now();
    let fitted = tracked.fit_curves();
    let curve_fitting = timed(start, fitted.metrics());

    let start = Instant::now();
    let rendered = fitted.render();
    let render = timed(start, rendered.metrics());

    let total_duration = total_start.elapsed();

    let staged = rendered.into_staged();
    let summary = FrameSummary {
        image_width: staged.dimensions.width,
        image_height: staged.dimensions.height,
        foreground_pixels: staged.pixels.len(),
        success: staged.detection.success,
        offset: staged.detection.offset,
    };
    let detection = detector.absorb(staged);

    (
        detection,
        FrameDiagnostics {
            feature_extraction,
            base_estimation,
            window_tracking,
            curve_fitting,
            render,
            total_duration,
            summary,
        },
    )
}

fn timed(start: Instant, metrics: StageMetrics) -> StageDiagnostics {
    StageDiagnostics {
        duration: start.elapsed(),
        metrics,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::types::LaneConfig;

    fn stage(ms: u64, metrics: StageMetrics) -> StageDiagnostics {
        StageDiagnostics {
            duration: Duration::from_millis(ms),
            metrics,
        }
    }

    fn sample_diagnostics(success: bool) -> FrameDiagnostics {
        FrameDiagnostics {
            feature_extraction: stage(
                2,
                StageMetrics::FeatureExtraction {
                    width: 400,
                    height: 600,
                    foreground_pixels: 4800,
                },
            ),
            base_estimation: stage(
                1,
                StageMetrics::BaseEstimation {
                    left_seed: 100,
                    right_seed: 300,
                    flat: false,
                },
            ),
            window_tracking: stage(
                3,
                StageMetrics::WindowTracking {
                    band_count: 9,
                    band_height: 66,
                    left_pixels: 2400,
                    right_pixels: 2400,
                    left_recenters: 9,
                    right_recenters: 9,
                },
            ),
            curve_fitting: stage(
                1,
                StageMetrics::CurveFitting {
                    mirroring: Mirroring::None,
                    left_points: 2400,
                    right_points: 2400,
                    left_fitted: true,
                    right_fitted: true,
                },
            ),
            render: stage(
                3,
                StageMetrics::Render {
                    success,
                    offset: 200,
                },
            ),
            total_duration: Duration::from_millis(10),
            summary: FrameSummary {
                image_width: 400,
                image_height: 600,
                foreground_pixels: 4800,
                success,
                offset: 200,
            },
        }
    }

    #[test]
    fn duration_ms_converts_correctly() {
        let d = Duration::from_millis(1234);
        let ms = duration_ms(d);
        assert!((ms - 1234.0).abs() < 0.01);
    }

    #[test]
    fn report_lists_every_stage() {
        let report = sample_diagnostics(true).report();
        assert!(report.contains("Lane Detection Report"));
        for name in [
            "Feature Extraction",
            "Base Estimation",
            "Window Tracking",
            "Curve Fitting",
            "Render",
        ] {
            assert!(report.contains(name), "missing {name}");
        }
        assert!(report.contains("left=100 right=300"));
        assert!(report.contains("Center offset: 200"));
    }

    #[test]
    fn report_marks_failed_frame() {
        let report = sample_diagnostics(false).report();
        assert!(report.contains("Lane not found"));
        assert!(report.contains("no lane"));
    }

    #[test]
    fn durations_serialize_as_seconds() {
        let json = serde_json::to_value(sample_diagnostics(true)).unwrap();
        assert!((json["total_duration"].as_f64().unwrap() - 0.010).abs() < 1e-9);
        assert!((json["render"]["duration"].as_f64().unwrap() - 0.003).abs() < 1e-9);
    }

    #[test]
    fn negative_duration_is_rejected() {
        let mut json = serde_json::to_value(sample_diagnostics(true)).unwrap();
        json["total_duration"] = serde_json::json!(-1.0);
        let parsed: Result<FrameDiagnostics, _> = serde_json::from_value(json);
        assert!(parsed.is_err());
    }

    #[test]
    fn detect_with_diagnostics_matches_forward() {
        // Equal-width stripes (no mirroring) with means 50 and 151 keep
        // the floored center away from an integer boundary.
        let image = GrayImage::from_fn(200, 300, |x, _| {
            if (48..=52).contains(&x) || (149..=153).contains(&x) {
                image::Luma([255])
            } else {
                image::Luma([0])
            }
        });
        let config = LaneConfig {
            margin: 30,
            seed_buffer: 20,
            min_pixels_to_fit: 100,
            ..LaneConfig::default()
        };

        let mut plain = LaneDetector::new(config.clone()).unwrap();
        let expected = plain.forward(&image);

        let mut instrumented = LaneDetector::new(config).unwrap();
        let (detection, diagnostics) = detect_with_diagnostics(&mut instrumented, &image);

        assert_eq!(detection.success, expected.success);
        assert_eq!(detection.offset, expected.offset);
        assert_eq!(detection.overlay, expected.overlay);
        assert_eq!(instrumented.left_curve(), plain.left_curve());
        assert_eq!(instrumented.right_curve(), plain.right_curve());

        assert!(diagnostics.summary.success);
        assert_eq!(diagnostics.summary.offset, 100);
        assert_eq!(
            diagnostics.base_estimation.metrics,
            StageMetrics::BaseEstimation {
                left_seed: 48,
                right_seed: 149,
                flat: false,
            }
        );
    }
}
