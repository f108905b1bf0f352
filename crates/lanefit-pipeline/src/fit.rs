//! Quadratic boundary fitting with a mirroring fallback.
//!
//! Each side's pixels are fitted with `x = a·y² + b·y + c` by least
//! squares. Before fitting, the sparser side is replaced by a copy of
//! the denser side shifted by `lane_width_fallback`, which assumes the
//! two boundaries are parallel at a fixed distance. A side is fitted
//! only when it holds strictly more than `min_pixels_to_fit` points.

use serde::{Deserialize, Serialize};

use crate::types::{LaneConfig, LaneCurve, Pixel, Side};
use crate::window::TrackedPixels;

/// Which side, if any, was synthesized from the other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Mirroring {
    /// Both sides had the same number of points; nothing was replaced.
    #[default]
    None,
    /// The left points were replaced by the right points shifted left.
    LeftFromRight,
    /// The right points were replaced by the left points shifted right.
    RightFromLeft,
}

impl Mirroring {
    /// The side that was replaced, if any.
    #[must_use]
    pub const fn synthesized(self) -> Option<Side> {
        match self {
            Self::None => None,
            Self::LeftFromRight => Some(Side::Left),
            Self::RightFromLeft => Some(Side::Right),
        }
    }
}

impl std::fmt::Display for Mirroring {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::None => f.write_str("none"),
            Self::LeftFromRight => f.write_str("left-from-right"),
            Self::RightFromLeft => f.write_str("right-from-left"),
        }
    }
}

/// Point sets after the mirroring rule has been applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MirroredPoints {
    /// Left points, possibly synthesized.
    pub left: Vec<Pixel>,
    /// Right points, possibly synthesized.
    pub right: Vec<Pixel>,
    /// What was replaced.
    pub mirroring: Mirroring,
}

/// Outcome of fitting both sides of one frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FittedCurves {
    /// Left boundary, absent when the side had too few points.
    pub left: Option<LaneCurve>,
    /// Right boundary, absent when the side had too few points.
    pub right: Option<LaneCurve>,
    /// Mirroring decision taken before fitting.
    pub mirroring: Mirroring,
    /// Left point count after mirroring.
    pub left_points: usize,
    /// Right point count after mirroring.
    pub right_points: usize,
}

impl FittedCurves {
    /// Both curves, when both were fitted.
    #[must_use]
    pub const fn both(&self) -> Option<(&LaneCurve, &LaneCurve)> {
        match (&self.left, &self.right) {
            (Some(left), Some(right)) => Some((left, right)),
            _ => None,
        }
    }

    /// The curve for one side.
    #[must_use]
    pub const fn side(&self, side: Side) -> Option<&LaneCurve> {
        match side {
            Side::Left => self.left.as_ref(),
            Side::Right => self.right.as_ref(),
        }
    }
}

/// Replace the strictly sparser side by the denser side shifted by
/// `lane_width`.
///
/// The synthesized side has the same length, order, and rows as the
/// side it was copied from, with `x_left = x_right - lane_width`
/// pointwise (or `x_right = x_left + lane_width`). Equal counts,
/// including two empty sides, are left alone.
#[must_use = "returns the mirrored point sets"]
pub fn mirror_sparse_side(left: Vec<Pixel>, right: Vec<Pixel>, lane_width: i64) -> MirroredPoints {
    if left.len() < right.len() {
        let left = shifted(&right, -lane_width);
        MirroredPoints {
            left,
            right,
            mirroring: Mirroring::LeftFromRight,
        }
    } else if right.len() < left.len() {
        let right = shifted(&left, lane_width);
        MirroredPoints {
            left,
            right,
            mirroring: Mirroring::RightFromLeft,
        }
    } else {
        MirroredPoints {
            left,
            right,
            mirroring: Mirroring::None,
        }
    }
}

fn shifted(points: &[Pixel], dx: i64) -> Vec<Pixel> {
    points.iter().map(|p| Pixel::new(p.x + dx, p.y)).collect()
}

/// Mirror the sparse side and fit whichever sides pass the threshold.
#[must_use = "returns the fitted curves"]
pub fn fit_curves(tracked: &TrackedPixels, config: &LaneConfig) -> FittedCurves {
    let mirrored = mirror_sparse_side(
        tracked.left.clone(),
        tracked.right.clone(),
        config.lane_width_fallback,
    );
    if mirrored.mirroring != Mirroring::None {
        log::debug!(
            "mirroring {} (left {} px, right {} px before)",
            mirrored.mirroring,
            tracked.left.len(),
            tracked.right.len(),
        );
    }

    let left = fit_side(Side::Left, &mirrored.left, config.min_pixels_to_fit);
    let right = fit_side(Side::Right, &mirrored.right, config.min_pixels_to_fit);

    FittedCurves {
        left,
        right,
        mirroring: mirrored.mirroring,
        left_points: mirrored.left.len(),
        right_points: mirrored.right.len(),
    }
}

fn fit_side(side: Side, points: &[Pixel], min_pixels_to_fit: usize) -> Option<LaneCurve> {
    if points.len() <= min_pixels_to_fit {
        log::debug!(
            "{side} boundary not fitted: {} points, need more than {min_pixels_to_fit}",
            points.len(),
        );
        return None;
    }
    let curve = fit_quadratic(points)?;
    log::debug!(
        "{side} boundary x = {:.3e}·y² + {:.4}·y + {:.2} from {} points",
        curve.a,
        curve.b,
        curve.c,
        points.len(),
    );
    Some(curve)
}

/// Least-squares fit of `x = a·y² + b·y + c` to `points`.
///
/// Rows are normalized to `[0, 1]` before solving the 3×3 normal
/// equations, then the coefficients are mapped back to pixel rows.
/// When the points span fewer than three distinct rows the quadratic is
/// underdetermined and the fit drops to a line (two rows) or the
/// constant mean column (one row).
///
/// Returns `None` only for an empty slice.
#[must_use]
#[allow(clippy::cast_precision_loss, clippy::many_single_char_names)]
pub fn fit_quadratic(points: &[Pixel]) -> Option<LaneCurve> {
    let first = points.first()?;
    let n = points.len() as f64;

    let (y_min, y_max) = points
        .iter()
        .fold((first.y, first.y), |(lo, hi), p| (lo.min(p.y), hi.max(p.y)));
    let mean_x = points.iter().map(|p| p.x as f64).sum::<f64>() / n;
    if y_min == y_max {
        return Some(LaneCurve::new(0.0, 0.0, mean_x));
    }

    let offset = y_min as f64;
    let span = (y_max - y_min) as f64;

    let mut s1 = 0.0;
    let mut s2 = 0.0;
    let mut s3 = 0.0;
    let mut s4 = 0.0;
    let mut sx0 = 0.0;
    let mut sx1 = 0.0;
    let mut sx2 = 0.0;
    for p in points {
        let t = (p.y as f64 - offset) / span;
        let x = p.x as f64;
        let t2 = t * t;
        s1 += t;
        s2 += t2;
        s3 += t2 * t;
        s4 += t2 * t2;
        sx0 += x;
        sx1 += x * t;
        sx2 += x * t2;
    }

    //   | s4 s3 s2 | | A |   | sx2 |
    //   | s3 s2 s1 | | B | = | sx1 |
    //   | s2 s1 n  | | C |   | sx0 |
    let (a, b, c) = solve_3x3(
        [[s4, s3, s2], [s3, s2, s1], [s2, s1, n]],
        [sx2, sx1, sx0],
        n,
    )
    .or_else(|| {
        // Two distinct rows: fit x = B·t + C.
        let det = s2.mul_add(n, -(s1 * s1));
        (det.abs() > f64::EPSILON * n).then(|| {
            let b = sx1.mul_add(n, -(s1 * sx0)) / det;
            let c = s2.mul_add(sx0, -(s1 * sx1)) / det;
            (0.0, b, c)
        })
    })
    .unwrap_or((0.0, 0.0, mean_x));

    Some(denormalize(a, b, c, offset, span))
}

/// Map coefficients in `t = (y - offset) / span` back to `y`.
fn denormalize(a: f64, b: f64, c: f64, offset: f64, span: f64) -> LaneCurve {
    let span2 = span * span;
    LaneCurve::new(
        a / span2,
        (-2.0 * a / span2).mul_add(offset, b / span),
        (a / span2).mul_add(offset * offset, (-b / span).mul_add(offset, c)),
    )
}

/// Solve a 3×3 system by Gaussian elimination with partial pivoting.
///
/// Returns `None` when a pivot falls below `1e-12 · scale`.
fn solve_3x3(mut m: [[f64; 3]; 3], mut rhs: [f64; 3], scale: f64) -> Option<(f64, f64, f64)> {
    let tolerance = 1e-12 * scale.max(1.0);

    for col in 0..3 {
        let pivot = (col..3).max_by(|&i, &j| m[i][col].abs().total_cmp(&m[j][col].abs()))?;
        if m[pivot][col].abs() < tolerance {
            return None;
        }
        m.swap(col, pivot);
        rhs.swap(col, pivot);

        let pivot_row = m[col];
        for row in (col + 1)..3 {
            let factor = m[row][col] / pivot_row[col];
            for (dst, src) in m[row][col..].iter_mut().zip(&pivot_row[col..]) {
                *dst = (-factor).mul_add(*src, *dst);
            }
            rhs[row] = (-factor).mul_add(rhs[col], rhs[row]);
        }
    }

    let c = rhs[2] / m[2][2];
    let b = (-m[1][2]).mul_add(c, rhs[1]) / m[1][1];
    let a = (-m[0][1]).mul_add(b, (-m[0][2]).mul_add(c, rhs[0])) / m[0][0];

    (a.is_finite() && b.is_finite() && c.is_finite()).then_some((a, b, c))
}
