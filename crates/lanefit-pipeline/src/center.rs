//! Lane-center estimate at the reference row.

use crate::types::LaneCurve;

/// Column midway between the two boundaries at `reference_row`,
/// rounded down.
///
/// Both curves are required by signature; callers holding
/// `Option<LaneCurve>` must check for presence first (see
/// [`crate::fit::FittedCurves::both`]). A non-finite midpoint saturates
/// like any float-to-integer cast.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn measure_center(left: &LaneCurve, right: &LaneCurve, reference_row: u32) -> i64 {
    let row = f64::from(reference_row);
    let midpoint = f64::midpoint(left.evaluate(row), right.evaluate(row));
    midpoint.floor() as i64
}
