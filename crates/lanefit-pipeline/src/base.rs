//! Seed positions for the sliding-window search.
//!
//! Counts foreground pixels per column over the lower half of the
//! image and picks the densest column on each side of the midpoint.
//! A band of `seed_buffer` columns around the midpoint is excluded so
//! the two searches do not start on the same boundary.

use serde::{Deserialize, Serialize};

use crate::types::{Dimensions, PixelSet};

/// Horizontal starting columns for the left and right searches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BasePositions {
    /// Seed column of the left search.
    pub left: i64,
    /// Seed column of the right search.
    pub right: i64,
    /// `true` when the profile held no foreground at all, in which case
    /// both seeds are the first index of their search range.
    pub flat: bool,
}

/// Per-column foreground counts over rows `height / 2 ..`.
///
/// The result has exactly `width` entries. Pixels outside the image
/// are ignored.
#[must_use = "returns the column profile"]
pub fn column_profile(pixels: &PixelSet, dimensions: Dimensions) -> Vec<u32> {
    let width = i64::from(dimensions.width);
    let half = i64::from(dimensions.height / 2);
    let mut profile = vec![0_u32; dimensions.width as usize];
    for p in pixels {
        if p.y >= half && p.y < i64::from(dimensions.height) && (0..width).contains(&p.x) {
            #[allow(clippy::cast_sign_loss, clippy::cast_possible_truncation)]
            let column = p.x as usize;
            profile[column] += 1;
        }
    }
    profile
}

/// Pick the left and right seeds from a column profile.
///
/// The left seed is the densest column in `[0, midpoint - seed_buffer)`
/// and the right seed the densest in `[midpoint + seed_buffer, width)`.
/// Ties go to the lowest column. An empty range (narrow images) yields
/// its first index: `0` on the left, `midpoint + seed_buffer` on the
/// right.
#[must_use]
pub fn estimate_bases(profile: &[u32], seed_buffer: u32) -> BasePositions {
    let midpoint = profile.len() / 2;
    let buffer = seed_buffer as usize;
    let left_end = midpoint.saturating_sub(buffer);
    let right_start = midpoint + buffer;

    let left = argmax(&profile[..left_end]);
    let right = right_start + argmax(profile.get(right_start..).unwrap_or_default());
    let flat = profile.iter().all(|&count| count == 0);

    #[allow(clippy::cast_possible_wrap)]
    let bases = BasePositions {
        left: left as i64,
        right: right as i64,
        flat,
    };
    if flat {
        log::debug!(
            "flat column profile; using degenerate seeds left={} right={}",
            bases.left,
            bases.right
        );
    } else {
        log::debug!("seeds left={} right={}", bases.left, bases.right);
    }
    bases
}

/// Index of the first maximum, or `0` for an empty slice.
fn argmax(values: &[u32]) -> usize {
    let mut best = 0;
    for (i, &v) in values.iter().enumerate() {
        if v > values[best] {
            best = i;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Pixel;

    fn dims(width: u32, height: u32) -> Dimensions {
        Dimensions { width, height }
    }

    #[test]
    fn profile_counts_only_lower_half() {
        let pixels = PixelSet::new(vec![
            Pixel::new(2, 0),
            Pixel::new(2, 4),
            Pixel::new(2, 5),
            Pixel::new(3, 9),
        ]);
        let profile = column_profile(&pixels, dims(6, 10));
        assert_eq!(profile, vec![0, 0, 1, 1, 0, 0]);
    }

    #[test]
    fn profile_ignores_out_of_image_pixels() {
        let pixels = PixelSet::new(vec![Pixel::new(-1, 8), Pixel::new(6, 8), Pixel::new(0, 10)]);
        let profile = column_profile(&pixels, dims(6, 10));
        assert!(profile.iter().all(|&c| c == 0));
    }

    #[test]
    fn seeds_pick_densest_column_per_side() {
        let mut profile = vec![0_u32; 400];
        profile[100] = 30;
        profile[120] = 10;
        profile[300] = 25;
        profile[201] = 99; // inside the excluded midpoint band
        let bases = estimate_bases(&profile, 50);
        assert_eq!(bases.left, 100);
        assert_eq!(bases.right, 300);
        assert!(!bases.flat);
    }

    #[test]
    fn flat_profile_yields_first_index_of_each_range() {
        let profile = vec![0_u32; 400];
        let bases = estimate_bases(&profile, 50);
        assert_eq!(bases.left, 0);
        assert_eq!(bases.right, 250);
        assert!(bases.flat);
    }

    #[test]
    fn ties_go_to_lowest_column() {
        let mut profile = vec![0_u32; 400];
        profile[10] = 5;
        profile[40] = 5;
        profile[260] = 7;
        profile[390] = 7;
        let bases = estimate_bases(&profile, 50);
        assert_eq!(bases.left, 10);
        assert_eq!(bases.right, 260);
    }

    #[test]
    fn narrow_image_has_empty_search_ranges() {
        let profile = vec![3_u32; 60];
        let bases = estimate_bases(&profile, 50);
        assert_eq!(bases.left, 0);
        assert_eq!(bases.right, 80);
    }
}
