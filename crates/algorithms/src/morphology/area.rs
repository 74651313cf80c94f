//! Area-based mask filters
//!
//! - **Small objects**: set components with fewer than `min_area` pixels are cleared
//! - **Small holes**: unset components enclosed by the mask (not touching the
//!   grid border) with fewer than `max_area` pixels are filled

use pft_core::{Connectivity, Mask};
use tracing::debug;

use crate::region::label_components;

/// Clear connected objects smaller than `min_area` pixels.
pub fn remove_small_objects(mask: &Mask, min_area: usize, connectivity: Connectivity) -> Mask {
    if min_area <= 1 {
        return mask.clone();
    }

    let labels = label_components(mask, connectivity);
    let keep: Vec<bool> = labels
        .components
        .iter()
        .map(|c| c.area >= min_area)
        .collect();

    debug!(
        components = labels.count(),
        removed = keep.iter().filter(|k| !**k).count(),
        min_area,
        "small object removal"
    );

    labels.labels.map(|l| l != 0 && keep[l as usize - 1])
}

/// Fill enclosed holes smaller than `max_area` pixels.
///
/// Background components touching the grid border are never filled.
pub fn remove_small_holes(mask: &Mask, max_area: usize, connectivity: Connectivity) -> Mask {
    if max_area == 0 {
        return mask.clone();
    }

    let background = label_components(&mask.invert(), connectivity);
    let fill: Vec<bool> = background
        .components
        .iter()
        .map(|c| !c.touches_border && c.area < max_area)
        .collect();

    debug!(
        holes = fill.iter().filter(|f| **f).count(),
        max_area,
        "small hole removal"
    );

    let mut out = mask.clone();
    for ((r, c), l) in background.labels.indexed_iter() {
        if l != 0 && fill[l as usize - 1] {
            out[(r, c)] = true;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fill_rect(mask: &mut Mask, r0: usize, c0: usize, h: usize, w: usize, value: bool) {
        for r in r0..r0 + h {
            for c in c0..c0 + w {
                mask.set(r, c, value).unwrap();
            }
        }
    }

    #[test]
    fn test_remove_small_objects() {
        let mut mask = Mask::filled(20, 20, false);
        fill_rect(&mut mask, 2, 2, 2, 2, true);
        fill_rect(&mut mask, 8, 8, 8, 8, true);

        let out = remove_small_objects(&mask, 50, Connectivity::Eight);
        assert_eq!(out.count_true(), 64);
        assert!(!out[(2, 2)]);
        assert!(out[(10, 10)]);
    }

    #[test]
    fn test_object_exactly_min_area_kept() {
        let mut mask = Mask::filled(10, 10, false);
        fill_rect(&mut mask, 1, 1, 5, 9, true);
        let area = mask.count_true();
        assert_eq!(remove_small_objects(&mask, area, Connectivity::Eight), mask);
        assert!(!remove_small_objects(&mask, area + 1, Connectivity::Eight).any());
    }

    #[test]
    fn test_fill_small_enclosed_hole() {
        let mut mask = Mask::filled(12, 12, false);
        fill_rect(&mut mask, 1, 1, 10, 10, true);
        fill_rect(&mut mask, 4, 4, 2, 2, false);

        let out = remove_small_holes(&mask, 500, Connectivity::Four);
        assert_eq!(out.count_true(), 100);

        let unchanged = remove_small_holes(&mask, 4, Connectivity::Four);
        assert_eq!(unchanged, mask);
    }

    #[test]
    fn test_border_background_never_filled() {
        // a notch open to the grid edge is not a hole
        let mut mask = Mask::filled(6, 6, true);
        fill_rect(&mut mask, 0, 2, 2, 2, false);
        let out = remove_small_holes(&mask, 500, Connectivity::Four);
        assert_eq!(out, mask);
    }
}
