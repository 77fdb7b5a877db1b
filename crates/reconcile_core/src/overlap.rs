use reconcile_model::Shape;

use crate::geo::{densify, ldist2, meters_to_degrees};

/// Fraction of the points of `tested` lying within `tolerance_m / 2` of
/// `reference`, in `[0, 1]`.
///
/// The measure is directional: `overlap(a, b)` and `overlap(b, a)` generally
/// differ. Returns 0 when either shape is empty.
pub fn overlap(tested: &Shape, reference: &Shape, tolerance_m: f64) -> f64 {
    let profile = overlap_profile(tested, reference, tolerance_m);
    if profile.is_empty() {
        return 0.0;
    }
    let matched = profile.iter().filter(|hit| **hit).count();
    matched as f64 / profile.len() as f64
}

/// Per-point match flags of `tested` against `reference`.
///
/// The reference is densified to a spacing of half the tolerance. Each tested
/// point is then looked up starting from the previous hit, wrapping around to
/// the beginning, so that a tested shape following the reference only scans a
/// few points per lookup.
pub fn overlap_profile(tested: &Shape, reference: &Shape, tolerance_m: f64) -> Vec<bool> {
    if tested.is_empty() {
        return Vec::new();
    }
    if reference.is_empty() {
        return vec![false; tested.len()];
    }

    let tolerance = if tolerance_m.is_nan() || tolerance_m < 0.0 {
        0.0
    } else {
        tolerance_m
    };
    let reference = densify(&reference.points, tolerance / 2.0);
    let threshold = meters_to_degrees(tolerance / 2.0).powi(2);

    let mut start = 0;
    tested
        .points
        .iter()
        .map(|point| {
            let hit = (start..reference.len())
                .chain(0..start)
                .find(|&j| ldist2(*point, reference[j]) <= threshold);
            match hit {
                Some(j) => {
                    start = j;
                    true
                }
                None => false,
            }
        })
        .collect()
}
