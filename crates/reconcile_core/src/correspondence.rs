use reconcile_model::{CorrespondenceMap, Shape};
use tracing::debug;

use crate::geo::ldist2;

/// Pairs up the shapes of two sets by endpoint proximity.
///
/// Every shape of the smaller set is linked to the shape of the larger set
/// whose start and end are closest to its own. The result is not forced to be
/// a bijection: two shapes may claim the same partner, in which case the
/// inverse direction keeps the last claimant.
pub fn match_shapes(a: &[Shape], b: &[Shape]) -> CorrespondenceMap {
    let map = match_smaller_to_larger(a, b);
    if !map.is_bijection() {
        debug!(
            "shape correspondence is not a bijection: {:?} / {:?}",
            map.a_to_b, map.b_to_a
        );
    }
    map
}

/// Always assigns from the shorter set into the longer one, then transposes the
/// result back into `(a, b)` orientation. `a` counts as the shorter set on a
/// tie.
fn match_smaller_to_larger(a: &[Shape], b: &[Shape]) -> CorrespondenceMap {
    if a.len() > b.len() {
        let (b_to_a, a_to_b) = assign(b, a);
        CorrespondenceMap::new(a_to_b, b_to_a)
    } else {
        let (a_to_b, b_to_a) = assign(a, b);
        CorrespondenceMap::new(a_to_b, b_to_a)
    }
}

fn assign(smaller: &[Shape], larger: &[Shape]) -> (Vec<Option<usize>>, Vec<Option<usize>>) {
    let mut forward = Vec::with_capacity(smaller.len());
    let mut inverse = vec![None; larger.len()];

    for (i, shape) in smaller.iter().enumerate() {
        let (Some(start), Some(end)) = (shape.first(), shape.last()) else {
            // An empty shape has no endpoints to compare, so it defaults to
            // index 0 without claiming that shape in the inverse. Otherwise it
            // would displace the real partner of shape 0.
            forward.push(Some(0));
            continue;
        };
        let best = larger
            .iter()
            .enumerate()
            .filter_map(|(j, candidate)| {
                let (Some(c_start), Some(c_end)) = (candidate.first(), candidate.last()) else {
                    return None;
                };
                Some((j, ldist2(start, c_start) + ldist2(end, c_end)))
            })
            .min_by(|x, y| x.1.total_cmp(&y.1))
            .map(|(j, _)| j);

        if let Some(j) = best {
            inverse[j] = Some(i);
        }
        forward.push(best);
    }
    (forward, inverse)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(from: (f64, f64), to: (f64, f64)) -> Shape {
        Shape::from_lat_lon(&[from, (0.5 * (from.0 + to.0), 0.5 * (from.1 + to.1)), to])
    }

    #[test]
    fn matches_shapes_by_direction() {
        let community = vec![line((0.0, 0.0), (1.0, 0.0)), line((1.0, 0.0), (0.0, 0.0))];
        let provider = vec![
            line((1.0001, 0.0), (0.0001, 0.0)),
            line((0.0001, 0.0), (1.0001, 0.0)),
        ];

        let map = match_shapes(&community, &provider);

        assert_eq!(map.a_to_b, vec![Some(1), Some(0)]);
        assert_eq!(map.b_to_a, vec![Some(1), Some(0)]);
        assert!(map.is_bijection());
        for i in 0..provider.len() {
            assert_eq!(map.partner_of_a(map.partner_of_b(i).unwrap()), Some(i));
        }
    }

    #[test]
    fn transposes_when_first_set_is_larger() {
        let community = vec![
            line((0.0, 0.0), (1.0, 0.0)),
            line((1.0, 0.0), (0.0, 0.0)),
            line((5.0, 5.0), (6.0, 5.0)),
        ];
        let provider = vec![line((1.0, 0.0), (0.0, 0.0)), line((5.0, 5.0), (6.0, 5.0))];

        let map = match_shapes(&community, &provider);

        assert_eq!(map.a_to_b.len(), 3);
        assert_eq!(map.b_to_a.len(), 2);
        assert_eq!(map.b_to_a, vec![Some(1), Some(2)]);
        assert_eq!(map.a_to_b, vec![None, Some(0), Some(1)]);
        assert!(!map.is_bijection());
    }

    #[test]
    fn empty_shape_maps_to_first_index() {
        let community = vec![Shape::empty(), line((0.0, 0.0), (1.0, 0.0))];
        let provider = vec![line((0.0, 0.0), (1.0, 0.0)), line((1.0, 0.0), (0.0, 0.0))];

        let map = match_shapes(&community, &provider);

        assert_eq!(map.a_to_b, vec![Some(0), Some(0)]);
        // The empty shape does not claim provider 0 in the inverse.
        assert_eq!(map.b_to_a, vec![Some(1), None]);
    }

    #[test]
    fn keeps_last_claimant_when_not_bijective() {
        let community = vec![line((0.0, 0.0), (1.0, 0.0)), line((0.0, 0.001), (1.0, 0.001))];
        let provider = vec![line((0.0, 0.0), (1.0, 0.0)), line((9.0, 9.0), (8.0, 8.0))];

        let map = match_shapes(&community, &provider);

        assert_eq!(map.a_to_b, vec![Some(0), Some(0)]);
        assert_eq!(map.b_to_a, vec![Some(1), None]);
        assert!(!map.is_bijection());
    }

    #[test]
    fn skips_empty_candidates() {
        let community = vec![line((0.0, 0.0), (1.0, 0.0))];
        let provider = vec![Shape::empty(), line((0.0, 0.0), (1.0, 0.0))];
        let map = match_shapes(&community, &provider);
        assert_eq!(map.a_to_b, vec![Some(1)]);

        let only_empty = vec![Shape::empty(), Shape::empty()];
        let map = match_shapes(&community, &only_empty);
        assert_eq!(map.a_to_b, vec![None]);
        assert_eq!(map.b_to_a, vec![None, None]);
    }

    #[test]
    fn empty_sets_give_empty_map() {
        let map = match_shapes(&[], &[]);
        assert!(map.a_to_b.is_empty());
        assert!(map.b_to_a.is_empty());
    }
}
