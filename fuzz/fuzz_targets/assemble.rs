#![no_main]
use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use reconcile_core::{assemble, match_shapes};
use reconcile_model::{Coordinate, Segment, Shape};

#[derive(Debug, Arbitrary)]
struct FuzzData {
    segments: Vec<Vec<(u8, u8)>>,
    anchor: Option<(u8, u8)>,
}

// A small grid so that segment endpoints coincide often.
fn grid(point: (u8, u8)) -> Coordinate {
    Coordinate::new(60.0 + (point.0 % 16) as f64 * 0.001, 24.0 + (point.1 % 16) as f64 * 0.001)
}

fn is_edge(segments: &[Segment], a: Coordinate, b: Coordinate) -> bool {
    segments.iter().any(|segment| {
        segment
            .points
            .windows(2)
            .any(|edge| (edge[0] == a && edge[1] == b) || (edge[0] == b && edge[1] == a))
    })
}

fuzz_target!(|data: FuzzData| {
    let segments: Vec<Segment> = data
        .segments
        .iter()
        .take(32)
        .map(|points| Segment::new(points.iter().take(16).copied().map(grid).collect()))
        .collect();

    let Ok(shape) = assemble(&segments, data.anchor.map(grid)) else {
        assert!(segments.iter().any(|segment| segment.len() < 2));
        return;
    };

    if !shape.has_gaps {
        for pair in shape.points.windows(2) {
            assert!(is_edge(&segments, pair[0], pair[1]));
        }
    }

    let reversed: Vec<Shape> = segments
        .iter()
        .map(|segment| Shape::from_points(segment.points.clone()))
        .collect();
    let map = match_shapes(&[shape], &reversed);
    assert_eq!(map.a_to_b.len(), 1);
    assert_eq!(map.b_to_a.len(), reversed.len());
});
