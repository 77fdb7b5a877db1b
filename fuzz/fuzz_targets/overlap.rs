#![no_main]
use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use reconcile_core::overlap;
use reconcile_model::{Coordinate, Shape};

#[derive(Debug, Arbitrary)]
struct FuzzData {
    tested: Vec<(i16, i16)>,
    reference: Vec<(i16, i16)>,
    tolerance: u16,
}

fn shape(points: &[(i16, i16)]) -> Shape {
    Shape::from_points(
        points
            .iter()
            .take(64)
            // About 2 km of span keeps densification small.
            .map(|&(lat, lon)| {
                Coordinate::new((lat % 200) as f64 * 1e-4, (lon % 200) as f64 * 1e-4)
            })
            .collect(),
    )
}

fuzz_target!(|data: FuzzData| {
    let tested = shape(&data.tested);
    let reference = shape(&data.reference);
    let tolerance = 1.0 + (data.tolerance % 500) as f64;

    let score = overlap(&tested, &reference, tolerance);
    assert!((0.0..=1.0).contains(&score));

    if !reference.is_empty() {
        assert_eq!(overlap(&reference, &reference, tolerance), 1.0);
    }
});
