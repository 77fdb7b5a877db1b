//! Distance helpers shared by the assembler, the resolver and the scorer.
//!
//! Everything except [`haversine_meters`] works on the planar squared
//! difference of degrees. This ignores longitude compression at higher
//! latitudes, which is acceptable for the sub-100 m tolerances in use.

use reconcile_model::Coordinate;

pub const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

/// Squared planar distance between two coordinates, in degrees².
pub fn ldist2(a: Coordinate, b: Coordinate) -> f64 {
    let dlat = a.lat - b.lat;
    let dlon = a.lon - b.lon;
    dlat * dlat + dlon * dlon
}

/// Great-circle distance in meters.
pub fn haversine_meters(a: Coordinate, b: Coordinate) -> f64 {
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let dlat = lat2 - lat1;
    let dlon = (b.lon - a.lon).to_radians();
    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    2.0 * h.sqrt().min(1.0).asin() * EARTH_RADIUS_METERS
}

/// Latitude difference in degrees of a north-south distance in meters.
/// Used as an approximate inverse of [`haversine_meters`].
pub fn meters_to_degrees(meters: f64) -> f64 {
    (meters / EARTH_RADIUS_METERS).to_degrees()
}

/// Upper bound on the points inserted into a single edge by [`densify`].
pub const MAX_DENSIFY_PARTS: usize = 10_000;

/// Returns `points` with linearly interpolated points inserted so that no two
/// consecutive points are more than `max_step_meters` apart. Original points
/// are kept. A non-positive or non-finite step returns the input unchanged.
///
/// An edge is split into at most [`MAX_DENSIFY_PARTS`] parts, so very small
/// steps leave the spacing above `max_step_meters`.
pub fn densify(points: &[Coordinate], max_step_meters: f64) -> Vec<Coordinate> {
    let step = meters_to_degrees(max_step_meters);
    if points.len() < 2 || !step.is_finite() || step <= 0.0 {
        return points.to_vec();
    }
    let step2 = step * step;

    let mut out = Vec::with_capacity(points.len());
    out.push(points[0]);
    for pair in points.windows(2) {
        let (from, to) = (pair[0], pair[1]);
        let d2 = ldist2(from, to);
        if d2 < step2 {
            out.push(to);
            continue;
        }
        let parts = ((d2.sqrt() / step) as usize)
            .saturating_add(1)
            .min(MAX_DENSIFY_PARTS);
        let dlat = (to.lat - from.lat) / parts as f64;
        let dlon = (to.lon - from.lon) / parts as f64;
        for j in 1..parts {
            let j = j as f64;
            out.push(Coordinate::new(from.lat + j * dlat, from.lon + j * dlon));
        }
        out.push(to);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn planar_distance_is_squared() {
        let a = Coordinate::new(0.0, 0.0);
        let b = Coordinate::new(3.0, 4.0);
        assert_eq!(ldist2(a, b), 25.0);
        assert_eq!(ldist2(b, a), 25.0);
    }

    #[test]
    fn haversine_of_one_degree_latitude() {
        let d = haversine_meters(Coordinate::new(60.0, 24.0), Coordinate::new(61.0, 24.0));
        assert!((d - 111_195.0).abs() < 1.0, "got {}", d);
    }

    #[test]
    fn meters_to_degrees_inverts_latitude_haversine() {
        let degrees = meters_to_degrees(1000.0);
        let back = haversine_meters(Coordinate::new(0.0, 0.0), Coordinate::new(degrees, 0.0));
        assert!((back - 1000.0).abs() < 1e-6);
    }

    #[test]
    fn densify_bounds_spacing() {
        let line = vec![Coordinate::new(0.0, 0.0), Coordinate::new(0.01, 0.0)];
        let dense = densify(&line, 100.0);

        assert_eq!(dense.first(), line.first());
        assert_eq!(dense.last(), line.last());
        let max_step = meters_to_degrees(100.0);
        for pair in dense.windows(2) {
            assert!(ldist2(pair[0], pair[1]).sqrt() <= max_step + 1e-12);
        }
        assert!(dense.len() > 10);
    }

    #[test]
    fn densify_keeps_close_points() {
        let line = vec![Coordinate::new(0.0, 0.0), Coordinate::new(0.00001, 0.0)];
        assert_eq!(densify(&line, 100.0), line);
    }

    #[test]
    fn densify_caps_parts_per_edge() {
        let line = vec![Coordinate::new(60.0, 24.0), Coordinate::new(60.0, 24.01)];
        let dense = densify(&line, 1e-300);
        assert_eq!(dense.len(), MAX_DENSIFY_PARTS + 1);
        assert_eq!(dense.last(), line.last());
    }

    #[test]
    fn densify_ignores_zero_step() {
        let line = vec![Coordinate::new(0.0, 0.0), Coordinate::new(1.0, 0.0)];
        assert_eq!(densify(&line, 0.0), line);
        assert_eq!(densify(&line, f64::NAN), line);
        assert!(densify(&[], 10.0).is_empty());
    }
}
