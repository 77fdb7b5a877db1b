use reconcile_model::Coordinate;
use serde::{Deserialize, Serialize};

use crate::geo::haversine_meters;

/// Distance from one community stop to the closest provider platform.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StopDistance {
    pub stop_index: usize,
    pub platform_index: usize,
    pub distance_m: f64,
}

/// For each stop, the nearest platform by great-circle distance. Empty when
/// there are no platforms.
pub fn nearest_platforms(stops: &[Coordinate], platforms: &[Coordinate]) -> Vec<StopDistance> {
    stops
        .iter()
        .enumerate()
        .filter_map(|(stop_index, stop)| {
            platforms
                .iter()
                .enumerate()
                .map(|(platform_index, platform)| StopDistance {
                    stop_index,
                    platform_index,
                    distance_m: haversine_meters(*stop, *platform),
                })
                .min_by(|a, b| a.distance_m.total_cmp(&b.distance_m))
        })
        .collect()
}
