use std::fmt;
use std::str::FromStr;

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("invalid transport mode: {0}")]
    InvalidTransportMode(String),
    #[error("invalid coordinate: {0}")]
    InvalidCoordinate(String),
}

/// A (latitude, longitude) pair in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinate {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    pub fn is_finite(&self) -> bool {
        self.lat.is_finite() && self.lon.is_finite()
    }

    /// Mean position of a member drawn with several coordinates, e.g. a
    /// platform mapped as a way. `None` for an empty slice.
    pub fn centroid(points: &[Coordinate]) -> Option<Coordinate> {
        if points.is_empty() {
            return None;
        }
        let count = points.len() as f64;
        let (lat_sum, lon_sum) = points
            .iter()
            .fold((0.0, 0.0), |(lat, lon), point| (lat + point.lat, lon + point.lon));
        Some(Coordinate::new(lat_sum / count, lon_sum / count))
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.6}, {:.6})", self.lat, self.lon)
    }
}

impl FromStr for Coordinate {
    type Err = ModelError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let (lat, lon) = value
            .split_once(',')
            .ok_or_else(|| ModelError::InvalidCoordinate(value.to_string()))?;
        let lat: f64 = lat
            .trim()
            .parse()
            .map_err(|_| ModelError::InvalidCoordinate(value.to_string()))?;
        let lon: f64 = lon
            .trim()
            .parse()
            .map_err(|_| ModelError::InvalidCoordinate(value.to_string()))?;
        let coordinate = Coordinate::new(lat, lon);
        if !coordinate.is_finite() {
            return Err(ModelError::InvalidCoordinate(value.to_string()));
        }
        Ok(coordinate)
    }
}

/// An unordered polyline fragment ("way") from the community map data.
///
/// Either endpoint may be the logical start. A segment whose first and last
/// coordinates coincide is circular, e.g. a roundabout.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Segment {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    pub points: Vec<Coordinate>,
    #[serde(default)]
    pub roundabout: bool,
}

impl Segment {
    pub fn new(points: Vec<Coordinate>) -> Self {
        Self {
            id: None,
            points,
            roundabout: false,
        }
    }

    pub fn from_lat_lon(points: &[(f64, f64)]) -> Self {
        Self::new(
            points
                .iter()
                .map(|&(lat, lon)| Coordinate::new(lat, lon))
                .collect(),
        )
    }

    pub fn with_roundabout(mut self, roundabout: bool) -> Self {
        self.roundabout = roundabout;
        self
    }

    pub fn first(&self) -> Option<Coordinate> {
        self.points.first().copied()
    }

    pub fn last(&self) -> Option<Coordinate> {
        self.points.last().copied()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn is_circular(&self) -> bool {
        self.points.len() > 2 && self.points.first() == self.points.last()
    }

    pub fn position(&self, coordinate: Coordinate) -> Option<usize> {
        self.points.iter().position(|point| *point == coordinate)
    }

    pub fn contains(&self, coordinate: Coordinate) -> bool {
        self.position(coordinate).is_some()
    }
}

/// One direction of one route as an ordered, oriented polyline.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Shape {
    pub points: Vec<Coordinate>,
    #[serde(default)]
    pub has_gaps: bool,
}

impl Shape {
    pub fn new(points: Vec<Coordinate>, has_gaps: bool) -> Self {
        Self { points, has_gaps }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_points(points: Vec<Coordinate>) -> Self {
        Self::new(points, false)
    }

    pub fn from_lat_lon(points: &[(f64, f64)]) -> Self {
        Self::from_points(
            points
                .iter()
                .map(|&(lat, lon)| Coordinate::new(lat, lon))
                .collect(),
        )
    }

    pub fn first(&self) -> Option<Coordinate> {
        self.points.first().copied()
    }

    pub fn last(&self) -> Option<Coordinate> {
        self.points.last().copied()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn reversed(&self) -> Self {
        let mut points = self.points.clone();
        points.reverse();
        Self::new(points, self.has_gaps)
    }
}

/// Index links between two shape sets. Entries are `None` where no partner
/// was found. Not guaranteed to be a bijection.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CorrespondenceMap {
    pub a_to_b: Vec<Option<usize>>,
    pub b_to_a: Vec<Option<usize>>,
}

impl CorrespondenceMap {
    pub fn new(a_to_b: Vec<Option<usize>>, b_to_a: Vec<Option<usize>>) -> Self {
        Self { a_to_b, b_to_a }
    }

    pub fn partner_of_a(&self, index: usize) -> Option<usize> {
        self.a_to_b.get(index).copied().flatten()
    }

    pub fn partner_of_b(&self, index: usize) -> Option<usize> {
        self.b_to_a.get(index).copied().flatten()
    }

    pub fn unmatched_a(&self) -> Vec<usize> {
        unmatched(&self.a_to_b)
    }

    pub fn unmatched_b(&self) -> Vec<usize> {
        unmatched(&self.b_to_a)
    }

    /// True when both sides have equal length, every entry is linked and the
    /// two directions agree.
    pub fn is_bijection(&self) -> bool {
        if self.a_to_b.len() != self.b_to_a.len() {
            return false;
        }
        self.a_to_b.iter().enumerate().all(|(a, b)| match b {
            Some(b) => self.partner_of_b(*b) == Some(a),
            None => false,
        })
    }
}

fn unmatched(links: &[Option<usize>]) -> Vec<usize> {
    links
        .iter()
        .enumerate()
        .filter(|(_, link)| link.is_none())
        .map(|(index, _)| index)
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportMode {
    Bus,
    Trolleybus,
    Tram,
    Train,
    Subway,
    LightRail,
    Monorail,
    Ferry,
    Aerialway,
}

impl TransportMode {
    pub const ALL: [TransportMode; 9] = [
        TransportMode::Bus,
        TransportMode::Trolleybus,
        TransportMode::Tram,
        TransportMode::Train,
        TransportMode::Subway,
        TransportMode::LightRail,
        TransportMode::Monorail,
        TransportMode::Ferry,
        TransportMode::Aerialway,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TransportMode::Bus => "bus",
            TransportMode::Trolleybus => "trolleybus",
            TransportMode::Tram => "tram",
            TransportMode::Train => "train",
            TransportMode::Subway => "subway",
            TransportMode::LightRail => "light_rail",
            TransportMode::Monorail => "monorail",
            TransportMode::Ferry => "ferry",
            TransportMode::Aerialway => "aerialway",
        }
    }

    /// Overlap tolerance used when the caller does not supply one. Rail and
    /// ferry geometry in the provider feed is drawn loosely, road modes follow
    /// the street network closely.
    pub fn default_tolerance_m(&self) -> f64 {
        match self {
            TransportMode::Bus | TransportMode::Trolleybus | TransportMode::Tram => 30.0,
            TransportMode::Train
            | TransportMode::Subway
            | TransportMode::LightRail
            | TransportMode::Monorail
            | TransportMode::Ferry
            | TransportMode::Aerialway => 100.0,
        }
    }
}

impl fmt::Display for TransportMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransportMode {
    type Err = ModelError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase().replace('-', "_");
        TransportMode::ALL
            .iter()
            .copied()
            .find(|mode| mode.as_str() == normalized)
            .ok_or_else(|| ModelError::InvalidTransportMode(value.to_string()))
    }
}

impl Serialize for TransportMode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for TransportMode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct TransportModeVisitor;

        impl<'de> Visitor<'de> for TransportModeVisitor {
            type Value = TransportMode;

            fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
                formatter.write_str("a transport mode such as \"bus\" or \"light_rail\"")
            }

            fn visit_str<E: de::Error>(self, value: &str) -> Result<TransportMode, E> {
                value.parse().map_err(E::custom)
            }
        }

        deserializer.deserialize_str(TransportModeVisitor)
    }
}

/// One community-mapped direction of a route: its raw segments and the
/// positions of its stop and platform members. Each member is given as the
/// list of coordinates it is drawn with (one for a node).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CommunityDirection {
    pub id: String,
    #[serde(default)]
    pub segments: Vec<Segment>,
    #[serde(default)]
    pub stops: Vec<Vec<Coordinate>>,
    #[serde(default)]
    pub platforms: Vec<Vec<Coordinate>>,
}

impl CommunityDirection {
    pub fn stop_positions(&self) -> Vec<Coordinate> {
        member_positions(&self.stops)
    }

    pub fn platform_positions(&self) -> Vec<Coordinate> {
        member_positions(&self.platforms)
    }
}

fn member_positions(members: &[Vec<Coordinate>]) -> Vec<Coordinate> {
    members
        .iter()
        .filter_map(|member| Coordinate::centroid(member))
        .collect()
}

/// A provider route pattern with ready-made geometry.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProviderPattern {
    pub id: String,
    #[serde(default)]
    pub points: Vec<Coordinate>,
    #[serde(default)]
    pub platforms: Vec<Coordinate>,
}

impl ProviderPattern {
    pub fn shape(&self) -> Shape {
        Shape::from_points(self.points.clone())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteInput {
    pub line_ref: String,
    pub mode: TransportMode,
    #[serde(default)]
    pub tolerance_m: Option<f64>,
    #[serde(default)]
    pub community: Vec<CommunityDirection>,
    #[serde(default)]
    pub provider: Vec<ProviderPattern>,
}

impl RouteInput {
    pub fn new(line_ref: impl Into<String>, mode: TransportMode) -> Self {
        Self {
            line_ref: line_ref.into(),
            mode,
            tolerance_m: None,
            community: Vec::new(),
            provider: Vec::new(),
        }
    }

    pub fn tolerance_m(&self) -> f64 {
        self.tolerance_m
            .filter(|value| value.is_finite() && *value >= 0.0)
            .unwrap_or_else(|| self.mode.default_tolerance_m())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReconcileInput {
    #[serde(default)]
    pub routes: Vec<RouteInput>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_circular_segment() {
        let ring = Segment::from_lat_lon(&[(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 0.0)]);
        assert!(ring.is_circular());

        let line = Segment::from_lat_lon(&[(0.0, 0.0), (1.0, 0.0)]);
        assert!(!line.is_circular());
    }

    #[test]
    fn computes_centroid() {
        let center = Coordinate::centroid(&[
            Coordinate::new(0.0, 0.0),
            Coordinate::new(2.0, 4.0),
        ])
        .unwrap();
        assert_eq!(center, Coordinate::new(1.0, 2.0));
        assert!(Coordinate::centroid(&[]).is_none());
    }

    #[test]
    fn parses_coordinate() {
        let coordinate: Coordinate = " 60.17, 24.94 ".parse().unwrap();
        assert_eq!(coordinate, Coordinate::new(60.17, 24.94));
        assert!("60.17".parse::<Coordinate>().is_err());
        assert!("abc,1".parse::<Coordinate>().is_err());
    }

    #[test]
    fn parses_transport_mode() {
        assert_eq!("bus".parse::<TransportMode>().unwrap(), TransportMode::Bus);
        assert_eq!(
            "Light-Rail".parse::<TransportMode>().unwrap(),
            TransportMode::LightRail
        );
        assert!("zeppelin".parse::<TransportMode>().is_err());
    }

    #[test]
    fn default_tolerance_depends_on_mode() {
        assert_eq!(TransportMode::Bus.default_tolerance_m(), 30.0);
        assert_eq!(TransportMode::Ferry.default_tolerance_m(), 100.0);
        assert_eq!(TransportMode::Train.default_tolerance_m(), 100.0);
    }

    #[test]
    fn route_tolerance_falls_back_to_mode() {
        let mut route = RouteInput::new("550", TransportMode::Bus);
        assert_eq!(route.tolerance_m(), 30.0);
        route.tolerance_m = Some(45.0);
        assert_eq!(route.tolerance_m(), 45.0);
        route.tolerance_m = Some(-1.0);
        assert_eq!(route.tolerance_m(), 30.0);
    }

    #[test]
    fn correspondence_bijection() {
        let map = CorrespondenceMap::new(vec![Some(1), Some(0)], vec![Some(1), Some(0)]);
        assert!(map.is_bijection());

        let map = CorrespondenceMap::new(vec![Some(0), Some(0)], vec![Some(1), None]);
        assert!(!map.is_bijection());
        assert_eq!(map.unmatched_a(), Vec::<usize>::new());
        assert_eq!(map.unmatched_b(), vec![1]);
    }

    #[test]
    fn deserializes_route_input() {
        let json = r#"{
            "line_ref": "550",
            "mode": "bus",
            "community": [{
                "id": "r1",
                "segments": [{"id": 7, "points": [{"lat": 0.0, "lon": 0.0}, {"lat": 1.0, "lon": 0.0}]}],
                "stops": [[{"lat": 0.0, "lon": 0.0}]]
            }],
            "provider": [{"id": "p1", "points": [{"lat": 0.0, "lon": 0.0}]}]
        }"#;
        let route: RouteInput = serde_json::from_str(json).unwrap();
        assert_eq!(route.mode, TransportMode::Bus);
        assert_eq!(route.community[0].segments[0].id, Some(7));
        assert!(!route.community[0].segments[0].roundabout);
        assert_eq!(route.community[0].stop_positions(), vec![Coordinate::new(0.0, 0.0)]);
        assert_eq!(route.provider[0].shape().len(), 1);
    }
}
