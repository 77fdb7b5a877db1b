use reconcile_model::{
    CommunityDirection, Coordinate, CorrespondenceMap, ProviderPattern, RouteInput, Shape,
    TransportMode,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    anchor_from_members, assemble, match_shapes, nearest_platforms, overlap, NoticeContainer,
    OverlapGrade, ReconcileNotice, ReconcileSettings,
};

/// One assembled community direction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DirectionOutcome {
    pub index: usize,
    pub id: String,
    /// `None` when the segments could not be assembled.
    pub shape: Option<Shape>,
    pub stops: Vec<Coordinate>,
}

impl DirectionOutcome {
    pub fn point_count(&self) -> usize {
        self.shape.as_ref().map(Shape::len).unwrap_or(0)
    }

    pub fn has_gaps(&self) -> bool {
        self.shape.as_ref().map(|shape| shape.has_gaps).unwrap_or(false)
    }
}

/// Overlap of one community direction with its provider counterpart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverlapResult {
    pub direction: usize,
    pub pattern: Option<usize>,
    pub pattern_id: Option<String>,
    pub score: Option<f64>,
    pub grade: Option<OverlapGrade>,
}

pub struct RouteOutcome {
    pub line_ref: String,
    pub mode: TransportMode,
    pub tolerance_m: f64,
    pub directions: Vec<DirectionOutcome>,
    pub correspondence: CorrespondenceMap,
    pub overlaps: Vec<OverlapResult>,
    pub notices: NoticeContainer,
}

impl RouteOutcome {
    /// Outcome of a route whose reconciliation did not complete.
    pub fn failed(route: &RouteInput, tolerance_m: f64, notices: NoticeContainer) -> Self {
        Self {
            line_ref: route.line_ref.clone(),
            mode: route.mode,
            tolerance_m,
            directions: Vec::new(),
            correspondence: CorrespondenceMap::default(),
            overlaps: Vec::new(),
            notices,
        }
    }
}

/// Tolerance for `route`: the settings override when valid, else the route's
/// own value or its mode default.
pub fn effective_tolerance(route: &RouteInput, settings: &ReconcileSettings) -> f64 {
    settings
        .tolerance_override_m
        .filter(|value| value.is_finite() && *value >= 0.0)
        .unwrap_or_else(|| route.tolerance_m())
}

/// Runs assembly, correspondence and overlap scoring for one route and turns
/// every data-quality finding into a notice.
pub fn reconcile_route(route: &RouteInput, settings: &ReconcileSettings) -> RouteOutcome {
    let mut notices = NoticeContainer::new();
    let tolerance_m = effective_tolerance(route, settings);
    debug!(
        "reconciling route {} ({}): {} community directions, {} provider patterns",
        route.line_ref,
        route.mode,
        route.community.len(),
        route.provider.len()
    );

    let directions: Vec<DirectionOutcome> = route
        .community
        .iter()
        .enumerate()
        .map(|(index, direction)| assemble_direction(index, direction, &mut notices))
        .collect();

    let community_shapes: Vec<Shape> = directions
        .iter()
        .map(|direction| direction.shape.clone().unwrap_or_else(Shape::empty))
        .collect();
    let provider_shapes: Vec<Shape> = route.provider.iter().map(ProviderPattern::shape).collect();

    if community_shapes.len() != provider_shapes.len() {
        notices.push(ReconcileNotice::pattern_count_differs(
            community_shapes.len(),
            provider_shapes.len(),
        ));
    }

    let correspondence = match_shapes(&community_shapes, &provider_shapes);
    if !correspondence.is_bijection() {
        notices.push(ReconcileNotice::not_bijective(&correspondence));
    }

    let overlaps = directions
        .iter()
        .map(|direction| {
            score_direction(
                direction,
                &community_shapes[direction.index],
                &route.provider,
                &correspondence,
                tolerance_m,
                settings,
                &mut notices,
            )
        })
        .collect();

    notices.assign_route(&route.line_ref);
    RouteOutcome {
        line_ref: route.line_ref.clone(),
        mode: route.mode,
        tolerance_m,
        directions,
        correspondence,
        overlaps,
        notices,
    }
}

fn assemble_direction(
    index: usize,
    direction: &CommunityDirection,
    notices: &mut NoticeContainer,
) -> DirectionOutcome {
    let stops = direction.stop_positions();
    let platforms = direction.platform_positions();

    if direction.segments.is_empty() {
        notices.push(ReconcileNotice::empty_community_route(index, &direction.id));
    }

    let anchor = anchor_from_members(&stops, &platforms);
    let shape = match assemble(&direction.segments, anchor) {
        Ok(shape) => {
            if shape.has_gaps {
                notices.push(ReconcileNotice::route_has_gaps(index, &direction.id));
            }
            Some(shape)
        }
        Err(err) => {
            notices.push(ReconcileNotice::invalid_geometry(index, &err));
            None
        }
    };

    DirectionOutcome {
        index,
        id: direction.id.clone(),
        shape,
        stops,
    }
}

fn score_direction(
    direction: &DirectionOutcome,
    shape: &Shape,
    provider: &[ProviderPattern],
    correspondence: &CorrespondenceMap,
    tolerance_m: f64,
    settings: &ReconcileSettings,
    notices: &mut NoticeContainer,
) -> OverlapResult {
    let Some(pattern_index) = correspondence.partner_of_a(direction.index) else {
        notices.push(ReconcileNotice::overlap_not_computed(direction.index));
        return OverlapResult {
            direction: direction.index,
            pattern: None,
            pattern_id: None,
            score: None,
            grade: None,
        };
    };
    let pattern = &provider[pattern_index];
    let mut result = OverlapResult {
        direction: direction.index,
        pattern: Some(pattern_index),
        pattern_id: Some(pattern.id.clone()),
        score: None,
        grade: None,
    };

    // Empty or invalid geometry is already reported.
    if shape.is_empty() {
        return result;
    }

    let score = overlap(shape, &pattern.shape(), tolerance_m);
    let grade = settings.grade(score);
    debug!(
        "direction {} overlaps pattern {} by {:.3} ({})",
        direction.index,
        pattern.id,
        score,
        grade.as_str()
    );
    if grade != OverlapGrade::Ok {
        notices.push(ReconcileNotice::overlap_below_threshold(
            direction.index,
            pattern_index,
            score,
            tolerance_m,
            grade.as_str(),
        ));
    }
    result.score = Some(score);
    result.grade = Some(grade);

    for distance in nearest_platforms(&direction.stops, &pattern.platforms) {
        if distance.distance_m > settings.stop_distance_tolerance_m {
            notices.push(ReconcileNotice::stop_too_far(
                direction.index,
                distance.stop_index,
                distance.platform_index,
                distance.distance_m,
            ));
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notice::*;
    use reconcile_model::Segment;

    fn direction(id: &str, segments: Vec<Segment>) -> CommunityDirection {
        CommunityDirection {
            id: id.to_string(),
            segments,
            stops: Vec::new(),
            platforms: Vec::new(),
        }
    }

    fn pattern(id: &str, points: &[(f64, f64)]) -> ProviderPattern {
        ProviderPattern {
            id: id.to_string(),
            points: Shape::from_lat_lon(points).points,
            platforms: Vec::new(),
        }
    }

    fn codes(outcome: &RouteOutcome) -> Vec<&str> {
        outcome.notices.iter().map(|n| n.code.as_str()).collect()
    }

    #[test]
    fn passes_matching_route() {
        let mut route = RouteInput::new("550", TransportMode::Bus);
        route.community.push(direction(
            "1",
            vec![
                Segment::from_lat_lon(&[(60.0, 24.0), (60.0, 24.001)]),
                Segment::from_lat_lon(&[(60.0, 24.002), (60.0, 24.001)]),
            ],
        ));
        route
            .provider
            .push(pattern("HSL:2550:0:01", &[(60.0, 24.0), (60.0, 24.002)]));

        let outcome = reconcile_route(&route, &ReconcileSettings::default());

        assert!(outcome.notices.is_empty(), "{:?}", codes(&outcome));
        assert_eq!(outcome.tolerance_m, 30.0);
        assert_eq!(outcome.directions[0].point_count(), 3);
        assert!(!outcome.directions[0].has_gaps());
        assert_eq!(outcome.overlaps[0].pattern, Some(0));
        assert_eq!(outcome.overlaps[0].score, Some(1.0));
        assert_eq!(outcome.overlaps[0].grade, Some(OverlapGrade::Ok));
    }

    #[test]
    fn detects_gaps_and_low_overlap() {
        let mut route = RouteInput::new("7", TransportMode::Tram);
        route.community.push(direction(
            "1",
            vec![
                Segment::from_lat_lon(&[(60.0, 24.0), (60.0, 24.001)]),
                Segment::from_lat_lon(&[(60.01, 24.01), (60.01, 24.011)]),
            ],
        ));
        route
            .provider
            .push(pattern("HSL:1007:0:01", &[(60.0, 24.0), (60.0, 24.001)]));

        let outcome = reconcile_route(&route, &ReconcileSettings::default());

        assert_eq!(
            codes(&outcome),
            vec![NOTICE_CODE_ROUTE_HAS_GAPS, NOTICE_CODE_OVERLAP_BELOW_THRESHOLD]
        );
        assert_eq!(outcome.overlaps[0].score, Some(0.5));
        assert_eq!(outcome.overlaps[0].grade, Some(OverlapGrade::Investigate));
        assert!(outcome
            .notices
            .iter()
            .all(|n| n.route.as_deref() == Some("7")));
    }

    #[test]
    fn reports_unpaired_direction() {
        let mut route = RouteInput::new("23", TransportMode::Bus);
        route.community.push(direction(
            "1",
            vec![Segment::from_lat_lon(&[(60.0, 24.0), (60.0, 24.01)])],
        ));
        route.community.push(direction(
            "2",
            vec![Segment::from_lat_lon(&[(60.0, 24.01), (60.0, 24.0)])],
        ));
        route
            .provider
            .push(pattern("HSL:1023:0:01", &[(60.0, 24.0), (60.0, 24.01)]));

        let outcome = reconcile_route(&route, &ReconcileSettings::default());

        assert_eq!(
            codes(&outcome),
            vec![
                NOTICE_CODE_PATTERN_COUNT_DIFFERS,
                NOTICE_CODE_NOT_BIJECTIVE,
                NOTICE_CODE_OVERLAP_NOT_COMPUTED
            ]
        );
        assert_eq!(outcome.overlaps[0].grade, Some(OverlapGrade::Ok));
        assert_eq!(outcome.overlaps[1].pattern, None);
        assert_eq!(outcome.overlaps[1].score, None);

        let notice = outcome
            .notices
            .iter()
            .find(|n| n.code == NOTICE_CODE_NOT_BIJECTIVE)
            .unwrap();
        assert_eq!(notice.context["unmatchedCommunity"], serde_json::json!([1]));
        assert_eq!(notice.context["unmatchedProvider"], serde_json::json!([]));
    }

    #[test]
    fn reports_invalid_and_empty_geometry() {
        let mut route = RouteInput::new("M1", TransportMode::Subway);
        route.community.push(direction("1", Vec::new()));
        route.community.push(direction(
            "2",
            vec![Segment::from_lat_lon(&[(60.0, 24.0)])],
        ));
        route
            .provider
            .push(pattern("HSL:31M1:0:01", &[(60.0, 24.0), (60.0, 24.01)]));
        route
            .provider
            .push(pattern("HSL:31M1:1:01", &[(60.0, 24.01), (60.0, 24.0)]));

        let outcome = reconcile_route(&route, &ReconcileSettings::default());

        assert_eq!(outcome.tolerance_m, 100.0);
        assert_eq!(
            codes(&outcome),
            vec![
                NOTICE_CODE_EMPTY_COMMUNITY_ROUTE,
                NOTICE_CODE_INVALID_GEOMETRY,
                NOTICE_CODE_NOT_BIJECTIVE
            ]
        );
        assert!(outcome.directions[1].shape.is_none());
        assert!(outcome.overlaps.iter().all(|o| o.score.is_none()));
    }

    #[test]
    fn detects_stop_far_from_platform() {
        let mut community = direction(
            "1",
            vec![Segment::from_lat_lon(&[(60.0, 24.0), (60.0, 24.01)])],
        );
        community.stops = vec![
            vec![Coordinate::new(60.0, 24.0)],
            vec![Coordinate::new(60.0, 24.01)],
        ];
        let mut provider = pattern("HSL:2550:0:01", &[(60.0, 24.0), (60.0, 24.01)]);
        provider.platforms = vec![Coordinate::new(60.0001, 24.0), Coordinate::new(60.002, 24.01)];

        let mut route = RouteInput::new("550", TransportMode::Bus);
        route.community.push(community);
        route.provider.push(provider);

        let outcome = reconcile_route(&route, &ReconcileSettings::default());

        assert_eq!(codes(&outcome), vec![NOTICE_CODE_STOP_TOO_FAR]);
        let notice = outcome.notices.iter().next().unwrap();
        assert_eq!(notice.context["stopIndex"], 1);
        assert_eq!(notice.context["platformIndex"], 1);
    }

    #[test]
    fn override_replaces_route_tolerance() {
        let mut route = RouteInput::new("550", TransportMode::Bus);
        route.tolerance_m = Some(12.0);
        assert_eq!(effective_tolerance(&route, &ReconcileSettings::default()), 12.0);

        let settings = ReconcileSettings {
            tolerance_override_m: Some(45.0),
            ..ReconcileSettings::default()
        };
        assert_eq!(effective_tolerance(&route, &settings), 45.0);

        let settings = ReconcileSettings {
            tolerance_override_m: Some(f64::NAN),
            ..ReconcileSettings::default()
        };
        assert_eq!(effective_tolerance(&route, &settings), 12.0);
    }
}
