use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use reconcile_model::CorrespondenceMap;

use crate::AssembleError;

pub const NOTICE_CODE_INVALID_GEOMETRY: &str = "invalid_route_geometry";
pub const NOTICE_CODE_ROUTE_HAS_GAPS: &str = "route_has_gaps";
pub const NOTICE_CODE_EMPTY_COMMUNITY_ROUTE: &str = "empty_community_route";
pub const NOTICE_CODE_PATTERN_COUNT_DIFFERS: &str = "pattern_count_differs";
pub const NOTICE_CODE_NOT_BIJECTIVE: &str = "correspondence_not_bijective";
pub const NOTICE_CODE_OVERLAP_BELOW_THRESHOLD: &str = "shape_overlap_below_threshold";
pub const NOTICE_CODE_OVERLAP_NOT_COMPUTED: &str = "overlap_not_computed";
pub const NOTICE_CODE_STOP_TOO_FAR: &str = "stop_too_far_from_platform";
pub const NOTICE_CODE_RUNTIME_EXCEPTION: &str = "runtime_exception_in_reconciler_error";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeSeverity {
    Error,
    Warning,
    Info,
}

impl NoticeSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            NoticeSeverity::Error => "error",
            NoticeSeverity::Warning => "warning",
            NoticeSeverity::Info => "info",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconcileNotice {
    pub code: String,
    pub severity: NoticeSeverity,
    pub message: String,
    /// Line reference of the route the notice is about.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub route: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub context: BTreeMap<String, Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub field_order: Vec<String>,
}

impl ReconcileNotice {
    pub fn new(
        code: impl Into<String>,
        severity: NoticeSeverity,
        message: impl Into<String>,
    ) -> Self {
        Self {
            code: code.into(),
            severity,
            message: message.into(),
            route: None,
            context: BTreeMap::new(),
            field_order: Vec::new(),
        }
    }

    pub fn invalid_geometry(direction: usize, error: &AssembleError) -> Self {
        let mut notice = ReconcileNotice::new(
            NOTICE_CODE_INVALID_GEOMETRY,
            NoticeSeverity::Error,
            format!("community direction cannot be assembled: {}", error),
        );
        notice.insert_context_field("direction", direction);
        match error {
            AssembleError::DegenerateSegment { index, len } => {
                notice.insert_context_field("segmentIndex", index);
                notice.insert_context_field("pointCount", len);
            }
            AssembleError::NonFiniteCoordinate { index } => {
                notice.insert_context_field("segmentIndex", index);
            }
        }
        return notice;
    }

    pub fn route_has_gaps(direction: usize, direction_id: &str) -> Self {
        ReconcileNotice::new(
            NOTICE_CODE_ROUTE_HAS_GAPS,
            NoticeSeverity::Warning,
            "community route has gaps",
        )
        .with_context_field("direction", direction)
        .with_context_field("directionId", direction_id)
    }

    pub fn empty_community_route(direction: usize, direction_id: &str) -> Self {
        ReconcileNotice::new(
            NOTICE_CODE_EMPTY_COMMUNITY_ROUTE,
            NoticeSeverity::Warning,
            "community route has no ways",
        )
        .with_context_field("direction", direction)
        .with_context_field("directionId", direction_id)
    }

    pub fn pattern_count_differs(community: usize, provider: usize) -> Self {
        ReconcileNotice::new(
            NOTICE_CODE_PATTERN_COUNT_DIFFERS,
            NoticeSeverity::Warning,
            format!(
                "{} community directions but {} provider patterns, matching may be unreliable",
                community, provider
            ),
        )
        .with_context_field("communityCount", community)
        .with_context_field("providerCount", provider)
    }

    pub fn not_bijective(map: &CorrespondenceMap) -> Self {
        ReconcileNotice::new(
            NOTICE_CODE_NOT_BIJECTIVE,
            NoticeSeverity::Info,
            "shape correspondence is not a bijection",
        )
        .with_context_field("communityToProvider", &map.a_to_b)
        .with_context_field("providerToCommunity", &map.b_to_a)
        .with_context_field("unmatchedCommunity", map.unmatched_a())
        .with_context_field("unmatchedProvider", map.unmatched_b())
    }

    pub fn overlap_below_threshold(
        direction: usize,
        pattern: usize,
        score: f64,
        tolerance_m: f64,
        grade: &str,
    ) -> Self {
        let mut notice = ReconcileNotice::new(
            NOTICE_CODE_OVERLAP_BELOW_THRESHOLD,
            NoticeSeverity::Warning,
            format!(
                "community route overlaps provider pattern {:.1} % (tolerance {} m)",
                score * 100.0,
                tolerance_m
            ),
        );
        notice.insert_context_field("direction", direction);
        notice.insert_context_field("pattern", pattern);
        notice.insert_context_field("score", score);
        notice.insert_context_field("toleranceMeters", tolerance_m);
        notice.insert_context_field("grade", grade);
        notice
    }

    pub fn overlap_not_computed(direction: usize) -> Self {
        ReconcileNotice::new(
            NOTICE_CODE_OVERLAP_NOT_COMPUTED,
            NoticeSeverity::Info,
            "community direction has no provider counterpart",
        )
        .with_context_field("direction", direction)
    }

    pub fn stop_too_far(
        direction: usize,
        stop_index: usize,
        platform_index: usize,
        distance_m: f64,
    ) -> Self {
        let mut notice = ReconcileNotice::new(
            NOTICE_CODE_STOP_TOO_FAR,
            NoticeSeverity::Warning,
            format!("stop is {:.0} m from the nearest provider platform", distance_m),
        );
        notice.insert_context_field("direction", direction);
        notice.insert_context_field("stopIndex", stop_index);
        notice.insert_context_field("platformIndex", platform_index);
        notice.insert_context_field("distanceMeters", distance_m);
        notice
    }

    pub fn runtime_exception(route: &str, message: String) -> Self {
        let mut notice = ReconcileNotice::new(
            NOTICE_CODE_RUNTIME_EXCEPTION,
            NoticeSeverity::Error,
            "runtime exception while reconciling route",
        );
        notice.route = Some(route.to_string());
        notice.insert_context_field("exception", "panic");
        notice.insert_context_field("message", message);
        notice
    }

    pub fn insert_context_field<V: Serialize>(&mut self, name: impl Into<String>, value: V) {
        let key = name.into();
        let serialized = serde_json::to_value(value).unwrap_or_else(|_| Value::Null);
        if !self.field_order.iter().any(|item| item == &key) {
            self.field_order.push(key.clone());
        }
        self.context.insert(key, serialized);
    }

    pub fn with_context_field<V: Serialize>(mut self, name: impl Into<String>, value: V) -> Self {
        self.insert_context_field(name, value);
        self
    }

    pub fn with_route(mut self, route: impl Into<String>) -> Self {
        self.route = Some(route.into());
        self
    }
}

#[derive(Debug, Default, Clone)]
pub struct NoticeContainer {
    notices: Vec<ReconcileNotice>,
}

impl NoticeContainer {
    pub fn new() -> Self {
        Self {
            notices: Vec::new(),
        }
    }

    pub fn push(&mut self, notice: ReconcileNotice) {
        self.notices.push(notice);
    }

    pub fn iter(&self) -> impl Iterator<Item = &ReconcileNotice> {
        self.notices.iter()
    }

    pub fn len(&self) -> usize {
        self.notices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notices.is_empty()
    }

    /// Tags every notice that has no route yet.
    pub fn assign_route(&mut self, route: &str) {
        for notice in self.notices.iter_mut().filter(|n| n.route.is_none()) {
            notice.route = Some(route.to_string());
        }
    }

    pub fn count_by_code(&self, code: &str) -> usize {
        self.notices.iter().filter(|n| n.code == code).count()
    }
}
