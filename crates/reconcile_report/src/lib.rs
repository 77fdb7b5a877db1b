use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::Context;
use chrono::{Local, SecondsFormat};
use serde::{Deserialize, Serialize};

use reconcile_core::{NoticeSeverity, OverlapResult, ReconcileNotice, RouteOutcome};
use reconcile_model::{CorrespondenceMap, TransportMode};

pub mod gpx_export;

pub use gpx_export::{community_track_file_name, write_gpx, write_route_tracks, ReportError};

/// Run metadata that does not come from the outcomes themselves.
#[derive(Debug, Clone, Default)]
pub struct ReportSummaryContext {
    input: Option<String>,
    generated_at: Option<String>,
    tool_version: Option<String>,
    threads: Option<usize>,
    elapsed_seconds: Option<f64>,
}

impl ReportSummaryContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_input(mut self, input: impl AsRef<Path>) -> Self {
        self.input = Some(input.as_ref().display().to_string());
        self
    }

    pub fn with_generated_at(mut self, generated_at: impl Into<String>) -> Self {
        self.generated_at = Some(generated_at.into());
        self
    }

    pub fn with_tool_version(mut self, version: impl Into<String>) -> Self {
        self.tool_version = Some(version.into());
        self
    }

    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = Some(threads);
        self
    }

    pub fn with_elapsed_seconds(mut self, seconds: f64) -> Self {
        self.elapsed_seconds = Some(seconds);
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NoticeCounts {
    pub total: usize,
    pub errors: usize,
    pub warnings: usize,
    pub infos: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportSummary {
    pub generated_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threads: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub elapsed_seconds: Option<f64>,
    pub route_count: usize,
    pub counts: NoticeCounts,
    pub notices_by_code: BTreeMap<String, usize>,
}

impl ReportSummary {
    pub fn from_context(context: ReportSummaryContext, outcomes: &[RouteOutcome]) -> Self {
        let mut counts = NoticeCounts::default();
        let mut notices_by_code = BTreeMap::new();
        for notice in outcomes.iter().flat_map(|outcome| outcome.notices.iter()) {
            counts.total += 1;
            match notice.severity {
                NoticeSeverity::Error => counts.errors += 1,
                NoticeSeverity::Warning => counts.warnings += 1,
                NoticeSeverity::Info => counts.infos += 1,
            }
            *notices_by_code.entry(notice.code.clone()).or_insert(0) += 1;
        }

        let generated_at = context
            .generated_at
            .unwrap_or_else(|| Local::now().to_rfc3339_opts(SecondsFormat::Secs, true));

        Self {
            generated_at,
            tool_version: context.tool_version,
            input: context.input,
            threads: context.threads,
            elapsed_seconds: context.elapsed_seconds,
            route_count: outcomes.len(),
            counts,
            notices_by_code,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DirectionReport {
    pub index: usize,
    pub id: String,
    pub assembled: bool,
    pub point_count: usize,
    pub has_gaps: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteReport {
    pub line_ref: String,
    pub mode: TransportMode,
    pub tolerance_m: f64,
    pub directions: Vec<DirectionReport>,
    pub correspondence: CorrespondenceMap,
    pub overlaps: Vec<OverlapResult>,
}

impl RouteReport {
    pub fn from_outcome(outcome: &RouteOutcome) -> Self {
        Self {
            line_ref: outcome.line_ref.clone(),
            mode: outcome.mode,
            tolerance_m: outcome.tolerance_m,
            directions: outcome
                .directions
                .iter()
                .map(|direction| DirectionReport {
                    index: direction.index,
                    id: direction.id.clone(),
                    assembled: direction.shape.is_some(),
                    point_count: direction.point_count(),
                    has_gaps: direction.has_gaps(),
                })
                .collect(),
            correspondence: outcome.correspondence.clone(),
            overlaps: outcome.overlaps.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconciliationReport {
    pub summary: ReportSummary,
    pub routes: Vec<RouteReport>,
    pub notices: Vec<ReconcileNotice>,
}

impl ReconciliationReport {
    pub fn from_outcomes(outcomes: &[RouteOutcome], context: ReportSummaryContext) -> Self {
        Self {
            summary: ReportSummary::from_context(context, outcomes),
            routes: outcomes.iter().map(RouteReport::from_outcome).collect(),
            notices: outcomes
                .iter()
                .flat_map(|outcome| outcome.notices.iter().cloned())
                .collect(),
        }
    }

    pub fn to_json_string(&self, pretty: bool) -> anyhow::Result<String> {
        let json = if pretty {
            serde_json::to_string_pretty(self)
        } else {
            serde_json::to_string(self)
        };
        json.context("serialize reconciliation report")
    }

    pub fn write_json<P: AsRef<Path>>(&self, path: P) -> anyhow::Result<()> {
        self.write_json_with_format(path, false)
    }

    pub fn write_json_with_format<P: AsRef<Path>>(
        &self,
        path: P,
        pretty: bool,
    ) -> anyhow::Result<()> {
        let json = self.to_json_string(pretty)?;
        fs::write(&path, json)
            .with_context(|| format!("write json report to {}", path.as_ref().display()))?;
        Ok(())
    }
}
