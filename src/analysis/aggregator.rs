//! Finding aggregation and project summaries.
//!
//! This module combines the normalized scores of every available artifact
//! kind into one [`ScoreResult`], and provides the small filtering and
//! ordering helpers the tool layer uses on finding lists.

use crate::analysis::scoring::{kind_weight, normalize, weighted_combine};
use crate::artifact::ArtifactLoader;
use crate::error::{QueryError, Result};
use crate::models::{
    ArtifactKind, ComponentScore, Finding, RiskLevel, ScoreResult, Severity, SeveritySummary,
};
use crate::registry::Project;
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Summarizes every available artifact kind of a project.
///
/// Missing kinds are skipped silently. Kinds that fail for any other reason
/// are excluded and reported under `metadata.skipped`. Fails with
/// `NoArtifacts` only when no kind could be used.
pub fn summarize(project: &Project, loader: &ArtifactLoader) -> Result<ScoreResult> {
    let mut components: Vec<ComponentScore> = Vec::new();
    let mut categories: BTreeMap<String, usize> = BTreeMap::new();
    let mut severity = SeveritySummary::default();
    let mut skipped = Map::new();
    let mut artifacts = Map::new();
    let mut kinds = Vec::new();
    let mut total = 0;

    for kind in ArtifactKind::ALL {
        let artifact = match loader.load(project, kind) {
            Ok(a) => a,
            Err(QueryError::ArtifactMissing { .. }) => {
                debug!("{} has no {} artifact", project.id, kind);
                continue;
            }
            Err(e) => {
                warn!("Excluding {} from summary of {}: {}", kind, project.id, e);
                skipped.insert(kind.name().to_string(), Value::String(e.to_string()));
                continue;
            }
        };

        let score = normalize(&artifact);
        components.push(ComponentScore::new(kind.name(), score.value, kind_weight(kind)).with_max(100));
        categories.insert(kind.name().to_string(), artifact.findings.len());
        severity.merge(&SeveritySummary::from_findings(&artifact.findings));
        total += artifact.findings.len();
        kinds.push(kind.name());

        if let Some(modified) = artifact.modified {
            artifacts.insert(kind.name().to_string(), Value::String(modified.to_rfc3339()));
        }
    }

    if components.is_empty() {
        return Err(QueryError::NoArtifacts {
            project: project.id.clone(),
        });
    }

    let score = weighted_combine(&components);
    let risk_level = RiskLevel::from_level(score.level);

    let mut metadata = Map::new();
    metadata.insert("project".to_string(), json!(project.id));
    metadata.insert("kinds".to_string(), json!(kinds));
    metadata.insert("severity".to_string(), json!(severity));
    metadata.insert("artifacts".to_string(), Value::Object(artifacts));
    if !skipped.is_empty() {
        metadata.insert("skipped".to_string(), Value::Object(skipped));
    }

    Ok(ScoreResult {
        score,
        risk_level,
        findings: total,
        categories,
        metadata,
    })
}

/// Keep findings at or above `min` severity.
pub fn filter_min_severity(findings: Vec<Finding>, min: Severity) -> Vec<Finding> {
    findings.into_iter().filter(|f| f.severity >= min).collect()
}

/// Sort findings by severity (critical first), keeping artifact order for ties.
pub fn sort_findings_by_severity(findings: &mut [Finding]) {
    findings.sort_by(|a, b| b.severity.cmp(&a.severity));
}

/// Order projects by risk rank (highest first), then by id.
///
/// Projects without a known risk level rank last.
pub fn rank_by_risk<T>(entries: &mut [(T, Option<RiskLevel>)], id_of: impl Fn(&T) -> &str) {
    entries.sort_by(|(a, ra), (b, rb)| {
        RiskLevel::rank_of(*rb)
            .cmp(&RiskLevel::rank_of(*ra))
            .then_with(|| id_of(a).cmp(id_of(b)))
    });
}
