//! Per-kind score normalization.
//!
//! Every artifact kind maps its findings to a raw 0-100 value. The value
//! always goes through [`Score::new`], which clamps it and derives grade and
//! level; no kind derives those on its own.

use crate::artifact::Artifact;
use crate::models::{ArtifactKind, ComponentScore, Finding, Score, Severity};
use serde_json::Value;

/// Deduction per finding for severity-scored kinds.
pub const CRITICAL_PENALTY: i64 = 40;
pub const HIGH_PENALTY: i64 = 20;
pub const MEDIUM_PENALTY: i64 = 8;
pub const LOW_PENALTY: i64 = 2;

/// Malcontent deduction, taken once for the highest observed risk.
pub const MALCONTENT_CRITICAL_PENALTY: i64 = 70;
pub const MALCONTENT_HIGH_PENALTY: i64 = 45;
pub const MALCONTENT_MEDIUM_PENALTY: i64 = 20;
pub const MALCONTENT_LOW_PENALTY: i64 = 5;

/// License deductions per denied and per needs-review finding.
pub const LICENSE_DENIED_PENALTY: i64 = 25;
pub const LICENSE_REVIEW_PENALTY: i64 = 5;

/// Weight of each kind in a project's combined score.
pub fn kind_weight(kind: ArtifactKind) -> f64 {
    match kind {
        ArtifactKind::Vulnerabilities => 0.35,
        ArtifactKind::CodeSecurity => 0.25,
        ArtifactKind::Malcontent => 0.20,
        ArtifactKind::PackageHealth => 0.10,
        ArtifactKind::Licenses => 0.10,
        ArtifactKind::Technologies => 0.0,
    }
}

/// Normalizes an artifact to a score. Pure in the artifact content.
pub fn normalize(artifact: &Artifact) -> Score {
    let findings = &artifact.findings;

    match artifact.kind {
        ArtifactKind::Vulnerabilities | ArtifactKind::CodeSecurity => severity_score(findings),
        ArtifactKind::Malcontent => malcontent_score(findings),
        ArtifactKind::Technologies => Score::new(100),
        ArtifactKind::PackageHealth => match reported_health_score(&artifact.raw) {
            Some(value) => Score::new(value),
            None => severity_score(findings),
        },
        ArtifactKind::Licenses => license_score(findings),
    }
}

fn severity_penalty(severity: Severity) -> i64 {
    match severity {
        Severity::Critical => CRITICAL_PENALTY,
        Severity::High => HIGH_PENALTY,
        Severity::Medium => MEDIUM_PENALTY,
        Severity::Low => LOW_PENALTY,
        Severity::Info => 0,
    }
}

/// Starts at 100 and deducts per finding by severity.
fn severity_score(findings: &[Finding]) -> Score {
    let penalty: i64 = findings.iter().map(|f| severity_penalty(f.severity)).sum();
    Score::new(100 - penalty)
}

fn malcontent_score(findings: &[Finding]) -> Score {
    let penalty = match findings.iter().map(|f| f.severity).max() {
        Some(Severity::Critical) => MALCONTENT_CRITICAL_PENALTY,
        Some(Severity::High) => MALCONTENT_HIGH_PENALTY,
        Some(Severity::Medium) => MALCONTENT_MEDIUM_PENALTY,
        Some(Severity::Low) => MALCONTENT_LOW_PENALTY,
        Some(Severity::Info) | None => 0,
    };
    Score::new(100 - penalty)
}

fn license_score(findings: &[Finding]) -> Score {
    let penalty: i64 = findings
        .iter()
        .map(|f| match f.severity {
            Severity::Critical | Severity::High => LICENSE_DENIED_PENALTY,
            Severity::Medium => LICENSE_REVIEW_PENALTY,
            _ => 0,
        })
        .sum();
    Score::new(100 - penalty)
}

/// Health scanners may publish their own aggregate in `summary.score`.
fn reported_health_score(raw: &Value) -> Option<i64> {
    let summary = raw.get("summary")?;
    ["score", "health_score"]
        .iter()
        .find_map(|k| summary.get(*k).and_then(|v| v.as_f64()))
        .map(|v| v.round() as i64)
}

/// Combines component scores by weight.
///
/// When every weight is zero the plain mean is used instead.
pub fn weighted_combine(components: &[ComponentScore]) -> Score {
    if components.is_empty() {
        return Score::new(0);
    }

    let total_weight: f64 = components.iter().map(|c| c.weight).sum();
    let value = if total_weight > 0.0 {
        let weighted: f64 = components.iter().map(|c| c.value as f64 * c.weight).sum();
        weighted / total_weight
    } else {
        components.iter().map(|c| c.value as f64).sum::<f64>() / components.len() as f64
    };

    Score::new(value.round() as i64).with_components(components.to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Grade, ScoreLevel};
    use serde_json::{json, Map};

    fn finding(kind: ArtifactKind, severity: Severity) -> Finding {
        Finding {
            id: "f".to_string(),
            kind,
            severity,
            category: kind.name().to_string(),
            description: String::new(),
            group: None,
            metadata: Map::new(),
        }
    }

    fn artifact(kind: ArtifactKind, severities: &[Severity]) -> Artifact {
        Artifact {
            kind,
            project: "acme/widgets".to_string(),
            raw: json!({}),
            findings: severities.iter().map(|s| finding(kind, *s)).collect(),
            modified: None,
        }
    }

    #[test]
    fn test_empty_artifact_is_perfect() {
        for kind in ArtifactKind::ALL {
            let score = normalize(&artifact(kind, &[]));
            assert_eq!(score.value, 100, "{}", kind);
            assert_eq!(score.grade, Grade::A);
            assert_eq!(score.level, ScoreLevel::Excellent);
        }
    }

    #[test]
    fn test_vulnerability_penalties() {
        let score = normalize(&artifact(
            ArtifactKind::Vulnerabilities,
            &[Severity::Critical, Severity::Low],
        ));
        assert_eq!(score.value, 58);
        assert_eq!(score.level, ScoreLevel::Critical);

        let floored = normalize(&artifact(
            ArtifactKind::Vulnerabilities,
            &[Severity::Critical, Severity::Critical, Severity::Critical],
        ));
        assert_eq!(floored.value, 0);
    }

    #[test]
    fn test_malcontent_uses_highest_risk() {
        let one = normalize(&artifact(ArtifactKind::Malcontent, &[Severity::High]));
        let many = normalize(&artifact(
            ArtifactKind::Malcontent,
            &[Severity::High, Severity::Medium, Severity::High],
        ));
        assert_eq!(one.value, 55);
        assert_eq!(one, many);
    }

    #[test]
    fn test_licenses_and_technologies() {
        let licenses = normalize(&artifact(
            ArtifactKind::Licenses,
            &[Severity::High, Severity::Medium, Severity::Low],
        ));
        assert_eq!(licenses.value, 70);

        let tech = normalize(&artifact(ArtifactKind::Technologies, &[Severity::Critical]));
        assert_eq!(tech.value, 100);
    }

    #[test]
    fn test_reported_health_score() {
        let mut health = artifact(ArtifactKind::PackageHealth, &[Severity::Critical]);
        health.raw = json!({"summary": {"score": 72.4}});
        assert_eq!(normalize(&health).value, 72);

        health.raw = json!({"summary": {"critical_count": 1}});
        assert_eq!(normalize(&health).value, 60);
    }

    #[test]
    fn test_weighted_combine() {
        let components = vec![
            ComponentScore::new("vulnerabilities", 50, 0.35),
            ComponentScore::new("licenses", 100, 0.10),
        ];
        let score = weighted_combine(&components);
        // (50 * 0.35 + 100 * 0.10) / 0.45 = 61.1
        assert_eq!(score.value, 61);
        assert_eq!(score.components.len(), 2);

        let zero_weight = weighted_combine(&[ComponentScore::new("technologies", 100, 0.0)]);
        assert_eq!(zero_weight.value, 100);
    }

    #[test]
    fn test_normalize_is_deterministic() {
        let a = artifact(ArtifactKind::CodeSecurity, &[Severity::Medium, Severity::High]);
        assert_eq!(normalize(&a), normalize(&a));
    }
}
