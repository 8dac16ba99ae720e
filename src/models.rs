//! Data models for the artifact query layer.
//!
//! This module contains the core value types shared by the loader, the
//! scoring code, the search engine and the tool layer: severities, risk
//! levels, scores, findings and search matches.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;

/// Severity level of a single finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Informational - no action required
    Info,
    /// Low severity - minor hygiene issues
    Low,
    /// Medium severity - should be scheduled for a fix
    Medium,
    /// High severity - exploitable or policy-violating
    High,
    /// Critical severity - fix immediately
    Critical,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Info => write!(f, "info"),
            Severity::Low => write!(f, "low"),
            Severity::Medium => write!(f, "medium"),
            Severity::High => write!(f, "high"),
            Severity::Critical => write!(f, "critical"),
        }
    }
}

impl Severity {
    /// Parses a scanner severity string. Unrecognized values map to `Info`.
    pub fn parse_lenient(s: &str) -> Self {
        Self::parse_strict(s).unwrap_or(Severity::Info)
    }

    /// Parses a severity string, returning `None` for unrecognized values.
    pub fn parse_strict(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "critical" | "crit" => Some(Severity::Critical),
            "high" => Some(Severity::High),
            "medium" | "moderate" | "med" => Some(Severity::Medium),
            "low" => Some(Severity::Low),
            "info" | "informational" | "note" | "none" => Some(Severity::Info),
            _ => None,
        }
    }
}

/// Ordinal risk bucket used to compare and rank projects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    None,
    Low,
    Medium,
    High,
    Critical,
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RiskLevel::None => write!(f, "none"),
            RiskLevel::Low => write!(f, "low"),
            RiskLevel::Medium => write!(f, "medium"),
            RiskLevel::High => write!(f, "high"),
            RiskLevel::Critical => write!(f, "critical"),
        }
    }
}

impl RiskLevel {
    /// Rank used for sorting: critical=5 down to none=1.
    pub fn rank(&self) -> u8 {
        match self {
            RiskLevel::Critical => 5,
            RiskLevel::High => 4,
            RiskLevel::Medium => 3,
            RiskLevel::Low => 2,
            RiskLevel::None => 1,
        }
    }

    /// Rank of an optional level; an unknown level ranks 0.
    pub fn rank_of(level: Option<RiskLevel>) -> u8 {
        level.map(|l| l.rank()).unwrap_or(0)
    }

    /// True for critical or high risk.
    pub fn is_high_risk(&self) -> bool {
        matches!(self, RiskLevel::Critical | RiskLevel::High)
    }

    /// Parses a risk level name, case-insensitively.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "critical" => Some(RiskLevel::Critical),
            "high" => Some(RiskLevel::High),
            "medium" => Some(RiskLevel::Medium),
            "low" => Some(RiskLevel::Low),
            "none" => Some(RiskLevel::None),
            _ => None,
        }
    }

    /// Maps a score level onto the risk scale.
    pub fn from_level(level: ScoreLevel) -> Self {
        match level {
            ScoreLevel::Critical => RiskLevel::Critical,
            ScoreLevel::Poor => RiskLevel::High,
            ScoreLevel::Fair => RiskLevel::Medium,
            ScoreLevel::Good => RiskLevel::Low,
            ScoreLevel::Excellent => RiskLevel::None,
        }
    }

    /// The finding severity at the same position on the scale.
    pub fn as_severity(&self) -> Severity {
        match self {
            RiskLevel::Critical => Severity::Critical,
            RiskLevel::High => Severity::High,
            RiskLevel::Medium => Severity::Medium,
            RiskLevel::Low => Severity::Low,
            RiskLevel::None => Severity::Info,
        }
    }
}

/// Letter grade derived from a score value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Grade {
    A,
    B,
    C,
    D,
    F,
}

/// Qualitative level derived from a score value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScoreLevel {
    Excellent,
    Good,
    Fair,
    Poor,
    Critical,
}

/// A normalized 0-100 score. Grade and level are always derived from `value`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Score {
    pub value: u8,
    pub grade: Grade,
    pub level: ScoreLevel,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub components: Vec<ComponentScore>,
}

impl Score {
    /// Creates a score, clamping `value` into [0, 100] first.
    pub fn new(value: i64) -> Self {
        let value = value.clamp(0, 100) as u8;
        Self {
            value,
            grade: grade_for(value),
            level: level_for(value),
            components: Vec::new(),
        }
    }

    /// Attaches the weighted components this score was combined from.
    pub fn with_components(mut self, components: Vec<ComponentScore>) -> Self {
        self.components = components;
        self
    }
}

fn grade_for(value: u8) -> Grade {
    match value {
        90.. => Grade::A,
        80..=89 => Grade::B,
        70..=79 => Grade::C,
        60..=69 => Grade::D,
        _ => Grade::F,
    }
}

fn level_for(value: u8) -> ScoreLevel {
    match value {
        90.. => ScoreLevel::Excellent,
        80..=89 => ScoreLevel::Good,
        70..=79 => ScoreLevel::Fair,
        60..=69 => ScoreLevel::Poor,
        _ => ScoreLevel::Critical,
    }
}

/// One weighted input of a combined score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentScore {
    pub name: String,
    pub value: u8,
    pub weight: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<u8>,
}

impl ComponentScore {
    pub fn new(name: impl Into<String>, value: u8, weight: f64) -> Self {
        Self {
            name: name.into(),
            value,
            weight,
            max: None,
        }
    }

    pub fn with_max(mut self, max: u8) -> Self {
        self.max = Some(max);
        self
    }
}

/// A project's aggregated view across all of its artifacts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreResult {
    pub score: Score,
    pub risk_level: RiskLevel,
    /// Total number of findings across all analyzed kinds.
    pub findings: usize,
    /// Finding count per artifact kind.
    pub categories: BTreeMap<String, usize>,
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

/// The recognized analysis artifact kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    Vulnerabilities,
    Malcontent,
    Technologies,
    PackageHealth,
    Licenses,
    CodeSecurity,
}

impl ArtifactKind {
    /// All kinds, in the order they are reported and searched.
    pub const ALL: [ArtifactKind; 6] = [
        ArtifactKind::Vulnerabilities,
        ArtifactKind::Malcontent,
        ArtifactKind::Technologies,
        ArtifactKind::PackageHealth,
        ArtifactKind::Licenses,
        ArtifactKind::CodeSecurity,
    ];

    /// Name used in tool arguments and category counts.
    pub fn name(&self) -> &'static str {
        match self {
            ArtifactKind::Vulnerabilities => "vulnerabilities",
            ArtifactKind::Malcontent => "malcontent",
            ArtifactKind::Technologies => "technologies",
            ArtifactKind::PackageHealth => "package_health",
            ArtifactKind::Licenses => "licenses",
            ArtifactKind::CodeSecurity => "code_security",
        }
    }

    /// File stem of the artifact under a project's `analysis/` directory.
    pub fn file_stem(&self) -> &'static str {
        match self {
            ArtifactKind::Vulnerabilities => "package-vulns",
            ArtifactKind::Malcontent => "package-malcontent",
            ArtifactKind::Technologies => "technology",
            ArtifactKind::PackageHealth => "package-health",
            ArtifactKind::Licenses => "licenses",
            ArtifactKind::CodeSecurity => "code-security",
        }
    }

    pub fn file_name(&self) -> String {
        format!("{}.json", self.file_stem())
    }

    /// Parses either the kind name or the file stem.
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|k| k.name() == s || k.file_stem() == s)
    }

    /// Recognizes an artifact file name such as `package-vulns.json`.
    pub fn from_file_name(file_name: &str) -> Option<Self> {
        let stem = file_name.strip_suffix(".json")?;
        Self::ALL.into_iter().find(|k| k.file_stem() == stem)
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// One discrete issue inside an artifact.
///
/// Findings are read-only projections of the artifact JSON. Fields that the
/// common shape does not cover are kept in `metadata`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    pub id: String,
    pub kind: ArtifactKind,
    pub severity: Severity,
    pub category: String,
    pub description: String,
    /// Group key the finding was listed under in a grouped artifact.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub metadata: Map<String, Value>,
}

impl Finding {
    /// The textual fields searched by the search engine, in match order.
    pub fn text_fields(&self) -> [(&'static str, &str); 3] {
        [
            ("id", self.id.as_str()),
            ("description", self.description.as_str()),
            ("category", self.category.as_str()),
        ]
    }
}

/// Counts of findings by severity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeveritySummary {
    pub total: usize,
    pub critical: usize,
    pub high: usize,
    pub medium: usize,
    pub low: usize,
    pub info: usize,
}

impl SeveritySummary {
    /// Creates a summary from a list of findings.
    pub fn from_findings<'a>(findings: impl IntoIterator<Item = &'a Finding>) -> Self {
        let mut summary = Self::default();

        for finding in findings {
            summary.total += 1;
            match finding.severity {
                Severity::Critical => summary.critical += 1,
                Severity::High => summary.high += 1,
                Severity::Medium => summary.medium += 1,
                Severity::Low => summary.low += 1,
                Severity::Info => summary.info += 1,
            }
        }

        summary
    }

    /// Adds another summary's counts into this one.
    pub fn merge(&mut self, other: &SeveritySummary) {
        self.total += other.total;
        self.critical += other.critical;
        self.high += other.high;
        self.medium += other.medium;
        self.low += other.low;
        self.info += other.info;
    }
}

/// A search hit with its provenance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Match {
    pub project: String,
    pub kind: ArtifactKind,
    pub finding_id: String,
    /// Which finding field matched (`id`, `description` or `category`).
    pub field: String,
    pub snippet: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn finding(severity: Severity) -> Finding {
        Finding {
            id: "CVE-2024-0001".to_string(),
            kind: ArtifactKind::Vulnerabilities,
            severity,
            category: "vulnerabilities".to_string(),
            description: "Prototype pollution".to_string(),
            group: None,
            metadata: Map::new(),
        }
    }

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Info < Severity::Low);
        assert!(Severity::Low < Severity::Medium);
        assert!(Severity::Medium < Severity::High);
        assert!(Severity::High < Severity::Critical);
    }

    #[test]
    fn test_severity_parse_lenient() {
        assert_eq!(Severity::parse_lenient("CRIT"), Severity::Critical);
        assert_eq!(Severity::parse_lenient(" moderate "), Severity::Medium);
        assert_eq!(Severity::parse_lenient("note"), Severity::Info);
        assert_eq!(Severity::parse_lenient("whatever"), Severity::Info);
        assert_eq!(Severity::parse_strict("whatever"), None);
    }

    #[test]
    fn test_score_boundaries() {
        let cases = [
            (100, Grade::A, ScoreLevel::Excellent),
            (90, Grade::A, ScoreLevel::Excellent),
            (89, Grade::B, ScoreLevel::Good),
            (80, Grade::B, ScoreLevel::Good),
            (79, Grade::C, ScoreLevel::Fair),
            (70, Grade::C, ScoreLevel::Fair),
            (69, Grade::D, ScoreLevel::Poor),
            (60, Grade::D, ScoreLevel::Poor),
            (59, Grade::F, ScoreLevel::Critical),
            (0, Grade::F, ScoreLevel::Critical),
        ];

        for (value, grade, level) in cases {
            let score = Score::new(value);
            assert_eq!(score.grade, grade, "grade for {}", value);
            assert_eq!(score.level, level, "level for {}", value);
        }
    }

    #[test]
    fn test_score_clamps_before_deriving() {
        let low = Score::new(-15);
        assert_eq!(low.value, 0);
        assert_eq!(low.grade, Grade::F);

        let high = Score::new(250);
        assert_eq!(high.value, 100);
        assert_eq!(high.level, ScoreLevel::Excellent);
    }

    #[test]
    fn test_risk_rank() {
        assert_eq!(RiskLevel::Critical.rank(), 5);
        assert_eq!(RiskLevel::None.rank(), 1);
        assert_eq!(RiskLevel::rank_of(None), 0);
        assert!(RiskLevel::High.is_high_risk());
        assert!(!RiskLevel::Medium.is_high_risk());

        let mut levels = vec![RiskLevel::Low, RiskLevel::Critical, RiskLevel::Medium];
        levels.sort_by_key(|l| std::cmp::Reverse(l.rank()));
        assert_eq!(levels, vec![RiskLevel::Critical, RiskLevel::Medium, RiskLevel::Low]);
    }

    #[test]
    fn test_risk_from_level() {
        assert_eq!(RiskLevel::from_level(ScoreLevel::Critical), RiskLevel::Critical);
        assert_eq!(RiskLevel::from_level(ScoreLevel::Poor), RiskLevel::High);
        assert_eq!(RiskLevel::from_level(ScoreLevel::Fair), RiskLevel::Medium);
        assert_eq!(RiskLevel::from_level(ScoreLevel::Good), RiskLevel::Low);
        assert_eq!(RiskLevel::from_level(ScoreLevel::Excellent), RiskLevel::None);
    }

    #[test]
    fn test_artifact_kind_parse() {
        assert_eq!(ArtifactKind::parse("code_security"), Some(ArtifactKind::CodeSecurity));
        assert_eq!(ArtifactKind::parse("code-security"), Some(ArtifactKind::CodeSecurity));
        assert_eq!(ArtifactKind::parse("Package-Vulns"), Some(ArtifactKind::Vulnerabilities));
        assert_eq!(ArtifactKind::parse("sbom"), None);
        assert_eq!(
            ArtifactKind::from_file_name("package-malcontent.json"),
            Some(ArtifactKind::Malcontent)
        );
        assert_eq!(ArtifactKind::from_file_name("notes.json"), None);
    }

    #[test]
    fn test_severity_summary() {
        let findings = vec![
            finding(Severity::Critical),
            finding(Severity::Low),
            finding(Severity::Low),
        ];

        let summary = SeveritySummary::from_findings(&findings);
        assert_eq!(summary.total, 3);
        assert_eq!(summary.critical, 1);
        assert_eq!(summary.low, 2);

        let mut merged = SeveritySummary::default();
        merged.merge(&summary);
        merged.merge(&summary);
        assert_eq!(merged.total, 6);
    }
}
