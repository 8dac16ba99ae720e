//! Projection of raw scanner JSON into [`Finding`]s.
//!
//! Each scanner names its fields differently. Instead of a struct per
//! scanner, every kind declares which keys carry the id, severity, category
//! and description, and whatever is left over stays in the finding's
//! metadata bag.

use crate::models::{ArtifactKind, Finding, Severity};
use serde_json::{Map, Value};

/// Candidate keys for each common field, tried in order.
struct FieldMap {
    id: &'static [&'static str],
    severity: &'static [&'static str],
    category: &'static [&'static str],
    description: &'static [&'static str],
}

fn field_map(kind: ArtifactKind) -> FieldMap {
    match kind {
        ArtifactKind::Vulnerabilities => FieldMap {
            id: &["id", "cve", "name"],
            severity: &["severity"],
            category: &["category", "type"],
            description: &["title", "summary", "description", "details"],
        },
        ArtifactKind::Malcontent => FieldMap {
            id: &["id", "path", "file"],
            severity: &["risk_level", "severity", "risk"],
            category: &["category", "type"],
            description: &["description", "summary", "behaviors", "behavior"],
        },
        ArtifactKind::Technologies => FieldMap {
            id: &["id", "name"],
            severity: &["severity"],
            category: &["category", "type"],
            description: &["description", "summary"],
        },
        ArtifactKind::PackageHealth => FieldMap {
            id: &["id", "package", "name"],
            severity: &["severity"],
            category: &["issue", "category", "type"],
            description: &["description", "title", "message"],
        },
        ArtifactKind::Licenses => FieldMap {
            id: &["id", "package", "name"],
            severity: &["severity"],
            category: &["status", "category"],
            description: &["description", "license", "title"],
        },
        ArtifactKind::CodeSecurity => FieldMap {
            id: &["id", "rule_id", "check_id", "type"],
            severity: &["severity"],
            category: &["category", "type"],
            description: &["message", "title", "description"],
        },
    }
}

/// Extracts findings from an artifact document.
///
/// `findings` may be an array or an object of arrays keyed by group; an
/// absent `findings` key means no findings. Groups keep their order in the
/// document. The error string describes the first shape violation.
pub fn extract_findings(kind: ArtifactKind, raw: &Value) -> Result<Vec<Finding>, String> {
    let root = raw
        .as_object()
        .ok_or_else(|| "expected a JSON object at the top level".to_string())?;

    let mut findings = Vec::new();

    match root.get("findings") {
        None | Some(Value::Null) => {}
        Some(Value::Array(items)) => push_findings(kind, None, items, &mut findings)?,
        Some(Value::Object(groups)) => {
            for (group, items) in groups {
                let items = items
                    .as_array()
                    .ok_or_else(|| format!("findings.{} is not an array", group))?;
                push_findings(kind, Some(group), items, &mut findings)?;
            }
        }
        Some(_) => return Err("'findings' must be an array or an object of arrays".to_string()),
    }

    Ok(findings)
}

fn push_findings(
    kind: ArtifactKind,
    group: Option<&str>,
    items: &[Value],
    findings: &mut Vec<Finding>,
) -> Result<(), String> {
    for (i, item) in items.iter().enumerate() {
        let obj = item.as_object().ok_or_else(|| match group {
            Some(g) => format!("findings.{}[{}] is not an object", g, i),
            None => format!("findings[{}] is not an object", i),
        })?;
        let index = findings.len();
        findings.push(project_finding(kind, group, index, obj));
    }
    Ok(())
}

fn project_finding(
    kind: ArtifactKind,
    group: Option<&str>,
    index: usize,
    obj: &Map<String, Value>,
) -> Finding {
    let fields = field_map(kind);
    let mut metadata = obj.clone();

    let id = take_text(&mut metadata, fields.id)
        .unwrap_or_else(|| format!("{}-{}", kind.file_stem(), index + 1));

    let severity = match take_text(&mut metadata, fields.severity) {
        Some(s) => Severity::parse_lenient(&s),
        None => default_severity(kind, obj),
    };

    let category = take_text(&mut metadata, fields.category)
        .or_else(|| group.map(str::to_string))
        .unwrap_or_else(|| kind.name().to_string());

    let description = take_text(&mut metadata, fields.description).unwrap_or_else(|| id.clone());

    Finding {
        id,
        kind,
        severity,
        category,
        description,
        group: group.map(str::to_string),
        metadata,
    }
}

/// Severity for findings that do not state one.
fn default_severity(kind: ArtifactKind, obj: &Map<String, Value>) -> Severity {
    match kind {
        ArtifactKind::Licenses => {
            let status = obj.get("status").and_then(|v| v.as_str()).unwrap_or("");
            match status.to_lowercase().as_str() {
                "denied" | "forbidden" | "prohibited" => Severity::High,
                "needs_review" | "needs-review" | "review" | "unknown" => Severity::Medium,
                _ => Severity::Low,
            }
        }
        _ => Severity::Info,
    }
}

/// Removes and returns the first non-empty textual value among `keys`.
fn take_text(map: &mut Map<String, Value>, keys: &[&str]) -> Option<String> {
    for key in keys {
        if let Some(text) = map.get(*key).and_then(value_text) {
            map.remove(*key);
            return Some(text);
        }
    }
    None
}

fn value_text(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(items) => items
            .iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s.clone()),
                Value::Object(o) => ["description", "id", "name"]
                    .iter()
                    .find_map(|k| o.get(*k).and_then(|v| v.as_str()).map(str::to_string)),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join(", "),
        _ => return None,
    };

    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}
