//! Keyword search across loaded findings.
//!
//! Matching is a case-insensitive substring test over each finding's id,
//! description and category. Results are ordered by project, then kind,
//! then finding order, and artifacts are loaded lazily as the result
//! iterator advances.

use crate::artifact::ArtifactLoader;
use crate::error::{QueryError, Result};
use crate::models::{ArtifactKind, Finding, Match};
use crate::registry::{Project, ProjectRegistry};
use tracing::{debug, warn};

/// Longest accepted query.
const MAX_QUERY_LEN: usize = 256;

/// Characters of context kept on each side of a match in long fields.
const SNIPPET_CONTEXT: usize = 60;

/// Search engine over a registry's artifacts.
#[derive(Debug, Clone)]
pub struct SearchEngine {
    registry: ProjectRegistry,
    loader: ArtifactLoader,
}

impl SearchEngine {
    pub fn new(registry: ProjectRegistry, loader: ArtifactLoader) -> Self {
        Self { registry, loader }
    }

    /// Returns a lazy iterator over all matches for `query`.
    ///
    /// With `project` set only that project is searched; with `kind` set
    /// only that artifact kind. Artifacts that fail to load are skipped.
    pub fn matches(
        &self,
        query: &str,
        project: Option<&str>,
        kind: Option<ArtifactKind>,
    ) -> Result<impl Iterator<Item = Match>> {
        let needle = normalize_query(query)?;

        let projects = match project {
            Some(id) => vec![self.registry.find(id)?],
            None => self.registry.list_projects()?,
        };

        let kinds: Vec<ArtifactKind> = match kind {
            Some(k) => vec![k],
            None => ArtifactKind::ALL.to_vec(),
        };

        debug!("Searching {} projects for '{}'", projects.len(), needle);

        let loader = self.loader.clone();
        Ok(projects.into_iter().flat_map(move |project| {
            let present: Vec<ArtifactKind> = kinds
                .iter()
                .copied()
                .filter(|k| project.has_kind(*k))
                .collect();
            let loader = loader.clone();
            let needle = needle.clone();
            present
                .into_iter()
                .flat_map(move |k| artifact_matches(&loader, &project, k, &needle))
        }))
    }

    /// Collects up to `limit` matches. The flag is true when more existed.
    pub fn search(
        &self,
        query: &str,
        project: Option<&str>,
        kind: Option<ArtifactKind>,
        limit: usize,
    ) -> Result<(Vec<Match>, bool)> {
        let mut results: Vec<Match> = self
            .matches(query, project, kind)?
            .take(limit.saturating_add(1))
            .collect();
        let truncated = results.len() > limit;
        results.truncate(limit);
        Ok((results, truncated))
    }
}

/// Validates and lowercases a query.
pub fn normalize_query(query: &str) -> Result<String> {
    let trimmed = query.trim();
    if trimmed.is_empty() {
        return Err(QueryError::InvalidQuery("query must not be empty".to_string()));
    }
    if trimmed.chars().count() > MAX_QUERY_LEN {
        return Err(QueryError::InvalidQuery(format!(
            "query too long (max {} characters)",
            MAX_QUERY_LEN
        )));
    }
    Ok(lowercase(trimmed))
}

/// Lowercases char by char, so the text and the query fold the same way.
fn lowercase(text: &str) -> String {
    text.chars().flat_map(char::to_lowercase).collect()
}

fn artifact_matches(
    loader: &ArtifactLoader,
    project: &Project,
    kind: ArtifactKind,
    needle: &str,
) -> Vec<Match> {
    let artifact = match loader.load(project, kind) {
        Ok(a) => a,
        Err(QueryError::ArtifactMissing { .. }) => return Vec::new(),
        Err(e) => {
            warn!("Skipping {} of {} in search: {}", kind, project.id, e);
            return Vec::new();
        }
    };

    artifact
        .findings
        .iter()
        .filter_map(|f| match_finding(&project.id, f, needle))
        .collect()
}

/// First matching field of a finding, if any.
fn match_finding(project: &str, finding: &Finding, needle: &str) -> Option<Match> {
    finding.text_fields().into_iter().find_map(|(field, text)| {
        let (start, end) = find_ignore_case(text, needle)?;
        Some(Match {
            project: project.to_string(),
            kind: finding.kind,
            finding_id: finding.id.clone(),
            field: field.to_string(),
            snippet: snippet(text, start, end),
        })
    })
}

/// Char range in `text` of the first occurrence of the lowercased `needle`.
///
/// Lowercasing may change the number of chars, so every lowered char keeps
/// the index of the original char it came from.
fn find_ignore_case(text: &str, needle: &str) -> Option<(usize, usize)> {
    let mut lowered = String::with_capacity(text.len());
    let mut origin = Vec::with_capacity(text.len());
    for (i, c) in text.chars().enumerate() {
        for lc in c.to_lowercase() {
            lowered.push(lc);
            origin.push(i);
        }
    }

    let byte_pos = lowered.find(needle)?;
    let first = lowered[..byte_pos].chars().count();
    let last = first + needle.chars().count().max(1) - 1;

    let start = *origin.get(first)?;
    let end = origin.get(last).copied().unwrap_or(start) + 1;
    Some((start, end))
}

/// Cuts a window of context around the match `start..end` (in chars).
fn snippet(text: &str, start: usize, end: usize) -> String {
    let chars: Vec<char> = text.chars().collect();
    let end = end.min(chars.len());
    let start = start.min(end);
    if chars.len() <= SNIPPET_CONTEXT * 2 + (end - start) {
        return text.to_string();
    }

    let from = start.saturating_sub(SNIPPET_CONTEXT);
    let to = (end + SNIPPET_CONTEXT).min(chars.len());

    let mut out = String::new();
    if from > 0 {
        out.push_str("...");
    }
    out.extend(&chars[from..to]);
    if to < chars.len() {
        out.push_str("...");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::test_support::*;
    use tempfile::TempDir;

    fn engine(temp_dir: &TempDir) -> SearchEngine {
        SearchEngine::new(
            ProjectRegistry::new(temp_dir.path().to_path_buf()),
            ArtifactLoader::new(1024 * 1024),
        )
    }

    fn setup() -> TempDir {
        let temp_dir = TempDir::new().unwrap();
        write_artifact(temp_dir.path(), "acme/widgets", "package-vulns.json", VULNS_ONE_CRITICAL_ONE_LOW);
        write_artifact(temp_dir.path(), "acme/widgets", "package-malcontent.json", MALCONTENT_CRITICAL_AND_MEDIUM);
        write_artifact(
            temp_dir.path(),
            "beta/api",
            "code-security.json",
            r#"{"findings": [{"rule_id": "js.lodash.merge", "severity": "high", "message": "Unsafe LODASH merge"}]}"#,
        );
        temp_dir
    }

    #[test]
    fn test_search_all_projects_in_order() {
        let temp_dir = setup();
        let (results, truncated) = engine(&temp_dir).search("lodash", None, None, 100).unwrap();

        assert!(!truncated);
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].project, "acme/widgets");
        assert_eq!(results[0].kind, ArtifactKind::Vulnerabilities);
        assert_eq!(results[0].field, "description");
        assert_eq!(results[1].project, "beta/api");
        assert_eq!(results[1].finding_id, "js.lodash.merge");
        assert_eq!(results[1].field, "id");
    }

    #[test]
    fn test_search_filters() {
        let temp_dir = setup();
        let engine = engine(&temp_dir);

        let (results, _) = engine.search("LODASH", Some("beta/api"), None, 100).unwrap();
        assert_eq!(results.len(), 1);

        let (results, _) = engine
            .search("node_modules", None, Some(ArtifactKind::Malcontent), 100)
            .unwrap();
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|m| m.kind == ArtifactKind::Malcontent));
    }

    #[test]
    fn test_search_limit() {
        let temp_dir = setup();
        let (results, truncated) = engine(&temp_dir).search("node_modules", None, None, 1).unwrap();
        assert_eq!(results.len(), 1);
        assert!(truncated);
    }

    #[test]
    fn test_empty_and_unmatched_queries() {
        let temp_dir = setup();
        let engine = engine(&temp_dir);

        assert!(matches!(
            engine.search("   ", None, None, 10),
            Err(QueryError::InvalidQuery(_))
        ));

        let (results, _) = engine.search("nonexistent-token-xyz", None, None, 10).unwrap();
        assert!(results.is_empty());
    }

    #[test]
    fn test_search_skips_malformed_artifacts() {
        let temp_dir = setup();
        write_artifact(temp_dir.path(), "acme/widgets", "licenses.json", "{broken");

        let (results, _) = engine(&temp_dir).search("lodash", None, None, 10).unwrap();
        assert_eq!(results.len(), 2);
    }

    #[test]
    fn test_search_with_unbounded_limit() {
        let temp_dir = setup();
        let (results, truncated) = engine(&temp_dir)
            .search("lodash", None, None, usize::MAX)
            .unwrap();
        assert_eq!(results.len(), 2);
        assert!(!truncated);
    }

    #[test]
    fn test_snippet_window() {
        let text = format!("{}NEEDLE{}", "a".repeat(100), "b".repeat(100));
        let (start, end) = find_ignore_case(&text, "needle").unwrap();
        assert_eq!((start, end), (100, 106));

        let cut = snippet(&text, start, end);
        assert!(cut.starts_with("..."));
        assert!(cut.ends_with("..."));
        assert!(cut.contains("NEEDLE"));
        assert_eq!(cut.chars().count(), 3 + 60 + 6 + 60 + 3);

        assert_eq!(snippet("short text", 0, 5), "short text");
    }

    #[test]
    fn test_snippet_centered_when_lowercase_grows() {
        // 'İ' lowercases to two chars.
        let text = format!("{}needle{}", "İ".repeat(100), "x".repeat(100));
        let (start, end) = find_ignore_case(&text, "needle").unwrap();
        assert_eq!((start, end), (100, 106));

        let cut = snippet(&text, start, end);
        let expected = format!("...{}needle{}...", "İ".repeat(60), "x".repeat(60));
        assert_eq!(cut, expected);
    }
}
