//! Project registry for discovering hydrated projects.
//!
//! The artifact root is laid out as `owner/name/analysis/<kind>.json`. A
//! project is hydrated when its `analysis/` directory holds at least one
//! recognized artifact file. Listings only include hydrated projects, while
//! a direct lookup resolves any existing `owner/name` directory. The
//! registry keeps no state between calls; every lookup is a fresh
//! read-only scan.

use crate::error::{QueryError, Result};
use crate::models::ArtifactKind;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

/// Maximum length of an `owner/name` project id.
const MAX_PROJECT_ID_LEN: usize = 200;

static PROJECT_ID: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9][-A-Za-z0-9_.]*/[A-Za-z0-9][-A-Za-z0-9_.]*$")
        .expect("project id pattern is valid")
});

/// A hydrated project and the artifact kinds present for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Project {
    pub id: String,
    pub owner: String,
    pub name: String,
    pub available_kinds: Vec<ArtifactKind>,
    #[serde(skip)]
    pub analysis_dir: PathBuf,
}

impl Project {
    /// Path of the artifact file for `kind`.
    pub fn artifact_path(&self, kind: ArtifactKind) -> PathBuf {
        self.analysis_dir.join(kind.file_name())
    }

    pub fn has_kind(&self, kind: ArtifactKind) -> bool {
        self.available_kinds.contains(&kind)
    }
}

/// Checks that a project id is `owner/name` and cannot escape the root.
pub fn validate_project_id(id: &str) -> Result<()> {
    if id.is_empty() {
        return Err(QueryError::invalid_argument("project", "project id is required"));
    }
    if id.len() > MAX_PROJECT_ID_LEN {
        return Err(QueryError::invalid_argument(
            "project",
            format!("project id too long (max {} characters)", MAX_PROJECT_ID_LEN),
        ));
    }
    if id.contains("..") {
        return Err(QueryError::invalid_argument(
            "project",
            "path traversal not allowed",
        ));
    }
    if !PROJECT_ID.is_match(id) {
        return Err(QueryError::invalid_argument(
            "project",
            "must be in 'owner/name' format",
        ));
    }
    Ok(())
}

/// Enumerates projects under an artifact root.
#[derive(Debug, Clone)]
pub struct ProjectRegistry {
    root: PathBuf,
}

impl ProjectRegistry {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Lists hydrated projects ordered by owner, then name.
    ///
    /// Fails with `NotFound` only when the root itself is missing; an empty
    /// root yields an empty list.
    pub fn list_projects(&self) -> Result<Vec<Project>> {
        self.ensure_root()?;

        let mut projects = Vec::new();
        let walker = WalkDir::new(&self.root)
            .min_depth(2)
            .max_depth(2)
            .sort_by_file_name();

        for entry in walker {
            let entry = match entry {
                Ok(e) => e,
                Err(e) => {
                    debug!("Skipping unreadable entry under {}: {}", self.root.display(), e);
                    continue;
                }
            };

            if !entry.file_type().is_dir() {
                continue;
            }

            let name = entry.file_name().to_string_lossy().to_string();
            let owner = match entry.path().parent().and_then(|p| p.file_name()) {
                Some(o) => o.to_string_lossy().to_string(),
                None => continue,
            };

            let id = format!("{}/{}", owner, name);
            if validate_project_id(&id).is_err() {
                debug!("Skipping {}: not a valid project id", id);
                continue;
            }

            let analysis_dir = entry.path().join("analysis");
            let available_kinds = scan_analysis_dir(&analysis_dir);
            if available_kinds.is_empty() {
                debug!("{}/{} has no recognized artifacts", owner, name);
                continue;
            }

            projects.push(Project {
                id,
                owner,
                name,
                available_kinds,
                analysis_dir,
            });
        }

        debug!("Found {} hydrated projects", projects.len());
        Ok(projects)
    }

    /// Resolves a single project id without scanning the whole root.
    ///
    /// Fails with `NotFound` only when `owner/name` does not exist. A
    /// project without artifacts resolves with no available kinds, so
    /// callers can report it as such.
    pub fn find(&self, id: &str) -> Result<Project> {
        validate_project_id(id)?;
        self.ensure_root()?;

        let (owner, name) = id
            .split_once('/')
            .ok_or_else(|| QueryError::invalid_argument("project", "must be in 'owner/name' format"))?;

        let project_dir = self.root.join(owner).join(name);
        if !project_dir.is_dir() {
            return Err(QueryError::project_not_found(id));
        }

        let analysis_dir = project_dir.join("analysis");
        let available_kinds = scan_analysis_dir(&analysis_dir);

        Ok(Project {
            id: id.to_string(),
            owner: owner.to_string(),
            name: name.to_string(),
            available_kinds,
            analysis_dir,
        })
    }

    fn ensure_root(&self) -> Result<()> {
        if self.root.is_dir() {
            Ok(())
        } else {
            Err(QueryError::NotFound {
                what: format!("artifact root {}", self.root.display()),
                project: None,
            })
        }
    }
}

/// Recognized artifact kinds present in an analysis directory.
fn scan_analysis_dir(dir: &Path) -> Vec<ArtifactKind> {
    let Ok(entries) = fs::read_dir(dir) else {
        return Vec::new();
    };

    let mut kinds: Vec<ArtifactKind> = entries
        .flatten()
        .filter(|e| e.path().is_file())
        .filter_map(|e| ArtifactKind::from_file_name(&e.file_name().to_string_lossy()))
        .collect();

    kinds.sort();
    kinds.dedup();
    kinds
}

#[cfg(test)]
pub(crate) mod test_support {
    //! Fixture helpers shared by module tests.

    use std::fs;
    use std::path::Path;

    /// Writes `owner/name/analysis/<file_name>` under `root`.
    pub fn write_artifact(root: &Path, project: &str, file_name: &str, content: &str) {
        let dir = root.join(project).join("analysis");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join(file_name), content).unwrap();
    }

    pub const VULNS_ONE_CRITICAL_ONE_LOW: &str = r#"{
        "summary": {"critical": 1, "low": 1},
        "findings": [
            {"id": "GHSA-xxxx", "aliases": ["CVE-2023-0001"], "package": "lodash", "version": "4.17.0",
             "severity": "critical", "title": "Prototype Pollution in lodash", "fixed_in": "4.17.21"},
            {"id": "CVE-2023-0002", "package": "axios", "version": "0.21.0",
             "severity": "low", "title": "Verbose error messages"}
        ]
    }"#;

    pub const MALCONTENT_CRITICAL_AND_MEDIUM: &str = r#"{
        "findings": [
            {"path": "node_modules/evil/install.js", "risk_level": "CRITICAL", "risk_score": 4,
             "behaviors": ["exec", "download"]},
            {"path": "node_modules/chatty/index.js", "risk_level": "MEDIUM", "risk_score": 2,
             "behaviors": ["network_call"]}
        ]
    }"#;
}

#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_list_projects_skips_unhydrated() {
        let temp_dir = TempDir::new().unwrap();
        write_artifact(temp_dir.path(), "acme/widgets", "package-vulns.json", "{}");
        fs::create_dir_all(temp_dir.path().join("acme/empty/analysis")).unwrap();
        write_artifact(temp_dir.path(), "acme/notes", "readme.json", "{}");

        let registry = ProjectRegistry::new(temp_dir.path().to_path_buf());
        let projects = registry.list_projects().unwrap();

        assert_eq!(projects.len(), 1);
        assert_eq!(projects[0].id, "acme/widgets");
        assert_eq!(projects[0].available_kinds, vec![ArtifactKind::Vulnerabilities]);
    }

    #[test]
    fn test_list_projects_is_sorted() {
        let temp_dir = TempDir::new().unwrap();
        write_artifact(temp_dir.path(), "zeta/app", "licenses.json", "{}");
        write_artifact(temp_dir.path(), "acme/widgets", "licenses.json", "{}");
        write_artifact(temp_dir.path(), "acme/api", "code-security.json", "{}");
        write_artifact(temp_dir.path(), "acme/api", "package-vulns.json", "{}");

        let registry = ProjectRegistry::new(temp_dir.path().to_path_buf());
        let ids: Vec<_> = registry
            .list_projects()
            .unwrap()
            .into_iter()
            .map(|p| p.id)
            .collect();

        assert_eq!(ids, vec!["acme/api", "acme/widgets", "zeta/app"]);

        let api = registry.find("acme/api").unwrap();
        assert_eq!(
            api.available_kinds,
            vec![ArtifactKind::Vulnerabilities, ArtifactKind::CodeSecurity]
        );
    }

    #[test]
    fn test_empty_root_and_missing_root() {
        let temp_dir = TempDir::new().unwrap();
        let registry = ProjectRegistry::new(temp_dir.path().to_path_buf());
        assert!(registry.list_projects().unwrap().is_empty());

        let missing = ProjectRegistry::new(temp_dir.path().join("nope"));
        assert!(matches!(
            missing.list_projects(),
            Err(QueryError::NotFound { .. })
        ));
    }

    #[test]
    fn test_list_projects_skips_invalid_ids() {
        let temp_dir = TempDir::new().unwrap();
        write_artifact(temp_dir.path(), "acme/widgets", "licenses.json", "{}");
        write_artifact(temp_dir.path(), "acme/my repo", "licenses.json", "{}");
        write_artifact(temp_dir.path(), "acme/_private", "licenses.json", "{}");
        write_artifact(temp_dir.path(), ".cache/tool", "licenses.json", "{}");

        let registry = ProjectRegistry::new(temp_dir.path().to_path_buf());
        let projects = registry.list_projects().unwrap();

        assert_eq!(projects.len(), 1);
        assert_eq!(projects[0].id, "acme/widgets");
        for project in &projects {
            assert!(registry.find(&project.id).is_ok());
        }
    }

    #[test]
    fn test_find_project_without_artifacts() {
        let temp_dir = TempDir::new().unwrap();
        fs::create_dir_all(temp_dir.path().join("acme/empty/analysis")).unwrap();
        fs::create_dir_all(temp_dir.path().join("acme/bare")).unwrap();

        let registry = ProjectRegistry::new(temp_dir.path().to_path_buf());
        let empty = registry.find("acme/empty").unwrap();
        assert!(empty.available_kinds.is_empty());
        assert!(registry.find("acme/bare").unwrap().available_kinds.is_empty());
    }

    #[test]
    fn test_find_unknown_project() {
        let temp_dir = TempDir::new().unwrap();
        let registry = ProjectRegistry::new(temp_dir.path().to_path_buf());
        assert!(matches!(
            registry.find("acme/ghost"),
            Err(QueryError::NotFound { project: Some(_), .. })
        ));
    }

    #[test]
    fn test_validate_project_id() {
        assert!(validate_project_id("acme/widgets").is_ok());
        assert!(validate_project_id("my-org/repo_1.2").is_ok());
        assert!(validate_project_id("").is_err());
        assert!(validate_project_id("acme").is_err());
        assert!(validate_project_id("acme/../etc").is_err());
        assert!(validate_project_id("/etc/passwd").is_err());
        assert!(validate_project_id("a/b/c").is_err());
        assert!(validate_project_id(&format!("a/{}", "x".repeat(250))).is_err());
    }
}
