//! Artifact loading.
//!
//! Reads one analysis JSON file for one project, enforcing the configured
//! size limit, and projects it into findings. Artifacts are re-read on every
//! call; nothing is cached.

pub mod extract;

use crate::error::{QueryError, Result};
use crate::models::{ArtifactKind, Finding};
use crate::registry::Project;
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::fs;
use std::io::ErrorKind;
use tracing::debug;

pub use extract::extract_findings;

/// One parsed analysis document.
#[derive(Debug, Clone)]
pub struct Artifact {
    pub kind: ArtifactKind,
    pub project: String,
    pub raw: Value,
    pub findings: Vec<Finding>,
    /// Modification time of the file when it was read.
    pub modified: Option<DateTime<Utc>>,
}

/// Loader for artifact files.
#[derive(Debug, Clone)]
pub struct ArtifactLoader {
    max_file_size: u64,
}

impl ArtifactLoader {
    pub fn new(max_file_size: u64) -> Self {
        Self { max_file_size }
    }

    /// Loads and projects the artifact of `kind` for `project`.
    pub fn load(&self, project: &Project, kind: ArtifactKind) -> Result<Artifact> {
        let (raw, modified) = self.read_json(project, kind)?;

        let findings = extract_findings(kind, &raw).map_err(|reason| QueryError::ArtifactMalformed {
            project: project.id.clone(),
            kind,
            reason,
        })?;

        debug!("Loaded {} {} findings for {}", findings.len(), kind, project.id);

        Ok(Artifact {
            kind,
            project: project.id.clone(),
            raw,
            findings,
            modified,
        })
    }

    /// Loads the artifact content without projecting findings.
    pub fn load_raw(&self, project: &Project, kind: ArtifactKind) -> Result<Value> {
        let (raw, _) = self.read_json(project, kind)?;
        if !raw.is_object() {
            return Err(QueryError::ArtifactMalformed {
                project: project.id.clone(),
                kind,
                reason: "expected a JSON object at the top level".to_string(),
            });
        }
        Ok(raw)
    }

    fn read_json(&self, project: &Project, kind: ArtifactKind) -> Result<(Value, Option<DateTime<Utc>>)> {
        let path = project.artifact_path(kind);

        let metadata = match fs::metadata(&path) {
            Ok(m) => m,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(QueryError::ArtifactMissing {
                    project: project.id.clone(),
                    kind,
                })
            }
            Err(e) => {
                return Err(QueryError::Io {
                    path: path.display().to_string(),
                    message: e.to_string(),
                })
            }
        };

        if !metadata.is_file() {
            return Err(QueryError::ArtifactMissing {
                project: project.id.clone(),
                kind,
            });
        }

        if metadata.len() > self.max_file_size {
            return Err(QueryError::ArtifactTooLarge {
                project: project.id.clone(),
                kind,
                size: metadata.len(),
                limit: self.max_file_size,
            });
        }

        let content = fs::read_to_string(&path).map_err(|e| QueryError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;

        let raw: Value = serde_json::from_str(&content).map_err(|e| QueryError::ArtifactMalformed {
            project: project.id.clone(),
            kind,
            reason: e.to_string(),
        })?;

        let modified = metadata.modified().ok().map(DateTime::<Utc>::from);

        Ok((raw, modified))
    }
}
