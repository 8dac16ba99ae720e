//! Error types for artifact queries.
//!
//! Every failure a tool invocation can report is a [`QueryError`]. At the
//! protocol boundary errors are flattened into an [`ErrorBody`] so callers
//! always receive a kind, a message and, where it applies, the offending
//! field or project.

use crate::models::ArtifactKind;
use serde::Serialize;
use thiserror::Error;

/// Errors raised by the registry, loader, aggregator, search and tool layers.
#[derive(Error, Debug)]
pub enum QueryError {
    /// Root directory or project absent.
    #[error("not found: {what}")]
    NotFound {
        what: String,
        project: Option<String>,
    },

    /// Expected artifact file absent. Recoverable.
    #[error("no {kind} analysis for '{project}'")]
    ArtifactMissing { project: String, kind: ArtifactKind },

    /// Artifact present but not usable.
    #[error("malformed {kind} analysis for '{project}': {reason}")]
    ArtifactMalformed {
        project: String,
        kind: ArtifactKind,
        reason: String,
    },

    /// Artifact exceeds the configured size limit.
    #[error("{kind} analysis for '{project}' is too large ({size} bytes, limit {limit})")]
    ArtifactTooLarge {
        project: String,
        kind: ArtifactKind,
        size: u64,
        limit: u64,
    },

    /// Project has no usable analysis data at all.
    #[error("no analyses available for '{project}'")]
    NoArtifacts { project: String },

    #[error("invalid query: {0}")]
    InvalidQuery(String),

    #[error("invalid argument '{field}': {reason}")]
    InvalidArgument { field: String, reason: String },

    #[error("unknown tool: {0}")]
    UnknownTool(String),

    #[error("{tool} timed out after {seconds}s")]
    Timeout { tool: String, seconds: u64 },

    #[error("I/O error on {path}: {message}")]
    Io { path: String, message: String },

    #[error("internal error: {0}")]
    Internal(String),
}

/// Convenience type alias for Result using QueryError
pub type Result<T> = std::result::Result<T, QueryError>;

impl QueryError {
    pub fn invalid_argument(field: &str, reason: impl Into<String>) -> Self {
        QueryError::InvalidArgument {
            field: field.to_string(),
            reason: reason.into(),
        }
    }

    pub fn project_not_found(project: &str) -> Self {
        QueryError::NotFound {
            what: format!("project '{}' (hydrate it first)", project),
            project: Some(project.to_string()),
        }
    }

    /// Stable machine-readable name of the error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            QueryError::NotFound { .. } => "not_found",
            QueryError::ArtifactMissing { .. } => "artifact_missing",
            QueryError::ArtifactMalformed { .. } => "artifact_malformed",
            QueryError::ArtifactTooLarge { .. } => "artifact_too_large",
            QueryError::NoArtifacts { .. } => "no_artifacts",
            QueryError::InvalidQuery(_) => "invalid_query",
            QueryError::InvalidArgument { .. } => "invalid_argument",
            QueryError::UnknownTool(_) => "unknown_tool",
            QueryError::Timeout { .. } => "timeout",
            QueryError::Io { .. } => "io",
            QueryError::Internal(_) => "internal",
        }
    }

    /// Converts into the structured form returned to callers.
    pub fn to_body(&self) -> ErrorBody {
        let (field, project) = match self {
            QueryError::InvalidArgument { field, .. } => (Some(field.clone()), None),
            QueryError::InvalidQuery(_) => (Some("query".to_string()), None),
            QueryError::NotFound { project, .. } => (None, project.clone()),
            QueryError::ArtifactMissing { project, .. }
            | QueryError::ArtifactMalformed { project, .. }
            | QueryError::ArtifactTooLarge { project, .. }
            | QueryError::NoArtifacts { project } => (None, Some(project.clone())),
            _ => (None, None),
        };

        ErrorBody {
            kind: self.kind(),
            message: self.to_string(),
            field,
            project,
        }
    }
}

impl From<tokio::task::JoinError> for QueryError {
    fn from(err: tokio::task::JoinError) -> Self {
        QueryError::Internal(format!("worker failed: {}", err))
    }
}

/// Structured error returned across the protocol boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorBody {
    pub kind: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,
}
