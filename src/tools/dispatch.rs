//! Tool routing and argument validation.
//!
//! A call goes through three steps: the tool name is resolved to a
//! [`ToolName`], the arguments are decoded into a typed [`ToolRequest`]
//! (no filesystem access happens before this succeeds), and the request is
//! executed against the registry, loader, aggregator or search engine.

use crate::analysis::scoring::normalize;
use crate::analysis::{filter_min_severity, rank_by_risk, sort_findings_by_severity, summarize};
use crate::artifact::ArtifactLoader;
use crate::config::LimitsConfig;
use crate::error::{QueryError, Result};
use crate::models::{ArtifactKind, Finding, RiskLevel, Severity};
use crate::registry::{validate_project_id, Project, ProjectRegistry};
use crate::search::{normalize_query, SearchEngine};
use serde::Serialize;
use serde_json::{json, Map, Value};
use std::path::PathBuf;
use tracing::{debug, info};

/// The exposed tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolName {
    ListProjects,
    GetProjectSummary,
    GetVulnerabilities,
    GetMalcontent,
    GetTechnologies,
    GetPackageHealth,
    GetLicenses,
    GetCodeSecurity,
    SearchFindings,
    GetAnalysisRaw,
}

impl ToolName {
    pub const ALL: [ToolName; 10] = [
        ToolName::ListProjects,
        ToolName::GetProjectSummary,
        ToolName::GetVulnerabilities,
        ToolName::GetMalcontent,
        ToolName::GetTechnologies,
        ToolName::GetPackageHealth,
        ToolName::GetLicenses,
        ToolName::GetCodeSecurity,
        ToolName::SearchFindings,
        ToolName::GetAnalysisRaw,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ToolName::ListProjects => "list_projects",
            ToolName::GetProjectSummary => "get_project_summary",
            ToolName::GetVulnerabilities => "get_vulnerabilities",
            ToolName::GetMalcontent => "get_malcontent",
            ToolName::GetTechnologies => "get_technologies",
            ToolName::GetPackageHealth => "get_package_health",
            ToolName::GetLicenses => "get_licenses",
            ToolName::GetCodeSecurity => "get_code_security",
            ToolName::SearchFindings => "search_findings",
            ToolName::GetAnalysisRaw => "get_analysis_raw",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == name)
    }
}

/// Ordering of `list_projects` results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProjectSort {
    #[default]
    Name,
    Risk,
}

/// Slices of a grouped code-security artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodeSecurityCategory {
    Secrets,
    Crypto,
}

impl CodeSecurityCategory {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "secrets" => Some(Self::Secrets),
            "crypto" => Some(Self::Crypto),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Secrets => "secrets",
            Self::Crypto => "crypto",
        }
    }

    /// Group keys that make up the category.
    pub fn groups(&self) -> &'static [&'static str] {
        match self {
            Self::Secrets => &["secrets"],
            Self::Crypto => &["ciphers", "keys", "tls", "random", "certificates"],
        }
    }

    /// Ungrouped findings are matched on their category instead.
    pub fn contains(&self, finding: &Finding) -> bool {
        let group = finding.group.as_deref().unwrap_or(&finding.category);
        self.groups().iter().any(|g| g.eq_ignore_ascii_case(group))
    }
}

/// A validated tool invocation.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolRequest {
    ListProjects {
        owner: Option<String>,
        sort: ProjectSort,
    },
    ProjectSummary {
        project: String,
    },
    Findings {
        project: String,
        kind: ArtifactKind,
        min_severity: Option<Severity>,
        category: Option<CodeSecurityCategory>,
        limit: Option<usize>,
    },
    PackageHealth {
        project: String,
    },
    Search {
        query: String,
        project: Option<String>,
        kind: Option<ArtifactKind>,
        limit: Option<usize>,
    },
    Raw {
        project: String,
        kind: ArtifactKind,
    },
}

impl ToolRequest {
    /// Decodes and validates the arguments of `tool`.
    ///
    /// Unknown extra arguments are ignored. Every failure names the
    /// offending field.
    pub fn parse(tool: ToolName, args: &Value) -> Result<Self> {
        let empty = Map::new();
        let args = match args {
            Value::Object(map) => map,
            Value::Null => &empty,
            _ => {
                return Err(QueryError::invalid_argument(
                    "arguments",
                    "must be a JSON object",
                ))
            }
        };

        let request = match tool {
            ToolName::ListProjects => {
                let sort = match optional_str(args, "sort")? {
                    None => ProjectSort::Name,
                    Some(s) => match s.to_lowercase().as_str() {
                        "name" => ProjectSort::Name,
                        "risk" => ProjectSort::Risk,
                        _ => return Err(QueryError::invalid_argument("sort", "must be 'name' or 'risk'")),
                    },
                };
                ToolRequest::ListProjects {
                    owner: optional_str(args, "owner")?.map(str::to_string),
                    sort,
                }
            }
            ToolName::GetProjectSummary => ToolRequest::ProjectSummary {
                project: required_project(args)?,
            },
            ToolName::GetVulnerabilities => {
                let project = required_project(args)?;
                let min_severity = match optional_str(args, "min_severity")? {
                    None => None,
                    Some(s) => match Severity::parse_strict(s) {
                        Some(sev) if sev != Severity::Info => Some(sev),
                        _ => {
                            return Err(QueryError::invalid_argument(
                                "min_severity",
                                "must be one of critical, high, medium, low",
                            ))
                        }
                    },
                };
                ToolRequest::Findings {
                    project,
                    kind: ArtifactKind::Vulnerabilities,
                    min_severity,
                    category: None,
                    limit: None,
                }
            }
            ToolName::GetMalcontent => {
                let project = required_project(args)?;
                let min_severity = match optional_str(args, "min_risk")? {
                    None => None,
                    Some(s) => match RiskLevel::parse(s) {
                        Some(level) if level != RiskLevel::None => Some(level.as_severity()),
                        _ => {
                            return Err(QueryError::invalid_argument(
                                "min_risk",
                                "must be one of LOW, MEDIUM, HIGH, CRITICAL",
                            ))
                        }
                    },
                };
                ToolRequest::Findings {
                    project,
                    kind: ArtifactKind::Malcontent,
                    min_severity,
                    category: None,
                    limit: optional_limit(args, "limit")?,
                }
            }
            ToolName::GetTechnologies => findings_of(args, ArtifactKind::Technologies)?,
            ToolName::GetLicenses => findings_of(args, ArtifactKind::Licenses)?,
            ToolName::GetCodeSecurity => {
                let project = required_project(args)?;
                let category = match optional_str(args, "category")? {
                    None => None,
                    Some(s) => Some(CodeSecurityCategory::parse(s).ok_or_else(|| {
                        QueryError::invalid_argument("category", "must be 'secrets' or 'crypto'")
                    })?),
                };
                ToolRequest::Findings {
                    project,
                    kind: ArtifactKind::CodeSecurity,
                    min_severity: None,
                    category,
                    limit: None,
                }
            }
            ToolName::GetPackageHealth => ToolRequest::PackageHealth {
                project: required_project(args)?,
            },
            ToolName::SearchFindings => {
                let query = required_str(args, "query")?;
                normalize_query(query)?;

                let project = optional_str(args, "project")?
                    .map(|p| validate_project_id(p).map(|_| p.to_string()))
                    .transpose()?;

                ToolRequest::Search {
                    query: query.to_string(),
                    project,
                    kind: optional_kind(args)?,
                    limit: optional_limit(args, "limit")?,
                }
            }
            ToolName::GetAnalysisRaw => {
                let project = required_project(args)?;
                let kind = optional_kind(args)?
                    .ok_or_else(|| QueryError::invalid_argument("kind", "missing required argument"))?;
                ToolRequest::Raw { project, kind }
            }
        };

        Ok(request)
    }
}

fn findings_of(args: &Map<String, Value>, kind: ArtifactKind) -> Result<ToolRequest> {
    Ok(ToolRequest::Findings {
        project: required_project(args)?,
        kind,
        min_severity: None,
        category: None,
        limit: None,
    })
}

fn required_str<'a>(args: &'a Map<String, Value>, field: &str) -> Result<&'a str> {
    optional_str(args, field)?
        .ok_or_else(|| QueryError::invalid_argument(field, "missing required argument"))
}

fn optional_str<'a>(args: &'a Map<String, Value>, field: &str) -> Result<Option<&'a str>> {
    match args.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.as_str())),
        Some(_) => Err(QueryError::invalid_argument(field, "must be a string")),
    }
}

fn optional_limit(args: &Map<String, Value>, field: &str) -> Result<Option<usize>> {
    match args.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(v) => match v.as_u64() {
            Some(n) if n >= 1 => Ok(Some(n as usize)),
            _ => Err(QueryError::invalid_argument(field, "must be a positive integer")),
        },
    }
}

fn required_project(args: &Map<String, Value>) -> Result<String> {
    let project = required_str(args, "project")?;
    validate_project_id(project)?;
    Ok(project.to_string())
}

fn optional_kind(args: &Map<String, Value>) -> Result<Option<ArtifactKind>> {
    match optional_str(args, "kind")? {
        None => Ok(None),
        Some(s) => ArtifactKind::parse(s).map(Some).ok_or_else(|| {
            let names: Vec<&str> = ArtifactKind::ALL.iter().map(|k| k.name()).collect();
            QueryError::invalid_argument("kind", format!("must be one of {}", names.join(", ")))
        }),
    }
}

/// Limits applied to tool results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToolLimits {
    pub max_file_size: u64,
    pub max_findings: usize,
    pub max_output_size: usize,
}

impl Default for ToolLimits {
    fn default() -> Self {
        Self::from(&LimitsConfig::default())
    }
}

impl From<&LimitsConfig> for ToolLimits {
    fn from(config: &LimitsConfig) -> Self {
        Self {
            max_file_size: config.max_file_size,
            max_findings: config.max_findings,
            max_output_size: config.max_output_size,
        }
    }
}

/// Rendered result of one tool call.
#[derive(Debug, Clone, Serialize)]
pub struct ToolResult {
    pub success: bool,
    /// Result JSON on success, the rendered error body otherwise.
    pub output: String,
}

impl ToolResult {
    pub fn success(output: String) -> Self {
        Self {
            success: true,
            output,
        }
    }

    pub fn error(err: &QueryError) -> Self {
        let output = serde_json::to_string_pretty(&err.to_body())
            .unwrap_or_else(|_| format!("{{\"kind\": \"{}\"}}", err.kind()));
        Self {
            success: false,
            output,
        }
    }
}

/// Executes tool calls against one artifact root.
///
/// Holds no mutable state; one executor is shared by all in-flight calls.
#[derive(Debug, Clone)]
pub struct ToolExecutor {
    registry: ProjectRegistry,
    loader: ArtifactLoader,
    search: SearchEngine,
    limits: ToolLimits,
}

impl ToolExecutor {
    pub fn new(root: PathBuf, limits: ToolLimits) -> Self {
        let registry = ProjectRegistry::new(root);
        let loader = ArtifactLoader::new(limits.max_file_size);
        let search = SearchEngine::new(registry.clone(), loader.clone());
        Self {
            registry,
            loader,
            search,
            limits,
        }
    }

    pub fn root(&self) -> &std::path::Path {
        self.registry.root()
    }

    /// Invokes a tool and renders the outcome, enforcing the output limit.
    pub fn call(&self, name: &str, args: &Value) -> ToolResult {
        match self.invoke(name, args) {
            Ok(value) => {
                debug!("Tool {} succeeded", name);
                ToolResult::success(render_output(&value, self.limits.max_output_size))
            }
            Err(e) => {
                info!("Tool {} failed: {}", name, e);
                ToolResult::error(&e)
            }
        }
    }

    /// Resolves, validates and executes a tool call.
    pub fn invoke(&self, name: &str, args: &Value) -> Result<Value> {
        let tool = ToolName::parse(name).ok_or_else(|| QueryError::UnknownTool(name.to_string()))?;
        let request = ToolRequest::parse(tool, args)?;
        debug!("Executing tool: {} with {:?}", name, request);
        self.execute(request)
    }

    fn execute(&self, request: ToolRequest) -> Result<Value> {
        match request {
            ToolRequest::ListProjects { owner, sort } => self.list_projects(owner.as_deref(), sort),
            ToolRequest::ProjectSummary { project } => {
                let project = self.registry.find(&project)?;
                to_json(&summarize(&project, &self.loader)?)
            }
            ToolRequest::Findings {
                project,
                kind,
                min_severity,
                category,
                limit,
            } => {
                let project = self.registry.find(&project)?;
                let mut findings = self.loader.load(&project, kind)?.findings;
                if let Some(min) = min_severity {
                    findings = filter_min_severity(findings, min);
                }
                if let Some(category) = category {
                    findings.retain(|f| category.contains(f));
                }
                if kind != ArtifactKind::Technologies {
                    sort_findings_by_severity(&mut findings);
                }

                let mut result = self.findings_result(&project, kind, findings, limit);
                if let Some(category) = category {
                    result["category"] = json!(category.as_str());
                }
                Ok(result)
            }
            ToolRequest::PackageHealth { project } => {
                let project = self.registry.find(&project)?;
                let artifact = self.loader.load(&project, ArtifactKind::PackageHealth)?;
                let score = to_json(&normalize(&artifact))?;

                let mut findings = artifact.findings;
                sort_findings_by_severity(&mut findings);
                let mut result = self.findings_result(&project, ArtifactKind::PackageHealth, findings, None);
                result["score"] = score;
                Ok(result)
            }
            ToolRequest::Search {
                query,
                project,
                kind,
                limit,
            } => {
                let limit = self.cap(limit);
                let (matches, truncated) = self.search.search(&query, project.as_deref(), kind, limit)?;

                let mut result = json!({
                    "query": query,
                    "count": matches.len(),
                    "matches": matches,
                });
                if truncated {
                    result["warning"] = json!(format!(
                        "More than {} matches; narrow the query or filter by project or kind",
                        limit
                    ));
                }
                Ok(result)
            }
            ToolRequest::Raw { project, kind } => {
                let project = self.registry.find(&project)?;
                self.loader.load_raw(&project, kind)
            }
        }
    }

    fn list_projects(&self, owner: Option<&str>, sort: ProjectSort) -> Result<Value> {
        let projects: Vec<Project> = self
            .registry
            .list_projects()?
            .into_iter()
            .filter(|p| owner.map_or(true, |o| p.owner.eq_ignore_ascii_case(o)))
            .collect();

        let entries: Vec<Value> = match sort {
            ProjectSort::Name => projects.iter().map(to_json).collect::<Result<_>>()?,
            ProjectSort::Risk => {
                let mut ranked: Vec<(Project, Option<RiskLevel>)> = projects
                    .into_iter()
                    .map(|p| {
                        let risk = summarize(&p, &self.loader).ok().map(|r| r.risk_level);
                        (p, risk)
                    })
                    .collect();
                rank_by_risk(&mut ranked, |p| p.id.as_str());

                ranked
                    .iter()
                    .map(|(p, risk)| -> Result<Value> {
                        let mut entry = to_json(p)?;
                        entry["risk_level"] = json!(risk);
                        entry["high_risk"] = json!(risk.map_or(false, |r| r.is_high_risk()));
                        Ok(entry)
                    })
                    .collect::<Result<_>>()?
            }
        };

        Ok(json!({
            "count": entries.len(),
            "projects": entries,
        }))
    }

    /// Caps a requested result size at the configured maximum.
    fn cap(&self, requested: Option<usize>) -> usize {
        requested
            .unwrap_or(self.limits.max_findings)
            .min(self.limits.max_findings)
    }

    fn findings_result(
        &self,
        project: &Project,
        kind: ArtifactKind,
        mut findings: Vec<Finding>,
        limit: Option<usize>,
    ) -> Value {
        let total = findings.len();
        let cap = self.cap(limit);
        findings.truncate(cap);

        let mut result = json!({
            "project": project.id,
            "kind": kind,
            "total": total,
            "count": findings.len(),
            "findings": findings,
        });
        if total > cap {
            result["warning"] = json!(format!(
                "Showing {} of {} findings; use filters to narrow the result",
                cap, total
            ));
        }
        result
    }
}

fn to_json<T: Serialize>(value: &T) -> Result<Value> {
    serde_json::to_value(value).map_err(|e| QueryError::Internal(format!("serialization failed: {}", e)))
}

/// Renders a result, replacing it with a notice when it exceeds `limit` bytes.
pub fn render_output(value: &Value, limit: usize) -> String {
    let text = serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string());
    if text.len() <= limit {
        return text;
    }

    let notice = json!({
        "truncated": true,
        "size": text.len(),
        "limit": limit,
        "hint": "Result too large; narrow it with filters such as min_severity, min_risk, kind or limit",
    });
    serde_json::to_string_pretty(&notice).unwrap_or_else(|_| notice.to_string())
}
