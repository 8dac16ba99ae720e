//! Tool definitions advertised to callers.
//!
//! Each tool carries a JSON schema for its arguments. The schemas are
//! descriptive; the authoritative validation happens in
//! [`ToolRequest::parse`](super::dispatch::ToolRequest::parse).

use serde::Serialize;
use serde_json::{json, Value};

/// A named tool with its argument schema.
#[derive(Debug, Clone, Serialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

impl ToolDefinition {
    fn new(name: &str, description: &str, input_schema: Value) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            input_schema,
        }
    }
}

fn project_property() -> Value {
    json!({
        "type": "string",
        "description": "Project id in 'owner/name' format (e.g. 'expressjs/express')"
    })
}

fn project_only_schema() -> Value {
    json!({
        "type": "object",
        "properties": { "project": project_property() },
        "required": ["project"]
    })
}

const KIND_VALUES: [&str; 6] = [
    "vulnerabilities",
    "malcontent",
    "technologies",
    "package_health",
    "licenses",
    "code_security",
];

/// Get the definitions of every exposed tool.
pub fn get_tool_definitions() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition::new(
            "list_projects",
            "List all hydrated projects with the analysis kinds available for each.",
            json!({
                "type": "object",
                "properties": {
                    "owner": {
                        "type": "string",
                        "description": "Only list projects of this owner (case-insensitive)"
                    },
                    "sort": {
                        "type": "string",
                        "enum": ["name", "risk"],
                        "description": "Order by project id (default) or by overall risk, highest first"
                    }
                },
                "required": []
            }),
        ),
        ToolDefinition::new(
            "get_project_summary",
            "Get the combined score, risk level and finding counts of a project.",
            project_only_schema(),
        ),
        ToolDefinition::new(
            "get_vulnerabilities",
            "Get package vulnerabilities (CVEs, advisories) of a project, most severe first.",
            json!({
                "type": "object",
                "properties": {
                    "project": project_property(),
                    "min_severity": {
                        "type": "string",
                        "enum": ["critical", "high", "medium", "low"],
                        "description": "Only return vulnerabilities at or above this severity"
                    }
                },
                "required": ["project"]
            }),
        ),
        ToolDefinition::new(
            "get_malcontent",
            "Get supply-chain behavior findings (malware indicators, suspicious install scripts) of a project.",
            json!({
                "type": "object",
                "properties": {
                    "project": project_property(),
                    "min_risk": {
                        "type": "string",
                        "enum": ["LOW", "MEDIUM", "HIGH", "CRITICAL"],
                        "description": "Only return findings at or above this risk level"
                    },
                    "limit": {
                        "type": "integer",
                        "minimum": 1,
                        "description": "Maximum number of findings to return"
                    }
                },
                "required": ["project"]
            }),
        ),
        ToolDefinition::new(
            "get_technologies",
            "Get the detected technology stack (languages, frameworks, tools) of a project.",
            project_only_schema(),
        ),
        ToolDefinition::new(
            "get_package_health",
            "Get the dependency health score and findings (deprecated, unmaintained packages) of a project.",
            project_only_schema(),
        ),
        ToolDefinition::new(
            "get_licenses",
            "Get license findings of a project, denied licenses first.",
            project_only_schema(),
        ),
        ToolDefinition::new(
            "get_code_security",
            "Get static analysis findings (secrets, insecure APIs, weak crypto) of a project.",
            json!({
                "type": "object",
                "properties": {
                    "project": project_property(),
                    "category": {
                        "type": "string",
                        "enum": ["secrets", "crypto"],
                        "description": "Only return hardcoded secrets, or crypto issues (ciphers, keys, TLS, randomness, certificates)"
                    }
                },
                "required": ["project"]
            }),
        ),
        ToolDefinition::new(
            "search_findings",
            "Search finding ids, descriptions and categories across projects for a keyword.",
            json!({
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "Case-insensitive text to search for"
                    },
                    "project": {
                        "type": "string",
                        "description": "Limit the search to one 'owner/name' project"
                    },
                    "kind": {
                        "type": "string",
                        "enum": KIND_VALUES,
                        "description": "Limit the search to one analysis kind"
                    },
                    "limit": {
                        "type": "integer",
                        "minimum": 1,
                        "description": "Maximum number of matches to return"
                    }
                },
                "required": ["query"]
            }),
        ),
        ToolDefinition::new(
            "get_analysis_raw",
            "Get the raw JSON of one analysis artifact of a project.",
            json!({
                "type": "object",
                "properties": {
                    "project": project_property(),
                    "kind": {
                        "type": "string",
                        "enum": KIND_VALUES,
                        "description": "Analysis kind (the file stem such as 'package-vulns' is also accepted)"
                    }
                },
                "required": ["project", "kind"]
            }),
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::dispatch::ToolName;

    #[test]
    fn test_tool_definitions() {
        let tools = get_tool_definitions();
        assert_eq!(tools.len(), 10);

        for tool in &tools {
            assert!(ToolName::parse(&tool.name).is_some(), "{}", tool.name);
            assert_eq!(tool.input_schema["type"], "object");
        }
    }

    #[test]
    fn test_definitions_serialize_input_schema() {
        let tools = get_tool_definitions();
        let json = serde_json::to_value(&tools).unwrap();
        let malcontent = json
            .as_array()
            .unwrap()
            .iter()
            .find(|t| t["name"] == "get_malcontent")
            .unwrap();

        assert_eq!(
            malcontent["inputSchema"]["properties"]["min_risk"]["enum"],
            json!(["LOW", "MEDIUM", "HIGH", "CRITICAL"])
        );
        assert_eq!(malcontent["inputSchema"]["required"], json!(["project"]));
    }
}
