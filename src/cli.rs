//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use clap::Parser;
use serde_json::Value;
use std::path::PathBuf;

/// scanlens - query security analysis artifacts over a tool protocol
///
/// Serves per-project analysis results (vulnerabilities, malcontent,
/// licenses, code security, package health, technologies) as named MCP
/// tools on stdin/stdout.
///
/// Examples:
///   scanlens --root ~/.zero/repos
///   scanlens --list-tools
///   scanlens --call get_project_summary --args '{"project": "acme/widgets"}'
///   scanlens --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Artifact root containing owner/name/analysis/ directories
    ///
    /// Defaults to general.root from the config file, then $HOME/.zero/repos.
    #[arg(short, long, value_name = "DIR", env = "SCANLENS_ROOT")]
    pub root: Option<PathBuf>,

    /// Path to configuration file
    ///
    /// If not specified, looks for .scanlens.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (errors only)
    #[arg(short, long)]
    pub quiet: bool,

    /// Per-call timeout in seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Maximum number of findings returned by one tool call
    #[arg(long, value_name = "N")]
    pub max_findings: Option<usize>,

    /// Generate a default .scanlens.toml configuration file
    #[arg(long)]
    pub init_config: bool,

    /// Print the tool definitions as JSON and exit
    #[arg(long, conflicts_with = "call")]
    pub list_tools: bool,

    /// Invoke one tool, print its result and exit
    ///
    /// Exit code 2 when the tool returns a structured error.
    #[arg(long, value_name = "TOOL")]
    pub call: Option<String>,

    /// JSON object of arguments for --call
    #[arg(long = "args", value_name = "JSON")]
    pub call_args: Option<String>,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        // Skip validation for --init-config
        if self.init_config {
            return Ok(());
        }

        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if let Some(timeout) = self.timeout {
            if timeout == 0 {
                return Err("Timeout must be at least 1 second".to_string());
            }
        }

        if let Some(max_findings) = self.max_findings {
            if max_findings == 0 {
                return Err("Max findings must be at least 1".to_string());
            }
        }

        if self.call_args.is_some() && self.call.is_none() {
            return Err("--args requires --call".to_string());
        }

        self.call_arguments().map(|_| ())
    }

    /// Arguments for `--call`, parsed as JSON. Defaults to `{}`.
    pub fn call_arguments(&self) -> Result<Value, String> {
        match self.call_args.as_deref() {
            None => Ok(Value::Object(Default::default())),
            Some(raw) => serde_json::from_str(raw).map_err(|e| format!("--args is not valid JSON: {}", e)),
        }
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}
