//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.scanlens.toml` files.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Name of the configuration file looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = ".scanlens.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Size and count limits.
    #[serde(default)]
    pub limits: LimitsConfig,

    /// Protocol server settings.
    #[serde(default)]
    pub server: ServerConfig,
}

/// General application settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Artifact root holding `owner/name/analysis/` directories.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root: Option<PathBuf>,

    /// Enable verbose logging by default.
    #[serde(default)]
    pub verbose: bool,
}

/// Limits on artifact input and tool output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LimitsConfig {
    /// Largest artifact file read, in bytes.
    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,

    /// Most findings returned by one tool call.
    #[serde(default = "default_max_findings")]
    pub max_findings: usize,

    /// Largest rendered tool result, in bytes.
    #[serde(default = "default_max_output_size")]
    pub max_output_size: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_file_size: default_max_file_size(),
            max_findings: default_max_findings(),
            max_output_size: default_max_output_size(),
        }
    }
}

fn default_max_file_size() -> u64 {
    50 * 1024 * 1024 // 50MB
}

fn default_max_findings() -> usize {
    500
}

fn default_max_output_size() -> usize {
    1024 * 1024 // 1MB
}

/// Protocol server settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Per-call timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,

    /// Tool calls allowed in flight at once.
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: default_timeout(),
            max_concurrent: default_max_concurrent(),
        }
    }
}

fn default_timeout() -> u64 {
    5
}

fn default_max_concurrent() -> usize {
    8
}

/// Where the effective configuration came from.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigOrigin {
    /// `--config` path.
    Explicit(PathBuf),
    /// `.scanlens.toml` in the working directory.
    Default,
    /// No file; built-in defaults.
    Builtin,
    /// The default file exists but failed to load.
    Fallback(String),
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        config
            .validate()
            .with_context(|| format!("Invalid config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location in `dir`.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default(dir: &Path) -> Result<Option<Self>> {
        let default_path = dir.join(CONFIG_FILE_NAME);

        if default_path.exists() {
            Ok(Some(Self::load(&default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Resolves the configuration to use.
    ///
    /// An explicit path must load. A broken default file falls back to the
    /// built-in defaults.
    pub fn resolve(explicit: Option<&Path>, dir: &Path) -> Result<(Self, ConfigOrigin)> {
        if let Some(path) = explicit {
            return Ok((Self::load(path)?, ConfigOrigin::Explicit(path.to_path_buf())));
        }

        match Self::load_default(dir) {
            Ok(Some(config)) => Ok((config, ConfigOrigin::Default)),
            Ok(None) => Ok((Config::default(), ConfigOrigin::Builtin)),
            Err(e) => Ok((Config::default(), ConfigOrigin::Fallback(format!("{:#}", e)))),
        }
    }

    /// Checks that limits and server settings are usable.
    pub fn validate(&self) -> Result<()> {
        if self.limits.max_file_size == 0 {
            bail!("limits.max_file_size must be at least 1");
        }
        if self.limits.max_findings == 0 {
            bail!("limits.max_findings must be at least 1");
        }
        if self.limits.max_output_size == 0 {
            bail!("limits.max_output_size must be at least 1");
        }
        if self.server.timeout_seconds == 0 {
            bail!("server.timeout_seconds must be at least 1");
        }
        if self.server.max_concurrent == 0 {
            bail!("server.max_concurrent must be at least 1");
        }
        Ok(())
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings, and only
    /// when explicitly provided.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref root) = args.root {
            self.general.root = Some(root.clone());
        }

        if let Some(timeout) = args.timeout {
            self.server.timeout_seconds = timeout;
        }

        if let Some(max_findings) = args.max_findings {
            self.limits.max_findings = max_findings;
        }

        if args.verbose {
            self.general.verbose = true;
        }
    }

    /// The artifact root: configured root, else `$HOME/.zero/repos`.
    pub fn artifact_root(&self) -> Result<PathBuf> {
        if let Some(ref root) = self.general.root {
            return Ok(root.clone());
        }

        match std::env::var_os("HOME") {
            Some(home) if !home.is_empty() => Ok(PathBuf::from(home).join(".zero").join("repos")),
            _ => bail!("Cannot determine the artifact root: set --root or SCANLENS_ROOT"),
        }
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.limits.max_file_size, 50 * 1024 * 1024);
        assert_eq!(config.limits.max_findings, 500);
        assert_eq!(config.server.timeout_seconds, 5);
        assert!(config.general.root.is_none());
    }

    #[test]
    fn test_parse_config() {
        let toml_content = r#"
[general]
root = "/srv/zero/repos"
verbose = true

[limits]
max_findings = 50

[server]
timeout_seconds = 10
"#;

        let config: Config = toml::from_str(toml_content).unwrap();
        assert_eq!(config.general.root, Some(PathBuf::from("/srv/zero/repos")));
        assert!(config.general.verbose);
        assert_eq!(config.limits.max_findings, 50);
        assert_eq!(config.limits.max_output_size, 1024 * 1024);
        assert_eq!(config.server.timeout_seconds, 10);
        assert_eq!(config.server.max_concurrent, 8);
    }

    #[test]
    fn test_empty_config_is_default() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_default_toml_generation() {
        let toml_str = Config::default_toml();
        assert!(toml_str.contains("[general]"));
        assert!(toml_str.contains("[limits]"));
        assert!(toml_str.contains("[server]"));

        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed, Config::default());
    }

    #[test]
    fn test_resolve_origins() {
        let temp_dir = TempDir::new().unwrap();

        let (_, origin) = Config::resolve(None, temp_dir.path()).unwrap();
        assert_eq!(origin, ConfigOrigin::Builtin);

        std::fs::write(temp_dir.path().join(CONFIG_FILE_NAME), "[limits]\nmax_findings = 7\n").unwrap();
        let (config, origin) = Config::resolve(None, temp_dir.path()).unwrap();
        assert_eq!(origin, ConfigOrigin::Default);
        assert_eq!(config.limits.max_findings, 7);

        std::fs::write(temp_dir.path().join(CONFIG_FILE_NAME), "[limits\n").unwrap();
        let (config, origin) = Config::resolve(None, temp_dir.path()).unwrap();
        assert!(matches!(origin, ConfigOrigin::Fallback(_)));
        assert_eq!(config, Config::default());

        let explicit = temp_dir.path().join(CONFIG_FILE_NAME);
        assert!(Config::resolve(Some(&explicit), temp_dir.path()).is_err());
    }

    #[test]
    fn test_validate_rejects_zero_limits() {
        let mut config = Config::default();
        config.server.max_concurrent = 0;
        assert!(config.validate().is_err());

        let config: Config = toml::from_str("[limits]\nmax_findings = 0\n").unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_configured_root_wins() {
        let mut config = Config::default();
        config.general.root = Some(PathBuf::from("/data/repos"));
        assert_eq!(config.artifact_root().unwrap(), PathBuf::from("/data/repos"));
    }
}
