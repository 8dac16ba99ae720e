//! scanlens - query layer over per-repository security analysis artifacts
//!
//! Serves the analysis JSON stored under `owner/name/analysis/` as named
//! MCP tools over stdio, or answers a single tool call from the command
//! line.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Runtime error (bad arguments, config, I/O)
//!   2 - A --call invocation returned a structured tool error

mod analysis;
mod artifact;
mod cli;
mod config;
mod error;
mod models;
mod registry;
mod search;
mod server;
mod tools;

use anyhow::{Context, Result};
use cli::Args;
use config::{Config, ConfigOrigin, CONFIG_FILE_NAME};
use server::ScanlensServer;
use std::path::Path;
use std::time::Duration;
use tools::{get_tool_definitions, ToolExecutor, ToolLimits};
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config and --list-tools early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }
    if args.list_tools {
        let tools = serde_json::to_string_pretty(&get_tool_definitions())
            .context("Failed to render tool definitions")?;
        println!("{}", tools);
        return Ok(());
    }

    match run(args).await {
        Ok(exit_code) => std::process::exit(exit_code),
        Err(e) => {
            error!("scanlens failed: {:#}", e);
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Handle --init-config: generate a default .scanlens.toml.
fn handle_init_config() -> Result<()> {
    let path = Path::new(CONFIG_FILE_NAME);

    if path.exists() {
        eprintln!("{} already exists. Remove it first or edit it manually.", CONFIG_FILE_NAME);
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content).with_context(|| format!("Failed to write {}", CONFIG_FILE_NAME))?;

    println!("Created {} with default settings.", CONFIG_FILE_NAME);
    Ok(())
}

/// Initialize logging. Stdout carries the protocol, so logs go to stderr.
fn init_logging(level: tracing::Level) {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");
}

/// Load config, then serve or answer one call. Returns the exit code.
async fn run(args: Args) -> Result<i32> {
    let cwd = std::env::current_dir().context("Failed to read the working directory")?;
    let (mut config, origin) = Config::resolve(args.config.as_deref(), &cwd)?;
    config.merge_with_args(&args);
    config.validate().context("Invalid settings")?;

    let level = if !args.quiet && config.general.verbose {
        tracing::Level::DEBUG
    } else {
        args.log_level()
    };
    init_logging(level);

    match origin {
        ConfigOrigin::Explicit(path) => info!("Loaded config from: {}", path.display()),
        ConfigOrigin::Default => info!("Loaded default config from {}", CONFIG_FILE_NAME),
        ConfigOrigin::Builtin => debug!("No config file found, using defaults"),
        ConfigOrigin::Fallback(e) => warn!("Failed to load config, using defaults: {}", e),
    }
    debug!("Arguments: {:?}", args);

    let root = config.artifact_root()?;
    if !root.is_dir() {
        warn!("Artifact root {} does not exist yet", root.display());
    }

    let executor = ToolExecutor::new(root, ToolLimits::from(&config.limits));
    debug!("Artifact root: {}", executor.root().display());
    let server = ScanlensServer::new(
        executor,
        Duration::from_secs(config.server.timeout_seconds),
        config.server.max_concurrent,
    );

    if let Some(ref tool) = args.call {
        let call_args = args.call_arguments().map_err(anyhow::Error::msg)?;
        let result = server.run_tool(tool, call_args).await;
        println!("{}", result.output);
        return Ok(if result.success { 0 } else { 2 });
    }

    info!("scanlens v{} serving on stdio", env!("CARGO_PKG_VERSION"));
    server.run().await?;
    Ok(0)
}
