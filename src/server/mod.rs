//! MCP server over stdio.
//!
//! The protocol handshake, framing and request routing come from `rmcp`;
//! this module advertises the tool catalogue and runs each `tools/call` on
//! a blocking worker, bounded by a semaphore and a per-call timeout.

use crate::error::QueryError;
use crate::tools::definitions::ToolDefinition;
use crate::tools::{get_tool_definitions, ToolExecutor, ToolResult};
use anyhow::{Context, Result};
use rmcp::model::{
    CallToolRequestParam, CallToolResult, Content, Implementation, JsonObject, ListToolsResult,
    PaginatedRequestParam, ServerCapabilities, ServerInfo, Tool,
};
use rmcp::service::{RequestContext, RoleServer};
use rmcp::transport::stdio;
use rmcp::{ErrorData as McpError, ServerHandler, ServiceExt};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::{error, info, warn};

/// MCP service sharing one executor across all calls.
#[derive(Debug, Clone)]
pub struct ScanlensServer {
    executor: Arc<ToolExecutor>,
    permits: Arc<Semaphore>,
    timeout: Duration,
}

impl ScanlensServer {
    pub fn new(executor: ToolExecutor, timeout: Duration, max_concurrent: usize) -> Self {
        Self {
            executor: Arc::new(executor),
            permits: Arc::new(Semaphore::new(max_concurrent.max(1))),
            timeout,
        }
    }

    /// Serve MCP on stdin/stdout until the client disconnects.
    pub async fn run(self) -> Result<()> {
        let service = self.serve(stdio()).await.context("Failed to start MCP service")?;
        let reason = service.waiting().await.context("MCP service failed")?;
        info!("MCP service stopped: {:?}", reason);
        Ok(())
    }

    /// Runs one tool call on a blocking worker under the call timeout.
    ///
    /// The timeout covers waiting for a concurrency slot as well as the
    /// work itself. The permit moves into the worker, so a timed-out call
    /// keeps its slot until the worker actually finishes.
    pub async fn run_tool(&self, name: &str, args: Value) -> ToolResult {
        info!("Calling tool: {}", name);

        let permits = Arc::clone(&self.permits);
        let executor = Arc::clone(&self.executor);
        let tool = name.to_string();
        let work = async move {
            let permit = permits
                .acquire_owned()
                .await
                .map_err(|_| QueryError::Internal("server is shutting down".to_string()))?;
            tokio::task::spawn_blocking(move || {
                let _permit = permit;
                executor.call(&tool, &args)
            })
            .await
            .map_err(QueryError::from)
        };

        match tokio::time::timeout(self.timeout, work).await {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => {
                error!("Tool {} worker failed: {}", name, e);
                ToolResult::error(&e)
            }
            Err(_) => {
                warn!("Tool {} timed out after {:?}", name, self.timeout);
                ToolResult::error(&QueryError::Timeout {
                    tool: name.to_string(),
                    seconds: self.timeout.as_secs(),
                })
            }
        }
    }
}

impl From<ToolDefinition> for Tool {
    fn from(def: ToolDefinition) -> Self {
        let schema = match def.input_schema {
            Value::Object(map) => map,
            _ => JsonObject::new(),
        };
        Tool::new(def.name, def.description, Arc::new(schema))
    }
}

impl ServerHandler for ScanlensServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(
                "scanlens answers questions about per-repository security analysis: \
                 list projects, summarize risk, list findings by kind, search across projects."
                    .into(),
            ),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: env!("CARGO_PKG_NAME").to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    fn list_tools(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> impl std::future::Future<Output = Result<ListToolsResult, McpError>> + Send + '_ {
        let tools = get_tool_definitions().into_iter().map(Tool::from).collect();
        std::future::ready(Ok(ListToolsResult::with_all_items(tools)))
    }

    fn call_tool(
        &self,
        request: CallToolRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> impl std::future::Future<Output = Result<CallToolResult, McpError>> + Send + '_ {
        async move {
            let args = request.arguments.map(Value::Object).unwrap_or(Value::Null);
            let result = self.run_tool(&request.name, args).await;

            let content = vec![Content::text(result.output)];
            Ok(if result.success {
                CallToolResult::success(content)
            } else {
                CallToolResult::error(content)
            })
        }
    }
}
