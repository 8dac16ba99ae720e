//! Tools exposed to callers.
//!
//! This module defines the tool catalogue and routes named invocations to
//! the registry, loader, aggregator and search engine.

pub mod definitions;
pub mod dispatch;

pub use definitions::get_tool_definitions;
pub use dispatch::{ToolExecutor, ToolLimits, ToolResult};
