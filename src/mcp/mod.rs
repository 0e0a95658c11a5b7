//! MCP (Model Context Protocol) implementation.

mod args;
pub mod catalog;
mod client_log;
mod handlers;
pub mod protocol;
mod result;
pub mod server;
mod tools;

pub use args::ToolArgs;
pub use client_log::{ClientLog, LogEvent, LOGGER};
pub use catalog::{catalog, ToolDefinition, DEEP_RESEARCH, DEFAULT_K, EXTRACT, RETRIEVE};
pub use handlers::{DeepResearchHandler, ExtractHandler, RetrieveHandler, ToolSettings};
pub use result::{Content, ToolError, ToolOutput, ToolResult, FAILURE_PREFIX};
pub use protocol::McpProtocol;
pub use server::McpServer;
pub use tools::{Tool, ToolHandler, ToolRegistry};
