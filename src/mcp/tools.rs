//! Tool registry for MCP tools.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures_util::FutureExt;
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;

use super::args::ToolArgs;
use super::catalog::{self, ToolDefinition, DEEP_RESEARCH, EXTRACT, RETRIEVE};
use super::client_log::ClientLog;
use super::handlers::{DeepResearchHandler, ExtractHandler, RetrieveHandler, ToolSettings};
use super::result::{ToolError, ToolOutput, ToolResult, FAILURE_PREFIX};
use crate::client::VectorizeApi;

/// Longest string argument logged verbatim
const MAX_LOGGED_STRING: usize = 200;

/// An MCP tool that can be called by the client
#[derive(Clone)]
pub struct Tool {
    /// Name, description and input schema
    pub definition: ToolDefinition,

    /// Handler function to execute the tool
    pub handler: Arc<dyn ToolHandler>,
}

impl std::fmt::Debug for Tool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tool")
            .field("name", &self.definition.name)
            .field("description", &self.definition.description)
            .field("input_schema", &self.definition.input_schema)
            .finish()
    }
}

/// Handler for executing a tool
#[async_trait::async_trait]
pub trait ToolHandler: Send + Sync + std::fmt::Debug {
    /// Execute the tool with validated access to its arguments
    async fn execute(
        &self,
        args: &ToolArgs,
        cancel: &CancellationToken,
    ) -> Result<ToolOutput, ToolError>;
}

/// Registry of the three Vectorize tools, in catalog order
#[derive(Debug, Clone)]
pub struct ToolRegistry {
    tools: Vec<Tool>,
    settings: Arc<ToolSettings>,
    log: ClientLog,
}

impl ToolRegistry {
    /// Create the registry; schemas are computed once from the settings
    pub fn new(api: Arc<dyn VectorizeApi>, settings: ToolSettings) -> Self {
        let settings = Arc::new(settings);
        let log = ClientLog::new();
        let mut registry = Self {
            tools: Vec::new(),
            settings: settings.clone(),
            log: log.clone(),
        };

        for definition in catalog::catalog(settings.default_pipeline_id.is_some()) {
            let handler: Arc<dyn ToolHandler> = match definition.name.as_str() {
                RETRIEVE => Arc::new(RetrieveHandler {
                    api: api.clone(),
                    settings: settings.clone(),
                }),
                EXTRACT => Arc::new(ExtractHandler {
                    api: api.clone(),
                    settings: settings.clone(),
                }),
                DEEP_RESEARCH => Arc::new(DeepResearchHandler {
                    api: api.clone(),
                    settings: settings.clone(),
                    log: log.clone(),
                }),
                other => unreachable!("catalog entry without handler: {}", other),
            };
            registry.register(Tool {
                definition,
                handler,
            });
        }

        registry
    }

    /// Register a tool, replacing any tool with the same name
    pub fn register(&mut self, tool: Tool) {
        match self
            .tools
            .iter_mut()
            .find(|t| t.definition.name == tool.definition.name)
        {
            Some(existing) => *existing = tool,
            None => self.tools.push(tool),
        }
    }

    /// Settings the handlers were built with
    pub fn settings(&self) -> &ToolSettings {
        &self.settings
    }

    /// Events for the MCP client, emitted while calls run
    pub fn client_log(&self) -> &ClientLog {
        &self.log
    }

    /// Get all tools
    pub fn all(&self) -> &[Tool] {
        &self.tools
    }

    /// Tool definitions in catalog order
    pub fn list_tools(&self) -> Vec<ToolDefinition> {
        self.tools.iter().map(|t| t.definition.clone()).collect()
    }

    /// Get a tool by name
    pub fn get(&self, name: &str) -> Option<&Tool> {
        self.tools.iter().find(|t| t.definition.name == name)
    }

    /// Dispatch a call to its handler without normalizing the outcome
    pub async fn route(
        &self,
        name: &str,
        args: Value,
        cancel: &CancellationToken,
    ) -> Result<ToolOutput, ToolError> {
        let tool = self
            .get(name)
            .ok_or_else(|| ToolError::NotFound(name.to_string()))?;
        let args = ToolArgs::from_value(args)?;

        tool.handler.execute(&args, cancel).await
    }

    /// Execute a tool by name. Every failure, panics included, comes back as
    /// an envelope with `is_error` set.
    pub async fn call(&self, name: &str, args: Value, cancel: &CancellationToken) -> ToolResult {
        let received_at = chrono::Utc::now().to_rfc3339();
        tracing::info!(tool = name, timestamp = %received_at, "Received request for tool");
        self.log.info(format!(
            "[{}] Received request for tool: {}",
            received_at, name
        ));

        let logged_args = summarize(&args);
        let outcome = AssertUnwindSafe(self.route(name, args, cancel))
            .catch_unwind()
            .await
            .unwrap_or_else(|panic| Err(ToolError::Internal(panic_message(panic.as_ref()))));

        if let Err(err) = &outcome {
            let failed_at = chrono::Utc::now().to_rfc3339();
            tracing::error!(
                tool = name,
                arguments = %logged_args,
                timestamp = %failed_at,
                error = %err,
                "Tool call failed"
            );
            self.log.error(json!({
                "message": format!("{}{}", FAILURE_PREFIX, err),
                "tool": name,
                "arguments": logged_args,
                "timestamp": failed_at,
            }));
        }

        ToolResult::from_outcome(outcome)
    }
}

/// Copy of the arguments with long strings (documents) elided, for logging
fn summarize(value: &Value) -> Value {
    match value {
        Value::String(s) if s.len() > MAX_LOGGED_STRING => {
            Value::String(format!("<{} bytes>", s.len()))
        }
        Value::Array(items) => Value::Array(items.iter().map(summarize).collect()),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), summarize(v)))
                .collect(),
        ),
        other => other.clone(),
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "handler panicked".to_string()
    }
}
