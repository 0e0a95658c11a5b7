//! JSON-RPC dispatch for the MCP methods this server answers.
//!
//! Both transports hand every incoming message to [`McpProtocol`]. A request
//! is registered under its id with a child of the shutdown token before it
//! runs, so a `notifications/cancelled` for that id stops the tool call at
//! its next await point. Tool results go out as `CallToolResult` with the
//! envelope's content and error flag unchanged.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use pmcp::types::{
    CallToolRequest, CallToolResult, CancelledNotification, Implementation, InitializeResult,
    JSONRPCError, JSONRPCNotification, ListToolsResult, LoggingCapabilities, LoggingLevel,
    ProtocolVersion, RequestId, ServerCapabilities, ToolCapabilities, ToolInfo,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;

use super::client_log::{severity, LogEvent};
use super::tools::ToolRegistry;

/// Name the server reports to MCP clients
pub const SERVER_NAME: &str = "vectorize-mcp";

pub const PARSE_ERROR: i32 = -32700;
pub const METHOD_NOT_FOUND: i32 = -32601;
pub const INVALID_PARAMS: i32 = -32602;
pub const INTERNAL_ERROR: i32 = -32603;

type InFlight = Arc<Mutex<HashMap<RequestId, CancellationToken>>>;

/// An incoming request (with `id`) or notification (without)
#[derive(Debug, Clone, Deserialize)]
pub struct JsonRpcMessage {
    #[serde(default)]
    pub id: Option<RequestId>,
    pub method: String,
    #[serde(default)]
    pub params: Value,
}

/// A JSON-RPC response; `id` is `null` only for unparseable messages
#[derive(Debug, Clone, Serialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: &'static str,
    pub id: Option<RequestId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JSONRPCError>,
}

impl JsonRpcResponse {
    pub fn success(id: RequestId, result: Value) -> Self {
        Self {
            jsonrpc: "2.0",
            id: Some(id),
            result: Some(result),
            error: None,
        }
    }

    pub fn failure(id: Option<RequestId>, error: JSONRPCError) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            result: None,
            error: Some(error),
        }
    }
}

/// A request registered as in flight; unregisters itself when dropped
#[derive(Debug)]
pub struct PendingRequest {
    id: RequestId,
    cancel: CancellationToken,
    in_flight: InFlight,
}

impl PendingRequest {
    pub fn id(&self) -> &RequestId {
        &self.id
    }

    /// Token the request runs under
    pub fn token(&self) -> &CancellationToken {
        &self.cancel
    }
}

impl Drop for PendingRequest {
    fn drop(&mut self) {
        lock(&self.in_flight).remove(&self.id);
    }
}

fn lock(in_flight: &InFlight) -> MutexGuard<'_, HashMap<RequestId, CancellationToken>> {
    in_flight
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[derive(Debug, Deserialize)]
struct SetLevelParams {
    level: String,
}

/// Severity for an MCP log level name, mapped onto the levels pmcp models
fn level_severity(name: &str) -> Option<u8> {
    let level = match name {
        "debug" => LoggingLevel::Debug,
        "info" | "notice" => LoggingLevel::Info,
        "warning" => LoggingLevel::Warning,
        "error" => LoggingLevel::Error,
        "critical" | "alert" | "emergency" => LoggingLevel::Critical,
        _ => return None,
    };
    Some(severity(level))
}

fn to_json<T: Serialize>(value: &T) -> Result<Value, JSONRPCError> {
    serde_json::to_value(value).map_err(|e| {
        JSONRPCError::new(INTERNAL_ERROR, format!("Serialization error: {}", e))
    })
}

/// Answers `initialize`, `ping`, `tools/list`, `tools/call` and
/// `logging/setLevel`, and handles `notifications/cancelled`
#[derive(Debug)]
pub struct McpProtocol {
    registry: Arc<ToolRegistry>,
    shutdown: CancellationToken,
    in_flight: InFlight,
    min_severity: AtomicU8,
}

impl McpProtocol {
    pub fn new(registry: Arc<ToolRegistry>, shutdown: CancellationToken) -> Self {
        Self {
            registry,
            shutdown,
            in_flight: Arc::default(),
            min_severity: AtomicU8::new(severity(LoggingLevel::Info)),
        }
    }

    pub fn registry(&self) -> &Arc<ToolRegistry> {
        &self.registry
    }

    /// Capabilities advertised in the `initialize` result
    pub fn capabilities() -> ServerCapabilities {
        ServerCapabilities {
            tools: Some(ToolCapabilities {
                list_changed: Some(false),
            }),
            logging: Some(LoggingCapabilities::default()),
            ..Default::default()
        }
    }

    /// Parse one raw message, or build the parse error response for it
    pub fn parse(raw: &str) -> Result<JsonRpcMessage, JsonRpcResponse> {
        serde_json::from_str(raw).map_err(|e| {
            JsonRpcResponse::failure(None, JSONRPCError::new(PARSE_ERROR, e.to_string()))
        })
    }

    /// Handle a message; notifications produce no response
    pub async fn handle(&self, message: JsonRpcMessage) -> Option<JsonRpcResponse> {
        match message.id.clone() {
            None => {
                self.handle_notification(&message);
                None
            }
            Some(id) => {
                let pending = self.begin(id);
                Some(self.respond(message, pending).await)
            }
        }
    }

    /// Register a request as in flight before it is handed to a task
    pub fn begin(&self, id: RequestId) -> PendingRequest {
        let cancel = self.shutdown.child_token();
        lock(&self.in_flight).insert(id.clone(), cancel.clone());

        PendingRequest {
            id,
            cancel,
            in_flight: self.in_flight.clone(),
        }
    }

    /// Number of requests currently running
    pub fn in_flight(&self) -> usize {
        lock(&self.in_flight).len()
    }

    /// Answer a registered request
    pub async fn respond(
        &self,
        message: JsonRpcMessage,
        pending: PendingRequest,
    ) -> JsonRpcResponse {
        let outcome = match message.method.as_str() {
            "initialize" => self.initialize(&message.params),
            "ping" => Ok(json!({})),
            "tools/list" => self.list_tools(),
            "tools/call" => self.call_tool(message.params, pending.token()).await,
            "logging/setLevel" => self.set_level(message.params),
            other => Err(JSONRPCError::new(
                METHOD_NOT_FOUND,
                format!("Method not found: {}", other),
            )),
        };

        match outcome {
            Ok(result) => JsonRpcResponse::success(pending.id().clone(), result),
            Err(error) => JsonRpcResponse::failure(Some(pending.id().clone()), error),
        }
    }

    pub fn handle_notification(&self, message: &JsonRpcMessage) {
        match message.method.as_str() {
            "notifications/cancelled" => {
                match serde_json::from_value::<CancelledNotification>(message.params.clone()) {
                    Ok(cancelled) => {
                        if !self.cancel(&cancelled.request_id) {
                            tracing::debug!(
                                request_id = %cancelled.request_id,
                                "Cancellation for a request that is not running"
                            );
                        }
                    }
                    Err(e) => tracing::warn!("Ignoring malformed cancellation: {}", e),
                }
            }
            "notifications/initialized" => tracing::debug!("Client initialized"),
            other => tracing::debug!(method = other, "Ignoring notification"),
        }
    }

    /// Cancel the request with this id; false if it is not running
    pub fn cancel(&self, id: &RequestId) -> bool {
        match lock(&self.in_flight).get(id) {
            Some(token) => {
                tracing::info!(request_id = %id, "Client cancelled request");
                token.cancel();
                true
            }
            None => false,
        }
    }

    /// Wrap a client log event as a notification, unless the client's log
    /// level filters it out
    pub fn log_notification(
        &self,
        event: &LogEvent,
    ) -> Option<JSONRPCNotification<LogEvent>> {
        if severity(event.level) < self.min_severity.load(Ordering::Relaxed) {
            return None;
        }
        Some(JSONRPCNotification::new(
            "notifications/message",
            Some(event.clone()),
        ))
    }

    fn initialize(&self, params: &Value) -> Result<Value, JSONRPCError> {
        let requested = params
            .get("protocolVersion")
            .and_then(Value::as_str)
            .unwrap_or(pmcp::LATEST_PROTOCOL_VERSION);

        let settings = self.registry.settings();
        tracing::info!(
            org_id = %settings.org_id,
            pipeline_id = ?settings.default_pipeline_id,
            "Client connected"
        );

        to_json(&InitializeResult {
            protocol_version: ProtocolVersion(pmcp::negotiate_protocol_version(requested)),
            capabilities: Self::capabilities(),
            server_info: Implementation {
                name: SERVER_NAME.to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
            instructions: None,
        })
    }

    fn list_tools(&self) -> Result<Value, JSONRPCError> {
        let tools = self
            .registry
            .list_tools()
            .into_iter()
            .map(|tool| ToolInfo::new(tool.name, Some(tool.description), tool.input_schema))
            .collect();

        to_json(&ListToolsResult::new(tools))
    }

    async fn call_tool(
        &self,
        params: Value,
        cancel: &CancellationToken,
    ) -> Result<Value, JSONRPCError> {
        let request: CallToolRequest = serde_json::from_value(params).map_err(|e| {
            JSONRPCError::new(INVALID_PARAMS, format!("Invalid tools/call params: {}", e))
        })?;

        let result = self
            .registry
            .call(&request.name, request.arguments, cancel)
            .await;

        to_json(&CallToolResult::from(result))
    }

    fn set_level(&self, params: Value) -> Result<Value, JSONRPCError> {
        let params: SetLevelParams = serde_json::from_value(params).map_err(|e| {
            JSONRPCError::new(INVALID_PARAMS, format!("Invalid logging/setLevel params: {}", e))
        })?;
        let min = level_severity(&params.level).ok_or_else(|| {
            JSONRPCError::new(INVALID_PARAMS, format!("Unknown log level: {}", params.level))
        })?;

        self.min_severity.store(min, Ordering::Relaxed);
        Ok(json!({}))
    }
}
