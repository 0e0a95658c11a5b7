//! Log events for the MCP client.
//!
//! Tool calls report progress through a [`ClientLog`]. The stdio transport
//! subscribes to it and forwards every event the client asked for as a
//! `notifications/message` notification.

use pmcp::LoggingLevel;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::broadcast;

/// Logger name attached to every event
pub const LOGGER: &str = "vectorize-mcp";

/// Events buffered per subscriber before the oldest are dropped
const CAPACITY: usize = 64;

/// Parameters of one `notifications/message` notification
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogEvent {
    pub level: LoggingLevel,
    pub logger: String,
    pub data: Value,
}

/// Broadcast channel of client log events
#[derive(Debug, Clone)]
pub struct ClientLog {
    sender: broadcast::Sender<LogEvent>,
}

impl Default for ClientLog {
    fn default() -> Self {
        Self::new()
    }
}

impl ClientLog {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CAPACITY);
        Self { sender }
    }

    /// Receive every event sent from now on
    pub fn subscribe(&self) -> broadcast::Receiver<LogEvent> {
        self.sender.subscribe()
    }

    pub fn info(&self, data: impl Into<Value>) {
        self.emit(LoggingLevel::Info, data.into());
    }

    pub fn error(&self, data: impl Into<Value>) {
        self.emit(LoggingLevel::Error, data.into());
    }

    fn emit(&self, level: LoggingLevel, data: Value) {
        // Without subscribers the event is dropped
        let _ = self.sender.send(LogEvent {
            level,
            logger: LOGGER.to_string(),
            data,
        });
    }
}

/// Numeric severity, higher is more severe
pub fn severity(level: LoggingLevel) -> u8 {
    match level {
        LoggingLevel::Debug => 0,
        LoggingLevel::Info => 1,
        LoggingLevel::Warning => 2,
        LoggingLevel::Error => 3,
        LoggingLevel::Critical => 4,
    }
}
