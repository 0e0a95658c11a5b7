//! Uniform result envelope for tool calls.
//!
//! Every call ends as a [`ToolResult`]: a list of text blocks plus an error
//! flag. [`ToolResult::from_outcome`] is the single place where handler
//! failures become envelopes.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::client::ApiError;
use crate::models::JobKind;
use crate::utils::PollError;

/// Prefix of every failure message
pub const FAILURE_PREFIX: &str = "Request failed: ";

/// Errors a tool call can end with
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    /// No tool with this name exists
    #[error("Tool not found: {0}")]
    NotFound(String),

    /// Arguments are missing or have the wrong type
    #[error("Invalid arguments: {0}")]
    Validation(String),

    /// The Vectorize API call failed
    #[error(transparent)]
    Api(#[from] ApiError),

    /// The remote job finished with an error
    #[error("{kind} failed: {message}")]
    JobFailed { kind: JobKind, message: String },

    /// The remote job did not finish in time
    #[error("{kind} did not finish after {attempts} polls")]
    Timeout { kind: JobKind, attempts: u32 },

    /// The call was cancelled while waiting for the job
    #[error("{kind} was cancelled")]
    Cancelled { kind: JobKind },

    /// The call was cancelled before a single-request operation answered
    #[error("{0} was cancelled")]
    Aborted(&'static str),

    /// The payload could not be serialized
    #[error("Failed to serialize result: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A handler panicked
    #[error("internal error: {0}")]
    Internal(String),
}

impl ToolError {
    /// Build a validation error
    pub fn invalid(message: impl Into<String>) -> Self {
        ToolError::Validation(message.into())
    }

    /// Map the end of a polling loop for a job of the given kind
    pub fn from_poll(kind: JobKind, err: PollError<ApiError>) -> Self {
        match err {
            PollError::Source(e) => ToolError::Api(e),
            PollError::JobFailed(message) => ToolError::JobFailed { kind, message },
            PollError::Timeout { attempts } => ToolError::Timeout { kind, attempts },
            PollError::Cancelled => ToolError::Cancelled { kind },
        }
    }
}

/// Successful payload of a handler. The tools do not share a payload shape,
/// only the envelope.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolOutput {
    /// Structured result, rendered as compact JSON
    Json(Value),
    /// Text result, passed through unchanged
    Markdown(String),
}

impl ToolOutput {
    /// Render the payload as the text of a content block
    pub fn into_text(self) -> String {
        match self {
            ToolOutput::Json(value) => value.to_string(),
            ToolOutput::Markdown(text) => text,
        }
    }
}

/// A content block of a tool result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Content {
    Text { text: String },
}

/// The envelope returned for every tool call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolResult {
    pub content: Vec<Content>,
    pub is_error: bool,
}

impl ToolResult {
    /// A successful result holding one text block
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![Content::Text { text: text.into() }],
            is_error: false,
        }
    }

    /// A failed result holding one `Request failed: ...` text block
    pub fn error(details: impl std::fmt::Display) -> Self {
        Self {
            content: vec![Content::Text {
                text: format!("{}{}", FAILURE_PREFIX, details),
            }],
            is_error: true,
        }
    }

    /// Convert a handler outcome into an envelope. Never fails.
    pub fn from_outcome(outcome: Result<ToolOutput, ToolError>) -> Self {
        match outcome {
            Ok(output) => Self::text(output.into_text()),
            Err(err) => Self::error(err),
        }
    }

    /// Text of the first content block
    pub fn first_text(&self) -> Option<&str> {
        self.content.first().map(|block| match block {
            Content::Text { text } => text.as_str(),
        })
    }
}

impl From<ToolResult> for pmcp::CallToolResult {
    fn from(result: ToolResult) -> Self {
        let content = result
            .content
            .into_iter()
            .map(|block| match block {
                Content::Text { text } => pmcp::Content::Text { text },
            })
            .collect();

        if result.is_error {
            pmcp::CallToolResult::error(content)
        } else {
            pmcp::CallToolResult::new(content)
        }
    }
}
