//! Static catalog of the tools exposed by the server.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Name of the retrieval tool
pub const RETRIEVE: &str = "retrieve";
/// Name of the extraction tool
pub const EXTRACT: &str = "extract";
/// Name of the deep research tool
pub const DEEP_RESEARCH: &str = "deep-research";

/// Number of documents retrieved when `k` is not given
pub const DEFAULT_K: u32 = 4;

/// Name, description and input schema of a tool, as advertised to clients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
}

impl ToolDefinition {
    /// Fields listed as required by the input schema
    pub fn required_fields(&self) -> Vec<&str> {
        self.input_schema
            .get("required")
            .and_then(Value::as_array)
            .map(|fields| fields.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default()
    }
}

/// Required field list, with `pipelineId` first when no default pipeline exists
fn required(fields: &[&str], needs_pipeline: bool) -> Vec<String> {
    let pipeline = needs_pipeline.then_some("pipelineId");
    pipeline
        .into_iter()
        .chain(fields.iter().copied())
        .map(str::to_string)
        .collect()
}

/// Build the tool catalog in its fixed order: retrieve, extract, deep-research.
///
/// `has_default_pipeline` decides whether `pipelineId` is required by the
/// pipeline-bound tools.
pub fn catalog(has_default_pipeline: bool) -> Vec<ToolDefinition> {
    let needs_pipeline = !has_default_pipeline;

    vec![
        ToolDefinition {
            name: RETRIEVE.to_string(),
            description: "Retrieve documents from a Vectorize pipeline.".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "pipelineId": {
                        "type": "string",
                        "description": "The ID of the pipeline to retrieve documents from."
                    },
                    "question": {
                        "type": "string",
                        "description": "The term to search for."
                    },
                    "k": {
                        "type": "number",
                        "description": "The number of documents to retrieve.",
                        "default": DEFAULT_K
                    }
                },
                "required": required(&["question"], needs_pipeline)
            }),
        },
        ToolDefinition {
            name: EXTRACT.to_string(),
            description: "Perform text extraction and chunking on a document.".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "base64Document": {
                        "type": "string",
                        "description": "Document encoded in base64."
                    },
                    "contentType": {
                        "type": "string",
                        "description": "Document content type."
                    }
                },
                "required": ["base64Document", "contentType"]
            }),
        },
        ToolDefinition {
            name: DEEP_RESEARCH.to_string(),
            description: "Generate a deep research report on a Vectorize pipeline.".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "pipelineId": {
                        "type": "string",
                        "description": "The ID of the pipeline to perform deep research with."
                    },
                    "query": {
                        "type": "string",
                        "description": "The deep research query."
                    },
                    "webSearch": {
                        "type": "boolean",
                        "description": "Whether to perform a web search."
                    }
                },
                "required": required(&["query", "webSearch"], needs_pipeline)
            }),
        },
    ]
}
