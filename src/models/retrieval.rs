//! Retrieval request and response models.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Body of a pipeline retrieval request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetrieveDocumentsRequest {
    /// Question to search the pipeline for
    pub question: String,

    /// Number of documents to return
    pub num_results: u32,
}

impl RetrieveDocumentsRequest {
    /// Create a new retrieval request
    pub fn new(question: impl Into<String>, num_results: u32) -> Self {
        Self {
            question: question.into(),
            num_results,
        }
    }
}

/// A single retrieved document
///
/// Only the commonly used fields are typed; everything else the API returns
/// is kept in `extra` so the payload handed back to the caller is complete.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    /// Document identifier
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Chunk text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,

    /// Similarity score reported by the pipeline
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub similarity: Option<f64>,

    /// Relevancy score after reranking
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relevancy: Option<f64>,

    /// Remaining document fields (source, metadata, ...)
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Response of a pipeline retrieval request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetrieveDocumentsResponse {
    /// Question echoed back by the API
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub question: Option<String>,

    /// Retrieved documents
    #[serde(default, alias = "results")]
    pub documents: Vec<Document>,

    /// Average relevancy across the returned documents
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub average_relevancy: Option<f64>,

    /// Normalized discounted cumulative gain
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ndcg: Option<f64>,

    /// Top-level fields not modelled above
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}
