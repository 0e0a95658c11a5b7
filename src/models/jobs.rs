//! Models for the asynchronous jobs (file upload, extraction, deep research).

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Kind of asynchronous job running on the Vectorize API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobKind {
    Extraction,
    DeepResearch,
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobKind::Extraction => write!(f, "Extraction"),
            JobKind::DeepResearch => write!(f, "Deep research"),
        }
    }
}

/// Handle to a started job, valid for the duration of one tool call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobHandle {
    pub id: String,
    pub kind: JobKind,
}

impl JobHandle {
    pub fn new(id: impl Into<String>, kind: JobKind) -> Self {
        Self {
            id: id.into(),
            kind,
        }
    }
}

/// Outcome of a single status poll
#[derive(Debug, Clone, PartialEq)]
pub enum JobStatus<T> {
    /// The job is still running
    Pending,
    /// The job finished and produced a payload
    Succeeded(T),
    /// The job finished with an error reported by the API
    Failed(String),
}

impl<T> JobStatus<T> {
    /// Whether the job reached a terminal state
    pub fn is_ready(&self) -> bool {
        !matches!(self, JobStatus::Pending)
    }
}

const UNKNOWN_JOB_ERROR: &str = "unknown error";

/// Request to start a file upload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartFileUploadRequest {
    pub name: String,
    pub content_type: String,
}

/// Response of a file upload start: where to PUT the bytes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartFileUploadResponse {
    pub file_id: String,
    pub upload_url: String,
}

/// Request to start text extraction on an uploaded file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartExtractionRequest {
    pub file_id: String,
    pub chunk_size: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartExtractionResponse {
    pub extraction_id: String,
}

/// Extraction payload once the job is ready
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionResult {
    pub success: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chunks: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Metadata and any other fields the API adds
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Status poll response for an extraction job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionResultResponse {
    pub ready: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<ExtractionResult>,
}

impl ExtractionResultResponse {
    /// A response for a job that is still running
    pub fn pending() -> Self {
        Self {
            ready: false,
            data: None,
        }
    }

    pub fn into_status(self) -> JobStatus<ExtractionResult> {
        if !self.ready {
            return JobStatus::Pending;
        }
        match self.data {
            Some(data) if data.success => JobStatus::Succeeded(data),
            Some(data) => {
                JobStatus::Failed(data.error.unwrap_or_else(|| UNKNOWN_JOB_ERROR.to_string()))
            }
            None => JobStatus::Failed(UNKNOWN_JOB_ERROR.to_string()),
        }
    }
}

/// Request to start a deep research job on a pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartDeepResearchRequest {
    pub query: String,
    pub web_search: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartDeepResearchResponse {
    pub research_id: String,
}

/// Deep research payload once the job is ready
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeepResearchResult {
    pub success: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub markdown: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Status poll response for a deep research job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeepResearchResultResponse {
    pub ready: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<DeepResearchResult>,
}

impl DeepResearchResultResponse {
    pub fn pending() -> Self {
        Self {
            ready: false,
            data: None,
        }
    }

    /// A finished, successful research job
    pub fn completed(markdown: impl Into<String>) -> Self {
        Self {
            ready: true,
            data: Some(DeepResearchResult {
                success: true,
                markdown: Some(markdown.into()),
                error: None,
            }),
        }
    }

    /// A finished, failed research job
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            ready: true,
            data: Some(DeepResearchResult {
                success: false,
                markdown: None,
                error: Some(error.into()),
            }),
        }
    }

    /// Successful results carry the report markdown (empty if the API omitted it)
    pub fn into_status(self) -> JobStatus<String> {
        if !self.ready {
            return JobStatus::Pending;
        }
        match self.data {
            Some(data) if data.success => JobStatus::Succeeded(data.markdown.unwrap_or_default()),
            Some(data) => {
                JobStatus::Failed(data.error.unwrap_or_else(|| UNKNOWN_JOB_ERROR.to_string()))
            }
            None => JobStatus::Failed(UNKNOWN_JOB_ERROR.to_string()),
        }
    }
}
