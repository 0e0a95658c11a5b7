//! Client for the Vectorize REST API.
//!
//! The tool handlers only talk to the API through the [`VectorizeApi`] trait.
//! [`VectorizeClient`] is the `reqwest` implementation used by the server;
//! [`MockApi`] is a scripted in-memory implementation for tests.
//!
//! | Operation | Endpoint |
//! |-----------|----------|
//! | `retrieve_documents` | `POST /org/{org}/pipelines/{pipeline}/retrieval` |
//! | `start_file_upload` | `POST /org/{org}/files` |
//! | `upload_file` | `PUT {uploadUrl}` (pre-signed, no auth header) |
//! | `start_extraction` | `POST /org/{org}/extraction` |
//! | `get_extraction_result` | `GET /org/{org}/extraction/{extractionId}` |
//! | `start_deep_research` | `POST /org/{org}/pipelines/{pipeline}/deep-research` |
//! | `get_deep_research_result` | `GET /org/{org}/pipelines/{pipeline}/deep-research/{researchId}` |

pub mod mock;
mod vectorize;

pub use mock::{ApiCall, MockApi};
pub use vectorize::{VectorizeClient, DEFAULT_API_URL};

use async_trait::async_trait;

use crate::models::{
    DeepResearchResultResponse, ExtractionResultResponse, RetrieveDocumentsRequest,
    RetrieveDocumentsResponse, StartDeepResearchRequest, StartDeepResearchResponse,
    StartExtractionRequest, StartExtractionResponse, StartFileUploadRequest,
    StartFileUploadResponse,
};

/// Operations the tool handlers need from the Vectorize API.
#[async_trait]
pub trait VectorizeApi: Send + Sync + std::fmt::Debug {
    /// Retrieve the documents of a pipeline most relevant to a question
    async fn retrieve_documents(
        &self,
        org_id: &str,
        pipeline_id: &str,
        request: &RetrieveDocumentsRequest,
    ) -> Result<RetrieveDocumentsResponse, ApiError>;

    /// Register a new file and get a pre-signed upload URL for it
    async fn start_file_upload(
        &self,
        org_id: &str,
        request: &StartFileUploadRequest,
    ) -> Result<StartFileUploadResponse, ApiError>;

    /// PUT raw file bytes to a pre-signed upload URL
    async fn upload_file(
        &self,
        upload_url: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<(), ApiError>;

    /// Start text extraction and chunking of an uploaded file
    async fn start_extraction(
        &self,
        org_id: &str,
        request: &StartExtractionRequest,
    ) -> Result<StartExtractionResponse, ApiError>;

    /// Poll an extraction job
    async fn get_extraction_result(
        &self,
        org_id: &str,
        extraction_id: &str,
    ) -> Result<ExtractionResultResponse, ApiError>;

    /// Start a deep research job on a pipeline
    async fn start_deep_research(
        &self,
        org_id: &str,
        pipeline_id: &str,
        request: &StartDeepResearchRequest,
    ) -> Result<StartDeepResearchResponse, ApiError>;

    /// Poll a deep research job
    async fn get_deep_research_result(
        &self,
        org_id: &str,
        pipeline_id: &str,
        research_id: &str,
    ) -> Result<DeepResearchResultResponse, ApiError>;
}

/// Errors returned by the Vectorize API client
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Connection, TLS or timeout failure
    #[error("Network error: {0}")]
    Network(String),

    /// The API answered with a non-success status
    #[error("Server request failed with {status}: {body}")]
    Http { status: u16, body: String },

    /// The response body did not match the expected shape
    #[error("Parse error: {0}")]
    Parse(String),

    /// The pre-signed upload PUT was rejected
    #[error("Failed to upload file: {status} {reason}")]
    Upload { status: u16, reason: String },

    /// A base or upload URL could not be parsed
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

impl ApiError {
    /// HTTP status carried by the error, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Http { status, .. } | ApiError::Upload { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        ApiError::Network(err.to_string())
    }
}
