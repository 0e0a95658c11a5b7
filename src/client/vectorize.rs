//! `reqwest` implementation of [`VectorizeApi`].

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::RequestBuilder;
use serde::de::DeserializeOwned;
use url::Url;

use super::{ApiError, VectorizeApi};
use crate::models::{
    DeepResearchResultResponse, ExtractionResultResponse, RetrieveDocumentsRequest,
    RetrieveDocumentsResponse, StartDeepResearchRequest, StartDeepResearchResponse,
    StartExtractionRequest, StartExtractionResponse, StartFileUploadRequest,
    StartFileUploadResponse,
};
use crate::utils::HttpClient;

/// Public Vectorize API endpoint
pub const DEFAULT_API_URL: &str = "https://api.vectorize.io/v1";

/// Vectorize API client authenticated with an access token
#[derive(Clone)]
pub struct VectorizeClient {
    http: HttpClient,
    base_url: String,
    token: String,
}

impl std::fmt::Debug for VectorizeClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VectorizeClient")
            .field("base_url", &self.base_url)
            .field("token", &"<redacted>")
            .finish()
    }
}

impl VectorizeClient {
    /// Create a client for the API at `base_url`
    pub fn new(base_url: &str, token: impl Into<String>, timeout: Duration) -> Result<Self, ApiError> {
        let http = HttpClient::new(timeout)?;
        Self::with_http(http, base_url, token)
    }

    /// Create a client reusing an existing HTTP client
    pub fn with_http(http: HttpClient, base_url: &str, token: impl Into<String>) -> Result<Self, ApiError> {
        let parsed = Url::parse(base_url)
            .map_err(|e| ApiError::InvalidUrl(format!("{}: {}", base_url, e)))?;
        if parsed.cannot_be_a_base() {
            return Err(ApiError::InvalidUrl(base_url.to_string()));
        }

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.into(),
        })
    }

    /// Base URL without trailing slash
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Build an endpoint URL from path segments, percent-encoding each one
    fn endpoint(&self, segments: &[&str]) -> String {
        let mut url = self.base_url.clone();
        for segment in segments {
            url.push('/');
            url.push_str(&urlencoding::encode(segment));
        }
        url
    }

    /// Send an authenticated request and decode the JSON response
    async fn send_json<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T, ApiError> {
        let response = builder.bearer_auth(&self.token).send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(ApiError::Http {
                status: status.as_u16(),
                body,
            });
        }

        serde_json::from_str(&body)
            .map_err(|e| ApiError::Parse(format!("Failed to parse response: {}", e)))
    }
}

#[async_trait]
impl VectorizeApi for VectorizeClient {
    async fn retrieve_documents(
        &self,
        org_id: &str,
        pipeline_id: &str,
        request: &RetrieveDocumentsRequest,
    ) -> Result<RetrieveDocumentsResponse, ApiError> {
        let url = self.endpoint(&["org", org_id, "pipelines", pipeline_id, "retrieval"]);
        tracing::debug!(%url, num_results = request.num_results, "Retrieving documents");

        self.send_json(self.http.client().post(&url).json(request)).await
    }

    async fn start_file_upload(
        &self,
        org_id: &str,
        request: &StartFileUploadRequest,
    ) -> Result<StartFileUploadResponse, ApiError> {
        let url = self.endpoint(&["org", org_id, "files"]);
        tracing::debug!(%url, content_type = %request.content_type, "Starting file upload");

        self.send_json(self.http.client().post(&url).json(request)).await
    }

    async fn upload_file(
        &self,
        upload_url: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<(), ApiError> {
        // Pre-signed URL: carries its own credentials
        let url = Url::parse(upload_url)
            .map_err(|e| ApiError::InvalidUrl(format!("{}: {}", upload_url, e)))?;
        tracing::debug!(size = bytes.len(), "Uploading file");

        let response = self
            .http
            .client()
            .put(url)
            .header(CONTENT_TYPE, content_type)
            .body(bytes)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::Upload {
                status: status.as_u16(),
                reason: status.canonical_reason().unwrap_or("Unknown").to_string(),
            });
        }
        Ok(())
    }

    async fn start_extraction(
        &self,
        org_id: &str,
        request: &StartExtractionRequest,
    ) -> Result<StartExtractionResponse, ApiError> {
        let url = self.endpoint(&["org", org_id, "extraction"]);
        tracing::debug!(%url, file_id = %request.file_id, "Starting extraction");

        self.send_json(self.http.client().post(&url).json(request)).await
    }

    async fn get_extraction_result(
        &self,
        org_id: &str,
        extraction_id: &str,
    ) -> Result<ExtractionResultResponse, ApiError> {
        let url = self.endpoint(&["org", org_id, "extraction", extraction_id]);
        self.send_json(self.http.client().get(&url)).await
    }

    async fn start_deep_research(
        &self,
        org_id: &str,
        pipeline_id: &str,
        request: &StartDeepResearchRequest,
    ) -> Result<StartDeepResearchResponse, ApiError> {
        let url = self.endpoint(&["org", org_id, "pipelines", pipeline_id, "deep-research"]);
        tracing::debug!(%url, web_search = request.web_search, "Starting deep research");

        self.send_json(self.http.client().post(&url).json(request)).await
    }

    async fn get_deep_research_result(
        &self,
        org_id: &str,
        pipeline_id: &str,
        research_id: &str,
    ) -> Result<DeepResearchResultResponse, ApiError> {
        let url = self.endpoint(&[
            "org",
            org_id,
            "pipelines",
            pipeline_id,
            "deep-research",
            research_id,
        ]);
        self.send_json(self.http.client().get(&url)).await
    }
}
