//! Handlers for the retrieve, extract and deep-research tools.

use std::sync::Arc;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use tokio_util::sync::CancellationToken;

use super::args::ToolArgs;
use super::catalog::DEFAULT_K;
use super::client_log::ClientLog;
use super::result::{ToolError, ToolOutput};
use super::tools::ToolHandler;
use crate::client::{ApiError, VectorizeApi};
use crate::config::Config;
use crate::models::{
    JobHandle, JobKind, RetrieveDocumentsRequest, StartDeepResearchRequest,
    StartExtractionRequest, StartFileUploadRequest,
};
use crate::utils::{poll_until_ready, PollConfig};

/// Settings shared by all handlers, fixed at startup
#[derive(Debug, Clone, PartialEq)]
pub struct ToolSettings {
    /// Organization every request is made for
    pub org_id: String,
    /// Pipeline used when a call does not name one
    pub default_pipeline_id: Option<String>,
    /// Polling behaviour for extraction and deep research jobs
    pub poll: PollConfig,
    /// Chunk size requested for extractions
    pub chunk_size: u32,
    /// Name given to uploaded files
    pub upload_file_name: String,
}

impl ToolSettings {
    /// Settings with defaults for everything but the organization
    pub fn new(org_id: impl Into<String>) -> Self {
        Self {
            org_id: org_id.into(),
            default_pipeline_id: None,
            poll: PollConfig::default(),
            chunk_size: 512,
            upload_file_name: "My File".to_string(),
        }
    }

    /// Take handler settings from a validated configuration
    pub fn from_config(config: &Config) -> Self {
        Self {
            org_id: config.org_id.clone(),
            default_pipeline_id: config.default_pipeline_id().map(str::to_string),
            poll: config.poll_config(),
            chunk_size: config.chunk_size,
            upload_file_name: config.upload_file_name.clone(),
        }
    }

    /// Set the default pipeline id
    pub fn default_pipeline(mut self, pipeline_id: impl Into<String>) -> Self {
        self.default_pipeline_id = Some(pipeline_id.into());
        self
    }

    /// Set the polling behaviour
    pub fn poll(mut self, poll: PollConfig) -> Self {
        self.poll = poll;
        self
    }

    /// Pipeline for a call: the `pipelineId` argument, else the default
    pub fn resolve_pipeline(&self, args: &ToolArgs) -> Result<String, ToolError> {
        if let Some(pipeline_id) = args.optional_str("pipelineId")? {
            return Ok(pipeline_id.to_string());
        }

        self.default_pipeline_id
            .as_deref()
            .filter(|id| !id.trim().is_empty())
            .map(str::to_string)
            .ok_or_else(|| {
                ToolError::invalid(
                    "missing required argument 'pipelineId' (no default pipeline configured)",
                )
            })
    }
}

/// Decode a base64 document, ignoring embedded whitespace
fn decode_document(encoded: &str) -> Result<Vec<u8>, ToolError> {
    let compact: String = encoded.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    STANDARD
        .decode(compact)
        .map_err(|e| ToolError::invalid(format!("base64Document is not valid base64: {}", e)))
}

/// Handler for retrieving documents from a pipeline
#[derive(Debug)]
pub struct RetrieveHandler {
    pub api: Arc<dyn VectorizeApi>,
    pub settings: Arc<ToolSettings>,
}

#[async_trait::async_trait]
impl ToolHandler for RetrieveHandler {
    async fn execute(
        &self,
        args: &ToolArgs,
        cancel: &CancellationToken,
    ) -> Result<ToolOutput, ToolError> {
        let pipeline_id = self.settings.resolve_pipeline(args)?;
        let question = args.required_str("question")?;
        let k = args.positive_int_or("k", DEFAULT_K)?;

        let request = RetrieveDocumentsRequest::new(question, k);
        let response = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(ToolError::Aborted("retrieval")),
            response = self
                .api
                .retrieve_documents(&self.settings.org_id, &pipeline_id, &request) => response?,
        };

        tracing::debug!(
            pipeline = %pipeline_id,
            documents = response.documents.len(),
            "Retrieved documents"
        );

        Ok(ToolOutput::Json(serde_json::to_value(&response)?))
    }
}

/// Handler for text extraction and chunking of a document
#[derive(Debug)]
pub struct ExtractHandler {
    pub api: Arc<dyn VectorizeApi>,
    pub settings: Arc<ToolSettings>,
}

#[async_trait::async_trait]
impl ToolHandler for ExtractHandler {
    async fn execute(
        &self,
        args: &ToolArgs,
        cancel: &CancellationToken,
    ) -> Result<ToolOutput, ToolError> {
        let encoded = args.required_str("base64Document")?;
        let content_type = args.required_str("contentType")?;
        let bytes = decode_document(encoded)?;

        let api = self.api.as_ref();
        let settings = self.settings.as_ref();
        let org_id = settings.org_id.as_str();

        let result = poll_until_ready(
            &settings.poll,
            cancel,
            move || async move {
                let upload = api
                    .start_file_upload(
                        org_id,
                        &StartFileUploadRequest {
                            name: settings.upload_file_name.clone(),
                            content_type: content_type.to_string(),
                        },
                    )
                    .await?;

                api.upload_file(&upload.upload_url, content_type, bytes).await?;

                let started = api
                    .start_extraction(
                        org_id,
                        &StartExtractionRequest {
                            file_id: upload.file_id,
                            chunk_size: settings.chunk_size,
                        },
                    )
                    .await?;

                tracing::info!(extraction_id = %started.extraction_id, "Started extraction");
                Ok::<_, ApiError>(JobHandle::new(started.extraction_id, JobKind::Extraction))
            },
            move |handle: JobHandle| async move {
                api.get_extraction_result(org_id, &handle.id)
                    .await
                    .map(|response| response.into_status())
            },
        )
        .await
        .map_err(|e| ToolError::from_poll(JobKind::Extraction, e))?;

        Ok(ToolOutput::Json(serde_json::to_value(&result)?))
    }
}

/// Handler for deep research on a pipeline
#[derive(Debug)]
pub struct DeepResearchHandler {
    pub api: Arc<dyn VectorizeApi>,
    pub settings: Arc<ToolSettings>,
    pub log: ClientLog,
}

#[async_trait::async_trait]
impl ToolHandler for DeepResearchHandler {
    async fn execute(
        &self,
        args: &ToolArgs,
        cancel: &CancellationToken,
    ) -> Result<ToolOutput, ToolError> {
        let pipeline_id = self.settings.resolve_pipeline(args)?;
        let query = args.required_str("query")?;
        let web_search = args.required_bool("webSearch")?;

        let api = self.api.as_ref();
        let org_id = self.settings.org_id.as_str();
        let pipeline = pipeline_id.as_str();
        let log = &self.log;

        let markdown = poll_until_ready(
            &self.settings.poll,
            cancel,
            move || async move {
                let request = StartDeepResearchRequest {
                    query: query.to_string(),
                    web_search,
                };
                let started = api.start_deep_research(org_id, pipeline, &request).await?;

                tracing::info!(research_id = %started.research_id, "Started deep research");
                log.info(format!(
                    "[{}] Started deep research with ID: {}",
                    chrono::Utc::now().to_rfc3339(),
                    started.research_id
                ));
                Ok::<_, ApiError>(JobHandle::new(started.research_id, JobKind::DeepResearch))
            },
            move |handle: JobHandle| async move {
                api.get_deep_research_result(org_id, pipeline, &handle.id)
                    .await
                    .map(|response| response.into_status())
            },
        )
        .await
        .map_err(|e| ToolError::from_poll(JobKind::DeepResearch, e))?;

        Ok(ToolOutput::Markdown(markdown))
    }
}
