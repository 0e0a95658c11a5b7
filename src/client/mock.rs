//! Mock Vectorize API for testing purposes.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use crate::client::{ApiError, VectorizeApi};
use crate::models::{
    DeepResearchResultResponse, ExtractionResultResponse, RetrieveDocumentsRequest,
    RetrieveDocumentsResponse, StartDeepResearchRequest, StartDeepResearchResponse,
    StartExtractionRequest, StartExtractionResponse, StartFileUploadRequest,
    StartFileUploadResponse,
};

/// A call received by [`MockApi`], in the order it was made
#[derive(Debug, Clone, PartialEq)]
pub enum ApiCall {
    RetrieveDocuments {
        org_id: String,
        pipeline_id: String,
        request: RetrieveDocumentsRequest,
    },
    StartFileUpload {
        org_id: String,
        request: StartFileUploadRequest,
    },
    UploadFile {
        upload_url: String,
        content_type: String,
        bytes: Vec<u8>,
    },
    StartExtraction {
        org_id: String,
        request: StartExtractionRequest,
    },
    GetExtractionResult {
        org_id: String,
        extraction_id: String,
    },
    StartDeepResearch {
        org_id: String,
        pipeline_id: String,
        request: StartDeepResearchRequest,
    },
    GetDeepResearchResult {
        org_id: String,
        pipeline_id: String,
        research_id: String,
    },
}

#[derive(Debug, Default)]
struct MockState {
    calls: Vec<ApiCall>,
    retrieve_response: Option<RetrieveDocumentsResponse>,
    upload_status: Option<u16>,
    extraction_results: VecDeque<ExtractionResultResponse>,
    research_results: VecDeque<DeepResearchResultResponse>,
    failure: Option<(u16, String)>,
}

/// A scripted API that records every call.
///
/// Poll responses are queued; the last queued response is repeated once the
/// queue is down to one entry, and an empty queue reports a pending job.
#[derive(Debug, Default)]
pub struct MockApi {
    state: Mutex<MockState>,
}

impl MockApi {
    /// Create a new mock API where every job completes immediately with empty results.
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Set the response returned by `retrieve_documents`.
    pub fn set_retrieve_response(&self, response: RetrieveDocumentsResponse) {
        self.state().retrieve_response = Some(response);
    }

    /// Make the upload PUT fail with the given status.
    pub fn fail_upload(&self, status: u16) {
        self.state().upload_status = Some(status);
    }

    /// Make every JSON API call fail with the given status and body.
    pub fn fail_requests(&self, status: u16, body: impl Into<String>) {
        self.state().failure = Some((status, body.into()));
    }

    /// Queue a response for `get_extraction_result`.
    pub fn push_extraction_result(&self, response: ExtractionResultResponse) {
        self.state().extraction_results.push_back(response);
    }

    /// Queue a response for `get_deep_research_result`.
    pub fn push_research_result(&self, response: DeepResearchResultResponse) {
        self.state().research_results.push_back(response);
    }

    /// All calls received so far
    pub fn calls(&self) -> Vec<ApiCall> {
        self.state().calls.clone()
    }

    /// Number of calls matching a predicate
    pub fn count_calls(&self, predicate: impl Fn(&ApiCall) -> bool) -> usize {
        self.state().calls.iter().filter(|call| predicate(call)).count()
    }

    /// Record a call and return the scripted failure, if any
    fn record(&self, call: ApiCall) -> Result<(), ApiError> {
        let mut state = self.state();
        state.calls.push(call);
        match &state.failure {
            Some((status, body)) => Err(ApiError::Http {
                status: *status,
                body: body.clone(),
            }),
            None => Ok(()),
        }
    }
}

fn next_scripted<T: Clone>(queue: &mut VecDeque<T>) -> Option<T> {
    if queue.len() > 1 {
        queue.pop_front()
    } else {
        queue.front().cloned()
    }
}

#[async_trait]
impl VectorizeApi for MockApi {
    async fn retrieve_documents(
        &self,
        org_id: &str,
        pipeline_id: &str,
        request: &RetrieveDocumentsRequest,
    ) -> Result<RetrieveDocumentsResponse, ApiError> {
        self.record(ApiCall::RetrieveDocuments {
            org_id: org_id.to_string(),
            pipeline_id: pipeline_id.to_string(),
            request: request.clone(),
        })?;

        Ok(self
            .state()
            .retrieve_response
            .clone()
            .unwrap_or_else(|| RetrieveDocumentsResponse {
                question: Some(request.question.clone()),
                documents: Vec::new(),
                average_relevancy: None,
                ndcg: None,
                extra: Default::default(),
            }))
    }

    async fn start_file_upload(
        &self,
        org_id: &str,
        request: &StartFileUploadRequest,
    ) -> Result<StartFileUploadResponse, ApiError> {
        self.record(ApiCall::StartFileUpload {
            org_id: org_id.to_string(),
            request: request.clone(),
        })?;

        Ok(StartFileUploadResponse {
            file_id: "mock-file".to_string(),
            upload_url: "https://uploads.example.com/mock-file".to_string(),
        })
    }

    async fn upload_file(
        &self,
        upload_url: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<(), ApiError> {
        let mut state = self.state();
        state.calls.push(ApiCall::UploadFile {
            upload_url: upload_url.to_string(),
            content_type: content_type.to_string(),
            bytes,
        });

        match state.upload_status {
            Some(status) => Err(ApiError::Upload {
                status,
                reason: reqwest::StatusCode::from_u16(status)
                    .ok()
                    .and_then(|s| s.canonical_reason())
                    .unwrap_or("Unknown")
                    .to_string(),
            }),
            None => Ok(()),
        }
    }

    async fn start_extraction(
        &self,
        org_id: &str,
        request: &StartExtractionRequest,
    ) -> Result<StartExtractionResponse, ApiError> {
        self.record(ApiCall::StartExtraction {
            org_id: org_id.to_string(),
            request: request.clone(),
        })?;

        Ok(StartExtractionResponse {
            extraction_id: "mock-extraction".to_string(),
        })
    }

    async fn get_extraction_result(
        &self,
        org_id: &str,
        extraction_id: &str,
    ) -> Result<ExtractionResultResponse, ApiError> {
        self.record(ApiCall::GetExtractionResult {
            org_id: org_id.to_string(),
            extraction_id: extraction_id.to_string(),
        })?;

        Ok(next_scripted(&mut self.state().extraction_results)
            .unwrap_or_else(ExtractionResultResponse::pending))
    }

    async fn start_deep_research(
        &self,
        org_id: &str,
        pipeline_id: &str,
        request: &StartDeepResearchRequest,
    ) -> Result<StartDeepResearchResponse, ApiError> {
        self.record(ApiCall::StartDeepResearch {
            org_id: org_id.to_string(),
            pipeline_id: pipeline_id.to_string(),
            request: request.clone(),
        })?;

        Ok(StartDeepResearchResponse {
            research_id: "mock-research".to_string(),
        })
    }

    async fn get_deep_research_result(
        &self,
        org_id: &str,
        pipeline_id: &str,
        research_id: &str,
    ) -> Result<DeepResearchResultResponse, ApiError> {
        self.record(ApiCall::GetDeepResearchResult {
            org_id: org_id.to_string(),
            pipeline_id: pipeline_id.to_string(),
            research_id: research_id.to_string(),
        })?;

        Ok(next_scripted(&mut self.state().research_results)
            .unwrap_or_else(DeepResearchResultResponse::pending))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_records_calls_in_order() {
        let api = MockApi::new();
        let request = RetrieveDocumentsRequest::new("q", 2);

        api.retrieve_documents("org", "pipe", &request).await.unwrap();
        api.get_extraction_result("org", "x1").await.unwrap();

        let calls = api.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(
            calls[0],
            ApiCall::RetrieveDocuments {
                org_id: "org".to_string(),
                pipeline_id: "pipe".to_string(),
                request,
            }
        );
    }

    #[tokio::test]
    async fn test_last_scripted_result_repeats() {
        let api = MockApi::new();
        api.push_research_result(DeepResearchResultResponse::pending());
        api.push_research_result(DeepResearchResultResponse::completed("done"));

        let first = api.get_deep_research_result("o", "p", "r").await.unwrap();
        let second = api.get_deep_research_result("o", "p", "r").await.unwrap();
        let third = api.get_deep_research_result("o", "p", "r").await.unwrap();

        assert!(!first.ready);
        assert!(second.ready);
        assert_eq!(second, third);
    }

    #[tokio::test]
    async fn test_scripted_failure() {
        let api = MockApi::new();
        api.fail_requests(401, "unauthorized");

        let err = api
            .start_extraction(
                "o",
                &StartExtractionRequest {
                    file_id: "f".to_string(),
                    chunk_size: 512,
                },
            )
            .await
            .unwrap_err();

        assert_eq!(err.status(), Some(401));
        assert_eq!(api.calls().len(), 1);
    }
}
