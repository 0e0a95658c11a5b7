//! Request, response and job models for the Vectorize API.

mod jobs;
mod retrieval;

pub use jobs::{
    DeepResearchResult, DeepResearchResultResponse, ExtractionResult, ExtractionResultResponse,
    JobHandle, JobKind, JobStatus, StartDeepResearchRequest, StartDeepResearchResponse,
    StartExtractionRequest, StartExtractionResponse, StartFileUploadRequest,
    StartFileUploadResponse,
};
pub use retrieval::{Document, RetrieveDocumentsRequest, RetrieveDocumentsResponse};
