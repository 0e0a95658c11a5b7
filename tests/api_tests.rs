//! HTTP-level tests for the Vectorize client and the full tool stack,
//! run against a local mock server.

use std::sync::Arc;
use std::time::Duration;

use mockito::{Matcher, Server};
use serde_json::json;
use tokio_util::sync::CancellationToken;
use vectorize_mcp::client::{ApiError, VectorizeApi, VectorizeClient};
use vectorize_mcp::config::Config;
use vectorize_mcp::mcp::{ToolRegistry, ToolResult, ToolSettings};
use vectorize_mcp::models::RetrieveDocumentsRequest;

const TOKEN: &str = "test-token";

fn client(server: &Server) -> VectorizeClient {
    VectorizeClient::new(&server.url(), TOKEN, Duration::from_secs(5)).unwrap()
}

fn registry(server: &Server, default_pipeline: Option<&str>) -> ToolRegistry {
    let mut config = Config::new("org-1", TOKEN).with_api_url(server.url());
    config.poll_interval_ms = 10;
    config.poll_timeout_secs = 5;
    if let Some(pipeline) = default_pipeline {
        config = config.with_pipeline_id(pipeline);
    }

    let api: Arc<dyn VectorizeApi> = Arc::new(client(server));
    ToolRegistry::new(api, ToolSettings::from_config(&config))
}

#[tokio::test]
async fn test_retrieve_sends_bearer_token_and_body() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/org/org-1/pipelines/p1/retrieval")
        .match_header("authorization", "Bearer test-token")
        .match_body(Matcher::Json(json!({"question": "q", "numResults": 3})))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "question": "q",
                "documents": [{"id": "d1", "text": "hello", "similarity": 0.9, "source": "a.pdf"}],
                "averageRelevancy": 0.5
            })
            .to_string(),
        )
        .create_async()
        .await;

    let response = client(&server)
        .retrieve_documents("org-1", "p1", &RetrieveDocumentsRequest::new("q", 3))
        .await
        .unwrap();

    mock.assert_async().await;
    assert_eq!(response.documents.len(), 1);
    assert_eq!(response.documents[0].id.as_deref(), Some("d1"));
    assert_eq!(response.documents[0].extra["source"], "a.pdf");
}

#[tokio::test]
async fn test_http_error_carries_status_and_body() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/org/org-1/pipelines/p1/retrieval")
        .with_status(401)
        .with_body("invalid token")
        .create_async()
        .await;

    let err = client(&server)
        .retrieve_documents("org-1", "p1", &RetrieveDocumentsRequest::new("q", 4))
        .await
        .unwrap_err();

    assert_eq!(err.status(), Some(401));
    assert_eq!(err.to_string(), "Server request failed with 401: invalid token");
}

#[tokio::test]
async fn test_malformed_body_is_parse_error() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/org/org-1/extraction/x1")
        .with_status(200)
        .with_body("not json")
        .create_async()
        .await;

    let err = client(&server)
        .get_extraction_result("org-1", "x1")
        .await
        .unwrap_err();

    assert!(matches!(err, ApiError::Parse(_)));
}

#[tokio::test]
async fn test_router_retrieve_over_http() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/org/org-1/pipelines/p1/retrieval")
        .match_header("authorization", "Bearer test-token")
        .match_body(Matcher::PartialJson(json!({"numResults": 4})))
        .with_status(200)
        .with_body(json!({"documents": []}).to_string())
        .create_async()
        .await;

    let result = registry(&server, Some("p1"))
        .call("retrieve", json!({"question": "q"}), &CancellationToken::new())
        .await;

    mock.assert_async().await;
    assert!(!result.is_error, "{:?}", result);
    assert_eq!(result, ToolResult::text(r#"{"documents":[]}"#));
}

#[tokio::test]
async fn test_router_deep_research_over_http() {
    let mut server = Server::new_async().await;
    let start = server
        .mock("POST", "/org/org-1/pipelines/p1/deep-research")
        .match_header("authorization", "Bearer test-token")
        .match_body(Matcher::Json(json!({"query": "q", "webSearch": true})))
        .with_status(200)
        .with_body(json!({"researchId": "r1"}).to_string())
        .create_async()
        .await;
    let status = server
        .mock("GET", "/org/org-1/pipelines/p1/deep-research/r1")
        .with_status(200)
        .with_body(json!({"ready": true, "data": {"success": true, "markdown": "# Done"}}).to_string())
        .create_async()
        .await;

    let result = registry(&server, None)
        .call(
            "deep-research",
            json!({"pipelineId": "p1", "query": "q", "webSearch": true}),
            &CancellationToken::new(),
        )
        .await;

    start.assert_async().await;
    status.assert_async().await;
    assert_eq!(result, ToolResult::text("# Done"));
}

#[tokio::test]
async fn test_router_extract_over_http() {
    let mut server = Server::new_async().await;
    let upload_url = format!("{}/upload/f1", server.url());

    let start_upload = server
        .mock("POST", "/org/org-1/files")
        .match_header("authorization", "Bearer test-token")
        .match_body(Matcher::Json(json!({"name": "My File", "contentType": "text/plain"})))
        .with_status(200)
        .with_body(json!({"fileId": "f1", "uploadUrl": upload_url}).to_string())
        .create_async()
        .await;
    let put = server
        .mock("PUT", "/upload/f1")
        .match_header("content-type", "text/plain")
        .match_header("authorization", Matcher::Missing)
        .match_body("test")
        .with_status(200)
        .create_async()
        .await;
    let start_extraction = server
        .mock("POST", "/org/org-1/extraction")
        .match_body(Matcher::Json(json!({"fileId": "f1", "chunkSize": 512})))
        .with_status(200)
        .with_body(json!({"extractionId": "x1"}).to_string())
        .create_async()
        .await;
    let status = server
        .mock("GET", "/org/org-1/extraction/x1")
        .with_status(200)
        .with_body(json!({"ready": true, "data": {"success": true, "chunks": ["test"]}}).to_string())
        .create_async()
        .await;

    let result = registry(&server, None)
        .call(
            "extract",
            json!({"base64Document": "dGVzdA==", "contentType": "text/plain"}),
            &CancellationToken::new(),
        )
        .await;

    start_upload.assert_async().await;
    put.assert_async().await;
    start_extraction.assert_async().await;
    status.assert_async().await;
    assert!(!result.is_error, "{:?}", result);

    let payload: serde_json::Value = serde_json::from_str(result.first_text().unwrap()).unwrap();
    assert_eq!(payload["success"], true);
    assert_eq!(payload["chunks"], json!(["test"]));
}

#[tokio::test]
async fn test_router_extract_upload_rejected() {
    let mut server = Server::new_async().await;
    let upload_url = format!("{}/upload", server.url());

    server
        .mock("POST", "/org/org-1/files")
        .with_status(200)
        .with_body(json!({"fileId": "f1", "uploadUrl": upload_url}).to_string())
        .create_async()
        .await;
    server
        .mock("PUT", "/upload")
        .with_status(500)
        .create_async()
        .await;
    let start_extraction = server
        .mock("POST", "/org/org-1/extraction")
        .expect(0)
        .create_async()
        .await;

    let result = registry(&server, None)
        .call(
            "extract",
            json!({"base64Document": "dGVzdA==", "contentType": "text/plain"}),
            &CancellationToken::new(),
        )
        .await;

    start_extraction.assert_async().await;
    assert!(result.is_error);
    assert_eq!(
        result.first_text(),
        Some("Request failed: Failed to upload file: 500 Internal Server Error")
    );
}

#[tokio::test]
async fn test_router_surfaces_server_error() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/org/org-1/pipelines/p1/retrieval")
        .with_status(500)
        .with_body("pipeline unavailable")
        .create_async()
        .await;

    let result = registry(&server, Some("p1"))
        .call("retrieve", json!({"question": "q"}), &CancellationToken::new())
        .await;

    assert!(result.is_error);
    assert_eq!(
        result.first_text(),
        Some("Request failed: Server request failed with 500: pipeline unavailable")
    );
}
