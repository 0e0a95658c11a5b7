//! MCP wire tests: JSON-RPC over the HTTP transport, backed by [`MockApi`].

use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};
use vectorize_mcp::client::MockApi;
use vectorize_mcp::mcp::server::{McpServer, SERVER_NAME};
use vectorize_mcp::mcp::{ToolRegistry, ToolSettings};
use vectorize_mcp::models::DeepResearchResultResponse;
use vectorize_mcp::utils::PollConfig;

struct TestServer {
    server: McpServer,
    url: String,
    http: reqwest::Client,
}

impl TestServer {
    async fn start(api: Arc<MockApi>) -> Self {
        let settings = ToolSettings::new("org-1")
            .default_pipeline("p1")
            .poll(PollConfig::default().interval(Duration::from_millis(10)).no_timeout());
        let server = McpServer::with_registry(ToolRegistry::new(api, settings));
        let (addr, _handle) = server.run_http("127.0.0.1:0").await.unwrap();

        Self {
            server,
            url: format!("http://{}/", addr),
            http: reqwest::Client::new(),
        }
    }

    async fn post(&self, body: Value) -> reqwest::Response {
        self.http
            .post(&self.url)
            .header("accept", "application/json, text/event-stream")
            .json(&body)
            .send()
            .await
            .unwrap()
    }

    async fn rpc(&self, id: i64, method: &str, params: Value) -> Value {
        let response = self
            .post(json!({"jsonrpc": "2.0", "id": id, "method": method, "params": params}))
            .await;
        assert!(response.status().is_success(), "{}", response.status());

        let body: Value = response.json().await.unwrap();
        assert_eq!(body["id"], id);
        body
    }

    async fn initialize(&self) -> Value {
        self.rpc(
            1,
            "initialize",
            json!({
                "protocolVersion": "2024-11-05",
                "capabilities": {},
                "clientInfo": {"name": "test-client", "version": "1.0"}
            }),
        )
        .await
    }
}

#[tokio::test]
async fn test_initialize_then_call_returns_envelope() {
    let api = Arc::new(MockApi::new());
    api.push_research_result(DeepResearchResultResponse::completed("M"));
    let server = TestServer::start(api).await;

    let init = server.initialize().await;
    assert_eq!(init["result"]["serverInfo"]["name"], SERVER_NAME);
    assert_eq!(init["result"]["protocolVersion"], "2024-11-05");
    assert!(init["result"]["capabilities"]["tools"].is_object());
    assert!(init["result"]["capabilities"]["logging"].is_object());

    let call = server
        .rpc(
            2,
            "tools/call",
            json!({"name": "deep-research", "arguments": {"query": "q", "webSearch": true}}),
        )
        .await;

    assert_eq!(
        call["result"],
        json!({"content": [{"type": "text", "text": "M"}], "isError": false})
    );
}

#[tokio::test]
async fn test_failed_call_sets_is_error() {
    let api = Arc::new(MockApi::new());
    api.fail_requests(500, "pipeline unavailable");
    let server = TestServer::start(api).await;
    server.initialize().await;

    let call = server
        .rpc(
            2,
            "tools/call",
            json!({"name": "retrieve", "arguments": {"question": "q"}}),
        )
        .await;

    assert_eq!(
        call["result"],
        json!({
            "content": [{
                "type": "text",
                "text": "Request failed: Server request failed with 500: pipeline unavailable"
            }],
            "isError": true
        })
    );
}

#[tokio::test]
async fn test_tools_list_over_http() {
    let server = TestServer::start(Arc::new(MockApi::new())).await;
    server.initialize().await;

    let list = server.rpc(2, "tools/list", json!({})).await;
    let names: Vec<&str> = list["result"]["tools"]
        .as_array()
        .unwrap()
        .iter()
        .map(|tool| tool["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["retrieve", "extract", "deep-research"]);

    // a default pipeline is configured, so retrieve only requires the question
    assert_eq!(
        list["result"]["tools"][0]["inputSchema"]["required"],
        json!(["question"])
    );
}

#[tokio::test]
async fn test_client_cancellation_stops_polling() {
    // no scripted result: the research job stays pending
    let api = Arc::new(MockApi::new());
    let server = TestServer::start(api).await;
    server.initialize().await;

    let call = tokio::spawn({
        let http = server.http.clone();
        let url = server.url.clone();
        async move {
            http.post(&url)
                .json(&json!({
                    "jsonrpc": "2.0",
                    "id": 7,
                    "method": "tools/call",
                    "params": {"name": "deep-research", "arguments": {"query": "q", "webSearch": false}}
                }))
                .send()
                .await
                .unwrap()
                .json::<Value>()
                .await
                .unwrap()
        }
    });

    let protocol = server.server.protocol();
    while protocol.in_flight() == 0 {
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    let accepted = server
        .post(json!({
            "jsonrpc": "2.0",
            "method": "notifications/cancelled",
            "params": {"requestId": 7, "reason": "user aborted"}
        }))
        .await;
    assert_eq!(accepted.status(), reqwest::StatusCode::ACCEPTED);

    let response = tokio::time::timeout(Duration::from_secs(5), call)
        .await
        .expect("call did not stop after cancellation")
        .unwrap();
    assert_eq!(response["id"], 7);
    assert_eq!(response["result"]["isError"], true);
    assert_eq!(
        response["result"]["content"][0]["text"],
        "Request failed: Deep research was cancelled"
    );
    assert_eq!(protocol.in_flight(), 0);
}

#[tokio::test]
async fn test_unknown_method_is_jsonrpc_error() {
    let server = TestServer::start(Arc::new(MockApi::new())).await;

    let response = server.rpc(3, "prompts/list", json!({})).await;
    assert_eq!(response["error"]["code"], -32601);
    assert!(response.get("result").is_none());
}

#[tokio::test]
async fn test_malformed_body_is_parse_error() {
    let server = TestServer::start(Arc::new(MockApi::new())).await;

    let response = server
        .http
        .post(&server.url)
        .header("content-type", "application/json")
        .body("{oops")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"]["code"], -32700);
    assert!(body["id"].is_null());
}

#[tokio::test]
async fn test_shutdown_stops_listener() {
    let server = McpServer::with_registry(ToolRegistry::new(
        Arc::new(MockApi::new()),
        ToolSettings::new("org-1"),
    ));
    let (_addr, handle) = server.run_http("127.0.0.1:0").await.unwrap();

    server.shutdown();
    tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("listener did not stop")
        .unwrap();
}
