//! MCP server transports.
//!
//! Stdio carries newline-delimited JSON-RPC; every request runs in its own
//! task so a cancellation can arrive while a job is being polled, and client
//! log events are interleaved as `notifications/message`. HTTP accepts one
//! JSON-RPC message per POST and answers with a JSON body.

use crate::client::{VectorizeApi, VectorizeClient};
use crate::config::Config;
use crate::mcp::client_log::LogEvent;
use crate::mcp::handlers::ToolSettings;
use crate::mcp::protocol::McpProtocol;
use crate::mcp::tools::ToolRegistry;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use pmcp::Error;
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader, BufWriter};
use tokio::net::TcpListener;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::{JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;

pub use crate::mcp::protocol::SERVER_NAME;

/// The MCP server for Vectorize
///
/// Exposes the retrieve, extract and deep-research tools over stdio or HTTP.
#[derive(Debug, Clone)]
pub struct McpServer {
    protocol: Arc<McpProtocol>,
    registry: Arc<ToolRegistry>,
    shutdown: CancellationToken,
}

impl McpServer {
    /// Create a new MCP server talking to the Vectorize API described by `config`
    pub fn new(config: &Config) -> Result<Self, Error> {
        let client = VectorizeClient::new(&config.api_url, &config.token, config.request_timeout())
            .map_err(|e| Error::internal(e.to_string()))?;
        let api: Arc<dyn VectorizeApi> = Arc::new(client);

        Ok(Self::with_registry(ToolRegistry::new(
            api,
            ToolSettings::from_config(config),
        )))
    }

    /// Create a new MCP server serving an existing tool registry
    pub fn with_registry(registry: ToolRegistry) -> Self {
        let registry = Arc::new(registry);
        let shutdown = CancellationToken::new();
        let protocol = Arc::new(McpProtocol::new(registry.clone(), shutdown.clone()));

        Self {
            protocol,
            registry,
            shutdown,
        }
    }

    /// Get the tool registry
    pub fn registry(&self) -> Arc<ToolRegistry> {
        self.registry.clone()
    }

    /// Get the JSON-RPC dispatcher shared by both transports
    pub fn protocol(&self) -> Arc<McpProtocol> {
        self.protocol.clone()
    }

    /// Token cancelled on shutdown; in-flight job polling stops when it fires
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Run the server in stdio mode (for Claude Desktop and other MCP clients)
    pub async fn run(&self) -> Result<(), Error> {
        tracing::info!("Starting MCP server in stdio mode");
        self.serve(tokio::io::stdin(), tokio::io::stdout()).await
    }

    /// Serve newline-delimited JSON-RPC until `reader` reaches EOF, then wait
    /// for the calls still running
    pub async fn serve<R, W>(&self, reader: R, writer: W) -> Result<(), Error>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        tracing::info!(
            org_id = %self.registry.settings().org_id,
            pipeline_id = ?self.registry.settings().default_pipeline_id,
            "Vectorize MCP server initialized"
        );

        let (tx, rx) = mpsc::unbounded_channel();
        let writer_task = tokio::spawn(write_lines(writer, rx));

        let log_done = CancellationToken::new();
        let forwarder = tokio::spawn(forward_client_log(
            self.protocol.clone(),
            self.registry.client_log().subscribe(),
            tx.clone(),
            log_done.clone(),
        ));

        let mut calls = JoinSet::new();
        let mut lines = BufReader::new(reader).lines();

        while let Some(line) = lines.next_line().await? {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            tracing::debug!(bytes = line.len(), "Received message");

            let message = match McpProtocol::parse(line) {
                Ok(message) => message,
                Err(response) => {
                    send(&tx, &response);
                    continue;
                }
            };

            match message.id.clone() {
                None => self.protocol.handle_notification(&message),
                Some(id) => {
                    let pending = self.protocol.begin(id);
                    let protocol = self.protocol.clone();
                    let tx = tx.clone();
                    calls.spawn(async move {
                        let response = protocol.respond(message, pending).await;
                        send(&tx, &response);
                    });
                }
            }

            while calls.try_join_next().is_some() {}
        }

        tracing::info!(in_flight = calls.len(), "stdin closed, finishing in-flight calls");
        while calls.join_next().await.is_some() {}

        log_done.cancel();
        let _ = forwarder.await;
        drop(tx);

        writer_task
            .await
            .map_err(|e| Error::internal(format!("stdout writer failed: {}", e)))??;
        Ok(())
    }

    /// Run the server in HTTP mode
    ///
    /// Binds `addr` and serves JSON-RPC POSTs on `/` and `/mcp` until the
    /// shutdown token fires. Returns the bound address and the server task.
    pub async fn run_http(&self, addr: &str) -> Result<(SocketAddr, JoinHandle<()>), Error> {
        tracing::info!("Starting MCP server in HTTP mode on {}", addr);

        let socket_addr: SocketAddr = addr
            .parse()
            .map_err(|e| Error::invalid_params(format!("Invalid address: {}", e)))?;

        let listener = TcpListener::bind(socket_addr).await?;
        let bound_addr = listener.local_addr()?;

        let app = Router::new()
            .route("/", post(handle_post))
            .route("/mcp", post(handle_post))
            .with_state(self.protocol.clone());

        let shutdown = self.shutdown.clone();
        let handle = tokio::spawn(async move {
            let server = axum::serve(listener, app)
                .with_graceful_shutdown(async move { shutdown.cancelled().await });
            if let Err(e) = server.await {
                tracing::error!("HTTP server failed: {}", e);
            }
        });

        Ok((bound_addr, handle))
    }

    /// Cancel every in-flight tool call and stop the HTTP listener
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }
}

async fn handle_post(State(protocol): State<Arc<McpProtocol>>, body: String) -> Response {
    let message = match McpProtocol::parse(&body) {
        Ok(message) => message,
        Err(response) => return (StatusCode::BAD_REQUEST, Json(response)).into_response(),
    };

    match protocol.handle(message).await {
        Some(response) => Json(response).into_response(),
        None => StatusCode::ACCEPTED.into_response(),
    }
}

fn send<T: Serialize>(tx: &UnboundedSender<String>, message: &T) {
    match serde_json::to_string(message) {
        Ok(line) => {
            // A closed channel means stdout is gone
            let _ = tx.send(line);
        }
        Err(e) => tracing::error!("Failed to serialize message: {}", e),
    }
}

async fn write_lines<W>(writer: W, mut lines: UnboundedReceiver<String>) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    let mut writer = BufWriter::new(writer);
    while let Some(line) = lines.recv().await {
        writer.write_all(line.as_bytes()).await?;
        writer.write_all(b"\n").await?;
        writer.flush().await?;
    }
    Ok(())
}

async fn forward_client_log(
    protocol: Arc<McpProtocol>,
    mut events: broadcast::Receiver<LogEvent>,
    tx: UnboundedSender<String>,
    done: CancellationToken,
) {
    let forward = |event: LogEvent| {
        if let Some(notification) = protocol.log_notification(&event) {
            send(&tx, &notification);
        }
    };

    loop {
        let event = tokio::select! {
            event = events.recv() => event,
            _ = done.cancelled() => break,
        };
        match event {
            Ok(event) => forward(event),
            Err(RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "Client log events dropped");
            }
            Err(RecvError::Closed) => return,
        }
    }

    // events sent by the last calls
    while let Ok(event) = events.try_recv() {
        forward(event);
    }
}
