//! # Vectorize MCP
//!
//! A Model Context Protocol (MCP) server exposing Vectorize document retrieval,
//! text extraction and deep research as tools.
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - [`models`]: Request, response and job models of the Vectorize API
//! - [`client`]: The [`VectorizeApi`] trait, its HTTP client and a mock for tests
//! - [`mcp`]: Tool catalog, argument validation, handlers, result envelope and server
//! - [`utils`]: HTTP client and the job polling loop
//! - [`config`]: Configuration management

pub mod client;
pub mod config;
pub mod mcp;
pub mod models;
pub mod utils;

// Re-export commonly used types
pub use client::{VectorizeApi, VectorizeClient};
pub use config::Config;
pub use mcp::{ToolRegistry, ToolResult};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
