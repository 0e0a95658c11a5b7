//! Utility modules shared by the client and the tool handlers.
//!
//! - [`HttpClient`]: shared `reqwest` client with timeouts and user agent
//! - [`poll_until_ready`]: start an asynchronous job and poll it to completion
//! - [`PollConfig`]: interval, attempt cap and timeout for the polling loop
//!
//! # Polling a job
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use tokio_util::sync::CancellationToken;
//! use vectorize_mcp::models::JobStatus;
//! use vectorize_mcp::utils::{poll_until_ready, PollConfig, PollError};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let config = PollConfig::default().interval(Duration::from_millis(500));
//! let result: Result<String, PollError<std::io::Error>> = poll_until_ready(
//!     &config,
//!     &CancellationToken::new(),
//!     || async { Ok("job-1".to_string()) },
//!     |_id| async { Ok(JobStatus::Succeeded("done".to_string())) },
//! )
//! .await;
//! assert_eq!(result.unwrap(), "done");
//! # }
//! ```

mod http;
mod poll;

pub use http::{HttpClient, USER_AGENT};
pub use poll::{poll_until_ready, PollConfig, PollError};
