//! Polling loop for asynchronous API jobs.
//!
//! Jobs are started once and then polled at a fixed interval until they reach
//! a terminal state. The loop is bounded by an optional attempt cap and an
//! optional overall timeout, and can be aborted through a [`CancellationToken`]
//! at every await point.

use std::future::Future;
use std::time::Duration;

use tokio::time::{sleep, Instant};
use tokio_util::sync::CancellationToken;

use crate::models::JobStatus;

/// Configuration for the polling loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollConfig {
    /// Delay between two status polls
    pub interval: Duration,
    /// Maximum number of polls before giving up (`None` = no cap)
    pub max_attempts: Option<u32>,
    /// Maximum total time spent polling (`None` = no limit)
    pub timeout: Option<Duration>,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
            max_attempts: None,
            timeout: Some(Duration::from_secs(300)),
        }
    }
}

impl PollConfig {
    /// Set the delay between polls
    pub fn interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Cap the number of polls
    pub fn max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = Some(max_attempts);
        self
    }

    /// Limit the total polling time
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Remove the total polling time limit
    pub fn no_timeout(mut self) -> Self {
        self.timeout = None;
        self
    }
}

/// Ways a polling loop can end without a payload
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum PollError<E> {
    /// The start or poll call itself failed
    #[error("{0}")]
    Source(E),

    /// The job finished with an error
    #[error("job failed: {0}")]
    JobFailed(String),

    /// The job was still pending when the attempt cap or timeout was hit
    #[error("job still pending after {attempts} polls")]
    Timeout { attempts: u32 },

    /// The cancellation token fired
    #[error("polling cancelled")]
    Cancelled,
}

/// Start a job and poll it until it is ready.
///
/// `start` runs exactly once. `poll` receives a clone of the handle on every
/// attempt. A `Failed` status ends the loop immediately; errors returned by
/// either call are passed through as [`PollError::Source`].
pub async fn poll_until_ready<H, T, E, S, SF, P, PF>(
    config: &PollConfig,
    cancel: &CancellationToken,
    start: S,
    mut poll: P,
) -> Result<T, PollError<E>>
where
    H: Clone,
    S: FnOnce() -> SF,
    SF: Future<Output = Result<H, E>>,
    P: FnMut(H) -> PF,
    PF: Future<Output = Result<JobStatus<T>, E>>,
{
    let handle = tokio::select! {
        biased;
        _ = cancel.cancelled() => return Err(PollError::Cancelled),
        handle = start() => handle.map_err(PollError::Source)?,
    };

    // A timeout too large to represent leaves the loop without a deadline
    let deadline = config
        .timeout
        .and_then(|timeout| Instant::now().checked_add(timeout));
    let mut attempts: u32 = 0;

    loop {
        attempts += 1;

        let status = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(PollError::Cancelled),
            status = poll(handle.clone()) => status.map_err(PollError::Source)?,
        };

        match status {
            JobStatus::Succeeded(payload) => return Ok(payload),
            JobStatus::Failed(message) => return Err(PollError::JobFailed(message)),
            JobStatus::Pending => {}
        }

        if config.max_attempts.is_some_and(|max| attempts >= max) {
            return Err(PollError::Timeout { attempts });
        }
        if let Some(deadline) = deadline {
            let next_poll = Instant::now().checked_add(config.interval);
            if next_poll.map_or(true, |next_poll| next_poll > deadline) {
                return Err(PollError::Timeout { attempts });
            }
        }

        tracing::trace!(attempts, "Job still pending, waiting {:?}", config.interval);

        tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(PollError::Cancelled),
            _ = sleep(config.interval) => {}
        }
    }
}
