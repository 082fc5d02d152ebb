//! Bounded retry for agent-backed tools.

use std::future::Future;
use std::time::Duration;

use tracing::{debug, warn};

use crate::error::ToolError;

/// How many times an operation is attempted, and how long to wait between
/// attempts.
///
/// Every error is treated as retryable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first. Zero is treated as one.
    pub max_attempts: u32,
    /// Fixed delay between attempts. `None` retries immediately.
    pub backoff: Option<Duration>,
}

impl RetryPolicy {
    /// A policy with `max_attempts` and no backoff.
    #[must_use]
    pub const fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            backoff: None,
        }
    }

    /// Adds a fixed delay between attempts.
    #[must_use]
    pub const fn with_backoff(mut self, delay: Duration) -> Self {
        self.backoff = Some(delay);
        self
    }

    /// Runs `op` until it succeeds or the attempts are used up.
    ///
    /// `op` receives the 1-based attempt number.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::RetriesExhausted`] carrying the last failure's
    /// message.
    pub async fn run<T, F, Fut>(&self, tool: &str, mut op: F) -> Result<T, ToolError>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, ToolError>>,
    {
        let attempts = self.max_attempts.max(1);
        let mut last_error = String::new();

        for attempt in 1..=attempts {
            match op(attempt).await {
                Ok(value) => {
                    if attempt > 1 {
                        debug!(tool, attempt, "Succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(e) => {
                    warn!(tool, attempt, max_attempts = attempts, error = %e, "Attempt failed");
                    last_error = e.to_string();
                    if attempt < attempts
                        && let Some(delay) = self.backoff
                    {
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        }

        Err(ToolError::RetriesExhausted {
            tool: tool.to_string(),
            attempts,
            last_error,
        })
    }
}
