//! Error types for scheduler operations.

use std::time::Duration;

use thiserror::Error;
use uuid::Uuid;

/// Failures produced by a unit of work against the external provider.
#[derive(Debug, Error)]
pub enum WorkError {
    /// The provider explicitly throttled the call.
    #[error("rate limited, retry after {retry_after:?}")]
    RateLimited {
        /// Provider-suggested wait before retrying, when present.
        retry_after: Option<Duration>,
    },
    /// The provider answered with a non-success status.
    #[error("provider error {status}: {message}")]
    Provider {
        /// HTTP-equivalent status code.
        status: u16,
        /// Provider-supplied message.
        message: String,
    },
    /// The request never reached the provider.
    #[error("network error: {0}")]
    Network(String),
    /// The request was malformed or rejected before execution.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl WorkError {
    /// Whether this failure signals provider-side throttling.
    ///
    /// Recognizes the explicit marker, a 429 status, and rate-limit phrasing
    /// in the provider message.
    #[must_use]
    pub fn is_rate_limit(&self) -> bool {
        match self {
            Self::RateLimited { .. } => true,
            Self::Provider { status: 429, .. } => true,
            Self::Provider { message, .. } => {
                let message = message.to_ascii_lowercase();
                message.contains("rate limit") || message.contains("too many requests")
            }
            Self::Network(_) | Self::InvalidRequest(_) => false,
        }
    }

    /// Provider-suggested retry delay, if the failure carried one.
    #[must_use]
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::RateLimited { retry_after } => *retry_after,
            _ => None,
        }
    }
}

/// Terminal outcomes surfaced to callers through the task handle.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// The work failed with a non-retryable error.
    #[error("task failed after {attempts} attempt(s): {source}")]
    TaskFailed {
        /// The classified provider failure.
        #[source]
        source: WorkError,
        /// Attempts made before giving up.
        attempts: usize,
    },
    /// The work hit provider throttling on every attempt up to the retry cap.
    #[error("retries exhausted after {attempts} attempt(s): {source}")]
    RetryExhausted {
        /// The last rate-limit failure observed.
        #[source]
        source: WorkError,
        /// Attempts made, including the first.
        attempts: usize,
    },
    /// The wall-clock budget elapsed before the work resolved.
    #[error("task {id} timed out")]
    Timeout {
        /// Identifier of the timed-out item.
        id: Uuid,
    },
    /// The scheduler went away before the work resolved.
    #[error("scheduler shut down before task {id} resolved")]
    Shutdown {
        /// Identifier of the abandoned item.
        id: Uuid,
    },
    /// Configuration rejected at construction time.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Application-facing result using anyhow for higher-level contexts.
pub type AppResult<T> = Result<T, anyhow::Error>;
