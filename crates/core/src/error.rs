//! Error taxonomy for calls to the external advertising platform.

use thiserror::Error;

/// Error returned by the metrics provider or the action executor.
///
/// The split drives retry policy: transport faults, rate limits, and
/// upstream 5xx responses are retried with backoff; a rejection or any
/// other 4xx is permanent for the current run.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ApiError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("rate limited, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("upstream error {status}: {message}")]
    Upstream { status: u16, message: String },

    #[error("request rejected: {message}")]
    Rejected { message: String },
}

impl ApiError {
    /// Whether a retry with backoff may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            ApiError::Transport(_) => true,
            ApiError::RateLimited { .. } => true,
            ApiError::Upstream { status, .. } => *status == 429 || *status >= 500,
            ApiError::Rejected { .. } => false,
        }
    }
}
