//! Announcement error types

use thiserror::Error;

/// Errors raised while delivering an announcement.
#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("Rate limited, retry after {retry_after_ms}ms")]
    RateLimited { retry_after_ms: u64 },

    #[error("Webhook returned error: {status} - {message}")]
    Webhook { status: u16, message: String },

    #[error("Retry exhausted after {attempts} attempts: {message}")]
    RetryExhausted { attempts: u32, message: String },

    #[error("Request timeout")]
    Timeout,
}

impl NotifyError {
    /// Client errors other than rate limiting will not succeed on retry.
    pub fn is_retryable(&self) -> bool {
        match self {
            NotifyError::Webhook { status, .. } => *status >= 500,
            NotifyError::RetryExhausted { .. } => false,
            NotifyError::Http(_) | NotifyError::RateLimited { .. } | NotifyError::Timeout => true,
        }
    }
}

impl From<reqwest::Error> for NotifyError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            NotifyError::Timeout
        } else {
            NotifyError::Http(err.to_string())
        }
    }
}
