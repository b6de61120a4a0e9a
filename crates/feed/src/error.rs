//! Feed fetching error types

use thiserror::Error;

/// Errors raised while reading a channel feed.
#[derive(Error, Debug)]
pub enum FeedError {
    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("Invalid status code: {0}")]
    Status(u16),

    #[error("Feed too large: {actual} bytes (max {limit} bytes)")]
    TooLarge { limit: u64, actual: u64 },

    #[error("Feed parse error: {0}")]
    Parse(String),

    #[error("Request timeout")]
    Timeout,
}

impl From<reqwest::Error> for FeedError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            FeedError::Timeout
        } else {
            FeedError::Http(err.to_string())
        }
    }
}

impl From<feed_rs::parser::ParseFeedError> for FeedError {
    fn from(err: feed_rs::parser::ParseFeedError) -> Self {
        FeedError::Parse(err.to_string())
    }
}
