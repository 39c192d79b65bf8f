use std::time::Duration;

use thiserror::Error;

/// Outcome classes of a single logical fetch.
#[derive(Debug, Error)]
pub enum FetchError {
    /// 408, 429, 5xx or a network-level failure. Retried, never surfaced by the client.
    #[error("transient server error: {0}")]
    TransientServerError(String),

    #[error("request failed with status {status}: {body}")]
    NonRetryableError { status: u16, body: String },

    #[error("request timed out after {:.1}s", elapsed.as_secs_f64())]
    TimeoutExceeded { elapsed: Duration },

    #[error("malformed response: {0}")]
    MalformedResponse(String),
}

impl FetchError {
    /// Fatal errors end the fetch and are alerted to the user.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, FetchError::TransientServerError(_))
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

pub type Result<T> = std::result::Result<T, AppError>;
