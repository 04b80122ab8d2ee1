//! Provider error types.

use thiserror::Error;

/// Errors returned by LLM providers.
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("Invalid API key")]
    InvalidApiKey,

    #[error("Rate limit exceeded: {0}")]
    RateLimitExceeded(String),

    #[error("API error ({status}): {message}")]
    ApiError {
        status: u16,
        message: String,
        error_type: Option<String>,
    },

    #[error("Stream error: {0}")]
    StreamError(String),

    #[error("Request error: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ProviderError {
    /// Whether a retry with backoff can plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::RateLimitExceeded(_) => true,
            Self::ApiError { status, .. } => *status >= 500 || *status == 429,
            Self::Request(e) => e.is_timeout() || e.is_connect(),
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, ProviderError>;
