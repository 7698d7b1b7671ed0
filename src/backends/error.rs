use thiserror::Error;

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("Rate limit exceeded: {message}")]
    RateLimit {
        retry_after: Option<u64>,
        message: String,
    },

    #[error("Server error (status {status}): {message}")]
    ServerError { status: u16, message: String },

    #[error("Authentication error: {0}")]
    Authentication(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid response from backend: {0}")]
    InvalidResponse(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type BackendResult<T> = Result<T, BackendError>;

impl BackendError {
    /// Whether a caller that chooses to retry could reasonably do so.
    /// The core never retries on its own.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            BackendError::RateLimit { .. }
                | BackendError::ServerError { .. }
                | BackendError::Network(_)
        )
    }
}
