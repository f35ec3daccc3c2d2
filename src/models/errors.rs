use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExplorerError {
    #[error("Request timed out: {0}")]
    Timeout(String),
    #[error("Transport error: {0}")]
    Transport(String),
    #[error("Invalid response body: {0}")]
    Decode(String),
    #[error("Explorer API rejected the request: {message}")]
    Api { message: String },
}

impl ExplorerError {
    /// A well-formed rejection from the API will be rejected again, so only
    /// network and body failures are worth another attempt.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, ExplorerError::Api { .. })
    }
}

impl From<reqwest::Error> for ExplorerError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ExplorerError::Timeout(e.to_string())
        } else if e.is_decode() {
            ExplorerError::Decode(e.to_string())
        } else {
            ExplorerError::Transport(e.to_string())
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid throttle rate: max_calls_per_second must be positive, got {got}")]
    InvalidRate { got: f64 },
    #[error("Invalid {field}: must be greater than zero")]
    ZeroInterval { field: String },
}
