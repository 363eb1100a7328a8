//! Generative-text backend seam
//!
//! The pipeline depends only on the `GenerativeBackend` trait. Production uses
//! `HttpGenerativeClient`; tests inject scripted fakes.

pub mod http_client;

use async_trait::async_trait;
use thiserror::Error;

pub use http_client::HttpGenerativeClient;

/// Generative backend failures
///
/// Never escapes the layer scorer: every variant ends in the heuristic path.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GenerativeError {
    #[error("Generative backend unavailable: {0}")]
    Unavailable(String),

    #[error("Generative call timed out after {0}ms")]
    Timeout(u64),

    #[error("Generative backend returned HTTP {0}")]
    Http(u16),

    #[error("Generative request failed: {0}")]
    Request(String),

    #[error("Generative backend returned an empty response")]
    EmptyResponse,
}

impl GenerativeError {
    /// Transient failures worth another attempt
    pub fn is_retryable(&self) -> bool {
        match self {
            GenerativeError::Unavailable(_)
            | GenerativeError::Timeout(_)
            | GenerativeError::Request(_)
            | GenerativeError::EmptyResponse => true,
            GenerativeError::Http(status) => *status == 429 || *status >= 500,
        }
    }
}

/// Text generation service
#[async_trait]
pub trait GenerativeBackend: Send + Sync {
    /// Backend name for logs
    fn name(&self) -> &str;

    /// Generate a completion for `prompt`
    async fn generate(&self, prompt: &str) -> Result<String, GenerativeError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(GenerativeError::Timeout(30_000).is_retryable());
        assert!(GenerativeError::Http(503).is_retryable());
        assert!(GenerativeError::Http(429).is_retryable());
        assert!(!GenerativeError::Http(400).is_retryable());
        assert!(!GenerativeError::Http(401).is_retryable());
        assert!(GenerativeError::EmptyResponse.is_retryable());
    }
}
