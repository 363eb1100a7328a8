// Concept: HTTP generative-text client
//
// Ollama-style contract:
//   POST {base_url}/api/generate  {"model", "prompt", "stream": false}
//   -> {"response": "..."}
//
// Rate limiting is applied per call, inside the client, so batch-level
// parallelism in the orchestrator stays decoupled from backend quota.

use super::{GenerativeBackend, GenerativeError};
use async_trait::async_trait;
use governor::{Quota, RateLimiter};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::num::NonZeroU32;
use std::time::Duration;

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
}

/// reqwest + governor generative client
pub struct HttpGenerativeClient {
    client: Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
    request_timeout: Duration,
    rate_limiter: RateLimiter<
        governor::state::direct::NotKeyed,
        governor::state::InMemoryState,
        governor::clock::DefaultClock,
    >,
}

impl HttpGenerativeClient {
    /// Build a client
    ///
    /// # Arguments
    /// * `base_url` - Server root, e.g. `http://127.0.0.1:11434`
    /// * `model` - Model name sent with every request
    /// * `requests_per_second` - Per-call quota (0 is treated as 1)
    /// * `request_timeout` - reqwest-level timeout; the retry policy applies its own per-call timeout on top
    pub fn new(
        base_url: impl Into<String>,
        model: impl Into<String>,
        api_key: Option<String>,
        requests_per_second: u32,
        request_timeout: Duration,
    ) -> Result<Self, GenerativeError> {
        let client = Client::builder()
            .timeout(request_timeout)
            .connect_timeout(Duration::from_secs(5))
            .build()
            .map_err(|e| GenerativeError::Unavailable(format!("HTTP client build failed: {}", e)))?;

        let quota = NonZeroU32::new(requests_per_second).unwrap_or(NonZeroU32::MIN);
        let rate_limiter = RateLimiter::direct(Quota::per_second(quota));

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            api_key,
            request_timeout,
            rate_limiter,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/api/generate", self.base_url)
    }
}

#[async_trait]
impl GenerativeBackend for HttpGenerativeClient {
    fn name(&self) -> &str {
        &self.model
    }

    async fn generate(&self, prompt: &str) -> Result<String, GenerativeError> {
        self.rate_limiter.until_ready().await;

        let body = GenerateRequest {
            model: &self.model,
            prompt,
            stream: false,
        };

        let mut request = self.client.post(self.endpoint()).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                GenerativeError::Timeout(self.request_timeout.as_millis() as u64)
            } else if e.is_connect() {
                GenerativeError::Unavailable(e.to_string())
            } else {
                GenerativeError::Request(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            tracing::debug!(status = status.as_u16(), "Generative backend returned error status");
            return Err(GenerativeError::Http(status.as_u16()));
        }

        let parsed: GenerateResponse = response
            .json()
            .await
            .map_err(|e| GenerativeError::Request(format!("Invalid response body: {}", e)))?;

        if parsed.response.trim().is_empty() {
            return Err(GenerativeError::EmptyResponse);
        }

        Ok(parsed.response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_strips_trailing_slash() {
        let client = HttpGenerativeClient::new(
            "http://localhost:11434/",
            "llama3",
            None,
            5,
            Duration::from_secs(5),
        )
        .unwrap();
        assert_eq!(client.endpoint(), "http://localhost:11434/api/generate");
        assert_eq!(client.name(), "llama3");
    }

    #[test]
    fn test_zero_rate_does_not_panic() {
        assert!(HttpGenerativeClient::new("http://x", "m", None, 0, Duration::from_secs(1)).is_ok());
    }

    #[tokio::test]
    async fn test_unreachable_backend_is_transient_error() {
        // Port 9 (discard) on loopback is essentially never listening
        let client = HttpGenerativeClient::new(
            "http://127.0.0.1:9",
            "llama3",
            None,
            100,
            Duration::from_secs(2),
        )
        .unwrap();
        let err = client.generate("hello").await.unwrap_err();
        assert!(err.is_retryable(), "unexpected error: {:?}", err);
    }
}
