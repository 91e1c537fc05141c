//! Shared HTTP plumbing for the video platform clients
//!
//! One `reqwest::Client` (user agent + timeout) and one rate limiter are
//! shared by the playlist, thumbnail and category clients so their requests
//! are spaced together.

use reqwest::StatusCode;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

use super::rate_limiter::RateLimiter;
use super::ClientError;

const USER_AGENT: &str = concat!(
    "Mozilla/5.0 (X11; Linux x86_64) tubeset/",
    env!("CARGO_PKG_VERSION")
);

/// Client and limiter shared by the platform clients
#[derive(Debug, Clone)]
pub struct PlatformHttp {
    client: reqwest::Client,
    rate_limiter: Arc<RateLimiter>,
}

impl PlatformHttp {
    pub fn new(timeout_secs: u64, request_interval_ms: u64) -> Result<Self, ClientError> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| ClientError::Network(e.to_string()))?;

        Ok(Self {
            client,
            rate_limiter: RateLimiter::shared(request_interval_ms),
        })
    }

    async fn throttle(&self, url: &str) {
        let held = self.rate_limiter.wait().await;
        tracing::debug!(url, held_ms = held.as_millis() as u64, "Request slot granted");
    }

    /// GET a page as text; any non-2xx status is an error
    pub async fn get_text(&self, url: &str) -> Result<String, ClientError> {
        self.throttle(url).await;

        let response = self
            .client
            .get(url)
            .header("Accept-Language", "en-US,en;q=0.9")
            .send()
            .await
            .map_err(|e| ClientError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        response
            .text()
            .await
            .map_err(|e| ClientError::Network(e.to_string()))
    }

    /// GET raw bytes; `Ok(None)` for any non-200 status
    pub async fn get_bytes(&self, url: &str) -> Result<Option<Vec<u8>>, ClientError> {
        self.throttle(url).await;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| ClientError::Network(e.to_string()))?;

        if response.status() != StatusCode::OK {
            tracing::debug!(url, status = response.status().as_u16(), "No content");
            return Ok(None);
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| ClientError::Network(e.to_string()))?;
        Ok(Some(bytes.to_vec()))
    }

    /// POST a JSON body and parse a JSON response
    pub async fn post_json(&self, url: &str, body: &Value) -> Result<Value, ClientError> {
        self.throttle(url).await;

        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|e| ClientError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| ClientError::Parse(e.to_string()))
    }
}
