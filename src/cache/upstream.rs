//! HTTP client for upstream JSON APIs

use reqwest::Client;
use serde_json::Value;
use std::time::Duration;

use crate::error::FetchError;

/// Thin wrapper over `reqwest::Client` that applies a per-request timeout and the
/// configured `User-Agent`, and treats non-2xx responses as failures
#[derive(Debug, Clone)]
pub struct UpstreamClient {
    client: Client,
}

impl UpstreamClient {
    /// Builds a client that sends `user_agent` on every request
    pub fn new(user_agent: &str) -> Result<Self, reqwest::Error> {
        let client = Client::builder().user_agent(user_agent).build()?;
        Ok(Self { client })
    }

    /// GETs `url` and decodes the body as JSON
    ///
    /// The response shape is not inspected.
    pub async fn get_json(&self, url: &str, timeout: Duration) -> Result<Value, FetchError> {
        let timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        let classify = |e: reqwest::Error| FetchError::from_reqwest(url, timeout_ms, e);

        let response = self
            .client
            .get(url)
            .timeout(timeout)
            .send()
            .await
            .map_err(classify)?
            .error_for_status()
            .map_err(classify)?;

        response.json::<Value>().await.map_err(classify)
    }
}
