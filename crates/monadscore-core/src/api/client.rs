//! API client for the Monad Score REST API.
//!
//! `ApiClient` sends the calls described in [`super::endpoints`] and turns
//! the service's answers into either an `ApiEnvelope` or a typed `ApiError`.

use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::{header, Client};
use tracing::{debug, warn};

use crate::models::ApiEnvelope;

use super::endpoints::{CallArgs, Endpoint};
use super::ApiError;

// ============================================================================
// Constants
// ============================================================================

/// Default base URL of the service backend.
pub const DEFAULT_API_URL: &str = "https://mscore.onrender.com";

/// Default web origin the backend expects requests to come from.
pub const DEFAULT_ORIGIN: &str = "https://monadscore.xyz";

/// Default HTTP request timeout in seconds.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 \
                          (KHTML, like Gecko) Chrome/122.0.0.0 Safari/537.36";

/// Maximum number of retries for rate-limited (429) requests.
const MAX_RATE_LIMIT_RETRIES: u32 = 3;

/// Initial backoff delay in milliseconds for rate limiting.
const INITIAL_BACKOFF_MS: u64 = 1000;

/// API client for Monad Score.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone, Debug)]
pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    /// Create a new API client sending browser-like headers for `origin`.
    pub fn new(base_url: &str, origin: &str, timeout: Duration) -> Result<Self> {
        let mut headers = header::HeaderMap::new();
        headers.insert(header::ACCEPT, header::HeaderValue::from_static("*/*"));
        headers.insert(
            header::ORIGIN,
            header::HeaderValue::from_str(origin.trim_end_matches('/'))
                .context("Invalid origin header value")?,
        );
        headers.insert(
            header::REFERER,
            header::HeaderValue::from_str(&format!("{}/", origin.trim_end_matches('/')))
                .context("Invalid referer header value")?,
        );

        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            base_url: normalize_base_url(base_url),
        })
    }

    /// Create a new ApiClient pointed at another backend, sharing the connection pool.
    pub fn with_base_url(&self, base_url: &str) -> Self {
        Self {
            client: self.client.clone(), // Cheap clone, shares connection pool
            base_url: normalize_base_url(base_url),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Issue one endpoint call.
    ///
    /// Rate-limited responses are retried here with exponential backoff;
    /// every other failure is returned to the caller for its own policy.
    pub async fn call(
        &self,
        endpoint: &Endpoint,
        args: &CallArgs<'_>,
        token: Option<&str>,
    ) -> Result<ApiEnvelope, ApiError> {
        let url = format!("{}{}", self.base_url, endpoint.path);
        let body = (endpoint.body)(args);
        let mut retries = 0;
        let mut backoff_ms = INITIAL_BACKOFF_MS;

        loop {
            let mut request = self
                .client
                .request(endpoint.method.as_reqwest(), &url)
                .json(&body);
            if endpoint.authorized {
                if let Some(token) = token {
                    request = request.bearer_auth(token);
                }
            }

            debug!(endpoint = endpoint.name, url = %url, "Sending request");
            let response = request.send().await?;

            match Self::check_response(endpoint, response).await {
                Err(ApiError::RateLimited) => {
                    retries += 1;
                    if retries > MAX_RATE_LIMIT_RETRIES {
                        return Err(ApiError::RateLimited);
                    }
                    warn!(endpoint = endpoint.name, retry = retries, backoff_ms = backoff_ms, "Rate limited, backing off");
                    tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
                    backoff_ms *= 2; // Exponential backoff
                }
                other => return other,
            }
        }
    }

    /// Turn a raw response into an envelope, applying the endpoint's success predicate.
    async fn check_response(
        endpoint: &Endpoint,
        response: reqwest::Response,
    ) -> Result<ApiEnvelope, ApiError> {
        let status = response.status();
        let text = response.text().await?;
        let parsed = serde_json::from_str::<ApiEnvelope>(&text);

        if !status.is_success() {
            let reason = parsed
                .ok()
                .and_then(|env| env.reason().map(str::to_string))
                .unwrap_or(text);
            return Err(ApiError::from_status(status, &reason));
        }

        let envelope = parsed.map_err(|e| {
            ApiError::InvalidResponse(format!("{} returned unparseable body: {}", endpoint.name, e))
        })?;

        if (endpoint.success)(&envelope) {
            Ok(envelope)
        } else {
            let reason = envelope
                .reason()
                .unwrap_or("response did not report success");
            Err(ApiError::from_rejection(reason))
        }
    }
}

fn normalize_base_url(base_url: &str) -> String {
    base_url.trim().trim_end_matches('/').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_base_url() {
        assert_eq!(normalize_base_url("https://mscore.onrender.com/"), "https://mscore.onrender.com");
        assert_eq!(normalize_base_url(" http://localhost:8080 "), "http://localhost:8080");
    }

    #[test]
    fn test_with_base_url_shares_settings() {
        let client = ApiClient::new(DEFAULT_API_URL, DEFAULT_ORIGIN, Duration::from_secs(5))
            .expect("client builds");
        assert_eq!(client.base_url(), DEFAULT_API_URL);

        let other = client.with_base_url("http://127.0.0.1:9000/");
        assert_eq!(other.base_url(), "http://127.0.0.1:9000");
    }

    #[test]
    fn test_rejects_bad_origin() {
        assert!(ApiClient::new(DEFAULT_API_URL, "bad\norigin", Duration::from_secs(5)).is_err());
    }
}
