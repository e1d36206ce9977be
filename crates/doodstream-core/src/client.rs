//! HTTP fetch collaborator for the extractor
//!
//! Defines the [`HttpFetcher`] seam the extractor talks through and a
//! rate-limited `reqwest` implementation with exponential backoff for
//! transient errors.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, IF_RANGE, RANGE};
use tokio::sync::Mutex;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::error::{ExtractorError, FetchError, Result};
use crate::types::RequestHeaders;

/// Whether a request may carry partial-content headers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangePolicy {
    /// Forward `Range`/`If-Range` if the caller set them
    Allow,
    /// Strip `Range`/`If-Range`; the full body is always requested
    Disabled,
}

/// A single GET request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub url: String,
    pub headers: RequestHeaders,
    pub range: RangePolicy,
}

impl FetchRequest {
    /// GET that leaves range headers untouched
    pub fn get(url: impl Into<String>, headers: RequestHeaders) -> Self {
        Self {
            url: url.into(),
            headers,
            range: RangePolicy::Allow,
        }
    }

    /// GET that always asks for the complete body
    pub fn get_full_body(url: impl Into<String>, headers: RequestHeaders) -> Self {
        Self {
            url: url.into(),
            headers,
            range: RangePolicy::Disabled,
        }
    }

    /// Headers that will actually go on the wire
    pub fn effective_headers(&self) -> RequestHeaders {
        let mut headers = self.headers.clone();
        if self.range == RangePolicy::Disabled {
            headers.remove(RANGE.as_str());
            headers.remove(IF_RANGE.as_str());
        }
        headers
    }
}

/// Status and text body of a completed request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchResponse {
    pub status: u16,
    pub body: String,
}

impl FetchResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Performs GET requests on behalf of an extractor
///
/// Implementations own timeouts and retry policy. Cancellation is
/// dropping the returned future.
#[async_trait]
pub trait HttpFetcher: Send + Sync {
    async fn fetch(&self, request: FetchRequest) -> std::result::Result<FetchResponse, FetchError>;
}

/// Configuration for the HTTP client
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Maximum requests per second, 0 disables limiting (default: 2.0)
    pub requests_per_second: f64,
    /// Request timeout in seconds (default: 30)
    pub timeout_secs: u64,
    /// Maximum retry attempts for transient errors (default: 2)
    pub max_retries: u32,
    /// First backoff delay, doubled per attempt (default: 1000)
    pub backoff_base_ms: u64,
    /// Client-wide User-Agent, overridden by a per-request header
    pub user_agent: Option<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            requests_per_second: 2.0,
            timeout_secs: 30,
            max_retries: 2,
            backoff_base_ms: 1000,
            user_agent: None,
        }
    }
}

/// Rate limiter to control request frequency
///
/// Ensures requests are spaced at least `min_interval` apart.
pub struct RateLimiter {
    min_interval: Duration,
    last_request: Arc<Mutex<Option<Instant>>>,
}

impl RateLimiter {
    /// Create a new rate limiter with the specified requests per second
    ///
    /// A non-positive rate yields a limiter that never waits. A rate too
    /// small for the interval to fit a `Duration` saturates at `Duration::MAX`.
    pub fn new(requests_per_second: f64) -> Self {
        let min_interval = if requests_per_second > 0.0 && requests_per_second.is_finite() {
            Duration::try_from_secs_f64(1.0 / requests_per_second).unwrap_or(Duration::MAX)
        } else {
            Duration::ZERO
        };
        Self {
            min_interval,
            last_request: Arc::new(Mutex::new(None)),
        }
    }

    /// Acquire permission to make a request
    ///
    /// If called before the minimum interval has passed since the last request,
    /// this method will sleep until the interval has elapsed.
    pub async fn acquire(&self) {
        let mut last = self.last_request.lock().await;

        if let Some(previous) = *last {
            let elapsed = previous.elapsed();
            if elapsed < self.min_interval {
                sleep(self.min_interval - elapsed).await;
            }
        }

        *last = Some(Instant::now());
    }

    /// Get the minimum interval between requests
    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }
}

/// `reqwest`-backed [`HttpFetcher`]
///
/// Handles:
/// - Rate limiting to avoid hammering the host
/// - Retries with exponential backoff on 429, 5xx, timeouts and connect errors
/// - Range stripping for [`RangePolicy::Disabled`] requests
pub struct ReqwestFetcher {
    client: reqwest::Client,
    rate_limiter: RateLimiter,
    max_retries: u32,
    backoff_base: Duration,
}

impl ReqwestFetcher {
    /// Create a new fetcher with default configuration
    pub fn new() -> Result<Self> {
        Self::with_config(ClientConfig::default())
    }

    /// Create a new fetcher with custom configuration
    pub fn with_config(config: ClientConfig) -> Result<Self> {
        let mut builder =
            reqwest::Client::builder().timeout(Duration::from_secs(config.timeout_secs));
        if let Some(user_agent) = &config.user_agent {
            builder = builder.user_agent(user_agent.as_str());
        }

        let client = builder
            .build()
            .map_err(|e| ExtractorError::InvalidConfig(format!("HTTP client: {}", e)))?;

        Ok(Self {
            client,
            rate_limiter: RateLimiter::new(config.requests_per_second),
            max_retries: config.max_retries,
            backoff_base: Duration::from_millis(config.backoff_base_ms),
        })
    }

    /// Delay before retry number `attempt + 1`: base, 2x base, 4x base ...
    fn backoff_for(&self, attempt: u32) -> Duration {
        self.backoff_base.saturating_mul(1u32 << attempt.min(16))
    }

    fn header_map(headers: &RequestHeaders) -> std::result::Result<HeaderMap, FetchError> {
        let mut map = HeaderMap::with_capacity(headers.len());
        for (name, value) in headers.iter() {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|_| FetchError::InvalidHeader(name.to_string()))?;
            let value = HeaderValue::from_str(value)
                .map_err(|_| FetchError::InvalidHeader(name.as_str().to_string()))?;
            map.insert(name, value);
        }
        Ok(map)
    }

    /// Perform a single attempt
    async fn do_fetch(
        &self,
        url: &str,
        headers: HeaderMap,
    ) -> std::result::Result<FetchResponse, FetchError> {
        let response = self.client.get(url).headers(headers).send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;
        Ok(FetchResponse { status, body })
    }

    fn is_retryable_status(status: u16) -> bool {
        status == 429 || (500..600).contains(&status)
    }

    /// Check if an error is retryable
    fn is_retryable(error: &FetchError) -> bool {
        match error {
            FetchError::Http(e) => e.is_timeout() || e.is_connect(),
            FetchError::Status(status) => Self::is_retryable_status(*status),
            FetchError::InvalidHeader(_) | FetchError::EmptyBody => false,
        }
    }

    /// Get a reference to the rate limiter (for testing)
    pub fn rate_limiter(&self) -> &RateLimiter {
        &self.rate_limiter
    }
}

#[async_trait]
impl HttpFetcher for ReqwestFetcher {
    async fn fetch(&self, request: FetchRequest) -> std::result::Result<FetchResponse, FetchError> {
        let headers = Self::header_map(&request.effective_headers())?;
        let mut attempt = 0;

        loop {
            self.rate_limiter.acquire().await;
            debug!(url = %request.url, range = ?request.range, attempt, "GET");

            let outcome = self.do_fetch(&request.url, headers.clone()).await;
            let retryable = match &outcome {
                Ok(response) => Self::is_retryable_status(response.status),
                Err(e) => Self::is_retryable(e),
            };

            if !retryable || attempt >= self.max_retries {
                return outcome;
            }

            let backoff = self.backoff_for(attempt);
            warn!(url = %request.url, attempt, ?backoff, "transient failure, retrying");
            sleep(backoff).await;
            attempt += 1;
        }
    }
}
