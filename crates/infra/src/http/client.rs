use std::time::Duration;

use cdnbulk_domain::constants::DEFAULT_REQUEST_TIMEOUT_SECS;
use cdnbulk_domain::BulkError;
use reqwest::{Client as ReqwestClient, Method, RequestBuilder, Response, StatusCode};
use tracing::debug;

use crate::errors::InfraError;

const USER_AGENT: &str = concat!("cdnbulk/", env!("CARGO_PKG_VERSION"));

/// When and how long to wait before repeating a request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, initial try included. Never below 1.
    pub max_attempts: usize,
    /// Delay before the first retry; doubles on each further retry
    pub base_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_attempts: 3, base_backoff: Duration::from_millis(200) }
    }
}

impl RetryPolicy {
    /// Backoff before retry number `retry` (1-based), capped at 2^8 times the
    /// base delay
    pub fn delay_for(&self, retry: usize) -> Duration {
        let shift = u32::try_from(retry.saturating_sub(1).min(8)).unwrap_or(8);
        self.base_backoff.saturating_mul(1u32 << shift)
    }

    /// Server errors and throttling are worth repeating; other statuses are
    /// final
    pub fn retries_status(status: StatusCode) -> bool {
        status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS
    }

    pub fn retries_error(err: &reqwest::Error) -> bool {
        err.is_timeout() || err.is_connect() || err.is_request()
    }
}

/// reqwest client with a retry policy.
///
/// [`HttpClient::send`] repeats transient failures with exponential backoff.
/// [`HttpClient::send_once`] never repeats and is meant for requests whose
/// side effects must not happen twice.
#[derive(Clone)]
pub struct HttpClient {
    client: ReqwestClient,
    retry: RetryPolicy,
}

impl HttpClient {
    pub fn builder() -> HttpClientBuilder {
        HttpClientBuilder::default()
    }

    /// Client with default timeout and retry policy
    pub fn new() -> Result<Self, BulkError> {
        Self::builder().build()
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    pub fn request<U>(&self, method: Method, url: U) -> RequestBuilder
    where
        U: reqwest::IntoUrl,
    {
        self.client.request(method, url)
    }

    /// Send, repeating transient failures per the retry policy.
    ///
    /// A non-success status that is not retried (or is still failing after
    /// the last attempt) is returned as a response, not an error.
    pub async fn send(&self, builder: RequestBuilder) -> Result<Response, BulkError> {
        let attempts = self.retry.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            let request = builder
                .try_clone()
                .ok_or_else(|| BulkError::Internal("streaming request bodies cannot be retried".into()))?
                .build()
                .map_err(into_bulk)?;
            let method = request.method().clone();
            let url = request.url().clone();
            let last_attempt = attempt >= attempts;

            match self.client.execute(request).await {
                Ok(response) if !last_attempt && RetryPolicy::retries_status(response.status()) => {
                    debug!(attempt, %method, %url, status = %response.status(), "retrying after status");
                }
                Ok(response) => {
                    debug!(attempt, %method, %url, status = %response.status(), "HTTP response");
                    return Ok(response);
                }
                Err(err) if !last_attempt && RetryPolicy::retries_error(&err) => {
                    debug!(attempt, %method, %url, error = %err, "retrying after transport error");
                }
                Err(err) => return Err(into_bulk(err)),
            }

            let delay = self.retry.delay_for(attempt);
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            attempt += 1;
        }
    }

    /// Send exactly once, whatever the outcome
    pub async fn send_once(&self, builder: RequestBuilder) -> Result<Response, BulkError> {
        let request = builder.build().map_err(into_bulk)?;
        let method = request.method().clone();
        let url = request.url().clone();

        let response = self.client.execute(request).await.map_err(|err| {
            debug!(%method, %url, error = %err, "HTTP request failed (not retried)");
            into_bulk(err)
        })?;
        debug!(%method, %url, status = %response.status(), "HTTP response");
        Ok(response)
    }
}

fn into_bulk(err: reqwest::Error) -> BulkError {
    BulkError::from(InfraError::from(err))
}

#[derive(Debug)]
pub struct HttpClientBuilder {
    timeout: Duration,
    retry: RetryPolicy,
}

impl Default for HttpClientBuilder {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            retry: RetryPolicy::default(),
        }
    }
}

impl HttpClientBuilder {
    /// Per-attempt timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn max_attempts(mut self, attempts: usize) -> Self {
        self.retry.max_attempts = attempts.max(1);
        self
    }

    pub fn base_backoff(mut self, backoff: Duration) -> Self {
        self.retry.base_backoff = backoff;
        self
    }

    pub fn build(self) -> Result<HttpClient, BulkError> {
        let client = ReqwestClient::builder()
            .timeout(self.timeout)
            .user_agent(USER_AGENT)
            .no_proxy()
            .build()
            .map_err(into_bulk)?;

        Ok(HttpClient { client, retry: self.retry })
    }
}
