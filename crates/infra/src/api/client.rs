//! Control-plane API client
//!
//! Thin JSON layer over [`HttpClient`]: bearer authentication, per-request
//! timeout, status classification and body decoding. Reads and deletes use
//! the retrying transport; creates are sent exactly once.

use std::sync::Arc;
use std::time::Duration;

use cdnbulk_domain::constants::DEFAULT_REQUEST_TIMEOUT_SECS;
use reqwest::{Method, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, instrument};
use url::Url;

use super::auth::AccessTokenProvider;
use super::errors::ApiError;
use crate::http::HttpClient;

/// Configuration for API client
#[derive(Debug, Clone)]
pub struct ApiClientConfig {
    /// Base URL of the control-plane API
    pub base_url: String,
    /// Timeout for a single API call, retries included
    pub timeout: Duration,
    /// Attempts for retryable calls (initial try + retries)
    pub max_attempts: usize,
    /// Backoff before the first retry; doubles on each further retry
    pub base_backoff: Duration,
}

impl Default for ApiClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            max_attempts: 3,
            base_backoff: Duration::from_millis(200),
        }
    }
}

/// Whether a request may be repeated on transient failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Delivery {
    Retrying,
    Once,
}

/// Authenticated JSON client for the control-plane
pub struct ApiClient {
    http_client: HttpClient,
    auth: Arc<dyn AccessTokenProvider>,
    base_url: Url,
    timeout: Duration,
}

impl ApiClient {
    /// Create a new API client
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Config` if the base URL is invalid or the HTTP
    /// client cannot be built.
    pub fn new(
        config: ApiClientConfig,
        auth: Arc<dyn AccessTokenProvider>,
    ) -> Result<Self, ApiError> {
        let base_url = Url::parse(&config.base_url)
            .map_err(|e| ApiError::Config(format!("invalid base URL {:?}: {e}", config.base_url)))?;

        let http_client = HttpClient::builder()
            .timeout(config.timeout)
            .max_attempts(config.max_attempts)
            .base_backoff(config.base_backoff)
            .build()
            .map_err(|e| ApiError::Config(format!("Failed to build HttpClient: {e}")))?;

        Ok(Self { http_client, auth, base_url, timeout: config.timeout })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Execute a GET request, retrying transient failures
    #[instrument(skip(self), fields(path = %path))]
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let response = self.execute(Method::GET, path, None::<&()>, Delivery::Retrying).await?;
        Self::decode(response).await
    }

    /// Execute a POST request exactly once
    ///
    /// A timeout or connection failure here is ambiguous: the server may have
    /// acted on the request. The error is returned as is and nothing is
    /// retried.
    #[instrument(skip(self, body), fields(path = %path))]
    pub async fn post<B: Serialize, R: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<R, ApiError> {
        let response = self.execute(Method::POST, path, Some(body), Delivery::Once).await?;
        Self::decode(response).await
    }

    /// Execute a DELETE request, retrying transient failures
    #[instrument(skip(self), fields(path = %path))]
    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let response = self.execute(Method::DELETE, path, None::<&()>, Delivery::Retrying).await?;
        Self::decode(response).await
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url.as_str().trim_end_matches('/'), path.trim_start_matches('/'))
    }

    async fn execute<B: Serialize>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
        delivery: Delivery,
    ) -> Result<Response, ApiError> {
        let url = self.url(path);
        let token = self.auth.access_token().await?;

        let mut request = self
            .http_client
            .request(method.clone(), &url)
            .bearer_auth(token)
            .header("Accept", "application/json");
        if let Some(body) = body {
            request = request.json(body);
        }

        debug!(%method, url = %url, ?delivery, "API request");
        let send = async {
            match delivery {
                Delivery::Retrying => self.http_client.send(request).await,
                Delivery::Once => self.http_client.send_once(request).await,
            }
        };
        let response = match tokio::time::timeout(self.timeout, send).await {
            Ok(Ok(response)) => response,
            Ok(Err(err)) => return Err(ApiError::from(err)),
            Err(_) => return Err(ApiError::Timeout(self.timeout)),
        };

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Self::map_status_error(status, &url, body));
        }
        Ok(response)
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| ApiError::Network(format!("Failed to read response body: {e}")))?;

        // 204/205 and empty bodies decode from null, so `()` and `Option<T>` work
        if status == StatusCode::NO_CONTENT
            || status == StatusCode::RESET_CONTENT
            || bytes.iter().all(u8::is_ascii_whitespace)
        {
            return serde_json::from_value(serde_json::Value::Null).map_err(|_| {
                ApiError::Decode(format!("empty response ({}) where a body was expected", status.as_u16()))
            });
        }

        serde_json::from_slice(&bytes).map_err(|e| ApiError::Decode(format!("Failed to parse response: {e}")))
    }

    fn map_status_error(status: StatusCode, url: &str, body: String) -> ApiError {
        let message = if body.is_empty() {
            format!("{url} returned status {status}")
        } else {
            format!("{url} returned status {status}: {body}")
        };

        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ApiError::Auth(message),
            StatusCode::NOT_FOUND => ApiError::NotFound(message),
            StatusCode::TOO_MANY_REQUESTS => ApiError::RateLimit(message),
            s if s.is_server_error() => ApiError::Server(message),
            s if s.is_client_error() => ApiError::Client(message),
            _ => ApiError::Network(message),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::api::auth::StaticTokenProvider;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Echo {
        message: String,
    }

    fn client(server: &MockServer) -> ApiClient {
        let config = ApiClientConfig {
            base_url: server.uri(),
            base_backoff: Duration::from_millis(5),
            ..Default::default()
        };
        ApiClient::new(config, Arc::new(StaticTokenProvider::new("test-token"))).unwrap()
    }

    #[tokio::test]
    async fn get_sends_bearer_token_and_decodes_json() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/echo"))
            .and(header("Authorization", "Bearer test-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"message": "hi"})))
            .mount(&server)
            .await;

        let echo: Echo = client(&server).get("/echo").await.unwrap();
        assert_eq!(echo.message, "hi");
    }

    #[tokio::test]
    async fn post_is_not_retried_on_server_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/create"))
            .and(body_json(json!({"n": 1})))
            .respond_with(ResponseTemplate::new(502))
            .expect(1)
            .mount(&server)
            .await;

        let err = client(&server).post::<_, Echo>("/create", &json!({"n": 1})).await.unwrap_err();
        assert!(matches!(err, ApiError::Server(_)));
    }

    #[tokio::test]
    async fn get_is_retried_on_server_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/flaky"))
            .respond_with(ResponseTemplate::new(503))
            .expect(3)
            .mount(&server)
            .await;

        let err = client(&server).get::<Echo>("/flaky").await.unwrap_err();
        assert!(matches!(err, ApiError::Server(_)));
    }

    #[tokio::test]
    async fn status_codes_are_classified() {
        let server = MockServer::start().await;
        for (route, code) in [("/auth", 401), ("/missing", 404), ("/busy", 429), ("/bad", 422)] {
            Mock::given(path(route)).respond_with(ResponseTemplate::new(code)).mount(&server).await;
        }
        let client = client(&server);

        assert!(matches!(client.get::<Echo>("/auth").await, Err(ApiError::Auth(_))));
        assert!(matches!(client.get::<Echo>("/missing").await, Err(ApiError::NotFound(_))));
        assert!(matches!(client.get::<Echo>("/busy").await, Err(ApiError::RateLimit(_))));
        assert!(matches!(client.get::<Echo>("/bad").await, Err(ApiError::Client(_))));
    }

    #[tokio::test]
    async fn no_content_decodes_to_unit() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE")).respond_with(ResponseTemplate::new(204)).mount(&server).await;

        let result: Result<(), ApiError> = client(&server).delete("/jobs/1").await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn malformed_body_is_a_decode_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
            .mount(&server)
            .await;

        let err = client(&server).get::<Echo>("/echo").await.unwrap_err();
        assert!(matches!(err, ApiError::Decode(_)));
    }

    #[test]
    fn invalid_base_url_is_a_config_error() {
        let config = ApiClientConfig { base_url: "not a url".into(), ..Default::default() };
        let result = ApiClient::new(config, Arc::new(StaticTokenProvider::new("t")));
        assert!(matches!(result, Err(ApiError::Config(_))));
    }
}
