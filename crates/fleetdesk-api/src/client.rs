//! Shared HTTP client and the authenticated API client

use fleetdesk_observability::Metrics;
use reqwest::{Client, ClientBuilder, Method};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::RwLock;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::{ApiError, Result};

/// HTTP client configuration
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// Request timeout in seconds
    pub timeout_secs: u64,

    /// Connection timeout in seconds
    pub connect_timeout_secs: u64,

    /// Maximum number of idle connections per host
    pub pool_max_idle_per_host: usize,

    /// User agent string
    pub user_agent: String,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            connect_timeout_secs: 10,
            pool_max_idle_per_host: 8,
            user_agent: format!("Fleetdesk/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Create a configured HTTP client with connection pooling
pub fn create_client(config: &HttpClientConfig) -> Result<Client> {
    ClientBuilder::new()
        .timeout(Duration::from_secs(config.timeout_secs))
        .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
        .pool_max_idle_per_host(config.pool_max_idle_per_host)
        // Expire idle connections before the backend's keep-alive closes them
        .pool_idle_timeout(Duration::from_secs(90))
        .user_agent(&config.user_agent)
        .use_rustls_tls()
        .build()
        .map_err(|e| ApiError::Config(format!("Failed to create HTTP client: {}", e)))
}

/// Upper bound for the wait between retries
const MAX_BACKOFF_MS: u64 = 10_000;

/// Exponential backoff: 100ms, 200ms, 400ms, capped at `MAX_BACKOFF_MS`
fn backoff_delay(attempt: u32) -> Duration {
    let factor = 2u64.saturating_pow(attempt.saturating_sub(1));
    Duration::from_millis(factor.saturating_mul(100).min(MAX_BACKOFF_MS))
}

/// Retry policy for transient errors
pub async fn with_retry<F, Fut, T>(max_retries: u32, operation: F) -> Result<T>
where
    F: Fn() -> Fut,
    Fut: std::future::Future<Output = Result<T>>,
{
    let mut attempt = 0;

    loop {
        match operation().await {
            Ok(result) => return Ok(result),
            Err(e) if e.is_retryable() && attempt < max_retries => {
                attempt += 1;
                let backoff = backoff_delay(attempt);
                warn!(
                    "Request failed (attempt {}/{}), retrying in {}ms: {}",
                    attempt,
                    max_retries.saturating_add(1),
                    backoff.as_millis(),
                    e
                );
                tokio::time::sleep(backoff).await;
            }
            Err(e) => return Err(e),
        }
    }
}

/// Authenticated JSON client for the dashboard backend.
///
/// All paths are relative to `<base_url>/api/`. When a token is set it is
/// sent as a bearer `Authorization` header.
pub struct ApiClient {
    base_url: String,
    http: Client,
    token: RwLock<Option<String>>,
    metrics: Option<Metrics>,
}

impl ApiClient {
    /// Create a client for the given backend
    ///
    /// # Errors
    /// - `ApiError::Config` if the base URL isn't http(s) or the client can't be built
    pub fn new(base_url: impl Into<String>, config: &HttpClientConfig) -> Result<Self> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(ApiError::Config(format!(
                "Base URL must start with http:// or https://, got '{}'",
                base_url
            )));
        }

        Ok(Self {
            base_url,
            http: create_client(config)?,
            token: RwLock::new(None),
            metrics: None,
        })
    }

    pub fn with_metrics(mut self, metrics: Metrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn set_token(&self, token: impl Into<String>) {
        let token = token.into();
        debug!("Setting bearer token (length: {} chars)", token.len());
        *self.token.write().unwrap_or_else(|e| e.into_inner()) = Some(token);
    }

    pub fn clear_token(&self) {
        *self.token.write().unwrap_or_else(|e| e.into_inner()) = None;
    }

    pub fn has_token(&self) -> bool {
        self.token
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .is_some()
    }

    fn bearer(&self) -> Option<String> {
        self.token.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Absolute URL for an API path
    pub fn url(&self, path: &str) -> String {
        format!("{}/api/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Send a request and return the JSON body (`Null` for empty bodies)
    pub async fn send(
        &self,
        method: Method,
        path: &str,
        query: Option<&str>,
        body: Option<&Value>,
    ) -> Result<Value> {
        let mut url = self.url(path);
        if let Some(query) = query.filter(|q| !q.is_empty()) {
            url.push('?');
            url.push_str(query);
        }

        let request_id = uuid::Uuid::new_v4().to_string();
        debug!("{} {} (request_id: {})", method, url, request_id);

        let mut request = self
            .http
            .request(method.clone(), &url)
            .header("x-request-id", &request_id)
            .header("accept", "application/json");
        if let Some(token) = self.bearer() {
            request = request.bearer_auth(token);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let started = Instant::now();
        let result = self.execute(request).await;
        self.record(&method, path, started, &result);
        result
    }

    async fn execute(&self, request: reqwest::RequestBuilder) -> Result<Value> {
        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            return Err(ApiError::from_response(status.as_u16(), &text));
        }

        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&text)
            .map_err(|e| ApiError::InvalidResponse(format!("Response is not valid JSON: {}", e)))
    }

    fn record(&self, method: &Method, path: &str, started: Instant, result: &Result<Value>) {
        let Some(metrics) = &self.metrics else {
            return;
        };
        let family = path
            .trim_start_matches('/')
            .split('/')
            .next()
            .unwrap_or_default();
        let failure = match result {
            Ok(_) => None,
            Err(e) => Some(e.status().unwrap_or(0)),
        };
        metrics.record_api_request(
            method.as_str(),
            family,
            started.elapsed().as_secs_f64(),
            failure,
        );
    }

    pub async fn get_json<T: DeserializeOwned>(&self, path: &str, query: Option<&str>) -> Result<T> {
        let value = self.send(Method::GET, path, query, None).await?;
        decode(value)
    }

    pub async fn post_json<B: Serialize, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T> {
        let body = encode(body)?;
        let value = self.send(Method::POST, path, None, Some(&body)).await?;
        decode(value)
    }

    pub async fn put_json<B: Serialize, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T> {
        let body = encode(body)?;
        let value = self.send(Method::PUT, path, None, Some(&body)).await?;
        decode(value)
    }

    pub async fn delete(&self, path: &str) -> Result<Value> {
        self.send(Method::DELETE, path, None, None).await
    }
}

fn encode<B: Serialize>(body: &B) -> Result<Value> {
    serde_json::to_value(body)
        .map_err(|e| ApiError::InvalidResponse(format!("Failed to encode request body: {}", e)))
}

fn decode<T: DeserializeOwned>(value: Value) -> Result<T> {
    serde_json::from_value(value)
        .map_err(|e| ApiError::InvalidResponse(format!("Unexpected response shape: {}", e)))
}
