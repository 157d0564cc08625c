//! Authenticated, retrying HTTP client for the remote store's REST API.

use std::time::Duration;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use rand::Rng;
use reqwest::{header, Method, StatusCode};
use serde_json::Value;

use super::error::ApiError;
use super::types::{RemoteCategory, RemoteProduct, RemoteVariation};

/// Versioned API root, prefixed to every authenticated path.
const API_ROOT: &str = "/wp-json/wc/v3";
/// Unversioned root used by the reachability probe.
const WP_ROOT: &str = "/wp-json/";
const CLIENT_USER_AGENT: &str = concat!("shopsync/", env!("CARGO_PKG_VERSION"));

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
/// Default total attempts per request (first try included).
pub const DEFAULT_MAX_RETRIES: u32 = 3;

const BACKOFF_BASE_MS: u64 = 500;
const BACKOFF_CAP_MS: u64 = 10_000;
const BACKOFF_JITTER_MS: u64 = 1_000;

/// Read access to the remote catalog, as the reconciler consumes it.
///
/// Implemented by [`WooClient`]; sync tests swap in scripted fakes.
#[allow(async_fn_in_trait)]
pub trait CatalogApi {
    /// Fetch one page of the category listing.
    async fn list_categories(
        &self,
        page: u32,
        per_page: usize,
    ) -> Result<Vec<RemoteCategory>, ApiError>;

    /// Fetch one page of the product listing.
    async fn list_products(
        &self,
        page: u32,
        per_page: usize,
    ) -> Result<Vec<RemoteProduct>, ApiError>;

    /// Fetch the variation listing for one product (single request).
    async fn list_variations(
        &self,
        product_remote_id: &str,
        per_page: usize,
    ) -> Result<Vec<RemoteVariation>, ApiError>;
}

/// HTTP client bound to one store's base URL and API credentials.
///
/// Transient failures (network errors, timeouts, 5xx, 429) are retried with
/// exponential backoff below the status-translation layer; permanent
/// failures (bad credentials, missing resources) surface immediately as
/// [`ApiError`] without consuming retry budget.
#[derive(Clone)]
pub struct WooClient {
    base_url: String,
    auth_header: String,
    max_retries: u32,
    client: reqwest::Client,
}

impl std::fmt::Debug for WooClient {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("WooClient")
            .field("base_url", &self.base_url)
            .field("auth_header", &"[REDACTED]")
            .field("max_retries", &self.max_retries)
            .finish_non_exhaustive()
    }
}

impl WooClient {
    /// Build a client with the default timeout and retry budget.
    pub fn new(
        base_url: impl Into<String>,
        consumer_key: &str,
        consumer_secret: &str,
    ) -> Result<Self, ApiError> {
        Self::with_config(
            base_url,
            consumer_key,
            consumer_secret,
            DEFAULT_TIMEOUT,
            DEFAULT_MAX_RETRIES,
        )
    }

    /// Build a client with an explicit timeout and retry budget.
    pub fn with_config(
        base_url: impl Into<String>,
        consumer_key: &str,
        consumer_secret: &str,
        timeout: Duration,
        max_retries: u32,
    ) -> Result<Self, ApiError> {
        let base_url = normalize_base_url(&base_url.into())?;
        if consumer_key.trim().is_empty() || consumer_secret.trim().is_empty() {
            return Err(ApiError::InvalidConfiguration(
                "consumer key and secret must not be empty".to_string(),
            ));
        }
        let credentials = BASE64.encode(format!("{consumer_key}:{consumer_secret}"));
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|error| {
                ApiError::InvalidConfiguration(format!("failed to build HTTP client: {error}"))
            })?;
        Ok(Self {
            base_url,
            auth_header: format!("Basic {credentials}"),
            max_retries: max_retries.max(1),
            client,
        })
    }

    /// The normalized base URL this client talks to.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Authenticated GET under the versioned API root.
    pub async fn get(&self, path: &str) -> Result<Value, ApiError> {
        self.request(Method::GET, path, None).await
    }

    /// Authenticated POST under the versioned API root.
    pub async fn post(&self, path: &str, body: &Value) -> Result<Value, ApiError> {
        self.request(Method::POST, path, Some(body)).await
    }

    /// Authenticated PUT under the versioned API root.
    pub async fn put(&self, path: &str, body: &Value) -> Result<Value, ApiError> {
        self.request(Method::PUT, path, Some(body)).await
    }

    /// Authenticated DELETE under the versioned API root.
    pub async fn delete(&self, path: &str) -> Result<Value, ApiError> {
        self.request(Method::DELETE, path, None).await
    }

    /// Unauthenticated GET to the unversioned API root; returns the raw
    /// HTTP status. Used by the reachability probe.
    pub async fn fetch_wp_root_status(&self) -> Result<u16, ApiError> {
        let url = format!("{}{WP_ROOT}", self.base_url);
        let response = self.execute_with_retry(Method::GET, &url, None, false).await?;
        Ok(response.status().as_u16())
    }

    /// Authenticated GET to the versioned API root; returns the raw HTTP
    /// status. Used by the credential probe.
    pub async fn fetch_api_root_status(&self) -> Result<u16, ApiError> {
        let url = format!("{}{API_ROOT}", self.base_url);
        let response = self.execute_with_retry(Method::GET, &url, None, true).await?;
        Ok(response.status().as_u16())
    }

    async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<Value, ApiError> {
        let url = format!("{}{API_ROOT}{path}", self.base_url);
        let response = self.execute_with_retry(method, &url, body, true).await?;
        let status = response.status();

        if status.is_success() {
            return response
                .json::<Value>()
                .await
                .map_err(|error| ApiError::Decode(error.to_string()));
        }

        let retry_after = response
            .headers()
            .get(header::RETRY_AFTER)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.parse::<u64>().ok());
        let body = response.json::<Value>().await.ok();
        Err(translate_status(status, retry_after, body))
    }

    /// Send one request, retrying network failures and 5xx/429 responses.
    ///
    /// The last 5xx/429 response is returned as-is once the budget is
    /// spent; status translation happens one layer up.
    async fn execute_with_retry(
        &self,
        method: Method,
        url: &str,
        body: Option<&Value>,
        authenticated: bool,
    ) -> Result<reqwest::Response, ApiError> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            let mut request = self
                .client
                .request(method.clone(), url)
                .header(header::USER_AGENT, CLIENT_USER_AGENT)
                .header(header::CONTENT_TYPE, "application/json");
            if authenticated {
                request = request.header(header::AUTHORIZATION, &self.auth_header);
            }
            if let Some(body) = body {
                request = request.json(body);
            }

            match request.send().await {
                Ok(response) => {
                    let status = response.status();
                    let retryable = status.is_server_error()
                        || status == StatusCode::TOO_MANY_REQUESTS;
                    if retryable && attempt < self.max_retries {
                        tracing::debug!(%url, status = status.as_u16(), attempt, "retrying request");
                        tokio::time::sleep(backoff_delay(attempt)).await;
                        continue;
                    }
                    return Ok(response);
                }
                Err(error) if attempt < self.max_retries => {
                    tracing::debug!(%url, %error, attempt, "request failed, retrying");
                    tokio::time::sleep(backoff_delay(attempt)).await;
                }
                Err(error) => {
                    return Err(ApiError::Network(format!("request to {url} failed: {error}")));
                }
            }
        }
    }
}

impl CatalogApi for WooClient {
    async fn list_categories(
        &self,
        page: u32,
        per_page: usize,
    ) -> Result<Vec<RemoteCategory>, ApiError> {
        let value = self
            .get(&format!(
                "/products/categories?page={page}&per_page={per_page}&hide_empty=false"
            ))
            .await?;
        serde_json::from_value(value)
            .map_err(|error| ApiError::Decode(format!("category listing: {error}")))
    }

    async fn list_products(
        &self,
        page: u32,
        per_page: usize,
    ) -> Result<Vec<RemoteProduct>, ApiError> {
        let value = self
            .get(&format!("/products?page={page}&per_page={per_page}"))
            .await?;
        let Value::Array(entries) = value else {
            return Err(ApiError::Decode("product listing is not an array".to_string()));
        };
        entries
            .into_iter()
            .map(RemoteProduct::from_value)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|error| ApiError::Decode(format!("product listing: {error}")))
    }

    async fn list_variations(
        &self,
        product_remote_id: &str,
        per_page: usize,
    ) -> Result<Vec<RemoteVariation>, ApiError> {
        let value = self
            .get(&format!(
                "/products/{product_remote_id}/variations?per_page={per_page}"
            ))
            .await?;
        serde_json::from_value(value)
            .map_err(|error| ApiError::Decode(format!("variation listing: {error}")))
    }
}

/// Translate a non-2xx status into the domain error taxonomy.
fn translate_status(status: StatusCode, retry_after: Option<u64>, body: Option<Value>) -> ApiError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ApiError::Auth {
            status: status.as_u16(),
        },
        StatusCode::NOT_FOUND => ApiError::NotFound,
        StatusCode::TOO_MANY_REQUESTS => ApiError::RateLimited { retry_after },
        _ => ApiError::Http {
            status: status.as_u16(),
            body,
        },
    }
}

/// Deterministic part of the backoff schedule: `base * 2^(attempt-1)`,
/// capped at 10 seconds.
fn backoff_base(attempt: u32) -> Duration {
    let exponent = attempt.saturating_sub(1).min(16);
    let millis = BACKOFF_BASE_MS.saturating_mul(1 << exponent).min(BACKOFF_CAP_MS);
    Duration::from_millis(millis)
}

/// Backoff for the given 1-based attempt, with up to 1s of random jitter.
fn backoff_delay(attempt: u32) -> Duration {
    let jitter = rand::thread_rng().gen_range(0..BACKOFF_JITTER_MS);
    backoff_base(attempt) + Duration::from_millis(jitter)
}

/// Require an http(s) scheme and strip any trailing slash.
fn normalize_base_url(raw: &str) -> Result<String, ApiError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ApiError::InvalidConfiguration(
            "base URL must not be empty".to_string(),
        ));
    }
    if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
        return Err(ApiError::InvalidConfiguration(
            "base URL must include http:// or https://".to_string(),
        ));
    }
    Ok(trimmed.trim_end_matches('/').to_string())
}
