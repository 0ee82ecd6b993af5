//! HTTP client for Partner API communication.
//!
//! This module provides the [`HttpClient`] type for making authenticated
//! requests to the Partner API with automatic retry handling.

use std::collections::HashMap;
use std::time::Duration;

use crate::clients::errors::{HttpError, HttpResponseError, MaxHttpRetriesExceededError};
use crate::clients::http_request::{HttpRequest, JSON_CONTENT_TYPE};
use crate::clients::http_response::HttpResponse;
use crate::config::TapConfig;
use crate::throttle::wait_seconds;

/// Fixed retry wait time in seconds.
pub const RETRY_WAIT_TIME: u64 = 1;

/// Tap version from Cargo.toml.
pub const TAP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// HTTP client bound to one Partner organization's API endpoint.
///
/// The client handles:
/// - Base URI and path construction from the config
///   (`{api_url}/{partner_id}/api/{version}`)
/// - Default headers including `User-Agent` and `X-Shopify-Access-Token`
/// - Automatic retry logic for 429 and 500 responses
///
/// # Example
///
/// ```rust
/// use tap_shopify_partner::{ApiKey, PartnerId, TapConfig};
/// use tap_shopify_partner::clients::HttpClient;
///
/// let config = TapConfig::builder()
///     .api_key(ApiKey::new("token").unwrap())
///     .partner_id(PartnerId::new(1234).unwrap())
///     .build()
///     .unwrap();
///
/// let client = HttpClient::new(&config).unwrap();
/// assert_eq!(client.base_uri(), "https://partners.shopify.com");
/// assert_eq!(client.base_path(), "/1234/api/2024-04");
/// ```
#[derive(Debug)]
pub struct HttpClient {
    client: reqwest::Client,
    base_uri: String,
    base_path: String,
    default_headers: HashMap<String, String>,
}

// Verify HttpClient is Send + Sync at compile time
const _: fn() = || {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<HttpClient>();
};

impl HttpClient {
    /// Creates a new HTTP client for the configured partner.
    ///
    /// # Errors
    ///
    /// Returns [`HttpError::Network`] if the underlying reqwest client cannot
    /// be created (e.g., TLS initialization failure).
    pub fn new(config: &TapConfig) -> Result<Self, HttpError> {
        let rust_version = env!("CARGO_PKG_RUST_VERSION");
        let user_agent = config.user_agent().map_or_else(
            || format!("tap-shopify-partner v{TAP_VERSION} | Rust {rust_version}"),
            String::from,
        );

        let mut default_headers = HashMap::new();
        default_headers.insert("User-Agent".to_string(), user_agent);
        default_headers.insert("Accept".to_string(), "application/json".to_string());
        default_headers.insert(
            "X-Shopify-Access-Token".to_string(),
            config.api_key().as_ref().to_string(),
        );

        let client = reqwest::Client::builder().use_rustls_tls().build()?;

        Ok(Self {
            client,
            base_uri: config.api_url().base().to_string(),
            base_path: config.base_path(),
            default_headers,
        })
    }

    /// Returns the base URI for this client.
    #[must_use]
    pub fn base_uri(&self) -> &str {
        &self.base_uri
    }

    /// Returns the base path for this client.
    #[must_use]
    pub fn base_path(&self) -> &str {
        &self.base_path
    }

    /// Returns the default headers for this client.
    #[must_use]
    pub const fn default_headers(&self) -> &HashMap<String, String> {
        &self.default_headers
    }

    /// Sends an HTTP request to the Partner API.
    ///
    /// Responses with status 429 or 500 are retried until `request.tries`
    /// attempts have been made. A 429 waits for `Retry-After` when present;
    /// everything else waits [`RETRY_WAIT_TIME`] seconds.
    ///
    /// # Errors
    ///
    /// Returns [`HttpError`] if:
    /// - Request validation fails (`InvalidRequest`)
    /// - Network error occurs (`Network`)
    /// - Non-2xx response received (`Response`)
    /// - Max retries exceeded (`MaxRetries`)
    pub async fn request(&self, request: HttpRequest) -> Result<HttpResponse, HttpError> {
        request.verify()?;

        let url = format!("{}{}/{}", self.base_uri, self.base_path, request.path);

        let mut headers = self.default_headers.clone();
        headers.insert("Content-Type".to_string(), JSON_CONTENT_TYPE.to_string());
        let body = request.body.to_string();

        let mut tries: u32 = 0;
        loop {
            tries += 1;

            let mut req_builder = self.client.post(&url);
            for (key, value) in &headers {
                req_builder = req_builder.header(key, value);
            }
            req_builder = req_builder.body(body.clone());

            let res = req_builder.send().await?;

            let code = res.status().as_u16();
            let res_headers = Self::parse_response_headers(res.headers());
            let body_text = res.text().await?;
            let body = Self::parse_body(code, &body_text);

            let response = HttpResponse::new(code, res_headers, body);

            if let Some(reason) = response.deprecation_reason() {
                tracing::warn!(
                    "Deprecated request to Shopify Partner API at {}, received reason: {}",
                    request.path,
                    reason
                );
            }

            if response.is_ok() {
                return Ok(response);
            }

            let error_message = Self::serialize_error(&response);
            let error_reference = response.request_id().map(String::from);

            let should_retry = code == 429 || code == 500;
            if !should_retry || request.tries == 1 {
                return Err(HttpError::Response(HttpResponseError {
                    code,
                    message: error_message,
                    error_reference,
                }));
            }

            if tries >= request.tries {
                return Err(HttpError::MaxRetries(MaxHttpRetriesExceededError {
                    code,
                    tries: request.tries,
                    message: error_message,
                    error_reference,
                }));
            }

            let delay = Self::calculate_retry_delay(&response, code);
            tracing::warn!(
                "Partner API responded {} (attempt {}/{}), retrying in {:.1}s",
                code,
                tries,
                request.tries,
                delay.as_secs_f64()
            );
            tokio::time::sleep(delay).await;
        }
    }

    fn parse_response_headers(
        headers: &reqwest::header::HeaderMap,
    ) -> HashMap<String, Vec<String>> {
        let mut result: HashMap<String, Vec<String>> = HashMap::new();
        for (name, value) in headers {
            let key = name.as_str().to_lowercase();
            let value = value.to_str().unwrap_or_default().to_string();
            result.entry(key).or_default().push(value);
        }
        result
    }

    /// Parses the body as JSON; non-JSON 5xx bodies are kept as `raw_body`.
    fn parse_body(code: u16, body_text: &str) -> serde_json::Value {
        if body_text.is_empty() {
            return serde_json::json!({});
        }
        serde_json::from_str(body_text).unwrap_or_else(|_| {
            if code >= 500 {
                serde_json::json!({ "raw_body": body_text })
            } else {
                serde_json::json!({})
            }
        })
    }

    fn calculate_retry_delay(response: &HttpResponse, status: u16) -> Duration {
        if status == 429 {
            if let Some(retry_after) = response.retry_request_after {
                return wait_seconds(retry_after);
            }
        }
        Duration::from_secs(RETRY_WAIT_TIME)
    }

    fn serialize_error(response: &HttpResponse) -> String {
        let mut error_body = serde_json::Map::new();

        if let Some(errors) = response.body.get("errors") {
            error_body.insert("errors".to_string(), errors.clone());
        }
        if let Some(error) = response.body.get("error") {
            error_body.insert("error".to_string(), error.clone());
            if let Some(desc) = response.body.get("error_description") {
                error_body.insert("error_description".to_string(), desc.clone());
            }
        }

        if let Some(request_id) = response.request_id() {
            error_body.insert(
                "error_reference".to_string(),
                serde_json::json!(format!(
                    "If you report this error, please include this id: {request_id}."
                )),
            );
        }

        serde_json::to_string(&error_body).unwrap_or_else(|_| "{}".to_string())
    }
}
