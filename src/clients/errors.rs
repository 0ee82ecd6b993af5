//! HTTP-level error types for Partner API requests.
//!
//! - [`HttpResponseError`]: a non-2xx response that is not retried
//! - [`MaxHttpRetriesExceededError`]: 429/500 responses outlasted every attempt
//! - [`InvalidHttpRequestError`]: a request rejected before it was sent
//! - [`HttpError`]: the union of the above plus transport failures

use thiserror::Error;

/// A non-successful HTTP response from the Partner API.
///
/// `message` is a compact JSON object collecting the `errors` / `error`
/// fields of the body, plus an `error_reference` line naming the
/// `X-Request-Id` when Shopify sent one.
///
/// # Example
///
/// ```rust
/// use tap_shopify_partner::clients::HttpResponseError;
///
/// let error = HttpResponseError {
///     code: 401,
///     message: r#"{"errors":"[API] Invalid API key or access token"}"#.to_string(),
///     error_reference: None,
/// };
/// assert!(error.to_string().contains("Invalid API key"));
/// ```
#[derive(Debug, Error)]
#[error("{message}")]
pub struct HttpResponseError {
    /// The HTTP status code of the response.
    pub code: u16,
    /// Serialized error message in JSON format.
    pub message: String,
    /// Value of the `X-Request-Id` response header.
    pub error_reference: Option<String>,
}

/// Every attempt of a retryable request failed.
#[derive(Debug, Error)]
#[error("Exceeded maximum retry count of {tries}. Last message: {message}")]
pub struct MaxHttpRetriesExceededError {
    /// The HTTP status code of the last response.
    pub code: u16,
    /// The number of attempts made.
    pub tries: u32,
    /// Serialized error message from the last response.
    pub message: String,
    /// Value of the `X-Request-Id` response header.
    pub error_reference: Option<String>,
}

/// A request that failed validation before being sent.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum InvalidHttpRequestError {
    /// The request has no JSON object body.
    #[error("Cannot post to {path} without a JSON object body.")]
    MissingBody {
        /// The request path.
        path: String,
    },

    /// The request was configured with zero attempts.
    #[error("A request must be attempted at least once.")]
    ZeroTries,
}

/// Unified error type for HTTP operations.
#[derive(Debug, Error)]
pub enum HttpError {
    /// A non-2xx response.
    #[error(transparent)]
    Response(#[from] HttpResponseError),

    /// Retry attempts exhausted.
    #[error(transparent)]
    MaxRetries(#[from] MaxHttpRetriesExceededError),

    /// Request validation failed.
    #[error(transparent)]
    InvalidRequest(#[from] InvalidHttpRequestError),

    /// Network, TLS or body decoding failure.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
}

impl HttpError {
    /// Returns the HTTP status code, when the error came from a response.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Response(e) => Some(e.code),
            Self::MaxRetries(e) => Some(e.code),
            Self::InvalidRequest(_) | Self::Network(_) => None,
        }
    }
}
