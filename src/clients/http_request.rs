//! HTTP request type for Partner API calls.
//!
//! The Partner API is a single GraphQL endpoint, so every request is a
//! `POST` of a JSON body to a path below the client's base path.

use crate::clients::errors::InvalidHttpRequestError;

/// Content type of every request body.
pub const JSON_CONTENT_TYPE: &str = "application/json";

/// A JSON `POST` to be sent to the Partner API.
///
/// # Example
///
/// ```rust
/// use tap_shopify_partner::clients::HttpRequest;
/// use serde_json::json;
///
/// let request = HttpRequest::builder("graphql.json")
///     .body(json!({"query": "{ publicApiVersions { handle } }"}))
///     .tries(3)
///     .build()
///     .unwrap();
/// assert_eq!(request.tries, 3);
/// ```
#[derive(Clone, Debug)]
pub struct HttpRequest {
    /// The path, relative to the client's base path.
    pub path: String,
    /// The JSON body.
    pub body: serde_json::Value,
    /// Number of times to attempt the request (default: 1).
    pub tries: u32,
}

impl HttpRequest {
    /// Creates a new builder for a request to `path`.
    #[must_use]
    pub fn builder(path: impl Into<String>) -> HttpRequestBuilder {
        HttpRequestBuilder {
            path: path.into(),
            body: None,
            tries: 1,
        }
    }

    /// Validates the request.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidHttpRequestError`] if the body is not a JSON object
    /// or `tries` is zero.
    pub fn verify(&self) -> Result<(), InvalidHttpRequestError> {
        if !self.body.is_object() {
            return Err(InvalidHttpRequestError::MissingBody {
                path: self.path.clone(),
            });
        }
        if self.tries == 0 {
            return Err(InvalidHttpRequestError::ZeroTries);
        }
        Ok(())
    }
}

/// Builder for constructing [`HttpRequest`] instances.
#[derive(Debug)]
pub struct HttpRequestBuilder {
    path: String,
    body: Option<serde_json::Value>,
    tries: u32,
}

impl HttpRequestBuilder {
    /// Sets the JSON body.
    #[must_use]
    pub fn body(mut self, body: impl Into<serde_json::Value>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Sets the number of attempts for 429 and 500 responses.
    #[must_use]
    pub const fn tries(mut self, tries: u32) -> Self {
        self.tries = tries;
        self
    }

    /// Builds the [`HttpRequest`], validating it in the process.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidHttpRequestError`] if the request fails validation.
    pub fn build(self) -> Result<HttpRequest, InvalidHttpRequestError> {
        let request = HttpRequest {
            path: self.path,
            body: self.body.unwrap_or(serde_json::Value::Null),
            tries: self.tries,
        };
        request.verify()?;
        Ok(request)
    }
}
