//! HTTP and GraphQL client types for Partner API communication.
//!
//! # Overview
//!
//! - [`HttpClient`]: The async HTTP client bound to one partner endpoint
//! - [`HttpRequest`]: A request to be sent to the API
//! - [`HttpResponse`]: A parsed response from the API
//! - [`graphql::GraphqlClient`]: Query execution on top of [`HttpClient`]
//! - [`graphql::GraphqlError`]: GraphQL-specific error types
//!
//! # Retry Behavior
//!
//! - **429 (Rate Limited)**: Retries using `Retry-After` header value, or 1 second if not present
//! - **500 (Server Error)**: Retries with fixed 1-second delay
//! - **Other errors (4xx)**: Returns immediately without retry
//!
//! GraphQL throttling (HTTP 200 with a `THROTTLED` error) is not an HTTP
//! retry; streams handle it using the cost metadata in the response.

mod errors;
pub mod graphql;
mod http_client;
mod http_request;
mod http_response;

pub use errors::{
    HttpError, HttpResponseError, InvalidHttpRequestError, MaxHttpRetriesExceededError,
};
pub use http_client::{HttpClient, RETRY_WAIT_TIME, TAP_VERSION};
pub use http_request::{HttpRequest, HttpRequestBuilder, JSON_CONTENT_TYPE};
pub use http_response::HttpResponse;

pub use graphql::{GraphqlClient, GraphqlError};
