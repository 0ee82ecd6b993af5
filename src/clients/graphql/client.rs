//! GraphQL client implementation for the Partner API.

use crate::clients::graphql::errors::{GraphqlError, GraphqlErrorDetail};
use crate::clients::{HttpClient, HttpRequest, HttpResponse};
use crate::config::{ApiVersion, TapConfig};

/// GraphQL client for the Shopify Partner API.
///
/// Every query is a `POST graphql.json` with a `{"query", "variables"}`
/// body. Transient 429/500 responses are retried up to the configured
/// `request_tries`.
///
/// # Example
///
/// ```rust,ignore
/// use tap_shopify_partner::clients::GraphqlClient;
/// use serde_json::json;
///
/// let client = GraphqlClient::new(&config)?;
/// let response = client
///     .query(
///         "query($id: ID!) { app(id: $id) { name } }",
///         Some(json!({ "id": "gid://partners/App/1" })),
///     )
///     .await?;
/// println!("App: {}", response.body["data"]["app"]["name"]);
/// ```
#[derive(Debug)]
pub struct GraphqlClient {
    http_client: HttpClient,
    api_version: ApiVersion,
    tries: u32,
}

// Verify GraphqlClient is Send + Sync at compile time
const _: fn() = || {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<GraphqlClient>();
};

impl GraphqlClient {
    /// Creates a new GraphQL client for the configured partner.
    ///
    /// # Errors
    ///
    /// Returns [`GraphqlError::Http`] if the HTTP client cannot be created.
    pub fn new(config: &TapConfig) -> Result<Self, GraphqlError> {
        Ok(Self {
            http_client: HttpClient::new(config)?,
            api_version: config.api_version(),
            tries: config.request_tries(),
        })
    }

    /// Returns the API version being used by this client.
    #[must_use]
    pub const fn api_version(&self) -> ApiVersion {
        self.api_version
    }

    /// Returns the underlying HTTP client.
    #[must_use]
    pub const fn http_client(&self) -> &HttpClient {
        &self.http_client
    }

    /// Executes a GraphQL query.
    ///
    /// # Errors
    ///
    /// Returns [`GraphqlError::Http`] for network errors, non-2xx responses
    /// and retry exhaustion, and [`GraphqlError::Query`] when the body
    /// carries a non-empty `errors` array.
    pub async fn query(
        &self,
        query: &str,
        variables: Option<serde_json::Value>,
    ) -> Result<HttpResponse, GraphqlError> {
        let body = serde_json::json!({
            "query": query,
            "variables": variables.unwrap_or_else(|| serde_json::json!({})),
        });

        let request = HttpRequest::builder("graphql.json")
            .body(body)
            .tries(self.tries)
            .build()
            .map_err(|e| GraphqlError::Http(e.into()))?;

        let response = self.http_client.request(request).await?;
        Self::check_errors(response)
    }

    /// Turns a body with a non-empty `errors` array into an error.
    fn check_errors(response: HttpResponse) -> Result<HttpResponse, GraphqlError> {
        let errors: Vec<GraphqlErrorDetail> = match response.body.get("errors") {
            Some(serde_json::Value::Array(entries)) => {
                entries.iter().map(GraphqlErrorDetail::from_value).collect()
            }
            Some(serde_json::Value::Null) | None => Vec::new(),
            Some(other) => vec![GraphqlErrorDetail::from_value(other)],
        };

        if errors.is_empty() {
            return Ok(response);
        }

        Err(GraphqlError::Query {
            errors,
            extensions: response.body.get("extensions").cloned(),
        })
    }
}
