//! GraphQL-specific error types.
//!
//! The Partner API reports query problems with HTTP 200 and an `errors`
//! array in the body. Those are surfaced as [`GraphqlError::Query`] so a
//! stream never mistakes an error body for an empty page.

use serde::Deserialize;
use thiserror::Error;

use crate::clients::HttpError;

/// Error code Shopify uses when the cost bucket is empty.
pub const THROTTLED_CODE: &str = "THROTTLED";

/// One entry of a GraphQL `errors` array.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct GraphqlErrorDetail {
    /// Human-readable message.
    #[serde(default)]
    pub message: String,
    /// `extensions.code`, e.g. `THROTTLED` or `ACCESS_DENIED`.
    #[serde(default)]
    pub code: Option<String>,
    /// Path into the query that failed.
    #[serde(default)]
    pub path: Option<Vec<serde_json::Value>>,
}

impl GraphqlErrorDetail {
    /// Parses an `errors` entry, lifting `extensions.code` to [`Self::code`].
    #[must_use]
    pub fn from_value(value: &serde_json::Value) -> Self {
        let mut detail: Self = serde_json::from_value(value.clone()).unwrap_or_default();
        if detail.code.is_none() {
            detail.code = value
                .pointer("/extensions/code")
                .and_then(serde_json::Value::as_str)
                .map(String::from);
        }
        if detail.message.is_empty() {
            if let Some(s) = value.as_str() {
                detail.message = s.to_string();
            }
        }
        detail
    }
}

/// Error type for GraphQL API operations.
#[derive(Debug, Error)]
pub enum GraphqlError {
    /// An HTTP-level error occurred.
    #[error(transparent)]
    Http(#[from] HttpError),

    /// The response body carried GraphQL errors.
    #[error("GraphQL query failed: {}", summarize(.errors))]
    Query {
        /// The reported errors.
        errors: Vec<GraphqlErrorDetail>,
        /// The response's `extensions` object (carries the query cost).
        extensions: Option<serde_json::Value>,
    },
}

impl GraphqlError {
    /// Returns `true` when every reported error is a throttling error.
    #[must_use]
    pub fn is_throttled(&self) -> bool {
        match self {
            Self::Query { errors, .. } => {
                !errors.is_empty()
                    && errors
                        .iter()
                        .all(|e| e.code.as_deref() == Some(THROTTLED_CODE))
            }
            Self::Http(_) => false,
        }
    }

    /// Returns the `extensions` object of a GraphQL error response.
    #[must_use]
    pub const fn extensions(&self) -> Option<&serde_json::Value> {
        match self {
            Self::Query { extensions, .. } => extensions.as_ref(),
            Self::Http(_) => None,
        }
    }
}

fn summarize(errors: &[GraphqlErrorDetail]) -> String {
    errors
        .iter()
        .map(|e| match &e.code {
            Some(code) => format!("{} ({code})", e.message),
            None => e.message.clone(),
        })
        .collect::<Vec<_>>()
        .join("; ")
}
