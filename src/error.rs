//! Configuration error types for the tap.
//!
//! All configuration constructors return `Result<T, ConfigError>` so that a
//! bad `config.json` fails before any request is sent. Error messages name
//! the offending setting and what a valid value looks like.
//!
//! # Example
//!
//! ```rust
//! use tap_shopify_partner::{ApiKey, ConfigError};
//!
//! let result = ApiKey::new("");
//! assert!(matches!(result, Err(ConfigError::EmptyApiKey)));
//! ```

use thiserror::Error;

/// Errors that can occur while building or loading the tap configuration.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// API key cannot be empty.
    #[error("API key cannot be empty. Please provide a Shopify Partner API access token.")]
    EmptyApiKey,

    /// Partner id is not a positive integer.
    #[error("Invalid partner id '{value}'. Expected a positive integer (e.g., 1234567).")]
    InvalidPartnerId {
        /// The invalid value that was provided.
        value: String,
    },

    /// App id is empty or malformed.
    #[error("Invalid app id '{value}'. Expected a numeric id or 'gid://partners/App/<id>'.")]
    InvalidAppId {
        /// The invalid value that was provided.
        value: String,
    },

    /// API version is invalid.
    #[error("Invalid API version '{version}'. Expected format: 'YYYY-MM' (e.g., '2024-04') or 'unstable'.")]
    InvalidApiVersion {
        /// The invalid version string that was provided.
        version: String,
    },

    /// Start date could not be parsed.
    #[error("Invalid start_date '{value}'. Expected an RFC 3339 timestamp (e.g., '2024-01-01T00:00:00Z').")]
    InvalidStartDate {
        /// The invalid value that was provided.
        value: String,
    },

    /// Host URL is invalid.
    #[error("Invalid API URL '{url}'. Please provide a URL with scheme (e.g., 'https://partners.shopify.com').")]
    InvalidHostUrl {
        /// The invalid URL that was provided.
        url: String,
    },

    /// A setting has the wrong JSON type.
    #[error("Invalid value for '{field}': {reason}")]
    InvalidField {
        /// The setting name.
        field: &'static str,
        /// Why the value was rejected.
        reason: String,
    },

    /// A required field is missing.
    #[error("Missing required setting: '{field}'. This setting must be provided in the tap config.")]
    MissingRequiredField {
        /// The name of the missing field.
        field: &'static str,
    },

    /// A config file could not be read or parsed.
    #[error("Failed to load config file '{path}': {reason}")]
    ConfigFile {
        /// Path of the config source.
        path: String,
        /// The underlying I/O or JSON error.
        reason: String,
    },
}
