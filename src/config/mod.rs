//! Configuration types for the tap.
//!
//! # Overview
//!
//! The main types in this module are:
//!
//! - [`TapConfig`]: The validated tap settings
//! - [`TapConfigBuilder`]: A builder for constructing [`TapConfig`] instances
//! - [`ApiKey`]: A validated access token with masked debug output
//! - [`PartnerId`]: The Partner organization id
//! - [`AppId`]: A Partner app id, rendered as a global id in queries
//! - [`HostUrl`]: A validated API base URL
//! - [`ApiVersion`]: The Partner API version to use
//!
//! Settings normally come from one or more Singer `config.json` files (see
//! [`TapConfig::load`]); the builder is the programmatic equivalent.
//!
//! # Example
//!
//! ```rust
//! use tap_shopify_partner::{ApiKey, PartnerId, TapConfig};
//!
//! let config = TapConfig::builder()
//!     .api_key(ApiKey::new("prtapi_token").unwrap())
//!     .partner_id(PartnerId::new(1234).unwrap())
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(
//!     config.graphql_url(),
//!     "https://partners.shopify.com/1234/api/2024-04/graphql.json"
//! );
//! ```

mod newtypes;
mod version;

pub use newtypes::{ApiKey, AppId, HostUrl, PartnerId};
pub use version::ApiVersion;

use std::path::Path;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde_json::{Map, Value};

use crate::error::ConfigError;

/// Public Partner API host.
pub const DEFAULT_API_URL: &str = "https://partners.shopify.com";

/// Default number of HTTP attempts for retryable responses.
pub const DEFAULT_REQUEST_TRIES: u32 = 3;

/// Config source that reads settings from the environment.
pub const ENV_SOURCE: &str = "ENV";

/// Prefix of environment variables read for the [`ENV_SOURCE`] source.
pub const ENV_PREFIX: &str = "TAP_SHOPIFY_PARTNER_";

const SETTINGS: [&str; 8] = [
    "api_key",
    "partner_id",
    "app_id",
    "start_date",
    "user_agent",
    "api_version",
    "api_url",
    "request_tries",
];

/// Validated settings for the Partner tap.
///
/// `TapConfig` is `Clone`, `Send`, and `Sync`, so it can be shared between
/// the client and every stream.
#[derive(Clone, Debug)]
pub struct TapConfig {
    api_key: ApiKey,
    partner_id: PartnerId,
    app_id: Option<AppId>,
    start_date: Option<DateTime<Utc>>,
    user_agent: Option<String>,
    api_version: ApiVersion,
    api_url: HostUrl,
    request_tries: u32,
}

impl TapConfig {
    /// Creates a new builder for constructing a `TapConfig`.
    #[must_use]
    pub fn builder() -> TapConfigBuilder {
        TapConfigBuilder::new()
    }

    /// Returns the API access token.
    #[must_use]
    pub const fn api_key(&self) -> &ApiKey {
        &self.api_key
    }

    /// Returns the Partner organization id.
    #[must_use]
    pub const fn partner_id(&self) -> PartnerId {
        self.partner_id
    }

    /// Returns the app id, if configured.
    #[must_use]
    pub const fn app_id(&self) -> Option<&AppId> {
        self.app_id.as_ref()
    }

    /// Returns the earliest record date to sync, if configured.
    #[must_use]
    pub const fn start_date(&self) -> Option<DateTime<Utc>> {
        self.start_date
    }

    /// Returns the configured `User-Agent`, if any.
    #[must_use]
    pub fn user_agent(&self) -> Option<&str> {
        self.user_agent.as_deref()
    }

    /// Returns the API version.
    #[must_use]
    pub const fn api_version(&self) -> ApiVersion {
        self.api_version
    }

    /// Returns the API base URL.
    #[must_use]
    pub const fn api_url(&self) -> &HostUrl {
        &self.api_url
    }

    /// Returns how many times a retryable HTTP request is attempted.
    #[must_use]
    pub const fn request_tries(&self) -> u32 {
        self.request_tries
    }

    /// Returns the request path prefix, e.g. `/1234/api/2024-04`.
    #[must_use]
    pub fn base_path(&self) -> String {
        format!("/{}/api/{}", self.partner_id, self.api_version)
    }

    /// Returns the full GraphQL endpoint URL.
    #[must_use]
    pub fn graphql_url(&self) -> String {
        format!("{}{}/graphql.json", self.api_url.base(), self.base_path())
    }

    /// Builds a config from a JSON settings object.
    ///
    /// Numeric settings are accepted either as JSON numbers or as digit
    /// strings, since values read from the environment are always strings.
    /// Unknown keys are ignored.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] describing the first invalid or missing setting.
    pub fn from_json(value: &Value) -> Result<Self, ConfigError> {
        let settings = value
            .as_object()
            .ok_or_else(|| ConfigError::InvalidField {
                field: "config",
                reason: "expected a JSON object".to_string(),
            })?;

        let mut builder = Self::builder();

        if let Some(key) = string_setting(settings, "api_key")? {
            builder = builder.api_key(ApiKey::new(key)?);
        }
        if let Some(id) = id_setting(settings, "partner_id")? {
            builder = builder.partner_id(id.parse()?);
        }
        if let Some(id) = id_setting(settings, "app_id")? {
            builder = builder.app_id(AppId::new(id)?);
        }
        if let Some(date) = string_setting(settings, "start_date")? {
            builder = builder.start_date(parse_start_date(&date)?);
        }
        if let Some(agent) = string_setting(settings, "user_agent")? {
            builder = builder.user_agent(agent);
        }
        if let Some(version) = string_setting(settings, "api_version")? {
            builder = builder.api_version(version.parse()?);
        }
        if let Some(url) = string_setting(settings, "api_url")? {
            builder = builder.api_url(HostUrl::new(url)?);
        }
        if let Some(tries) = id_setting(settings, "request_tries")? {
            let tries = tries
                .parse::<u32>()
                .ok()
                .filter(|t| *t >= 1)
                .ok_or_else(|| ConfigError::InvalidField {
                    field: "request_tries",
                    reason: format!("expected an integer >= 1, got '{tries}'"),
                })?;
            builder = builder.request_tries(tries);
        }

        builder.build()
    }

    /// Loads and merges settings from several sources, in order.
    ///
    /// Each source is either a path to a JSON file or the literal `ENV`,
    /// which reads `TAP_SHOPIFY_PARTNER_<SETTING>` variables. Later sources
    /// override keys from earlier ones.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ConfigFile`] if a file cannot be read or is
    /// not a JSON object, or any validation error from [`Self::from_json`].
    pub fn load<S: AsRef<str>>(sources: &[S]) -> Result<Self, ConfigError> {
        let mut merged = Map::new();

        for source in sources {
            let source = source.as_ref();
            let settings = if source == ENV_SOURCE {
                settings_from_env()
            } else {
                read_settings_file(Path::new(source))?
            };
            tracing::debug!("Loaded {} setting(s) from {}", settings.len(), source);
            merged.extend(settings);
        }

        Self::from_json(&Value::Object(merged))
    }
}

// Verify TapConfig is Send + Sync at compile time
const _: fn() = || {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<TapConfig>();
};

fn read_settings_file(path: &Path) -> Result<Map<String, Value>, ConfigError> {
    let file_error = |reason: String| ConfigError::ConfigFile {
        path: path.display().to_string(),
        reason,
    };

    let contents = std::fs::read_to_string(path).map_err(|e| file_error(e.to_string()))?;
    match serde_json::from_str(&contents).map_err(|e| file_error(e.to_string()))? {
        Value::Object(map) => Ok(map),
        _ => Err(file_error("expected a JSON object".to_string())),
    }
}

fn settings_from_env() -> Map<String, Value> {
    SETTINGS
        .iter()
        .filter_map(|name| {
            let var = format!("{ENV_PREFIX}{}", name.to_uppercase());
            std::env::var(var)
                .ok()
                .map(|value| ((*name).to_string(), Value::String(value)))
        })
        .collect()
}

fn string_setting(
    settings: &Map<String, Value>,
    field: &'static str,
) -> Result<Option<String>, ConfigError> {
    match settings.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(other) => Err(ConfigError::InvalidField {
            field,
            reason: format!("expected a string, got {other}"),
        }),
    }
}

/// Reads a setting that may be a JSON number or a string of digits.
fn id_setting(
    settings: &Map<String, Value>,
    field: &'static str,
) -> Result<Option<String>, ConfigError> {
    match settings.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(other) => Err(ConfigError::InvalidField {
            field,
            reason: format!("expected an integer or string, got {other}"),
        }),
    }
}

/// Parses a `start_date` or bookmark as RFC 3339, a naive timestamp (UTC), or a bare date.
pub(crate) fn parse_start_date(value: &str) -> Result<DateTime<Utc>, ConfigError> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S") {
        return Ok(naive.and_utc());
    }
    if let Some(naive) = NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
    {
        return Ok(naive.and_utc());
    }
    Err(ConfigError::InvalidStartDate {
        value: value.to_string(),
    })
}

/// Builder for constructing [`TapConfig`] instances.
///
/// Required fields are `api_key` and `partner_id`.
///
/// # Defaults
///
/// - `api_version`: [`ApiVersion::PINNED`] (`2024-04`)
/// - `api_url`: [`DEFAULT_API_URL`]
/// - `request_tries`: [`DEFAULT_REQUEST_TRIES`]
/// - `app_id`, `start_date`, `user_agent`: `None`
#[derive(Debug, Default)]
pub struct TapConfigBuilder {
    api_key: Option<ApiKey>,
    partner_id: Option<PartnerId>,
    app_id: Option<AppId>,
    start_date: Option<DateTime<Utc>>,
    user_agent: Option<String>,
    api_version: Option<ApiVersion>,
    api_url: Option<HostUrl>,
    request_tries: Option<u32>,
}

impl TapConfigBuilder {
    /// Creates a new builder with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the API access token (required).
    #[must_use]
    pub fn api_key(mut self, key: ApiKey) -> Self {
        self.api_key = Some(key);
        self
    }

    /// Sets the Partner organization id (required).
    #[must_use]
    pub const fn partner_id(mut self, id: PartnerId) -> Self {
        self.partner_id = Some(id);
        self
    }

    /// Sets the app id used by the `events` and `app` streams.
    #[must_use]
    pub fn app_id(mut self, id: AppId) -> Self {
        self.app_id = Some(id);
        self
    }

    /// Sets the earliest record date to sync.
    #[must_use]
    pub const fn start_date(mut self, date: DateTime<Utc>) -> Self {
        self.start_date = Some(date);
        self
    }

    /// Sets the `User-Agent` header value.
    #[must_use]
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    /// Sets the API version.
    #[must_use]
    pub const fn api_version(mut self, version: ApiVersion) -> Self {
        self.api_version = Some(version);
        self
    }

    /// Overrides the API base URL.
    #[must_use]
    pub fn api_url(mut self, url: HostUrl) -> Self {
        self.api_url = Some(url);
        self
    }

    /// Sets how many times a retryable HTTP request is attempted.
    #[must_use]
    pub const fn request_tries(mut self, tries: u32) -> Self {
        self.request_tries = Some(tries);
        self
    }

    /// Builds the [`TapConfig`], validating that required fields are set.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingRequiredField`] if `api_key` or
    /// `partner_id` are not set, and [`ConfigError::InvalidField`] if
    /// `request_tries` is zero.
    pub fn build(self) -> Result<TapConfig, ConfigError> {
        let api_key = self
            .api_key
            .ok_or(ConfigError::MissingRequiredField { field: "api_key" })?;
        let partner_id = self
            .partner_id
            .ok_or(ConfigError::MissingRequiredField { field: "partner_id" })?;

        let request_tries = self.request_tries.unwrap_or(DEFAULT_REQUEST_TRIES);
        if request_tries == 0 {
            return Err(ConfigError::InvalidField {
                field: "request_tries",
                reason: "must be at least 1".to_string(),
            });
        }

        let api_url = match self.api_url {
            Some(url) => url,
            None => HostUrl::new(DEFAULT_API_URL)?,
        };

        Ok(TapConfig {
            api_key,
            partner_id,
            app_id: self.app_id,
            start_date: self.start_date,
            user_agent: self.user_agent,
            api_version: self.api_version.unwrap_or_default(),
            api_url,
            request_tries,
        })
    }
}
