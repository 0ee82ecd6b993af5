//! Validated newtype wrappers for configuration values.
//!
//! This module provides type-safe wrappers around raw settings that validate
//! their contents on construction. Invalid values are rejected with clear error messages.

use crate::error::ConfigError;
use serde::{Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// A validated Shopify Partner API access token.
///
/// The token is sent as `X-Shopify-Access-Token` on every request, so the
/// `Debug` implementation masks it to keep it out of logs.
///
/// # Example
///
/// ```rust
/// use tap_shopify_partner::ApiKey;
///
/// let key = ApiKey::new("prtapi_secret").unwrap();
/// assert_eq!(key.as_ref(), "prtapi_secret");
/// assert_eq!(format!("{:?}", key), "ApiKey(*****)");
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    /// Creates a new validated API key.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::EmptyApiKey`] if the key is empty or whitespace.
    pub fn new(key: impl Into<String>) -> Result<Self, ConfigError> {
        let key = key.into();
        if key.trim().is_empty() {
            return Err(ConfigError::EmptyApiKey);
        }
        Ok(Self(key))
    }
}

impl AsRef<str> for ApiKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(*****)")
    }
}

/// A Shopify Partner organization id.
///
/// The id is part of every request URL
/// (`/{partner_id}/api/{version}/graphql.json`).
///
/// # Example
///
/// ```rust
/// use tap_shopify_partner::PartnerId;
///
/// let id: PartnerId = "1234567".parse().unwrap();
/// assert_eq!(id.get(), 1_234_567);
/// assert_eq!(id.to_string(), "1234567");
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PartnerId(u64);

impl PartnerId {
    /// Creates a new partner id.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidPartnerId`] if the id is zero.
    pub fn new(id: u64) -> Result<Self, ConfigError> {
        if id == 0 {
            return Err(ConfigError::InvalidPartnerId {
                value: id.to_string(),
            });
        }
        Ok(Self(id))
    }

    /// Returns the numeric id.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl FromStr for PartnerId {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let id = trimmed
            .parse::<u64>()
            .map_err(|_| ConfigError::InvalidPartnerId {
                value: trimmed.to_string(),
            })?;
        Self::new(id)
    }
}

impl fmt::Display for PartnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Serialize for PartnerId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(self.0)
    }
}

/// A Shopify Partner app id.
///
/// Accepts either the bare numeric id or the global id form. The app is
/// always addressed by its global id in queries.
///
/// # Example
///
/// ```rust
/// use tap_shopify_partner::AppId;
///
/// let app = AppId::new("123456").unwrap();
/// assert_eq!(app.global_id(), "gid://partners/App/123456");
///
/// let app = AppId::new("gid://partners/App/123456").unwrap();
/// assert_eq!(app.as_ref(), "123456");
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct AppId(String);

impl AppId {
    const GID_PREFIX: &'static str = "gid://partners/App/";

    /// Creates a new validated app id.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidAppId`] if the id is empty or contains
    /// characters other than ASCII digits.
    pub fn new(id: impl Into<String>) -> Result<Self, ConfigError> {
        let raw = id.into();
        let trimmed = raw.trim();
        let id = trimmed.strip_prefix(Self::GID_PREFIX).unwrap_or(trimmed);

        if id.is_empty() || !id.chars().all(|c| c.is_ascii_digit()) {
            return Err(ConfigError::InvalidAppId { value: raw });
        }

        Ok(Self(id.to_string()))
    }

    /// Returns the app's global id, e.g. `gid://partners/App/123456`.
    #[must_use]
    pub fn global_id(&self) -> String {
        format!("{}{}", Self::GID_PREFIX, self.0)
    }
}

impl AsRef<str> for AppId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// A validated base URL for the Partner API.
///
/// Any path is kept, so a proxy mounted under a prefix works; trailing
/// slashes are dropped when building request URLs.
///
/// # Example
///
/// ```rust
/// use tap_shopify_partner::HostUrl;
///
/// let url = HostUrl::new("http://127.0.0.1:8080/").unwrap();
/// assert_eq!(url.scheme(), "http");
/// assert_eq!(url.host_name(), "127.0.0.1");
/// assert_eq!(url.base(), "http://127.0.0.1:8080");
///
/// let proxied = HostUrl::new("https://proxy.example.com/shopify/").unwrap();
/// assert_eq!(proxied.base(), "https://proxy.example.com/shopify");
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HostUrl {
    url: String,
    scheme_end: usize,
    host_start: usize,
    host_end: usize,
}

impl HostUrl {
    /// Creates a new validated host URL.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidHostUrl`] if the URL has no scheme or host.
    pub fn new(url: impl Into<String>) -> Result<Self, ConfigError> {
        let url = url.into().trim().to_string();
        let invalid = || ConfigError::InvalidHostUrl { url: url.clone() };

        let scheme_end = url.find("://").ok_or_else(invalid)?;
        let scheme = &url[..scheme_end];
        if scheme.is_empty() || !scheme.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(invalid());
        }

        let host_start = scheme_end + 3;
        let remainder = url.get(host_start..).ok_or_else(invalid)?;
        let host_end = remainder
            .find([':', '/', '?', '#'])
            .map_or(url.len(), |i| host_start + i);
        if host_end == host_start {
            return Err(invalid());
        }

        Ok(Self {
            url,
            scheme_end,
            host_start,
            host_end,
        })
    }

    /// Returns the URL scheme (e.g., "https").
    #[must_use]
    pub fn scheme(&self) -> &str {
        &self.url[..self.scheme_end]
    }

    /// Returns the host name portion of the URL.
    #[must_use]
    pub fn host_name(&self) -> &str {
        &self.url[self.host_start..self.host_end]
    }

    /// Returns the URL with its path but without trailing slashes.
    #[must_use]
    pub fn base(&self) -> &str {
        self.url.trim_end_matches('/')
    }
}

impl AsRef<str> for HostUrl {
    fn as_ref(&self) -> &str {
        &self.url
    }
}
