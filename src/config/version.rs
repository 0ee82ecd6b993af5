//! Partner API version definitions.

use crate::error::ConfigError;
use serde::{de, Deserialize, Deserializer};
use std::fmt;
use std::str::FromStr;

/// Shopify Partner API version.
///
/// Shopify releases API versions quarterly (January, April, July, October),
/// named `YYYY-MM`. `Unstable` addresses the in-development version and
/// sorts after every release.
///
/// The stream queries in this crate were written against `2024-04`, which is
/// the default.
///
/// # Example
///
/// ```rust
/// use tap_shopify_partner::ApiVersion;
///
/// let version: ApiVersion = "2025-01".parse().unwrap();
/// assert_eq!(version.to_string(), "2025-01");
/// assert!(ApiVersion::default() < version);
/// assert!(version < ApiVersion::Unstable);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ApiVersion {
    /// A quarterly release.
    Release {
        /// Release year, e.g. 2024.
        year: u16,
        /// Release month: 1, 4, 7 or 10.
        month: u8,
    },
    /// The unstable, in-development version.
    Unstable,
}

impl ApiVersion {
    /// The version the stream queries target.
    pub const PINNED: Self = Self::Release {
        year: 2024,
        month: 4,
    };

    /// Creates a release version, validating the month.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidApiVersion`] if `month` is not a
    /// quarterly release month or `year` is not four digits.
    pub fn release(year: u16, month: u8) -> Result<Self, ConfigError> {
        if !(1000..=9999).contains(&year) || !matches!(month, 1 | 4 | 7 | 10) {
            return Err(ConfigError::InvalidApiVersion {
                version: format!("{year}-{month:02}"),
            });
        }
        Ok(Self::Release { year, month })
    }

    /// Returns `true` for quarterly releases.
    #[must_use]
    pub const fn is_stable(&self) -> bool {
        matches!(self, Self::Release { .. })
    }
}

impl Default for ApiVersion {
    fn default() -> Self {
        Self::PINNED
    }
}

impl fmt::Display for ApiVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Release { year, month } => write!(f, "{year}-{month:02}"),
            Self::Unstable => f.write_str("unstable"),
        }
    }
}

impl FromStr for ApiVersion {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_lowercase();
        if s == "unstable" {
            return Ok(Self::Unstable);
        }

        let invalid = || ConfigError::InvalidApiVersion { version: s.clone() };

        let (year, month) = s.split_once('-').ok_or_else(invalid)?;
        if year.len() != 4 || month.len() != 2 {
            return Err(invalid());
        }
        if !year.chars().chain(month.chars()).all(|c| c.is_ascii_digit()) {
            return Err(invalid());
        }

        let year = year.parse().map_err(|_| invalid())?;
        let month = month.parse().map_err(|_| invalid())?;
        Self::release(year, month).map_err(|_| invalid())
    }
}

impl<'de> Deserialize<'de> for ApiVersion {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}
