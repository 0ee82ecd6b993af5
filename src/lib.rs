//! # Shopify Partner API Singer tap
//!
//! Extracts records from the Shopify Partner GraphQL API and writes them as
//! Singer `SCHEMA`, `RECORD` and `STATE` messages.
//!
//! ## Overview
//!
//! This crate provides:
//! - Type-safe configuration via [`TapConfig`] and [`TapConfigBuilder`]
//! - Validated newtypes for credentials, ids and URLs
//! - An async HTTP/GraphQL client with retry handling ([`clients`])
//! - A schema-to-selection-set query compiler ([`query`])
//! - Cost-aware page sizing driven by the API's throttle metadata ([`throttle`])
//! - A JSONPath subset for walking responses ([`extract`])
//! - The `transactions`, `events` and `app` streams ([`streams`])
//! - Singer catalog, state and message types ([`singer`])
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use tap_shopify_partner::{Tap, TapConfig};
//! use tap_shopify_partner::singer::{MessageWriter, TapState};
//!
//! let config = TapConfig::load(&["config.json"])?;
//! let tap = Tap::new(config)?;
//!
//! let catalog = tap.discover();
//! let mut state = TapState::default();
//! let mut writer = MessageWriter::new(std::io::stdout().lock());
//! tap.sync(&catalog, &mut state, &mut writer).await?;
//! ```
//!
//! ## Configuration
//!
//! ```rust
//! use tap_shopify_partner::{ApiKey, AppId, PartnerId, TapConfig};
//!
//! let config = TapConfig::builder()
//!     .api_key(ApiKey::new("prtapi_token").unwrap())
//!     .partner_id(PartnerId::new(1234).unwrap())
//!     .app_id(AppId::new("5678").unwrap())
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(config.app_id().unwrap().global_id(), "gid://partners/App/5678");
//! ```
//!
//! ## Design Principles
//!
//! - **No global state**: Configuration is instance-based and passed explicitly
//! - **Fail-fast validation**: All newtypes validate on construction
//! - **Sequential**: Streams sync one after another, pages one after another
//! - **Async-first**: Designed for use with Tokio async runtime

pub mod clients;
pub mod config;
pub mod error;
pub mod extract;
pub mod query;
pub mod singer;
pub mod streams;
pub mod tap;
pub mod throttle;

// Re-export public types at crate root for convenience
pub use config::{ApiKey, ApiVersion, AppId, HostUrl, PartnerId, TapConfig, TapConfigBuilder};
pub use error::ConfigError;
pub use tap::{Tap, TapError, TAP_NAME};

// Re-export client types
pub use clients::{
    GraphqlClient, GraphqlError, HttpClient, HttpError, HttpRequest, HttpRequestBuilder,
    HttpResponse, HttpResponseError, InvalidHttpRequestError, MaxHttpRetriesExceededError,
};
