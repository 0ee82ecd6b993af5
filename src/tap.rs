//! Discovery and sync orchestration.

use std::io::Write;

use serde_json::{json, Value};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::clients::{GraphqlClient, GraphqlError, TAP_VERSION};
use crate::config::TapConfig;
use crate::error::ConfigError;
use crate::singer::{Catalog, CatalogEntry, CatalogError, Message, MessageWriter, TapState};
use crate::streams::{self, StreamDefinition, StreamSync, SyncError};

/// Name reported by `--about` and in the default user agent.
pub const TAP_NAME: &str = "tap-shopify-partner";

/// Top-level tap errors.
#[derive(Debug, Error)]
pub enum TapError {
    /// Invalid configuration.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The API client could not be created.
    #[error(transparent)]
    Client(#[from] GraphqlError),

    /// A catalog or state file could not be read.
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    /// A stream failed.
    #[error("Sync of stream '{stream}' failed: {source}")]
    Sync {
        /// The stream.
        stream: String,
        /// The cause.
        #[source]
        source: SyncError,
    },

    /// Writing a message failed.
    #[error("Failed to write message: {0}")]
    Io(#[from] std::io::Error),
}

/// The Partner API tap.
#[derive(Debug)]
pub struct Tap {
    config: TapConfig,
    client: GraphqlClient,
    streams: Vec<StreamDefinition>,
}

impl Tap {
    /// Creates the tap and its stream list.
    ///
    /// Streams that query an app are left out, with a warning, when no
    /// `app_id` is configured.
    ///
    /// # Errors
    ///
    /// Returns [`TapError::Client`] if the HTTP client cannot be built.
    pub fn new(config: TapConfig) -> Result<Self, TapError> {
        let client = GraphqlClient::new(&config)?;
        let streams = streams::all()
            .into_iter()
            .filter(|definition| {
                let available = !definition.requires_app_id() || config.app_id().is_some();
                if !available {
                    warn!(
                        "Skipping stream {}: 'app_id' is not configured",
                        definition.name
                    );
                }
                available
            })
            .collect();

        Ok(Self {
            config,
            client,
            streams,
        })
    }

    /// The configuration in use.
    #[must_use]
    pub const fn config(&self) -> &TapConfig {
        &self.config
    }

    /// The available streams, in sync order.
    #[must_use]
    pub fn streams(&self) -> &[StreamDefinition] {
        &self.streams
    }

    /// Builds the catalog of available streams, everything selected.
    #[must_use]
    pub fn discover(&self) -> Catalog {
        Catalog {
            streams: self.streams.iter().map(CatalogEntry::from_definition).collect(),
        }
    }

    /// Syncs every selected stream: `SCHEMA`, the stream's `RECORD`s, then
    /// `STATE` with its updated bookmark.
    ///
    /// Returns the total number of records written.
    ///
    /// # Errors
    ///
    /// Returns [`TapError::Sync`] for the first stream that fails.
    pub async fn sync<W: Write>(
        &self,
        catalog: &Catalog,
        state: &mut TapState,
        writer: &mut MessageWriter<W>,
    ) -> Result<u64, TapError> {
        let mut total = 0;
        for definition in &self.streams {
            let Some(entry) = catalog.get(definition.name) else {
                debug!("Stream {} is not in the catalog", definition.name);
                continue;
            };
            if !entry.is_selected() {
                info!("Skipping deselected stream {}", definition.name);
                continue;
            }
            total += self.sync_stream(definition, entry, state, writer).await?;
        }
        Ok(total)
    }

    async fn sync_stream<W: Write>(
        &self,
        definition: &StreamDefinition,
        entry: &CatalogEntry,
        state: &mut TapState,
        writer: &mut MessageWriter<W>,
    ) -> Result<u64, TapError> {
        info!("Beginning sync of stream {}", definition.name);
        let wrap = |source: SyncError| TapError::Sync {
            stream: definition.name.to_string(),
            source,
        };

        let output = definition.output_schema();
        let selected = entry.selected_properties();
        let schema = output.filtered(|name| selected.contains(name));
        writer.write(&Message::Schema {
            stream: definition.name.to_string(),
            schema: schema.to_json_schema(),
            key_properties: definition.primary_keys.iter().map(ToString::to_string).collect(),
            bookmark_properties: definition
                .replication_key
                .map(|key| vec![key.to_string()])
                .unwrap_or_default(),
        })?;

        let bookmark = definition
            .replication_key
            .and_then(|key| state.bookmark(definition.name, key));
        let mut sync = StreamSync::new(definition, &self.client, &self.config, &selected, bookmark)
            .map_err(wrap)?;
        let count = sync.sync(writer).await.map_err(wrap)?;

        if let (Some(key), Some(value)) = (definition.replication_key, sync.bookmark()) {
            state.set_bookmark(definition.name, key, value.clone());
        }
        writer.write(&Message::State {
            value: state.to_value(),
        })?;
        Ok(count)
    }

    /// Name, version, capabilities and accepted settings.
    #[must_use]
    pub fn about() -> Value {
        json!({
            "name": TAP_NAME,
            "version": TAP_VERSION,
            "capabilities": ["catalog", "state", "discover", "about"],
            "settings": {
                "type": "object",
                "properties": {
                    "api_key": {"type": "string", "description": "Partner API access token"},
                    "partner_id": {"type": "integer", "description": "Partner organization id"},
                    "app_id": {"type": "string", "description": "App id, required by the events and app streams"},
                    "start_date": {"type": "string", "format": "date-time", "description": "The earliest record date to sync"},
                    "user_agent": {"type": "string"},
                    "api_version": {"type": "string", "default": crate::config::ApiVersion::PINNED.to_string()},
                    "api_url": {"type": "string", "default": crate::config::DEFAULT_API_URL},
                    "request_tries": {"type": "integer", "minimum": 1, "default": crate::config::DEFAULT_REQUEST_TRIES}
                },
                "required": ["api_key", "partner_id"]
            }
        })
    }
}
