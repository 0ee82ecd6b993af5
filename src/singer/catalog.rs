//! Singer catalog: discovered streams, their schemas and selection metadata.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::streams::StreamDefinition;

/// Replication method for streams with a replication key.
pub const INCREMENTAL: &str = "INCREMENTAL";

/// Replication method for streams read in full every run.
pub const FULL_TABLE: &str = "FULL_TABLE";

/// Errors reading catalog or state documents.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// The file could not be read.
    #[error("Failed to read '{path}': {source}")]
    Io {
        /// The file path.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The file is not a valid document.
    #[error("Failed to parse '{path}': {source}")]
    Parse {
        /// The file path.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: serde_json::Error,
    },
}

/// Reads and deserializes a JSON document.
pub(crate) fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, CatalogError> {
    let contents = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&contents).map_err(|source| CatalogError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// How a property is included in the output.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Inclusion {
    /// Always emitted (primary and replication keys).
    Automatic,
    /// Emitted when selected.
    Available,
    /// Never emitted.
    Unsupported,
}

/// Metadata attached to a breadcrumb.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Metadata {
    /// Inclusion rule.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inclusion: Option<Inclusion>,
    /// Explicit user selection.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected: Option<bool>,
    /// Selection applied when the user made no choice.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_by_default: Option<bool>,
    /// Primary key of the stream (root breadcrumb only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table_key_properties: Option<Vec<String>>,
    /// Replication keys of the stream (root breadcrumb only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub valid_replication_keys: Option<Vec<String>>,
    /// Replication method of the stream (root breadcrumb only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub forced_replication_method: Option<String>,
    /// Keys this tap does not interpret.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A breadcrumb and its metadata.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MetadataEntry {
    /// Empty for the stream itself, `["properties", name]` for a property.
    pub breadcrumb: Vec<String>,
    /// The metadata.
    pub metadata: Metadata,
}

/// One stream of the catalog.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry {
    /// Stream identifier.
    pub tap_stream_id: String,
    /// Stream name.
    pub stream: String,
    /// JSON Schema of emitted records.
    pub schema: Value,
    /// Primary key fields.
    #[serde(default)]
    pub key_properties: Vec<String>,
    /// Replication key field.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replication_key: Option<String>,
    /// `INCREMENTAL` or `FULL_TABLE`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replication_method: Option<String>,
    /// Selection metadata.
    #[serde(default)]
    pub metadata: Vec<MetadataEntry>,
}

impl CatalogEntry {
    /// Builds the discovered entry for a stream: keys are automatic, every
    /// other property is available and selected.
    #[must_use]
    pub fn from_definition(definition: &StreamDefinition) -> Self {
        let schema = definition.output_schema();
        let key_properties: Vec<String> =
            definition.primary_keys.iter().map(ToString::to_string).collect();
        let replication_key = definition.replication_key.map(String::from);
        let replication_method = if replication_key.is_some() {
            INCREMENTAL
        } else {
            FULL_TABLE
        };

        let mut metadata = vec![MetadataEntry {
            breadcrumb: Vec::new(),
            metadata: Metadata {
                inclusion: Some(Inclusion::Available),
                selected: Some(true),
                selected_by_default: Some(true),
                table_key_properties: Some(key_properties.clone()),
                valid_replication_keys: replication_key.clone().map(|key| vec![key]),
                forced_replication_method: Some(replication_method.to_string()),
                extra: Map::new(),
            },
        }];
        for name in schema.names() {
            let automatic = key_properties.iter().any(|key| key == name)
                || replication_key.as_deref() == Some(name);
            metadata.push(MetadataEntry {
                breadcrumb: vec!["properties".to_string(), name.to_string()],
                metadata: Metadata {
                    inclusion: Some(if automatic {
                        Inclusion::Automatic
                    } else {
                        Inclusion::Available
                    }),
                    selected: (!automatic).then_some(true),
                    selected_by_default: Some(true),
                    ..Metadata::default()
                },
            });
        }

        Self {
            tap_stream_id: definition.name.to_string(),
            stream: definition.name.to_string(),
            schema: schema.to_json_schema(),
            key_properties,
            replication_key,
            replication_method: Some(replication_method.to_string()),
            metadata,
        }
    }

    /// Metadata of the stream itself.
    #[must_use]
    pub fn root_metadata(&self) -> Option<&Metadata> {
        self.metadata
            .iter()
            .find(|entry| entry.breadcrumb.is_empty())
            .map(|entry| &entry.metadata)
    }

    /// Metadata of a top-level property.
    #[must_use]
    pub fn property_metadata(&self, name: &str) -> Option<&Metadata> {
        self.metadata
            .iter()
            .find(|entry| {
                entry.breadcrumb.len() == 2
                    && entry.breadcrumb[0] == "properties"
                    && entry.breadcrumb[1] == name
            })
            .map(|entry| &entry.metadata)
    }

    /// A stream is synced unless its root metadata deselects it, either
    /// with `selected` or, when that is absent, `selected-by-default`.
    #[must_use]
    pub fn is_selected(&self) -> bool {
        self.root_metadata()
            .and_then(|metadata| metadata.selected.or(metadata.selected_by_default))
            .unwrap_or(true)
    }

    /// A property is emitted when it is automatic, selected (explicitly or
    /// through `selected-by-default`), or has no metadata at all.
    #[must_use]
    pub fn is_property_selected(&self, name: &str) -> bool {
        self.property_metadata(name).map_or(true, |metadata| {
            match metadata.inclusion {
                Some(Inclusion::Automatic) => true,
                Some(Inclusion::Unsupported) => false,
                _ => metadata
                    .selected
                    .or(metadata.selected_by_default)
                    .unwrap_or(false),
            }
        })
    }

    /// Names of the selected top-level properties of [`Self::schema`].
    #[must_use]
    pub fn selected_properties(&self) -> BTreeSet<String> {
        self.schema
            .get("properties")
            .and_then(Value::as_object)
            .map(|properties| {
                properties
                    .keys()
                    .filter(|name| self.is_property_selected(name))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Sets the stream's root selection.
    pub fn set_selected(&mut self, selected: bool) {
        self.metadata_mut(Vec::new()).selected = Some(selected);
    }

    /// Sets a property's selection.
    pub fn set_property_selected(&mut self, name: &str, selected: bool) {
        self.metadata_mut(vec!["properties".to_string(), name.to_string()])
            .selected = Some(selected);
    }

    fn metadata_mut(&mut self, breadcrumb: Vec<String>) -> &mut Metadata {
        let index = match self.metadata.iter().position(|e| e.breadcrumb == breadcrumb) {
            Some(index) => index,
            None => {
                self.metadata.push(MetadataEntry {
                    breadcrumb,
                    metadata: Metadata::default(),
                });
                self.metadata.len() - 1
            }
        };
        &mut self.metadata[index].metadata
    }
}

/// A Singer catalog.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    /// Streams in the catalog.
    pub streams: Vec<CatalogEntry>,
}

impl Catalog {
    /// Reads a catalog file.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError`] if the file cannot be read or parsed.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        read_json(path.as_ref())
    }

    /// Looks up a stream by `tap_stream_id`.
    #[must_use]
    pub fn get(&self, tap_stream_id: &str) -> Option<&CatalogEntry> {
        self.streams
            .iter()
            .find(|entry| entry.tap_stream_id == tap_stream_id)
    }

    /// Mutable lookup by `tap_stream_id`.
    pub fn get_mut(&mut self, tap_stream_id: &str) -> Option<&mut CatalogEntry> {
        self.streams
            .iter_mut()
            .find(|entry| entry.tap_stream_id == tap_stream_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::streams;
    use serde_json::json;

    #[test]
    fn test_discovered_entry_marks_keys_automatic() {
        let entry = CatalogEntry::from_definition(&streams::transactions::definition());

        assert_eq!(entry.tap_stream_id, "transactions");
        assert_eq!(entry.key_properties, ["id"]);
        assert_eq!(entry.replication_key.as_deref(), Some("createdAt"));
        assert_eq!(entry.replication_method.as_deref(), Some(INCREMENTAL));
        assert_eq!(
            entry.property_metadata("id").unwrap().inclusion,
            Some(Inclusion::Automatic)
        );
        assert_eq!(
            entry.property_metadata("createdAt").unwrap().inclusion,
            Some(Inclusion::Automatic)
        );
        assert!(entry.is_selected());
    }

    #[test]
    fn test_discovered_entry_serializes_singer_metadata_keys() {
        let entry = CatalogEntry::from_definition(&streams::app::definition());
        let value = serde_json::to_value(&entry).unwrap();

        assert_eq!(value["replication_method"], FULL_TABLE);
        assert!(value.get("replication_key").is_none());
        let root = &value["metadata"][0];
        assert_eq!(root["breadcrumb"], json!([]));
        assert_eq!(root["metadata"]["table-key-properties"], json!(["id"]));
        assert_eq!(root["metadata"]["forced-replication-method"], FULL_TABLE);
        assert_eq!(root["metadata"]["selected-by-default"], true);
    }

    #[test]
    fn test_selection_rules() {
        let mut entry = CatalogEntry::from_definition(&streams::transactions::definition());
        entry.set_property_selected("id", false);
        entry.set_property_selected("createdAt", false);

        // automatic properties ignore deselection
        assert!(entry.is_property_selected("id"));
        assert!(entry.is_property_selected("createdAt"));
        // properties without metadata are selected
        assert!(entry.is_property_selected("somethingElse"));

        entry.metadata.push(MetadataEntry {
            breadcrumb: vec!["properties".to_string(), "note".to_string()],
            metadata: Metadata {
                inclusion: Some(Inclusion::Available),
                ..Metadata::default()
            },
        });
        assert!(!entry.is_property_selected("note"));
    }

    #[test]
    fn test_selected_by_default_applies_without_explicit_choice() {
        let mut entry = CatalogEntry::from_definition(&streams::events::definition());
        entry.metadata.push(MetadataEntry {
            breadcrumb: vec!["properties".to_string(), "shop_extra".to_string()],
            metadata: Metadata {
                inclusion: Some(Inclusion::Available),
                selected_by_default: Some(true),
                ..Metadata::default()
            },
        });
        assert!(entry.is_property_selected("shop_extra"));

        // an explicit choice wins over the default
        entry.set_property_selected("shop_extra", false);
        assert!(!entry.is_property_selected("shop_extra"));

        entry.metadata[0].metadata.selected = None;
        entry.metadata[0].metadata.selected_by_default = Some(false);
        assert!(!entry.is_selected());
    }

    #[test]
    fn test_stream_deselection() {
        let mut entry = CatalogEntry::from_definition(&streams::events::definition());
        assert!(entry.is_selected());
        entry.set_selected(false);
        assert!(!entry.is_selected());

        entry.metadata.clear();
        assert!(entry.is_selected());
    }

    #[test]
    fn test_selected_properties_follow_schema() {
        let mut entry = CatalogEntry::from_definition(&streams::events::definition());
        entry.set_property_selected("shop_name", false);

        let selected = entry.selected_properties();
        assert!(selected.contains("type"));
        assert!(selected.contains("occurredAt"));
        assert!(!selected.contains("shop_name"));
    }

    #[test]
    fn test_catalog_parses_minimal_document() {
        let catalog: Catalog = serde_json::from_value(json!({
            "streams": [{
                "tap_stream_id": "transactions",
                "stream": "transactions",
                "schema": {"properties": {"id": {"type": "string"}}},
                "metadata": [{"breadcrumb": [], "metadata": {"selected": false, "custom": 1}}]
            }]
        }))
        .unwrap();

        let entry = catalog.get("transactions").unwrap();
        assert!(!entry.is_selected());
        assert!(entry.key_properties.is_empty());
        assert_eq!(entry.root_metadata().unwrap().extra["custom"], 1);
        assert!(catalog.get("events").is_none());
    }

    #[test]
    fn test_from_path_reports_missing_file() {
        let result = Catalog::from_path("/definitely/not/here.json");
        assert!(matches!(result, Err(CatalogError::Io { .. })));
    }
}
