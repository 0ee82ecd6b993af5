//! Singer state: per-stream replication bookmarks.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::catalog::{read_json, CatalogError};

/// The replication bookmark of one stream.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Bookmark {
    /// The replication key field.
    pub replication_key: String,
    /// The greatest value synced so far.
    pub replication_key_value: Value,
}

/// The state document:
/// `{"bookmarks": {"<stream>": {"replication_key", "replication_key_value"}}}`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TapState {
    /// Bookmarks by stream name.
    #[serde(default)]
    pub bookmarks: BTreeMap<String, Bookmark>,
    /// Keys this tap does not interpret, passed through unchanged.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl TapState {
    /// Reads a state file.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError`] if the file cannot be read or parsed.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        read_json(path.as_ref())
    }

    /// The bookmark value of a stream, if its replication key matches.
    #[must_use]
    pub fn bookmark(&self, stream: &str, replication_key: &str) -> Option<&Value> {
        self.bookmarks
            .get(stream)
            .filter(|bookmark| bookmark.replication_key == replication_key)
            .map(|bookmark| &bookmark.replication_key_value)
    }

    /// Stores a stream's bookmark.
    pub fn set_bookmark(&mut self, stream: &str, replication_key: &str, value: Value) {
        self.bookmarks.insert(
            stream.to_string(),
            Bookmark {
                replication_key: replication_key.to_string(),
                replication_key_value: value,
            },
        );
    }

    /// Renders the state as the value of a `STATE` message.
    #[must_use]
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or_else(|_| Value::Object(Map::new()))
    }
}
