//! Static description of a stream.

use std::collections::BTreeSet;

use crate::extract::{JsonPath, PathError};
use crate::query::{compile_selection, selected_fields, Property, QueryTemplate, Schema};

/// How a stream's query returns its records.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StreamKind {
    /// A cursor-paginated connection (`edges`, `node`, `pageInfo`).
    Connection,
    /// One object, no pagination.
    SingleObject,
}

/// Everything needed to query and emit one stream.
#[derive(Clone, Debug)]
pub struct StreamDefinition {
    /// Stream name in the catalog and in messages.
    pub name: &'static str,
    /// Root query field substituted for `__query_name__`.
    pub query_name: &'static str,
    /// Dotted path below `$.data` to the connection or object,
    /// e.g. `app.events`.
    pub data_path: &'static str,
    /// Fields as queried from the API.
    pub schema: Schema,
    /// Primary key fields of emitted records.
    pub primary_keys: &'static [&'static str],
    /// Field tracked for incremental sync.
    pub replication_key: Option<&'static str>,
    /// Query variable receiving the starting timestamp.
    pub replication_filter: Option<&'static str>,
    /// Connection or single object.
    pub kind: StreamKind,
    /// Query template.
    pub template: QueryTemplate,
    /// Query variable receiving the app's global id.
    pub app_variable: Option<&'static str>,
    /// Object fields flattened into `<field>_<nested>` on emission.
    pub flatten: &'static [&'static str],
}

impl StreamDefinition {
    /// Whether the stream needs `app_id` to be configured.
    #[must_use]
    pub const fn requires_app_id(&self) -> bool {
        self.app_variable.is_some()
    }

    /// Schema of emitted records, after flattening.
    #[must_use]
    pub fn output_schema(&self) -> Schema {
        let mut output = Schema::new();
        for (name, property) in self.schema.properties() {
            match property {
                Property::Object(nested) if self.flattens(name) => {
                    for (field, inner) in nested.properties() {
                        output = output.property(format!("{name}_{field}"), inner.clone());
                    }
                }
                _ => output = output.property(name.clone(), property.clone()),
            }
        }
        output
    }

    /// Maps selected output properties back to the queried schema.
    ///
    /// A flattened object is queried with only the nested fields whose
    /// flattened names are selected.
    #[must_use]
    pub fn query_schema(&self, selected: &BTreeSet<String>) -> Schema {
        let mut wanted: BTreeSet<String> = selected
            .iter()
            .filter(|name| !self.flattens(name))
            .cloned()
            .collect();
        wanted.extend(self.flatten.iter().map(|name| (*name).to_string()));

        let mut query = Schema::new();
        for (name, property) in selected_fields(&self.schema, &wanted).properties() {
            match property {
                Property::Object(nested) if self.flattens(name) => {
                    let kept = nested.filtered(|field| selected.contains(&format!("{name}_{field}")));
                    if !kept.is_empty() {
                        query = query.property(name.clone(), Property::Object(kept));
                    }
                }
                _ => query = query.property(name.clone(), property.clone()),
            }
        }
        query
    }

    /// Renders the full query for the selected output properties.
    #[must_use]
    pub fn compile_query(&self, selected: &BTreeSet<String>) -> String {
        self.template
            .render(self.query_name, &compile_selection(&self.query_schema(selected)))
    }

    /// Path to the records of a response.
    ///
    /// # Errors
    ///
    /// Returns [`PathError`] if `data_path` is not a valid path.
    pub fn records_path(&self) -> Result<JsonPath, PathError> {
        match self.kind {
            StreamKind::Connection => {
                JsonPath::parse(&format!("$.data.{}.edges[*].node", self.data_path))
            }
            StreamKind::SingleObject => JsonPath::parse(&format!("$.data.{}", self.data_path)),
        }
    }

    /// Path to `pageInfo.hasNextPage`.
    ///
    /// # Errors
    ///
    /// Returns [`PathError`] if `data_path` is not a valid path.
    pub fn has_next_page_path(&self) -> Result<JsonPath, PathError> {
        JsonPath::parse(&format!("$.data.{}.pageInfo.hasNextPage", self.data_path))
    }

    /// Path to the cursor of the last edge.
    ///
    /// # Errors
    ///
    /// Returns [`PathError`] if `data_path` is not a valid path.
    pub fn last_cursor_path(&self) -> Result<JsonPath, PathError> {
        JsonPath::parse(&format!("$.data.{}.edges[-1].cursor", self.data_path))
    }

    fn flattens(&self, name: &str) -> bool {
        self.flatten.contains(&name)
    }
}
