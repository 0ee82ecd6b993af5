//! `app`: the configured app itself.

use super::definition::{StreamDefinition, StreamKind};
use crate::query::{Property, QueryTemplate, Schema};

/// Stream name.
pub const NAME: &str = "app";

const TEMPLATE: &str = r"
    query tapShopify($id: ID!) {
        __query_name__(id: $id) {
            __selected_fields__
        }
    }
";

/// Definition of the `app` stream.
#[must_use]
pub fn definition() -> StreamDefinition {
    StreamDefinition {
        name: NAME,
        query_name: "app",
        data_path: "app",
        schema: Schema::new()
            .property("id", Property::String)
            .property("name", Property::String)
            .property("apiKey", Property::String),
        primary_keys: &["id"],
        replication_key: None,
        replication_filter: None,
        kind: StreamKind::SingleObject,
        template: QueryTemplate::new(TEMPLATE),
        app_variable: Some("id"),
        flatten: &[],
    }
}
