//! `transactions`: the partner's earnings and charges.

use super::definition::{StreamDefinition, StreamKind};
use crate::query::{Property, QueryTemplate, Schema};

/// Stream name.
pub const NAME: &str = "transactions";

/// Definition of the `transactions` stream.
#[must_use]
pub fn definition() -> StreamDefinition {
    StreamDefinition {
        name: NAME,
        query_name: "transactions",
        data_path: "transactions",
        schema: Schema::new()
            .property("id", Property::String)
            .property("createdAt", Property::DateTime),
        primary_keys: &["id"],
        replication_key: Some("createdAt"),
        replication_filter: Some("createdAtMin"),
        kind: StreamKind::Connection,
        template: QueryTemplate::connection_with_filter("createdAtMin", "DateTime"),
        app_variable: None,
        flatten: &[],
    }
}
