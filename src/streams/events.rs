//! `events`: install, uninstall, charge and credit events of one app.

use super::definition::{StreamDefinition, StreamKind};
use crate::query::{Property, QueryTemplate, Schema};

/// Stream name.
pub const NAME: &str = "events";

const TEMPLATE: &str = r"
    query tapShopify($id: ID!, $first: Int, $after: String, $occurredAtMin: DateTime) {
        app(id: $id) {
            __query_name__(first: $first, after: $after, occurredAtMin: $occurredAtMin) {
                edges {
                    cursor
                    node {
                        __selected_fields__
                    }
                },
                pageInfo {
                    hasNextPage
                }
            }
        }
    }
";

/// Definition of the `events` stream.
#[must_use]
pub fn definition() -> StreamDefinition {
    StreamDefinition {
        name: NAME,
        query_name: "events",
        data_path: "app.events",
        schema: Schema::new()
            .property("type", Property::String)
            .property("occurredAt", Property::DateTime)
            .property(
                "shop",
                Property::Object(
                    Schema::new()
                        .property("id", Property::String)
                        .property("name", Property::String)
                        .property("myshopifyDomain", Property::String),
                ),
            ),
        primary_keys: &["type", "occurredAt", "shop_id"],
        replication_key: Some("occurredAt"),
        replication_filter: Some("occurredAtMin"),
        kind: StreamKind::Connection,
        template: QueryTemplate::new(TEMPLATE),
        app_variable: Some("id"),
        flatten: &["shop"],
    }
}
