//! Stream definitions and the sync loop.
//!
//! | stream         | records path                         | replication key |
//! |----------------|--------------------------------------|-----------------|
//! | `transactions` | `$.data.transactions.edges[*].node`  | `createdAt`     |
//! | `events`       | `$.data.app.events.edges[*].node`    | `occurredAt`    |
//! | `app`          | `$.data.app`                         | none            |
//!
//! `events` and `app` query a single app and need `app_id`.

pub mod app;
mod definition;
pub mod events;
mod sync;
pub mod transactions;

pub use definition::{StreamDefinition, StreamKind};
pub use sync::{StreamSync, SyncError, FILTER_TIMESTAMP_FORMAT};

/// Every stream the tap knows, in sync order.
#[must_use]
pub fn all() -> Vec<StreamDefinition> {
    vec![
        transactions::definition(),
        events::definition(),
        app::definition(),
    ]
}
