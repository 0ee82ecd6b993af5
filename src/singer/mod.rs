//! Singer protocol types.
//!
//! - [`Message`] and [`MessageWriter`]: `SCHEMA`, `RECORD` and `STATE`
//!   messages written as JSON lines to stdout
//! - [`Catalog`]: discovered streams and the user's selection
//! - [`TapState`]: replication bookmarks carried between runs

mod catalog;
mod messages;
mod state;

pub use catalog::{
    Catalog, CatalogEntry, CatalogError, Inclusion, Metadata, MetadataEntry, FULL_TABLE,
    INCREMENTAL,
};
pub use messages::{Message, MessageWriter};
pub use state::{Bookmark, TapState};
