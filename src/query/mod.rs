//! GraphQL query compilation.
//!
//! Each stream declares its fields once as a [`Schema`]. The fields the
//! catalog selects are compiled into a selection set by
//! [`compile_selection`], substituted into the stream's [`QueryTemplate`]
//! and collapsed to one line with [`minify`] before being sent.
//!
//! # Example
//!
//! ```rust
//! use tap_shopify_partner::query::{compile_selection, minify, Property, QueryTemplate, Schema};
//!
//! let schema = Schema::new()
//!     .property("id", Property::String)
//!     .property("createdAt", Property::DateTime);
//!
//! let query = QueryTemplate::connection().render("transactions", &compile_selection(&schema));
//! assert!(minify(&query).contains("node { id createdAt }"));
//! ```

mod schema;
mod selection;
mod template;

pub use schema::{Property, Schema};
pub use selection::{compile_selection, selected_fields};
pub use template::{minify, QueryTemplate, QUERY_NAME_PLACEHOLDER, SELECTED_FIELDS_PLACEHOLDER};
