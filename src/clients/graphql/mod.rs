//! GraphQL client for the Shopify Partner API.
//!
//! - [`GraphqlClient`]: executes queries against
//!   `/{partner_id}/api/{version}/graphql.json`
//! - [`GraphqlError`]: HTTP failures plus GraphQL `errors` returned with
//!   status 200
//!
//! # Response Structure
//!
//! Partner API responses contain:
//!
//! - `data`: The query result data
//! - `errors`: GraphQL errors (still HTTP 200), e.g. `THROTTLED`
//! - `extensions.cost`: The query cost and the throttle bucket state, which
//!   drives [`crate::throttle::PageSizer`]

mod client;
mod errors;

pub use client::GraphqlClient;
pub use errors::{GraphqlError, GraphqlErrorDetail, THROTTLED_CODE};
