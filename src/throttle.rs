//! Cost-aware page sizing for the Partner API.
//!
//! Every Partner API response reports the cost of the query and the state
//! of the caller's leaky bucket in `extensions.cost`:
//!
//! ```json
//! {
//!   "requestedQueryCost": 12,
//!   "actualQueryCost": 10,
//!   "throttleStatus": {
//!     "maximumAvailable": 1000.0,
//!     "currentlyAvailable": 990,
//!     "restoreRate": 50.0
//!   }
//! }
//! ```
//!
//! [`PageSizer`] turns that into the `first` argument of the next page and,
//! when the bucket runs low, a wait that lets it refill.

use std::time::Duration;

use serde::Deserialize;

/// Largest page the API accepts.
pub const MAX_PAGE_SIZE: u32 = 250;

/// Below this many affordable pages the sizer waits for the bucket to refill.
pub const MIN_AFFORDABLE_PAGES: f64 = 5.0;

/// Cost ceiling of a single query.
pub const MAX_QUERY_COST: f64 = 1000.0;

/// Attempts allowed for one page while the API answers `THROTTLED`.
pub const MAX_THROTTLED_RETRIES: u32 = 5;

/// Converts server-supplied seconds to a [`Duration`].
///
/// Negative and NaN values wait nothing; values too large for a `Duration`
/// saturate instead of panicking.
#[must_use]
pub fn wait_seconds(seconds: f64) -> Duration {
    Duration::try_from_secs_f64(seconds.max(0.0)).unwrap_or(Duration::MAX)
}

/// The `extensions.cost` object of a response.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryCost {
    /// Points the query was estimated to cost.
    #[serde(default)]
    pub requested_query_cost: Option<f64>,
    /// Points the query actually cost (absent on throttled responses).
    #[serde(default)]
    pub actual_query_cost: Option<f64>,
    /// Bucket state after the query.
    #[serde(default)]
    pub throttle_status: Option<ThrottleStatus>,
}

/// Bucket state reported with every response.
#[derive(Clone, Copy, Debug, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThrottleStatus {
    /// Bucket size.
    #[serde(default)]
    pub maximum_available: f64,
    /// Points left.
    #[serde(default)]
    pub currently_available: f64,
    /// Points restored per second.
    #[serde(default)]
    pub restore_rate: f64,
}

impl QueryCost {
    /// Reads `cost` from a response's `extensions` object.
    #[must_use]
    pub fn from_extensions(extensions: &serde_json::Value) -> Option<Self> {
        extensions
            .get("cost")
            .and_then(|cost| serde_json::from_value(cost.clone()).ok())
    }

    /// Reads `extensions.cost` from a whole response body.
    #[must_use]
    pub fn from_body(body: &serde_json::Value) -> Option<Self> {
        body.get("extensions").and_then(Self::from_extensions)
    }

    /// Time to wait before retrying a throttled query:
    /// `ceil((requested - available) / restore_rate)` seconds, never negative.
    #[must_use]
    pub fn throttled_wait(&self) -> Duration {
        let Some(status) = self.throttle_status else {
            return Duration::from_secs(1);
        };
        let requested = self.requested_query_cost.unwrap_or(0.0);
        if status.restore_rate <= 0.0 {
            return Duration::from_secs(1);
        }
        let seconds = ((requested - status.currently_available) / status.restore_rate).ceil();
        wait_seconds(seconds)
    }
}

/// Page size and pre-request wait computed by [`PageSizer::plan`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PagePlan {
    /// Value of the `first` variable.
    pub first: u32,
    /// How long to sleep before sending the request.
    pub wait: Duration,
}

/// Tracks the query cost and bucket state across the pages of one stream.
///
/// The query cost is latched from the first observed response; the bucket
/// state is refreshed from every response.
#[derive(Clone, Debug, Default)]
pub struct PageSizer {
    query_cost: Option<f64>,
    available_points: Option<f64>,
    restore_rate: Option<f64>,
    max_points: Option<f64>,
}

impl PageSizer {
    /// Creates a sizer with no observations; the first page requests one record.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            query_cost: None,
            available_points: None,
            restore_rate: None,
            max_points: None,
        }
    }

    /// Records the cost metadata of a response.
    pub fn observe(&mut self, cost: &QueryCost) {
        if self.query_cost.is_none() {
            self.query_cost = cost.requested_query_cost;
        }
        if let Some(status) = cost.throttle_status {
            self.available_points = Some(status.currently_available);
            self.restore_rate = Some(status.restore_rate);
            self.max_points = Some(status.maximum_available);
        }
    }

    /// Latched query cost, if any response has been observed.
    #[must_use]
    pub const fn query_cost(&self) -> Option<f64> {
        self.query_cost
    }

    /// Points left according to the latest response.
    #[must_use]
    pub const fn available_points(&self) -> Option<f64> {
        self.available_points
    }

    /// Computes the next page size.
    #[must_use]
    pub fn plan(&self) -> PagePlan {
        let available = match self.available_points {
            Some(points) if points > 0.0 => points,
            _ => {
                return PagePlan {
                    first: 1,
                    wait: Duration::ZERO,
                }
            }
        };
        let cost = match self.query_cost {
            Some(cost) if cost > 0.0 => cost,
            _ => {
                return PagePlan {
                    first: MAX_PAGE_SIZE,
                    wait: Duration::ZERO,
                }
            }
        };
        let max_points = self.max_points.unwrap_or(available);
        let restore_rate = self.restore_rate.unwrap_or(0.0);

        let mut wait = Duration::ZERO;
        let mut pages = available / cost;
        if pages < MIN_AFFORDABLE_PAGES {
            if restore_rate > 0.0 {
                let seconds = ((max_points - available) / restore_rate).floor() - 1.0;
                wait = wait_seconds(seconds);
            }
            pages = (max_points - restore_rate) / cost - 1.0;
        } else if pages > MIN_AFFORDABLE_PAGES {
            if cost * pages >= MAX_QUERY_COST {
                pages = (MAX_QUERY_COST / cost).floor();
            } else {
                pages = pages.min(f64::from(MAX_PAGE_SIZE));
            }
        }

        PagePlan {
            first: clamp_page_size(pages),
            wait,
        }
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn clamp_page_size(pages: f64) -> u32 {
    let pages = pages.trunc();
    if pages.is_nan() || pages < 1.0 {
        1
    } else if pages >= f64::from(MAX_PAGE_SIZE) {
        MAX_PAGE_SIZE
    } else {
        pages as u32
    }
}
