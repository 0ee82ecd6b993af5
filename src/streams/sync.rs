//! The per-stream extraction loop.

use std::collections::BTreeSet;
use std::io::Write;

use chrono::{DateTime, Utc};
use serde_json::{json, Map, Value};
use thiserror::Error;
use tracing::{debug, info, warn};

use super::definition::{StreamDefinition, StreamKind};
use crate::clients::{GraphqlClient, GraphqlError};
use crate::config::{parse_start_date, TapConfig};
use crate::extract::{JsonPath, PathError};
use crate::query::minify;
use crate::singer::{Message, MessageWriter};
use crate::throttle::{PagePlan, PageSizer, QueryCost, MAX_THROTTLED_RETRIES};

/// Format of the replication filter variable.
pub const FILTER_TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Errors raised while syncing a stream.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The API request failed.
    #[error(transparent)]
    Graphql(#[from] GraphqlError),

    /// A response path could not be built.
    #[error(transparent)]
    Path(#[from] PathError),

    /// The stream queries an app but no `app_id` is configured.
    #[error("Stream '{stream}' requires 'app_id' to be configured")]
    MissingAppId {
        /// The stream.
        stream: String,
    },

    /// The state bookmark is not a timestamp.
    #[error("Stream '{stream}' has an invalid bookmark: {value}")]
    InvalidBookmark {
        /// The stream.
        stream: String,
        /// The rejected value.
        value: Value,
    },

    /// The API returned the cursor it was just given.
    #[error("Stream '{stream}' returned page token '{token}' twice")]
    PaginationLoop {
        /// The stream.
        stream: String,
        /// The repeated cursor.
        token: String,
    },

    /// The API kept answering `THROTTLED`.
    #[error("Stream '{stream}' was still throttled after {retries} retries")]
    Throttled {
        /// The stream.
        stream: String,
        /// Retries attempted.
        retries: u32,
    },

    /// Writing a message failed.
    #[error("Failed to write message: {0}")]
    Io(#[from] std::io::Error),
}

/// A stream being synced: its compiled query, throttle state and bookmark.
#[derive(Debug)]
pub struct StreamSync<'a> {
    definition: &'a StreamDefinition,
    client: &'a GraphqlClient,
    query: String,
    records_path: JsonPath,
    has_next_path: JsonPath,
    cursor_path: JsonPath,
    sizer: PageSizer,
    app_global_id: Option<String>,
    starting_timestamp: Option<DateTime<Utc>>,
    bookmark: Option<Value>,
}

impl<'a> StreamSync<'a> {
    /// Prepares a stream for syncing.
    ///
    /// `selected` holds the output properties to query and `bookmark` the
    /// stream's replication value from state.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::MissingAppId`] when the stream needs an app and
    /// none is configured, and [`SyncError::InvalidBookmark`] when the state
    /// value is not a timestamp.
    pub fn new(
        definition: &'a StreamDefinition,
        client: &'a GraphqlClient,
        config: &TapConfig,
        selected: &BTreeSet<String>,
        bookmark: Option<&Value>,
    ) -> Result<Self, SyncError> {
        let app_global_id = match (definition.requires_app_id(), config.app_id()) {
            (true, None) => {
                return Err(SyncError::MissingAppId {
                    stream: definition.name.to_string(),
                })
            }
            (_, app_id) => app_id.map(crate::config::AppId::global_id),
        };

        let bookmark = definition.replication_key.and(bookmark).cloned();
        let starting_timestamp = match &bookmark {
            Some(value) => Some(
                value
                    .as_str()
                    .and_then(|s| parse_start_date(s).ok())
                    .ok_or_else(|| SyncError::InvalidBookmark {
                        stream: definition.name.to_string(),
                        value: value.clone(),
                    })?,
            ),
            None => config.start_date(),
        };

        Ok(Self {
            definition,
            client,
            query: definition.compile_query(selected),
            records_path: definition.records_path()?,
            has_next_path: definition.has_next_page_path()?,
            cursor_path: definition.last_cursor_path()?,
            sizer: PageSizer::new(),
            app_global_id,
            starting_timestamp,
            bookmark,
        })
    }

    /// Bookmark from state, else `start_date`.
    #[must_use]
    pub const fn starting_timestamp(&self) -> Option<DateTime<Utc>> {
        self.starting_timestamp
    }

    /// Greatest replication value seen so far, including the state bookmark.
    #[must_use]
    pub const fn bookmark(&self) -> Option<&Value> {
        self.bookmark.as_ref()
    }

    /// Variables for the next request.
    #[must_use]
    pub fn request_variables(&self, plan: &PagePlan, next_page_token: Option<&str>) -> Map<String, Value> {
        let mut variables = Map::new();
        if self.definition.kind == StreamKind::Connection {
            variables.insert("first".to_string(), json!(plan.first));
            if let Some(token) = next_page_token {
                variables.insert("after".to_string(), json!(token));
            }
            if let (Some(filter), Some(_), Some(start)) = (
                self.definition.replication_filter,
                self.definition.replication_key,
                self.starting_timestamp,
            ) {
                variables.insert(
                    filter.to_string(),
                    json!(start.format(FILTER_TIMESTAMP_FORMAT).to_string()),
                );
            }
        }
        if let (Some(name), Some(id)) = (self.definition.app_variable, &self.app_global_id) {
            variables.insert(name.to_string(), json!(id));
        }
        variables
    }

    /// The request body: the minified query and its variables.
    #[must_use]
    pub fn prepare_request_payload(&self, plan: &PagePlan, next_page_token: Option<&str>) -> Value {
        debug!("Attempting query:\n{}", self.query.trim_start());
        json!({
            "query": minify(&self.query),
            "variables": self.request_variables(plan, next_page_token),
        })
    }

    /// Records the response's cost and returns its records.
    pub fn parse_response(&mut self, body: &Value) -> Vec<Value> {
        info!("Parsing response for stream {}", self.definition.name);
        if let Some(cost) = QueryCost::from_body(body) {
            self.sizer.observe(&cost);
        }
        self.records_path
            .select(body)
            .into_iter()
            .filter(|record| !record.is_null())
            .cloned()
            .collect()
    }

    /// Cursor of the next page, if the connection has one.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::PaginationLoop`] when the cursor equals
    /// `previous`.
    pub fn next_page_token(
        &self,
        body: &Value,
        previous: Option<&str>,
    ) -> Result<Option<String>, SyncError> {
        if self.definition.kind == StreamKind::SingleObject {
            return Ok(None);
        }
        let has_next = self
            .has_next_path
            .first(body)
            .and_then(Value::as_bool)
            .unwrap_or(false);
        if !has_next {
            return Ok(None);
        }
        let Some(cursor) = self.cursor_path.first(body).and_then(Value::as_str) else {
            warn!(
                "Stream {} reported another page but returned no cursor",
                self.definition.name
            );
            return Ok(None);
        };
        if previous == Some(cursor) {
            return Err(SyncError::PaginationLoop {
                stream: self.definition.name.to_string(),
                token: cursor.to_string(),
            });
        }
        Ok(Some(cursor.to_string()))
    }

    /// Flattens configured nested objects into `<field>_<nested>` keys.
    #[must_use]
    pub fn post_process(&self, record: Value) -> Value {
        let Value::Object(mut map) = record else {
            return record;
        };
        for field in self.definition.flatten {
            if let Some(Value::Object(nested)) = map.remove(*field) {
                for (key, value) in nested {
                    map.insert(format!("{field}_{key}"), value);
                }
            }
        }
        Value::Object(map)
    }

    /// Syncs every page, writing one `RECORD` per record.
    ///
    /// Returns the number of records written.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError`] on request, pagination or output failures.
    pub async fn sync<W: Write>(&mut self, writer: &mut MessageWriter<W>) -> Result<u64, SyncError> {
        if let Some(start) = self.starting_timestamp() {
            info!(
                "Requesting {} records since {}",
                self.definition.name,
                start.format(FILTER_TIMESTAMP_FORMAT)
            );
        }
        let mut token: Option<String> = None;
        let mut count = 0;
        loop {
            let body = self.fetch_page(token.as_deref()).await?;
            for record in self.parse_response(&body) {
                let record = self.post_process(record);
                self.track_bookmark(&record);
                writer.write(&Message::record(self.definition.name, record))?;
                count += 1;
            }
            match self.next_page_token(&body, token.as_deref())? {
                Some(next) => token = Some(next),
                None => break,
            }
        }
        info!("Synced {} record(s) for stream {}", count, self.definition.name);
        Ok(count)
    }

    async fn fetch_page(&self, token: Option<&str>) -> Result<Value, SyncError> {
        let plan = self.sizer.plan();
        if !plan.wait.is_zero() {
            info!(
                "Waiting {}s for the query cost bucket to refill before the next {} page",
                plan.wait.as_secs(),
                self.definition.name
            );
            tokio::time::sleep(plan.wait).await;
        }
        debug!("Requesting {} record(s) for stream {}", plan.first, self.definition.name);

        let payload = self.prepare_request_payload(&plan, token);
        let query = payload["query"].as_str().unwrap_or_default();
        let variables = payload.get("variables").cloned();

        let mut retries = 0;
        loop {
            match self.client.query(query, variables.clone()).await {
                Ok(response) => return Ok(response.body),
                Err(error) if error.is_throttled() => {
                    if retries >= MAX_THROTTLED_RETRIES {
                        return Err(SyncError::Throttled {
                            stream: self.definition.name.to_string(),
                            retries,
                        });
                    }
                    retries += 1;
                    let wait = error
                        .extensions()
                        .and_then(QueryCost::from_extensions)
                        .map_or(std::time::Duration::from_secs(1), |cost| cost.throttled_wait());
                    warn!(
                        "Stream {} throttled, retrying in {}s (retry {} of {})",
                        self.definition.name,
                        wait.as_secs(),
                        retries,
                        MAX_THROTTLED_RETRIES
                    );
                    tokio::time::sleep(wait).await;
                }
                Err(error) => return Err(error.into()),
            }
        }
    }

    fn track_bookmark(&mut self, record: &Value) {
        let Some(key) = self.definition.replication_key else {
            return;
        };
        let Some(candidate) = record.get(key).filter(|v| !v.is_null()) else {
            return;
        };
        let newer = match &self.bookmark {
            None => true,
            Some(current) => is_newer(candidate, current),
        };
        if newer {
            self.bookmark = Some(candidate.clone());
        }
    }
}

/// Compares replication values as timestamps when both parse, else as strings.
fn is_newer(candidate: &Value, current: &Value) -> bool {
    match (candidate.as_str(), current.as_str()) {
        (Some(candidate), Some(current)) => {
            match (parse_start_date(candidate), parse_start_date(current)) {
                (Ok(candidate), Ok(current)) => candidate > current,
                _ => candidate > current,
            }
        }
        _ => match (candidate.as_f64(), current.as_f64()) {
            (Some(candidate), Some(current)) => candidate > current,
            _ => false,
        },
    }
}
