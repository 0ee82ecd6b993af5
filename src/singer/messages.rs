//! Singer messages and the line-delimited writer.

use std::io::{self, Write};

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

/// One Singer message.
///
/// Serialized with a `type` tag, e.g.
/// `{"type":"RECORD","stream":"transactions","record":{...},"time_extracted":"..."}`.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Message {
    /// Describes the records that follow for a stream.
    Schema {
        /// Stream name.
        stream: String,
        /// JSON Schema of the records.
        schema: Value,
        /// Primary key fields.
        key_properties: Vec<String>,
        /// Replication key fields.
        #[serde(skip_serializing_if = "Vec::is_empty")]
        bookmark_properties: Vec<String>,
    },
    /// One extracted record.
    Record {
        /// Stream name.
        stream: String,
        /// The record.
        record: Value,
        /// When the record was read.
        time_extracted: DateTime<Utc>,
    },
    /// A checkpoint of the tap's bookmarks.
    State {
        /// The state document.
        value: Value,
    },
}

impl Message {
    /// Builds a `RECORD` stamped with the current time.
    #[must_use]
    pub fn record(stream: impl Into<String>, record: Value) -> Self {
        Self::Record {
            stream: stream.into(),
            record,
            time_extracted: Utc::now(),
        }
    }
}

/// Writes messages as JSON lines, flushing after each one.
#[derive(Debug)]
pub struct MessageWriter<W: Write> {
    out: W,
    written: u64,
}

impl<W: Write> MessageWriter<W> {
    /// Wraps an output, usually a locked stdout.
    pub const fn new(out: W) -> Self {
        Self { out, written: 0 }
    }

    /// Writes one message followed by a newline.
    ///
    /// # Errors
    ///
    /// Returns any I/O error from the underlying writer.
    pub fn write(&mut self, message: &Message) -> io::Result<()> {
        serde_json::to_writer(&mut self.out, message)?;
        self.out.write_all(b"\n")?;
        self.out.flush()?;
        self.written += 1;
        Ok(())
    }

    /// Number of messages written so far.
    pub const fn written(&self) -> u64 {
        self.written
    }

    /// Returns the underlying output.
    pub fn into_inner(self) -> W {
        self.out
    }
}
