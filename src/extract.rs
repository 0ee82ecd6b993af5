//! A small JSONPath subset for walking GraphQL responses.
//!
//! Supported syntax:
//!
//! - `$` the root (required as the first character)
//! - `.name` or `['name']` an object field
//! - `.*` or `[*]` every element of an array or every value of an object
//! - `[n]` an array index; negative indices count from the end
//!
//! # Example
//!
//! ```rust
//! use tap_shopify_partner::extract::JsonPath;
//! use serde_json::json;
//!
//! let body = json!({"data": {"transactions": {"edges": [
//!     {"cursor": "a", "node": {"id": "1"}},
//!     {"cursor": "b", "node": {"id": "2"}}
//! ]}}});
//!
//! let cursor = JsonPath::parse("$.data.transactions.edges[-1].cursor").unwrap();
//! assert_eq!(cursor.first(&body), Some(&json!("b")));
//!
//! let nodes = JsonPath::parse("$.data.transactions.edges[*].node").unwrap();
//! assert_eq!(nodes.select(&body).len(), 2);
//! ```

use std::fmt;
use std::str::FromStr;

use serde_json::Value;
use thiserror::Error;

/// Errors from parsing a path expression.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum PathError {
    /// The path does not start with `$`.
    #[error("Path '{path}' must start with '$'")]
    MissingRoot {
        /// The rejected path.
        path: String,
    },

    /// A `.` or `[` is not followed by a segment.
    #[error("Path '{path}' has an empty segment at position {position}")]
    EmptySegment {
        /// The rejected path.
        path: String,
        /// Byte offset of the empty segment.
        position: usize,
    },

    /// A character that cannot start a segment.
    #[error("Path '{path}' has unexpected '{found}' at position {position}")]
    Unexpected {
        /// The rejected path.
        path: String,
        /// Byte offset of the character.
        position: usize,
        /// The offending character.
        found: char,
    },

    /// A bracket segment that is neither `*`, an integer nor a quoted name.
    #[error("Path '{path}' has invalid bracket segment '[{segment}]'")]
    InvalidBracket {
        /// The rejected path.
        path: String,
        /// Contents of the brackets.
        segment: String,
    },

    /// A `[` without a closing `]`.
    #[error("Path '{path}' has an unterminated '['")]
    Unterminated {
        /// The rejected path.
        path: String,
    },
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum Segment {
    Field(String),
    Wildcard,
    Index(i64),
}

/// A parsed path expression.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct JsonPath {
    raw: String,
    segments: Vec<Segment>,
}

impl JsonPath {
    /// Parses a path expression.
    ///
    /// # Errors
    ///
    /// Returns [`PathError`] when the expression is not in the supported
    /// subset.
    pub fn parse(path: &str) -> Result<Self, PathError> {
        let raw = path.trim();
        let Some(rest) = raw.strip_prefix('$') else {
            return Err(PathError::MissingRoot {
                path: raw.to_string(),
            });
        };

        let mut segments = Vec::new();
        let bytes = rest.as_bytes();
        let mut i = 0;
        while i < bytes.len() {
            let position = i + 1;
            match bytes[i] {
                b'.' => {
                    let start = i + 1;
                    let end = rest[start..]
                        .find(|c| c == '.' || c == '[')
                        .map_or(rest.len(), |offset| start + offset);
                    let name = &rest[start..end];
                    if name.is_empty() {
                        return Err(PathError::EmptySegment {
                            path: raw.to_string(),
                            position,
                        });
                    }
                    segments.push(if name == "*" {
                        Segment::Wildcard
                    } else {
                        Segment::Field(name.to_string())
                    });
                    i = end;
                }
                b'[' => {
                    let start = i + 1;
                    let Some(offset) = rest[start..].find(']') else {
                        return Err(PathError::Unterminated {
                            path: raw.to_string(),
                        });
                    };
                    let end = start + offset;
                    segments.push(parse_bracket(raw, &rest[start..end], position)?);
                    i = end + 1;
                }
                _ => {
                    let found = rest[i..].chars().next().unwrap_or_default();
                    return Err(PathError::Unexpected {
                        path: raw.to_string(),
                        position,
                        found,
                    });
                }
            }
        }

        Ok(Self {
            raw: raw.to_string(),
            segments,
        })
    }

    /// Returns the path as written.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Returns every match, in document order.
    #[must_use]
    pub fn select<'a>(&self, value: &'a Value) -> Vec<&'a Value> {
        let mut current = vec![value];
        for segment in &self.segments {
            let mut next = Vec::new();
            for node in current {
                match (segment, node) {
                    (Segment::Field(name), Value::Object(map)) => {
                        if let Some(child) = map.get(name) {
                            next.push(child);
                        }
                    }
                    (Segment::Wildcard, Value::Array(items)) => next.extend(items.iter()),
                    (Segment::Wildcard, Value::Object(map)) => next.extend(map.values()),
                    (Segment::Index(index), Value::Array(items)) => {
                        if let Some(child) = resolve_index(*index, items.len()).map(|i| &items[i])
                        {
                            next.push(child);
                        }
                    }
                    _ => {}
                }
            }
            current = next;
        }
        current
    }

    /// Returns the first match, if any.
    #[must_use]
    pub fn first<'a>(&self, value: &'a Value) -> Option<&'a Value> {
        self.select(value).into_iter().next()
    }
}

impl FromStr for JsonPath {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for JsonPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

fn parse_bracket(path: &str, segment: &str, position: usize) -> Result<Segment, PathError> {
    let trimmed = segment.trim();
    if trimmed.is_empty() {
        return Err(PathError::EmptySegment {
            path: path.to_string(),
            position,
        });
    }
    if trimmed == "*" {
        return Ok(Segment::Wildcard);
    }
    if let Ok(index) = trimmed.parse::<i64>() {
        return Ok(Segment::Index(index));
    }
    let quoted = trimmed
        .strip_prefix('\'')
        .and_then(|s| s.strip_suffix('\''))
        .or_else(|| trimmed.strip_prefix('"').and_then(|s| s.strip_suffix('"')));
    match quoted {
        Some(name) if !name.is_empty() => Ok(Segment::Field(name.to_string())),
        _ => Err(PathError::InvalidBracket {
            path: path.to_string(),
            segment: segment.to_string(),
        }),
    }
}

fn resolve_index(index: i64, len: usize) -> Option<usize> {
    if index >= 0 {
        usize::try_from(index).ok().filter(|i| *i < len)
    } else {
        let back = usize::try_from(index.unsigned_abs()).ok()?;
        len.checked_sub(back)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn response() -> Value {
        json!({
            "data": {
                "app": {
                    "events": {
                        "edges": [
                            {"cursor": "c1", "node": {"type": "RELATIONSHIP_INSTALLED"}},
                            {"cursor": "c2", "node": {"type": "RELATIONSHIP_UNINSTALLED"}},
                            {"cursor": "c3", "node": {"type": "CREDIT_APPLIED"}}
                        ],
                        "pageInfo": {"hasNextPage": true}
                    }
                }
            }
        })
    }

    #[test]
    fn test_root_selects_whole_document() {
        let body = response();
        assert_eq!(JsonPath::parse("$").unwrap().select(&body), vec![&body]);
    }

    #[test]
    fn test_dotted_fields() {
        let path = JsonPath::parse("$.data.app.events.pageInfo.hasNextPage").unwrap();
        assert_eq!(path.first(&response()), Some(&json!(true)));
    }

    #[test]
    fn test_wildcard_collects_in_order() {
        let body = response();
        let path = JsonPath::parse("$.data.app.events.edges[*].node.type").unwrap();
        let types: Vec<&str> = path.select(&body).into_iter().filter_map(Value::as_str).collect();
        assert_eq!(
            types,
            ["RELATIONSHIP_INSTALLED", "RELATIONSHIP_UNINSTALLED", "CREDIT_APPLIED"]
        );
    }

    #[test]
    fn test_dot_star_matches_object_values() {
        let body = json!({"a": {"x": 1, "y": 2}});
        assert_eq!(JsonPath::parse("$.a.*").unwrap().select(&body).len(), 2);
    }

    #[test]
    fn test_indices_count_from_both_ends() {
        let body = response();
        let last = JsonPath::parse("$.data.app.events.edges[-1].cursor").unwrap();
        let first = JsonPath::parse("$.data.app.events.edges[0].cursor").unwrap();
        assert_eq!(last.first(&body), Some(&json!("c3")));
        assert_eq!(first.first(&body), Some(&json!("c1")));
    }

    #[test]
    fn test_out_of_range_index_matches_nothing() {
        let body = response();
        assert!(JsonPath::parse("$.data.app.events.edges[3]").unwrap().first(&body).is_none());
        assert!(JsonPath::parse("$.data.app.events.edges[-4]").unwrap().first(&body).is_none());

        let empty = json!({"edges": []});
        assert!(JsonPath::parse("$.edges[-1].cursor").unwrap().first(&empty).is_none());
    }

    #[test]
    fn test_missing_fields_match_nothing() {
        let path = JsonPath::parse("$.data.transactions.edges[*].node").unwrap();
        assert!(path.select(&response()).is_empty());
        assert!(path.select(&json!({"data": null})).is_empty());
    }

    #[test]
    fn test_quoted_bracket_fields() {
        let body = json!({"data": {"odd.key": 5}});
        assert_eq!(
            JsonPath::parse("$.data['odd.key']").unwrap().first(&body),
            Some(&json!(5))
        );
        assert_eq!(
            JsonPath::parse(r#"$["data"]["odd.key"]"#).unwrap().first(&body),
            Some(&json!(5))
        );
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(
            JsonPath::parse("data.app"),
            Err(PathError::MissingRoot { .. })
        ));
        assert!(matches!(
            JsonPath::parse("$.data..app"),
            Err(PathError::EmptySegment { position: 6, .. })
        ));
        assert!(matches!(
            JsonPath::parse("$.edges[0"),
            Err(PathError::Unterminated { .. })
        ));
        assert!(matches!(
            JsonPath::parse("$.edges[first]"),
            Err(PathError::InvalidBracket { .. })
        ));
        assert!(matches!(
            JsonPath::parse("$data"),
            Err(PathError::Unexpected { found: 'd', .. })
        ));
    }

    #[test]
    fn test_display_round_trips_source() {
        let path: JsonPath = "$.data.app".parse().unwrap();
        assert_eq!(path.to_string(), "$.data.app");
        assert_eq!(path.as_str(), "$.data.app");
    }
}
