//! Per-stream GraphQL query templates.

use std::borrow::Cow;

/// Placeholder replaced by the stream's root query field.
pub const QUERY_NAME_PLACEHOLDER: &str = "__query_name__";

/// Placeholder replaced by the compiled selection set.
pub const SELECTED_FIELDS_PLACEHOLDER: &str = "__selected_fields__";

const CONNECTION_TEMPLATE: &str = r"
    query tapShopify($first: Int, $after: String) {
        __query_name__(first: $first, after: $after) {
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
";

/// A GraphQL query with `__query_name__` and `__selected_fields__`
/// placeholders.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QueryTemplate {
    text: Cow<'static, str>,
}

impl QueryTemplate {
    /// Wraps a custom template.
    #[must_use]
    pub fn new(text: impl Into<Cow<'static, str>>) -> Self {
        Self { text: text.into() }
    }

    /// The cursor-paginated connection template with `$first` and `$after`.
    #[must_use]
    pub const fn connection() -> Self {
        Self {
            text: Cow::Borrowed(CONNECTION_TEMPLATE),
        }
    }

    /// The connection template extended with one filter argument, e.g.
    /// `createdAtMin: DateTime`.
    #[must_use]
    pub fn connection_with_filter(variable: &str, graphql_type: &str) -> Self {
        let text = CONNECTION_TEMPLATE
            .replacen(
                "$after: String)",
                &format!("$after: String, ${variable}: {graphql_type})"),
                1,
            )
            .replacen(
                "after: $after)",
                &format!("after: $after, {variable}: ${variable})"),
                1,
            );
        Self {
            text: Cow::Owned(text),
        }
    }

    /// Returns the raw template text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Substitutes both placeholders.
    #[must_use]
    pub fn render(&self, query_name: &str, selection: &str) -> String {
        self.text
            .replace(QUERY_NAME_PLACEHOLDER, query_name)
            .replace(SELECTED_FIELDS_PLACEHOLDER, selection)
    }
}

/// Collapses a query to one line: every line trimmed, blank lines dropped,
/// joined with single spaces.
#[must_use]
pub fn minify(query: &str) -> String {
    query
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}
