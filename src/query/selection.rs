//! Schema to GraphQL selection-set compilation.

use std::collections::BTreeSet;

use super::schema::{Property, Schema};

/// Keeps the top-level properties named in `selected`, in schema order.
#[must_use]
pub fn selected_fields(schema: &Schema, selected: &BTreeSet<String>) -> Schema {
    schema.filtered(|name| selected.contains(name))
}

/// Flattens declared properties into a GraphQL selection set.
///
/// Scalars produce `\nname`, objects produce `\nname\n{<nested>\n}` and
/// arrays are compiled from their item type. The output is meant to be
/// substituted into a [`QueryTemplate`](super::QueryTemplate) and then
/// passed through [`minify`](super::minify).
///
/// # Example
///
/// ```rust
/// use tap_shopify_partner::query::{compile_selection, Property, Schema};
///
/// let schema = Schema::new()
///     .property("type", Property::String)
///     .property("shop", Property::Object(Schema::new().property("id", Property::String)));
///
/// assert_eq!(compile_selection(&schema), "\ntype\nshop\n{\nid\n}");
/// ```
#[must_use]
pub fn compile_selection(schema: &Schema) -> String {
    let mut output = String::new();
    write_selection(schema.properties(), &mut output);
    output
}

fn write_selection(properties: &[(String, Property)], output: &mut String) {
    for (name, property) in properties {
        output.push('\n');
        output.push_str(name);
        if let Some(nested) = property.nested() {
            output.push_str("\n{");
            write_selection(nested.properties(), output);
            output.push_str("\n}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transaction_schema() -> Schema {
        Schema::new()
            .property("id", Property::String)
            .property("createdAt", Property::DateTime)
            .property(
                "app",
                Property::Object(
                    Schema::new()
                        .property("id", Property::String)
                        .property("name", Property::String),
                ),
            )
    }

    #[test]
    fn test_scalars_are_listed_one_per_line() {
        let schema = Schema::new()
            .property("id", Property::String)
            .property("createdAt", Property::DateTime);

        assert_eq!(compile_selection(&schema), "\nid\ncreatedAt");
    }

    #[test]
    fn test_objects_open_nested_selection() {
        assert_eq!(
            compile_selection(&transaction_schema()),
            "\nid\ncreatedAt\napp\n{\nid\nname\n}"
        );
    }

    #[test]
    fn test_arrays_compile_their_items() {
        let schema = Schema::new()
            .property("tags", Property::Array(Box::new(Property::String)))
            .property(
                "charges",
                Property::Array(Box::new(Property::Object(
                    Schema::new().property(
                        "amount",
                        Property::Object(
                            Schema::new()
                                .property("amount", Property::Number)
                                .property("currencyCode", Property::String),
                        ),
                    ),
                ))),
            );

        assert_eq!(
            compile_selection(&schema),
            "\ntags\ncharges\n{\namount\n{\namount\ncurrencyCode\n}\n}"
        );
    }

    #[test]
    fn test_empty_schema_compiles_to_empty_selection() {
        assert_eq!(compile_selection(&Schema::new()), "");
    }

    #[test]
    fn test_selected_fields_keeps_schema_order() {
        let selected: BTreeSet<String> = ["app", "id"].iter().map(ToString::to_string).collect();

        let kept = selected_fields(&transaction_schema(), &selected);
        assert_eq!(kept.names().collect::<Vec<_>>(), ["id", "app"]);
    }

    #[test]
    fn test_selected_fields_ignores_unknown_names() {
        let selected: BTreeSet<String> = ["missing"].iter().map(ToString::to_string).collect();

        assert!(selected_fields(&transaction_schema(), &selected).is_empty());
    }
}
