//! Declared stream schemas.
//!
//! A [`Schema`] is an ordered list of named [`Property`] values. It is the
//! single source for both the GraphQL selection set sent to the API and the
//! JSON Schema advertised in the catalog and `SCHEMA` messages.

use serde_json::{json, Map, Value};

/// The type of one declared field.
///
/// Every property is nullable in the emitted JSON Schema.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Property {
    /// A plain string.
    String,
    /// An ISO 8601 timestamp string.
    DateTime,
    /// An integer.
    Integer,
    /// A floating point number.
    Number,
    /// A boolean.
    Boolean,
    /// A nested object with its own ordered fields.
    Object(Schema),
    /// A list of values of one type.
    Array(Box<Property>),
}

impl Property {
    /// Returns the nested fields of an object, looking through arrays.
    #[must_use]
    pub fn nested(&self) -> Option<&Schema> {
        match self {
            Self::Object(schema) => Some(schema),
            Self::Array(items) => items.nested(),
            _ => None,
        }
    }

    /// Renders this property as a JSON Schema fragment.
    #[must_use]
    pub fn to_json_schema(&self) -> Value {
        match self {
            Self::String => json!({"type": ["string", "null"]}),
            Self::DateTime => json!({"type": ["string", "null"], "format": "date-time"}),
            Self::Integer => json!({"type": ["integer", "null"]}),
            Self::Number => json!({"type": ["number", "null"]}),
            Self::Boolean => json!({"type": ["boolean", "null"]}),
            Self::Object(schema) => json!({
                "type": ["object", "null"],
                "properties": schema.properties_json(),
            }),
            Self::Array(items) => json!({
                "type": ["array", "null"],
                "items": items.to_json_schema(),
            }),
        }
    }
}

/// An ordered set of named properties.
///
/// # Example
///
/// ```rust
/// use tap_shopify_partner::query::{Property, Schema};
///
/// let schema = Schema::new()
///     .property("id", Property::String)
///     .property("createdAt", Property::DateTime);
///
/// assert_eq!(schema.names().collect::<Vec<_>>(), ["id", "createdAt"]);
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Schema {
    properties: Vec<(String, Property)>,
}

impl Schema {
    /// Creates an empty schema.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            properties: Vec::new(),
        }
    }

    /// Appends a property, replacing an existing one with the same name.
    #[must_use]
    pub fn property(mut self, name: impl Into<String>, property: Property) -> Self {
        let name = name.into();
        if let Some(slot) = self.properties.iter_mut().find(|(n, _)| *n == name) {
            slot.1 = property;
        } else {
            self.properties.push((name, property));
        }
        self
    }

    /// Returns the properties in declaration order.
    #[must_use]
    pub fn properties(&self) -> &[(String, Property)] {
        &self.properties
    }

    /// Returns the property names in declaration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.properties.iter().map(|(name, _)| name.as_str())
    }

    /// Looks up a property by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Property> {
        self.properties
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, property)| property)
    }

    /// Returns `true` if the schema declares no properties.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    /// Keeps only the properties accepted by `keep`, preserving order.
    #[must_use]
    pub fn filtered(&self, mut keep: impl FnMut(&str) -> bool) -> Self {
        Self {
            properties: self
                .properties
                .iter()
                .filter(|(name, _)| keep(name))
                .cloned()
                .collect(),
        }
    }

    /// Renders the schema as a root JSON Schema object.
    #[must_use]
    pub fn to_json_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": self.properties_json(),
        })
    }

    fn properties_json(&self) -> Value {
        let map: Map<String, Value> = self
            .properties
            .iter()
            .map(|(name, property)| (name.clone(), property.to_json_schema()))
            .collect();
        Value::Object(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_property_replaces_duplicate_names() {
        let schema = Schema::new()
            .property("id", Property::Integer)
            .property("name", Property::String)
            .property("id", Property::String);

        assert_eq!(schema.properties().len(), 2);
        assert_eq!(schema.get("id"), Some(&Property::String));
        assert_eq!(schema.names().collect::<Vec<_>>(), ["id", "name"]);
    }

    #[test]
    fn test_json_schema_keeps_declaration_order() {
        let schema = Schema::new()
            .property("zeta", Property::Boolean)
            .property("alpha", Property::Number);

        let rendered = schema.to_json_schema();
        let keys: Vec<&String> = rendered["properties"].as_object().unwrap().keys().collect();
        assert_eq!(keys, ["zeta", "alpha"]);
        assert_eq!(rendered["type"], "object");
    }

    #[test]
    fn test_json_schema_renders_nested_types() {
        let schema = Schema::new()
            .property("occurredAt", Property::DateTime)
            .property(
                "shop",
                Property::Object(Schema::new().property("id", Property::String)),
            )
            .property("tags", Property::Array(Box::new(Property::String)));

        let rendered = schema.to_json_schema();
        assert_eq!(
            rendered["properties"]["occurredAt"],
            json!({"type": ["string", "null"], "format": "date-time"})
        );
        assert_eq!(
            rendered["properties"]["shop"],
            json!({
                "type": ["object", "null"],
                "properties": {"id": {"type": ["string", "null"]}}
            })
        );
        assert_eq!(
            rendered["properties"]["tags"]["items"],
            json!({"type": ["string", "null"]})
        );
    }

    #[test]
    fn test_nested_looks_through_arrays() {
        let inner = Schema::new().property("amount", Property::Number);
        let property = Property::Array(Box::new(Property::Object(inner.clone())));

        assert_eq!(property.nested(), Some(&inner));
        assert!(Property::String.nested().is_none());
    }

    #[test]
    fn test_filtered_preserves_order() {
        let schema = Schema::new()
            .property("a", Property::String)
            .property("b", Property::String)
            .property("c", Property::String);

        let kept = schema.filtered(|name| name != "b");
        assert_eq!(kept.names().collect::<Vec<_>>(), ["a", "c"]);
        assert!(Schema::new().is_empty());
    }
}
