use serde_json::Value;

use crate::{pointer, Draft};

/// Where subschemas nest inside a keyword's value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Position {
    /// The keyword's value is itself a schema.
    Schema,
    /// The value is an object whose member values are schemas.
    SchemaMap,
    /// The value is an array of schemas.
    SchemaArray,
    /// Either a single schema or an array of schemas (`items` before 2020-12).
    SchemaOrArray,
    /// An object whose members are schemas or property-name arrays
    /// (legacy `dependencies`).
    DependencyMap,
}

/// Immediate subschemas of `node` under `draft`, each keyed by its JSON
/// Pointer suffix relative to `node`.
pub(crate) fn children_of<'a>(draft: Draft, node: &'a Value) -> Vec<(String, &'a Value)> {
    let Some(schema) = node.as_object() else {
        return Vec::new();
    };
    let mut children = Vec::new();
    for (keyword, value) in schema {
        let Some(position) = draft.position(keyword) else {
            continue;
        };
        match position {
            Position::Schema => children.push((format!("/{}", pointer::escape(keyword)), value)),
            Position::SchemaMap => {
                if let Some(map) = value.as_object() {
                    for (name, subschema) in map {
                        children.push((
                            format!("/{}/{}", pointer::escape(keyword), pointer::escape(name)),
                            subschema,
                        ));
                    }
                }
            }
            Position::SchemaArray => {
                if let Some(array) = value.as_array() {
                    for (idx, subschema) in array.iter().enumerate() {
                        children.push((format!("/{}/{idx}", pointer::escape(keyword)), subschema));
                    }
                }
            }
            Position::SchemaOrArray => match value {
                Value::Array(array) => {
                    for (idx, subschema) in array.iter().enumerate() {
                        children.push((format!("/{}/{idx}", pointer::escape(keyword)), subschema));
                    }
                }
                _ => children.push((format!("/{}", pointer::escape(keyword)), value)),
            },
            Position::DependencyMap => {
                if let Some(map) = value.as_object() {
                    for (name, dependency) in map {
                        if dependency.is_object() {
                            children.push((
                                format!("/{}/{}", pointer::escape(keyword), pointer::escape(name)),
                                dependency,
                            ));
                        }
                    }
                }
            }
        }
    }
    children
}

#[cfg(test)]
mod tests {
    use crate::Draft;

    use super::children_of;
    use serde_json::json;
    use test_case::test_case;

    #[test_case(&json!(true), &[]; "boolean schema")]
    #[test_case(&json!({}), &[]; "empty object")]
    #[test_case(&json!({"type": "string"}), &[]; "no subresources")]
    #[test_case(
        &json!({"additionalProperties": {"type": "string"}}),
        &[("/additionalProperties", json!({"type": "string"}))];
        "schema position"
    )]
    #[test_case(
        &json!({"if": {"type": "string"}, "then": {"minimum": 0}}),
        &[("/if", json!({"type": "string"})), ("/then", json!({"minimum": 0}))];
        "multiple schema positions"
    )]
    #[test_case(
        &json!({"properties": {"foo": {"type": "string"}, "b/r": {"type": "number"}}}),
        &[("/properties/foo", json!({"type": "string"})), ("/properties/b~1r", json!({"type": "number"}))];
        "object of schemas with escaping"
    )]
    #[test_case(
        &json!({"allOf": [{"type": "string"}, {"minLength": 1}]}),
        &[("/allOf/0", json!({"type": "string"})), ("/allOf/1", json!({"minLength": 1}))];
        "array of schemas"
    )]
    #[test_case(
        &json!({"prefixItems": [{"type": "string"}], "items": {"type": "number"}}),
        &[("/prefixItems/0", json!({"type": "string"})), ("/items", json!({"type": "number"}))];
        "items and prefixItems"
    )]
    fn finds_children(schema: &serde_json::Value, expected: &[(&str, serde_json::Value)]) {
        let mut children: Vec<_> = children_of(Draft::Draft202012, schema)
            .into_iter()
            .map(|(pointer, value)| (pointer, value.clone()))
            .collect();
        let mut expected: Vec<_> = expected
            .iter()
            .map(|(pointer, value)| ((*pointer).to_string(), value.clone()))
            .collect();
        children.sort_by(|a, b| a.0.cmp(&b.0));
        expected.sort_by(|a, b| a.0.cmp(&b.0));
        assert_eq!(children, expected);
    }

    #[test]
    fn legacy_items_array_is_split() {
        let schema = json!({"items": [{"type": "number"}, {"type": "boolean"}]});
        let children = children_of(Draft::Draft7, &schema);
        assert_eq!(
            children,
            vec![
                ("/items/0".to_string(), &json!({"type": "number"})),
                ("/items/1".to_string(), &json!({"type": "boolean"})),
            ]
        );
    }

    #[test]
    fn legacy_dependencies_skips_property_lists() {
        let schema = json!({"dependencies": {"a": ["b"], "c": {"type": "string"}}});
        let children = children_of(Draft::Draft7, &schema);
        assert_eq!(
            children,
            vec![("/dependencies/c".to_string(), &json!({"type": "string"}))]
        );
    }

    #[test_case(Draft::Draft4)]
    #[test_case(Draft::Draft6)]
    #[test_case(Draft::Draft7)]
    #[test_case(Draft::Draft201909)]
    #[test_case(Draft::Draft202012)]
    fn bool_schema_has_no_children(draft: Draft) {
        assert!(children_of(draft, &serde_json::json!(true)).is_empty());
    }
}
