use super::subresources::Position;

/// Subschema position table for Draft 2019-09.
///
/// `items` still takes either a schema or an array of schemas, and
/// `additionalItems` is a schema.
pub(crate) fn position(keyword: &str) -> Option<Position> {
    match keyword {
        "additionalItems" | "additionalProperties" | "contains" | "contentSchema" | "else"
        | "if" | "not" | "propertyNames" | "then" | "unevaluatedItems"
        | "unevaluatedProperties" => Some(Position::Schema),
        "$defs" | "definitions" | "dependentSchemas" | "patternProperties" | "properties" => {
            Some(Position::SchemaMap)
        }
        "allOf" | "anyOf" | "oneOf" => Some(Position::SchemaArray),
        "items" => Some(Position::SchemaOrArray),
        _ => None,
    }
}
