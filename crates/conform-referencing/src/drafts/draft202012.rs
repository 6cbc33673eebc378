use super::subresources::Position;

/// Subschema position table for Draft 2020-12.
pub(crate) fn position(keyword: &str) -> Option<Position> {
    match keyword {
        "additionalProperties" | "contains" | "contentSchema" | "else" | "if" | "items" | "not"
        | "propertyNames" | "then" | "unevaluatedItems" | "unevaluatedProperties" => {
            Some(Position::Schema)
        }
        "$defs" | "definitions" | "dependentSchemas" | "patternProperties" | "properties" => {
            Some(Position::SchemaMap)
        }
        "allOf" | "anyOf" | "oneOf" | "prefixItems" => Some(Position::SchemaArray),
        _ => None,
    }
}
