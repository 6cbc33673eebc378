use super::subresources::Position;

/// Subschema position table for Draft 4.
///
/// `additionalItems` / `additionalProperties` may also be booleans here,
/// which are not schemas under this draft; the walker skips non-objects.
pub(crate) fn position(keyword: &str) -> Option<Position> {
    match keyword {
        "additionalItems" | "additionalProperties" | "not" => Some(Position::Schema),
        "definitions" | "patternProperties" | "properties" => Some(Position::SchemaMap),
        "allOf" | "anyOf" | "oneOf" => Some(Position::SchemaArray),
        "items" => Some(Position::SchemaOrArray),
        "dependencies" => Some(Position::DependencyMap),
        _ => None,
    }
}
