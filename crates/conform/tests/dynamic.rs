//! Runtime behaviour of `$recursiveRef` (2019-09) and `$dynamicRef`
//! (2020-12): the effective target depends on the dynamic scope, not only
//! on the lexical position.
use conform::Compiler;
use serde_json::json;

fn list_compiler() -> Compiler {
    let mut compiler = Compiler::new();
    compiler
        .add_resource_value(
            "https://example.com/list",
            json!({
                "$id": "https://example.com/list",
                "$schema": "https://json-schema.org/draft/2020-12/schema",
                "type": "array",
                "items": {"$dynamicRef": "#items"},
                "$defs": {
                    "items": {"$dynamicAnchor": "items"}
                }
            }),
        )
        .expect("Valid resource");
    compiler
        .add_resource_value(
            "https://example.com/numbers",
            json!({
                "$id": "https://example.com/numbers",
                "$schema": "https://json-schema.org/draft/2020-12/schema",
                "$ref": "list",
                "$defs": {
                    "items": {"$dynamicAnchor": "items", "type": "number"}
                }
            }),
        )
        .expect("Valid resource");
    compiler
        .add_resource_value(
            "https://example.com/strings",
            json!({
                "$id": "https://example.com/strings",
                "$schema": "https://json-schema.org/draft/2020-12/schema",
                "$ref": "list",
                "$defs": {
                    "items": {"$dynamicAnchor": "items", "type": "string"}
                }
            }),
        )
        .expect("Valid resource");
    compiler
}

#[test]
fn dynamic_ref_targets_the_outermost_override() {
    let mut compiler = list_compiler();
    let numbers = compiler
        .compile("https://example.com/numbers")
        .expect("Valid schema");
    assert!(numbers.is_valid(&json!([1, 2.5])));
    assert!(!numbers.is_valid(&json!(["a"])));

    let strings = compiler
        .compile("https://example.com/strings")
        .expect("Valid schema");
    assert!(strings.is_valid(&json!(["a", "b"])));
    assert!(!strings.is_valid(&json!([1])));
}

#[test]
fn dynamic_ref_without_override_uses_the_lexical_target() {
    let mut compiler = list_compiler();
    let list = compiler
        .compile("https://example.com/list")
        .expect("Valid schema");
    // The generic list accepts any item type
    assert!(list.is_valid(&json!([1, "a", null])));
    assert!(!list.is_valid(&json!("not an array")));
}

#[test]
fn overrides_added_after_the_first_compile_are_picked_up() {
    let mut compiler = Compiler::new();
    compiler
        .add_resource_value(
            "https://example.com/list",
            json!({
                "$id": "https://example.com/list",
                "$schema": "https://json-schema.org/draft/2020-12/schema",
                "type": "array",
                "items": {"$dynamicRef": "#items"},
                "$defs": {
                    "items": {"$dynamicAnchor": "items"}
                }
            }),
        )
        .expect("Valid resource");
    let list = compiler
        .compile("https://example.com/list")
        .expect("Valid schema");
    assert!(list.is_valid(&json!([1, "a"])));

    compiler
        .add_resource_value(
            "https://example.com/booleans",
            json!({
                "$id": "https://example.com/booleans",
                "$schema": "https://json-schema.org/draft/2020-12/schema",
                "$ref": "list",
                "$defs": {
                    "items": {"$dynamicAnchor": "items", "type": "boolean"}
                }
            }),
        )
        .expect("Valid resource");
    let booleans = compiler
        .compile("https://example.com/booleans")
        .expect("Valid schema");
    assert!(booleans.is_valid(&json!([true, false])));
    assert!(!booleans.is_valid(&json!([1])));
}

#[test]
fn dynamic_ref_to_plain_anchor_stays_lexical() {
    let mut compiler = Compiler::new();
    compiler
        .add_resource_value(
            "https://example.com/plain",
            json!({
                "$schema": "https://json-schema.org/draft/2020-12/schema",
                "$ref": "#/$defs/wrapper",
                "$defs": {
                    "wrapper": {"$dynamicRef": "#target"},
                    "target": {"$anchor": "target", "type": "integer"}
                }
            }),
        )
        .expect("Valid resource");
    let validator = compiler
        .compile("https://example.com/plain")
        .expect("Valid schema");
    assert!(validator.is_valid(&json!(3)));
    assert!(!validator.is_valid(&json!("3")));
}

#[test]
fn recursive_ref_extends_through_the_dynamic_scope() {
    let mut compiler = Compiler::new();
    compiler
        .add_resource_value(
            "https://example.com/tree",
            json!({
                "$id": "https://example.com/tree",
                "$schema": "https://json-schema.org/draft/2019-09/schema",
                "$recursiveAnchor": true,
                "type": "object",
                "properties": {
                    "data": true,
                    "children": {
                        "type": "array",
                        "items": {"$recursiveRef": "#"}
                    }
                }
            }),
        )
        .expect("Valid resource");
    compiler
        .add_resource_value(
            "https://example.com/strict-tree",
            json!({
                "$id": "https://example.com/strict-tree",
                "$schema": "https://json-schema.org/draft/2019-09/schema",
                "$recursiveAnchor": true,
                "$ref": "tree",
                "unevaluatedProperties": false
            }),
        )
        .expect("Valid resource");

    let tree = compiler
        .compile("https://example.com/tree")
        .expect("Valid schema");
    // The plain tree does not care about extra properties anywhere
    assert!(tree.is_valid(&json!({"children": [{"daat": 1}]})));

    let strict = compiler
        .compile("https://example.com/strict-tree")
        .expect("Valid schema");
    assert!(strict.is_valid(&json!({"children": [{"data": 1, "children": []}]})));
    // The nested node is validated against the strict root, so the typo is
    // caught below the top level
    let error = strict
        .validate(&json!({"children": [{"daat": 1}]}))
        .expect_err("Should fail");
    assert!(error.to_string().contains("daat"));
}

#[test]
fn recursive_ref_without_anchor_is_lexical() {
    let mut compiler = Compiler::new();
    compiler
        .add_resource_value(
            "https://example.com/plain-recursion",
            json!({
                "$schema": "https://json-schema.org/draft/2019-09/schema",
                "type": "object",
                "properties": {
                    "next": {"$recursiveRef": "#"},
                    "value": {"type": "integer"}
                }
            }),
        )
        .expect("Valid resource");
    let validator = compiler
        .compile("https://example.com/plain-recursion")
        .expect("Valid schema");
    assert!(validator.is_valid(&json!({"value": 1, "next": {"value": 2}})));
    assert!(!validator.is_valid(&json!({"value": 1, "next": {"value": "2"}})));
}
