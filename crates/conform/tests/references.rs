//! Cross-document reference resolution through the compiler.
use std::io::Write;

use conform::{Compiler, Loader};
use serde_json::{json, Value};

struct MapLoader {
    schemas: Vec<(String, Value)>,
}

impl Loader for MapLoader {
    fn load(
        &self,
        url: &conform::Uri<&str>,
    ) -> Result<Value, Box<dyn std::error::Error + Send + Sync>> {
        self.schemas
            .iter()
            .find(|(key, _)| key == url.as_str())
            .map(|(_, value)| value.clone())
            .ok_or_else(|| format!("Failed to find {url}").into())
    }
}

#[test]
fn references_between_added_documents() {
    let mut compiler = Compiler::new();
    compiler
        .add_resource_value(
            "https://example.com/item",
            json!({"type": "object", "required": ["id"], "properties": {"id": {"type": "integer"}}}),
        )
        .expect("Valid resource");
    compiler
        .add_resource_value(
            "https://example.com/list",
            json!({"type": "array", "items": {"$ref": "item"}}),
        )
        .expect("Valid resource");
    let validator = compiler
        .compile("https://example.com/list")
        .expect("Valid schema");
    assert!(validator.is_valid(&json!([{"id": 1}, {"id": 2}])));
    assert!(!validator.is_valid(&json!([{"id": "1"}])));
    assert!(!validator.is_valid(&json!([{}])));
}

#[test]
fn external_references_are_fetched_through_the_loader() {
    let loader = MapLoader {
        schemas: vec![(
            "https://example.com/remote".to_string(),
            json!({"type": "string"}),
        )],
    };
    let mut compiler = conform::options().with_loader(loader).build();
    compiler
        .add_resource_value(
            "https://example.com/root",
            json!({"properties": {"name": {"$ref": "https://example.com/remote"}}}),
        )
        .expect("Valid resource");
    let validator = compiler
        .compile("https://example.com/root")
        .expect("Valid schema");
    assert!(validator.is_valid(&json!({"name": "x"})));
    assert!(!validator.is_valid(&json!({"name": 1})));
}

#[test]
fn compile_fetches_unknown_urls_lazily() {
    let loader = MapLoader {
        schemas: vec![(
            "https://example.com/lazy".to_string(),
            json!({"type": "boolean"}),
        )],
    };
    let mut compiler = conform::options().with_loader(loader).build();
    let validator = compiler
        .compile("https://example.com/lazy")
        .expect("Fetched on demand");
    assert!(validator.is_valid(&json!(true)));
    assert!(!validator.is_valid(&json!(1)));
}

#[test]
fn anchors_resolve_to_their_canonical_location() {
    let mut compiler = Compiler::new();
    compiler
        .add_resource_value(
            "https://example.com/schema",
            json!({
                "$ref": "#middle",
                "$defs": {
                    "target": {"$anchor": "middle", "type": "integer"}
                }
            }),
        )
        .expect("Valid resource");
    let validator = compiler
        .compile("https://example.com/schema")
        .expect("Valid schema");
    assert!(validator.is_valid(&json!(3)));
    let error = validator.validate(&json!("3")).expect_err("Should fail");
    // Plain-name fragments never appear in compiled locations
    assert_eq!(
        error.absolute_keyword_location,
        "https://example.com/schema#/$defs/target/type"
    );
}

#[test]
fn pointer_references_unescape_tokens() {
    let mut compiler = Compiler::new();
    compiler
        .add_resource_value(
            "https://example.com/schema",
            json!({
                "$ref": "#/$defs/a~1b",
                "$defs": {"a/b": {"type": "null"}}
            }),
        )
        .expect("Valid resource");
    let validator = compiler
        .compile("https://example.com/schema")
        .expect("Valid schema");
    assert!(validator.is_valid(&json!(null)));
    assert!(!validator.is_valid(&json!(0)));
}

#[test]
fn subresources_compile_under_their_own_id() {
    let mut compiler = Compiler::new();
    compiler
        .add_resource_value(
            "https://example.com/root",
            json!({
                "$defs": {
                    "nested": {"$id": "nested", "type": "string"}
                },
                "$ref": "nested"
            }),
        )
        .expect("Valid resource");
    let validator = compiler
        .compile("https://example.com/root")
        .expect("Valid schema");
    assert!(validator.is_valid(&json!("x")));

    // The subresource is addressable on its own as well
    let nested = compiler
        .compile("https://example.com/nested")
        .expect("Valid schema");
    assert_eq!(nested.location(), "https://example.com/nested");
    assert!(!nested.is_valid(&json!(1)));
}

#[test]
fn dangling_references_fail_and_do_not_poison_the_compiler() {
    let mut compiler = Compiler::new();
    compiler
        .add_resource_value(
            "https://example.com/dangling",
            json!({"$ref": "#/$defs/missing"}),
        )
        .expect("Registration does not resolve references");
    assert!(compiler.compile("https://example.com/dangling").is_err());

    compiler
        .add_resource_value("https://example.com/fine", json!({"type": "integer"}))
        .expect("Valid resource");
    let validator = compiler
        .compile("https://example.com/fine")
        .expect("Valid schema");
    assert!(validator.is_valid(&json!(5)));
}

#[cfg(feature = "resolve-file")]
#[test]
fn file_references_use_the_default_loader() {
    let mut file = tempfile::NamedTempFile::new().expect("Failed to create file");
    file.write_all(br#"{"type": "integer"}"#).expect("Failed to write");
    let url = format!("file://{}", file.path().display());

    let mut compiler = Compiler::new();
    let validator = compiler.compile(&url).expect("Valid schema");
    assert!(validator.is_valid(&json!(1)));
    assert!(!validator.is_valid(&json!("1")));
}

#[test]
fn must_compile_panics_on_error() {
    let result = std::panic::catch_unwind(|| {
        let mut compiler = Compiler::new();
        compiler.must_compile("urn:example:not-there")
    });
    assert!(result.is_err());
}
