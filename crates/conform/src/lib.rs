//! A JSON Schema compiler and validator for Rust.
//!
//! Supports drafts 4, 6, 7, 2019-09 and 2020-12, including cross-document
//! references, `$recursiveRef` / `$dynamicRef`, annotation-driven
//! `unevaluatedProperties` / `unevaluatedItems` and user-defined keywords.
//!
//! # One-off validation
//!
//! ```rust
//! use serde_json::json;
//!
//! let schema = json!({"type": "string"});
//! let instance = json!("Hello, world!");
//!
//! assert!(conform::is_valid(&schema, &instance));
//! ```
//!
//! # Reusable validators
//!
//! Compile once and validate many instances. On failure the error is a
//! tree mirroring the keywords that rejected the instance:
//!
//! ```rust
//! use serde_json::json;
//!
//! let schema = json!({"type": "integer", "minimum": 0});
//! let validator = conform::validator_for(&schema).expect("Invalid schema");
//!
//! assert!(validator.is_valid(&json!(3)));
//! if let Err(error) = validator.validate(&json!(-1)) {
//!     eprintln!("{error}");
//! }
//! ```
//!
//! # Compiling by URL
//!
//! Schemas live in a [`Compiler`] keyed by their URLs, so documents can
//! reference each other:
//!
//! ```rust
//! use serde_json::json;
//!
//! let mut compiler = conform::Compiler::new();
//! compiler
//!     .add_resource(
//!         "https://example.com/item",
//!         br#"{"type": "object", "required": ["id"]}"#,
//!     )
//!     .expect("Invalid resource");
//! compiler
//!     .add_resource(
//!         "https://example.com/list",
//!         br#"{"type": "array", "items": {"$ref": "https://example.com/item"}}"#,
//!     )
//!     .expect("Invalid resource");
//! let validator = compiler
//!     .compile("https://example.com/list")
//!     .expect("Invalid schema");
//!
//! assert!(validator.is_valid(&json!([{"id": 1}])));
//! assert!(!validator.is_valid(&json!([{}])));
//! ```
//!
//! # Configuration
//!
//! ```rust
//! use conform::Draft;
//!
//! let mut compiler = conform::options()
//!     .with_draft(Draft::Draft7)
//!     .should_assert_formats(true)
//!     .build();
//! ```
//!
//! By default external references are fetched from the file system and
//! (with the `resolve-http` feature) over HTTP; implement [`Loader`] for
//! anything else. All meta-schemas ship embedded and are never fetched.
mod compiler;
mod content;
mod custom;
mod document;
mod error;
mod format;
mod numeric;
mod options;
mod paths;
mod primitive_type;
mod schema;
mod validator;

pub use compiler::Compiler;
pub use custom::{Keyword, KeywordFactory};
pub use error::{CompileError, ErrorKind, TypeKind, ValidationError};
pub use format::Format;
pub use options::CompilerOptions;
pub use paths::{LazyLocation, Location, LocationSegment};
pub use primitive_type::{PrimitiveType, PrimitiveTypesBitMap};
pub use validator::CompiledSchema;

pub use referencing::{
    DefaultLoader, Draft, Loader, ResolveError, Resource, ResourceIndex, Uri, UriRef,
};

use serde_json::Value;

/// Default [`CompilerOptions`] to configure a [`Compiler`] with.
#[must_use]
pub fn options() -> CompilerOptions {
    CompilerOptions::default()
}

/// Compile a standalone schema document.
///
/// The document is registered under the default root URL (or its own
/// `$id`, if declared) and compiled in one step.
///
/// # Errors
///
/// See [`Compiler::compile`].
pub fn validator_for(schema: &Value) -> Result<CompiledSchema, CompileError> {
    let mut compiler = Compiler::new();
    compiler.add_resource_value(compiler::DEFAULT_ROOT_URL, schema.clone())?;
    compiler.compile(compiler::DEFAULT_ROOT_URL)
}

/// Validate `instance` against `schema` in one call.
///
/// # Panics
///
/// When the schema itself is invalid.
#[must_use]
pub fn is_valid(schema: &Value, instance: &Value) -> bool {
    validator_for(schema)
        .expect("Invalid schema")
        .is_valid(instance)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    #[test]
    fn one_off_validation() {
        assert!(crate::is_valid(&json!({"minLength": 2}), &json!("ab")));
        assert!(!crate::is_valid(&json!({"minLength": 2}), &json!("a")));
    }

    #[test]
    fn schema_with_own_id() {
        let schema = json!({
            "$id": "https://example.com/tree",
            "type": "object",
            "properties": {
                "children": {"type": "array", "items": {"$ref": "https://example.com/tree"}}
            }
        });
        let validator = crate::validator_for(&schema).expect("Valid schema");
        assert!(validator.is_valid(&json!({"children": [{"children": []}]})));
        assert!(!validator.is_valid(&json!({"children": [1]})));
    }
}
