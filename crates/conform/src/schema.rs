//! The compiled schema graph.
//!
//! Nodes live in an arena owned by the [`crate::Compiler`]; children hold
//! arena positions rather than owned subtrees, so cycles wire up through
//! stable handles that exist before the referent's body is compiled.
use std::{fmt, sync::Arc};

use ahash::AHashMap;
use fancy_regex::Regex;
use serde_json::{Number, Value};

use referencing::Draft;

use crate::{
    content::{ContentEncodingCheck, ContentEncodingDecode, ContentMediaTypeCheck},
    custom::Keyword,
    format::Format,
    primitive_type::PrimitiveTypesBitMap,
};

/// Stable identity of a compiled schema node within its arena.
pub(crate) type SchemaRef = usize;

#[derive(Debug)]
pub(crate) struct SchemaNode {
    pub(crate) draft: Draft,
    /// Absolute schema location: URL plus JSON Pointer fragment. Anchors
    /// are rewritten to this form during resolution.
    pub(crate) location: String,
    /// Base URI of the owning resource, without fragment.
    pub(crate) base: String,
    pub(crate) kind: SchemaKind,
}

impl SchemaNode {
    pub(crate) fn placeholder(draft: Draft, location: String, base: String) -> Self {
        SchemaNode {
            draft,
            location,
            base,
            kind: SchemaKind::Placeholder,
        }
    }
    /// Absolute location of a keyword inside this schema.
    pub(crate) fn keyword_location(&self, keyword: &str) -> String {
        let mut location = String::with_capacity(self.location.len() + keyword.len() + 2);
        location.push_str(&self.location);
        if !self.location.contains('#') {
            location.push('#');
        }
        location.push('/');
        location.push_str(keyword);
        location
    }
    pub(crate) fn recursive_anchor(&self) -> bool {
        match &self.kind {
            SchemaKind::Object(obj) => obj.recursive_anchor,
            _ => false,
        }
    }
}

#[derive(Debug)]
pub(crate) enum SchemaKind {
    /// Reserved slot keyed by its location; always resolved before a
    /// compile call returns successfully.
    Placeholder,
    AlwaysTrue,
    AlwaysFalse,
    Object(Box<ObjectSchema>),
}

/// One optional slot per supported keyword.
#[derive(Debug, Default)]
pub(crate) struct ObjectSchema {
    // Core
    pub(crate) reference: Option<SchemaRef>,
    pub(crate) dynamic_reference: Option<DynamicReference>,
    pub(crate) recursive_reference: Option<SchemaRef>,
    pub(crate) recursive_anchor: bool,
    // Logical applicators
    pub(crate) all_of: Option<Vec<SchemaRef>>,
    pub(crate) any_of: Option<Vec<SchemaRef>>,
    pub(crate) one_of: Option<Vec<SchemaRef>>,
    pub(crate) not: Option<SchemaRef>,
    pub(crate) if_: Option<SchemaRef>,
    pub(crate) then: Option<SchemaRef>,
    pub(crate) else_: Option<SchemaRef>,
    // Objects
    pub(crate) properties: Option<Vec<(String, SchemaRef)>>,
    pub(crate) pattern_properties: Option<Vec<PatternProperty>>,
    pub(crate) additional_properties: Option<SchemaRef>,
    pub(crate) property_names: Option<SchemaRef>,
    pub(crate) required: Option<Vec<String>>,
    pub(crate) dependent_required: Option<Vec<(String, Vec<String>)>>,
    pub(crate) dependent_schemas: Option<Vec<(String, SchemaRef)>>,
    pub(crate) dependencies: Option<Vec<(String, Dependency)>>,
    pub(crate) min_properties: Option<u64>,
    pub(crate) max_properties: Option<u64>,
    pub(crate) unevaluated_properties: Option<SchemaRef>,
    // Arrays
    pub(crate) items: Option<Items>,
    pub(crate) prefix_items: Option<Vec<SchemaRef>>,
    pub(crate) additional_items: Option<SchemaRef>,
    pub(crate) contains: Option<SchemaRef>,
    pub(crate) min_contains: Option<u64>,
    pub(crate) max_contains: Option<u64>,
    pub(crate) min_items: Option<u64>,
    pub(crate) max_items: Option<u64>,
    pub(crate) unique_items: bool,
    pub(crate) unevaluated_items: Option<SchemaRef>,
    // Strings
    pub(crate) min_length: Option<u64>,
    pub(crate) max_length: Option<u64>,
    pub(crate) pattern: Option<CompiledPattern>,
    pub(crate) format: Option<FormatAssertion>,
    pub(crate) content_encoding: Option<ContentEncodingAssertion>,
    pub(crate) content_media_type: Option<ContentMediaTypeAssertion>,
    pub(crate) content_schema: Option<SchemaRef>,
    // Numbers
    pub(crate) multiple_of: Option<Number>,
    pub(crate) minimum: Option<Number>,
    pub(crate) maximum: Option<Number>,
    pub(crate) exclusive_minimum: Option<Number>,
    pub(crate) exclusive_maximum: Option<Number>,
    // Any type
    pub(crate) const_: Option<Value>,
    pub(crate) enum_: Option<Vec<Value>>,
    pub(crate) types: Option<PrimitiveTypesBitMap>,
    // User-registered keywords
    pub(crate) extensions: Vec<Extension>,
}

/// `$dynamicRef`: the lexical target plus, when the fragment named a
/// `$dynamicAnchor`, the anchor name to re-resolve through the dynamic
/// scope at validation time.
#[derive(Debug)]
pub(crate) struct DynamicReference {
    pub(crate) lexical: SchemaRef,
    pub(crate) anchor: Option<String>,
}

#[derive(Debug)]
pub(crate) enum Items {
    Schema(SchemaRef),
    /// Draft ≤ 2019 array form.
    Array(Vec<SchemaRef>),
}

#[derive(Debug)]
pub(crate) enum Dependency {
    Required(Vec<String>),
    Schema(SchemaRef),
}

#[derive(Debug)]
pub(crate) struct PatternProperty {
    pub(crate) regex: Regex,
    pub(crate) source: String,
    pub(crate) schema: SchemaRef,
}

#[derive(Debug)]
pub(crate) struct CompiledPattern {
    pub(crate) regex: Regex,
    pub(crate) source: String,
}

#[derive(Clone)]
pub(crate) struct FormatAssertion {
    pub(crate) name: String,
    pub(crate) check: Arc<dyn Format>,
}

impl fmt::Debug for FormatAssertion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FormatAssertion")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

#[derive(Debug)]
pub(crate) struct ContentEncodingAssertion {
    pub(crate) name: String,
    pub(crate) check: ContentEncodingCheck,
    pub(crate) decode: ContentEncodingDecode,
}

#[derive(Debug)]
pub(crate) struct ContentMediaTypeAssertion {
    pub(crate) name: String,
    pub(crate) check: ContentMediaTypeCheck,
}

#[derive(Clone)]
pub(crate) struct Extension {
    pub(crate) keyword: String,
    pub(crate) assertion: Arc<dyn Keyword>,
}

impl fmt::Debug for Extension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Extension")
            .field("keyword", &self.keyword)
            .finish_non_exhaustive()
    }
}

/// An immutable snapshot of the compiler's arena, shared by every
/// [`crate::CompiledSchema`] produced from it.
#[derive(Debug)]
pub(crate) struct SchemaSet {
    pub(crate) nodes: Box<[Arc<SchemaNode>]>,
    /// `(resource base, anchor name)` → node declaring the `$dynamicAnchor`.
    pub(crate) dynamic_anchors: AHashMap<(String, String), SchemaRef>,
    /// Resource roots declaring `$recursiveAnchor: true`, by base.
    pub(crate) recursive_roots: AHashMap<String, SchemaRef>,
}

impl SchemaSet {
    #[inline]
    pub(crate) fn node(&self, idx: SchemaRef) -> &SchemaNode {
        &self.nodes[idx]
    }
}
