//! Evaluation of compiled schemas against instances.
//!
//! A depth-first walk over the immutable schema graph. State threaded
//! through the recursion: the dynamic scope (resource bases of every
//! schema currently being applied, outermost first), lazily-materialised
//! instance and keyword locations, and per-schema-object evaluation
//! tracking for `unevaluatedProperties` / `unevaluatedItems`.
use std::{fmt, io, sync::Arc};

use ahash::AHashSet;
use serde_json::Value;

use referencing::Draft;

use crate::{
    content, document,
    error::{ErrorKind, TypeKind, ValidationError},
    numeric,
    paths::{LazyLocation, Location},
    primitive_type::{PrimitiveType, PrimitiveTypesBitMap},
    schema::{Dependency, Items, ObjectSchema, SchemaKind, SchemaNode, SchemaRef, SchemaSet},
};

/// A compiled JSON Schema.
///
/// An immutable snapshot of the owning compiler's schema graph; validation
/// is pure and may run concurrently from multiple threads.
pub struct CompiledSchema {
    set: Arc<SchemaSet>,
    root: SchemaRef,
}

impl fmt::Debug for CompiledSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledSchema")
            .field("location", &self.location())
            .finish_non_exhaustive()
    }
}

impl CompiledSchema {
    pub(crate) fn new(set: Arc<SchemaSet>, root: SchemaRef) -> CompiledSchema {
        CompiledSchema { set, root }
    }
    /// Validate `instance`, returning the hierarchical error on failure.
    ///
    /// # Errors
    ///
    /// A [`ValidationError`] tree mirroring the keywords that rejected the
    /// instance.
    pub fn validate(&self, instance: &Value) -> Result<(), ValidationError> {
        let evaluator = Evaluator { set: &self.set };
        let iloc = LazyLocation::new();
        let kloc = LazyLocation::new();
        let mut state = EvalState {
            scope: Vec::new(),
            active: Vec::new(),
        };
        let outcome = evaluator.apply(self.root, instance, &iloc, &kloc, &mut state);
        if outcome.errors.is_empty() {
            Ok(())
        } else {
            Err(evaluator.into_single(self.root, outcome.errors, &iloc, &kloc))
        }
    }
    /// Boolean-only validation.
    #[must_use]
    pub fn is_valid(&self, instance: &Value) -> bool {
        self.validate(instance).is_ok()
    }
    /// Parse a JSON stream and validate the result.
    ///
    /// # Errors
    ///
    /// [`ErrorKind::JsonParse`] when the stream is not valid JSON (this
    /// includes duplicate object keys), otherwise as [`CompiledSchema::validate`].
    pub fn validate_reader<R: io::Read>(&self, reader: R) -> Result<(), ValidationError> {
        match document::from_reader(reader) {
            Ok(instance) => self.validate(&instance),
            Err(error) => Err(ValidationError::new(
                ErrorKind::JsonParse { error },
                Location::new(),
                Location::new(),
                self.location().to_string(),
            )),
        }
    }
    /// The draft this schema was compiled under.
    #[must_use]
    pub fn draft(&self) -> Draft {
        self.set.node(self.root).draft
    }
    /// The absolute location of the root schema.
    #[must_use]
    pub fn location(&self) -> &str {
        &self.set.node(self.root).location
    }
}

/// What one schema application produced: failures plus the evaluation
/// annotations consumed by `unevaluated*` in the enclosing schema object.
struct Outcome {
    errors: Vec<ValidationError>,
    /// Property names evaluated on the instance object.
    properties: AHashSet<String>,
    /// One past the maximum evaluated array index.
    items: usize,
}

impl Outcome {
    fn ok() -> Outcome {
        Outcome {
            errors: Vec::new(),
            properties: AHashSet::new(),
            items: 0,
        }
    }
    fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Mutable evaluation state threaded through the walk.
struct EvalState<'a> {
    /// Resource bases of the schemas being applied, outermost first.
    scope: Vec<&'a str>,
    /// `(schema, instance)` pairs currently on the stack. A repeat means a
    /// reference cycle that consumes no instance input; treating it as a
    /// fixed point keeps validation terminating.
    active: Vec<(SchemaRef, *const Value)>,
}

struct Evaluator<'a> {
    set: &'a SchemaSet,
}

impl<'a> Evaluator<'a> {
    fn apply(
        &self,
        idx: SchemaRef,
        instance: &Value,
        iloc: &LazyLocation,
        kloc: &LazyLocation,
        state: &mut EvalState<'a>,
    ) -> Outcome {
        let node = self.set.node(idx);
        match &node.kind {
            SchemaKind::AlwaysTrue => Outcome::ok(),
            SchemaKind::AlwaysFalse => {
                let mut outcome = Outcome::ok();
                outcome.errors.push(ValidationError::new(
                    ErrorKind::FalseSchema,
                    iloc.into(),
                    kloc.into(),
                    node.location.clone(),
                ));
                outcome
            }
            SchemaKind::Object(obj) => {
                let key = (idx, instance as *const Value);
                if state.active.contains(&key) {
                    return Outcome::ok();
                }
                state.active.push(key);
                state.scope.push(&node.base);
                let outcome = self.apply_object(node, obj, instance, iloc, kloc, state);
                state.scope.pop();
                state.active.pop();
                outcome
            }
            SchemaKind::Placeholder => unreachable!("Placeholders are resolved before validation"),
        }
    }

    /// Collapse a child application's failures into a single error node.
    fn into_single(
        &self,
        idx: SchemaRef,
        mut errors: Vec<ValidationError>,
        iloc: &LazyLocation,
        kloc: &LazyLocation,
    ) -> ValidationError {
        if errors.len() == 1 {
            errors.pop().expect("Exactly one error")
        } else {
            ValidationError::new(
                ErrorKind::Schema,
                iloc.into(),
                kloc.into(),
                self.set.node(idx).location.clone(),
            )
            .with_causes(errors)
        }
    }

    fn error(
        &self,
        node: &SchemaNode,
        keyword: &str,
        kind: ErrorKind,
        iloc: &LazyLocation,
        kloc: &LazyLocation,
    ) -> ValidationError {
        ValidationError::new(
            kind,
            iloc.into(),
            Location::from(kloc).join(keyword),
            node.keyword_location(keyword),
        )
    }

    /// Apply an in-place applicator child and merge its annotations on
    /// success.
    fn apply_in_place(
        &self,
        target: SchemaRef,
        instance: &Value,
        iloc: &LazyLocation,
        kloc: &LazyLocation,
        state: &mut EvalState<'a>,
        outcome: &mut Outcome,
    ) {
        let result = self.apply(target, instance, iloc, kloc, state);
        if result.is_valid() {
            outcome.properties.extend(result.properties);
            outcome.items = outcome.items.max(result.items);
        } else {
            outcome
                .errors
                .push(self.into_single(target, result.errors, iloc, kloc));
        }
    }

    #[allow(clippy::too_many_lines)]
    fn apply_object(
        &self,
        node: &SchemaNode,
        obj: &ObjectSchema,
        instance: &Value,
        iloc: &LazyLocation,
        kloc: &LazyLocation,
        state: &mut EvalState<'a>,
    ) -> Outcome {
        let mut outcome = Outcome::ok();
        let legacy = node.draft == Draft::Draft4;

        // In-place references first; their annotations feed `unevaluated*`
        if let Some(target) = obj.reference {
            let kw = kloc.push("$ref");
            self.apply_in_place(target, instance, iloc, &kw, state, &mut outcome);
        }
        if let Some(lexical) = obj.recursive_reference {
            // The lexical target decides whether the dynamic walk applies;
            // the outermost scope with `$recursiveAnchor: true` wins.
            let target = if self.set.node(lexical).recursive_anchor() {
                state
                    .scope
                    .iter()
                    .find_map(|base| self.set.recursive_roots.get(*base))
                    .copied()
                    .unwrap_or(lexical)
            } else {
                lexical
            };
            let kw = kloc.push("$recursiveRef");
            self.apply_in_place(target, instance, iloc, &kw, state, &mut outcome);
        }
        if let Some(dynamic) = &obj.dynamic_reference {
            let target = match &dynamic.anchor {
                Some(name) => state
                    .scope
                    .iter()
                    .find_map(|base| {
                        self.set
                            .dynamic_anchors
                            .get(&((*base).to_string(), name.clone()))
                    })
                    .copied()
                    .unwrap_or(dynamic.lexical),
                None => dynamic.lexical,
            };
            let kw = kloc.push("$dynamicRef");
            self.apply_in_place(target, instance, iloc, &kw, state, &mut outcome);
        }

        // Assertions on the instance itself
        if let Some(types) = obj.types {
            if !type_matches(types, instance, legacy) {
                let kind = if types.iter().count() == 1 {
                    TypeKind::Single(types.iter().next().expect("Non-empty"))
                } else {
                    TypeKind::Multiple(types)
                };
                outcome.errors.push(self.error(
                    node,
                    "type",
                    ErrorKind::Type { kind },
                    iloc,
                    kloc,
                ));
            }
        }
        if let Some(expected) = &obj.const_ {
            if !numeric::equal(instance, expected) {
                outcome.errors.push(self.error(
                    node,
                    "const",
                    ErrorKind::Constant {
                        expected: expected.clone(),
                    },
                    iloc,
                    kloc,
                ));
            }
        }
        if let Some(options) = &obj.enum_ {
            if !options.iter().any(|option| numeric::equal(instance, option)) {
                outcome.errors.push(self.error(
                    node,
                    "enum",
                    ErrorKind::Enum {
                        options: Value::Array(options.clone()),
                    },
                    iloc,
                    kloc,
                ));
            }
        }

        if let Value::Number(number) = instance {
            if let Some(limit) = &obj.minimum {
                if !numeric::num_ge(number, limit) {
                    outcome.errors.push(self.error(
                        node,
                        "minimum",
                        ErrorKind::Minimum {
                            limit: Value::Number(limit.clone()),
                        },
                        iloc,
                        kloc,
                    ));
                }
            }
            if let Some(limit) = &obj.maximum {
                if !numeric::num_le(number, limit) {
                    outcome.errors.push(self.error(
                        node,
                        "maximum",
                        ErrorKind::Maximum {
                            limit: Value::Number(limit.clone()),
                        },
                        iloc,
                        kloc,
                    ));
                }
            }
            if let Some(limit) = &obj.exclusive_minimum {
                if !numeric::num_gt(number, limit) {
                    let keyword = if legacy { "minimum" } else { "exclusiveMinimum" };
                    outcome.errors.push(self.error(
                        node,
                        keyword,
                        ErrorKind::ExclusiveMinimum {
                            limit: Value::Number(limit.clone()),
                        },
                        iloc,
                        kloc,
                    ));
                }
            }
            if let Some(limit) = &obj.exclusive_maximum {
                if !numeric::num_lt(number, limit) {
                    let keyword = if legacy { "maximum" } else { "exclusiveMaximum" };
                    outcome.errors.push(self.error(
                        node,
                        keyword,
                        ErrorKind::ExclusiveMaximum {
                            limit: Value::Number(limit.clone()),
                        },
                        iloc,
                        kloc,
                    ));
                }
            }
            if let Some(divisor) = &obj.multiple_of {
                if !numeric::is_multiple_of(number, divisor) {
                    outcome.errors.push(self.error(
                        node,
                        "multipleOf",
                        ErrorKind::MultipleOf {
                            multiple_of: Value::Number(divisor.clone()),
                        },
                        iloc,
                        kloc,
                    ));
                }
            }
        }

        if let Value::String(string) = instance {
            let length = || bytecount::num_chars(string.as_bytes()) as u64;
            if let Some(limit) = obj.min_length {
                if length() < limit {
                    outcome.errors.push(self.error(
                        node,
                        "minLength",
                        ErrorKind::MinLength { limit },
                        iloc,
                        kloc,
                    ));
                }
            }
            if let Some(limit) = obj.max_length {
                if length() > limit {
                    outcome.errors.push(self.error(
                        node,
                        "maxLength",
                        ErrorKind::MaxLength { limit },
                        iloc,
                        kloc,
                    ));
                }
            }
            if let Some(pattern) = &obj.pattern {
                if !pattern.regex.is_match(string).unwrap_or(false) {
                    outcome.errors.push(self.error(
                        node,
                        "pattern",
                        ErrorKind::Pattern {
                            pattern: pattern.source.clone(),
                        },
                        iloc,
                        kloc,
                    ));
                }
            }
            if let Some(format) = &obj.format {
                if !format.check.is_valid(string) {
                    outcome.errors.push(self.error(
                        node,
                        "format",
                        ErrorKind::Format {
                            format: format.name.clone(),
                        },
                        iloc,
                        kloc,
                    ));
                }
            }
            self.apply_content(node, obj, string, iloc, kloc, state, &mut outcome);
        }

        if let Value::Object(object) = instance {
            if let Some(required) = &obj.required {
                for property in required {
                    if !object.contains_key(property) {
                        outcome.errors.push(self.error(
                            node,
                            "required",
                            ErrorKind::Required {
                                property: property.clone(),
                            },
                            iloc,
                            kloc,
                        ));
                    }
                }
            }
            if let Some(limit) = obj.min_properties {
                if (object.len() as u64) < limit {
                    outcome.errors.push(self.error(
                        node,
                        "minProperties",
                        ErrorKind::MinProperties { limit },
                        iloc,
                        kloc,
                    ));
                }
            }
            if let Some(limit) = obj.max_properties {
                if object.len() as u64 > limit {
                    outcome.errors.push(self.error(
                        node,
                        "maxProperties",
                        ErrorKind::MaxProperties { limit },
                        iloc,
                        kloc,
                    ));
                }
            }
            if let Some(dependent) = &obj.dependent_required {
                for (trigger, names) in dependent {
                    if object.contains_key(trigger) {
                        for name in names {
                            if !object.contains_key(name) {
                                outcome.errors.push(self.error(
                                    node,
                                    "dependentRequired",
                                    ErrorKind::Required {
                                        property: name.clone(),
                                    },
                                    iloc,
                                    kloc,
                                ));
                            }
                        }
                    }
                }
            }
            self.apply_object_keywords(node, obj, instance, object, iloc, kloc, state, &mut outcome);
        }

        if let Value::Array(array) = instance {
            if let Some(limit) = obj.min_items {
                if (array.len() as u64) < limit {
                    outcome.errors.push(self.error(
                        node,
                        "minItems",
                        ErrorKind::MinItems { limit },
                        iloc,
                        kloc,
                    ));
                }
            }
            if let Some(limit) = obj.max_items {
                if array.len() as u64 > limit {
                    outcome.errors.push(self.error(
                        node,
                        "maxItems",
                        ErrorKind::MaxItems { limit },
                        iloc,
                        kloc,
                    ));
                }
            }
            if obj.unique_items && !items_are_unique(array) {
                outcome
                    .errors
                    .push(self.error(node, "uniqueItems", ErrorKind::UniqueItems, iloc, kloc));
            }
            self.apply_array_keywords(node, obj, array, iloc, kloc, state, &mut outcome);
        }

        // Logical applicators
        if let Some(branches) = &obj.all_of {
            let kw = kloc.push("allOf");
            for (idx, branch) in branches.iter().enumerate() {
                let kw = kw.push(idx);
                self.apply_in_place(*branch, instance, iloc, &kw, state, &mut outcome);
            }
        }
        if let Some(branches) = &obj.any_of {
            let kw = kloc.push("anyOf");
            let mut branch_errors = Vec::new();
            let mut any_valid = false;
            for (idx, branch) in branches.iter().enumerate() {
                let kw = kw.push(idx);
                let result = self.apply(*branch, instance, iloc, &kw, state);
                if result.is_valid() {
                    any_valid = true;
                    outcome.properties.extend(result.properties);
                    outcome.items = outcome.items.max(result.items);
                } else {
                    branch_errors.push(self.into_single(*branch, result.errors, iloc, &kw));
                }
            }
            if !any_valid {
                outcome.errors.push(
                    self.error(node, "anyOf", ErrorKind::AnyOf, iloc, kloc)
                        .with_causes(branch_errors),
                );
            }
        }
        if let Some(branches) = &obj.one_of {
            let kw = kloc.push("oneOf");
            let mut branch_errors = Vec::new();
            let mut matches = Vec::new();
            let mut annotations = Vec::new();
            for (idx, branch) in branches.iter().enumerate() {
                let kw = kw.push(idx);
                let result = self.apply(*branch, instance, iloc, &kw, state);
                if result.is_valid() {
                    matches.push(idx);
                    annotations.push(result);
                } else {
                    branch_errors.push(self.into_single(*branch, result.errors, iloc, &kw));
                }
            }
            match matches.len() {
                0 => outcome.errors.push(
                    self.error(node, "oneOf", ErrorKind::OneOfNotValid, iloc, kloc)
                        .with_causes(branch_errors),
                ),
                1 => {
                    let result = annotations.pop().expect("One matching branch");
                    outcome.properties.extend(result.properties);
                    outcome.items = outcome.items.max(result.items);
                }
                _ => outcome.errors.push(self.error(
                    node,
                    "oneOf",
                    ErrorKind::OneOfMultipleValid { matches },
                    iloc,
                    kloc,
                )),
            }
        }
        if let Some(negated) = obj.not {
            let kw = kloc.push("not");
            let result = self.apply(negated, instance, iloc, &kw, state);
            if result.is_valid() {
                outcome
                    .errors
                    .push(self.error(node, "not", ErrorKind::Not, iloc, kloc));
            }
        }
        if let Some(condition) = obj.if_ {
            let kw = kloc.push("if");
            let result = self.apply(condition, instance, iloc, &kw, state);
            if result.is_valid() {
                outcome.properties.extend(result.properties);
                outcome.items = outcome.items.max(result.items);
                if let Some(then) = obj.then {
                    let kw = kloc.push("then");
                    self.apply_in_place(then, instance, iloc, &kw, state, &mut outcome);
                }
            } else if let Some(else_) = obj.else_ {
                let kw = kloc.push("else");
                self.apply_in_place(else_, instance, iloc, &kw, state, &mut outcome);
            }
        }

        // User-registered keywords
        for extension in &obj.extensions {
            if let Err(mut error) = extension.assertion.validate(instance, iloc) {
                error.instance_location = iloc.into();
                error.keyword_location = Location::from(kloc).join(extension.keyword.as_str());
                error.absolute_keyword_location = node.keyword_location(&extension.keyword);
                outcome.errors.push(error);
            }
        }

        // `unevaluated*` run last, over the complement of everything the
        // sibling keywords and in-place applicators evaluated
        if let (Some(target), Value::Object(object)) = (obj.unevaluated_properties, instance) {
            let kw = kloc.push("unevaluatedProperties");
            let mut unexpected = Vec::new();
            for (name, value) in object {
                if outcome.properties.contains(name) {
                    continue;
                }
                if matches!(self.set.node(target).kind, SchemaKind::AlwaysFalse) {
                    unexpected.push(name.clone());
                } else {
                    let iloc = iloc.push(name);
                    let result = self.apply(target, value, &iloc, &kw, state);
                    if !result.is_valid() {
                        outcome
                            .errors
                            .push(self.into_single(target, result.errors, &iloc, &kw));
                    }
                }
                outcome.properties.insert(name.clone());
            }
            if !unexpected.is_empty() {
                outcome.errors.push(self.error(
                    node,
                    "unevaluatedProperties",
                    ErrorKind::UnevaluatedProperties { unexpected },
                    iloc,
                    kloc,
                ));
            }
        }
        if let (Some(target), Value::Array(array)) = (obj.unevaluated_items, instance) {
            let kw = kloc.push("unevaluatedItems");
            let mut unexpected = Vec::new();
            for (idx, value) in array.iter().enumerate().skip(outcome.items) {
                if matches!(self.set.node(target).kind, SchemaKind::AlwaysFalse) {
                    unexpected.push(idx);
                } else {
                    let iloc = iloc.push(idx);
                    let result = self.apply(target, value, &iloc, &kw, state);
                    if !result.is_valid() {
                        outcome
                            .errors
                            .push(self.into_single(target, result.errors, &iloc, &kw));
                    }
                }
            }
            outcome.items = array.len();
            if !unexpected.is_empty() {
                outcome.errors.push(self.error(
                    node,
                    "unevaluatedItems",
                    ErrorKind::UnevaluatedItems { unexpected },
                    iloc,
                    kloc,
                ));
            }
        }

        outcome
    }

    fn apply_content(
        &self,
        node: &SchemaNode,
        obj: &ObjectSchema,
        string: &str,
        iloc: &LazyLocation,
        kloc: &LazyLocation,
        state: &mut EvalState<'a>,
        outcome: &mut Outcome,
    ) {
        let mut decoded: Option<Vec<u8>> = None;
        if let Some(encoding) = &obj.content_encoding {
            if (encoding.check)(string) {
                decoded = (encoding.decode)(string);
            } else {
                outcome.errors.push(self.error(
                    node,
                    "contentEncoding",
                    ErrorKind::ContentEncoding {
                        content_encoding: encoding.name.clone(),
                    },
                    iloc,
                    kloc,
                ));
                return;
            }
        }
        let bytes = decoded.as_deref().unwrap_or_else(|| string.as_bytes());
        if let Some(media_type) = &obj.content_media_type {
            if !(media_type.check)(bytes) {
                outcome.errors.push(self.error(
                    node,
                    "contentMediaType",
                    ErrorKind::ContentMediaType {
                        content_media_type: media_type.name.clone(),
                    },
                    iloc,
                    kloc,
                ));
                return;
            }
        }
        if let Some(target) = obj.content_schema {
            let media_type = obj.content_media_type.as_ref().map(|m| m.name.as_str());
            let decode = obj.content_encoding.as_ref().map(|e| e.decode);
            if let Some(content) = content::decode_for_schema(string, decode, media_type) {
                let kw = kloc.push("contentSchema");
                let result = self.apply(target, &content, iloc, &kw, state);
                if !result.is_valid() {
                    outcome.errors.push(
                        self.error(node, "contentSchema", ErrorKind::ContentSchema, iloc, kloc)
                            .with_causes(result.errors),
                    );
                }
            }
        }
    }

    #[allow(clippy::too_many_lines)]
    fn apply_object_keywords(
        &self,
        node: &SchemaNode,
        obj: &ObjectSchema,
        instance: &Value,
        object: &serde_json::Map<String, Value>,
        iloc: &LazyLocation,
        kloc: &LazyLocation,
        state: &mut EvalState<'a>,
        outcome: &mut Outcome,
    ) {
        if let Some(properties) = &obj.properties {
            let kw = kloc.push("properties");
            for (name, target) in properties {
                if let Some(value) = object.get(name) {
                    let kw = kw.push(name);
                    let iloc = iloc.push(name);
                    let result = self.apply(*target, value, &iloc, &kw, state);
                    if !result.is_valid() {
                        outcome
                            .errors
                            .push(self.into_single(*target, result.errors, &iloc, &kw));
                    }
                    outcome.properties.insert(name.clone());
                }
            }
        }
        if let Some(patterns) = &obj.pattern_properties {
            let kw = kloc.push("patternProperties");
            for pattern in patterns {
                for (name, value) in object {
                    if pattern.regex.is_match(name).unwrap_or(false) {
                        let kw = kw.push(&pattern.source);
                        let iloc = iloc.push(name);
                        let result = self.apply(pattern.schema, value, &iloc, &kw, state);
                        if !result.is_valid() {
                            outcome.errors.push(self.into_single(
                                pattern.schema,
                                result.errors,
                                &iloc,
                                &kw,
                            ));
                        }
                        outcome.properties.insert(name.clone());
                    }
                }
            }
        }
        if let Some(target) = obj.additional_properties {
            let kw = kloc.push("additionalProperties");
            let mut unexpected = Vec::new();
            for (name, value) in object {
                let in_properties = obj
                    .properties
                    .as_ref()
                    .is_some_and(|props| props.iter().any(|(known, _)| known == name));
                let in_patterns = obj.pattern_properties.as_ref().is_some_and(|patterns| {
                    patterns
                        .iter()
                        .any(|pattern| pattern.regex.is_match(name).unwrap_or(false))
                });
                if in_properties || in_patterns {
                    continue;
                }
                if matches!(self.set.node(target).kind, SchemaKind::AlwaysFalse) {
                    unexpected.push(name.clone());
                } else {
                    let iloc = iloc.push(name);
                    let result = self.apply(target, value, &iloc, &kw, state);
                    if !result.is_valid() {
                        outcome
                            .errors
                            .push(self.into_single(target, result.errors, &iloc, &kw));
                    }
                }
                outcome.properties.insert(name.clone());
            }
            if !unexpected.is_empty() {
                outcome.errors.push(self.error(
                    node,
                    "additionalProperties",
                    ErrorKind::AdditionalProperties { unexpected },
                    iloc,
                    kloc,
                ));
            }
        }
        if let Some(target) = obj.property_names {
            let kw = kloc.push("propertyNames");
            for name in object.keys() {
                let name_value = Value::String(name.clone());
                let result = self.apply(target, &name_value, iloc, &kw, state);
                if !result.is_valid() {
                    outcome.errors.push(
                        self.error(
                            node,
                            "propertyNames",
                            ErrorKind::PropertyNames {
                                property: name.clone(),
                            },
                            iloc,
                            kloc,
                        )
                        .with_causes(result.errors),
                    );
                }
            }
        }
        if let Some(dependent) = &obj.dependent_schemas {
            let kw = kloc.push("dependentSchemas");
            for (trigger, target) in dependent {
                if object.contains_key(trigger) {
                    let kw = kw.push(trigger);
                    self.apply_in_place(*target, instance, iloc, &kw, state, outcome);
                }
            }
        }
        if let Some(dependencies) = &obj.dependencies {
            let kw = kloc.push("dependencies");
            for (trigger, dependency) in dependencies {
                if !object.contains_key(trigger) {
                    continue;
                }
                match dependency {
                    Dependency::Required(names) => {
                        for name in names {
                            if !object.contains_key(name) {
                                outcome.errors.push(self.error(
                                    node,
                                    "dependencies",
                                    ErrorKind::Required {
                                        property: name.clone(),
                                    },
                                    iloc,
                                    kloc,
                                ));
                            }
                        }
                    }
                    Dependency::Schema(target) => {
                        let kw = kw.push(trigger);
                        self.apply_in_place(*target, instance, iloc, &kw, state, outcome);
                    }
                }
            }
        }
    }

    fn apply_array_keywords(
        &self,
        node: &SchemaNode,
        obj: &ObjectSchema,
        array: &[Value],
        iloc: &LazyLocation,
        kloc: &LazyLocation,
        state: &mut EvalState<'a>,
        outcome: &mut Outcome,
    ) {
        let mut prefix_len = 0;
        if let Some(prefix) = &obj.prefix_items {
            let kw = kloc.push("prefixItems");
            for (idx, (target, value)) in prefix.iter().zip(array).enumerate() {
                let kw = kw.push(idx);
                let iloc = iloc.push(idx);
                let result = self.apply(*target, value, &iloc, &kw, state);
                if !result.is_valid() {
                    outcome
                        .errors
                        .push(self.into_single(*target, result.errors, &iloc, &kw));
                }
                outcome.items = outcome.items.max(idx + 1);
            }
            prefix_len = prefix.len();
        }
        match &obj.items {
            Some(Items::Schema(target)) => {
                let kw = kloc.push("items");
                for (idx, value) in array.iter().enumerate().skip(prefix_len) {
                    let iloc = iloc.push(idx);
                    let result = self.apply(*target, value, &iloc, &kw, state);
                    if !result.is_valid() {
                        outcome
                            .errors
                            .push(self.into_single(*target, result.errors, &iloc, &kw));
                    }
                }
                if array.len() > prefix_len {
                    outcome.items = array.len();
                }
            }
            Some(Items::Array(schemas)) => {
                let kw = kloc.push("items");
                for (idx, (target, value)) in schemas.iter().zip(array).enumerate() {
                    let kw = kw.push(idx);
                    let iloc = iloc.push(idx);
                    let result = self.apply(*target, value, &iloc, &kw, state);
                    if !result.is_valid() {
                        outcome
                            .errors
                            .push(self.into_single(*target, result.errors, &iloc, &kw));
                    }
                    outcome.items = outcome.items.max(idx + 1);
                }
                if let Some(target) = obj.additional_items {
                    let kw = kloc.push("additionalItems");
                    let mut failed = false;
                    for (idx, value) in array.iter().enumerate().skip(schemas.len()) {
                        if matches!(self.set.node(target).kind, SchemaKind::AlwaysFalse) {
                            failed = true;
                        } else {
                            let iloc = iloc.push(idx);
                            let result = self.apply(target, value, &iloc, &kw, state);
                            if !result.is_valid() {
                                outcome.errors.push(self.into_single(
                                    target,
                                    result.errors,
                                    &iloc,
                                    &kw,
                                ));
                            }
                        }
                        outcome.items = outcome.items.max(idx + 1);
                    }
                    if failed {
                        outcome.errors.push(self.error(
                            node,
                            "additionalItems",
                            ErrorKind::AdditionalItems {
                                limit: schemas.len(),
                            },
                            iloc,
                            kloc,
                        ));
                    }
                }
            }
            None => {}
        }
        if let Some(target) = obj.contains {
            let kw = kloc.push("contains");
            let mut matched = 0_usize;
            for (idx, value) in array.iter().enumerate() {
                let iloc = iloc.push(idx);
                if self.apply(target, value, &iloc, &kw, state).is_valid() {
                    matched += 1;
                    outcome.items = outcome.items.max(idx + 1);
                }
            }
            let minimum = obj.min_contains.unwrap_or(1);
            if (matched as u64) < minimum {
                let kind = if obj.min_contains.is_some() {
                    ErrorKind::MinContains {
                        limit: minimum,
                        found: matched,
                    }
                } else {
                    ErrorKind::Contains
                };
                let keyword = if obj.min_contains.is_some() {
                    "minContains"
                } else {
                    "contains"
                };
                outcome
                    .errors
                    .push(self.error(node, keyword, kind, iloc, kloc));
            }
            if let Some(maximum) = obj.max_contains {
                if matched as u64 > maximum {
                    outcome.errors.push(self.error(
                        node,
                        "maxContains",
                        ErrorKind::MaxContains {
                            limit: maximum,
                            found: matched,
                        },
                        iloc,
                        kloc,
                    ));
                }
            }
        }
    }
}

fn type_matches(types: PrimitiveTypesBitMap, instance: &Value, legacy: bool) -> bool {
    match instance {
        Value::Null => types.contains_type(PrimitiveType::Null),
        Value::Bool(_) => types.contains_type(PrimitiveType::Boolean),
        Value::Number(number) => {
            types.contains_type(PrimitiveType::Number)
                || (types.contains_type(PrimitiveType::Integer)
                    && numeric::is_integer(number, legacy))
        }
        Value::String(_) => types.contains_type(PrimitiveType::String),
        Value::Array(_) => types.contains_type(PrimitiveType::Array),
        Value::Object(_) => types.contains_type(PrimitiveType::Object),
    }
}

fn items_are_unique(array: &[Value]) -> bool {
    for (idx, left) in array.iter().enumerate() {
        for right in &array[idx + 1..] {
            if numeric::equal(left, right) {
                return false;
            }
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use crate::validator_for;
    use serde_json::{json, Value};
    use test_case::test_case;

    #[test_case(&json!({"type": "integer", "minimum": 0}), &json!(3), true)]
    #[test_case(&json!({"type": "integer", "minimum": 0}), &json!(-1), false)]
    #[test_case(&json!({"type": "integer", "minimum": 0}), &json!(3.5), false)]
    #[test_case(&json!({"type": "integer", "minimum": 0}), &json!("3"), false)]
    #[test_case(&json!({"multipleOf": 0.1}), &json!(1.1), true; "exact decimal arithmetic")]
    #[test_case(&json!({"maxLength": 2}), &json!("日本語"), false; "length counts characters")]
    #[test_case(&json!({"uniqueItems": true}), &json!([1, 1.0]), false; "numeric uniqueness")]
    #[test_case(&json!({"contains": {"minimum": 5}, "minContains": 0}), &json!([]), true)]
    #[test_case(&json!({"anyOf": [{"type": "integer"}, {"minimum": 2}]}), &json!(1.5), false)]
    #[test_case(&json!({"oneOf": [{"type": "integer"}, {"minimum": 2}]}), &json!(3), false; "one of multiple valid")]
    #[test_case(&json!({"not": {"type": "integer"}}), &json!(1), false)]
    #[test_case(&json!({"if": {"minimum": 0}, "then": {"multipleOf": 2}}), &json!(3), false)]
    #[test_case(&json!({"if": {"minimum": 0}, "else": {"multipleOf": 2}}), &json!(-3), false)]
    #[test_case(&json!({"if": {"minimum": 0}, "else": {"multipleOf": 2}}), &json!(3), true; "if passes without then")]
    fn validation_outcomes(schema: &Value, instance: &Value, expected: bool) {
        let validator = validator_for(schema).expect("Valid schema");
        assert_eq!(validator.is_valid(instance), expected);
        assert_eq!(validator.validate(instance).is_ok(), expected);
    }

    #[test]
    fn minimum_failure_names_the_keyword() {
        let validator = validator_for(&json!({"type": "integer", "minimum": 0})).expect("Valid schema");
        let error = validator.validate(&json!(-1)).expect_err("Should fail");
        assert_eq!(error.keyword_location.as_str(), "/minimum");
        assert!(error.absolute_keyword_location.ends_with("/minimum"));
    }

    #[test]
    fn type_failure_names_the_keyword() {
        let validator = validator_for(&json!({"type": "integer", "minimum": 0})).expect("Valid schema");
        let error = validator.validate(&json!(3.5)).expect_err("Should fail");
        assert_eq!(error.keyword_location.as_str(), "/type");
    }

    #[test]
    fn multiple_failures_group_under_the_schema() {
        let validator =
            validator_for(&json!({"minProperties": 2, "propertyNames": {"minLength": 3}}))
                .expect("Valid schema");
        let error = validator.validate(&json!({"a": 3})).expect_err("Should fail");
        assert_eq!(error.causes.len(), 2);
        let rendered = error.to_string();
        assert!(rendered.contains("less than 2 properties"));
        assert!(rendered.contains("'a' is invalid"));
    }

    #[test]
    fn ref_failure_reports_the_target_location() {
        let validator = validator_for(&json!({
            "$ref": "#/$defs/A",
            "$defs": {"A": {"type": "string"}}
        }))
        .expect("Valid schema");
        assert!(validator.is_valid(&json!("x")));
        let error = validator.validate(&json!(1)).expect_err("Should fail");
        assert!(
            error.absolute_keyword_location.ends_with("/$defs/A/type"),
            "got {}",
            error.absolute_keyword_location
        );
        assert_eq!(error.keyword_location.as_str(), "/$ref/type");
    }

    #[test]
    fn unevaluated_properties_sees_sibling_applicators() {
        let schema = json!({
            "unevaluatedProperties": false,
            "properties": {"a": {}},
            "allOf": [{"properties": {"b": {}}}]
        });
        let validator = validator_for(&schema).expect("Valid schema");
        assert!(validator.is_valid(&json!({"a": 1, "b": 2})));
        let error = validator
            .validate(&json!({"a": 1, "b": 2, "c": 3}))
            .expect_err("Should fail");
        assert!(error.to_string().contains("'c'"));
    }

    #[test]
    fn unevaluated_items_sees_prefix_items() {
        let schema = json!({
            "prefixItems": [{"type": "integer"}],
            "unevaluatedItems": false
        });
        let validator = validator_for(&schema).expect("Valid schema");
        assert!(validator.is_valid(&json!([1])));
        assert!(!validator.is_valid(&json!([1, 2])));
    }

    #[test]
    fn recursive_schema_terminates() {
        let validator = validator_for(&json!({"$ref": "#"})).expect("Valid schema");
        assert!(validator.is_valid(&json!({"anything": []})));
    }

    #[test]
    fn draft4_integer_is_lexical() {
        let schema = json!({
            "$schema": "http://json-schema.org/draft-04/schema#",
            "type": "integer"
        });
        let validator = validator_for(&schema).expect("Valid schema");
        assert!(validator.is_valid(&json!(1)));
        assert!(!validator.is_valid(&json!(1.0)));

        let modern = validator_for(&json!({"type": "integer"})).expect("Valid schema");
        assert!(modern.is_valid(&json!(1.0)));
    }

    #[test]
    fn draft4_exclusive_minimum_modifier() {
        let schema = json!({
            "$schema": "http://json-schema.org/draft-04/schema#",
            "minimum": 0,
            "exclusiveMinimum": true
        });
        let validator = validator_for(&schema).expect("Valid schema");
        assert!(!validator.is_valid(&json!(0)));
        assert!(validator.is_valid(&json!(1)));
    }

    #[test]
    fn validate_reader_parses_and_delegates() {
        let validator = validator_for(&json!({"type": "integer"})).expect("Valid schema");
        assert!(validator.validate_reader(&b"3"[..]).is_ok());
        assert!(validator.validate_reader(&b"3.5"[..]).is_err());
        let error = validator
            .validate_reader(&b"{not json"[..])
            .expect_err("Parse failure");
        assert!(error.message().contains("not valid JSON"));
    }

    #[test]
    fn validation_is_pure() {
        let validator = validator_for(&json!({"items": {"type": "integer"}})).expect("Valid schema");
        let instance = json!([1, "x", 3]);
        let first = validator.validate(&instance).expect_err("Should fail").to_string();
        let second = validator.validate(&instance).expect_err("Should fail").to_string();
        assert_eq!(first, second);
    }

    #[test]
    fn compiled_schema_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<crate::CompiledSchema>();
    }
}
