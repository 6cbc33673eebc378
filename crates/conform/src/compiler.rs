//! Two-phase schema compilation.
//!
//! `compile` reserves an identity-stable arena slot per schema location
//! before compiling its body, so reentrant compiles of the same location
//! terminate cycles; a worklist drains until every placeholder is resolved.
//! Failed runs roll the arena and its indices back so the next compile of
//! the same location retries cleanly.
use std::{collections::VecDeque, sync::Arc};

use ahash::{AHashMap, AHashSet};
use once_cell::sync::Lazy;
use serde_json::{Map, Value};

use referencing::{meta, pointer, uri, Draft, ResolveError, ResourceIndex, Scope, Target};

use crate::{
    content, document,
    error::{CompileError, ErrorKind, ValidationError},
    format,
    custom::KeywordFactory,
    options::CompilerOptions,
    paths::Location,
    primitive_type::{PrimitiveType, PrimitiveTypesBitMap},
    schema::{
        CompiledPattern, ContentEncodingAssertion, ContentMediaTypeAssertion, Dependency,
        DynamicReference, Extension, FormatAssertion, Items, ObjectSchema, PatternProperty,
        SchemaKind, SchemaNode, SchemaRef, SchemaSet,
    },
    validator::CompiledSchema,
    numeric,
};

pub(crate) const DEFAULT_ROOT_URL: &str = "json-schema:///";

/// A JSON Schema compiler.
///
/// Holds added resources, compiled schemas and registered extensions.
/// Compilation is single-threaded per compiler; the [`CompiledSchema`]
/// handles it produces are immutable snapshots that may validate
/// concurrently.
pub struct Compiler {
    pub(crate) options: CompilerOptions,
    resources: ResourceIndex,
    nodes: Vec<Arc<SchemaNode>>,
    index: AHashMap<String, SchemaRef>,
    dynamic_anchors: AHashMap<(String, String), SchemaRef>,
    recursive_roots: AHashMap<String, SchemaRef>,
    extensions: AHashMap<String, RegisteredExtension>,
    validated_resources: AHashSet<String>,
    /// `$dynamicAnchor` names referenced so far; refreshed on every compile
    /// so resources added later still participate in re-targeting.
    dynamic_names: AHashSet<String>,
    uses_recursive_refs: bool,
}

struct RegisteredExtension {
    meta: CompiledSchema,
    factory: Arc<dyn KeywordFactory>,
}

impl Default for Compiler {
    fn default() -> Self {
        Self::new()
    }
}

impl Compiler {
    /// A compiler with default options.
    #[must_use]
    pub fn new() -> Compiler {
        Compiler::with_options(CompilerOptions::default())
    }
    /// Default [`CompilerOptions`] to configure a compiler with.
    #[must_use]
    pub fn options() -> CompilerOptions {
        CompilerOptions::default()
    }
    pub(crate) fn with_options(options: CompilerOptions) -> Compiler {
        Compiler {
            options,
            resources: ResourceIndex::new(),
            nodes: Vec::new(),
            index: AHashMap::new(),
            dynamic_anchors: AHashMap::new(),
            recursive_roots: AHashMap::new(),
            extensions: AHashMap::new(),
            validated_resources: AHashSet::new(),
            dynamic_names: AHashSet::new(),
            uses_recursive_refs: false,
        }
    }
    /// Add a schema document under the given URL.
    ///
    /// The bytes are parsed (duplicate object keys are rejected), the draft
    /// is detected from `$schema` (falling back to the compiler default),
    /// and every nested subresource and anchor is registered. External
    /// references are fetched through the configured loader.
    ///
    /// # Errors
    ///
    /// [`CompileError::Parse`] for malformed documents,
    /// [`CompileError::Resolve`] for registration failures, including
    /// duplicate `$id`s or anchors within the resource.
    pub fn add_resource(&mut self, url: impl Into<String>, bytes: &[u8]) -> Result<(), CompileError> {
        let contents = document::from_slice(bytes)?;
        self.add_resource_value(url, contents)
    }
    /// Add an already-parsed schema document under the given URL.
    ///
    /// # Errors
    ///
    /// See [`Compiler::add_resource`].
    pub fn add_resource_value(
        &mut self,
        url: impl Into<String>,
        contents: Value,
    ) -> Result<(), CompileError> {
        let url = url.into();
        self.resources.insert(
            &url,
            contents,
            self.options.default_draft(),
            &*self.options.loader,
        )?;
        Ok(())
    }
    /// Register a user-defined keyword.
    ///
    /// `meta_schema` is a schema document validating the keyword's value
    /// wherever it appears; `factory` compiles the value into an assertion.
    ///
    /// # Errors
    ///
    /// If the meta-schema text does not parse or compile.
    pub fn register_extension(
        &mut self,
        keyword: impl Into<String>,
        meta_schema: &str,
        factory: impl KeywordFactory + 'static,
    ) -> Result<(), CompileError> {
        let keyword = keyword.into();
        let contents = document::from_slice(meta_schema.as_bytes())?;
        let url = format!("{DEFAULT_ROOT_URL}extensions/{keyword}");
        let mut compiler = Compiler::with_options(self.options.clone());
        compiler.add_resource_value(url.clone(), contents)?;
        let meta = compiler.compile(&url)?;
        self.extensions.insert(
            keyword,
            RegisteredExtension {
                meta,
                factory: Arc::new(factory),
            },
        );
        Ok(())
    }
    /// Compile the schema at `url` (added earlier or fetched on demand).
    ///
    /// Returns a handle sharing the compiler's schema graph; repeated calls
    /// for the same location reuse already-compiled nodes.
    ///
    /// # Errors
    ///
    /// [`CompileError::SchemaNotValid`] when the document is rejected by
    /// its meta-schema, [`CompileError::Resolve`] for dangling references
    /// and loading failures.
    pub fn compile(&mut self, url: &str) -> Result<CompiledSchema, CompileError> {
        self.ensure_resource(url)?;
        let checkpoint = self.nodes.len();
        let (result, added_index, added_dynamic, added_recursive) = {
            let mut run = CompileRun {
                options: &self.options,
                resources: &self.resources,
                extensions: &self.extensions,
                nodes: &mut self.nodes,
                index: &mut self.index,
                dynamic_anchors: &mut self.dynamic_anchors,
                recursive_roots: &mut self.recursive_roots,
                validated_resources: &mut self.validated_resources,
                dynamic_names: &mut self.dynamic_names,
                uses_recursive_refs: &mut self.uses_recursive_refs,
                queue: VecDeque::new(),
                added_index: Vec::new(),
                added_dynamic: Vec::new(),
                added_recursive: Vec::new(),
                compiled_recursive_roots: false,
            };
            let result = run.run(url);
            (
                result,
                run.added_index,
                run.added_dynamic,
                run.added_recursive,
            )
        };
        match result {
            Ok(root) => Ok(CompiledSchema::new(
                Arc::new(SchemaSet {
                    nodes: self.nodes.iter().cloned().collect(),
                    dynamic_anchors: self.dynamic_anchors.clone(),
                    recursive_roots: self.recursive_roots.clone(),
                }),
                root,
            )),
            Err(error) => {
                self.nodes.truncate(checkpoint);
                for key in added_index {
                    self.index.remove(&key);
                }
                for key in added_dynamic {
                    self.dynamic_anchors.remove(&key);
                }
                for key in added_recursive {
                    self.recursive_roots.remove(&key);
                }
                Err(error)
            }
        }
    }
    /// Like [`Compiler::compile`], but panics on failure.
    ///
    /// # Panics
    ///
    /// When the schema cannot be compiled.
    #[must_use]
    pub fn must_compile(&mut self, url: &str) -> CompiledSchema {
        match self.compile(url) {
            Ok(compiled) => compiled,
            Err(error) => panic!("Failed to compile '{url}': {error}"),
        }
    }
    /// Fetch and register the document at `url` if it is not present yet.
    fn ensure_resource(&mut self, url: &str) -> Result<(), CompileError> {
        let (base, _) = uri::split(url);
        let absolute = uri::absolute(base)?;
        if self.resources.contains(&absolute) {
            return Ok(());
        }
        let document = self
            .options
            .loader
            .load(&absolute.borrow())
            .map_err(|source| ResolveError::Loader {
                url: absolute.as_str().to_string(),
                source,
            })?;
        self.resources.insert(
            absolute.as_str(),
            document,
            self.options.default_draft(),
            &*self.options.loader,
        )?;
        Ok(())
    }
}

/// Validators for the embedded meta-schemas, compiled once with schema
/// validation off.
fn meta_validators() -> &'static AHashMap<Draft, CompiledSchema> {
    static VALIDATORS: Lazy<AHashMap<Draft, CompiledSchema>> = Lazy::new(|| {
        let mut validators = AHashMap::with_capacity(5);
        for draft in [
            Draft::Draft4,
            Draft::Draft6,
            Draft::Draft7,
            Draft::Draft201909,
            Draft::Draft202012,
        ] {
            let mut compiler = Compiler::options().without_schema_validation().build();
            let compiled = compiler
                .compile(meta::metaschema_url(draft))
                .expect("Invalid meta-schema");
            validators.insert(draft, compiled);
        }
        validators
    });
    &VALIDATORS
}

/// Whether `base` belongs to the embedded meta-schema family; those are
/// trusted and skip meta-validation.
fn is_specification_base(base: &str) -> bool {
    base.strip_prefix("https://")
        .or_else(|| base.strip_prefix("http://"))
        .is_some_and(|tail| tail.starts_with("json-schema.org/draft"))
}

struct Pending<'c> {
    idx: SchemaRef,
    contents: &'c Value,
    scope: Scope<'c>,
    draft: Draft,
}

struct CompileRun<'c> {
    options: &'c CompilerOptions,
    resources: &'c ResourceIndex,
    extensions: &'c AHashMap<String, RegisteredExtension>,
    nodes: &'c mut Vec<Arc<SchemaNode>>,
    index: &'c mut AHashMap<String, SchemaRef>,
    dynamic_anchors: &'c mut AHashMap<(String, String), SchemaRef>,
    recursive_roots: &'c mut AHashMap<String, SchemaRef>,
    validated_resources: &'c mut AHashSet<String>,
    dynamic_names: &'c mut AHashSet<String>,
    uses_recursive_refs: &'c mut bool,
    queue: VecDeque<Pending<'c>>,
    added_index: Vec<String>,
    added_dynamic: Vec<(String, String)>,
    added_recursive: Vec<String>,
    compiled_recursive_roots: bool,
}

impl<'c> CompileRun<'c> {
    fn run(&mut self, url: &str) -> Result<SchemaRef, CompileError> {
        let resources: &'c ResourceIndex = self.resources;
        let resolved = resources.resolve(url)?;
        let root = self.intern(resolved)?;
        // Re-targeting tables cover resources added since the last compile
        if *self.uses_recursive_refs {
            self.compile_recursive_roots()?;
        }
        let known_names: Vec<String> = self.dynamic_names.iter().cloned().collect();
        for name in known_names {
            self.compile_dynamic_anchors(&name)?;
        }
        while let Some(pending) = self.queue.pop_front() {
            let kind = self.compile_node(&pending)?;
            let node = Arc::get_mut(&mut self.nodes[pending.idx])
                .expect("Placeholders are not shared during compilation");
            node.kind = kind;
            if node.recursive_anchor() && node.location == node.base {
                let key = node.base.clone();
                if self
                    .recursive_roots
                    .insert(key.clone(), pending.idx)
                    .is_none()
                {
                    self.added_recursive.push(key);
                }
            }
        }
        Ok(root)
    }

    /// Reserve an arena slot for the resolved schema, keyed by its
    /// canonical location, and queue its body for compilation.
    fn intern(&mut self, target: Target<'c>) -> Result<SchemaRef, CompileError> {
        let draft = target.draft().detect(target.node())?;
        self.intern_parts(
            target.node(),
            target.scope().clone(),
            draft,
            target.location().as_str().to_string(),
        )
    }

    fn intern_parts(
        &mut self,
        contents: &'c Value,
        scope: Scope<'c>,
        draft: Draft,
        location: String,
    ) -> Result<SchemaRef, CompileError> {
        if let Some(&idx) = self.index.get(&location) {
            return Ok(idx);
        }
        let base = scope.base().as_str().to_string();
        self.meta_validate(&base)?;
        let idx = self.nodes.len();
        self.nodes.push(Arc::new(SchemaNode::placeholder(
            draft,
            location.clone(),
            base,
        )));
        self.index.insert(location.clone(), idx);
        self.added_index.push(location);
        self.queue.push_back(Pending {
            idx,
            contents,
            scope,
            draft,
        });
        Ok(idx)
    }

    /// Validate the resource root at `base` against its draft's
    /// meta-schema, once per resource.
    fn meta_validate(&mut self, base: &str) -> Result<(), CompileError> {
        if !self.options.validate_schema
            || is_specification_base(base)
            || self.validated_resources.contains(base)
        {
            return Ok(());
        }
        let resources: &'c ResourceIndex = self.resources;
        let target = resources.resolve(base)?;
        let draft = target.draft().detect(target.node())?;
        if let Err(error) = meta_validators()
            .get(&draft)
            .expect("All drafts have meta-validators")
            .validate(target.node())
        {
            return Err(CompileError::SchemaNotValid(Box::new(error)));
        }
        self.validated_resources.insert(base.to_string());
        Ok(())
    }

    fn schema_error(&self, pending: &Pending<'c>, message: impl Into<String>) -> CompileError {
        let node = &self.nodes[pending.idx];
        CompileError::SchemaNotValid(Box::new(ValidationError::new(
            ErrorKind::Custom {
                message: message.into(),
            },
            Location::new(),
            Location::new(),
            node.location.clone(),
        )))
    }

    fn compile_node(&mut self, pending: &Pending<'c>) -> Result<SchemaKind, CompileError> {
        match pending.contents {
            Value::Bool(true) => Ok(SchemaKind::AlwaysTrue),
            Value::Bool(false) => Ok(SchemaKind::AlwaysFalse),
            Value::Object(schema) => self.compile_object(pending, schema),
            _ => Err(self.schema_error(pending, "the schema must be an object or a boolean")),
        }
    }

    /// Compile the target of a reference.
    fn reference(&mut self, pending: &Pending<'c>, reference: &str) -> Result<SchemaRef, CompileError> {
        let target = pending.scope.resolve(reference)?;
        self.intern(target)
    }

    /// Compile a directly-nested subschema.
    fn child(
        &mut self,
        pending: &Pending<'c>,
        suffix: &str,
        contents: &'c Value,
    ) -> Result<SchemaRef, CompileError> {
        let draft = pending.draft.detect(contents)?;
        let scope = pending.scope.enter(draft, contents)?;
        let location = if draft.id_of(contents).is_some() {
            scope.base().as_str().to_string()
        } else {
            let mut location = self.nodes[pending.idx].location.clone();
            if !location.contains('#') {
                location.push('#');
            }
            uri::encode_fragment(suffix, &mut location);
            location
        };
        self.intern_parts(contents, scope, draft, location)
    }

    fn children(
        &mut self,
        pending: &Pending<'c>,
        keyword: &str,
        values: &'c [Value],
    ) -> Result<Vec<SchemaRef>, CompileError> {
        values
            .iter()
            .enumerate()
            .map(|(idx, value)| self.child(pending, &format!("/{keyword}/{idx}"), value))
            .collect()
    }

    #[allow(clippy::too_many_lines)]
    fn compile_object(
        &mut self,
        pending: &Pending<'c>,
        schema: &'c Map<String, Value>,
    ) -> Result<SchemaKind, CompileError> {
        let draft = pending.draft;
        let mut obj = ObjectSchema::default();

        // Drafts ≤ 7 ignore every sibling of `$ref`.
        if draft <= Draft::Draft7 {
            if let Some(reference) = schema.get("$ref") {
                let Some(reference) = reference.as_str() else {
                    return Err(self.schema_error(pending, "'$ref' must be a string"));
                };
                obj.reference = Some(self.reference(pending, reference)?);
                return Ok(SchemaKind::Object(Box::new(obj)));
            }
        }

        for (keyword, value) in schema {
            if let Some(extension) = self.extensions.get(keyword.as_str()) {
                if let Err(error) = extension.meta.validate(value) {
                    return Err(CompileError::SchemaNotValid(Box::new(error)));
                }
                let assertion = extension
                    .factory
                    .init(schema, value)
                    .map_err(|error| CompileError::SchemaNotValid(Box::new(error)))?;
                obj.extensions.push(Extension {
                    keyword: keyword.clone(),
                    assertion: Arc::from(assertion),
                });
                continue;
            }
            match keyword.as_str() {
                "$ref" => {
                    let Some(reference) = value.as_str() else {
                        return Err(self.schema_error(pending, "'$ref' must be a string"));
                    };
                    obj.reference = Some(self.reference(pending, reference)?);
                }
                "$recursiveRef" if draft == Draft::Draft201909 => {
                    let target = pending.scope.resolve("#")?;
                    obj.recursive_reference = Some(self.intern(target)?);
                    *self.uses_recursive_refs = true;
                    self.compile_recursive_roots()?;
                }
                "$recursiveAnchor" if draft == Draft::Draft201909 => {
                    obj.recursive_anchor = value.as_bool().unwrap_or(false);
                }
                "$dynamicRef" if draft == Draft::Draft202012 => {
                    let Some(reference) = value.as_str() else {
                        return Err(self.schema_error(pending, "'$dynamicRef' must be a string"));
                    };
                    let target = pending.scope.resolve(reference)?;
                    let is_dynamic = target.is_dynamic_anchor();
                    let lexical = self.intern(target)?;
                    let anchor = if is_dynamic {
                        let (_, fragment) = uri::split(reference);
                        let name = fragment.to_string();
                        self.dynamic_names.insert(name.clone());
                        self.compile_dynamic_anchors(&name)?;
                        Some(name)
                    } else {
                        None
                    };
                    obj.dynamic_reference = Some(DynamicReference { lexical, anchor });
                }
                "$dynamicAnchor" if draft == Draft::Draft202012 => {
                    if let Some(name) = value.as_str() {
                        let key = (self.nodes[pending.idx].base.clone(), name.to_string());
                        if self.dynamic_anchors.insert(key.clone(), pending.idx).is_none() {
                            self.added_dynamic.push(key);
                        }
                    }
                }
                "not" => obj.not = Some(self.child(pending, "/not", value)?),
                "allOf" | "anyOf" | "oneOf" => {
                    let Some(values) = value.as_array() else {
                        return Err(
                            self.schema_error(pending, format!("'{keyword}' must be an array"))
                        );
                    };
                    let compiled = self.children(pending, keyword, values)?;
                    match keyword.as_str() {
                        "allOf" => obj.all_of = Some(compiled),
                        "anyOf" => obj.any_of = Some(compiled),
                        _ => obj.one_of = Some(compiled),
                    }
                }
                "if" if draft >= Draft::Draft7 => {
                    obj.if_ = Some(self.child(pending, "/if", value)?);
                }
                "then" if draft >= Draft::Draft7 => {
                    obj.then = Some(self.child(pending, "/then", value)?);
                }
                "else" if draft >= Draft::Draft7 => {
                    obj.else_ = Some(self.child(pending, "/else", value)?);
                }
                "properties" => {
                    let Some(map) = value.as_object() else {
                        return Err(self.schema_error(pending, "'properties' must be an object"));
                    };
                    let mut properties = Vec::with_capacity(map.len());
                    for (name, subschema) in map {
                        let suffix = format!("/properties/{}", pointer::escape(name));
                        properties.push((name.clone(), self.child(pending, &suffix, subschema)?));
                    }
                    obj.properties = Some(properties);
                }
                "patternProperties" => {
                    let Some(map) = value.as_object() else {
                        return Err(
                            self.schema_error(pending, "'patternProperties' must be an object")
                        );
                    };
                    let mut patterns = Vec::with_capacity(map.len());
                    for (source, subschema) in map {
                        let regex = fancy_regex::Regex::new(source).map_err(|error| {
                            self.schema_error(pending, format!("invalid pattern '{source}': {error}"))
                        })?;
                        let suffix = format!("/patternProperties/{}", pointer::escape(source));
                        patterns.push(PatternProperty {
                            regex,
                            source: source.clone(),
                            schema: self.child(pending, &suffix, subschema)?,
                        });
                    }
                    obj.pattern_properties = Some(patterns);
                }
                "additionalProperties" => {
                    obj.additional_properties =
                        Some(self.child(pending, "/additionalProperties", value)?);
                }
                "propertyNames" if draft >= Draft::Draft6 => {
                    obj.property_names = Some(self.child(pending, "/propertyNames", value)?);
                }
                "required" => {
                    let Some(values) = value.as_array() else {
                        return Err(self.schema_error(pending, "'required' must be an array"));
                    };
                    let mut required = Vec::with_capacity(values.len());
                    for name in values {
                        let Some(name) = name.as_str() else {
                            return Err(self
                                .schema_error(pending, "'required' must contain only strings"));
                        };
                        required.push(name.to_string());
                    }
                    obj.required = Some(required);
                }
                "dependentRequired" if draft >= Draft::Draft201909 => {
                    let Some(map) = value.as_object() else {
                        return Err(
                            self.schema_error(pending, "'dependentRequired' must be an object")
                        );
                    };
                    let mut dependent = Vec::with_capacity(map.len());
                    for (name, values) in map {
                        let names = string_array(values).ok_or_else(|| {
                            self.schema_error(
                                pending,
                                "'dependentRequired' values must be arrays of strings",
                            )
                        })?;
                        dependent.push((name.clone(), names));
                    }
                    obj.dependent_required = Some(dependent);
                }
                "dependentSchemas" if draft >= Draft::Draft201909 => {
                    let Some(map) = value.as_object() else {
                        return Err(
                            self.schema_error(pending, "'dependentSchemas' must be an object")
                        );
                    };
                    let mut dependent = Vec::with_capacity(map.len());
                    for (name, subschema) in map {
                        let suffix = format!("/dependentSchemas/{}", pointer::escape(name));
                        dependent.push((name.clone(), self.child(pending, &suffix, subschema)?));
                    }
                    obj.dependent_schemas = Some(dependent);
                }
                "dependencies" => {
                    let Some(map) = value.as_object() else {
                        return Err(self.schema_error(pending, "'dependencies' must be an object"));
                    };
                    let mut dependencies = Vec::with_capacity(map.len());
                    for (name, dependency) in map {
                        let dependency = if let Some(names) = string_array(dependency) {
                            Dependency::Required(names)
                        } else {
                            let suffix = format!("/dependencies/{}", pointer::escape(name));
                            Dependency::Schema(self.child(pending, &suffix, dependency)?)
                        };
                        dependencies.push((name.clone(), dependency));
                    }
                    obj.dependencies = Some(dependencies);
                }
                "minProperties" => obj.min_properties = limit(value),
                "maxProperties" => obj.max_properties = limit(value),
                "minItems" => obj.min_items = limit(value),
                "maxItems" => obj.max_items = limit(value),
                "minLength" => obj.min_length = limit(value),
                "maxLength" => obj.max_length = limit(value),
                "minContains" if draft >= Draft::Draft201909 => obj.min_contains = limit(value),
                "maxContains" if draft >= Draft::Draft201909 => obj.max_contains = limit(value),
                "uniqueItems" => obj.unique_items = value.as_bool().unwrap_or(false),
                "items" => {
                    obj.items = Some(match value {
                        Value::Array(values) if draft <= Draft::Draft201909 => {
                            Items::Array(self.children(pending, "items", values)?)
                        }
                        _ => Items::Schema(self.child(pending, "/items", value)?),
                    });
                }
                "prefixItems" if draft == Draft::Draft202012 => {
                    let Some(values) = value.as_array() else {
                        return Err(self.schema_error(pending, "'prefixItems' must be an array"));
                    };
                    obj.prefix_items = Some(self.children(pending, "prefixItems", values)?);
                }
                "additionalItems" if draft <= Draft::Draft201909 => {
                    obj.additional_items = Some(self.child(pending, "/additionalItems", value)?);
                }
                "contains" if draft >= Draft::Draft6 => {
                    obj.contains = Some(self.child(pending, "/contains", value)?);
                }
                "unevaluatedItems" if draft >= Draft::Draft201909 => {
                    obj.unevaluated_items = Some(self.child(pending, "/unevaluatedItems", value)?);
                }
                "unevaluatedProperties" if draft >= Draft::Draft201909 => {
                    obj.unevaluated_properties =
                        Some(self.child(pending, "/unevaluatedProperties", value)?);
                }
                "pattern" => {
                    let Some(source) = value.as_str() else {
                        return Err(self.schema_error(pending, "'pattern' must be a string"));
                    };
                    let regex = fancy_regex::Regex::new(source).map_err(|error| {
                        self.schema_error(pending, format!("invalid pattern '{source}': {error}"))
                    })?;
                    obj.pattern = Some(CompiledPattern {
                        regex,
                        source: source.to_string(),
                    });
                }
                "format" => {
                    let Some(name) = value.as_str() else {
                        return Err(self.schema_error(pending, "'format' must be a string"));
                    };
                    if self.options.validates_formats(draft) {
                        if let Some(check) = self.options.format(name) {
                            obj.format = Some(FormatAssertion {
                                name: name.to_string(),
                                check: Arc::clone(check),
                            });
                        } else if let Some(check) = format::builtin(draft, name) {
                            obj.format = Some(FormatAssertion {
                                name: name.to_string(),
                                check: Arc::new(check),
                            });
                        } else if !self.options.ignore_unknown_formats {
                            return Err(
                                self.schema_error(pending, format!("unknown format '{name}'"))
                            );
                        }
                    }
                }
                "contentEncoding" if draft >= Draft::Draft6 && self.options.assert_content => {
                    if let Some(name) = value.as_str() {
                        if let Some((check, decode)) = content::encoding_check(name) {
                            obj.content_encoding = Some(ContentEncodingAssertion {
                                name: name.to_string(),
                                check,
                                decode,
                            });
                        }
                    }
                }
                "contentMediaType" if draft >= Draft::Draft6 && self.options.assert_content => {
                    if let Some(name) = value.as_str() {
                        if let Some(check) = content::media_type_check(name) {
                            obj.content_media_type = Some(ContentMediaTypeAssertion {
                                name: name.to_string(),
                                check,
                            });
                        }
                    }
                }
                "contentSchema" if draft >= Draft::Draft201909 && self.options.assert_content => {
                    obj.content_schema = Some(self.child(pending, "/contentSchema", value)?);
                }
                "multipleOf" => {
                    let Some(number) = value.as_number() else {
                        return Err(self.schema_error(pending, "'multipleOf' must be a number"));
                    };
                    obj.multiple_of = Some(number.clone());
                }
                "minimum" => {
                    let Some(number) = value.as_number() else {
                        return Err(self.schema_error(pending, "'minimum' must be a number"));
                    };
                    // Draft 4 models exclusivity as a boolean modifier
                    if draft == Draft::Draft4
                        && schema.get("exclusiveMinimum").and_then(Value::as_bool) == Some(true)
                    {
                        obj.exclusive_minimum = Some(number.clone());
                    } else {
                        obj.minimum = Some(number.clone());
                    }
                }
                "maximum" => {
                    let Some(number) = value.as_number() else {
                        return Err(self.schema_error(pending, "'maximum' must be a number"));
                    };
                    if draft == Draft::Draft4
                        && schema.get("exclusiveMaximum").and_then(Value::as_bool) == Some(true)
                    {
                        obj.exclusive_maximum = Some(number.clone());
                    } else {
                        obj.maximum = Some(number.clone());
                    }
                }
                "exclusiveMinimum" if draft >= Draft::Draft6 => {
                    let Some(number) = value.as_number() else {
                        return Err(
                            self.schema_error(pending, "'exclusiveMinimum' must be a number")
                        );
                    };
                    obj.exclusive_minimum = Some(number.clone());
                }
                "exclusiveMaximum" if draft >= Draft::Draft6 => {
                    let Some(number) = value.as_number() else {
                        return Err(
                            self.schema_error(pending, "'exclusiveMaximum' must be a number")
                        );
                    };
                    obj.exclusive_maximum = Some(number.clone());
                }
                "const" if draft >= Draft::Draft6 => obj.const_ = Some(value.clone()),
                "enum" => {
                    let Some(values) = value.as_array() else {
                        return Err(self.schema_error(pending, "'enum' must be an array"));
                    };
                    obj.enum_ = Some(values.clone());
                }
                "type" => {
                    obj.types = Some(self.compile_types(pending, value)?);
                }
                // Anything else is an annotation
                _ => {}
            }
        }
        Ok(SchemaKind::Object(Box::new(obj)))
    }

    fn compile_types(
        &self,
        pending: &Pending<'c>,
        value: &Value,
    ) -> Result<PrimitiveTypesBitMap, CompileError> {
        let parse = |value: &Value| {
            value
                .as_str()
                .and_then(|name| name.parse::<PrimitiveType>().ok())
        };
        match value {
            Value::String(_) => parse(value).map(PrimitiveTypesBitMap::from).ok_or_else(|| {
                self.schema_error(pending, format!("unknown type {value}"))
            }),
            Value::Array(values) => {
                let mut types = PrimitiveTypesBitMap::new();
                for value in values {
                    let Some(ty) = parse(value) else {
                        return Err(self.schema_error(pending, format!("unknown type {value}")));
                    };
                    types = types.add_type(ty);
                }
                Ok(types)
            }
            _ => Err(self.schema_error(pending, "'type' must be a string or an array")),
        }
    }

    /// Compile the root of every resource declaring `$recursiveAnchor:
    /// true`, so `$recursiveRef` can re-target through the dynamic scope at
    /// validation time.
    fn compile_recursive_roots(&mut self) -> Result<(), CompileError> {
        if self.compiled_recursive_roots {
            return Ok(());
        }
        self.compiled_recursive_roots = true;
        let resources: &'c ResourceIndex = self.resources;
        for base in resources.recursive_anchor_bases() {
            let target = resources.resolve(base.as_str())?;
            let compiled = self.intern(target)?;
            let key = base.as_str().to_string();
            if self.recursive_roots.insert(key.clone(), compiled).is_none() {
                self.added_recursive.push(key);
            }
        }
        Ok(())
    }

    /// Compile every declaration of the named `$dynamicAnchor` across the
    /// index, building the runtime re-targeting table.
    fn compile_dynamic_anchors(&mut self, name: &str) -> Result<(), CompileError> {
        let resources: &'c ResourceIndex = self.resources;
        for (anchor_base, location) in resources.dynamic_anchor_targets(name)? {
            let target = resources.resolve(location.as_str())?;
            let compiled = self.intern(target)?;
            let key = (anchor_base.as_str().to_string(), name.to_string());
            if self.dynamic_anchors.insert(key.clone(), compiled).is_none() {
                self.added_dynamic.push(key);
            }
        }
        Ok(())
    }
}

fn limit(value: &Value) -> Option<u64> {
    value.as_number().and_then(numeric::to_limit)
}

fn string_array(value: &Value) -> Option<Vec<String>> {
    value.as_array().and_then(|values| {
        values
            .iter()
            .map(|value| value.as_str().map(str::to_string))
            .collect()
    })
}

#[cfg(test)]
mod tests {
    use super::Compiler;
    use crate::CompileError;
    use serde_json::json;

    #[test]
    fn compiles_added_resources() {
        let mut compiler = Compiler::new();
        compiler
            .add_resource("http://example.com/schema", br#"{"type": "integer"}"#)
            .expect("Valid resource");
        let compiled = compiler
            .compile("http://example.com/schema")
            .expect("Valid schema");
        assert!(compiled.is_valid(&json!(1)));
        assert!(!compiled.is_valid(&json!("1")));
    }

    #[test]
    fn compile_is_idempotent() {
        let mut compiler = Compiler::new();
        compiler
            .add_resource_value("http://example.com/schema", json!({"type": "integer"}))
            .expect("Valid resource");
        let first = compiler.compile("http://example.com/schema").expect("Valid schema");
        let second = compiler.compile("http://example.com/schema").expect("Valid schema");
        assert_eq!(first.location(), second.location());
    }

    #[test]
    fn unknown_url_without_loader_support() {
        let mut compiler = Compiler::new();
        let error = compiler
            .compile("urn:example:missing")
            .expect_err("Should fail");
        assert!(matches!(error, CompileError::Resolve(_)));
    }

    #[test]
    fn failed_compile_rolls_back() {
        let mut compiler = Compiler::new();
        compiler
            .add_resource_value(
                "http://example.com/bad",
                json!({"$ref": "#/missing/pointer", "type": "object"}),
            )
            .expect("Registration does not resolve internal references");
        let error = compiler.compile("http://example.com/bad").expect_err("Dangling reference");
        assert!(matches!(error, CompileError::Resolve(_)));

        // The same compiler stays usable and the same URL fails the same way
        compiler
            .add_resource_value("http://example.com/good", json!({"type": "integer"}))
            .expect("Valid resource");
        assert!(compiler.compile("http://example.com/good").is_ok());
        assert!(compiler.compile("http://example.com/bad").is_err());
    }

    #[test]
    fn meta_validation_rejects_invalid_schemas() {
        let mut compiler = Compiler::new();
        compiler
            .add_resource_value(
                "http://example.com/schema",
                json!({"type": "integer", "minimum": "not a number"}),
            )
            .expect("Registration does not meta-validate");
        let error = compiler
            .compile("http://example.com/schema")
            .expect_err("Should be rejected by the meta-schema");
        assert!(matches!(error, CompileError::SchemaNotValid(_)));
    }

    #[test]
    fn duplicate_keys_are_parse_errors() {
        let mut compiler = Compiler::new();
        let error = compiler
            .add_resource("http://example.com/schema", br#"{"type": "integer", "type": "string"}"#)
            .expect_err("Should fail");
        assert!(matches!(error, CompileError::Parse(_)));
    }
}
