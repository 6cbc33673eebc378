//! Reference resolution against a base URL.
//!
//! Resolution follows the three-step interpretation of a reference: split
//! off the fragment, resolve the URL part against the base in effect, then
//! read the fragment as a JSON Pointer (empty or starting with `/`) or as
//! a plain-name anchor. Pointer walks run a small state machine over the
//! draft's position table so that `$id` declarations encountered inside
//! schema positions re-base everything below them.
use fluent_uri::Uri;
use serde_json::Value;

use crate::{
    drafts::subresources::Position,
    error::{ReferenceFailure, ResolveError},
    pointer,
    resource::Resource,
    uri, Draft, ResourceIndex,
};

/// The base URL in effect while resolving references.
#[derive(Debug, Clone)]
pub struct Scope<'i> {
    index: &'i ResourceIndex,
    base: Uri<String>,
}

impl<'i> Scope<'i> {
    pub(crate) fn new(index: &'i ResourceIndex, base: Uri<String>) -> Self {
        Scope { index, base }
    }
    /// The base URL references resolve against.
    #[must_use]
    pub fn base(&self) -> &Uri<String> {
        &self.base
    }
    /// The scope for a subschema of the current one: re-based when `node`
    /// declares an identifier, unchanged otherwise.
    ///
    /// # Errors
    ///
    /// [`ResolveError::InvalidUrl`] when the identifier cannot be resolved
    /// against the current base.
    pub fn enter(&self, draft: Draft, node: &Value) -> Result<Scope<'i>, ResolveError> {
        let base = match draft.id_of(node) {
            Some(id) => uri::resolve(&self.base.borrow(), uri::trim_empty_fragment(id))?,
            None => self.base.clone(),
        };
        Ok(Scope {
            index: self.index,
            base,
        })
    }
    /// Resolve `reference` to the document node it points at.
    ///
    /// # Errors
    ///
    /// [`ResolveError::NotLoaded`] when the owning resource is absent,
    /// [`ResolveError::InvalidReference`] for fragments that miss.
    pub fn resolve(&self, reference: &str) -> Result<Target<'i>, ResolveError> {
        let (url_part, fragment) = uri::split(reference);
        let url = if url_part.is_empty() {
            self.base.clone()
        } else {
            uri::resolve(&self.base.borrow(), url_part)?
        };
        let resource = self
            .index
            .entry(&url)
            .ok_or_else(|| ResolveError::NotLoaded {
                url: url.as_str().to_string(),
            })?;
        // A root identifier re-bases everything within the resource
        let base = match resource.draft().id_of(resource.contents()) {
            Some(id) => uri::resolve(&url.borrow(), uri::trim_empty_fragment(id))?,
            None => url,
        };

        let fragment = percent_encoding::percent_decode_str(fragment)
            .decode_utf8()
            .map_err(|source| {
                ResolveError::invalid_reference(reference, ReferenceFailure::Encoding { source })
            })?;

        if fragment.is_empty() {
            return Ok(Target {
                node: resource.contents(),
                draft: resource.draft(),
                location: base.clone(),
                scope: Scope::new(self.index, base),
                dynamic: false,
            });
        }
        if let Some(tokens) = fragment.strip_prefix('/') {
            return walk(self.index, base, resource, tokens, reference);
        }

        // A plain-name anchor, rewritten to its canonical pointer
        let Some(entry) = resource.anchor(&fragment) else {
            let name = fragment.into_owned();
            let reason = if name.contains('/') {
                ReferenceFailure::MalformedAnchor { name }
            } else {
                ReferenceFailure::MissingAnchor { name }
            };
            return Err(ResolveError::invalid_reference(reference, reason));
        };
        let dynamic = entry.dynamic;
        let mut target = if entry.pointer.is_empty() {
            Target {
                node: resource.contents(),
                draft: resource.draft(),
                location: base.clone(),
                scope: Scope::new(self.index, base),
                dynamic: false,
            }
        } else {
            let tokens = entry.pointer.strip_prefix('/').unwrap_or(&entry.pointer);
            walk(self.index, base, resource, tokens, reference)?
        };
        target.dynamic = dynamic;
        Ok(target)
    }
}

/// A resolved reference: the node, its draft, the canonical location, and
/// a scope based at the node for further resolution.
#[derive(Debug)]
pub struct Target<'i> {
    node: &'i Value,
    scope: Scope<'i>,
    draft: Draft,
    location: Uri<String>,
    dynamic: bool,
}

impl<'i> Target<'i> {
    /// The document node the reference points at.
    #[must_use]
    pub fn node(&self) -> &'i Value {
        self.node
    }
    /// A scope based at the node.
    #[must_use]
    pub fn scope(&self) -> &Scope<'i> {
        &self.scope
    }
    /// The draft the node is interpreted under.
    #[must_use]
    pub fn draft(&self) -> Draft {
        self.draft
    }
    /// Canonical location: the owning base plus a JSON Pointer fragment,
    /// or the node's own identifier. Plain-name fragments never appear.
    #[must_use]
    pub fn location(&self) -> &Uri<String> {
        &self.location
    }
    /// Whether the fragment named a `$dynamicAnchor`.
    #[must_use]
    pub fn is_dynamic_anchor(&self) -> bool {
        self.dynamic
    }
}

/// What the walk expects the next token to select.
#[derive(Clone, Copy)]
enum Step {
    /// Inside a schema object; tokens are keyword names.
    Schema,
    /// Inside a keyword whose members are schemas; the next token picks one.
    Member,
    /// Below a non-schema position; plain navigation with no re-basing.
    Raw,
}

/// Walk decoded pointer `tokens` (without the leading `/`) from the root
/// of `resource`.
fn walk<'i>(
    index: &'i ResourceIndex,
    mut base: Uri<String>,
    resource: &'i Resource,
    tokens: &str,
    reference: &str,
) -> Result<Target<'i>, ResolveError> {
    let mut node = resource.contents();
    let mut draft = resource.draft();
    // Canonical pointer accumulated since the last re-basing
    let mut trail = String::new();
    let mut step = Step::Schema;
    for token in tokens.split('/') {
        let key = pointer::unescape(token);
        let next = match node {
            Value::Object(object) => object.get(key.as_ref()),
            Value::Array(items) => {
                let position: usize = key.parse().map_err(|source| {
                    ResolveError::invalid_reference(
                        reference,
                        ReferenceFailure::BadIndex {
                            token: key.clone().into_owned(),
                            source,
                        },
                    )
                })?;
                items.get(position)
            }
            _ => None,
        };
        let Some(next) = next else {
            return Err(ResolveError::invalid_reference(
                reference,
                ReferenceFailure::Nowhere,
            ));
        };
        node = next;
        trail.push('/');
        trail.push_str(&pointer::escape(&key));

        step = match step {
            Step::Raw => Step::Raw,
            Step::Member => {
                rebase(index, &mut base, &mut draft, node, &mut trail)?;
                Step::Schema
            }
            Step::Schema => match draft.position(key.as_ref()) {
                Some(Position::Schema) => {
                    rebase(index, &mut base, &mut draft, node, &mut trail)?;
                    Step::Schema
                }
                Some(Position::SchemaOrArray) => {
                    if node.is_array() {
                        Step::Member
                    } else {
                        rebase(index, &mut base, &mut draft, node, &mut trail)?;
                        Step::Schema
                    }
                }
                Some(
                    Position::SchemaMap | Position::SchemaArray | Position::DependencyMap,
                ) => Step::Member,
                None => Step::Raw,
            },
        };
    }
    let location = if trail.is_empty() {
        base.clone()
    } else {
        uri::with_pointer_fragment(&base, &trail)?
    };
    Ok(Target {
        node,
        draft,
        location,
        scope: Scope::new(index, base),
        dynamic: false,
    })
}

/// If the schema node declares an identifier, everything below it belongs
/// to that subresource: switch the base, the draft and restart the trail.
fn rebase(
    index: &ResourceIndex,
    base: &mut Uri<String>,
    draft: &mut Draft,
    node: &Value,
    trail: &mut String,
) -> Result<(), ResolveError> {
    let declared = draft.detect(node)?;
    if let Some(id) = declared.id_of(node) {
        *base = uri::resolve(&base.borrow(), uri::trim_empty_fragment(id))?;
        *draft = index.entry(base).map_or(declared, Resource::draft);
        trail.clear();
    }
    Ok(())
}
