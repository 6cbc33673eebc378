//! The resource index: absolute URL → registered resource.
//!
//! Registration is eager: inserting a document surveys it once with the
//! draft's position table, splitting out every `$id` subresource as its
//! own entry, recording anchors into the owning resource's table, and
//! chasing external reference targets through the loader until the
//! reference graph is closed. Embedded meta-schemas back every index, so
//! the loader never sees a `json-schema.org` URL.
use ahash::{AHashMap, AHashSet};
use fluent_uri::Uri;
use serde_json::Value;

use crate::{
    drafts::subresources::children_of,
    error::ResolveError,
    meta,
    resource::{AnchorEntry, Resource},
    scope::{Scope, Target},
    uri, Draft, Loader,
};

/// All resources known to a compiler, keyed by canonical base URL.
#[derive(Debug, Default, Clone)]
pub struct ResourceIndex {
    resources: AHashMap<Uri<String>, Resource>,
    /// Registration URLs that differ from the document's declared base.
    aliases: AHashMap<Uri<String>, Uri<String>>,
}

impl ResourceIndex {
    /// An index holding nothing beyond the embedded meta-schemas.
    #[must_use]
    pub fn new() -> Self {
        ResourceIndex::default()
    }

    /// Register `document` under `url`.
    ///
    /// The draft comes from the document's `$schema`, falling back to
    /// `fallback`. Subresources declaring an identifier become entries of
    /// their own; anchors land in the owning resource's table; references
    /// to unknown URLs are fetched through `loader` until nothing is
    /// missing. Re-inserting a URL replaces the previous entry.
    ///
    /// # Errors
    ///
    /// [`ResolveError::DuplicateId`] / [`ResolveError::DuplicateAnchor`]
    /// for identifiers claimed twice within one resource,
    /// [`ResolveError::Loader`] when a referenced document cannot be
    /// fetched, [`ResolveError::UnknownMetaschema`] for unsupported
    /// `$schema` values.
    pub fn insert(
        &mut self,
        url: &str,
        document: Value,
        fallback: Draft,
        loader: &dyn Loader,
    ) -> Result<(), ResolveError> {
        self.insert_all(vec![(url.to_string(), document)], fallback, loader)
    }

    /// Register several documents as one batch; references between them
    /// are satisfied no matter the insertion order.
    pub(crate) fn insert_all(
        &mut self,
        documents: Vec<(String, Value)>,
        fallback: Draft,
        loader: &dyn Loader,
    ) -> Result<(), ResolveError> {
        let mut queue = Vec::with_capacity(documents.len());
        for (url, document) in documents {
            queue.push((uri::absolute(uri::trim_empty_fragment(&url))?, document));
        }
        let mut missing: Vec<Uri<String>> = Vec::new();
        loop {
            while let Some((url, document)) = queue.pop() {
                self.register(url, document, fallback, &mut missing)?;
            }
            let Some(wanted) = missing.pop() else {
                return Ok(());
            };
            if self.is_known(&wanted) {
                continue;
            }
            let document =
                loader
                    .load(&wanted.borrow())
                    .map_err(|source| ResolveError::Loader {
                        url: wanted.as_str().to_string(),
                        source,
                    })?;
            queue.push((wanted, document));
        }
    }

    /// Register one document together with its `$id` subresources.
    fn register(
        &mut self,
        url: Uri<String>,
        document: Value,
        fallback: Draft,
        missing: &mut Vec<Uri<String>>,
    ) -> Result<(), ResolveError> {
        let draft = fallback.detect(&document)?;
        // The root identifier wins over the registration URL, which then
        // only survives as an alias
        let base = match draft.id_of(&document) {
            Some(id) => uri::resolve(&url.borrow(), uri::trim_empty_fragment(id))?,
            None => url.clone(),
        };
        if base != url {
            self.aliases.insert(url, base.clone());
        }
        let mut parts = vec![(base, document, draft)];
        // Identifiers must be unique within the resource being registered
        let mut claimed: AHashSet<Uri<String>> = AHashSet::new();
        while let Some((base, document, draft)) = parts.pop() {
            if !claimed.insert(base.clone()) {
                return Err(ResolveError::DuplicateId {
                    id: base.as_str().to_string(),
                });
            }
            let anchors = survey(&base, &document, draft, &mut parts, missing)?;
            self.resources
                .insert(base, Resource::new(document, draft, anchors));
        }
        Ok(())
    }

    /// Whether `url` is already registered or embedded.
    #[must_use]
    pub fn contains(&self, url: &Uri<String>) -> bool {
        self.is_known(url)
    }

    /// Resolve `reference` from scratch, with no base in effect.
    ///
    /// # Errors
    ///
    /// See [`Scope::resolve`].
    pub fn resolve(&self, reference: &str) -> Result<Target<'_>, ResolveError> {
        self.scope(uri::ROOT.clone()).resolve(reference)
    }

    /// A resolution scope based at `base`.
    #[must_use]
    pub fn scope(&self, base: Uri<String>) -> Scope<'_> {
        Scope::new(self, base)
    }

    /// Every base whose root schema declares `$recursiveAnchor: true`,
    /// the candidate targets for `$recursiveRef` re-targeting.
    #[must_use]
    pub fn recursive_anchor_bases(&self) -> Vec<Uri<String>> {
        self.entries()
            .filter(|(_, resource)| resource.has_recursive_anchor())
            .map(|(base, _)| base.clone())
            .collect()
    }

    /// Every declaration of the named `$dynamicAnchor`:
    /// `(owning base, canonical location of the declaring node)`.
    ///
    /// # Errors
    ///
    /// [`ResolveError::InvalidUrl`] if a location cannot be composed.
    pub fn dynamic_anchor_targets(
        &self,
        name: &str,
    ) -> Result<Vec<(Uri<String>, Uri<String>)>, ResolveError> {
        let mut targets = Vec::new();
        for (base, resource) in self.entries() {
            let Some(entry) = resource.dynamic_anchor(name) else {
                continue;
            };
            let location = if entry.pointer.is_empty() {
                base.clone()
            } else {
                uri::with_pointer_fragment(base, &entry.pointer)?
            };
            targets.push((base.clone(), location));
        }
        Ok(targets)
    }

    /// The resource registered under `url`, consulting the embedded
    /// meta-schemas as a fallback.
    pub(crate) fn entry(&self, url: &Uri<String>) -> Option<&Resource> {
        self.find_local(url)
            .or_else(|| meta::embedded().find_local(url))
    }

    fn find_local(&self, url: &Uri<String>) -> Option<&Resource> {
        self.resources.get(url).or_else(|| {
            self.aliases
                .get(url)
                .and_then(|canonical| self.resources.get(canonical))
        })
    }

    fn is_known(&self, url: &Uri<String>) -> bool {
        // The embedded documents are checked by URL so that building the
        // embedded index itself never re-enters it.
        self.find_local(url).is_some() || meta::is_embedded_url(url.as_str())
    }

    fn entries(&self) -> impl Iterator<Item = (&Uri<String>, &Resource)> {
        let embedded = meta::embedded();
        let shadowed = std::ptr::eq(self, embedded);
        self.resources.iter().chain(
            embedded
                .resources
                .iter()
                .filter(move |_| !shadowed),
        )
    }
}

/// Walk one document, recording anchors, splitting out `$id` subresources
/// into `parts`, and noting external reference targets in `missing`.
fn survey(
    base: &Uri<String>,
    document: &Value,
    draft: Draft,
    parts: &mut Vec<(Uri<String>, Value, Draft)>,
    missing: &mut Vec<Uri<String>>,
) -> Result<AHashMap<String, AnchorEntry>, ResolveError> {
    let mut anchors: AHashMap<String, AnchorEntry> = AHashMap::new();
    let mut nodes = vec![(String::new(), document)];
    while let Some((pointer, node)) = nodes.pop() {
        if !pointer.is_empty() {
            // A nested identifier starts a resource of its own; it is
            // surveyed under its own base.
            let nested_draft = draft.detect(node)?;
            if let Some(id) = nested_draft.id_of(node) {
                let at = uri::resolve(&base.borrow(), uri::trim_empty_fragment(id))?;
                parts.push((at, node.clone(), nested_draft));
                continue;
            }
        }
        for (name, dynamic) in draft.anchors_of(node) {
            if anchors
                .insert(
                    name.to_string(),
                    AnchorEntry {
                        pointer: pointer.clone(),
                        dynamic,
                    },
                )
                .is_some()
            {
                return Err(ResolveError::DuplicateAnchor {
                    name: name.to_string(),
                    owner: base.as_str().to_string(),
                });
            }
        }
        for keyword in ["$ref", "$dynamicRef"] {
            let Some(reference) = node.get(keyword).and_then(Value::as_str) else {
                continue;
            };
            let (url_part, _) = uri::split(reference);
            if url_part.is_empty() {
                continue;
            }
            // Targets that do not resolve here surface with full context
            // when the reference is compiled.
            if let Ok(target) = uri::resolve(&base.borrow(), url_part) {
                missing.push(target);
            }
        }
        for (suffix, child) in children_of(draft, node) {
            let mut at = pointer.clone();
            at.push_str(&suffix);
            nodes.push((at, child));
        }
    }
    Ok(anchors)
}

#[cfg(test)]
mod tests {
    use super::ResourceIndex;
    use crate::{loader::NoLoader, uri, Draft, Loader, ResolveError};
    use ahash::AHashMap;
    use fluent_uri::Uri;
    use serde_json::{json, Value};

    struct FixedLoader {
        documents: AHashMap<String, Value>,
    }

    impl FixedLoader {
        fn new(documents: &[(&str, Value)]) -> Self {
            FixedLoader {
                documents: documents
                    .iter()
                    .map(|(url, document)| ((*url).to_string(), document.clone()))
                    .collect(),
            }
        }
    }

    impl Loader for FixedLoader {
        fn load(
            &self,
            url: &Uri<&str>,
        ) -> Result<Value, Box<dyn std::error::Error + Send + Sync>> {
            self.documents
                .get(url.as_str())
                .cloned()
                .ok_or_else(|| format!("nothing at {url}").into())
        }
    }

    fn url(input: &str) -> Uri<String> {
        uri::absolute(input).expect("A valid URL")
    }

    #[test]
    fn registers_documents_and_their_subresources() {
        let mut index = ResourceIndex::new();
        index
            .insert(
                "https://example.com/root",
                json!({
                    "$defs": {
                        "inner": {"$id": "inner", "type": "integer"}
                    }
                }),
                Draft::Draft202012,
                &NoLoader,
            )
            .expect("Registrable");
        assert!(index.contains(&url("https://example.com/root")));
        assert!(index.contains(&url("https://example.com/inner")));
        let inner = index
            .entry(&url("https://example.com/inner"))
            .expect("Registered");
        assert_eq!(inner.contents(), &json!({"$id": "inner", "type": "integer"}));
    }

    #[test]
    fn a_root_identifier_becomes_an_alias() {
        let mut index = ResourceIndex::new();
        index
            .insert(
                "https://example.com/added-here",
                json!({"$id": "https://example.com/true-name", "type": "null"}),
                Draft::Draft202012,
                &NoLoader,
            )
            .expect("Registrable");
        for spelling in ["https://example.com/added-here", "https://example.com/true-name"] {
            assert!(index.contains(&url(spelling)), "{spelling} should be known");
        }
    }

    #[test]
    fn referenced_documents_are_fetched_until_closed() {
        let loader = FixedLoader::new(&[
            (
                "https://example.com/second",
                json!({"$ref": "https://example.com/third"}),
            ),
            ("https://example.com/third", json!({"type": "string"})),
        ]);
        let mut index = ResourceIndex::new();
        index
            .insert(
                "https://example.com/first",
                json!({"properties": {"x": {"$ref": "second"}}}),
                Draft::Draft202012,
                &loader,
            )
            .expect("Registrable");
        for part in ["first", "second", "third"] {
            let at = format!("https://example.com/{part}");
            assert!(index.contains(&url(&at)), "{at} should be known");
        }
    }

    #[test]
    fn a_missing_referenced_document_fails_registration() {
        let mut index = ResourceIndex::new();
        let error = index
            .insert(
                "https://example.com/first",
                json!({"$ref": "https://example.com/second"}),
                Draft::Draft202012,
                &NoLoader,
            )
            .expect_err("The target is unavailable");
        assert!(matches!(error, ResolveError::Loader { .. }));
        assert!(error
            .to_string()
            .starts_with("failed to load 'https://example.com/second'"));
    }

    #[test]
    fn reinsertion_replaces_the_resource() {
        let mut index = ResourceIndex::new();
        for version in [json!({"type": "integer"}), json!({"type": "string"})] {
            index
                .insert("https://example.com/s", version, Draft::Draft202012, &NoLoader)
                .expect("Registrable");
        }
        let resource = index.entry(&url("https://example.com/s")).expect("Registered");
        assert_eq!(resource.contents(), &json!({"type": "string"}));
    }

    #[test]
    fn duplicate_anchors_within_one_resource_are_rejected() {
        let mut index = ResourceIndex::new();
        let error = index
            .insert(
                "https://example.com/s",
                json!({
                    "$defs": {
                        "a": {"$anchor": "same"},
                        "b": {"$anchor": "same"}
                    }
                }),
                Draft::Draft202012,
                &NoLoader,
            )
            .expect_err("The anchor is claimed twice");
        assert_eq!(
            error.to_string(),
            "the anchor 'same' is declared more than once in 'https://example.com/s'"
        );
    }

    #[test]
    fn duplicate_identifiers_within_one_resource_are_rejected() {
        let mut index = ResourceIndex::new();
        let error = index
            .insert(
                "https://example.com/root",
                json!({
                    "$defs": {
                        "a": {"$id": "twice"},
                        "b": {"$id": "twice"}
                    }
                }),
                Draft::Draft202012,
                &NoLoader,
            )
            .expect_err("The identifier is claimed twice");
        assert_eq!(
            error.to_string(),
            "the identifier 'https://example.com/twice' is declared more than once"
        );
    }

    #[test]
    fn embedded_metaschemas_are_always_known() {
        let index = ResourceIndex::new();
        assert!(index.contains(&url("https://json-schema.org/draft/2020-12/schema")));
        assert!(index.contains(&url("http://json-schema.org/draft-07/schema")));
        let resolved = index
            .resolve("http://json-schema.org/draft-06/schema#/definitions/schemaArray")
            .expect("Embedded");
        assert_eq!(
            resolved.node(),
            &json!({
                "type": "array",
                "minItems": 1,
                "items": { "$ref": "#" }
            })
        );
    }

    #[test]
    fn recursive_anchor_bases_cover_registered_resources() {
        let mut index = ResourceIndex::new();
        index
            .insert(
                "https://example.com/tree",
                json!({
                    "$schema": "https://json-schema.org/draft/2019-09/schema",
                    "$recursiveAnchor": true,
                    "type": "object"
                }),
                Draft::Draft201909,
                &NoLoader,
            )
            .expect("Registrable");
        let bases = index.recursive_anchor_bases();
        assert!(bases
            .iter()
            .any(|base| base.as_str() == "https://example.com/tree"));
    }

    #[test]
    fn dynamic_anchor_targets_report_canonical_locations() {
        let mut index = ResourceIndex::new();
        index
            .insert(
                "https://example.com/list",
                json!({
                    "$defs": {
                        "items": {"$dynamicAnchor": "items", "type": "number"}
                    }
                }),
                Draft::Draft202012,
                &NoLoader,
            )
            .expect("Registrable");
        let targets = index.dynamic_anchor_targets("items").expect("Composable");
        assert_eq!(targets.len(), 1);
        assert_eq!(targets[0].0.as_str(), "https://example.com/list");
        assert_eq!(
            targets[0].1.as_str(),
            "https://example.com/list#/$defs/items"
        );
        assert!(index
            .dynamic_anchor_targets("absent")
            .expect("Composable")
            .is_empty());
    }
}
