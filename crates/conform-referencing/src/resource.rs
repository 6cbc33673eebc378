//! Resources: schema documents with a concrete draft and an anchor table.
use ahash::AHashMap;
use serde_json::Value;

use crate::Draft;

/// A registered schema document.
///
/// Each resource owns its anchor table: every plain-name fragment declared
/// anywhere inside it, mapped to the canonical JSON Pointer of the
/// declaring node. `$id` subresources are split out into their own
/// [`Resource`] entries during registration and do not appear here.
#[derive(Debug, Clone)]
pub struct Resource {
    document: Value,
    draft: Draft,
    anchors: AHashMap<String, AnchorEntry>,
}

/// One plain-name fragment within a resource.
#[derive(Debug, Clone)]
pub(crate) struct AnchorEntry {
    /// Canonical pointer of the declaring node; empty for the root.
    pub(crate) pointer: String,
    /// Declared via `$dynamicAnchor`.
    pub(crate) dynamic: bool,
}

impl Resource {
    pub(crate) fn new(document: Value, draft: Draft, anchors: AHashMap<String, AnchorEntry>) -> Self {
        Resource {
            document,
            draft,
            anchors,
        }
    }
    /// The document itself.
    #[must_use]
    pub fn contents(&self) -> &Value {
        &self.document
    }
    /// The draft this document is interpreted under.
    #[must_use]
    pub fn draft(&self) -> Draft {
        self.draft
    }
    pub(crate) fn anchor(&self, name: &str) -> Option<&AnchorEntry> {
        self.anchors.get(name)
    }
    pub(crate) fn dynamic_anchor(&self, name: &str) -> Option<&AnchorEntry> {
        self.anchors.get(name).filter(|entry| entry.dynamic)
    }
    /// Whether the root schema opts into 2019-09 recursive extension.
    pub(crate) fn has_recursive_anchor(&self) -> bool {
        self.document
            .get("$recursiveAnchor")
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }
}
