//! Per-draft behaviour: `$schema` detection, identifier and anchor
//! keywords, and the subschema position tables.
use serde_json::Value;

mod draft201909;
mod draft202012;
mod draft4;
mod draft6;
mod draft7;
pub(crate) mod subresources;

use crate::error::ResolveError;
use subresources::Position;

/// A revision of the JSON Schema specification.
#[non_exhaustive]
#[derive(Debug, Default, PartialEq, Copy, Clone, Hash, Eq, PartialOrd, Ord)]
pub enum Draft {
    /// JSON Schema Draft 4
    Draft4,
    /// JSON Schema Draft 6
    Draft6,
    /// JSON Schema Draft 7
    Draft7,
    /// JSON Schema Draft 2019-09
    Draft201909,
    /// JSON Schema Draft 2020-12
    #[default]
    Draft202012,
}

/// The drafts a `$schema` URL may declare. Both `http` and `https`
/// spellings are recognised; a trailing `#` is tolerated.
const METASCHEMA_URLS: &[(&str, Draft)] = &[
    ("json-schema.org/draft/2020-12/schema", Draft::Draft202012),
    ("json-schema.org/draft/2019-09/schema", Draft::Draft201909),
    ("json-schema.org/draft-07/schema", Draft::Draft7),
    ("json-schema.org/draft-06/schema", Draft::Draft6),
    ("json-schema.org/draft-04/schema", Draft::Draft4),
];

impl Draft {
    /// The draft declared by a meta-schema URL, if it names one.
    #[must_use]
    pub fn from_metaschema_url(url: &str) -> Option<Draft> {
        let url = url.trim_end_matches('#');
        let host_and_path = url
            .strip_prefix("https://")
            .or_else(|| url.strip_prefix("http://"))?;
        METASCHEMA_URLS
            .iter()
            .find(|(known, _)| *known == host_and_path)
            .map(|(_, draft)| *draft)
    }
    /// The draft in effect for `document`: its `$schema` declaration when
    /// present, `self` otherwise.
    ///
    /// # Errors
    ///
    /// [`ResolveError::UnknownMetaschema`] for a `$schema` that names no
    /// supported draft.
    pub fn detect(self, document: &Value) -> Result<Draft, ResolveError> {
        let Some(declared) = document.get("$schema").and_then(Value::as_str) else {
            return Ok(self);
        };
        Draft::from_metaschema_url(declared).ok_or_else(|| ResolveError::UnknownMetaschema {
            metaschema: declared.trim_end_matches('#').to_string(),
        })
    }
    /// The keyword a schema object declares its base URL with.
    #[must_use]
    pub fn id_keyword(self) -> &'static str {
        if self == Draft::Draft4 {
            "id"
        } else {
            "$id"
        }
    }
    /// The base-declaring identifier of a schema object, if any.
    ///
    /// Before 2019-09 an identifier beside `$ref` is ignored, and a
    /// fragment-only identifier declares an anchor instead of a base.
    #[must_use]
    pub fn id_of(self, node: &Value) -> Option<&str> {
        let object = node.as_object()?;
        let legacy = self <= Draft::Draft7;
        if legacy && object.contains_key("$ref") {
            return None;
        }
        let id = object.get(self.id_keyword())?.as_str()?;
        if legacy && id.starts_with('#') {
            return None;
        }
        Some(id)
    }
    /// The plain-name anchors a schema object declares directly:
    /// `(name, declared via $dynamicAnchor)` pairs.
    pub(crate) fn anchors_of(self, node: &Value) -> Vec<(&str, bool)> {
        let Some(object) = node.as_object() else {
            return Vec::new();
        };
        let mut declared = Vec::new();
        if self >= Draft::Draft201909 {
            if let Some(name) = object.get("$anchor").and_then(Value::as_str) {
                declared.push((name, false));
            }
            if self == Draft::Draft202012 {
                if let Some(name) = object.get("$dynamicAnchor").and_then(Value::as_str) {
                    declared.push((name, true));
                }
            }
        } else if let Some(name) = object
            .get(self.id_keyword())
            .and_then(Value::as_str)
            .and_then(|id| id.strip_prefix('#'))
        {
            // Fragment-only identifiers act as anchors before 2019-09
            declared.push((name, false));
        }
        declared
    }
    /// Whether `true` / `false` are schemas under this draft.
    #[must_use]
    pub fn supports_boolean_schemas(self) -> bool {
        self != Draft::Draft4
    }
    /// Where subschemas nest inside the named keyword, per this draft's
    /// position table.
    pub(crate) fn position(self, keyword: &str) -> Option<Position> {
        match self {
            Draft::Draft4 => draft4::position(keyword),
            Draft::Draft6 => draft6::position(keyword),
            Draft::Draft7 => draft7::position(keyword),
            Draft::Draft201909 => draft201909::position(keyword),
            Draft::Draft202012 => draft202012::position(keyword),
        }
    }
    /// The immediate subschemas nested inside `node`, each with its JSON
    /// Pointer suffix.
    #[must_use]
    pub fn subresources_of(self, node: &Value) -> Vec<(String, &Value)> {
        subresources::children_of(self, node)
    }
}
