//! The embedded meta-schemas.
//!
//! Every supported draft's meta-schema family ships inside the binary,
//! keyed by canonical URL, and backs every [`ResourceIndex`] as a
//! read-only fallback. Loaders never see requests for these URLs.
use once_cell::sync::Lazy;

use crate::{loader::NoLoader, Draft, ResourceIndex};

/// Canonical URL and document text of every embedded meta-schema.
const DOCUMENTS: &[(&str, &[u8])] = &[
    (
        "http://json-schema.org/draft-04/schema",
        include_bytes!("../metaschemas/draft4.json"),
    ),
    (
        "http://json-schema.org/draft-06/schema",
        include_bytes!("../metaschemas/draft6.json"),
    ),
    (
        "http://json-schema.org/draft-07/schema",
        include_bytes!("../metaschemas/draft7.json"),
    ),
    (
        "https://json-schema.org/draft/2019-09/schema",
        include_bytes!("../metaschemas/draft2019-09/schema.json"),
    ),
    (
        "https://json-schema.org/draft/2019-09/meta/core",
        include_bytes!("../metaschemas/draft2019-09/meta/core.json"),
    ),
    (
        "https://json-schema.org/draft/2019-09/meta/applicator",
        include_bytes!("../metaschemas/draft2019-09/meta/applicator.json"),
    ),
    (
        "https://json-schema.org/draft/2019-09/meta/validation",
        include_bytes!("../metaschemas/draft2019-09/meta/validation.json"),
    ),
    (
        "https://json-schema.org/draft/2019-09/meta/meta-data",
        include_bytes!("../metaschemas/draft2019-09/meta/meta-data.json"),
    ),
    (
        "https://json-schema.org/draft/2019-09/meta/format",
        include_bytes!("../metaschemas/draft2019-09/meta/format.json"),
    ),
    (
        "https://json-schema.org/draft/2019-09/meta/content",
        include_bytes!("../metaschemas/draft2019-09/meta/content.json"),
    ),
    (
        "https://json-schema.org/draft/2020-12/schema",
        include_bytes!("../metaschemas/draft2020-12/schema.json"),
    ),
    (
        "https://json-schema.org/draft/2020-12/meta/core",
        include_bytes!("../metaschemas/draft2020-12/meta/core.json"),
    ),
    (
        "https://json-schema.org/draft/2020-12/meta/applicator",
        include_bytes!("../metaschemas/draft2020-12/meta/applicator.json"),
    ),
    (
        "https://json-schema.org/draft/2020-12/meta/unevaluated",
        include_bytes!("../metaschemas/draft2020-12/meta/unevaluated.json"),
    ),
    (
        "https://json-schema.org/draft/2020-12/meta/validation",
        include_bytes!("../metaschemas/draft2020-12/meta/validation.json"),
    ),
    (
        "https://json-schema.org/draft/2020-12/meta/meta-data",
        include_bytes!("../metaschemas/draft2020-12/meta/meta-data.json"),
    ),
    (
        "https://json-schema.org/draft/2020-12/meta/format-annotation",
        include_bytes!("../metaschemas/draft2020-12/meta/format-annotation.json"),
    ),
    (
        "https://json-schema.org/draft/2020-12/meta/content",
        include_bytes!("../metaschemas/draft2020-12/meta/content.json"),
    ),
];

/// The canonical URL of the root meta-schema for `draft`.
#[must_use]
pub fn metaschema_url(draft: Draft) -> &'static str {
    match draft {
        Draft::Draft4 => "http://json-schema.org/draft-04/schema",
        Draft::Draft6 => "http://json-schema.org/draft-06/schema",
        Draft::Draft7 => "http://json-schema.org/draft-07/schema",
        Draft::Draft201909 => "https://json-schema.org/draft/2019-09/schema",
        Draft::Draft202012 => "https://json-schema.org/draft/2020-12/schema",
    }
}

/// Whether `url` belongs to the embedded family. Checked against the URL
/// list alone so that building the embedded index never re-enters itself.
pub(crate) fn is_embedded_url(url: &str) -> bool {
    let url = url.trim_end_matches('#');
    DOCUMENTS.iter().any(|(known, _)| *known == url)
}

/// The index of embedded meta-schema resources, built on first use.
pub(crate) fn embedded() -> &'static ResourceIndex {
    static EMBEDDED: Lazy<ResourceIndex> = Lazy::new(|| {
        let documents = DOCUMENTS
            .iter()
            .map(|(url, bytes)| {
                (
                    (*url).to_string(),
                    serde_json::from_slice(bytes).expect("Embedded meta-schemas are valid JSON"),
                )
            })
            .collect();
        let mut index = ResourceIndex::new();
        // The family is self-contained; registering it as one batch
        // satisfies every cross-reference without any loading.
        index
            .insert_all(documents, Draft::default(), &NoLoader)
            .expect("Embedded meta-schemas are well-formed");
        index
    });
    &EMBEDDED
}

#[cfg(test)]
mod tests {
    use super::{embedded, is_embedded_url, metaschema_url};
    use crate::{Draft, ResourceIndex};

    #[test]
    fn every_draft_has_an_embedded_root() {
        let index = ResourceIndex::new();
        for draft in [
            Draft::Draft4,
            Draft::Draft6,
            Draft::Draft7,
            Draft::Draft201909,
            Draft::Draft202012,
        ] {
            let url = metaschema_url(draft);
            let target = index.resolve(url).expect("Embedded");
            assert!(target.node().is_object(), "{url} should be an object");
            assert_eq!(
                target.draft(),
                draft,
                "{url} should declare its own draft"
            );
        }
    }

    #[test]
    fn vocabulary_parts_resolve() {
        let index = ResourceIndex::new();
        for reference in [
            "https://json-schema.org/draft/2019-09/meta/core",
            "https://json-schema.org/draft/2020-12/meta/unevaluated",
            "https://json-schema.org/draft/2020-12/meta/core#/$defs/anchorString",
            "https://json-schema.org/draft/2020-12/schema#meta",
        ] {
            assert!(index.resolve(reference).is_ok(), "{reference} should resolve");
        }
    }

    #[test]
    fn the_url_list_matches_the_index() {
        assert!(is_embedded_url("https://json-schema.org/draft/2020-12/schema"));
        assert!(is_embedded_url("http://json-schema.org/draft-04/schema#"));
        assert!(!is_embedded_url("https://example.com/schema"));
        assert!(embedded().contains(
            &crate::uri::absolute("https://json-schema.org/draft/2019-09/meta/format")
                .expect("A valid URL")
        ));
    }
}
