//! URL splitting, resolution and canonicalisation.
//!
//! Every registered resource ends up under an absolute URL; inputs without
//! a scheme are grounded under the private `json-schema:///` root so that
//! standalone documents still get usable bases.
use fluent_uri::{Uri, UriRef};
use once_cell::sync::Lazy;

use crate::error::{ResolveError, UrlError};

pub(crate) static ROOT: Lazy<Uri<String>> =
    Lazy::new(|| Uri::parse("json-schema:///".to_string()).expect("A valid URL"));

/// Split a reference at the first `#` into URL and fragment parts.
///
/// The fragment comes back without its leading `#`; a missing fragment is
/// the empty string.
#[must_use]
pub fn split(reference: &str) -> (&str, &str) {
    reference
        .split_once('#')
        .unwrap_or((reference, ""))
}

/// Drop a trailing `#` or `#/` so equivalent spellings of a URL share one
/// index entry.
#[must_use]
pub fn trim_empty_fragment(url: &str) -> &str {
    url.trim_end_matches("#/").trim_end_matches('#')
}

/// Turn `input` into an absolute, normalized URL.
///
/// Schemeless inputs resolve against the `json-schema:///` root.
///
/// # Errors
///
/// [`ResolveError::InvalidUrl`] when `input` is not an RFC 3986 URI
/// reference.
pub fn absolute(input: &str) -> Result<Uri<String>, ResolveError> {
    let reference = UriRef::parse(input).map_err(|source| ResolveError::InvalidUrl {
        input: input.to_string(),
        source: UrlError::Parse(source),
    })?;
    // Per RFC 3986 §5.3, resolving an already-absolute reference yields
    // the reference itself, so one resolution step covers both cases.
    reference
        .resolve_against(&ROOT.borrow())
        .map(|url| url.normalize())
        .map_err(|source| ResolveError::InvalidUrl {
            input: input.to_string(),
            source: UrlError::Resolve(source),
        })
}

/// RFC 3986 reference resolution of `reference` against `base`.
///
/// # Errors
///
/// [`ResolveError::InvalidUrl`] when the reference does not parse or
/// cannot be resolved against the base.
pub fn resolve(base: &Uri<&str>, reference: &str) -> Result<Uri<String>, ResolveError> {
    let parsed = UriRef::parse(reference).map_err(|source| ResolveError::InvalidUrl {
        input: reference.to_string(),
        source: UrlError::Parse(source),
    })?;
    parsed
        .resolve_against(base)
        .map(|url| url.normalize())
        .map_err(|source| ResolveError::InvalidUrl {
            input: reference.to_string(),
            source: UrlError::Resolve(source),
        })
}

/// Characters that must be percent-escaped inside a URL fragment.
const FRAGMENT: &percent_encoding::AsciiSet = &percent_encoding::CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'<')
    .add(b'>')
    .add(b'`')
    .add(b'#')
    .add(b'%')
    .add(b'{')
    .add(b'}')
    .add(b'|')
    .add(b'\\')
    .add(b'^')
    .add(b'[')
    .add(b']');

/// Percent-escape `input` for use inside a URL fragment, appending to
/// `buffer`.
pub fn encode_fragment(input: &str, buffer: &mut String) {
    for piece in percent_encoding::utf8_percent_encode(input, FRAGMENT) {
        buffer.push_str(piece);
    }
}

/// Attach a JSON Pointer fragment to `base`.
///
/// # Errors
///
/// [`ResolveError::InvalidUrl`] when the combination is not a valid URL.
pub fn with_pointer_fragment(base: &Uri<String>, pointer: &str) -> Result<Uri<String>, ResolveError> {
    let mut combined = String::with_capacity(base.as_str().len() + pointer.len() + 1);
    combined.push_str(split(base.as_str()).0);
    combined.push('#');
    encode_fragment(pointer, &mut combined);
    Uri::parse(combined).map_err(|source| ResolveError::InvalidUrl {
        input: format!("{base}#{pointer}"),
        source: UrlError::Parse(source.strip_input()),
    })
}

#[cfg(test)]
mod tests {
    use super::{absolute, resolve, split, trim_empty_fragment, with_pointer_fragment};
    use test_case::test_case;

    #[test_case("http://example.com/a/b", "c", "http://example.com/a/c"; "relative sibling")]
    #[test_case("http://example.com/a/b", "/c", "http://example.com/c"; "absolute path reference")]
    #[test_case("http://example.com/a/b", "../c", "http://example.com/c"; "parent relative reference")]
    #[test_case("http://example.com/a/", "c/d", "http://example.com/a/c/d"; "nested relative reference")]
    #[test_case("http://example.com/a", "http://other.org/x", "http://other.org/x"; "absolute reference overrides base")]
    fn reference_resolution(base: &str, reference: &str, expected: &str) {
        let base = absolute(base).expect("A valid base");
        let resolved = resolve(&base.borrow(), reference).expect("Resolvable");
        assert_eq!(resolved.as_str(), expected);
    }

    #[test]
    fn empty_fragment_reference_returns_the_base() {
        let base = absolute("http://example.com/schema").expect("A valid base");
        let resolved = resolve(&base.borrow(), "#").expect("Resolvable");
        assert_eq!(split(resolved.as_str()).0, "http://example.com/schema");
        assert_eq!(resolved.fragment().map(|f| f.as_str()), Some(""));
    }

    #[test]
    fn schemeless_input_is_grounded() {
        let url = absolute("folder/schema.json").expect("A valid URL");
        assert_eq!(url.as_str(), "json-schema:///folder/schema.json");
    }

    #[test]
    fn malformed_input_is_rejected() {
        assert!(absolute(":/example.com").is_err());
    }

    #[test_case("http://x/s#", "http://x/s"; "empty fragment marker")]
    #[test_case("http://x/s#/", "http://x/s"; "empty pointer fragment")]
    #[test_case("http://x/s#/a", "http://x/s#/a"; "non empty pointer fragment")]
    #[test_case("http://x/s", "http://x/s"; "no fragment at all")]
    fn empty_fragments_are_trimmed(input: &str, expected: &str) {
        assert_eq!(trim_empty_fragment(input), expected);
    }

    #[test]
    fn pointer_fragments_are_escaped() {
        let base = absolute("http://example.com/s").expect("A valid base");
        let url = with_pointer_fragment(&base, "/a b/c").expect("A valid URL");
        assert_eq!(url.as_str(), "http://example.com/s#/a%20b/c");
    }
}
