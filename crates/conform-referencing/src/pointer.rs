//! JSON Pointer token escaping.
//!
//! Tokens escape `~` as `~0` and `/` as `~1`; everything else passes
//! through untouched. Both directions borrow the input when no escape is
//! present.
use std::borrow::Cow;

/// Escape a token for embedding in a pointer.
#[must_use]
pub fn escape(token: &str) -> Cow<'_, str> {
    if !token.contains(['~', '/']) {
        return Cow::Borrowed(token);
    }
    let mut escaped = String::with_capacity(token.len() + 2);
    for ch in token.chars() {
        match ch {
            '~' => escaped.push_str("~0"),
            '/' => escaped.push_str("~1"),
            _ => escaped.push(ch),
        }
    }
    Cow::Owned(escaped)
}

/// Undo pointer escaping in a token.
///
/// A `~` followed by anything other than `0` or `1` (or by nothing) is not
/// a defined escape; it is kept as-is rather than rejected, matching how
/// lone tildes behave in practice.
#[must_use]
pub fn unescape(token: &str) -> Cow<'_, str> {
    if !token.contains('~') {
        return Cow::Borrowed(token);
    }
    let mut unescaped = String::with_capacity(token.len());
    let mut chars = token.chars();
    while let Some(ch) = chars.next() {
        if ch != '~' {
            unescaped.push(ch);
            continue;
        }
        match chars.next() {
            Some('0') => unescaped.push('~'),
            Some('1') => unescaped.push('/'),
            Some(other) => {
                unescaped.push('~');
                unescaped.push(other);
            }
            None => unescaped.push('~'),
        }
    }
    Cow::Owned(unescaped)
}

#[cfg(test)]
mod tests {
    use super::{escape, unescape};
    use test_case::test_case;

    #[test_case("plain", "plain")]
    #[test_case("a/b", "a~1b")]
    #[test_case("a~b", "a~0b")]
    #[test_case("~/", "~0~1")]
    #[test_case("", "")]
    fn escaping(token: &str, expected: &str) {
        assert_eq!(escape(token), expected);
        assert_eq!(unescape(expected), token);
    }

    #[test_case("~01", "~1"; "escaped tilde then digit")]
    #[test_case("~10", "/0"; "escaped slash then digit")]
    #[test_case("~2", "~2"; "undefined escape is preserved")]
    #[test_case("~", "~"; "trailing tilde")]
    #[test_case("caf~0é", "caf~é")]
    fn unescaping(token: &str, expected: &str) {
        assert_eq!(unescape(token), expected);
    }

    #[test_case("nested/path~with/all"; "nested path with escapes")]
    #[test_case("~~~"; "only tildes")]
    #[test_case("///"; "only slashes")]
    fn round_trip(token: &str) {
        assert_eq!(unescape(&escape(token)), token);
    }
}
