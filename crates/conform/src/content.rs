//! Checks for `contentEncoding` / `contentMediaType` / `contentSchema`.
//!
//! These only assert when the compiler is configured to do so; otherwise
//! the keywords stay annotations, as the drafts specify.
use base64::{engine::general_purpose::STANDARD, Engine};
use serde_json::Value;

pub(crate) type ContentEncodingCheck = fn(&str) -> bool;
pub(crate) type ContentEncodingDecode = fn(&str) -> Option<Vec<u8>>;
pub(crate) type ContentMediaTypeCheck = fn(&[u8]) -> bool;

fn is_base64(value: &str) -> bool {
    STANDARD.decode(value).is_ok()
}

fn from_base64(value: &str) -> Option<Vec<u8>> {
    STANDARD.decode(value).ok()
}

fn is_json(value: &[u8]) -> bool {
    serde_json::from_slice::<Value>(value).is_ok()
}

pub(crate) fn encoding_check(encoding: &str) -> Option<(ContentEncodingCheck, ContentEncodingDecode)> {
    match encoding {
        "base64" => Some((is_base64, from_base64)),
        _ => None,
    }
}

pub(crate) fn media_type_check(media_type: &str) -> Option<ContentMediaTypeCheck> {
    match media_type {
        "application/json" => Some(is_json),
        _ => None,
    }
}

/// Decode an instance string for `contentSchema`: undo the content
/// encoding, then parse according to the media type. `None` when the
/// content is not JSON-shaped, in which case `contentSchema` does not
/// apply.
pub(crate) fn decode_for_schema(
    value: &str,
    decode: Option<ContentEncodingDecode>,
    media_type: Option<&str>,
) -> Option<Value> {
    let decoded = match decode {
        Some(decode) => decode(value)?,
        None => value.as_bytes().to_vec(),
    };
    match media_type {
        Some("application/json") => serde_json::from_slice(&decoded).ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::{decode_for_schema, encoding_check, media_type_check};
    use serde_json::json;

    #[test]
    fn base64_check_and_decode() {
        let (check, decode) = encoding_check("base64").expect("Known encoding");
        assert!(check("eyJmb28iOiAiYmFyIn0="));
        assert!(!check("not base64!"));
        assert_eq!(
            decode("eyJmb28iOiAiYmFyIn0=").expect("Valid base64"),
            br#"{"foo": "bar"}"#
        );
    }

    #[test]
    fn json_media_type() {
        let check = media_type_check("application/json").expect("Known media type");
        assert!(check(br#"{"a": 1}"#));
        assert!(!check(b"{"));
        assert!(media_type_check("text/csv").is_none());
    }

    #[test]
    fn decoding_for_content_schema() {
        let (_, decode) = encoding_check("base64").expect("Known encoding");
        let decoded = decode_for_schema(
            "eyJmb28iOiAiYmFyIn0=",
            Some(decode),
            Some("application/json"),
        )
        .expect("Decodable");
        assert_eq!(decoded, json!({"foo": "bar"}));
        assert!(decode_for_schema("%%%", Some(decode), Some("application/json")).is_none());
    }
}
