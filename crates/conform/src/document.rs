//! Parsing entry points.
//!
//! `serde_json` keeps the last of a repeated object key; schema documents
//! reject duplicates instead, so parsing runs a lexical duplicate-key scan
//! over input that already deserialised successfully.
use ahash::AHashSet;
use serde::de::Error as _;
use serde_json::Value;

pub(crate) fn from_slice(bytes: &[u8]) -> Result<Value, serde_json::Error> {
    let value = serde_json::from_slice(bytes)?;
    check_duplicate_keys(bytes)?;
    Ok(value)
}

pub(crate) fn from_reader<R: std::io::Read>(mut reader: R) -> Result<Value, serde_json::Error> {
    let mut buffer = Vec::new();
    reader
        .read_to_end(&mut buffer)
        .map_err(serde_json::Error::custom)?;
    from_slice(&buffer)
}

enum Scope {
    Object { keys: AHashSet<String>, next_is_key: bool },
    Array,
}

/// Scan already-valid JSON for repeated keys within a single object.
fn check_duplicate_keys(bytes: &[u8]) -> Result<(), serde_json::Error> {
    let mut stack: Vec<Scope> = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'{' => stack.push(Scope::Object {
                keys: AHashSet::new(),
                next_is_key: true,
            }),
            b'[' => stack.push(Scope::Array),
            b'}' | b']' => {
                stack.pop();
            }
            b',' => {
                if let Some(Scope::Object { next_is_key, .. }) = stack.last_mut() {
                    *next_is_key = true;
                }
            }
            b'"' => {
                let (string, end) = scan_string(bytes, i)?;
                i = end;
                if let Some(Scope::Object { keys, next_is_key }) = stack.last_mut() {
                    if *next_is_key {
                        *next_is_key = false;
                        if !keys.insert(string.clone()) {
                            return Err(serde_json::Error::custom(format!(
                                "duplicate object key '{string}'"
                            )));
                        }
                    }
                }
            }
            _ => {}
        }
        i += 1;
    }
    Ok(())
}

/// Decode the string starting at `bytes[start] == b'"'`; returns the
/// unescaped contents and the index of the closing quote.
fn scan_string(bytes: &[u8], start: usize) -> Result<(String, usize), serde_json::Error> {
    let mut buffer = Vec::new();
    let mut i = start + 1;
    while i < bytes.len() {
        match bytes[i] {
            b'"' => {
                return String::from_utf8(buffer)
                    .map(|string| (string, i))
                    .map_err(serde_json::Error::custom);
            }
            b'\\' => {
                i += 1;
                match bytes.get(i) {
                    Some(b'u') => {
                        // Keep the escape verbatim; equal escapes still
                        // compare equal and the input is known-valid JSON.
                        let end = (i + 4).min(bytes.len() - 1);
                        buffer.extend_from_slice(&bytes[i - 1..=end]);
                        i += 4;
                    }
                    Some(b'n') => buffer.push(b'\n'),
                    Some(b't') => buffer.push(b'\t'),
                    Some(b'r') => buffer.push(b'\r'),
                    Some(b'b') => buffer.push(0x08),
                    Some(b'f') => buffer.push(0x0C),
                    Some(escaped) => buffer.push(*escaped),
                    None => break,
                }
            }
            byte => buffer.push(byte),
        }
        i += 1;
    }
    Err(serde_json::Error::custom("unterminated string"))
}

#[cfg(test)]
mod tests {
    use super::from_slice;
    use serde_json::json;

    #[test]
    fn parses_ordinary_documents() {
        let value = from_slice(br#"{"b": 1, "a": [1, {"c": 2}]}"#).expect("Valid document");
        assert_eq!(value, json!({"b": 1, "a": [1, {"c": 2}]}));
    }

    #[test]
    fn preserves_key_order() {
        let value = from_slice(br#"{"b": 1, "a": 2, "c": 3}"#).expect("Valid document");
        let keys: Vec<&String> = value.as_object().expect("Is an object").keys().collect();
        assert_eq!(keys, ["b", "a", "c"]);
    }

    #[test]
    fn rejects_duplicate_keys() {
        let error = from_slice(br#"{"a": 1, "a": 2}"#).expect_err("Should fail");
        assert!(error.to_string().contains("duplicate object key 'a'"));
    }

    #[test]
    fn rejects_nested_duplicates() {
        let error = from_slice(br#"{"outer": {"x": 1, "x": 2}}"#).expect_err("Should fail");
        assert!(error.to_string().contains("duplicate object key 'x'"));
    }

    #[test]
    fn same_key_in_sibling_objects_is_fine() {
        assert!(from_slice(br#"[{"a": 1}, {"a": 2}]"#).is_ok());
    }

    #[test]
    fn escaped_quotes_do_not_confuse_the_scanner() {
        assert!(from_slice(br#"{"a\"b": 1, "a": {"a\"b": 2}}"#).is_ok());
    }
}
