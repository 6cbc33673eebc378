//! Checks for the `format` keyword.
//!
//! Formats are pluggable: the compiler stores a check per schema and the
//! validator merely dispatches. Unknown formats are ignored unless the
//! user registers them.
use std::{
    net::{Ipv4Addr, Ipv6Addr},
    str::FromStr,
};

use email_address::EmailAddress;
use fancy_regex::Regex;
use once_cell::sync::Lazy;
use uuid_simd::{parse_hyphenated, Out};

use referencing::{Draft, Uri, UriRef};

/// A pluggable `format` check. Implemented for any `Fn(&str) -> bool`.
pub trait Format: Send + Sync {
    /// Whether the string conforms to the format.
    fn is_valid(&self, value: &str) -> bool;
}

impl<F> Format for F
where
    F: Fn(&str) -> bool + Send + Sync,
{
    fn is_valid(&self, value: &str) -> bool {
        self(value)
    }
}

static JSON_POINTER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(/(([^/~])|(~[01]))*)*\z").expect("Is a valid regex"));
static RELATIVE_JSON_POINTER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:0|[1-9][0-9]*)(?:#|(?:/(?:[^~/]|~0|~1)*)*)\z").expect("Is a valid regex")
});
static URI_TEMPLATE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"^(?:(?:[^\x00-\x20"'<>%\\^`{|}]|%[0-9a-f]{2})|\{[+#./;?&=,!@|]?(?:[a-z0-9_]|%[0-9a-f]{2})+(?::[1-9][0-9]{0,3}|\*)?(?:,(?:[a-z0-9_]|%[0-9a-f]{2})+(?::[1-9][0-9]{0,3}|\*)?)*})*\z"#,
    )
    .expect("Is a valid regex")
});

fn is_valid_date(date: &str) -> bool {
    if date.len() != 10 {
        return false;
    }
    let bytes = date.as_bytes();
    if bytes[4] != b'-'
        || bytes[7] != b'-'
        || !bytes.iter().enumerate().all(|(idx, byte)| {
            idx == 4 || idx == 7 || byte.is_ascii_digit()
        })
    {
        return false;
    }
    let year = u16::from(bytes[0] - b'0') * 1000
        + u16::from(bytes[1] - b'0') * 100
        + u16::from(bytes[2] - b'0') * 10
        + u16::from(bytes[3] - b'0');
    let month = (bytes[5] - b'0') * 10 + (bytes[6] - b'0');
    if !(1..=12).contains(&month) {
        return false;
    }
    let day = (bytes[8] - b'0') * 10 + (bytes[9] - b'0');
    if day == 0 {
        return false;
    }
    match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => day <= 31,
        4 | 6 | 9 | 11 => day <= 30,
        2 => {
            if is_leap_year(year) {
                day <= 29
            } else {
                day <= 28
            }
        }
        _ => false,
    }
}

#[inline]
fn is_leap_year(year: u16) -> bool {
    (year % 4 == 0 && year % 100 != 0) || (year % 400 == 0)
}

fn is_valid_time(item: &str) -> bool {
    let bytes = item.as_bytes();
    let len = bytes.len();

    // Minimum valid time is "HH:MM:SSZ"
    if len < 9 {
        return false;
    }
    if !bytes[0].is_ascii_digit()
        || !bytes[1].is_ascii_digit()
        || bytes[2] != b':'
        || !bytes[3].is_ascii_digit()
        || !bytes[4].is_ascii_digit()
        || bytes[5] != b':'
        || !bytes[6].is_ascii_digit()
        || !bytes[7].is_ascii_digit()
    {
        return false;
    }
    let hh = (bytes[0] - b'0') * 10 + (bytes[1] - b'0');
    let mm = (bytes[3] - b'0') * 10 + (bytes[4] - b'0');
    let ss = (bytes[6] - b'0') * 10 + (bytes[7] - b'0');
    if hh > 23 || mm > 59 || ss > 60 {
        return false;
    }

    let mut i = 8;
    if i < len && bytes[i] == b'.' {
        i += 1;
        let mut has_digit = false;
        while i < len && bytes[i].is_ascii_digit() {
            has_digit = true;
            i += 1;
        }
        if !has_digit {
            return false;
        }
    }
    if i == len {
        return false;
    }
    match bytes[i] {
        b'Z' | b'z' => i == len - 1 && (ss != 60 || (hh == 23 && mm == 59)),
        b'+' | b'-' => {
            if len - i != 6 {
                return false;
            }
            let sign = bytes[i];
            i += 1;
            if !bytes[i].is_ascii_digit()
                || !bytes[i + 1].is_ascii_digit()
                || bytes[i + 2] != b':'
                || !bytes[i + 3].is_ascii_digit()
                || !bytes[i + 4].is_ascii_digit()
            {
                return false;
            }
            let offset_hh = (bytes[i] - b'0') * 10 + (bytes[i + 1] - b'0');
            let offset_mm = (bytes[i + 3] - b'0') * 10 + (bytes[i + 4] - b'0');
            if offset_hh > 23 || offset_mm > 59 {
                return false;
            }
            if ss == 60 {
                // A leap second must land on 23:59:60 UTC
                let mut utc_hh = i32::from(hh);
                let mut utc_mm = i32::from(mm);
                if sign == b'+' {
                    utc_hh -= i32::from(offset_hh);
                    utc_mm -= i32::from(offset_mm);
                } else {
                    utc_hh += i32::from(offset_hh);
                    utc_mm += i32::from(offset_mm);
                }
                utc_hh += utc_mm.div_euclid(60);
                utc_mm = utc_mm.rem_euclid(60);
                utc_hh = utc_hh.rem_euclid(24);
                utc_hh == 23 && utc_mm == 59
            } else {
                true
            }
        }
        _ => false,
    }
}

fn is_valid_datetime(item: &str) -> bool {
    if item.len() < 11 {
        return false;
    }
    let (date, rest) = item.split_at(10);
    let Some(time) = rest.strip_prefix(['T', 't']) else {
        return false;
    };
    is_valid_date(date) && is_valid_time(time)
}

/// ISO 8601 duration: `P` followed by date and/or time components.
fn is_valid_duration(item: &str) -> bool {
    let Some(mut rest) = item.strip_prefix('P') else {
        return false;
    };
    if rest.is_empty() {
        return false;
    }
    fn take_units<'a>(mut input: &'a str, units: &[u8]) -> (&'a str, usize) {
        let mut seen = 0;
        let mut position = 0;
        while !input.is_empty() {
            let digits = input.bytes().take_while(u8::is_ascii_digit).count();
            if digits == 0 {
                break;
            }
            let Some(unit_at) = units[position..]
                .iter()
                .position(|unit| input.as_bytes().get(digits) == Some(unit))
            else {
                break;
            };
            position += unit_at + 1;
            input = &input[digits + 1..];
            seen += 1;
        }
        (input, seen)
    }

    // Weeks do not combine with the other date units
    if let Some(weeks) = rest.strip_suffix('W') {
        return !weeks.is_empty() && weeks.bytes().all(|byte| byte.is_ascii_digit());
    }
    let (after_date, date_units) = take_units(rest, b"YMD");
    rest = after_date;
    if let Some(time) = rest.strip_prefix('T') {
        let (after_time, time_units) = take_units(time, b"HMS");
        after_time.is_empty() && time_units > 0
    } else {
        rest.is_empty() && date_units > 0
    }
}

fn is_valid_email(email: &str) -> bool {
    if let Ok(parsed) = EmailAddress::from_str(email) {
        let domain = parsed.domain();
        if let Some(domain) = domain.strip_prefix('[').and_then(|d| d.strip_suffix(']')) {
            if let Some(domain) = domain.strip_prefix("IPv6:") {
                domain.parse::<Ipv6Addr>().is_ok()
            } else {
                domain.parse::<Ipv4Addr>().is_ok()
            }
        } else {
            is_valid_hostname(domain)
        }
    } else {
        false
    }
}

fn is_valid_hostname(hostname: &str) -> bool {
    !(hostname.ends_with('-')
        || hostname.starts_with('-')
        || hostname.is_empty()
        || bytecount::num_chars(hostname.as_bytes()) > 255
        || hostname
            .chars()
            .any(|c| !(c.is_ascii_alphanumeric() || c == '-' || c == '.'))
        || hostname
            .split('.')
            .any(|part| part.is_empty() || bytecount::num_chars(part.as_bytes()) > 63))
}

fn is_valid_idn_hostname(hostname: &str) -> bool {
    idna::domain_to_ascii_strict(hostname).is_ok()
}

fn is_valid_uuid(item: &str) -> bool {
    let mut out = [0; 16];
    parse_hyphenated(item.as_bytes(), Out::from_mut(&mut out)).is_ok()
}

fn is_valid_json_pointer(item: &str) -> bool {
    JSON_POINTER_RE
        .is_match(item)
        .expect("Simple JSON_POINTER_RE pattern")
}

fn is_valid_relative_json_pointer(item: &str) -> bool {
    RELATIVE_JSON_POINTER_RE
        .is_match(item)
        .expect("Simple RELATIVE_JSON_POINTER_RE pattern")
}

fn is_valid_uri_template(item: &str) -> bool {
    URI_TEMPLATE_RE
        .is_match(item)
        .expect("Simple URI_TEMPLATE_RE pattern")
}

fn is_valid_regex(item: &str) -> bool {
    Regex::new(item).is_ok()
}

fn is_valid_uri(item: &str) -> bool {
    Uri::parse(item).is_ok()
}

fn is_valid_uri_reference(item: &str) -> bool {
    UriRef::parse(item).is_ok()
}

/// The built-in check for `format`, if the draft defines one.
pub(crate) fn builtin(draft: Draft, format: &str) -> Option<fn(&str) -> bool> {
    match format {
        "date" => Some(is_valid_date),
        "date-time" => Some(is_valid_datetime),
        "time" => Some(is_valid_time),
        "email" | "idn-email" => Some(is_valid_email),
        "hostname" => Some(is_valid_hostname),
        "ipv4" => Some(|value| Ipv4Addr::from_str(value).is_ok()),
        "ipv6" => Some(|value| Ipv6Addr::from_str(value).is_ok()),
        "regex" => Some(is_valid_regex),
        "uri" => Some(is_valid_uri),
        "uri-reference" | "iri-reference" if draft >= Draft::Draft6 => {
            Some(is_valid_uri_reference)
        }
        "iri" if draft >= Draft::Draft7 => Some(is_valid_uri),
        "uri-template" if draft >= Draft::Draft6 => Some(is_valid_uri_template),
        "json-pointer" if draft >= Draft::Draft6 => Some(is_valid_json_pointer),
        "relative-json-pointer" if draft >= Draft::Draft7 => {
            Some(is_valid_relative_json_pointer)
        }
        "idn-hostname" if draft >= Draft::Draft7 => Some(is_valid_idn_hostname),
        "uuid" if draft >= Draft::Draft201909 => Some(is_valid_uuid),
        "duration" if draft >= Draft::Draft201909 => Some(is_valid_duration),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("2023-01-31", true)]
    #[test_case("2023-02-29", false)]
    #[test_case("2024-02-29", true; "leap year")]
    #[test_case("2023-13-01", false)]
    #[test_case("2023-00-01", false)]
    #[test_case("2023-01-00", false)]
    #[test_case("23-01-01", false)]
    fn date(value: &str, expected: bool) {
        assert_eq!(is_valid_date(value), expected);
    }

    #[test_case("12:00:00Z", true)]
    #[test_case("12:00:00+01:30", true)]
    #[test_case("12:00:00.123Z", true)]
    #[test_case("23:59:60Z", true; "leap second utc")]
    #[test_case("12:00:60Z", false; "leap second not at midnight utc")]
    #[test_case("24:00:00Z", false)]
    #[test_case("12:00:00", false; "offset required")]
    fn time(value: &str, expected: bool) {
        assert_eq!(is_valid_time(value), expected);
    }

    #[test_case("2023-01-31T12:00:00Z", true)]
    #[test_case("2023-01-31t12:00:00z", true; "lowercase separators")]
    #[test_case("2023-01-31 12:00:00Z", false)]
    #[test_case("2023-01-31T25:00:00Z", false)]
    fn datetime(value: &str, expected: bool) {
        assert_eq!(is_valid_datetime(value), expected);
    }

    #[test_case("P1Y2M3DT4H5M6S", true)]
    #[test_case("P4W", true)]
    #[test_case("PT1M", true)]
    #[test_case("P1M", true)]
    #[test_case("P", false)]
    #[test_case("PT", false)]
    #[test_case("P1W2D", false; "weeks do not combine")]
    #[test_case("P1D2Y", false; "units out of order")]
    fn duration(value: &str, expected: bool) {
        assert_eq!(is_valid_duration(value), expected);
    }

    #[test_case("example.com", true)]
    #[test_case("a-.com", false; "trailing hyphen label")]
    #[test_case("-a.com", false; "leading hyphen label")]
    #[test_case("exa_mple.com", false)]
    fn hostname(value: &str, expected: bool) {
        assert_eq!(is_valid_hostname(value), expected);
    }

    #[test_case("joe@example.com", true)]
    #[test_case("joe@[127.0.0.1]", true)]
    #[test_case("joe@[IPv6:::1]", true)]
    #[test_case("not-an-email", false)]
    fn email(value: &str, expected: bool) {
        assert_eq!(is_valid_email(value), expected);
    }

    #[test_case("f81d4fae-7dec-11d0-a765-00a0c91e6bf6", true)]
    #[test_case("not-a-uuid", false)]
    fn uuid(value: &str, expected: bool) {
        assert_eq!(is_valid_uuid(value), expected);
    }

    #[test_case("/a/b", true)]
    #[test_case("/a/~0", true)]
    #[test_case("/a/~2", false)]
    #[test_case("a", false)]
    fn json_pointer(value: &str, expected: bool) {
        assert_eq!(is_valid_json_pointer(value), expected);
    }
}
