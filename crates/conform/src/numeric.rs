//! Numeric comparisons on arbitrary-precision JSON numbers.
//!
//! Numbers keep their source text (`serde_json`'s `arbitrary_precision`),
//! so divisibility and integer checks can be exact where the textual form
//! allows it, with an `f64` fallback for scientific notation.
use std::str::FromStr;

use fraction::{BigFraction, BigUint};
use num_cmp::NumCmp;
use serde_json::{Map, Number, Value};

macro_rules! num_cmp {
    ($op:ident, $left:expr, $right:expr) => {
        if let Some(b) = $right.as_u64() {
            NumCmp::$op($left, b)
        } else if let Some(b) = $right.as_i64() {
            NumCmp::$op($left, b)
        } else if let Some(b) = $right.as_f64() {
            NumCmp::$op($left, b)
        } else {
            false
        }
    };
}

macro_rules! compare {
    ($name:ident) => {
        pub(crate) fn $name(left: &Number, right: &Number) -> bool {
            if let Some(a) = left.as_u64() {
                num_cmp!($name, a, right)
            } else if let Some(a) = left.as_i64() {
                num_cmp!($name, a, right)
            } else if let Some(a) = left.as_f64() {
                num_cmp!($name, a, right)
            } else {
                false
            }
        }
    };
}

compare!(num_eq);
compare!(num_lt);
compare!(num_le);
compare!(num_gt);
compare!(num_ge);

/// Deep equality with cross-type numeric comparison, so `1`, `1.0` and
/// `1e0` are all equal.
pub(crate) fn equal(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::String(left), Value::String(right)) => left == right,
        (Value::Bool(left), Value::Bool(right)) => left == right,
        (Value::Null, Value::Null) => true,
        (Value::Number(left), Value::Number(right)) => num_eq(left, right),
        (Value::Array(left), Value::Array(right)) => equal_arrays(left, right),
        (Value::Object(left), Value::Object(right)) => equal_objects(left, right),
        (_, _) => false,
    }
}

#[inline]
pub(crate) fn equal_arrays(left: &[Value], right: &[Value]) -> bool {
    left.len() == right.len() && left.iter().zip(right).all(|(a, b)| equal(a, b))
}

#[inline]
pub(crate) fn equal_objects(left: &Map<String, Value>, right: &Map<String, Value>) -> bool {
    left.len() == right.len()
        && left
            .iter()
            .all(|(key, a)| right.get(key).is_some_and(|b| equal(a, b)))
}

/// Exact rational value of a JSON number, derived from its textual form.
///
/// Scientific notation falls back to the `f64` value, which is exact for
/// the binary fraction it denotes.
pub(crate) fn to_big_fraction(number: &Number) -> Option<BigFraction> {
    let text = number.to_string();
    if text.contains(['e', 'E']) {
        return number.as_f64().map(BigFraction::from);
    }
    let (negative, digits) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text.as_str()),
    };
    let fraction = if let Some((int, frac)) = digits.split_once('.') {
        let numer = BigUint::from_str(&format!("{int}{frac}")).ok()?;
        let denom = BigUint::from_str(&format!("1{}", "0".repeat(frac.len()))).ok()?;
        BigFraction::new(numer, denom)
    } else {
        BigFraction::new(BigUint::from_str(digits).ok()?, BigUint::from(1_u8))
    };
    Some(if negative { -fraction } else { fraction })
}

/// Whether the quotient `instance / divisor` is a whole number, computed
/// in arbitrary precision.
pub(crate) fn is_multiple_of(instance: &Number, divisor: &Number) -> bool {
    match (to_big_fraction(instance), to_big_fraction(divisor)) {
        (Some(instance), Some(divisor)) => {
            let quotient = instance / divisor;
            quotient.denom().is_some_and(|denom| denom == &BigUint::from(1_u8))
        }
        _ => {
            // Out-of-range fallback
            let (Some(instance), Some(divisor)) = (instance.as_f64(), divisor.as_f64()) else {
                return false;
            };
            (instance / divisor).fract() == 0.
        }
    }
}

/// Integer detection per draft.
///
/// Draft 4 requires the lexical form to be an integer; later drafts accept
/// any number whose value is whole, so `1.0` counts.
pub(crate) fn is_integer(number: &Number, legacy: bool) -> bool {
    if number.as_u64().is_some() || number.as_i64().is_some() {
        return true;
    }
    if legacy {
        return false;
    }
    to_big_fraction(number)
        .and_then(|fraction| fraction.denom().map(|denom| denom == &BigUint::from(1_u8)))
        .unwrap_or(false)
}

/// A non-negative integer limit, also accepting whole-valued forms like `2.0`.
pub(crate) fn to_limit(number: &Number) -> Option<u64> {
    if let Some(limit) = number.as_u64() {
        return Some(limit);
    }
    let value = number.as_f64()?;
    if value >= 0. && value.fract() == 0. && value <= u64::MAX as f64 {
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let limit = value as u64;
        Some(limit)
    } else {
        None
    }
}
