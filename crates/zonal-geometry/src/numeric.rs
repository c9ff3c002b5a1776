//! Best-effort numeric coercion, shared by the rule comparator and the
//! metrics builder so "fail soft with a diagnostic" stays in one place.

use serde_json::Value;

/// Coerce a JSON value to an `f64` where a sensible reading exists.
///
/// Numbers pass through, booleans count as 0/1, strings are trimmed and
/// parsed. Anything else — and non-finite parses like `"NaN"` — is `None`.
pub fn try_parse_number(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|n| n.is_finite())
}
