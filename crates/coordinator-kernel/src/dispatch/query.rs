//! Flattening of an arbitrary request payload into a routing query.

use serde_json::{Number, Value};

/// Query produced for an absent, non-object or empty payload.
pub const EMPTY_REQUEST_QUERY: &str = "empty request";

/// Flatten `payload` into `"<key>: <value>, …"` in the payload's own key order.
///
/// `null` and empty-string values are skipped.  Strings are emitted without
/// quotes; arrays and objects are rendered as compact JSON.
///
/// ```
/// use coordinator_kernel::build_query;
/// use serde_json::json;
///
/// assert_eq!(
///     build_query(&json!({"action": "coding", "amount": 2})),
///     "action: coding, amount: 2"
/// );
/// assert_eq!(build_query(&json!({})), "empty request");
/// ```
pub fn build_query(payload: &Value) -> String {
    let fields = match payload {
        Value::Object(map) if !map.is_empty() => map,
        _ => return EMPTY_REQUEST_QUERY.to_string(),
    };

    fields
        .iter()
        .filter_map(|(key, value)| render(value).map(|v| format!("{key}: {v}")))
        .collect::<Vec<_>>()
        .join(", ")
}

fn render(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(render_number(n)),
        Value::Array(_) | Value::Object(_) => Some(value.to_string()),
    }
}

/// Integral floats print without a fractional part (`2.0` → `2`).
fn render_number(n: &Number) -> String {
    match n.as_f64() {
        Some(f) if n.is_f64() && f.fract() == 0.0 && f.abs() < 1e15 => format!("{:.0}", f + 0.0),
        _ => n.to_string(),
    }
}
