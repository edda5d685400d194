//! Response reconciliation.
//!
//! Maps an arbitrary downstream JSON answer onto the shape the caller asked
//! for.  Per template key `k` with default `d`:
//!
//! 1. **Unwrap**: a truthy `data` field replaces the response; a non-object
//!    working payload is wrapped as `{ "value": … }`.
//! 2. **Exact match** on `k`.
//! 3. **Case-insensitive match**, first hit in the payload's own field order.
//! 4. **Default** `d`.
//! 5. **Empty-default substitution**: an empty-string result is replaced by
//!    the payload's first field when the payload is non-empty.
//!
//! An empty template returns the whole working payload.
//!
//! Step 5 can hand a key a value unrelated to its name (a `total` key may
//! receive a transaction id if that is the first field).  Callers that need
//! strict mapping should use non-empty-string defaults.

use serde_json::{Map, Value};

/// Field used to wrap non-object payloads.
pub const WRAPPED_VALUE_FIELD: &str = "value";

/// Apply the unwrap step and return the working payload as an object.
pub fn working_payload(response: &Value) -> Map<String, Value> {
    let unwrapped = match response {
        Value::Object(fields) => match fields.get("data") {
            Some(data) if is_truthy(data) => data,
            _ => response,
        },
        _ => response,
    };

    match unwrapped {
        Value::Object(fields) => fields.clone(),
        other => {
            let mut wrapped = Map::with_capacity(1);
            wrapped.insert(WRAPPED_VALUE_FIELD.to_string(), other.clone());
            wrapped
        }
    }
}

/// Reconcile `response` against `template`.
///
/// The result has exactly the template's keys (in template order), unless
/// the template is empty, in which case the working payload is returned.
pub fn reconcile(response: &Value, template: &Map<String, Value>) -> Value {
    let payload = working_payload(response);

    if template.is_empty() {
        return Value::Object(payload);
    }

    let mut reconciled = Map::with_capacity(template.len());
    for (key, default) in template {
        let mut resolved = payload
            .get(key)
            .or_else(|| find_case_insensitive(&payload, key))
            .unwrap_or(default);

        if is_empty_string(resolved) {
            if let Some(first) = payload.values().next() {
                resolved = first;
            }
        }

        reconciled.insert(key.clone(), resolved.clone());
    }
    Value::Object(reconciled)
}

fn find_case_insensitive<'a>(payload: &'a Map<String, Value>, key: &str) -> Option<&'a Value> {
    let wanted = key.to_lowercase();
    payload
        .iter()
        .find(|(field, _)| field.to_lowercase() == wanted)
        .map(|(_, value)| value)
}

fn is_empty_string(value: &Value) -> bool {
    matches!(value, Value::String(s) if s.is_empty())
}

/// JSON truthiness: `null`, `false`, `0` and `""` are falsy; everything else,
/// including empty arrays and objects, is truthy.
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}
