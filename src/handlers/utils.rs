use serde_json::{Map, Value};

/// Remove `depth` from the query and read it as a non-negative integer.
/// Missing, fractional, negative or non-numeric values give `default`.
pub fn take_depth(query: &mut Map<String, Value>, default: u32) -> u32 {
    match query.remove("depth") {
        Some(Value::Number(n)) => n.as_u64().and_then(|d| u32::try_from(d).ok()).unwrap_or(default),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(default),
        _ => default,
    }
}

/// Drop `sessions` from a user document
pub fn strip_sessions(mut doc: Value) -> Value {
    if let Value::Object(map) = &mut doc {
        map.remove("sessions");
    }
    doc
}
