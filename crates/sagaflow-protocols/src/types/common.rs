//! Common utility types.

use serde::de::DeserializeOwned;
use serde_json::Value;

/// Ordered map of named JSON values.
///
/// Used for workflow variables, step outputs and the accumulated results of
/// an agent run. Iteration order is insertion order.
pub type Values = serde_json::Map<String, Value>;

/// Agent type tag for research agents.
pub const AGENT_TYPE_RESEARCH: &str = "research";
/// Agent type tag for proof-of-concept agents.
pub const AGENT_TYPE_POC: &str = "poc";
/// Agent type tag for documentation agents.
pub const AGENT_TYPE_DOCUMENTATION: &str = "documentation";
/// Agent type tag for validation agents.
pub const AGENT_TYPE_VALIDATION: &str = "validation";

/// Merge `overlay` into `base`; keys in `overlay` win.
pub fn merge_values(base: &mut Values, overlay: &Values) {
    for (key, value) in overlay {
        base.insert(key.clone(), value.clone());
    }
}

/// Read a string entry from a value map.
pub fn get_str<'a>(values: &'a Values, key: &str) -> Option<&'a str> {
    values.get(key).and_then(Value::as_str)
}

/// Read a boolean entry from a value map.
pub fn get_bool(values: &Values, key: &str) -> Option<bool> {
    values.get(key).and_then(Value::as_bool)
}

/// Read a numeric entry from a value map.
pub fn get_f64(values: &Values, key: &str) -> Option<f64> {
    values.get(key).and_then(Value::as_f64)
}

/// Deserialize an entry of a value map into a typed value.
///
/// Returns `None` when the key is absent or does not have the expected shape.
pub fn get_as<T: DeserializeOwned>(values: &Values, key: &str) -> Option<T> {
    values
        .get(key)
        .and_then(|v| serde_json::from_value(v.clone()).ok())
}

#[cfg(test)]
#[path = "common_tests.rs"]
mod tests;
