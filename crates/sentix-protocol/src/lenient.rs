//! Forgiving field decoders for backend payloads.
//!
//! The sentiment backend has shipped several response shapes over time, and numeric
//! fields occasionally arrive as strings or `null`. These helpers turn anything
//! unexpected into a neutral default instead of failing the whole document.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::collections::BTreeMap;

/// Interpret a JSON value as a finite number (numbers and numeric strings only).
pub fn number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64().filter(|v| v.is_finite()),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
        _ => None,
    }
}

/// Interpret a JSON value as display text; numbers and booleans are stringified.
pub fn text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

pub fn f64_or_zero<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Value>::deserialize(deserializer)?;
    Ok(raw.as_ref().and_then(number).unwrap_or(0.0))
}

pub fn opt_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Value>::deserialize(deserializer)?;
    Ok(raw.as_ref().and_then(number))
}

pub fn u64_or_zero<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Value>::deserialize(deserializer)?;
    Ok(raw
        .as_ref()
        .and_then(number)
        .filter(|v| *v >= 0.0)
        .map(|v| v as u64)
        .unwrap_or(0))
}

pub fn opt_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Value>::deserialize(deserializer)?;
    Ok(raw.as_ref().and_then(text))
}

pub fn string_or_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Value>::deserialize(deserializer)?;
    Ok(raw.as_ref().and_then(text).unwrap_or_default())
}

/// Decode an array, silently dropping elements that do not fit `T`.
/// Non-array values decode to an empty vector.
pub fn vec_or_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let raw = Option::<Value>::deserialize(deserializer)?;
    Ok(match raw {
        Some(Value::Array(items)) => items
            .into_iter()
            .filter_map(|item| serde_json::from_value(item).ok())
            .collect(),
        _ => Vec::new(),
    })
}

/// Decode a nested object, falling back to `T::default()` on `null` or a mismatched shape.
pub fn or_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let raw = Option::<Value>::deserialize(deserializer)?;
    Ok(raw
        .and_then(|v| serde_json::from_value(v).ok())
        .unwrap_or_default())
}

/// Decode an optional nested object; mismatched shapes become `None`.
pub fn opt_object<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let raw = Option::<Value>::deserialize(deserializer)?;
    Ok(raw.and_then(|v| serde_json::from_value(v).ok()))
}

/// Decode a `{ key: number }` map, skipping entries whose value is not numeric.
pub fn number_map<'de, D>(deserializer: D) -> Result<BTreeMap<String, f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Value>::deserialize(deserializer)?;
    let mut out = BTreeMap::new();
    if let Some(Value::Object(map)) = raw {
        for (key, value) in map {
            if let Some(n) = number(&value) {
                out.insert(key, n);
            }
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, Deserialize)]
    struct Probe {
        #[serde(default, deserialize_with = "f64_or_zero")]
        value: f64,
        #[serde(default, deserialize_with = "opt_string")]
        name: Option<String>,
        #[serde(default, deserialize_with = "number_map")]
        probs: BTreeMap<String, f64>,
    }

    #[test]
    fn numbers_accept_strings_and_reject_garbage() {
        let p: Probe = serde_json::from_value(json!({"value": "0.25"})).unwrap();
        assert_eq!(p.value, 0.25);
        let p: Probe = serde_json::from_value(json!({"value": "n/a"})).unwrap();
        assert_eq!(p.value, 0.0);
        let p: Probe = serde_json::from_value(json!({"value": null})).unwrap();
        assert_eq!(p.value, 0.0);
    }

    #[test]
    fn strings_and_maps_are_forgiving() {
        let p: Probe = serde_json::from_value(json!({
            "name": 42,
            "probs": {"positive": 0.7, "neutral": "x", "negative": "0.1"}
        }))
        .unwrap();
        assert_eq!(p.name.as_deref(), Some("42"));
        assert_eq!(p.probs.len(), 2);
        assert_eq!(p.probs.get("negative"), Some(&0.1));
    }
}
