use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::DEFAULT_MODEL;

/// Normalized `/models` response. `available` never contains `default`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ModelDescriptor {
    pub default: String,
    pub available: Vec<String>,
}

impl Default for ModelDescriptor {
    fn default() -> Self {
        Self {
            default: DEFAULT_MODEL.to_string(),
            available: Vec::new(),
        }
    }
}

impl ModelDescriptor {
    /// Normalize any of the known `/models` shapes:
    ///
    /// 1. `{ models: [{id, label}], available: [id], default }`
    /// 2. `{ models: [id], default }`
    /// 3. `{ available: [id], default }`
    ///
    /// `available` wins over `models` when both are arrays.
    pub fn from_response(raw: &Value) -> Self {
        let ids: Vec<String> = if let Some(list) = raw.get("available").and_then(Value::as_array) {
            list.iter()
                .filter_map(Value::as_str)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()
        } else if let Some(list) = raw.get("models").and_then(Value::as_array) {
            list.iter()
                .filter_map(|m| match m {
                    Value::String(s) => Some(s.as_str()),
                    Value::Object(o) => o.get("id").and_then(Value::as_str),
                    _ => None,
                })
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()
        } else {
            Vec::new()
        };

        let default = raw
            .get("default")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .or_else(|| ids.first().cloned())
            .unwrap_or_else(|| DEFAULT_MODEL.to_string());

        let available = ids.into_iter().filter(|m| *m != default).collect();
        Self { default, available }
    }

    /// Every selectable model, default first.
    pub fn all(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.default.as_str()).chain(self.available.iter().map(String::as_str))
    }
}
