use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::analysis::AnalysisResult;
use crate::lenient;

/// One model's verdict on one row.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelPrediction {
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient::opt_string")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient::opt_f64")]
    pub confidence: Option<f64>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty", deserialize_with = "lenient::number_map")]
    pub probs: BTreeMap<String, f64>,
}

impl ModelPrediction {
    pub fn new(label: &str, confidence: f64) -> Self {
        Self {
            label: Some(label.to_string()),
            confidence: Some(confidence),
            probs: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RowResult {
    #[serde(default, deserialize_with = "lenient::string_or_empty")]
    pub text: String,
    #[serde(default, deserialize_with = "lenient::or_default")]
    pub per_model: BTreeMap<String, ModelPrediction>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient::opt_f64")]
    pub inference_ms: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient::opt_string")]
    pub best_model_by_confidence: Option<String>,
}

impl RowResult {
    pub fn new(text: &str) -> Self {
        Self {
            text: text.to_string(),
            ..Self::default()
        }
    }

    pub fn with_prediction(mut self, model: &str, prediction: ModelPrediction) -> Self {
        self.per_model.insert(model.to_string(), prediction);
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient::opt_f64")]
    pub consensus_rate: Option<f64>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty", deserialize_with = "lenient::or_default")]
    pub counts_per_model: BTreeMap<String, BTreeMap<String, u64>>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchMeta {
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient::opt_string")]
    pub source_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient::opt_string")]
    pub file_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient::opt_string")]
    pub processed_at: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty", deserialize_with = "lenient::or_default")]
    pub lang_counts: BTreeMap<String, u64>,
}

/// Outcome of a per-row deep analysis inside a batch deep-all run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DeepRowOutcome {
    Failed { error: String, text: String },
    Analyzed(Box<AnalysisResult>),
}

impl DeepRowOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, DeepRowOutcome::Failed { .. })
    }

    pub fn analysis(&self) -> Option<&AnalysisResult> {
        match self {
            DeepRowOutcome::Analyzed(r) => Some(r),
            DeepRowOutcome::Failed { .. } => None,
        }
    }
}

/// Result of `/batch`, optionally enriched with per-row deep analyses.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchResult {
    #[serde(default, deserialize_with = "lenient::vec_or_empty")]
    pub rows: Vec<RowResult>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient::opt_object")]
    pub summary: Option<BatchSummary>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aggregate: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient::opt_object")]
    pub meta: Option<BatchMeta>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient::opt_string")]
    pub file_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient::opt_string")]
    pub processed_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deep_results: Option<Vec<DeepRowOutcome>>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl BatchResult {
    /// Value stored in history for this batch: the summary, else the raw aggregate.
    pub fn summary_value(&self) -> Option<Value> {
        if let Some(summary) = &self.summary {
            return serde_json::to_value(summary).ok();
        }
        self.aggregate.clone().filter(|v| !v.is_null())
    }

    /// Display name of the uploaded source, looking at meta before top-level fields.
    pub fn source_name(&self) -> Option<&str> {
        self.meta
            .as_ref()
            .and_then(|m| m.file_name.as_deref().or(m.source_name.as_deref()))
            .or(self.file_name.as_deref())
    }
}
