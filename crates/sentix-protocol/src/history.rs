use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Which action produced a history entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HistoryMode {
    Single,
    SingleFast,
    Batch,
    BatchRow,
    BatchAll,
}

impl HistoryMode {
    pub fn as_str(self) -> &'static str {
        match self {
            HistoryMode::Single => "single",
            HistoryMode::SingleFast => "single-fast",
            HistoryMode::Batch => "batch",
            HistoryMode::BatchRow => "batch-row",
            HistoryMode::BatchAll => "batch-all",
        }
    }
}

impl fmt::Display for HistoryMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Entry of the `sentix:analysisHistory` log. Field names match the keys already
/// written by the web dashboard so both can share a store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: String,
    /// Milliseconds since the Unix epoch.
    pub ts: i64,
    pub mode: HistoryMode,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(rename = "fileName", default)]
    pub file_name: Option<String>,
    pub model: String,
    #[serde(default)]
    pub result: Value,
}

/// Fields supplied by the caller; `id` and `ts` are assigned when recorded.
#[derive(Debug, Clone, PartialEq)]
pub struct NewHistoryEntry {
    pub mode: HistoryMode,
    pub text: Option<String>,
    pub file_name: Option<String>,
    pub model: String,
    pub result: Value,
}

impl NewHistoryEntry {
    pub fn text(mode: HistoryMode, text: &str, model: &str, result: Value) -> Self {
        Self {
            mode,
            text: Some(text.to_string()),
            file_name: None,
            model: model.to_string(),
            result,
        }
    }

    pub fn file(mode: HistoryMode, file_name: &str, model: &str, result: Value) -> Self {
        Self {
            mode,
            text: None,
            file_name: Some(file_name.to_string()),
            model: model.to_string(),
            result,
        }
    }
}
