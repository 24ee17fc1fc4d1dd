//! Bounded history logs kept in the key-value store.

use std::sync::Arc;

use sentix_protocol::{HistoryEntry, NewHistoryEntry};
use serde_json::Value;

use crate::store::{KvStore, StoreError};
use crate::util::now_ms;

pub const TEXT_HISTORY_KEY: &str = "sentix:history";
pub const ANALYSIS_HISTORY_KEY: &str = "sentix:analysisHistory";
pub const TEXT_HISTORY_LIMIT: usize = 10;
pub const ANALYSIS_HISTORY_LIMIT: usize = 25;

#[derive(Clone)]
pub struct History {
    store: Arc<dyn KvStore>,
}

impl History {
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self { store }
    }

    /// Recently analysed texts, newest first. Unreadable data reads as empty.
    pub fn texts(&self) -> Vec<String> {
        self.store
            .get(TEXT_HISTORY_KEY)
            .and_then(|raw| serde_json::from_str::<Vec<Value>>(&raw).ok())
            .map(|items| {
                items
                    .into_iter()
                    .filter_map(|v| v.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn last_text(&self) -> Option<String> {
        self.texts().into_iter().next()
    }

    /// Move `text` to the front. Blank input and a repeat of the newest entry are no-ops.
    pub fn push_text(&self, text: &str) -> Result<(), StoreError> {
        if text.trim().is_empty() {
            return Ok(());
        }
        let current = self.texts();
        if current.first().map(String::as_str) == Some(text) {
            return Ok(());
        }
        let mut next = Vec::with_capacity(current.len() + 1);
        next.push(text.to_string());
        next.extend(current.into_iter().filter(|t| t != text));
        next.truncate(TEXT_HISTORY_LIMIT);
        self.store.set(TEXT_HISTORY_KEY, &serde_json::to_string(&next)?)
    }

    /// Recorded analyses, newest first. Entries that no longer decode are skipped.
    pub fn analyses(&self) -> Vec<HistoryEntry> {
        self.store
            .get(ANALYSIS_HISTORY_KEY)
            .and_then(|raw| serde_json::from_str::<Vec<Value>>(&raw).ok())
            .map(|items| {
                items
                    .into_iter()
                    .filter_map(|v| serde_json::from_value(v).ok())
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn record(&self, entry: NewHistoryEntry) -> Result<HistoryEntry, StoreError> {
        let ts = now_ms();
        let suffix = uuid::Uuid::new_v4().simple().to_string();
        let recorded = HistoryEntry {
            id: format!("{ts}-{}", &suffix[..12]),
            ts,
            mode: entry.mode,
            text: entry.text,
            file_name: entry.file_name,
            model: entry.model,
            result: entry.result,
        };
        let mut next = Vec::with_capacity(ANALYSIS_HISTORY_LIMIT);
        next.push(recorded.clone());
        next.extend(self.analyses());
        next.truncate(ANALYSIS_HISTORY_LIMIT);
        self.store
            .set(ANALYSIS_HISTORY_KEY, &serde_json::to_string(&next)?)?;
        tracing::debug!(mode = %recorded.mode, id = %recorded.id, "history entry recorded");
        Ok(recorded)
    }

    pub fn clear_analyses(&self) -> Result<(), StoreError> {
        self.store.set(ANALYSIS_HISTORY_KEY, "[]")
    }
}
