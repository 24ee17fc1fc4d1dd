use std::sync::Arc;

use crate::store::{KvStore, StoreError};

pub const LAST_TEXT_KEY: &str = "sentix:lastText";
pub const RAIL_COLLAPSED_KEY: &str = "railCollapsed";
pub const YT_LAST_URL_KEY: &str = "yt_last_url";

/// Small UI preferences shared with the web dashboard.
#[derive(Clone)]
pub struct Prefs {
    store: Arc<dyn KvStore>,
}

impl Prefs {
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self { store }
    }

    pub fn last_text(&self) -> String {
        self.store.get(LAST_TEXT_KEY).unwrap_or_default()
    }

    pub fn set_last_text(&self, text: &str) -> Result<(), StoreError> {
        self.store.set(LAST_TEXT_KEY, text)
    }

    pub fn clear_last_text(&self) -> Result<(), StoreError> {
        self.store.remove(LAST_TEXT_KEY)
    }

    /// Stored as a JSON boolean; anything else reads as `false`.
    pub fn rail_collapsed(&self) -> bool {
        self.store
            .get(RAIL_COLLAPSED_KEY)
            .and_then(|raw| serde_json::from_str::<bool>(&raw).ok())
            .unwrap_or(false)
    }

    pub fn set_rail_collapsed(&self, collapsed: bool) -> Result<(), StoreError> {
        self.store
            .set(RAIL_COLLAPSED_KEY, &serde_json::to_string(&collapsed)?)
    }

    pub fn yt_last_url(&self) -> Option<String> {
        self.store.get(YT_LAST_URL_KEY).filter(|u| !u.is_empty())
    }

    pub fn set_yt_last_url(&self, url: &str) -> Result<(), StoreError> {
        self.store.set(YT_LAST_URL_KEY, url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[test]
    fn rail_collapsed_defaults_and_tolerates_garbage() {
        let store = Arc::new(MemoryStore::new());
        let prefs = Prefs::new(store.clone());
        assert!(!prefs.rail_collapsed());
        prefs.set_rail_collapsed(true).unwrap();
        assert_eq!(store.get(RAIL_COLLAPSED_KEY).as_deref(), Some("true"));
        assert!(prefs.rail_collapsed());
        store.set(RAIL_COLLAPSED_KEY, "yes please").unwrap();
        assert!(!prefs.rail_collapsed());
    }

    #[test]
    fn last_text_and_url() {
        let prefs = Prefs::new(Arc::new(MemoryStore::new()));
        assert_eq!(prefs.last_text(), "");
        prefs.set_last_text("draft").unwrap();
        assert_eq!(prefs.last_text(), "draft");
        prefs.clear_last_text().unwrap();
        assert_eq!(prefs.last_text(), "");
        assert_eq!(prefs.yt_last_url(), None);
        prefs.set_yt_last_url("https://youtu.be/abc").unwrap();
        assert_eq!(prefs.yt_last_url().as_deref(), Some("https://youtu.be/abc"));
    }
}
