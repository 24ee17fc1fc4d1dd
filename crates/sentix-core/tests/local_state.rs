use std::sync::Arc;

use sentix_core::history::{ANALYSIS_HISTORY_LIMIT, TEXT_HISTORY_KEY, TEXT_HISTORY_LIMIT};
use sentix_core::prefs::{LAST_TEXT_KEY, RAIL_COLLAPSED_KEY, YT_LAST_URL_KEY};
use sentix_core::{load_config, FileStore, History, KvStore, Prefs};
use sentix_protocol::{HistoryMode, NewHistoryEntry};
use serde_json::json;

fn shared_store(dir: &std::path::Path) -> Arc<dyn KvStore> {
    Arc::new(FileStore::in_dir(dir).unwrap())
}

#[test]
fn history_and_prefs_share_one_file() {
    let dir = tempfile::tempdir().unwrap();
    let store = shared_store(dir.path());
    let history = History::new(store.clone());
    let prefs = Prefs::new(store.clone());

    for i in 0..(TEXT_HISTORY_LIMIT + 3) {
        history.push_text(&format!("text {i}")).unwrap();
    }
    prefs.set_last_text("draft").unwrap();
    prefs.set_rail_collapsed(true).unwrap();
    prefs.set_yt_last_url("https://youtu.be/abc").unwrap();

    let raw: Vec<String> = serde_json::from_str(&store.get(TEXT_HISTORY_KEY).unwrap()).unwrap();
    assert_eq!(raw.len(), TEXT_HISTORY_LIMIT);
    assert_eq!(raw[0], format!("text {}", TEXT_HISTORY_LIMIT + 2));

    let reopened = shared_store(dir.path());
    assert_eq!(reopened.get(LAST_TEXT_KEY).as_deref(), Some("draft"));
    assert_eq!(reopened.get(RAIL_COLLAPSED_KEY).as_deref(), Some("true"));
    assert_eq!(
        reopened.get(YT_LAST_URL_KEY).as_deref(),
        Some("https://youtu.be/abc")
    );
    assert!(Prefs::new(reopened).rail_collapsed());
}

#[test]
fn analysis_history_is_capped_and_newest_first() {
    let dir = tempfile::tempdir().unwrap();
    let history = History::new(shared_store(dir.path()));
    for i in 0..(ANALYSIS_HISTORY_LIMIT + 2) {
        history
            .record(NewHistoryEntry::text(
                HistoryMode::Single,
                &format!("row {i}"),
                "onnx-optimized",
                json!({ "sentiment": "neutral" }),
            ))
            .unwrap();
    }
    let entries = history.analyses();
    assert_eq!(entries.len(), ANALYSIS_HISTORY_LIMIT);
    assert_eq!(
        entries[0].text.as_deref(),
        Some(format!("row {}", ANALYSIS_HISTORY_LIMIT + 1).as_str())
    );

    history.clear_analyses().unwrap();
    assert!(History::new(shared_store(dir.path())).analyses().is_empty());
}

#[test]
fn config_file_on_disk_drives_timeouts_and_storage() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sentix.toml");
    std::fs::write(
        &path,
        "[timeouts]\nyoutube_ms = 30000\n\n[batch]\ndeep_concurrency = 5\n\n[storage]\ndir = \"/tmp/sentix-state\"\n",
    )
    .unwrap();
    let cfg = load_config(path.to_str().unwrap()).unwrap();
    assert_eq!(cfg.timeouts().youtube, std::time::Duration::from_secs(30));
    assert_eq!(cfg.deep_concurrency(), 5);
    assert_eq!(cfg.storage.dir.as_deref(), Some("/tmp/sentix-state"));

    assert!(load_config(dir.path().join("missing.toml").to_str().unwrap()).is_err());
}
