#[cfg(test)]
pub mod env {
    use std::collections::BTreeMap;
    use std::sync::{Mutex, MutexGuard, PoisonError};

    const PREFIX: &str = "SENTIX_";

    static LOCK: Mutex<()> = Mutex::new(());

    /// Exclusive view of the process environment with no inherited `SENTIX_*` variables.
    ///
    /// Every key cleared on entry or touched through `set`/`remove` gets its original value back on drop.
    pub struct EnvGuard {
        _lock: MutexGuard<'static, ()>,
        original: BTreeMap<String, Option<String>>,
    }

    pub fn guard() -> EnvGuard {
        let mut guard = EnvGuard {
            _lock: LOCK.lock().unwrap_or_else(PoisonError::into_inner),
            original: BTreeMap::new(),
        };
        let inherited: Vec<String> = std::env::vars_os()
            .filter_map(|(k, _)| k.into_string().ok())
            .filter(|k| k.starts_with(PREFIX))
            .collect();
        for key in inherited {
            guard.remove(&key);
        }
        guard
    }

    impl EnvGuard {
        fn touch(&mut self, key: &str) {
            self.original
                .entry(key.to_string())
                .or_insert_with(|| std::env::var(key).ok());
        }

        pub fn set(&mut self, key: &str, value: &str) {
            self.touch(key);
            std::env::set_var(key, value);
        }

        pub fn remove(&mut self, key: &str) {
            self.touch(key);
            std::env::remove_var(key);
        }
    }

    impl Drop for EnvGuard {
        fn drop(&mut self) {
            for (key, value) in std::mem::take(&mut self.original) {
                match value {
                    Some(v) => std::env::set_var(&key, v),
                    None => std::env::remove_var(&key),
                }
            }
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use serial_test::serial;

        #[test]
        #[serial]
        fn inherited_sentix_vars_are_hidden_then_restored() {
            std::env::set_var("SENTIX_GUARD_INHERITED", "outer");
            {
                let mut g = guard();
                assert!(std::env::var("SENTIX_GUARD_INHERITED").is_err());
                g.set("SENTIX_GUARD_NEW", "inner");
                g.set("SENTIX_GUARD_NEW", "again");
            }
            assert_eq!(std::env::var("SENTIX_GUARD_INHERITED").as_deref(), Ok("outer"));
            assert!(std::env::var("SENTIX_GUARD_NEW").is_err());
            std::env::remove_var("SENTIX_GUARD_INHERITED");
        }
    }
}

#[cfg(test)]
pub mod scratch {
    use std::sync::Arc;

    use tempfile::TempDir;

    use crate::store::{FileStore, KvStore, STORE_FILE_NAME};

    /// File-backed store in a fresh temporary directory; the directory lives as long as the returned handle.
    pub fn file_store() -> (TempDir, Arc<FileStore>) {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FileStore::in_dir(dir.path()).expect("open store");
        (dir, Arc::new(store))
    }

    /// Second handle on the same file, as a new process would open it.
    pub fn reopen(dir: &TempDir) -> Arc<dyn KvStore> {
        Arc::new(FileStore::new(dir.path().join(STORE_FILE_NAME)))
    }
}
