//! Local side of the Sentix client: configuration, persistence, history and
//! the display derivations computed over API results.

pub mod analytics;
mod config;
pub use config::{
    config_schema_json, default_config_path, load_config, load_effective_config, parse_config,
    resolve_api_base, write_schema_file, ApiConfig, BatchConfig, Config, StorageConfig, Timeouts,
    TimeoutsConfig, DEFAULT_API_BASE, DEFAULT_DEEP_CONCURRENCY,
};
pub mod errors;
pub mod history;
pub mod links;
pub mod prefs;
pub mod store;
pub mod upload;
pub mod util;

#[cfg(test)]
mod test_support;

pub use errors::friendly_error;
pub use history::History;
pub use prefs::Prefs;
pub use store::{default_data_dir, FileStore, KvStore, MemoryStore, StoreError};
