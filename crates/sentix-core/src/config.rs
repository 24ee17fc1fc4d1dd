use anyhow::Result;
use jsonschema::{validator_for, Validator};
use once_cell::sync::Lazy;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Fallback when neither flag, build, environment nor config names an API base.
pub const DEFAULT_API_BASE: &str = "http://localhost:8001";
pub const DEFAULT_DEEP_CONCURRENCY: usize = 3;

#[derive(Debug, Default, Clone, Deserialize, Serialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct ApiConfig {
    /// Base URL of the sentiment API, e.g. <http://localhost:8001>
    #[serde(default)]
    pub base: Option<String>,
    /// Preferred model id; the server default is used when unset.
    #[serde(default)]
    pub model: Option<String>,
}

/// Per-endpoint request timeouts in milliseconds.
#[derive(Debug, Default, Clone, Deserialize, Serialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct TimeoutsConfig {
    #[serde(default)]
    pub models_ms: Option<u64>,
    #[serde(default)]
    pub predict_ms: Option<u64>,
    /// `/analyze` calls outside the analysis session, such as the YouTube transcript pass.
    #[serde(default)]
    pub analyze_ms: Option<u64>,
    /// Multi-model comparison uploads.
    #[serde(default)]
    pub batch_ms: Option<u64>,
    #[serde(default)]
    pub diagnostics_ms: Option<u64>,
    #[serde(default)]
    pub youtube_ms: Option<u64>,
    #[serde(default)]
    pub news_ms: Option<u64>,
    /// Deep analysis issued by the analysis session (single text, row, batch deep-all).
    #[serde(default)]
    pub deep_ms: Option<u64>,
    /// Fast prediction used as the deep-analysis fallback.
    #[serde(default)]
    pub fast_ms: Option<u64>,
    /// Batch upload issued by the analysis session.
    #[serde(default)]
    pub batch_upload_ms: Option<u64>,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct BatchConfig {
    /// Concurrent `/analyze` calls during batch deep-all.
    #[serde(default)]
    #[schemars(range(min = 1))]
    pub deep_concurrency: Option<usize>,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Directory holding the local key-value store.
    #[serde(default)]
    pub dir: Option<String>,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub timeouts: TimeoutsConfig,
    #[serde(default)]
    pub batch: BatchConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

static CONFIG_SCHEMA: Lazy<Validator> = Lazy::new(|| {
    let schema = schemars::schema_for!(Config);
    let schema_value = serde_json::to_value(&schema).expect("schema value");
    validator_for(&schema_value).expect("valid schema")
});

/// Returns the JSON schema describing the configuration file.
///
/// # Panics
///
/// Panics if schema generation fails; this indicates a programming error.
pub fn config_schema_json() -> serde_json::Value {
    let schema = schemars::schema_for!(Config);
    serde_json::to_value(&schema).expect("schema json")
}

pub fn write_schema_file(path: &str) -> std::io::Result<()> {
    let schema_json = config_schema_json();
    std::fs::write(path, serde_json::to_string_pretty(&schema_json)?)
}

pub fn load_config(path: &str) -> Result<Config> {
    let content = std::fs::read_to_string(path)?;
    parse_config(&content)
}

/// Validate TOML text against the schema, then decode it.
pub fn parse_config(content: &str) -> Result<Config> {
    let raw: toml::Value = toml::from_str(content)?;
    let json_value = serde_json::to_value(&raw)?;
    let validation_errors: Vec<_> = CONFIG_SCHEMA
        .iter_errors(&json_value)
        .map(|e| e.to_string())
        .collect();
    if !validation_errors.is_empty() {
        return Err(anyhow::anyhow!(validation_errors.join(", ")));
    }
    let cfg: Config = toml::from_str(content)?;
    Ok(cfg)
}

/// Location of the config file: `SENTIX_CONFIG`, else `<user config dir>/sentix.toml`.
pub fn default_config_path() -> Option<PathBuf> {
    if let Ok(p) = std::env::var("SENTIX_CONFIG") {
        if !p.trim().is_empty() {
            return Some(PathBuf::from(p));
        }
    }
    directories::ProjectDirs::from("org", "sentix", "sentix")
        .map(|dirs| dirs.config_dir().join("sentix.toml"))
}

/// Load the config file if one exists. A broken file is logged and ignored.
pub fn load_effective_config() -> Config {
    let Some(path) = default_config_path() else {
        return Config::default();
    };
    if !path.exists() {
        return Config::default();
    }
    match path.to_str().map(load_config) {
        Some(Ok(cfg)) => cfg,
        Some(Err(e)) => {
            tracing::error!("invalid config {}: {}", path.display(), e);
            Config::default()
        }
        None => Config::default(),
    }
}

fn non_blank(raw: Option<&str>) -> Option<String> {
    raw.map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.trim_end_matches('/').to_string())
}

/// Resolve the API base URL.
///
/// Order: explicit flag, value baked in at build time via `SENTIX_API_BASE`,
/// runtime `SENTIX_API_BASE`, config `api.base`, then [`DEFAULT_API_BASE`].
/// Trailing slashes are removed.
pub fn resolve_api_base(flag: Option<&str>, cfg: &Config) -> String {
    let runtime = std::env::var("SENTIX_API_BASE").ok();
    non_blank(flag)
        .or_else(|| non_blank(option_env!("SENTIX_API_BASE")))
        .or_else(|| non_blank(runtime.as_deref()))
        .or_else(|| non_blank(cfg.api.base.as_deref()))
        .unwrap_or_else(|| DEFAULT_API_BASE.to_string())
}

/// Effective request timeouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    pub models: Duration,
    pub predict: Duration,
    pub analyze: Duration,
    pub batch: Duration,
    pub diagnostics: Duration,
    pub youtube: Duration,
    pub news: Duration,
    pub deep: Duration,
    pub fast: Duration,
    pub batch_upload: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            models: Duration::from_millis(7_000),
            predict: Duration::from_millis(6_000),
            analyze: Duration::from_millis(12_000),
            batch: Duration::from_millis(12_000),
            diagnostics: Duration::from_millis(5_000),
            youtube: Duration::from_millis(25_000),
            news: Duration::from_millis(60_000),
            deep: Duration::from_millis(7_000),
            fast: Duration::from_millis(3_000),
            batch_upload: Duration::from_millis(7_000),
        }
    }
}

impl Timeouts {
    pub fn from_config(cfg: &TimeoutsConfig) -> Self {
        let d = Self::default();
        let pick = |v: Option<u64>, fallback: Duration| {
            v.filter(|ms| *ms > 0)
                .map(Duration::from_millis)
                .unwrap_or(fallback)
        };
        Self {
            models: pick(cfg.models_ms, d.models),
            predict: pick(cfg.predict_ms, d.predict),
            analyze: pick(cfg.analyze_ms, d.analyze),
            batch: pick(cfg.batch_ms, d.batch),
            diagnostics: pick(cfg.diagnostics_ms, d.diagnostics),
            youtube: pick(cfg.youtube_ms, d.youtube),
            news: pick(cfg.news_ms, d.news),
            deep: pick(cfg.deep_ms, d.deep),
            fast: pick(cfg.fast_ms, d.fast),
            batch_upload: pick(cfg.batch_upload_ms, d.batch_upload),
        }
    }
}

impl Config {
    pub fn timeouts(&self) -> Timeouts {
        Timeouts::from_config(&self.timeouts)
    }

    pub fn deep_concurrency(&self) -> usize {
        self.batch
            .deep_concurrency
            .filter(|n| *n > 0)
            .unwrap_or(DEFAULT_DEEP_CONCURRENCY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::env;
    use serial_test::serial;

    #[test]
    fn parses_sections_and_applies_defaults() {
        let cfg = parse_config(
            r#"
            [api]
            base = "http://sent.example:9000/"
            [timeouts]
            analyze_ms = 20000
            [batch]
            deep_concurrency = 5
            "#,
        )
        .unwrap();
        let t = cfg.timeouts();
        assert_eq!(t.analyze, Duration::from_millis(20_000));
        assert_eq!(t.predict, Duration::from_millis(6_000));
        assert_eq!(cfg.deep_concurrency(), 5);
    }

    #[test]
    fn schema_rejects_wrong_types_and_unknown_keys() {
        let err = parse_config("[batch]\ndeep_concurrency = \"three\"\n").unwrap_err();
        assert!(err.to_string().contains("three"), "{err}");
        assert!(parse_config("[api]\nbogus = 1\n").is_err());
        assert!(parse_config("[batch]\ndeep_concurrency = 0\n").is_err());
    }

    #[test]
    #[serial]
    fn api_base_resolution_order() {
        let mut guard = env::guard();
        guard.remove("SENTIX_API_BASE");
        let mut cfg = Config::default();
        if option_env!("SENTIX_API_BASE").is_none() {
            assert_eq!(resolve_api_base(None, &cfg), DEFAULT_API_BASE);
            cfg.api.base = Some("http://from-config/".into());
            assert_eq!(resolve_api_base(None, &cfg), "http://from-config");
            guard.set("SENTIX_API_BASE", "http://from-env");
            assert_eq!(resolve_api_base(None, &cfg), "http://from-env");
        }
        assert_eq!(
            resolve_api_base(Some("http://flag//"), &cfg),
            "http://flag"
        );
        assert!(!resolve_api_base(Some("  "), &Config::default()).is_empty());
    }

    #[test]
    fn schema_json_lists_sections() {
        let schema = config_schema_json();
        for key in ["api", "timeouts", "batch", "storage"] {
            assert!(schema["properties"].get(key).is_some(), "missing {key}");
        }
    }
}
