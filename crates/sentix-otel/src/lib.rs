use once_cell::sync::OnceCell;
use sentix_core::util::parse_bool_flag;
use tracing_subscriber::filter::Targets;
use tracing_subscriber::{
    fmt,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
    EnvFilter,
};

/// Target the HTTP helper logs request events under.
pub const REQUEST_LOG_TARGET: &str = "sentix.http";

static REQUEST_LOG_GUARD: OnceCell<tracing_appender::non_blocking::WorkerGuard> = OnceCell::new();

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rotation {
    Minutely,
    Hourly,
    Daily,
}

/// Rolling request log settings, read from `SENTIX_REQUEST_LOG_*`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestLogConfig {
    pub dir: String,
    pub prefix: String,
    pub rotation: Rotation,
}

impl RequestLogConfig {
    /// `None` unless `SENTIX_REQUEST_LOG_ROLL` is truthy.
    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Option<Self> {
        let enabled = get("SENTIX_REQUEST_LOG_ROLL")
            .as_deref()
            .and_then(parse_bool_flag)
            .unwrap_or(false);
        if !enabled {
            return None;
        }
        let dir = get("SENTIX_REQUEST_LOG_DIR")
            .or_else(|| get("SENTIX_LOGS_DIR"))
            .unwrap_or_else(|| "logs".to_string());
        let prefix = get("SENTIX_REQUEST_LOG_PREFIX").unwrap_or_else(|| "sentix-http".into());
        let rotation = match get("SENTIX_REQUEST_LOG_ROTATION")
            .unwrap_or_default()
            .to_lowercase()
            .as_str()
        {
            "hourly" => Rotation::Hourly,
            "minutely" => Rotation::Minutely,
            _ => Rotation::Daily,
        };
        Some(Self {
            dir,
            prefix,
            rotation,
        })
    }

    pub fn from_env() -> Option<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }
}

/// Console tracing filtered by `RUST_LOG` (default `info`), plus the optional request log.
pub fn init() {
    init_with_default("info");
}

/// Like [`init`], with the directive used when `RUST_LOG` is unset.
pub fn init_with_default(default_directive: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));
    install_console(filter, RequestLogConfig::from_env());
}

fn install_console(filter: EnvFilter, request_log: Option<RequestLogConfig>) {
    let fmt_layer = fmt::layer().with_writer(std::io::stderr);
    let registry = tracing_subscriber::registry().with(fmt_layer.with_filter(filter));
    let Some(cfg) = request_log else {
        let _ = registry.try_init();
        return;
    };
    if std::fs::create_dir_all(&cfg.dir).is_err() {
        tracing::warn!(directory = %cfg.dir, "failed to create request log directory");
    }
    let writer = match cfg.rotation {
        Rotation::Hourly => tracing_appender::rolling::hourly(&cfg.dir, &cfg.prefix),
        Rotation::Minutely => tracing_appender::rolling::minutely(&cfg.dir, &cfg.prefix),
        Rotation::Daily => tracing_appender::rolling::daily(&cfg.dir, &cfg.prefix),
    };
    let (nb, guard) = tracing_appender::non_blocking(writer);
    let _ = REQUEST_LOG_GUARD.set(guard);
    let targets = Targets::new().with_target(REQUEST_LOG_TARGET, tracing::Level::DEBUG);
    let request_layer = fmt::layer()
        .with_ansi(false)
        .with_target(false)
        .with_writer(nb)
        .with_filter(targets);
    let _ = registry.with(request_layer).try_init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn request_log_is_opt_in() {
        assert_eq!(RequestLogConfig::from_lookup(lookup(&[])), None);
        assert_eq!(
            RequestLogConfig::from_lookup(lookup(&[("SENTIX_REQUEST_LOG_ROLL", "0")])),
            None
        );
    }

    #[test]
    fn request_log_settings() {
        let cfg = RequestLogConfig::from_lookup(lookup(&[
            ("SENTIX_REQUEST_LOG_ROLL", "yes"),
            ("SENTIX_LOGS_DIR", "/tmp/sentix-logs"),
            ("SENTIX_REQUEST_LOG_ROTATION", "Hourly"),
        ]))
        .unwrap();
        assert_eq!(cfg.dir, "/tmp/sentix-logs");
        assert_eq!(cfg.prefix, "sentix-http");
        assert_eq!(cfg.rotation, Rotation::Hourly);

        let cfg = RequestLogConfig::from_lookup(lookup(&[
            ("SENTIX_REQUEST_LOG_ROLL", "1"),
            ("SENTIX_REQUEST_LOG_DIR", "req"),
            ("SENTIX_LOGS_DIR", "ignored"),
        ]))
        .unwrap();
        assert_eq!(cfg.dir, "req");
        assert_eq!(cfg.rotation, Rotation::Daily);
    }
}
