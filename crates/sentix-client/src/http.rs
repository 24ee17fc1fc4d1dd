//! Request helper: per-call timeout, cancellation bridging and JSON/text negotiation.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use reqwest::header::CONTENT_TYPE;
use reqwest::{multipart, Method};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Tracing target for request-level events; the rolling request log subscribes to it.
pub const HTTP_TARGET: &str = "sentix.http";

fn env_u64(key: &str, default: u64) -> u64 {
    std::env::var(key)
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .unwrap_or(default)
}

fn connect_timeout() -> Duration {
    Duration::from_secs(env_u64("SENTIX_HTTP_CONNECT_TIMEOUT_SECS", 3).max(1))
}

fn keepalive() -> Duration {
    Duration::from_secs(env_u64("SENTIX_HTTP_TCP_KEEPALIVE_SECS", 60).max(1))
}

fn pool_idle() -> Duration {
    Duration::from_secs(env_u64("SENTIX_HTTP_POOL_IDLE_SECS", 90).max(1))
}

fn user_agent() -> String {
    format!("sentix/{}", env!("CARGO_PKG_VERSION"))
}

/// Base client builder with harmonized defaults. Request timeouts are applied per call.
pub fn builder() -> reqwest::ClientBuilder {
    reqwest::Client::builder()
        .user_agent(user_agent())
        .connect_timeout(connect_timeout())
        .tcp_keepalive(keepalive())
        .pool_idle_timeout(pool_idle())
}

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("request timeout")]
    Timeout,
    #[error("request aborted")]
    Aborted,
    #[error("HTTP {status} {status_text}{}", body_suffix(.body))]
    Http {
        status: u16,
        status_text: String,
        body: String,
    },
    #[error("network error: {0}")]
    Network(String),
    #[error("invalid response: {0}")]
    Decode(String),
    #[error("{0}")]
    Io(#[from] std::io::Error),
}

fn body_suffix(body: &str) -> String {
    if body.is_empty() {
        String::new()
    } else {
        format!(": {body}")
    }
}

impl ClientError {
    /// Failures eligible for the single doubled-timeout retry.
    pub fn is_timeout_class(&self) -> bool {
        match self {
            ClientError::Timeout | ClientError::Aborted => true,
            other => other.to_string().to_lowercase().contains("timeout"),
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Most specific message available: a JSON `detail` field, the raw body, else the display text.
    pub fn detail(&self) -> String {
        let ClientError::Http { status, body, .. } = self else {
            return self.to_string();
        };
        match serde_json::from_str::<Value>(body) {
            Ok(Value::Object(map)) => match map.get("detail") {
                Some(Value::String(s)) if !s.is_empty() => s.clone(),
                Some(v) if !v.is_null() => v.to_string(),
                _ => Value::Object(map).to_string(),
            },
            Ok(other) => other.to_string(),
            Err(_) if body.trim().is_empty() => format!("HTTP {status}"),
            Err(_) => body.clone(),
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ClientError::Timeout
        } else if err.is_decode() {
            ClientError::Decode(err.to_string())
        } else {
            ClientError::Network(err.to_string())
        }
    }
}

/// Response body, negotiated by `Content-Type`.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Json(Value),
    Text(String),
}

impl Payload {
    /// JSON view of the payload; text that happens to be JSON is parsed, other text becomes a string.
    pub fn into_json(self) -> Value {
        match self {
            Payload::Json(v) => v,
            Payload::Text(t) => serde_json::from_str(&t).unwrap_or(Value::String(t)),
        }
    }

    pub fn decode<T: DeserializeOwned>(self) -> Result<T, ClientError> {
        serde_json::from_value(self.into_json()).map_err(|e| ClientError::Decode(e.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFile {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl UploadFile {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes,
        }
    }

    pub async fn from_path(path: &std::path::Path) -> Result<Self, ClientError> {
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self { file_name, bytes })
    }
}

/// Multipart body: one `file` part plus plain text fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadForm {
    pub file: UploadFile,
    pub fields: Vec<(String, String)>,
}

impl UploadForm {
    pub fn new(file: UploadFile) -> Self {
        Self {
            file,
            fields: Vec::new(),
        }
    }

    pub fn field(mut self, name: &str, value: &str) -> Self {
        self.fields.push((name.to_string(), value.to_string()));
        self
    }

    // A multipart form is consumed by sending, so each attempt builds a fresh one.
    fn to_multipart(&self) -> multipart::Form {
        let part = multipart::Part::bytes(self.file.bytes.clone()).file_name(self.file.file_name.clone());
        self.fields
            .iter()
            .fold(multipart::Form::new().part("file", part), |form, (k, v)| {
                form.text(k.clone(), v.clone())
            })
    }
}

#[derive(Debug, Clone)]
pub enum Body {
    Empty,
    Json(Value),
    Upload(UploadForm),
}

struct InflightGuard<'a>(&'a AtomicUsize);

impl<'a> InflightGuard<'a> {
    fn enter(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for InflightGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[derive(Clone)]
pub struct HttpClient {
    base: String,
    client: reqwest::Client,
    inflight: Arc<AtomicUsize>,
}

impl HttpClient {
    pub fn new(base: &str) -> Result<Self, ClientError> {
        let client = builder().build()?;
        Ok(Self::with_client(base, client))
    }

    pub fn with_client(base: &str, client: reqwest::Client) -> Self {
        Self {
            base: base.trim_end_matches('/').to_string(),
            client,
            inflight: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    /// Requests currently running through this client (and its clones).
    pub fn inflight(&self) -> usize {
        self.inflight.load(Ordering::SeqCst)
    }

    pub async fn get(
        &self,
        path: &str,
        timeout: Duration,
        cancel: Option<&CancellationToken>,
    ) -> Result<Payload, ClientError> {
        self.request(Method::GET, path, &Body::Empty, timeout, cancel).await
    }

    pub async fn post_json(
        &self,
        path: &str,
        body: Value,
        timeout: Duration,
        cancel: Option<&CancellationToken>,
    ) -> Result<Payload, ClientError> {
        self.request(Method::POST, path, &Body::Json(body), timeout, cancel)
            .await
    }

    /// Run one request. The call fails with [`ClientError::Timeout`] once `timeout` elapses and with
    /// [`ClientError::Aborted`] when `cancel` fires first; either way the in-flight request is dropped.
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        body: &Body,
        timeout: Duration,
        cancel: Option<&CancellationToken>,
    ) -> Result<Payload, ClientError> {
        let _inflight = InflightGuard::enter(&self.inflight);
        let token = cancel.map(CancellationToken::child_token).unwrap_or_default();
        let url = self.url(path);
        debug!(
            target: HTTP_TARGET,
            %method,
            %url,
            timeout_ms = timeout.as_millis() as u64,
            "request"
        );
        let result = tokio::select! {
            biased;
            _ = token.cancelled() => Err(ClientError::Aborted),
            _ = tokio::time::sleep(timeout) => {
                token.cancel();
                Err(ClientError::Timeout)
            }
            res = self.send(method, &url, body) => res,
        };
        match &result {
            Ok(_) => debug!(target: HTTP_TARGET, %url, "ok"),
            Err(err) => debug!(target: HTTP_TARGET, %url, error = %err, "failed"),
        }
        result
    }

    async fn send(&self, method: Method, url: &str, body: &Body) -> Result<Payload, ClientError> {
        let req = self.client.request(method, url);
        let req = match body {
            Body::Empty => req,
            Body::Json(v) => req.json(v),
            Body::Upload(form) => req.multipart(form.to_multipart()),
        };
        let resp = req.send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ClientError::Http {
                status: status.as_u16(),
                status_text: status.canonical_reason().unwrap_or_default().to_string(),
                body,
            });
        }
        let is_json = resp
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.contains("application/json"));
        if is_json {
            Ok(Payload::Json(resp.json::<Value>().await?))
        } else {
            Ok(Payload::Text(resp.text().await?))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn http(status: u16, body: &str) -> ClientError {
        ClientError::Http {
            status,
            status_text: "Internal Server Error".into(),
            body: body.into(),
        }
    }

    #[test]
    fn http_error_display_carries_status_and_body() {
        assert_eq!(http(500, "boom").to_string(), "HTTP 500 Internal Server Error: boom");
        assert_eq!(http(500, "").to_string(), "HTTP 500 Internal Server Error");
    }

    #[test]
    fn timeout_classification() {
        assert!(ClientError::Timeout.is_timeout_class());
        assert!(ClientError::Aborted.is_timeout_class());
        assert!(ClientError::Network("gateway timeout upstream".into()).is_timeout_class());
        assert!(!http(500, "boom").is_timeout_class());
        assert!(!ClientError::Decode("eof".into()).is_timeout_class());
    }

    #[test]
    fn detail_prefers_json_detail() {
        assert_eq!(http(429, r#"{"detail":"Too many"}"#).detail(), "Too many");
        assert_eq!(http(400, r#"{"error":"x"}"#).detail(), r#"{"error":"x"}"#);
        assert_eq!(http(502, "bad gateway").detail(), "bad gateway");
        assert_eq!(http(503, "").detail(), "HTTP 503");
        assert_eq!(ClientError::Timeout.detail(), "request timeout");
    }

    #[test]
    fn payload_text_falls_back_to_string() {
        assert_eq!(Payload::Text("[1]".into()).into_json(), json!([1]));
        assert_eq!(Payload::Text("ok".into()).into_json(), json!("ok"));
    }
}
