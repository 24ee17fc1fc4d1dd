//! Typed facade over the sentiment API endpoints.

use std::time::Duration;

use reqwest::Method;
use sentix_core::{resolve_api_base, Config, Timeouts};
use sentix_protocol::{
    AnalysisResult, AnalyzeRequest, ArticleAnalysis, ArticleRequest, BatchResult, BenchmarkRequest,
    LiveNewsItem, LiveNewsRequest, ModelDescriptor, PredictRequest, RssIngestRequest,
    RssIngestResponse, YoutubeAnalysis, YoutubeRequest,
};
use serde::Serialize;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::http::{Body, ClientError, HttpClient, Payload, UploadFile, UploadForm, HTTP_TARGET};
use crate::retry::with_retry;

const WARMUP_BENCHMARK_TIMEOUT: Duration = Duration::from_millis(4_000);

fn to_body<T: Serialize>(req: &T) -> Result<Value, ClientError> {
    serde_json::to_value(req).map_err(|e| ClientError::Decode(e.to_string()))
}

#[derive(Clone)]
pub struct SentixApi {
    http: HttpClient,
    timeouts: Timeouts,
}

impl SentixApi {
    pub fn new(base: &str, timeouts: Timeouts) -> Result<Self, ClientError> {
        Ok(Self::with_http(HttpClient::new(base)?, timeouts))
    }

    pub fn with_http(http: HttpClient, timeouts: Timeouts) -> Self {
        Self { http, timeouts }
    }

    /// Client for the API base resolved from `flag`, the environment and `cfg`.
    pub fn from_config(flag: Option<&str>, cfg: &Config) -> Result<Self, ClientError> {
        Self::new(&resolve_api_base(flag, cfg), cfg.timeouts())
    }

    pub fn http(&self) -> &HttpClient {
        &self.http
    }

    pub fn timeouts(&self) -> &Timeouts {
        &self.timeouts
    }

    async fn post<T: Serialize>(
        &self,
        path: &str,
        req: &T,
        timeout: Duration,
        cancel: Option<&CancellationToken>,
    ) -> Result<Payload, ClientError> {
        self.http.post_json(path, to_body(req)?, timeout, cancel).await
    }

    async fn post_with_retry<T: Serialize>(
        &self,
        path: &str,
        req: &T,
        timeout: Duration,
        cancel: Option<&CancellationToken>,
    ) -> Result<Payload, ClientError> {
        let body = Body::Json(to_body(req)?);
        with_retry(path, timeout, |t| self.http.request(Method::POST, path, &body, t, cancel)).await
    }

    /// `GET /models`, normalized so `available` never repeats `default`.
    pub async fn get_models(&self, cancel: Option<&CancellationToken>) -> Result<ModelDescriptor, ClientError> {
        let raw = self.http.get("/models", self.timeouts.models, cancel).await?;
        Ok(ModelDescriptor::from_response(&raw.into_json()))
    }

    pub async fn predict(
        &self,
        req: &PredictRequest,
        timeout: Duration,
        cancel: Option<&CancellationToken>,
    ) -> Result<AnalysisResult, ClientError> {
        self.post_with_retry("/predict", req, timeout, cancel).await?.decode()
    }

    pub async fn analyze(
        &self,
        req: &AnalyzeRequest,
        timeout: Duration,
        cancel: Option<&CancellationToken>,
    ) -> Result<AnalysisResult, ClientError> {
        self.post_with_retry("/analyze", req, timeout, cancel).await?.decode()
    }

    /// Multipart `POST /batch`. `models` is a comma-separated model list.
    pub async fn batch_analyze(
        &self,
        file: &UploadFile,
        models: Option<&str>,
        timeout: Duration,
        cancel: Option<&CancellationToken>,
    ) -> Result<BatchResult, ClientError> {
        let mut form = UploadForm::new(file.clone());
        if let Some(models) = models.filter(|m| !m.is_empty()) {
            form = form.field("models", models);
        }
        let body = Body::Upload(form);
        with_retry("/batch", timeout, |t| self.http.request(Method::POST, "/batch", &body, t, cancel))
            .await?
            .decode()
    }

    pub async fn health(&self, cancel: Option<&CancellationToken>) -> Result<Value, ClientError> {
        Ok(self.http.get("/health", self.timeouts.diagnostics, cancel).await?.into_json())
    }

    pub async fn debug_onnx(&self, cancel: Option<&CancellationToken>) -> Result<Value, ClientError> {
        Ok(self.http.get("/debug/onnx", self.timeouts.diagnostics, cancel).await?.into_json())
    }

    pub async fn benchmark(
        &self,
        req: &BenchmarkRequest,
        cancel: Option<&CancellationToken>,
    ) -> Result<Value, ClientError> {
        Ok(self
            .post("/benchmark", req, self.timeouts.diagnostics, cancel)
            .await?
            .into_json())
    }

    /// Fire a benchmark and a fast predict so the backend loads its models. Failures are ignored.
    pub async fn warmup(&self) {
        let bench_req = BenchmarkRequest::default();
        let predict_req = PredictRequest::warmup();
        let bench = self.post("/benchmark", &bench_req, WARMUP_BENCHMARK_TIMEOUT, None);
        let predict = self.post("/predict", &predict_req, self.timeouts.fast, None);
        let (bench, predict) = tokio::join!(bench, predict);
        if let Err(err) = bench {
            debug!(target: HTTP_TARGET, error = %err, "warmup benchmark failed");
        }
        if let Err(err) = predict {
            debug!(target: HTTP_TARGET, error = %err, "warmup predict failed");
        }
    }

    pub async fn ingest_rss(
        &self,
        req: &RssIngestRequest,
        cancel: Option<&CancellationToken>,
    ) -> Result<RssIngestResponse, ClientError> {
        self.post("/stream/news/rss", req, self.timeouts.news, cancel)
            .await?
            .decode()
    }

    pub async fn analyze_article(
        &self,
        req: &ArticleRequest,
        cancel: Option<&CancellationToken>,
    ) -> Result<ArticleAnalysis, ClientError> {
        self.post("/stream/news/article", req, self.timeouts.news, cancel)
            .await?
            .decode()
    }

    /// Live snapshot; any response that is not a JSON array yields no items.
    pub async fn live_news(
        &self,
        req: &LiveNewsRequest,
        cancel: Option<&CancellationToken>,
    ) -> Result<Vec<LiveNewsItem>, ClientError> {
        match self
            .post("/stream/news/live", req, self.timeouts.news, cancel)
            .await?
            .into_json()
        {
            Value::Array(items) => Ok(items
                .into_iter()
                .filter_map(|v| serde_json::from_value(v).ok())
                .collect()),
            _ => Ok(Vec::new()),
        }
    }

    /// One attempt at `POST /stream/youtube/full`; the YouTube flow layers its own retries on top.
    pub async fn youtube_full(
        &self,
        req: &YoutubeRequest,
        timeout: Duration,
        cancel: Option<&CancellationToken>,
    ) -> Result<YoutubeAnalysis, ClientError> {
        self.post("/stream/youtube/full", req, timeout, cancel)
            .await?
            .decode()
    }
}
