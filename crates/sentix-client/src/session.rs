//! Single-text and batch analysis controller.

use std::sync::Arc;

use sentix_core::upload::{check_upload_name, UnsupportedFile};
use sentix_core::{History, Prefs, StoreError, DEFAULT_DEEP_CONCURRENCY};
use sentix_protocol::{
    AnalysisResult, AnalyzeRequest, BatchResult, DeepRowOutcome, HistoryEntry, HistoryMode,
    ModelDescriptor, NewHistoryEntry, PredictRequest, DEFAULT_MODEL,
};
use serde::Serialize;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::api::SentixApi;
use crate::cancel::InFlightSlot;
use crate::fanout::run_indexed;
use crate::http::{ClientError, UploadFile};

pub const FAST_FALLBACK_NOTE: &str = "Deep analysis timed out; showing fast prediction.";
pub const BATCH_DEEP_ALL_FILE_NAME: &str = "(batch deep all)";
pub const SAMPLE_TEXT: &str =
    "I love the camera quality, but the battery drains fast. Support was helpful though.";

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Please enter text or choose a CSV/XLSX.")]
    EmptyInput,
    #[error(transparent)]
    UnsupportedFile(#[from] UnsupportedFile),
    #[error("Run Deep Analysis on a file first.")]
    NoBatchRows,
    #[error("Deep analysis canceled or timed out. Try again.")]
    DeepCanceled,
    #[error("Per-row deep analysis canceled or timed out. Try again or pick a shorter row.")]
    RowCanceled,
    #[error("{0}")]
    Client(ClientError),
    #[error("failed to persist history: {0}")]
    Store(#[from] StoreError),
}

impl SessionError {
    fn from_client(err: ClientError, canceled: SessionError) -> Self {
        match err {
            ClientError::Timeout | ClientError::Aborted => canceled,
            other => SessionError::Client(other),
        }
    }
}

/// Result of a single-text run.
#[derive(Debug, Clone, PartialEq)]
pub enum SingleOutcome {
    Deep(AnalysisResult),
    /// The deep call failed and the fast prediction was shown instead.
    Fast { result: AnalysisResult, note: &'static str },
}

impl SingleOutcome {
    pub fn result(&self) -> &AnalysisResult {
        match self {
            SingleOutcome::Deep(r) | SingleOutcome::Fast { result: r, .. } => r,
        }
    }
}

fn history_value<T: Serialize>(v: &T) -> Value {
    serde_json::to_value(v).unwrap_or(Value::Null)
}

/// Controller for the analysis page: owns the selected model, the in-flight slot and history.
pub struct AnalysisSession {
    api: Arc<SentixApi>,
    history: History,
    prefs: Prefs,
    slot: InFlightSlot,
    model: String,
    deep_concurrency: usize,
}

impl AnalysisSession {
    pub fn new(api: Arc<SentixApi>, history: History, prefs: Prefs) -> Self {
        Self {
            api,
            history,
            prefs,
            slot: InFlightSlot::new(),
            model: DEFAULT_MODEL.to_string(),
            deep_concurrency: DEFAULT_DEEP_CONCURRENCY,
        }
    }

    pub fn with_deep_concurrency(mut self, n: usize) -> Self {
        self.deep_concurrency = n.max(1);
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn select_model(&mut self, model: &str) {
        self.model = model.to_string();
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    /// Discover models and select the server default. Failures fall back to the built-in model.
    pub async fn load_models(&mut self) -> ModelDescriptor {
        let models = match self.api.get_models(None).await {
            Ok(m) => m,
            Err(err) => {
                warn!(error = %err, "model discovery failed; using default model");
                ModelDescriptor::default()
            }
        };
        self.model = models.default.clone();
        models
    }

    pub async fn warmup(&self) {
        self.api.warmup().await;
    }

    /// Cancel whatever this session has in flight.
    pub fn cancel(&self) {
        self.slot.cancel();
    }

    /// Deep analysis of one text, falling back to a fast prediction when the deep call fails.
    pub async fn analyze_text(&self, text: &str) -> Result<SingleOutcome, SessionError> {
        if text.trim().is_empty() {
            return Err(SessionError::EmptyInput);
        }
        let token = self.slot.begin();
        self.history.push_text(text)?;
        self.prefs.set_last_text(text)?;
        let timeouts = self.api.timeouts();

        let deep = self
            .api
            .analyze(&AnalyzeRequest::deep(text, &self.model), timeouts.deep, Some(&token))
            .await;
        match deep {
            Ok(result) => {
                self.history.record(NewHistoryEntry::text(
                    HistoryMode::Single,
                    text,
                    &self.model,
                    history_value(&result),
                ))?;
                info!(model = %self.model, "deep analysis complete");
                Ok(SingleOutcome::Deep(result))
            }
            Err(err) => {
                warn!(error = %err, "deep analysis failed; falling back to fast prediction");
                let result = self
                    .api
                    .predict(&PredictRequest::fast(text, &self.model), timeouts.fast, Some(&token))
                    .await
                    .map_err(|e| SessionError::from_client(e, SessionError::DeepCanceled))?;
                self.history.record(NewHistoryEntry::text(
                    HistoryMode::SingleFast,
                    text,
                    &self.model,
                    history_value(&result),
                ))?;
                Ok(SingleOutcome::Fast {
                    result,
                    note: FAST_FALLBACK_NOTE,
                })
            }
        }
    }

    /// Upload a spreadsheet to `/batch`. A summary (or aggregate) is recorded in history.
    pub async fn analyze_file(&self, file: UploadFile) -> Result<BatchResult, SessionError> {
        check_upload_name(&file.file_name)?;
        let token = self.slot.begin();
        let out = self
            .api
            .batch_analyze(&file, None, self.api.timeouts().batch_upload, Some(&token))
            .await
            .map_err(|e| SessionError::from_client(e, SessionError::DeepCanceled))?;
        if let Some(summary) = out.summary_value() {
            self.history.record(NewHistoryEntry::file(
                HistoryMode::Batch,
                &file.file_name,
                &self.model,
                summary,
            ))?;
        }
        info!(rows = out.rows.len(), file = %file.file_name, "batch analysis complete");
        Ok(out)
    }

    /// Upload a spreadsheet and score every row with each of `models` (comma-separated).
    ///
    /// Runs under the general `/batch` timeout rather than the interactive upload one.
    pub async fn compare_models(&self, file: UploadFile, models: &str) -> Result<BatchResult, SessionError> {
        check_upload_name(&file.file_name)?;
        let token = self.slot.begin();
        let out = self
            .api
            .batch_analyze(&file, Some(models.trim()), self.api.timeouts().batch, Some(&token))
            .await
            .map_err(|e| SessionError::from_client(e, SessionError::DeepCanceled))?;
        if let Some(summary) = out.summary_value() {
            self.history.record(NewHistoryEntry::file(
                HistoryMode::Batch,
                &file.file_name,
                models.trim(),
                summary,
            ))?;
        }
        info!(rows = out.rows.len(), models = models.trim(), "model comparison complete");
        Ok(out)
    }

    /// Deep analysis of one row picked from a batch result.
    pub async fn analyze_row(&self, row_text: &str) -> Result<AnalysisResult, SessionError> {
        let token = self.slot.begin();
        let out = self
            .api
            .analyze(
                &AnalyzeRequest::deep(row_text, &self.model),
                self.api.timeouts().deep,
                Some(&token),
            )
            .await
            .map_err(|e| SessionError::from_client(e, SessionError::RowCanceled))?;
        self.history.record(NewHistoryEntry::text(
            HistoryMode::BatchRow,
            row_text,
            &self.model,
            history_value(&out),
        ))?;
        Ok(out)
    }

    /// One deep analysis per text with bounded concurrency. Never fails as a whole:
    /// a failed row becomes [`DeepRowOutcome::Failed`] at its own index.
    pub async fn deep_analyze_rows(&self, texts: &[String], cancel: &CancellationToken) -> Vec<DeepRowOutcome> {
        let timeout = self.api.timeouts().deep;
        run_indexed(texts, self.deep_concurrency, |_, text| {
            let req = AnalyzeRequest::deep(text, &self.model);
            let text = text.clone();
            async move {
                match self.api.analyze(&req, timeout, Some(cancel)).await {
                    Ok(result) => DeepRowOutcome::Analyzed(Box::new(result)),
                    Err(err) => DeepRowOutcome::Failed {
                        error: err.to_string(),
                        text,
                    },
                }
            }
        })
        .await
    }

    /// Deep-analyze every non-empty row of `batch` and attach the outcomes as `deep_results`.
    pub async fn analyze_batch_rows(&self, mut batch: BatchResult) -> Result<BatchResult, SessionError> {
        let texts: Vec<String> = batch
            .rows
            .iter()
            .map(|r| r.text.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect();
        if texts.is_empty() {
            return Err(SessionError::NoBatchRows);
        }
        let token = self.slot.begin();
        info!(rows = texts.len(), concurrency = self.deep_concurrency, "batch deep analysis started");
        let outcomes = self.deep_analyze_rows(&texts, &token).await;
        let failed = outcomes.iter().filter(|o| o.is_failure()).count();
        info!(rows = outcomes.len(), failed, "batch deep analysis complete");
        batch.deep_results = Some(outcomes);

        if let Some(summary) = batch.summary_value() {
            self.history.record(NewHistoryEntry::file(
                HistoryMode::BatchAll,
                BATCH_DEEP_ALL_FILE_NAME,
                &self.model,
                summary,
            ))?;
        }
        Ok(batch)
    }

    pub fn analyses(&self) -> Vec<HistoryEntry> {
        self.history.analyses()
    }

    pub fn clear_history(&self) -> Result<(), SessionError> {
        Ok(self.history.clear_analyses()?)
    }

    /// Most recent analysed text, if any.
    pub fn reuse_last(&self) -> Option<String> {
        self.history.last_text()
    }

    /// Forget the draft text; analysis history is kept.
    pub fn reset(&self) -> Result<(), SessionError> {
        self.slot.cancel();
        Ok(self.prefs.clear_last_text()?)
    }
}
