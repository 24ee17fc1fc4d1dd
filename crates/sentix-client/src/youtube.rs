//! YouTube transcript flow: fetch the windowed stream analysis, then optionally a deep pass.

use std::sync::Arc;
use std::time::Duration;

use sentix_core::analytics::timeline::build_transcript;
use sentix_core::links::youtube_id;
use sentix_core::errors::NETWORK_FAILURE;
use sentix_core::{friendly_error, Prefs, StoreError};
use sentix_protocol::{AnalysisResult, AnalyzeRequest, YoutubeAnalysis, YoutubeRequest, DEFAULT_MODEL};
use tracing::{info, warn};

use crate::api::SentixApi;
use crate::cancel::InFlightSlot;
use crate::http::ClientError;

pub const YOUTUBE_TRIES: u32 = 2;
pub const RETRY_BACKOFF: Duration = Duration::from_millis(350);

#[derive(Debug, thiserror::Error)]
pub enum YoutubeError {
    #[error("Please paste a YouTube link.")]
    MissingUrl,
    #[error("No transcript to analyze.")]
    EmptyTranscript,
    /// Backend or network failure, already paraphrased for display.
    #[error("{0}")]
    Failed(String),
    #[error("failed to persist last URL: {0}")]
    Store(#[from] StoreError),
}

impl From<ClientError> for YoutubeError {
    fn from(err: ClientError) -> Self {
        match err {
            ClientError::Timeout | ClientError::Aborted => {
                YoutubeError::Failed(NETWORK_FAILURE.to_string())
            }
            other => YoutubeError::Failed(friendly_error(&other.detail())),
        }
    }
}

pub struct YoutubeFlow {
    api: Arc<SentixApi>,
    prefs: Prefs,
    slot: InFlightSlot,
    tries: u32,
    backoff: Duration,
}

impl YoutubeFlow {
    pub fn new(api: Arc<SentixApi>, prefs: Prefs) -> Self {
        Self {
            api,
            prefs,
            slot: InFlightSlot::new(),
            tries: YOUTUBE_TRIES,
            backoff: RETRY_BACKOFF,
        }
    }

    pub fn with_retry_policy(mut self, tries: u32, backoff: Duration) -> Self {
        self.tries = tries.max(1);
        self.backoff = backoff;
        self
    }

    pub fn last_url(&self) -> Option<String> {
        self.prefs.yt_last_url()
    }

    /// Request the windowed analysis of `url`, retrying failed attempts after a linear backoff.
    pub async fn fetch(&self, url: &str) -> Result<YoutubeAnalysis, YoutubeError> {
        let url = url.trim();
        if url.is_empty() {
            return Err(YoutubeError::MissingUrl);
        }
        self.prefs.set_yt_last_url(url)?;
        let req = YoutubeRequest::new(url, &youtube_id(url));
        let token = self.slot.begin();
        let timeout = self.api.timeouts().youtube;

        let mut last_err = ClientError::Aborted;
        for attempt in 0..self.tries {
            match self.api.youtube_full(&req, timeout, Some(&token)).await {
                Ok(analysis) => {
                    info!(
                        segments = analysis.segments.len(),
                        video_id = req.yt_id.as_deref().unwrap_or_default(),
                        "youtube analysis complete"
                    );
                    return Ok(analysis);
                }
                Err(err) => {
                    warn!(attempt = attempt + 1, error = %err, "youtube analysis attempt failed");
                    last_err = err;
                }
            }
            if token.is_cancelled() {
                break;
            }
            if attempt + 1 < self.tries {
                tokio::time::sleep(self.backoff * (attempt + 1)).await;
            }
        }
        Err(last_err.into())
    }

    /// Deep analysis of the whole transcript assembled from `analysis` segments.
    pub async fn analyze_transcript(&self, analysis: &YoutubeAnalysis) -> Result<AnalysisResult, YoutubeError> {
        let transcript = build_transcript(&analysis.segments);
        if transcript.is_empty() {
            return Err(YoutubeError::EmptyTranscript);
        }
        let token = self.slot.begin();
        let req = AnalyzeRequest::youtube_deep(&transcript, DEFAULT_MODEL);
        Ok(self
            .api
            .analyze(&req, self.api.timeouts().analyze, Some(&token))
            .await?)
    }

    pub fn cancel(&self) {
        self.slot.cancel();
    }
}
