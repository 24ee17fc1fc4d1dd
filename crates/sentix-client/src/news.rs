//! RSS ingest, single-article and live snapshot calls.

use std::sync::Arc;

use sentix_core::analytics::news::{clamp_window, validate_feed_url, InvalidFeedUrl, DEFAULT_FEEDS};
use sentix_protocol::{
    ArticleAnalysis, ArticleRequest, LiveNewsItem, LiveNewsRequest, RssIngestRequest, RssIngestResponse,
};
use tracing::info;

use crate::api::SentixApi;
use crate::cancel::InFlightSlot;
use crate::http::ClientError;

#[derive(Debug, thiserror::Error)]
pub enum NewsError {
    #[error(transparent)]
    InvalidFeed(#[from] InvalidFeedUrl),
    #[error("Please provide an article URL.")]
    MissingUrl,
    #[error("{0}")]
    Client(#[from] ClientError),
    /// Live snapshot failure: the response body when there is one, else the status.
    #[error("{0}")]
    Live(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct IngestOptions {
    pub feeds: Vec<String>,
    pub limit_per_feed: u32,
    pub narrative: bool,
    pub keywords: Vec<String>,
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self {
            feeds: Vec::new(),
            limit_per_feed: RssIngestRequest::DEFAULT_LIMIT_PER_FEED,
            narrative: false,
            keywords: Vec::new(),
        }
    }
}

pub struct NewsFlow {
    api: Arc<SentixApi>,
    slot: InFlightSlot,
}

impl NewsFlow {
    pub fn new(api: Arc<SentixApi>) -> Self {
        Self {
            api,
            slot: InFlightSlot::new(),
        }
    }

    /// Ingest the selected feeds; no selection means the default feeds. Custom feeds must be http(s).
    pub async fn ingest(&self, opts: IngestOptions) -> Result<RssIngestResponse, NewsError> {
        let feeds = if opts.feeds.is_empty() {
            DEFAULT_FEEDS.iter().map(|f| f.to_string()).collect()
        } else {
            opts.feeds
                .iter()
                .map(|f| validate_feed_url(f))
                .collect::<Result<Vec<_>, _>>()?
        };
        let req = RssIngestRequest::new(feeds, opts.limit_per_feed.max(1), opts.narrative, opts.keywords);
        let token = self.slot.begin();
        let out = self.api.ingest_rss(&req, Some(&token)).await?;
        info!(feeds = req.feeds.len(), items = out.items.len(), "rss ingest complete");
        Ok(out)
    }

    pub async fn article(&self, url: &str, narrative: bool) -> Result<ArticleAnalysis, NewsError> {
        let url = url.trim();
        if url.is_empty() {
            return Err(NewsError::MissingUrl);
        }
        let token = self.slot.begin();
        Ok(self
            .api
            .analyze_article(&ArticleRequest::new(url, narrative), Some(&token))
            .await?)
    }

    /// Snapshot of the last `window_minutes` (clamped to the supported range).
    pub async fn live(&self, window_minutes: u32) -> Result<Vec<LiveNewsItem>, NewsError> {
        let req = LiveNewsRequest::new(clamp_window(window_minutes));
        self.api.live_news(&req, None).await.map_err(|err| match err {
            ClientError::Http { status, body, .. } if body.is_empty() => {
                NewsError::Live(format!("HTTP {status}"))
            }
            ClientError::Http { body, .. } => NewsError::Live(body),
            other => NewsError::Client(other),
        })
    }
}
