//! Wire types for the sentiment analysis API.
//!
//! Responses are decoded leniently: missing or malformed fields fall back to
//! neutral defaults instead of failing the whole document.

use schemars::schema::RootSchema;
use schemars::schema_for;
use std::collections::BTreeMap;

pub mod analysis;
pub mod batch;
pub mod history;
pub mod lenient;
pub mod models;
pub mod news;
pub mod requests;
pub mod youtube;

pub use analysis::{AnalysisResult, Distribution, SentenceSentiment, Sentiment, SentimentCounts, WordAttribution};
pub use batch::{BatchMeta, BatchResult, BatchSummary, DeepRowOutcome, ModelPrediction, RowResult};
pub use history::{HistoryEntry, HistoryMode, NewHistoryEntry};
pub use models::ModelDescriptor;
pub use news::{ArticleAnalysis, ArticleMeta, LiveNewsItem, NewsItem, RssArticle, RssIngestResponse, RssSummary};
pub use requests::{
    AnalyzeRequest, ArticleRequest, BenchmarkRequest, LiveNewsRequest, PredictRequest, RssIngestRequest,
    YoutubeRequest,
};
pub use youtube::{TranscriptSegment, YoutubeAnalysis};

/// Model used when the backend does not advertise one.
pub const DEFAULT_MODEL: &str = "onnx-optimized";

/// JSON schemas of every request body, keyed by endpoint path.
pub fn request_schemas() -> BTreeMap<&'static str, RootSchema> {
    let mut out = BTreeMap::new();
    out.insert("/predict", schema_for!(PredictRequest));
    out.insert("/analyze", schema_for!(AnalyzeRequest));
    out.insert("/benchmark", schema_for!(BenchmarkRequest));
    out.insert("/stream/news/rss", schema_for!(RssIngestRequest));
    out.insert("/stream/news/article", schema_for!(ArticleRequest));
    out.insert("/stream/news/live", schema_for!(LiveNewsRequest));
    out.insert("/stream/youtube/full", schema_for!(YoutubeRequest));
    out.insert("/models", schema_for!(ModelDescriptor));
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schemas_cover_every_post_endpoint() {
        let schemas = request_schemas();
        for path in [
            "/predict",
            "/analyze",
            "/benchmark",
            "/stream/news/rss",
            "/stream/news/article",
            "/stream/news/live",
            "/stream/youtube/full",
        ] {
            assert!(schemas.contains_key(path), "missing {path}");
        }
        let live = serde_json::to_value(&schemas["/stream/news/live"]).unwrap();
        assert!(live["properties"]["window_minutes"].is_object());
    }
}
