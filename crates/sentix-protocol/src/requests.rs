use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::DEFAULT_MODEL;

/// Body of `/predict` (fast path).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct PredictRequest {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default)]
    pub narrative: bool,
}

impl PredictRequest {
    pub fn fast(text: &str, model: &str) -> Self {
        Self {
            text: text.to_string(),
            model: Some(model.to_string()),
            narrative: false,
        }
    }

    /// Warm-up probe; the backend picks its default model.
    pub fn warmup() -> Self {
        Self {
            text: "warmup".into(),
            model: None,
            narrative: false,
        }
    }
}

/// Body of `/analyze` (deep path).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AnalyzeRequest {
    pub text: String,
    pub model: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub narrative: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation_lang: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
}

impl AnalyzeRequest {
    pub fn deep(text: &str, model: &str) -> Self {
        Self {
            text: text.to_string(),
            model: model.to_string(),
            narrative: None,
            explanation_lang: None,
            mode: None,
        }
    }

    /// Whole-transcript analysis with a narrative in the transcript's language.
    pub fn youtube_deep(transcript: &str, model: &str) -> Self {
        Self {
            text: transcript.to_string(),
            model: model.to_string(),
            narrative: Some(true),
            explanation_lang: Some("auto".into()),
            mode: Some("yt_deep".into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct BenchmarkRequest {
    pub text: String,
    pub model: String,
}

impl Default for BenchmarkRequest {
    fn default() -> Self {
        Self {
            text: "warmup".into(),
            model: DEFAULT_MODEL.into(),
        }
    }
}

/// Body of `/stream/news/rss`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RssIngestRequest {
    pub feeds: Vec<String>,
    pub limit_per_feed: u32,
    pub model: String,
    pub narrative: bool,
    pub explanation_lang: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keywords: Option<Vec<String>>,
}

impl RssIngestRequest {
    pub const DEFAULT_LIMIT_PER_FEED: u32 = 5;

    /// An empty keyword list is omitted from the payload.
    pub fn new(feeds: Vec<String>, limit_per_feed: u32, narrative: bool, keywords: Vec<String>) -> Self {
        Self {
            feeds,
            limit_per_feed,
            model: DEFAULT_MODEL.into(),
            narrative,
            explanation_lang: "auto".into(),
            keywords: (!keywords.is_empty()).then_some(keywords),
        }
    }
}

/// Body of `/stream/news/article`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ArticleRequest {
    pub url: String,
    pub model: String,
    pub narrative: bool,
    pub explanation_lang: String,
}

impl ArticleRequest {
    pub fn new(url: &str, narrative: bool) -> Self {
        Self {
            url: url.to_string(),
            model: DEFAULT_MODEL.into(),
            narrative,
            explanation_lang: "auto".into(),
        }
    }
}

/// Body of `/stream/news/live`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct LiveNewsRequest {
    pub window_minutes: u32,
    pub limit: u32,
}

impl LiveNewsRequest {
    pub const DEFAULT_LIMIT: u32 = 50;

    pub fn new(window_minutes: u32) -> Self {
        Self {
            window_minutes,
            limit: Self::DEFAULT_LIMIT,
        }
    }
}

/// Body of `/stream/youtube/full`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct YoutubeRequest {
    pub url: String,
    /// `null` when no id could be read from the link; the backend then derives it from `url`.
    pub yt_id: Option<String>,
    pub model: String,
    pub window_seconds: u32,
    pub min_chars: u32,
    pub max_chars: u32,
    pub prefer_langs: Vec<String>,
    pub fetch_comments: bool,
    pub rationale: bool,
}

impl YoutubeRequest {
    pub fn new(url: &str, yt_id: &str) -> Self {
        Self {
            url: url.to_string(),
            yt_id: Some(yt_id.trim()).filter(|id| !id.is_empty()).map(str::to_string),
            model: DEFAULT_MODEL.into(),
            window_seconds: 20,
            min_chars: 80,
            max_chars: 220,
            prefer_langs: vec!["bn".into(), "en".into()],
            fetch_comments: false,
            rationale: false,
        }
    }
}
