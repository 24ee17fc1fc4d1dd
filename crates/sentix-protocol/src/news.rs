use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::analysis::{Distribution, Sentiment, SentimentCounts};
use crate::lenient;

/// A news item from `/stream/news/live` or `/stream/news/rss`.
///
/// Live items carry `sentiment` either as a plain label or as an object with
/// `label`/`score`/`value`; RSS items carry `label`. Both forms are accepted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewsItem {
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient::opt_string")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient::opt_string")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient::opt_string")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient::opt_string")]
    pub site: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient::opt_string")]
    pub published_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient::opt_string")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sentiment: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient::opt_f64")]
    pub confidence: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient::opt_f64")]
    pub score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient::opt_f64")]
    pub sentiment_score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient::opt_string")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient::opt_string")]
    pub narrative: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai: Option<Value>,
}

pub type LiveNewsItem = NewsItem;
pub type RssArticle = NewsItem;

impl NewsItem {
    /// Class of the item; unknown or missing labels are neutral.
    pub fn sentiment_label(&self) -> Sentiment {
        let from_sentiment = match &self.sentiment {
            Some(Value::String(s)) => Sentiment::parse(s),
            Some(Value::Object(map)) => map
                .get("label")
                .and_then(Value::as_str)
                .and_then(Sentiment::parse),
            _ => None,
        };
        from_sentiment
            .or_else(|| self.label.as_deref().and_then(Sentiment::parse))
            .unwrap_or(Sentiment::Neutral)
    }

    /// Signed score: `score`, `sentiment_score`, `sentiment.score`, `sentiment.value`, else 0.
    pub fn score(&self) -> f64 {
        if let Some(s) = self.score.or(self.sentiment_score) {
            return s;
        }
        if let Some(Value::Object(map)) = &self.sentiment {
            for key in ["score", "value"] {
                if let Some(n) = map.get(key).and_then(lenient::number) {
                    return n;
                }
            }
        }
        0.0
    }

    /// Whether the backend attached AI enrichment to the item.
    pub fn has_ai(&self) -> bool {
        match &self.ai {
            None | Some(Value::Null) => false,
            Some(Value::Bool(b)) => *b,
            Some(Value::String(s)) => !s.is_empty(),
            Some(Value::Number(n)) => n.as_f64().is_some_and(|v| v != 0.0),
            Some(_) => true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RssSummary {
    #[serde(default, deserialize_with = "lenient::or_default")]
    pub counts: SentimentCounts,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// Result of `/stream/news/rss`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RssIngestResponse {
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient::opt_string")]
    pub model_used: Option<String>,
    #[serde(default, deserialize_with = "lenient::vec_or_empty")]
    pub items: Vec<RssArticle>,
    #[serde(default, deserialize_with = "lenient::or_default")]
    pub summary: RssSummary,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ArticleMeta {
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient::opt_string")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient::opt_string")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient::opt_string")]
    pub body: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient::opt_string")]
    pub site_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient::opt_string")]
    pub published_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient::opt_string")]
    pub language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient::opt_string")]
    pub image_url: Option<String>,
}

/// Result of `/stream/news/article`. Older backends put the article fields at top level.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ArticleAnalysis {
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient::opt_object")]
    pub article: Option<ArticleMeta>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient::opt_string")]
    pub label: Option<String>,
    #[serde(default, deserialize_with = "lenient::f64_or_zero")]
    pub confidence: f64,
    #[serde(default, deserialize_with = "lenient::or_default")]
    pub distribution: Distribution,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient::opt_string")]
    pub narrative: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl ArticleAnalysis {
    fn top_level(&self, key: &str) -> Option<&str> {
        self.extra
            .get(key)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
    }

    fn meta<F>(&self, pick: F) -> Option<&str>
    where
        F: Fn(&ArticleMeta) -> Option<&String>,
    {
        self.article
            .as_ref()
            .and_then(pick)
            .map(String::as_str)
            .filter(|s| !s.is_empty())
    }

    pub fn url(&self) -> Option<&str> {
        self.meta(|a| a.url.as_ref()).or_else(|| self.top_level("url"))
    }

    pub fn title(&self) -> &str {
        self.meta(|a| a.title.as_ref())
            .or_else(|| self.top_level("title"))
            .unwrap_or("Untitled article")
    }

    pub fn body(&self) -> &str {
        self.meta(|a| a.body.as_ref())
            .or_else(|| self.top_level("body"))
            .or_else(|| self.top_level("content"))
            .unwrap_or_default()
    }

    pub fn site(&self) -> Option<&str> {
        self.meta(|a| a.site_name.as_ref())
            .or_else(|| self.top_level("site"))
    }

    pub fn published_at(&self) -> Option<&str> {
        self.meta(|a| a.published_at.as_ref())
            .or_else(|| self.top_level("published_at"))
    }

    pub fn sentiment(&self) -> Sentiment {
        Sentiment::parse_or_neutral(self.label.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn live_item_reads_object_sentiment() {
        let item: NewsItem = serde_json::from_value(json!({
            "title": "Markets rally",
            "sentiment": {"label": "Positive", "value": "0.6"}
        }))
        .unwrap();
        assert_eq!(item.sentiment_label(), Sentiment::Positive);
        assert_eq!(item.score(), 0.6);
        assert!(!item.has_ai());
    }

    #[test]
    fn score_prefers_top_level_fields() {
        let item: NewsItem = serde_json::from_value(json!({
            "sentiment": "negative",
            "sentiment_score": -0.4,
            "ai": {"summary": "x"}
        }))
        .unwrap();
        assert_eq!(item.sentiment_label(), Sentiment::Negative);
        assert_eq!(item.score(), -0.4);
        assert!(item.has_ai());
    }

    #[test]
    fn article_fields_fall_back_to_top_level() {
        let a: ArticleAnalysis = serde_json::from_value(json!({
            "title": "Flat title",
            "content": "Body text",
            "site": "example.org",
            "label": "negative",
            "confidence": 0.7
        }))
        .unwrap();
        assert_eq!(a.title(), "Flat title");
        assert_eq!(a.body(), "Body text");
        assert_eq!(a.site(), Some("example.org"));
        assert_eq!(a.sentiment(), Sentiment::Negative);

        let empty = ArticleAnalysis::default();
        assert_eq!(empty.title(), "Untitled article");
        assert_eq!(empty.distribution, Distribution::neutral());
    }
}
