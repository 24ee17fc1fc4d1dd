use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::analysis::Sentiment;
use crate::lenient;

/// A windowed transcript chunk with its own sentiment.
///
/// Backends disagree on field names, so every alias is decoded and the accessors
/// resolve them in a fixed order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TranscriptSegment {
    #[serde(default, deserialize_with = "lenient::string_or_empty")]
    pub text: String,

    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient::opt_string")]
    pub overall_sentiment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient::opt_string")]
    pub sentiment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient::opt_string")]
    pub overall: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient::opt_string")]
    pub label: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient::opt_f64")]
    pub start: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient::opt_f64")]
    pub start_sec: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient::opt_f64")]
    pub t0: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient::opt_f64")]
    pub begin: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient::opt_f64")]
    pub end: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient::opt_f64")]
    pub end_sec: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient::opt_f64")]
    pub t1: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient::opt_f64")]
    pub finish: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient::opt_f64")]
    pub confidence: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient::opt_f64")]
    pub conf: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient::opt_f64")]
    pub score: Option<f64>,
}

impl TranscriptSegment {
    pub fn new(text: &str, label: &str) -> Self {
        Self {
            text: text.to_string(),
            label: Some(label.to_string()),
            ..Self::default()
        }
    }

    /// Raw label, lowercased and trimmed; empty when no label field is present.
    pub fn label_str(&self) -> String {
        [
            &self.overall_sentiment,
            &self.sentiment,
            &self.overall,
            &self.label,
        ]
        .into_iter()
        .flatten()
        .next()
        .map(|s| s.trim().to_lowercase())
        .unwrap_or_default()
    }

    /// Parsed class; anything unrecognised is neutral.
    pub fn class(&self) -> Sentiment {
        Sentiment::parse(&self.label_str()).unwrap_or(Sentiment::Neutral)
    }

    pub fn start_secs(&self) -> Option<f64> {
        self.start.or(self.start_sec).or(self.t0).or(self.begin)
    }

    pub fn end_secs(&self) -> Option<f64> {
        self.end.or(self.end_sec).or(self.t1).or(self.finish)
    }

    /// Confidence in [0, 1]: `confidence`, then `conf`, then `|score|`, else 0.
    pub fn confidence_hint(&self) -> f64 {
        let raw = self
            .confidence
            .or(self.conf)
            .or_else(|| self.score.map(|s| s.abs().clamp(0.0, 1.0)))
            .unwrap_or(0.0);
        raw.clamp(0.0, 1.0)
    }
}

/// Video-level verdict. Some backends send an object, some a bare label string.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct YoutubeOverall {
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient::opt_string")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient::opt_string")]
    pub sentiment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient::opt_f64")]
    pub confidence: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct YoutubeSummary {
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient::opt_f64")]
    pub avg_confidence: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParamsUsed {
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient::opt_f64")]
    pub window_seconds: Option<f64>,
}

/// Result of `/stream/youtube/full`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct YoutubeAnalysis {
    #[serde(default, deserialize_with = "lenient::vec_or_empty")]
    pub segments: Vec<TranscriptSegment>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient::opt_object")]
    pub overall: Option<YoutubeOverall>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient::opt_string")]
    pub overall_label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient::opt_f64")]
    pub overall_confidence: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient::opt_object")]
    pub summary: Option<YoutubeSummary>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient::opt_string")]
    pub summary_text: Option<String>,
    #[serde(default, deserialize_with = "lenient::vec_or_empty")]
    pub summary_bullets: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient::opt_object")]
    pub params_used: Option<ParamsUsed>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient::opt_string")]
    pub video_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient::opt_string")]
    pub yt_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient::opt_string")]
    pub youtube_id: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

pub const DEFAULT_WINDOW_SECONDS: f64 = 20.0;

impl YoutubeAnalysis {
    pub fn window_seconds(&self) -> f64 {
        self.params_used
            .as_ref()
            .and_then(|p| p.window_seconds)
            .filter(|w| *w > 0.0)
            .unwrap_or(DEFAULT_WINDOW_SECONDS)
    }

    /// Label reported by the backend: `overall.label`, `overall.sentiment`, then `overall_label`.
    pub fn reported_label(&self) -> Option<String> {
        self.overall
            .as_ref()
            .and_then(|o| o.label.clone().or_else(|| o.sentiment.clone()))
            .or_else(|| self.overall_label.clone())
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty())
    }

    pub fn reported_confidence(&self) -> Option<f64> {
        self.overall
            .as_ref()
            .and_then(|o| o.confidence)
            .or(self.overall_confidence)
    }

    pub fn avg_confidence(&self) -> Option<f64> {
        self.summary.as_ref().and_then(|s| s.avg_confidence)
    }

    pub fn video_id(&self) -> Option<&str> {
        [&self.video_id, &self.yt_id, &self.youtube_id]
            .into_iter()
            .flatten()
            .map(String::as_str)
            .find(|s| !s.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn segment_aliases_resolve_in_order() {
        let seg: TranscriptSegment = serde_json::from_value(json!({
            "text": " hello ",
            "sentiment": "Positive",
            "label": "negative",
            "start_sec": 40,
            "t1": 55,
            "score": -0.4
        }))
        .unwrap();
        assert_eq!(seg.label_str(), "positive");
        assert_eq!(seg.class(), Sentiment::Positive);
        assert_eq!(seg.start_secs(), Some(40.0));
        assert_eq!(seg.end_secs(), Some(55.0));
        assert!((seg.confidence_hint() - 0.4).abs() < 1e-9);
    }

    #[test]
    fn overall_string_is_tolerated() {
        let r: YoutubeAnalysis = serde_json::from_value(json!({
            "segments": [{"text": "a"}],
            "overall": "positive",
            "overall_label": "Negative",
            "params_used": {"window_seconds": 30},
            "yt_id": "abc"
        }))
        .unwrap();
        assert!(r.overall.is_none());
        assert_eq!(r.reported_label().as_deref(), Some("negative"));
        assert_eq!(r.window_seconds(), 30.0);
        assert_eq!(r.video_id(), Some("abc"));
    }
}
