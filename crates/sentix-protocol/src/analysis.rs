use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

use crate::lenient;

/// Three-way sentiment class used across every endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Negative,
    Neutral,
    Positive,
}

impl Sentiment {
    pub const ALL: [Sentiment; 3] = [Sentiment::Negative, Sentiment::Neutral, Sentiment::Positive];

    /// Parse a backend label (case and surrounding whitespace ignored).
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "negative" => Some(Sentiment::Negative),
            "neutral" => Some(Sentiment::Neutral),
            "positive" => Some(Sentiment::Positive),
            _ => None,
        }
    }

    /// Parse a label, treating missing or unknown labels as neutral.
    pub fn parse_or_neutral(raw: Option<&str>) -> Self {
        raw.and_then(Self::parse).unwrap_or(Sentiment::Neutral)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Sentiment::Negative => "negative",
            Sentiment::Neutral => "neutral",
            Sentiment::Positive => "positive",
        }
    }

    /// Polarity on the [-1, 1] axis.
    pub fn polarity(self) -> f64 {
        match self {
            Sentiment::Negative => -1.0,
            Sentiment::Neutral => 0.0,
            Sentiment::Positive => 1.0,
        }
    }
}

impl fmt::Display for Sentiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Class probabilities as returned by the backend. They are not guaranteed to sum to 1.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Distribution {
    #[serde(default, deserialize_with = "lenient::f64_or_zero")]
    pub negative: f64,
    #[serde(default, deserialize_with = "lenient::f64_or_zero")]
    pub neutral: f64,
    #[serde(default, deserialize_with = "lenient::f64_or_zero")]
    pub positive: f64,
}

impl Distribution {
    pub const fn new(negative: f64, neutral: f64, positive: f64) -> Self {
        Self {
            negative,
            neutral,
            positive,
        }
    }

    /// Placeholder used when a result carries no distribution.
    pub const fn neutral() -> Self {
        Self::new(0.0, 1.0, 0.0)
    }

    pub fn get(&self, class: Sentiment) -> f64 {
        match class {
            Sentiment::Negative => self.negative,
            Sentiment::Neutral => self.neutral,
            Sentiment::Positive => self.positive,
        }
    }

    /// Sum of the finite, non-negative components.
    pub fn total(&self) -> f64 {
        Sentiment::ALL
            .iter()
            .map(|c| self.get(*c))
            .filter(|v| v.is_finite() && *v > 0.0)
            .sum()
    }

    /// Share of `class` in the distribution, in [0, 1]; 0 when the distribution is empty.
    pub fn share(&self, class: Sentiment) -> f64 {
        let total = self.total();
        let value = self.get(class);
        if total <= 0.0 || !value.is_finite() || value <= 0.0 {
            return 0.0;
        }
        (value / total).clamp(0.0, 1.0)
    }
}

impl Default for Distribution {
    fn default() -> Self {
        Self::neutral()
    }
}

/// Per-class tallies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentimentCounts {
    #[serde(default, deserialize_with = "lenient::u64_or_zero")]
    pub negative: u64,
    #[serde(default, deserialize_with = "lenient::u64_or_zero")]
    pub neutral: u64,
    #[serde(default, deserialize_with = "lenient::u64_or_zero")]
    pub positive: u64,
}

impl SentimentCounts {
    pub fn add(&mut self, class: Sentiment) {
        match class {
            Sentiment::Negative => self.negative += 1,
            Sentiment::Neutral => self.neutral += 1,
            Sentiment::Positive => self.positive += 1,
        }
    }

    pub fn get(&self, class: Sentiment) -> u64 {
        match class {
            Sentiment::Negative => self.negative,
            Sentiment::Neutral => self.neutral,
            Sentiment::Positive => self.positive,
        }
    }

    pub fn total(&self) -> u64 {
        self.negative + self.neutral + self.positive
    }
}

/// Token-level attribution. Older backends send `word`/`contribution`, newer ones
/// `token`/`delta`; both spellings are kept and resolved through the accessors.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WordAttribution {
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient::opt_string")]
    pub token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient::opt_string")]
    pub word: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient::opt_f64")]
    pub delta: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient::opt_f64")]
    pub contribution: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient::opt_string")]
    pub polarity: Option<String>,
}

impl WordAttribution {
    pub fn new(token: &str, delta: f64) -> Self {
        Self {
            token: Some(token.to_string()),
            delta: Some(delta),
            ..Self::default()
        }
    }

    pub fn raw_token(&self) -> &str {
        self.token
            .as_deref()
            .or(self.word.as_deref())
            .unwrap_or_default()
    }

    pub fn weight(&self) -> f64 {
        self.delta.or(self.contribution).unwrap_or(0.0)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SentenceSentiment {
    #[serde(default, deserialize_with = "lenient::string_or_empty")]
    pub sentence: String,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient::opt_string")]
    pub sentiment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient::opt_f64")]
    pub score: Option<f64>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty", deserialize_with = "lenient::number_map")]
    pub probs: BTreeMap<String, f64>,
}

/// Result of `/predict` or `/analyze`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient::opt_string")]
    pub overall_sentiment: Option<String>,
    #[serde(default, deserialize_with = "lenient::f64_or_zero")]
    pub confidence: f64,
    #[serde(default, deserialize_with = "lenient::or_default")]
    pub distribution: Distribution,
    #[serde(default, deserialize_with = "lenient::vec_or_empty")]
    pub word_attributions: Vec<WordAttribution>,
    #[serde(default, deserialize_with = "lenient::vec_or_empty")]
    pub sentence_sentiments: Vec<SentenceSentiment>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient::opt_string")]
    pub explanation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient::opt_string")]
    pub narrative: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient::opt_string")]
    pub explanation_model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient::opt_string")]
    pub model: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl AnalysisResult {
    /// Overall class, looking at `overall_sentiment` then the `label`/`sentiment` aliases.
    pub fn label(&self) -> Sentiment {
        self.overall_sentiment
            .as_deref()
            .and_then(Sentiment::parse)
            .or_else(|| {
                ["label", "sentiment"]
                    .iter()
                    .filter_map(|k| self.extra.get(*k).and_then(Value::as_str))
                    .find_map(Sentiment::parse)
            })
            .unwrap_or(Sentiment::Neutral)
    }

    /// Model rationale, preferring `explanation` over `narrative`. Blank text counts as absent.
    pub fn rationale(&self) -> Option<&str> {
        [self.explanation.as_deref(), self.narrative.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .find(|s| !s.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn missing_distribution_defaults_to_neutral() {
        let r: AnalysisResult = serde_json::from_value(json!({
            "overall_sentiment": "Positive",
            "confidence": 0.91
        }))
        .unwrap();
        assert_eq!(r.distribution, Distribution::neutral());
        assert_eq!(r.label(), Sentiment::Positive);
    }

    #[test]
    fn malformed_fields_never_fail_decoding() {
        let r: AnalysisResult = serde_json::from_value(json!({
            "confidence": "high",
            "distribution": "oops",
            "word_attributions": [{"word": "great", "contribution": 0.4}, 17],
            "sentence_sentiments": null,
            "label": "negative"
        }))
        .unwrap();
        assert_eq!(r.confidence, 0.0);
        assert_eq!(r.distribution, Distribution::neutral());
        assert_eq!(r.word_attributions.len(), 1);
        assert_eq!(r.word_attributions[0].raw_token(), "great");
        assert_eq!(r.word_attributions[0].weight(), 0.4);
        assert!(r.sentence_sentiments.is_empty());
        assert_eq!(r.label(), Sentiment::Negative);
    }

    #[test]
    fn share_guards_against_empty_and_negative_parts() {
        let d = Distribution::new(-0.2, 0.0, 0.0);
        assert_eq!(d.share(Sentiment::Negative), 0.0);
        let d = Distribution::new(0.2, 0.2, 0.6);
        assert!((d.share(Sentiment::Positive) - 0.6).abs() < 1e-9);
    }

    #[test]
    fn rationale_skips_blank_explanation() {
        let r = AnalysisResult {
            explanation: Some("  ".into()),
            narrative: Some("Mostly upbeat.".into()),
            ..AnalysisResult::default()
        };
        assert_eq!(r.rationale(), Some("Mostly upbeat."));
    }
}
