//! Token attribution heatmap aggregation.

use std::collections::{BTreeMap, HashMap, HashSet};

use sentix_protocol::{Sentiment, WordAttribution};

pub const DEFAULT_STOPWORDS: &[&str] = &[
    "the", "a", "an", "to", "and", "or", "is", "are", "am", "of", "in", "on", "for", "this", "that",
    "it", "its",
];

/// Tokens forced to a polarity regardless of their attribution votes.
pub const DEFAULT_OVERRIDES: &[(&str, Sentiment)] = &[
    ("fuck", Sentiment::Negative),
    ("fucking", Sentiment::Negative),
    ("shit", Sentiment::Negative),
    ("bastard", Sentiment::Negative),
    ("idiot", Sentiment::Negative),
    ("moron", Sentiment::Negative),
    ("stupid", Sentiment::Negative),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WordSort {
    /// Largest absolute score first.
    #[default]
    Impact,
    Az,
    Za,
}

#[derive(Debug, Clone)]
pub struct WordOptions {
    pub max_items: usize,
    pub min_abs: f64,
    /// Extra stopwords on top of [`DEFAULT_STOPWORDS`].
    pub stopwords: Vec<String>,
    pub neutral_thresh: f64,
    /// Score by voted polarity and strength instead of the raw summed delta.
    pub prefer_polarity: bool,
    /// Extra overrides on top of [`DEFAULT_OVERRIDES`]; these win on conflict.
    pub overrides: HashMap<String, Sentiment>,
    pub query: String,
    pub polarity: Option<Sentiment>,
    pub sort: WordSort,
}

impl Default for WordOptions {
    fn default() -> Self {
        Self {
            max_items: 150,
            min_abs: 0.0,
            stopwords: Vec::new(),
            neutral_thresh: 0.002,
            prefer_polarity: true,
            overrides: HashMap::new(),
            query: String::new(),
            polarity: None,
            sort: WordSort::Impact,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct WordCell {
    pub token: String,
    pub delta: f64,
    pub polarity: Sentiment,
    pub score: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WordHeatmap {
    pub cells: Vec<WordCell>,
    /// Largest absolute score among `cells`, never below 1e-9.
    pub max_abs: f64,
}

/// Lowercase, collapse whitespace and drop everything except letters, digits, `-`, `_`, `'` and spaces.
pub fn normalize_token(raw: &str) -> String {
    let collapsed = raw
        .trim()
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    collapsed
        .chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, '-' | '_' | '\'' | ' '))
        .collect()
}

pub fn infer_polarity(delta: f64, neutral_thresh: f64) -> Sentiment {
    if delta.abs() < neutral_thresh {
        Sentiment::Neutral
    } else if delta > 0.0 {
        Sentiment::Positive
    } else {
        Sentiment::Negative
    }
}

#[derive(Default)]
struct Tally {
    delta: f64,
    pos: u32,
    neu: u32,
    neg: u32,
}

impl Tally {
    fn vote(&self, delta: f64, neutral_thresh: f64) -> Sentiment {
        let (pos, neu, neg) = (self.pos, self.neu, self.neg);
        if pos > neg && pos > neu {
            Sentiment::Positive
        } else if neg > pos && neg > neu {
            Sentiment::Negative
        } else if neu > pos && neu > neg {
            Sentiment::Neutral
        } else {
            infer_polarity(delta, neutral_thresh)
        }
    }
}

pub fn word_heatmap(items: &[WordAttribution], opts: &WordOptions) -> WordHeatmap {
    let stop: HashSet<String> = DEFAULT_STOPWORDS
        .iter()
        .map(|s| s.to_string())
        .chain(opts.stopwords.iter().map(|s| s.to_lowercase()))
        .collect();

    // First-seen order keeps ties stable under the impact sort.
    let mut order: Vec<String> = Vec::new();
    let mut tallies: HashMap<String, Tally> = HashMap::new();
    for item in items {
        let raw = item.raw_token();
        let normalized = normalize_token(raw);
        let token = if normalized.is_empty() {
            raw.to_string()
        } else {
            normalized
        };
        if token.is_empty() || stop.contains(&token) {
            continue;
        }
        let weight = item.weight();
        let delta = if weight.is_finite() { weight } else { 0.0 };
        let tally = tallies.entry(token.clone()).or_insert_with(|| {
            order.push(token.clone());
            Tally::default()
        });
        tally.delta += delta;
        match item
            .polarity
            .as_deref()
            .map(|p| p.to_lowercase())
            .as_deref()
        {
            Some("positive") => tally.pos += 1,
            Some("negative") => tally.neg += 1,
            Some("neutral") => tally.neu += 1,
            _ => {}
        }
    }

    let overrides: BTreeMap<&str, Sentiment> = DEFAULT_OVERRIDES
        .iter()
        .copied()
        .chain(opts.overrides.iter().map(|(k, v)| (k.as_str(), *v)))
        .collect();

    let query = opts.query.trim().to_lowercase();
    let mut cells: Vec<WordCell> = order
        .into_iter()
        .filter_map(|token| {
            let tally = tallies.remove(&token)?;
            if opts.min_abs > 0.0 && tally.delta.abs() < opts.min_abs {
                return None;
            }
            let mut polarity = tally.vote(tally.delta, opts.neutral_thresh);
            if let Some(forced) = overrides.get(token.as_str()) {
                polarity = *forced;
            }
            let strength = tally.delta.abs();
            let score = if opts.prefer_polarity {
                match polarity {
                    Sentiment::Positive => strength,
                    Sentiment::Negative => -strength,
                    Sentiment::Neutral => 0.0,
                }
            } else {
                tally.delta
            };
            Some(WordCell {
                token,
                delta: tally.delta,
                polarity,
                score,
            })
        })
        .filter(|c| query.is_empty() || c.token.contains(&query))
        .filter(|c| opts.polarity.is_none_or(|p| c.polarity == p))
        .collect();

    match opts.sort {
        WordSort::Impact => cells.sort_by(|a, b| b.score.abs().total_cmp(&a.score.abs())),
        WordSort::Az => cells.sort_by(|a, b| a.token.cmp(&b.token)),
        WordSort::Za => cells.sort_by(|a, b| b.token.cmp(&a.token)),
    }
    cells.truncate(opts.max_items);

    let max_abs = cells.iter().map(|c| c.score.abs()).fold(1e-9, f64::max);
    WordHeatmap { cells, max_abs }
}
