//! Live-news dashboard aggregates and RSS ingest helpers.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use sentix_protocol::{NewsItem, RssArticle, Sentiment, SentimentCounts};

use super::format::parse_timestamp;
use crate::links::host_from_url;

pub const MIN_WINDOW_MINUTES: u32 = 5;
pub const MAX_WINDOW_MINUTES: u32 = 365 * 24 * 60;
pub const DEFAULT_WINDOW_MINUTES: u32 = 30;

/// Quick-pick windows offered by the live dashboard, in minutes.
pub const PRESET_WINDOWS: &[(&str, u32)] = &[
    ("15 min", 15),
    ("30 min", 30),
    ("1 hour", 60),
    ("6 hours", 360),
    ("24 hours", 1440),
    ("7 days", 10080),
    ("1 month", 43200),
    ("1 year", 525600),
];

/// Auto-refresh choices in seconds.
pub const REFRESH_OPTIONS: &[u64] = &[15, 30, 60];

/// Keep a requested window inside [5 min, 1 year]; 0 means the default window.
pub fn clamp_window(minutes: u32) -> u32 {
    let raw = if minutes == 0 {
        DEFAULT_WINDOW_MINUTES
    } else {
        minutes
    };
    raw.clamp(MIN_WINDOW_MINUTES, MAX_WINDOW_MINUTES)
}

pub fn sentiment_counts(items: &[NewsItem]) -> SentimentCounts {
    let mut counts = SentimentCounts::default();
    for item in items {
        counts.add(item.sentiment_label());
    }
    counts
}

pub fn avg_score(items: &[NewsItem]) -> f64 {
    if items.is_empty() {
        return 0.0;
    }
    items.iter().map(NewsItem::score).sum::<f64>() / items.len() as f64
}

/// Items with AI enrichment and their rounded percentage.
pub fn ai_share(items: &[NewsItem]) -> (usize, u32) {
    let n = items.iter().filter(|i| i.has_ai()).count();
    let pct = if items.is_empty() {
        0
    } else {
        ((n as f64 / items.len() as f64) * 100.0).round() as u32
    };
    (n, pct)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bucket {
    pub label: String,
    pub count: u32,
}

const SCORE_EDGES: [f64; 11] = [-1.0, -0.8, -0.6, -0.4, -0.2, 0.0, 0.2, 0.4, 0.6, 0.8, 1.0001];

/// Ten 0.2-wide bins over [-1, 1]; scores are clamped first.
pub fn score_histogram(items: &[NewsItem]) -> Vec<Bucket> {
    let mut counts = [0u32; 10];
    for item in items {
        let s = item.score().clamp(-1.0, 1.0);
        let idx = (0..10)
            .find(|&i| s >= SCORE_EDGES[i] && s < SCORE_EDGES[i + 1])
            .unwrap_or(0);
        counts[idx] += 1;
    }
    (0..10)
        .map(|i| Bucket {
            label: format!("{:.1}..{:.1}", SCORE_EDGES[i], SCORE_EDGES[i + 1] - 0.0001),
            count: counts[i],
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq)]
pub struct SourceAverage {
    pub source: String,
    pub avg: f64,
    pub n: u32,
}

/// Mean score for the 8 sources with the most items.
pub fn avg_by_source(items: &[NewsItem]) -> Vec<SourceAverage> {
    let mut order: Vec<String> = Vec::new();
    let mut acc: HashMap<String, (f64, u32)> = HashMap::new();
    for item in items {
        let source = item
            .source
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or("Unknown")
            .to_string();
        let slot = acc.entry(source.clone()).or_insert_with(|| {
            order.push(source.clone());
            (0.0, 0)
        });
        slot.0 += item.score();
        slot.1 += 1;
    }
    let mut out: Vec<SourceAverage> = order
        .into_iter()
        .filter_map(|source| {
            let (sum, n) = acc.get(&source).copied()?;
            Some(SourceAverage {
                avg: if n > 0 { sum / f64::from(n) } else { 0.0 },
                source,
                n,
            })
        })
        .collect();
    out.sort_by(|a, b| b.n.cmp(&a.n));
    out.truncate(8);
    out
}

fn ranked(order: Vec<String>, freq: &HashMap<String, u32>, limit: usize) -> Vec<Bucket> {
    let mut out: Vec<Bucket> = order
        .into_iter()
        .map(|label| Bucket {
            count: freq.get(&label).copied().unwrap_or(0),
            label,
        })
        .collect();
    out.sort_by(|a, b| b.count.cmp(&a.count));
    out.truncate(limit);
    out
}

/// Ten most frequent hosts (without `www.`); unparsable URLs count as "unknown".
pub fn top_domains(items: &[NewsItem]) -> Vec<Bucket> {
    let mut order = Vec::new();
    let mut freq: HashMap<String, u32> = HashMap::new();
    for item in items {
        let host = item
            .url
            .as_deref()
            .and_then(host_from_url)
            .unwrap_or_else(|| "unknown".to_string());
        let slot = freq.entry(host.clone()).or_insert_with(|| {
            order.push(host);
            0
        });
        *slot += 1;
    }
    ranked(order, &freq, 10)
}

const TITLE_STOPWORDS: &[&str] = &[
    "the", "a", "an", "and", "or", "to", "of", "in", "on", "for", "with", "from", "by", "as", "at",
    "is", "are", "was", "were", "this", "that", "these", "those", "it", "its", "be", "been", "being",
    "into", "over", "under", "after", "before", "about", "more", "new", "latest", "breaking", "update",
    "today",
];

fn is_keyword_char(c: char) -> bool {
    c.is_ascii_lowercase() || c.is_ascii_digit() || ('\u{0980}'..='\u{09ff}').contains(&c)
}

/// Ten most frequent title words: ASCII letters, digits and Bengali script, length 3+, stopwords removed.
pub fn title_keywords(items: &[NewsItem]) -> Vec<Bucket> {
    let stop: HashSet<&str> = TITLE_STOPWORDS.iter().copied().collect();
    let mut order = Vec::new();
    let mut freq: HashMap<String, u32> = HashMap::new();
    for item in items {
        let title = item.title.as_deref().unwrap_or_default().to_lowercase();
        for word in title.split(|c: char| !is_keyword_char(c)) {
            if word.chars().count() < 3 || stop.contains(word) {
                continue;
            }
            let slot = freq.entry(word.to_string()).or_insert_with(|| {
                order.push(word.to_string());
                0
            });
            *slot += 1;
        }
    }
    ranked(order, &freq, 10)
}

pub const RECENCY_LABELS: [&str; 6] = ["< 1h", "1–6h", "6–24h", "1–3d", "3–7d", "> 7d / unknown"];

/// Items per age bucket relative to `now`; undated items land in the last bucket.
pub fn recency_buckets(items: &[NewsItem], now: DateTime<Utc>) -> Vec<Bucket> {
    let mut counts = [0u32; 6];
    for item in items {
        let idx = match item.published_at.as_deref().and_then(parse_timestamp) {
            None => 5,
            Some(ts) => {
                let hours = (now - ts).num_milliseconds() as f64 / 3_600_000.0;
                if hours < 1.0 {
                    0
                } else if hours < 6.0 {
                    1
                } else if hours < 24.0 {
                    2
                } else if hours < 72.0 {
                    3
                } else if hours < 168.0 {
                    4
                } else {
                    5
                }
            }
        };
        counts[idx] += 1;
    }
    RECENCY_LABELS
        .iter()
        .zip(counts)
        .map(|(label, count)| Bucket {
            label: label.to_string(),
            count,
        })
        .collect()
}

/// Aggregated view rendered by the live dashboard.
#[derive(Debug, Clone, PartialEq)]
pub struct LiveSummary {
    pub total: usize,
    pub counts: SentimentCounts,
    pub avg_score: f64,
    pub ai_count: usize,
    pub ai_pct: u32,
    pub histogram: Vec<Bucket>,
    pub by_source: Vec<SourceAverage>,
    pub domains: Vec<Bucket>,
    pub keywords: Vec<Bucket>,
    pub recency: Vec<Bucket>,
}

pub fn live_summary(items: &[NewsItem], now: DateTime<Utc>) -> LiveSummary {
    let (ai_count, ai_pct) = ai_share(items);
    LiveSummary {
        total: items.len(),
        counts: sentiment_counts(items),
        avg_score: avg_score(items),
        ai_count,
        ai_pct,
        histogram: score_histogram(items),
        by_source: avg_by_source(items),
        domains: top_domains(items),
        keywords: title_keywords(items),
        recency: recency_buckets(items, now),
    }
}

// ---- RSS ingest -------------------------------------------------------------

/// Feeds selected when the user picks none.
pub const DEFAULT_FEEDS: &[&str] = &[
    "https://feeds.bbci.co.uk/bengali/rss.xml",
    "https://www.prothomalo.com/feed",
    "https://www.kalerkantho.com/rss.xml",
];

/// Known feeds as (name, url, tag).
pub const FEED_PRESETS: &[(&str, &str, &str)] = &[
    ("প্রথম আলো (Bangla)", "https://www.prothomalo.com/feed", "BD • Bangla"),
    ("ইত্তেফাক", "https://www.ittefaq.com.bd/rss", "BD • Bangla"),
    ("কালের কণ্ঠ", "https://www.kalerkantho.com/rss.xml", "BD • Bangla"),
    ("যুগান্তর", "https://www.jugantor.com/rss.xml", "BD • Bangla"),
    ("সমকাল", "https://www.samakal.com/rss", "BD • Bangla"),
    ("জনকণ্ঠ", "https://www.dailyjanakantha.com/rss", "BD • Bangla"),
    ("বাংলা ট্রিবিউন", "https://www.banglatribune.com/feed", "BD • Bangla"),
    ("bdnews24 (Bangla-ish)", "https://bdnews24.com/feed/", "BD • Mixed"),
    ("BBC বাংলা", "https://feeds.bbci.co.uk/bengali/rss.xml", "INT • Bangla"),
    ("The Daily Star", "https://www.thedailystar.net/rss.xml", "BD • English"),
    ("Prothom Alo (English)", "https://en.prothomalo.com/feed", "BD • English"),
];

/// Presets whose name, tag or URL contains `query` (case-insensitive).
pub fn search_presets(query: &str) -> Vec<(&'static str, &'static str, &'static str)> {
    let q = query.trim().to_lowercase();
    FEED_PRESETS
        .iter()
        .copied()
        .filter(|(name, url, tag)| q.is_empty() || format!("{name} {tag} {url}").to_lowercase().contains(&q))
        .collect()
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("Custom RSS must start with http:// or https://")]
pub struct InvalidFeedUrl;

pub fn validate_feed_url(raw: &str) -> Result<String, InvalidFeedUrl> {
    let url = raw.trim();
    let lower = url.to_ascii_lowercase();
    if lower.starts_with("http://") || lower.starts_with("https://") {
        Ok(url.to_string())
    } else {
        Err(InvalidFeedUrl)
    }
}

/// Split comma-separated keyword input and merge it into `existing`, lowercased and deduplicated.
pub fn merge_keywords(existing: &[String], input: &str) -> Vec<String> {
    let mut seen: HashSet<String> = existing.iter().cloned().collect();
    let mut out = existing.to_vec();
    for part in input.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let k = part.to_lowercase();
        if seen.insert(k.clone()) {
            out.push(k);
        }
    }
    out
}

#[derive(Debug, Clone, PartialEq)]
pub struct RssOverall {
    pub score: f64,
    pub label: &'static str,
    pub positive_share: f64,
    pub neutral_share: f64,
    pub negative_share: f64,
}

/// Overall verdict from the server-side counts: (pos - neg) / total against a 0.15 threshold.
pub fn rss_overall(counts: &SentimentCounts) -> RssOverall {
    let total = counts.total();
    let share = |n: u64| if total > 0 { n as f64 / total as f64 } else { 0.0 };
    let score = if total > 0 {
        (counts.positive as f64 - counts.negative as f64) / total as f64
    } else {
        0.0
    };
    let label = if score > 0.15 {
        "Overall Positive"
    } else if score < -0.15 {
        "Overall Negative"
    } else {
        "Neutral / Mixed"
    };
    RssOverall {
        score,
        label,
        positive_share: share(counts.positive),
        neutral_share: share(counts.neutral),
        negative_share: share(counts.negative),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ArticleSort {
    #[default]
    PublishedDesc,
    ConfidenceDesc,
    ConfidenceAsc,
}

/// Filter by label (missing labels count as neutral) and sort; undated items sort last.
pub fn filter_articles<'a>(
    items: &'a [RssArticle],
    label: Option<Sentiment>,
    sort: ArticleSort,
) -> Vec<&'a RssArticle> {
    let mut out: Vec<&RssArticle> = items
        .iter()
        .filter(|i| label.is_none_or(|want| Sentiment::parse_or_neutral(i.label.as_deref()) == want))
        .collect();
    let conf = |i: &RssArticle| i.confidence.unwrap_or(0.0);
    let published = |i: &RssArticle| {
        i.published_at
            .as_deref()
            .and_then(parse_timestamp)
            .map(|t| t.timestamp_millis())
            .unwrap_or(0)
    };
    match sort {
        ArticleSort::ConfidenceDesc => out.sort_by(|a, b| conf(b).total_cmp(&conf(a))),
        ArticleSort::ConfidenceAsc => out.sort_by(|a, b| conf(a).total_cmp(&conf(b))),
        ArticleSort::PublishedDesc => out.sort_by_key(|i| std::cmp::Reverse(published(i))),
    }
    out
}

pub const CSV_COLUMNS: [&str; 8] = [
    "title",
    "url",
    "site",
    "source",
    "published_at",
    "label",
    "confidence",
    "narrative",
];

fn csv_cell(raw: Option<String>) -> String {
    raw.map(|s| s.replace("\r\n", " ").replace(['\r', '\n'], " "))
        .unwrap_or_default()
}

/// CSV export of ingested articles; newlines inside fields become spaces.
/// Returns an empty string when there is nothing to export.
pub fn articles_to_csv(items: &[RssArticle]) -> Result<String, csv::Error> {
    if items.is_empty() {
        return Ok(String::new());
    }
    let mut writer = csv::WriterBuilder::new()
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());
    writer.write_record(CSV_COLUMNS)?;
    for item in items {
        writer.write_record([
            csv_cell(item.title.clone()),
            csv_cell(item.url.clone()),
            csv_cell(item.site.clone()),
            csv_cell(item.source.clone()),
            csv_cell(item.published_at.clone()),
            csv_cell(item.label.clone()),
            csv_cell(item.confidence.map(|c| c.to_string())),
            csv_cell(item.narrative.clone()),
        ])?;
    }
    let bytes = writer.into_inner().map_err(|e| e.into_error())?;
    let mut text = String::from_utf8_lossy(&bytes).into_owned();
    if text.ends_with('\n') {
        text.pop();
    }
    Ok(text)
}
