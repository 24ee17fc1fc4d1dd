//! Derived views over windowed YouTube transcript segments.

use sentix_protocol::{AnalysisResult, Sentiment, SentimentCounts, TranscriptSegment, YoutubeAnalysis};

use super::format::fmt_time;
use super::normalize::clamp01;

/// Polarity average beyond which the video is called positive or negative.
pub const POLARITY_THRESHOLD: f64 = 0.15;

#[derive(Debug, Clone, PartialEq)]
pub struct TimelinePoint {
    /// 1-based position in the backend's segment order.
    pub idx: usize,
    /// Start time in seconds.
    pub t: f64,
    pub t_label: String,
    pub label: Sentiment,
    pub score: f64,
    pub confidence: f64,
    pub chars: usize,
    /// Duration in seconds, at least 1.
    pub dur: f64,
}

/// One point per segment, sorted by start time. Missing start times fall back
/// to `index * window_seconds`, missing end times to `start + window_seconds`.
pub fn segment_timeline(analysis: &YoutubeAnalysis) -> Vec<TimelinePoint> {
    let window = analysis.window_seconds();
    let mut points: Vec<TimelinePoint> = analysis
        .segments
        .iter()
        .enumerate()
        .map(|(i, seg)| {
            let label = seg.class();
            let start = seg.start_secs().unwrap_or(i as f64 * window);
            let end = seg.end_secs().unwrap_or(start + window);
            TimelinePoint {
                idx: i + 1,
                t: start,
                t_label: fmt_time(start),
                label,
                score: label.polarity(),
                confidence: seg.confidence_hint(),
                chars: seg.text.trim().chars().count(),
                dur: (end - start).max(1.0),
            }
        })
        .collect();
    points.sort_by(|a, b| a.t.total_cmp(&b.t));
    points
}

#[derive(Debug, Clone, PartialEq)]
pub struct RollingPoint {
    pub t: f64,
    pub score: f64,
    pub mean: f64,
    pub upper: f64,
    pub lower: f64,
}

/// Odd window size for the rolling mean: grows with the series, between 3 and 9.
pub fn rolling_window(n: usize) -> usize {
    ((n / 12) * 2 + 3).clamp(3, 9)
}

/// Centered rolling mean with a 0.75 standard deviation band clamped to [-1, 1].
pub fn rolling_band(points: &[TimelinePoint]) -> Vec<RollingPoint> {
    if points.is_empty() {
        return Vec::new();
    }
    let half = rolling_window(points.len()) / 2;
    let last = points.len() - 1;
    points
        .iter()
        .enumerate()
        .map(|(i, p)| {
            let lo = i.saturating_sub(half);
            let hi = (i + half).min(last);
            let slice = &points[lo..=hi];
            let len = slice.len() as f64;
            let mean = slice.iter().map(|x| x.score).sum::<f64>() / len;
            let variance = slice.iter().map(|x| (x.score - mean).powi(2)).sum::<f64>()
                / (len - 1.0).max(1.0);
            let std = variance.sqrt();
            RollingPoint {
                t: p.t,
                score: p.score,
                mean,
                upper: (mean + 0.75 * std).min(1.0),
                lower: (mean - 0.75 * std).max(-1.0),
            }
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MinuteBucket {
    pub minute: i64,
    pub pos: u32,
    pub neu: u32,
    pub neg: u32,
    pub total: u32,
}

/// Label counts per started minute, in time order, limited to the first 60 buckets.
pub fn per_minute(points: &[TimelinePoint]) -> Vec<MinuteBucket> {
    let mut buckets: std::collections::BTreeMap<i64, MinuteBucket> = Default::default();
    for p in points {
        let minute = (p.t / 60.0).floor() as i64;
        let b = buckets.entry(minute).or_insert(MinuteBucket {
            minute,
            pos: 0,
            neu: 0,
            neg: 0,
            total: 0,
        });
        match p.label {
            Sentiment::Positive => b.pos += 1,
            Sentiment::Negative => b.neg += 1,
            Sentiment::Neutral => b.neu += 1,
        }
        b.total += 1;
    }
    buckets.into_values().take(60).collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LengthBin {
    pub label: String,
    pub count: u32,
}

/// Ten equal-width bins over segment character counts; the width is at least 10.
pub fn length_histogram(points: &[TimelinePoint]) -> Vec<LengthBin> {
    if points.is_empty() {
        return Vec::new();
    }
    const BINS: usize = 10;
    let max = points.iter().map(|p| p.chars).max().unwrap_or(0).max(1);
    let step = max.div_ceil(BINS).max(10);
    let mut counts = [0u32; BINS];
    for p in points {
        counts[(p.chars / step).min(BINS - 1)] += 1;
    }
    counts
        .iter()
        .enumerate()
        .map(|(i, c)| LengthBin {
            label: format!("{}-{}", i * step, (i + 1) * step),
            count: *c,
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq)]
pub struct LabelConfidence {
    pub label: Sentiment,
    pub avg: f64,
    pub n: u32,
}

/// Mean segment confidence per class, ordered positive, neutral, negative.
pub fn confidence_by_label(points: &[TimelinePoint]) -> Vec<LabelConfidence> {
    if points.is_empty() {
        return Vec::new();
    }
    [Sentiment::Positive, Sentiment::Neutral, Sentiment::Negative]
        .into_iter()
        .map(|label| {
            let (sum, n) = points
                .iter()
                .filter(|p| p.label == label)
                .fold((0.0, 0u32), |(s, n), p| (s + p.confidence, n + 1));
            LabelConfidence {
                label,
                avg: if n > 0 { sum / f64::from(n) } else { 0.0 },
                n,
            }
        })
        .collect()
}

/// Segments per recognised label; unlabelled segments are not counted.
pub fn segment_counts(segments: &[TranscriptSegment]) -> SentimentCounts {
    let mut counts = SentimentCounts::default();
    for seg in segments {
        if let Some(class) = Sentiment::parse(&seg.label_str()) {
            counts.add(class);
        }
    }
    counts
}

/// Mean of +1/0/-1 over all segments, in [-1, 1].
pub fn polarity_score(segments: &[TranscriptSegment]) -> f64 {
    if segments.is_empty() {
        return 0.0;
    }
    segments.iter().map(|s| s.class().polarity()).sum::<f64>() / segments.len() as f64
}

pub fn infer_overall_label(avg: f64, threshold: f64) -> Sentiment {
    if avg > threshold {
        Sentiment::Positive
    } else if avg < -threshold {
        Sentiment::Negative
    } else {
        Sentiment::Neutral
    }
}

/// Share of the dominant class.
pub fn infer_confidence(counts: &SentimentCounts) -> f64 {
    let max = counts.positive.max(counts.neutral).max(counts.negative);
    max as f64 / counts.total().max(1) as f64
}

/// Non-empty segment texts, trimmed and joined by newlines.
pub fn build_transcript(segments: &[TranscriptSegment]) -> String {
    segments
        .iter()
        .map(|s| s.text.trim())
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

#[derive(Debug, Clone, PartialEq)]
pub struct Headline {
    pub label: String,
    pub confidence: f64,
}

/// Verdict of the windowed stream: reported by the backend when available, else inferred.
pub fn stream_headline(analysis: &YoutubeAnalysis) -> Headline {
    let label = analysis
        .reported_label()
        .unwrap_or_else(|| {
            infer_overall_label(polarity_score(&analysis.segments), POLARITY_THRESHOLD)
                .as_str()
                .to_string()
        });
    let confidence = analysis
        .reported_confidence()
        .or_else(|| analysis.avg_confidence())
        .map(clamp01)
        .unwrap_or_else(|| clamp01(infer_confidence(&segment_counts(&analysis.segments))));
    Headline { label, confidence }
}

fn deep_label(deep: &AnalysisResult) -> Option<String> {
    deep.overall_sentiment
        .clone()
        .or_else(|| {
            ["label", "sentiment"]
                .iter()
                .find_map(|k| deep.extra.get(*k).and_then(|v| v.as_str()).map(str::to_string))
        })
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
}

/// Headline shown for the video: the deep transcript analysis wins over the stream.
pub fn headline(analysis: &YoutubeAnalysis, deep: Option<&AnalysisResult>) -> Headline {
    let stream = stream_headline(analysis);
    match deep {
        Some(d) => Headline {
            label: deep_label(d).unwrap_or(stream.label),
            confidence: clamp01(d.confidence),
        },
        None => stream,
    }
}

/// Plain-text report combining headline, stream summary and explanation.
pub fn combined_summary(analysis: &YoutubeAnalysis, deep: Option<&AnalysisResult>) -> String {
    let head = headline(analysis, deep);
    let mut parts: Vec<String> = Vec::new();

    if !head.label.is_empty() {
        let conf_pct = (head.confidence * 1000.0).round() / 10.0;
        parts.push(format!(
            "Overall sentiment: {} ({}% confidence)",
            head.label, conf_pct
        ));
    }
    if let Some(text) = analysis.summary_text.as_deref().filter(|t| !t.is_empty()) {
        parts.push(format!("Summary:\n{text}"));
    }
    if !analysis.summary_bullets.is_empty() {
        let bullets: Vec<String> = analysis
            .summary_bullets
            .iter()
            .map(|b| format!("- {b}"))
            .collect();
        parts.push(format!("Key points:\n{}", bullets.join("\n")));
    }
    let explanation = deep.map(|d| match d.narrative.as_deref().or(d.explanation.as_deref()) {
        Some(n) if !n.is_empty() => n.to_string(),
        _ => format!(
            "Model predicts \"{}\" overall sentiment with about {:.1}% confidence based on the full transcript.",
            head.label,
            head.confidence * 100.0
        ),
    });
    if let Some(e) = explanation {
        parts.push(format!("Explanation:\n{e}"));
    }
    parts.join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn analysis(v: serde_json::Value) -> YoutubeAnalysis {
        serde_json::from_value(v).unwrap()
    }

    #[test]
    fn timeline_falls_back_to_window_positions_and_sorts() {
        let a = analysis(json!({
            "segments": [
                {"text": "late", "label": "positive", "start": 100, "end": 100.5},
                {"text": "first", "label": "negative"},
                {"text": "", "sentiment": "neutral", "confidence": 3}
            ],
            "params_used": {"window_seconds": 30}
        }));
        let pts = segment_timeline(&a);
        assert_eq!(pts.iter().map(|p| p.idx).collect::<Vec<_>>(), vec![2, 3, 1]);
        assert_eq!(pts[0].t, 30.0);
        assert_eq!(pts[0].dur, 30.0);
        assert_eq!(pts[1].t, 60.0);
        assert_eq!(pts[1].confidence, 1.0);
        assert_eq!(pts[2].dur, 1.0);
        assert_eq!(pts[2].t_label, "01:40");
        assert_eq!(pts[0].score, -1.0);
    }

    #[test]
    fn rolling_window_size_adapts() {
        assert_eq!(rolling_window(1), 3);
        assert_eq!(rolling_window(12), 5);
        assert_eq!(rolling_window(36), 9);
        assert_eq!(rolling_window(500), 9);
    }

    #[test]
    fn rolling_band_is_clamped() {
        let segs: Vec<_> = ["positive", "positive", "negative", "positive"]
            .iter()
            .map(|l| json!({"text": "x", "label": l}))
            .collect();
        let pts = segment_timeline(&analysis(json!({ "segments": segs })));
        let band = rolling_band(&pts);
        assert_eq!(band.len(), 4);
        assert!((band[0].mean - 1.0).abs() < 1e-12);
        assert_eq!(band[0].upper, 1.0);
        assert!((band[1].mean - 1.0 / 3.0).abs() < 1e-12);
        assert!(band.iter().all(|b| b.lower >= -1.0 && b.upper <= 1.0));
    }

    #[test]
    fn minute_buckets_and_length_bins() {
        let a = analysis(json!({
            "segments": [
                {"text": "a".repeat(5), "label": "positive", "start": 5},
                {"text": "b".repeat(95), "label": "negative", "start": 50},
                {"text": "c".repeat(200), "label": "meh", "start": 65}
            ]
        }));
        let pts = segment_timeline(&a);
        let mins = per_minute(&pts);
        assert_eq!(mins.len(), 2);
        assert_eq!((mins[0].pos, mins[0].neg, mins[0].total), (1, 1, 2));
        assert_eq!(mins[1].neu, 1);

        let bins = length_histogram(&pts);
        assert_eq!(bins.len(), 10);
        assert_eq!(bins[0].label, "0-20");
        assert_eq!(bins[0].count, 1);
        assert_eq!(bins[4].count, 1);
        assert_eq!(bins[9].count, 1);

        let conf = confidence_by_label(&pts);
        assert_eq!(conf[1].label, Sentiment::Neutral);
        assert_eq!(conf[1].n, 1);
    }

    #[test]
    fn headline_prefers_deep_then_reported_then_inferred() {
        let a = analysis(json!({
            "segments": [
                {"text": "a", "label": "positive"},
                {"text": "b", "label": "positive"},
                {"text": "c", "label": "neutral"}
            ]
        }));
        let h = headline(&a, None);
        assert_eq!(h.label, "positive");
        assert!((h.confidence - 2.0 / 3.0).abs() < 1e-12);

        let a2 = analysis(json!({
            "segments": [],
            "overall": {"label": "Negative", "confidence": 0.7},
            "summary": {"avg_confidence": 0.2}
        }));
        assert_eq!(headline(&a2, None), Headline { label: "negative".into(), confidence: 0.7 });

        let deep: AnalysisResult =
            serde_json::from_value(json!({"overall_sentiment": "Neutral", "confidence": 0.834})).unwrap();
        let text = combined_summary(&a, Some(&deep));
        assert!(text.starts_with("Overall sentiment: neutral (83.4% confidence)"));
        assert!(text.contains(
            "Explanation:\nModel predicts \"neutral\" overall sentiment with about 83.4% confidence based on the full transcript."
        ));
    }

    #[test]
    fn summary_sections_and_transcript() {
        let a = analysis(json!({
            "segments": [{"text": "  hello "}, {"text": ""}, {"text": "world"}],
            "overall_label": "positive",
            "overall_confidence": 0.5,
            "summary_text": "Short recap",
            "summary_bullets": ["one", "two"]
        }));
        assert_eq!(build_transcript(&a.segments), "hello\nworld");
        assert_eq!(
            combined_summary(&a, None),
            "Overall sentiment: positive (50% confidence)\n\nSummary:\nShort recap\n\nKey points:\n- one\n- two"
        );
    }
}
