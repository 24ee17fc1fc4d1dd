use sentix_protocol::{Distribution, SentenceSentiment, Sentiment};

/// Clamp to [0, 1]; non-finite input maps to 0.
pub fn clamp01(v: f64) -> f64 {
    if v.is_finite() {
        v.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

/// Map a confidence that may be a fraction or a percentage onto [0, 1].
///
/// Values in [0, 1] pass through, values in (1, 100] are read as percentages,
/// and anything else (negative, above 100, non-finite) maps to 0.
pub fn to01(v: f64) -> f64 {
    if !v.is_finite() || v < 0.0 {
        return 0.0;
    }
    if v <= 1.0 {
        return v;
    }
    if v <= 100.0 {
        return v / 100.0;
    }
    0.0
}

/// `to01` rendered as a percentage with `digits` decimals.
pub fn to_pct(v: f64, digits: usize) -> String {
    format!("{:.*}%", digits, to01(v) * 100.0)
}

/// Fraction rendered as a whole percentage; non-finite input shows as 0%.
pub fn pct(v: f64) -> String {
    let v = if v.is_finite() { v } else { 0.0 };
    format!("{}%", (v * 100.0).round() as i64)
}

/// Truncate to `max` characters, appending an ellipsis when shortened.
pub fn clamp_text(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max).collect();
    out.push('…');
    out
}

/// Confidence of a sentence as a percentage string with one decimal.
///
/// Uses `probs[sentiment]` when present, else maps `score` from [-1, 1] onto [0, 1].
pub fn sentence_confidence_pct(s: &SentenceSentiment) -> Option<String> {
    let from_probs = s
        .sentiment
        .as_deref()
        .and_then(|lab| s.probs.get(lab))
        .copied()
        .filter(|p| p.is_finite());
    if let Some(p) = from_probs {
        return Some(format!("{:.1}%", clamp01(p) * 100.0));
    }
    s.score
        .filter(|v| v.is_finite())
        .map(|score| format!("{:.1}%", clamp01((score + 1.0) / 2.0) * 100.0))
}

/// Proportions of a distribution for a half-wheel or bar; `None` when there is nothing to draw.
pub fn distribution_shares(d: &Distribution) -> Option<[(Sentiment, f64); 3]> {
    let total = d.total();
    if !total.is_finite() || total <= 0.0 {
        return None;
    }
    Some(Sentiment::ALL.map(|c| (c, d.share(c))))
}

/// Format a signed attribution weight compactly.
pub fn fmt_weight(v: f64) -> String {
    let a = v.abs();
    if a >= 0.01 {
        format!("{v:.2}")
    } else if a >= 0.001 {
        format!("{v:.3}")
    } else {
        format!("{v:.1e}")
    }
}
