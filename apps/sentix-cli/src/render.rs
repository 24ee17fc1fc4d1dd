//! Plain-text report rendering.

use std::fmt::Write as _;

use sentix_core::analytics::batch::{
    agreement_matrix, avg_class_probs, batch_stats, best_model_for_row, class_totals, consensus,
    filter_rows, sort_rows, RowFilter, RowSortKey, SortDir,
};
use sentix_core::analytics::normalize::{
    clamp01, clamp_text, distribution_shares, fmt_weight, pct, sentence_confidence_pct, to_pct,
};
use sentix_core::analytics::words::{word_heatmap, WordOptions};
use sentix_protocol::{AnalysisResult, BatchResult, DeepRowOutcome, Sentiment, SentimentCounts};

const BAR_WIDTH: usize = 24;

/// Horizontal bar for a fraction in [0, 1].
pub fn bar(fraction: f64, width: usize) -> String {
    let filled = (clamp01(fraction) * width as f64).round() as usize;
    let mut out = "█".repeat(filled);
    out.push_str(&"░".repeat(width - filled));
    out
}

/// Left-aligned columns separated by two spaces.
pub fn table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate() {
            if let Some(w) = widths.get_mut(i) {
                *w = (*w).max(cell.chars().count());
            }
        }
    }
    let line = |cells: Vec<&str>| {
        let mut s = String::new();
        for (i, cell) in cells.iter().enumerate() {
            if i > 0 {
                s.push_str("  ");
            }
            let pad = widths[i].saturating_sub(cell.chars().count());
            s.push_str(cell);
            if i + 1 < cells.len() {
                s.push_str(&" ".repeat(pad));
            }
        }
        s
    };
    let mut out = line(headers.to_vec());
    for row in rows {
        out.push('\n');
        out.push_str(&line(row.iter().map(String::as_str).take(headers.len()).collect()));
    }
    out
}

pub fn print_json<T: serde::Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(s) => println!("{s}"),
        Err(e) => eprintln!("failed to encode output: {e}"),
    }
}

pub fn counts_line(counts: &SentimentCounts) -> String {
    format!(
        "positive {}  neutral {}  negative {}",
        counts.positive, counts.neutral, counts.negative
    )
}

pub fn analysis_report(result: &AnalysisResult) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Overall: {} ({} confidence)",
        result.label(),
        pct(clamp01(result.confidence))
    );
    if let Some(model) = result.model.as_deref() {
        let _ = writeln!(out, "Model: {model}");
    }
    if let Some(shares) = distribution_shares(&result.distribution) {
        for (class, share) in shares {
            let _ = writeln!(out, "  {:<8} {} {}", class.as_str(), bar(share, BAR_WIDTH), pct(share));
        }
    }

    let words = word_heatmap(
        &result.word_attributions,
        &WordOptions {
            max_items: 12,
            ..WordOptions::default()
        },
    );
    if !words.cells.is_empty() {
        let _ = writeln!(out, "\nTop words:");
        let rows: Vec<Vec<String>> = words
            .cells
            .iter()
            .map(|c| {
                vec![
                    c.token.clone(),
                    c.polarity.as_str().to_string(),
                    fmt_weight(c.score),
                    bar(c.score.abs() / words.max_abs, 12),
                ]
            })
            .collect();
        let _ = writeln!(out, "{}", table(&["token", "polarity", "score", ""], &rows));
    }

    if !result.sentence_sentiments.is_empty() {
        let _ = writeln!(out, "\nSentences:");
        for s in &result.sentence_sentiments {
            let label = Sentiment::parse_or_neutral(s.sentiment.as_deref());
            let conf = sentence_confidence_pct(s).unwrap_or_else(|| "—".into());
            let _ = writeln!(out, "  [{:<8} {:>6}] {}", label.as_str(), conf, clamp_text(&s.sentence, 100));
        }
    }
    if let Some(rationale) = result.rationale() {
        let _ = writeln!(out, "\nRationale:\n{rationale}");
    }
    out
}

pub fn batch_report(batch: &BatchResult, filter: &RowFilter, max_rows: usize) -> String {
    let mut out = String::new();
    if let Some(name) = batch.source_name() {
        let _ = writeln!(out, "Source: {name}");
    }
    let stats = batch_stats(&batch.rows);
    let _ = writeln!(
        out,
        "Rows: {}  empty: {}  avg length: {}  avg inference: {}",
        stats.rows,
        stats.empty_rows,
        stats.avg_len,
        stats
            .avg_ms
            .map(|ms| format!("{ms:.1} ms"))
            .unwrap_or_else(|| "—".into())
    );
    let (agree, disagree) = consensus(batch);
    let _ = writeln!(out, "Consensus: {} agree / {} disagree", pct(agree), pct(disagree));
    let _ = writeln!(out, "Best-label totals: {}", counts_line(&class_totals(&batch.rows)));

    let matrix = agreement_matrix(&batch.rows);
    if matrix.models.len() > 1 {
        let mut headers = vec![""];
        headers.extend(matrix.models.iter().map(String::as_str));
        let rows: Vec<Vec<String>> = matrix
            .models
            .iter()
            .zip(&matrix.pct)
            .map(|(m, row)| {
                std::iter::once(m.clone())
                    .chain(row.iter().map(|v| pct(*v)))
                    .collect()
            })
            .collect();
        let _ = writeln!(out, "\nModel agreement:\n{}", table(&headers, &rows));
    }

    let probs = avg_class_probs(&batch.rows);
    if !probs.is_empty() {
        let rows: Vec<Vec<String>> = probs
            .iter()
            .map(|(model, d)| {
                std::iter::once(model.clone())
                    .chain(Sentiment::ALL.iter().map(|c| pct(d.get(*c))))
                    .collect()
            })
            .collect();
        let _ = writeln!(
            out,
            "\nAverage class probability:\n{}",
            table(&["model", "negative", "neutral", "positive"], &rows)
        );
    }

    let mut ordered = filter_rows(&batch.rows, filter);
    sort_rows(&mut ordered, RowSortKey::MaxConfidence, SortDir::Desc);
    let rows: Vec<Vec<String>> = ordered
        .iter()
        .take(max_rows)
        .map(|row| {
            let best = best_model_for_row(row);
            vec![
                best.label,
                to_pct(best.confidence, 0),
                best.model,
                clamp_text(&row.text, 70),
            ]
        })
        .collect();
    if !rows.is_empty() {
        let _ = writeln!(out, "\nRows (by confidence):\n{}", table(&["label", "conf", "model", "text"], &rows));
        if ordered.len() > max_rows {
            let _ = writeln!(out, "… {} more", ordered.len() - max_rows);
        }
    }
    out
}

pub fn deep_rows_report(outcomes: &[DeepRowOutcome]) -> String {
    let rows: Vec<Vec<String>> = outcomes
        .iter()
        .enumerate()
        .map(|(i, o)| match o {
            DeepRowOutcome::Analyzed(r) => vec![
                (i + 1).to_string(),
                r.label().as_str().to_string(),
                pct(clamp01(r.confidence)),
                clamp_text(r.rationale().unwrap_or_default(), 70),
            ],
            DeepRowOutcome::Failed { error, text } => vec![
                (i + 1).to_string(),
                "error".into(),
                "—".into(),
                clamp_text(&format!("{error} ({text})"), 70),
            ],
        })
        .collect();
    table(&["#", "label", "conf", "detail"], &rows)
}
