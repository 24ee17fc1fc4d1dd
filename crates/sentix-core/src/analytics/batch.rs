//! Aggregates over multi-model batch rows.

use std::collections::{BTreeMap, BTreeSet};

use sentix_protocol::{BatchResult, Distribution, RowResult, Sentiment, SentimentCounts};

use super::normalize::to01;

/// Every model seen in any row, sorted.
pub fn model_list(rows: &[RowResult]) -> Vec<String> {
    rows.iter()
        .flat_map(|r| r.per_model.keys().cloned())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Pairwise label agreement between models.
#[derive(Debug, Clone, PartialEq)]
pub struct AgreementMatrix {
    /// Models in order of first appearance.
    pub models: Vec<String>,
    /// `pct[i][j]` is the share of rows where both models labelled and agreed; 0 without overlap.
    pub pct: Vec<Vec<f64>>,
}

pub fn agreement_matrix(rows: &[RowResult]) -> AgreementMatrix {
    let mut models: Vec<String> = Vec::new();
    for row in rows {
        for m in row.per_model.keys() {
            if !models.contains(m) {
                models.push(m.clone());
            }
        }
    }

    let n = models.len();
    let mut agree = vec![vec![0u32; n]; n];
    let mut total = vec![vec![0u32; n]; n];
    for row in rows {
        let labels: Vec<Option<&str>> = models
            .iter()
            .map(|m| row.per_model.get(m).and_then(|p| p.label.as_deref()))
            .collect();
        for i in 0..n {
            for j in i..n {
                let (Some(li), Some(lj)) = (labels[i], labels[j]) else {
                    continue;
                };
                total[i][j] += 1;
                if i != j {
                    total[j][i] += 1;
                }
                if li == lj {
                    agree[i][j] += 1;
                    if i != j {
                        agree[j][i] += 1;
                    }
                }
            }
        }
    }

    let pct = (0..n)
        .map(|i| {
            (0..n)
                .map(|j| {
                    if total[i][j] > 0 {
                        f64::from(agree[i][j]) / f64::from(total[i][j])
                    } else {
                        0.0
                    }
                })
                .collect()
        })
        .collect();

    AgreementMatrix { models, pct }
}

/// Mean class probability per model over the rows that report it.
pub fn avg_class_probs(rows: &[RowResult]) -> BTreeMap<String, Distribution> {
    let mut acc: BTreeMap<&str, [(f64, u32); 3]> = BTreeMap::new();
    for row in rows {
        for (model, pred) in &row.per_model {
            let slot = acc.entry(model.as_str()).or_insert([(0.0, 0); 3]);
            for (idx, class) in Sentiment::ALL.iter().enumerate() {
                if let Some(p) = pred.probs.get(class.as_str()).filter(|p| p.is_finite()) {
                    slot[idx].0 += p;
                    slot[idx].1 += 1;
                }
            }
        }
    }
    acc.into_iter()
        .map(|(model, sums)| {
            let avg = |(sum, n): (f64, u32)| if n > 0 { sum / f64::from(n) } else { 0.0 };
            (
                model.to_string(),
                Distribution::new(avg(sums[0]), avg(sums[1]), avg(sums[2])),
            )
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq)]
pub struct BestModel {
    pub model: String,
    pub label: String,
    pub confidence: f64,
}

const NO_VALUE: &str = "—";

fn prediction_confidence(pred: &sentix_protocol::ModelPrediction, label: &str) -> f64 {
    to01(pred
        .confidence
        .or_else(|| pred.probs.get(label).copied())
        .unwrap_or(0.0))
}

/// The hinted best model when it exists in the row, else the most confident one.
/// Rows without any confident prediction yield a placeholder with confidence 0.
pub fn best_model_for_row(row: &RowResult) -> BestModel {
    if let Some(hint) = row.best_model_by_confidence.as_deref() {
        if let Some(pred) = row.per_model.get(hint) {
            let label = pred.label.clone().unwrap_or_else(|| NO_VALUE.to_string());
            let confidence = prediction_confidence(pred, &label);
            return BestModel {
                model: hint.to_string(),
                label,
                confidence,
            };
        }
    }

    let mut best = BestModel {
        model: NO_VALUE.to_string(),
        label: NO_VALUE.to_string(),
        confidence: 0.0,
    };
    for (model, pred) in &row.per_model {
        let label = pred.label.clone().unwrap_or_else(|| NO_VALUE.to_string());
        let confidence = prediction_confidence(pred, &label);
        if confidence > best.confidence {
            best = BestModel {
                model: model.clone(),
                label,
                confidence,
            };
        }
    }
    best
}

/// Count of rows per best-model class; rows with an unrecognised label are not counted.
pub fn class_totals(rows: &[RowResult]) -> SentimentCounts {
    let mut totals = SentimentCounts::default();
    for row in rows {
        if let Some(class) = Sentiment::parse(&best_model_for_row(row).label) {
            totals.add(class);
        }
    }
    totals
}

#[derive(Debug, Clone, PartialEq)]
pub struct BatchStats {
    pub rows: usize,
    /// Mean text length in characters, rounded.
    pub avg_len: usize,
    pub empty_rows: usize,
    /// Mean inference time over rows that report it, rounded.
    pub avg_ms: Option<f64>,
}

pub fn batch_stats(rows: &[RowResult]) -> BatchStats {
    let total_chars: usize = rows.iter().map(|r| r.text.chars().count()).sum();
    let empty_rows = rows.iter().filter(|r| r.text.trim().is_empty()).count();
    let times: Vec<f64> = rows
        .iter()
        .filter_map(|r| r.inference_ms)
        .filter(|ms| ms.is_finite())
        .collect();
    BatchStats {
        rows: rows.len(),
        avg_len: if rows.is_empty() {
            0
        } else {
            (total_chars as f64 / rows.len() as f64).round() as usize
        },
        empty_rows,
        avg_ms: (!times.is_empty()).then(|| (times.iter().sum::<f64>() / times.len() as f64).round()),
    }
}

/// Consensus share reported by the backend and its complement.
pub fn consensus(batch: &BatchResult) -> (f64, f64) {
    let c = batch
        .summary
        .as_ref()
        .and_then(|s| s.consensus_rate)
        .filter(|v| v.is_finite())
        .unwrap_or(0.0);
    (c, 1.0 - c)
}

#[derive(Debug, Clone, Default)]
pub struct RowFilter {
    pub query: String,
    pub label: Option<Sentiment>,
}

/// Rows whose text contains `query` (case-insensitive) and whose best label matches.
pub fn filter_rows<'a>(rows: &'a [RowResult], filter: &RowFilter) -> Vec<&'a RowResult> {
    let q = filter.query.trim().to_lowercase();
    rows.iter()
        .filter(|r| q.is_empty() || r.text.to_lowercase().contains(&q))
        .filter(|r| match filter.label {
            None => true,
            Some(want) => {
                let best = best_model_for_row(r);
                best.label.trim().to_lowercase() == want.as_str()
            }
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowSortKey {
    MaxConfidence,
    Time,
    Length,
    Disagreement,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDir {
    Asc,
    #[default]
    Desc,
}

fn sort_value(row: &RowResult, key: RowSortKey) -> f64 {
    match key {
        RowSortKey::MaxConfidence => row
            .per_model
            .values()
            .map(|p| p.confidence.filter(|c| c.is_finite()).unwrap_or(0.0))
            .fold(0.0, f64::max),
        RowSortKey::Time => row.inference_ms.filter(|ms| ms.is_finite()).unwrap_or(0.0),
        RowSortKey::Length => row.text.chars().count() as f64,
        RowSortKey::Disagreement => row
            .per_model
            .values()
            .filter_map(|p| p.label.as_deref())
            .filter(|l| !l.is_empty())
            .collect::<BTreeSet<_>>()
            .len() as f64,
    }
}

/// Stable sort of rows by `key`.
pub fn sort_rows(rows: &mut [&RowResult], key: RowSortKey, dir: SortDir) {
    rows.sort_by(|a, b| {
        let (va, vb) = (sort_value(a, key), sort_value(b, key));
        match dir {
            SortDir::Asc => va.total_cmp(&vb),
            SortDir::Desc => vb.total_cmp(&va),
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use sentix_protocol::ModelPrediction;

    fn row(text: &str, preds: &[(&str, &str, f64)]) -> RowResult {
        preds.iter().fold(RowResult::new(text), |r, (m, l, c)| {
            r.with_prediction(m, ModelPrediction::new(l, *c))
        })
    }

    #[test]
    fn single_model_two_rows() {
        let rows = vec![
            row("good", &[("m1", "positive", 0.9)]),
            row("bad", &[("m1", "negative", 0.8)]),
        ];
        let totals = class_totals(&rows);
        assert_eq!((totals.negative, totals.neutral, totals.positive), (1, 0, 1));
        let m = agreement_matrix(&rows);
        assert_eq!(m.models, vec!["m1".to_string()]);
        assert_eq!(m.pct, vec![vec![1.0]]);
    }

    #[test]
    fn agreement_counts_only_rows_where_both_labelled() {
        let mut partial = row("c", &[("a", "positive", 0.6)]);
        partial
            .per_model
            .insert("b".into(), ModelPrediction::default());
        let rows = vec![
            row("x", &[("a", "positive", 0.9), ("b", "positive", 0.7)]),
            row("y", &[("a", "negative", 0.9), ("b", "neutral", 0.7)]),
            partial,
        ];
        let m = agreement_matrix(&rows);
        let (ia, ib) = (0, 1);
        assert_eq!(m.models, vec!["a".to_string(), "b".to_string()]);
        assert_eq!(m.pct[ia][ib], 0.5);
        assert_eq!(m.pct[ib][ia], 0.5);
        assert_eq!(m.pct[ia][ia], 1.0);
    }

    #[test]
    fn best_model_uses_hint_then_percentage_confidence() {
        let mut r = row("t", &[("a", "positive", 0.6), ("b", "negative", 85.0)]);
        assert_eq!(best_model_for_row(&r).model, "b");
        assert!((best_model_for_row(&r).confidence - 0.85).abs() < 1e-12);
        r.best_model_by_confidence = Some("a".into());
        assert_eq!(best_model_for_row(&r).label, "positive");
        r.best_model_by_confidence = Some("missing".into());
        assert_eq!(best_model_for_row(&r).model, "b");

        let empty = RowResult::new("nothing");
        let best = best_model_for_row(&empty);
        assert_eq!(best.model, "—");
        assert_eq!(best.confidence, 0.0);
    }

    #[test]
    fn probs_fill_in_missing_confidence() {
        let mut pred = ModelPrediction::default();
        pred.label = Some("neutral".into());
        pred.probs.insert("neutral".into(), 0.55);
        let r = RowResult::new("t").with_prediction("m", pred);
        assert!((best_model_for_row(&r).confidence - 0.55).abs() < 1e-12);
        let avg = avg_class_probs(std::slice::from_ref(&r));
        assert_eq!(avg["m"].neutral, 0.55);
        assert_eq!(avg["m"].positive, 0.0);
    }

    #[test]
    fn stats_filter_and_sort() {
        let mut a = row("Battery life is great", &[("m", "positive", 0.9), ("n", "neutral", 0.4)]);
        a.inference_ms = Some(12.0);
        let mut b = row("   ", &[("m", "neutral", 0.5)]);
        b.inference_ms = Some(f64::NAN);
        let c = row("Terrible support", &[("m", "negative", 0.95)]);
        let rows = vec![a, b, c];

        let stats = batch_stats(&rows);
        assert_eq!(stats.empty_rows, 1);
        assert_eq!(stats.avg_ms, Some(12.0));
        // (21 + 3 + 16) / 3 rounded
        assert_eq!(stats.avg_len, 13);

        let hits = filter_rows(
            &rows,
            &RowFilter {
                query: "SUPPORT".into(),
                label: None,
            },
        );
        assert_eq!(hits.len(), 1);
        let neg = filter_rows(
            &rows,
            &RowFilter {
                query: String::new(),
                label: Some(Sentiment::Negative),
            },
        );
        assert_eq!(neg[0].text, "Terrible support");

        let mut all: Vec<&RowResult> = rows.iter().collect();
        sort_rows(&mut all, RowSortKey::MaxConfidence, SortDir::Desc);
        assert_eq!(all[0].text, "Terrible support");
        sort_rows(&mut all, RowSortKey::Disagreement, SortDir::Desc);
        assert_eq!(all[0].text, "Battery life is great");
        sort_rows(&mut all, RowSortKey::Length, SortDir::Asc);
        assert_eq!(all[0].text, "   ");
        assert_eq!(model_list(&rows), vec!["m".to_string(), "n".to_string()]);
    }
}
