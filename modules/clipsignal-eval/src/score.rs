//! Scoring of variant predictions against gold labels.
//!
//! A window has at most one prediction but may carry several gold quotes;
//! the prediction is matched against its best gold quote by token-set
//! Jaccard. A prediction that hits a window with gold but misses every
//! quote counts as both a false positive and a false negative.

use std::cmp::Ordering;

use clipsignal_common::heuristics::{normalize_whitespace, token_set_jaccard};
use serde::{Deserialize, Serialize};

/// Minimum Jaccard overlap with a gold quote for a true positive.
pub const TP_JACCARD_THRESHOLD: f64 = 0.56;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Label {
    #[serde(rename = "TP")]
    Tp,
    #[serde(rename = "FP")]
    Fp,
    #[serde(rename = "FN")]
    Fn,
    #[serde(rename = "TN")]
    Tn,
    #[serde(rename = "FP_FN")]
    FpFn,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub label: Label,
    pub best_score: f64,
    pub best_gold: Option<String>,
}

/// Compare a single prediction against the gold quotes for its window.
pub fn evaluate_prediction(pred_quote: &str, gold_quotes: &[String]) -> Evaluation {
    let pred = normalize_whitespace(pred_quote);
    let gold: Vec<String> = gold_quotes
        .iter()
        .map(|q| normalize_whitespace(q))
        .filter(|q| !q.is_empty())
        .collect();

    match (!gold.is_empty(), !pred.is_empty()) {
        (false, false) => {
            return Evaluation { label: Label::Tn, best_score: 1.0, best_gold: None };
        }
        (false, true) => {
            return Evaluation { label: Label::Fp, best_score: 0.0, best_gold: None };
        }
        (true, false) => {
            return Evaluation {
                label: Label::Fn,
                best_score: 0.0,
                best_gold: gold.into_iter().next(),
            };
        }
        (true, true) => {}
    }

    let mut best_score = 0.0;
    let mut best_gold = None;
    for quote in gold {
        let score = token_set_jaccard(&pred, &quote);
        if score > best_score {
            best_score = score;
            best_gold = Some(quote);
        }
    }

    let label = if best_score >= TP_JACCARD_THRESHOLD {
        Label::Tp
    } else {
        Label::FpFn
    };
    Evaluation { label, best_score, best_gold }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariantMetrics {
    pub tp: u32,
    pub fp: u32,
    #[serde(rename = "fn")]
    pub fn_count: u32,
    pub tn: u32,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
}

/// Aggregate labels into counts plus precision/recall/F1. An empty
/// denominator reads as a perfect score rather than a division by zero, so
/// an all-TN run reports precision and recall of 1.0.
pub fn summarize_metrics(labels: impl IntoIterator<Item = Label>) -> VariantMetrics {
    let mut tp = 0u32;
    let mut fp = 0u32;
    let mut fn_count = 0u32;
    let mut tn = 0u32;

    for label in labels {
        match label {
            Label::Tp => tp += 1,
            Label::Fp => fp += 1,
            Label::Fn => fn_count += 1,
            Label::Tn => tn += 1,
            Label::FpFn => {
                fp += 1;
                fn_count += 1;
            }
        }
    }

    let precision = if tp + fp == 0 { 1.0 } else { f64::from(tp) / f64::from(tp + fp) };
    let recall = if tp + fn_count == 0 { 1.0 } else { f64::from(tp) / f64::from(tp + fn_count) };
    let f1 = if precision + recall == 0.0 {
        0.0
    } else {
        2.0 * precision * recall / (precision + recall)
    };

    VariantMetrics { tp, fp, fn_count, tn, precision, recall, f1 }
}

/// Ranking order for picking the best variant: F1, then precision, then
/// recall. Returns `Greater` when `a` outranks `b`.
pub fn rank_metrics(a: &VariantMetrics, b: &VariantMetrics) -> Ordering {
    a.f1.total_cmp(&b.f1)
        .then(a.precision.total_cmp(&b.precision))
        .then(a.recall.total_cmp(&b.recall))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_both_empty_is_true_negative() {
        let eval = evaluate_prediction("", &[]);
        assert_eq!(eval.label, Label::Tn);
        assert_eq!(eval.best_score, 1.0);
        assert!(eval.best_gold.is_none());
    }

    #[test]
    fn test_prediction_without_gold_is_false_positive() {
        let eval = evaluate_prediction("the exports are capped at 720p", &[]);
        assert_eq!(eval.label, Label::Fp);
        assert_eq!(eval.best_score, 0.0);
    }

    #[test]
    fn test_gold_without_prediction_is_false_negative() {
        let gold = vec!["rendering takes about two minutes per clip".to_string()];
        let eval = evaluate_prediction("  ", &gold);
        assert_eq!(eval.label, Label::Fn);
        assert_eq!(eval.best_gold.as_deref(), Some("rendering takes about two minutes per clip"));
    }

    #[test]
    fn test_exact_match_is_true_positive() {
        let gold = vec!["the free plan adds a watermark to every export".to_string()];
        let eval = evaluate_prediction("the free plan adds a watermark to every export", &gold);
        assert_eq!(eval.label, Label::Tp);
        assert_eq!(eval.best_score, 1.0);
    }

    #[test]
    fn test_weak_overlap_counts_both_ways() {
        let gold = vec!["the free plan adds a watermark to every export".to_string()];
        let eval = evaluate_prediction("pricing starts at twenty dollars monthly", &gold);
        assert_eq!(eval.label, Label::FpFn);
        assert!(eval.best_score < TP_JACCARD_THRESHOLD);
    }

    #[test]
    fn test_best_gold_quote_wins() {
        let gold = vec![
            "completely unrelated sentence about something else".to_string(),
            "exports are capped at ten minutes on the starter plan".to_string(),
        ];
        let eval =
            evaluate_prediction("exports are capped at ten minutes on the starter plan", &gold);
        assert_eq!(eval.label, Label::Tp);
        assert_eq!(
            eval.best_gold.as_deref(),
            Some("exports are capped at ten minutes on the starter plan")
        );
    }

    #[test]
    fn test_fp_fn_counts_in_both_columns() {
        let metrics = summarize_metrics([Label::Tp, Label::FpFn, Label::Tn]);
        assert_eq!(metrics.tp, 1);
        assert_eq!(metrics.fp, 1);
        assert_eq!(metrics.fn_count, 1);
        assert_eq!(metrics.tn, 1);
        assert_eq!(metrics.precision, 0.5);
        assert_eq!(metrics.recall, 0.5);
    }

    #[test]
    fn test_all_true_negatives_reads_perfect() {
        let metrics = summarize_metrics([Label::Tn, Label::Tn]);
        assert_eq!(metrics.precision, 1.0);
        assert_eq!(metrics.recall, 1.0);
        assert_eq!(metrics.f1, 1.0);
    }

    #[test]
    fn test_metrics_serialize_fn_column() {
        let metrics = summarize_metrics([Label::Fn]);
        let json = serde_json::to_value(&metrics).unwrap();
        assert_eq!(json["fn"], 1);
        assert_eq!(json["f1"], 0.0);
    }

    #[test]
    fn test_rank_prefers_f1_then_precision() {
        let a = summarize_metrics([Label::Tp, Label::Tp]);
        let b = summarize_metrics([Label::Tp, Label::FpFn]);
        assert_eq!(rank_metrics(&a, &b), Ordering::Greater);

        let precise = summarize_metrics([Label::Tp, Label::Fn]);
        let loose = summarize_metrics([Label::Tp, Label::Fp]);
        assert_eq!(precise.f1, loose.f1);
        assert_eq!(rank_metrics(&precise, &loose), Ordering::Greater);
    }
}
