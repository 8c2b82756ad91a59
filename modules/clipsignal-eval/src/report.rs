//! Output files: pretty-printed JSON artifacts plus a markdown summary
//! with the per-variant metrics table and the best variant's worst windows.

use std::fs;
use std::path::Path;

use anyhow::Result;
use serde::Serialize;

use crate::dataset::Dataset;
use crate::experiment::Experiment;
use crate::gold::GoldLabels;
use crate::score::Label;

pub const DATASET_FILE: &str = "dataset.windows.json";
pub const GOLD_FILE: &str = "gold.reviews.json";
pub const EXPERIMENTS_FILE: &str = "mini.experiments.json";
pub const SUMMARY_FILE: &str = "summary.md";

pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let body = serde_json::to_string_pretty(value)?;
    fs::write(path, format!("{body}\n"))?;
    Ok(())
}

pub fn write_markdown(path: &Path, body: &str) -> Result<()> {
    fs::write(path, format!("{body}\n"))?;
    Ok(())
}

pub fn render_summary(dataset: &Dataset, gold: &GoldLabels, experiment: &Experiment) -> String {
    let gold_positive = gold.windows.iter().filter(|w| !w.reviews.is_empty()).count();
    let best_id = experiment.best_variant.as_deref().unwrap_or("none");

    let mut lines = vec![
        format!("# Review Prompt Tuning Summary ({})", dataset.tool.slug),
        String::new(),
        format!("- Tool: {} ({})", dataset.tool.name, dataset.tool.slug),
        format!("- Cached videos analyzed: {}", dataset.selected_video_count),
        format!("- Transcript windows analyzed: {}", dataset.window_count),
        format!("- Gold windows with >=1 valuable review: {gold_positive}"),
        format!("- Best mini variant: {best_id}"),
        String::new(),
        "## Variant Metrics".to_string(),
        String::new(),
        "| Variant | Precision | Recall | F1 | TP | FP | FN | TN |".to_string(),
        "|---|---:|---:|---:|---:|---:|---:|---:|".to_string(),
    ];
    for variant in &experiment.variants {
        let m = &variant.metrics;
        lines.push(format!(
            "| {} | {:.3} | {:.3} | {:.3} | {} | {} | {} | {} |",
            variant.variant_id, m.precision, m.recall, m.f1, m.tp, m.fp, m.fn_count, m.tn
        ));
    }
    lines.push(String::new());

    if let Some(best) = experiment
        .variants
        .iter()
        .find(|v| Some(v.variant_id.as_str()) == experiment.best_variant.as_deref())
    {
        lines.push("## Top Errors (Best Variant)".to_string());
        lines.push(String::new());
        let hard: Vec<_> = best
            .evaluations
            .iter()
            .filter(|e| e.label != Label::Tp && e.label != Label::Tn)
            .take(12)
            .collect();
        for e in &hard {
            let label = match e.label {
                Label::Tp => "TP",
                Label::Fp => "FP",
                Label::Fn => "FN",
                Label::Tn => "TN",
                Label::FpFn => "FP_FN",
            };
            lines.push(format!(
                "- {} window={} video={} overlap={:.2}",
                label, e.window_id, e.youtube_video_id, e.score
            ));
        }
        if hard.is_empty() {
            lines.push("- No critical errors in sampled windows.".to_string());
        }
    }

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::DatasetTool;
    use crate::experiment::{EvaluationRecord, VariantResult};
    use crate::gold::GoldWindowLabel;
    use crate::score::summarize_metrics;

    fn tool() -> DatasetTool {
        DatasetTool {
            id: "t1".to_string(),
            slug: "invideo-ai".to_string(),
            name: "InVideo AI".to_string(),
        }
    }

    fn evaluation(window: &str, label: Label, score: f64) -> EvaluationRecord {
        EvaluationRecord {
            window_id: window.to_string(),
            video_id: "v1".to_string(),
            youtube_video_id: "yt1".to_string(),
            label,
            score,
            gold_quote: None,
        }
    }

    fn experiment(evaluations: Vec<EvaluationRecord>) -> Experiment {
        let metrics = summarize_metrics(evaluations.iter().map(|e| e.label));
        Experiment {
            generated_at: "2026-01-01T00:00:00.000Z".to_string(),
            tool: tool(),
            mini_model: "gpt-4o-mini".to_string(),
            gold_model: "gpt-4.1".to_string(),
            window_count: evaluations.len(),
            best_variant: Some("v1_baseline".to_string()),
            variants: vec![VariantResult {
                variant_id: "v1_baseline".to_string(),
                metrics,
                predictions: Vec::new(),
                evaluations,
            }],
        }
    }

    fn dataset() -> Dataset {
        Dataset {
            generated_at: "2026-01-01T00:00:00.000Z".to_string(),
            tool: tool(),
            aliases: vec!["invideo".to_string()],
            requested_video_limit: 20,
            selected_video_count: 2,
            window_count: 3,
            videos: Vec::new(),
            windows: Vec::new(),
        }
    }

    fn gold() -> GoldLabels {
        GoldLabels {
            generated_at: "2026-01-01T00:00:00.000Z".to_string(),
            tool: tool(),
            gold_model: "gpt-4.1".to_string(),
            critic_model: "gpt-4.1".to_string(),
            window_count: 3,
            windows: vec![GoldWindowLabel {
                window_id: "v1:1".to_string(),
                video_id: "v1".to_string(),
                youtube_video_id: "yt1".to_string(),
                window_index: 1,
                start_seconds: 0,
                transcript_window: "text".to_string(),
                reviews: Vec::new(),
            }],
        }
    }

    #[test]
    fn test_summary_carries_metrics_table() {
        let exp = experiment(vec![
            evaluation("v1:1", Label::Tp, 1.0),
            evaluation("v1:2", Label::Tn, 1.0),
        ]);
        let summary = render_summary(&dataset(), &gold(), &exp);
        assert!(summary.starts_with("# Review Prompt Tuning Summary (invideo-ai)"));
        assert!(summary.contains("- Best mini variant: v1_baseline"));
        assert!(summary.contains("| Variant | Precision | Recall | F1 | TP | FP | FN | TN |"));
        assert!(summary.contains("| v1_baseline | 1.000 | 1.000 | 1.000 | 1 | 0 | 0 | 1 |"));
        assert!(summary.contains("- No critical errors in sampled windows."));
    }

    #[test]
    fn test_summary_lists_error_windows() {
        let exp = experiment(vec![
            evaluation("v1:1", Label::FpFn, 0.31),
            evaluation("v1:2", Label::Fn, 0.0),
        ]);
        let summary = render_summary(&dataset(), &gold(), &exp);
        assert!(summary.contains("## Top Errors (Best Variant)"));
        assert!(summary.contains("- FP_FN window=v1:1 video=yt1 overlap=0.31"));
        assert!(summary.contains("- FN window=v1:2 video=yt1 overlap=0.00"));
    }
}
