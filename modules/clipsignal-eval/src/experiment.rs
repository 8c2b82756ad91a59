//! Run the prompt variants against the cheaper extraction model and score
//! each prediction against gold. A failed call, an invalid quote, or a
//! non-useful quote all collapse to the empty prediction so every window
//! contributes exactly one labeled outcome per variant.

use std::collections::HashMap;

use ai_client::types::WireMessage;
use ai_client::OpenAi;
use chrono::{SecondsFormat, Utc};
use clipsignal_common::heuristics::{
    clamp_confidence, is_verbatimish, looks_decision_useful, normalize_whitespace,
};
use clipsignal_common::{ReviewExtraction, ReviewTag, Sentiment};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::dataset::{Dataset, DatasetTool};
use crate::gold::{GoldLabels, GoldReview};
use crate::score::{evaluate_prediction, rank_metrics, summarize_metrics, Label, VariantMetrics};
use crate::variants::PromptVariant;

#[derive(Debug, Deserialize, JsonSchema)]
struct MiniReviewQuote {
    quote_text: String,
    sentiment: Sentiment,
    #[schemars(length(max = 4))]
    topics: Vec<ReviewTag>,
    sponsored_flag: bool,
    confidence: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionRecord {
    pub window_id: String,
    #[serde(flatten)]
    pub prediction: ReviewExtraction,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationRecord {
    pub window_id: String,
    pub video_id: String,
    pub youtube_video_id: String,
    pub label: Label,
    pub score: f64,
    pub gold_quote: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VariantResult {
    pub variant_id: String,
    pub metrics: VariantMetrics,
    pub predictions: Vec<PredictionRecord>,
    pub evaluations: Vec<EvaluationRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Experiment {
    pub generated_at: String,
    pub tool: DatasetTool,
    pub mini_model: String,
    pub gold_model: String,
    pub window_count: usize,
    pub best_variant: Option<String>,
    pub variants: Vec<VariantResult>,
}

fn variant_prompt(
    tool_name: &str,
    aliases: &[String],
    transcript_window: &str,
    variant: &PromptVariant,
) -> String {
    let mut lines = vec![
        format!("Tool: {tool_name}"),
        format!("Tool aliases: {}", aliases.join(", ")),
        String::new(),
        "Transcript window:".to_string(),
        transcript_window.to_string(),
        String::new(),
        "Rules:".to_string(),
    ];
    lines.extend(variant.rules.iter().map(|rule| format!("- {rule}")));
    lines.join("\n")
}

/// Apply the same local gates the live pipeline applies; anything that
/// fails them becomes the empty prediction.
fn validate_prediction(
    raw: MiniReviewQuote,
    window_text: &str,
    aliases: &[String],
) -> ReviewExtraction {
    let quote = normalize_whitespace(&raw.quote_text);
    if quote.is_empty()
        || !is_verbatimish(window_text, &quote)
        || !looks_decision_useful(&quote, aliases, window_text)
    {
        return ReviewExtraction::empty();
    }
    let mut topics = raw.topics;
    topics.truncate(4);
    ReviewExtraction {
        quote_text: quote,
        sentiment: raw.sentiment,
        topics,
        sponsored_flag: raw.sponsored_flag,
        confidence: clamp_confidence(raw.confidence),
    }
}

pub async fn run_experiments(
    llm: &OpenAi,
    dataset: &Dataset,
    gold: &GoldLabels,
    mini_model: &str,
    variants: &[&'static PromptVariant],
) -> Experiment {
    let gold_by_window: HashMap<&str, &Vec<GoldReview>> = gold
        .windows
        .iter()
        .map(|w| (w.window_id.as_str(), &w.reviews))
        .collect();

    let mut results: Vec<VariantResult> = Vec::with_capacity(variants.len());

    for variant in variants {
        info!(variant = variant.id, windows = dataset.windows.len(), "running variant");
        let mut predictions = Vec::with_capacity(dataset.windows.len());
        let mut evaluations = Vec::with_capacity(dataset.windows.len());

        for window in &dataset.windows {
            let messages = vec![
                WireMessage::system(variant.system),
                WireMessage::user(variant_prompt(
                    &dataset.tool.name,
                    &dataset.aliases,
                    &window.transcript_window,
                    variant,
                )),
            ];
            let prediction = match llm.extract::<MiniReviewQuote>(mini_model, messages).await {
                Ok(raw) => {
                    validate_prediction(raw, &window.transcript_window, &dataset.aliases)
                }
                Err(e) => {
                    debug!(variant = variant.id, window_id = %window.id, "Extraction failed: {e}");
                    ReviewExtraction::empty()
                }
            };

            let gold_quotes: Vec<String> = gold_by_window
                .get(window.id.as_str())
                .map(|reviews| reviews.iter().map(|r| r.quote_text.clone()).collect())
                .unwrap_or_default();
            let eval = evaluate_prediction(&prediction.quote_text, &gold_quotes);

            evaluations.push(EvaluationRecord {
                window_id: window.id.clone(),
                video_id: window.video_id.clone(),
                youtube_video_id: window.youtube_video_id.clone(),
                label: eval.label,
                score: eval.best_score,
                gold_quote: eval.best_gold,
            });
            predictions.push(PredictionRecord {
                window_id: window.id.clone(),
                prediction,
            });
        }

        let metrics = summarize_metrics(evaluations.iter().map(|e| e.label));
        results.push(VariantResult {
            variant_id: variant.id.to_string(),
            metrics,
            predictions,
            evaluations,
        });
    }

    // Earlier variant wins ties.
    let mut best: Option<&VariantResult> = None;
    for result in &results {
        if best.map_or(true, |b| {
            rank_metrics(&result.metrics, &b.metrics) == std::cmp::Ordering::Greater
        }) {
            best = Some(result);
        }
    }
    let best_variant = best.map(|v| v.variant_id.clone());

    Experiment {
        generated_at: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        tool: dataset.tool.clone(),
        mini_model: mini_model.to_string(),
        gold_model: gold.gold_model.clone(),
        window_count: dataset.windows.len(),
        best_variant,
        variants: results,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clipsignal_common::heuristics::build_tool_aliases;

    fn raw(quote: &str) -> MiniReviewQuote {
        MiniReviewQuote {
            quote_text: quote.to_string(),
            sentiment: Sentiment::Con,
            topics: vec![ReviewTag::Pricing, ReviewTag::Limits],
            sponsored_flag: false,
            confidence: 0.7,
        }
    }

    #[test]
    fn test_valid_prediction_passes_through() {
        let window = "honestly the invideo starter plan price is twelve dollars and the \
                      watermark stays on every export you make";
        let aliases = build_tool_aliases("InVideo AI", "invideo-ai");
        let pred = validate_prediction(
            raw("the invideo starter plan price is twelve dollars and the watermark stays on every export"),
            window,
            &aliases,
        );
        assert!(!pred.is_empty());
        assert_eq!(pred.sentiment, Sentiment::Con);
        assert_eq!(pred.confidence, 0.7);
    }

    #[test]
    fn test_non_verbatim_prediction_collapses_to_empty() {
        let window = "honestly the invideo starter plan price is twelve dollars and the \
                      watermark stays on every export you make";
        let aliases = build_tool_aliases("InVideo AI", "invideo-ai");
        let pred = validate_prediction(
            raw("a reworded claim that the price is twelve dollars with watermark limits included"),
            window,
            &aliases,
        );
        assert!(pred.is_empty());
        assert_eq!(pred.confidence, 0.0);
        assert_eq!(pred.topics, vec![ReviewTag::Other]);
    }

    #[test]
    fn test_empty_quote_collapses_to_empty() {
        let aliases = build_tool_aliases("InVideo AI", "invideo-ai");
        let pred = validate_prediction(raw("   "), "whatever text", &aliases);
        assert!(pred.is_empty());
        assert_eq!(pred.sentiment, Sentiment::Neutral);
    }

    #[test]
    fn test_variant_prompt_lists_aliases_and_rules() {
        let variant = &crate::variants::PROMPT_VARIANTS[0];
        let aliases = vec!["invideo ai".to_string(), "invideo".to_string()];
        let prompt = variant_prompt("InVideo AI", &aliases, "window text", variant);
        assert!(prompt.starts_with("Tool: InVideo AI\nTool aliases: invideo ai, invideo"));
        assert!(prompt.contains("Transcript window:\nwindow text"));
        assert!(prompt.contains("\n- quote_text must be verbatim from transcript."));
    }
}
