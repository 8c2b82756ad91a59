//! Two-stage gold labeling: a strong extractor model proposes up to three
//! candidate quotes per window, a critic model endorses a subset, and the
//! survivors pass through the same local verbatim and decision-usefulness
//! filters the live pipeline applies. A window with zero reviews is a valid
//! label, not a failure.

use ai_client::types::WireMessage;
use ai_client::OpenAi;
use chrono::{SecondsFormat, Utc};
use clipsignal_common::heuristics::{
    clamp_confidence, is_verbatimish, looks_decision_useful, normalize_whitespace,
};
use clipsignal_common::{ReviewTag, Sentiment};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::dataset::{Dataset, DatasetTool};

const EXTRACT_SYSTEM: &str = "You are an expert product reviewer. Extract only decision-useful verbatim evidence from transcript text. It is valid to return zero reviews.";
const CRITIC_SYSTEM: &str = "You are a strict reviewer. Keep only high-value decision evidence. When in doubt, reject. Output only approved reviews.";

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
struct GoldCandidate {
    quote_text: String,
    sentiment: Sentiment,
    #[schemars(length(max = 4))]
    topics: Vec<ReviewTag>,
    sponsored_flag: bool,
    confidence: f32,
    why_valuable: String,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
struct GoldCandidateList {
    #[schemars(length(max = 3))]
    reviews: Vec<GoldCandidate>,
}

#[derive(Debug, Deserialize, JsonSchema)]
struct CriticReview {
    quote_text: String,
    sentiment: Sentiment,
    #[schemars(length(max = 4))]
    topics: Vec<ReviewTag>,
    sponsored_flag: bool,
    confidence: f32,
    critic_note: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
struct CriticReviewList {
    #[schemars(length(max = 3))]
    reviews: Vec<CriticReview>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoldReview {
    pub quote_text: String,
    pub sentiment: Sentiment,
    pub topics: Vec<ReviewTag>,
    pub sponsored_flag: bool,
    pub confidence: f32,
    pub critic_note: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoldWindowLabel {
    pub window_id: String,
    pub video_id: String,
    pub youtube_video_id: String,
    pub window_index: usize,
    pub start_seconds: u64,
    pub transcript_window: String,
    pub reviews: Vec<GoldReview>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoldLabels {
    pub generated_at: String,
    pub tool: DatasetTool,
    pub gold_model: String,
    pub critic_model: String,
    pub window_count: usize,
    pub windows: Vec<GoldWindowLabel>,
}

fn extract_prompt(tool_name: &str, transcript_window: &str) -> String {
    [
        &format!("Tool: {tool_name}"),
        "",
        "Transcript window:",
        transcript_window,
        "",
        "Selection criteria:",
        "- Keep only concrete claims that help users decide suitability under constraints.",
        "- Useful claims cover tradeoffs: quality, speed, pricing, limits, reliability, integrations, workflow fit.",
        "- Reject hype, speculation, vague praise, intros, narration, or meta-comments.",
        "- Keep quotes verbatim. No paraphrase.",
        "- If no valuable claim exists, return reviews: [].",
        "- A quote may contain 1-4 sentences when the argument is cohesive.",
    ]
    .join("\n")
}

fn critic_prompt(tool_name: &str, transcript_window: &str, candidates_json: &str) -> String {
    [
        &format!("Tool: {tool_name}"),
        "",
        "Transcript window:",
        transcript_window,
        "",
        "Candidate reviews JSON:",
        candidates_json,
        "",
        "Critic rules:",
        "- Quote must be verbatim from transcript.",
        "- Must include specific evidence useful for selecting or rejecting the tool.",
        "- Reject generic or speculative lines.",
        "- Reject if value is too weak or not actionable.",
        "- It is valid to return reviews: [].",
    ]
    .join("\n")
}

/// Local acceptance filter over critic-approved reviews. The models are not
/// trusted on verbatim-ness or usefulness.
fn finalize_reviews(
    approved: Vec<CriticReview>,
    window_text: &str,
    aliases: &[String],
) -> Vec<GoldReview> {
    approved
        .into_iter()
        .filter_map(|item| {
            let quote = normalize_whitespace(&item.quote_text);
            if quote.is_empty() {
                return None;
            }
            if !is_verbatimish(window_text, &quote) {
                return None;
            }
            if !looks_decision_useful(&quote, aliases, window_text) {
                return None;
            }
            let mut topics = item.topics;
            topics.truncate(4);
            Some(GoldReview {
                quote_text: quote,
                sentiment: item.sentiment,
                topics,
                sponsored_flag: item.sponsored_flag,
                confidence: clamp_confidence(item.confidence),
                critic_note: normalize_whitespace(&item.critic_note),
            })
        })
        .collect()
}

pub struct GoldLabeler {
    llm: OpenAi,
    gold_model: String,
    critic_model: String,
}

impl GoldLabeler {
    pub fn new(openai_api_key: &str, gold_model: &str, critic_model: &str) -> Self {
        Self {
            llm: OpenAi::new(openai_api_key),
            gold_model: gold_model.to_string(),
            critic_model: critic_model.to_string(),
        }
    }

    /// Label every dataset window. A failed model call collapses that
    /// window's stage to zero reviews so one bad call cannot sink the run.
    pub async fn label(&self, dataset: &Dataset) -> GoldLabels {
        let total = dataset.windows.len();
        let mut windows = Vec::with_capacity(total);

        for (index, window) in dataset.windows.iter().enumerate() {
            debug!(window = index + 1, total, "gold labeling window");

            let extract_messages = vec![
                WireMessage::system(EXTRACT_SYSTEM),
                WireMessage::user(extract_prompt(
                    &dataset.tool.name,
                    &window.transcript_window,
                )),
            ];
            let candidates = match self
                .llm
                .extract::<GoldCandidateList>(&self.gold_model, extract_messages)
                .await
            {
                Ok(list) => list.reviews,
                Err(e) => {
                    warn!(window_id = %window.id, "Gold extraction failed: {e}");
                    Vec::new()
                }
            };

            let candidates_json =
                serde_json::to_string_pretty(&candidates).unwrap_or_else(|_| "[]".to_string());
            let critic_messages = vec![
                WireMessage::system(CRITIC_SYSTEM),
                WireMessage::user(critic_prompt(
                    &dataset.tool.name,
                    &window.transcript_window,
                    &candidates_json,
                )),
            ];
            let approved = match self
                .llm
                .extract::<CriticReviewList>(&self.critic_model, critic_messages)
                .await
            {
                Ok(list) => list.reviews,
                Err(e) => {
                    warn!(window_id = %window.id, "Gold critic failed: {e}");
                    Vec::new()
                }
            };

            windows.push(GoldWindowLabel {
                window_id: window.id.clone(),
                video_id: window.video_id.clone(),
                youtube_video_id: window.youtube_video_id.clone(),
                window_index: window.window_index,
                start_seconds: window.start_seconds,
                transcript_window: window.transcript_window.clone(),
                reviews: finalize_reviews(approved, &window.transcript_window, &dataset.aliases),
            });
        }

        GoldLabels {
            generated_at: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            tool: dataset.tool.clone(),
            gold_model: self.gold_model.clone(),
            critic_model: self.critic_model.clone(),
            window_count: total,
            windows,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clipsignal_common::heuristics::build_tool_aliases;

    fn critic(quote: &str) -> CriticReview {
        CriticReview {
            quote_text: quote.to_string(),
            sentiment: Sentiment::Con,
            topics: vec![ReviewTag::Pricing],
            sponsored_flag: false,
            confidence: 0.8,
            critic_note: "  concrete pricing claim  ".to_string(),
        }
    }

    #[test]
    fn test_finalize_keeps_verbatim_useful_quote() {
        let window = "so to be clear the invideo pro plan price is forty dollars a month and \
                      exports above ten minutes are blocked on it";
        let aliases = build_tool_aliases("InVideo AI", "invideo-ai");
        let approved = vec![critic(
            "the invideo pro plan price is forty dollars a month and exports above ten minutes are blocked",
        )];
        let reviews = finalize_reviews(approved, window, &aliases);
        assert_eq!(reviews.len(), 1);
        assert_eq!(reviews[0].critic_note, "concrete pricing claim");
        assert_eq!(reviews[0].confidence, 0.8);
    }

    #[test]
    fn test_finalize_rejects_non_verbatim_quote() {
        let window = "the invideo pro plan price is forty dollars a month and exports above ten \
                      minutes are blocked";
        let aliases = build_tool_aliases("InVideo AI", "invideo-ai");
        let approved = vec![critic(
            "the paraphrased plan price is forty dollars monthly with export restrictions applied",
        )];
        assert!(finalize_reviews(approved, window, &aliases).is_empty());
    }

    #[test]
    fn test_finalize_drops_empty_quotes_and_clamps_confidence() {
        let window = "the invideo pro plan price is forty dollars a month and exports above ten \
                      minutes are blocked on that tier for everyone";
        let aliases = build_tool_aliases("InVideo AI", "invideo-ai");
        let mut kept = critic(
            "the invideo pro plan price is forty dollars a month and exports above ten minutes are blocked",
        );
        kept.confidence = 3.5;
        let approved = vec![critic(""), kept];
        let reviews = finalize_reviews(approved, window, &aliases);
        assert_eq!(reviews.len(), 1);
        assert_eq!(reviews[0].confidence, 1.0);
    }

    #[test]
    fn test_prompts_carry_tool_and_window() {
        let prompt = extract_prompt("InVideo AI", "some window text");
        assert!(prompt.starts_with("Tool: InVideo AI"));
        assert!(prompt.contains("Transcript window:\nsome window text"));
        assert!(prompt.contains("return reviews: []"));

        let critic = critic_prompt("InVideo AI", "some window text", "[]");
        assert!(critic.contains("Candidate reviews JSON:\n[]"));
        assert!(critic.contains("Critic rules:"));
    }
}
