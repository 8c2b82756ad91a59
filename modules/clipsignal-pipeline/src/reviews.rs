//! Review quote extraction from a transcript window.
//!
//! The LLM path asks for one verbatim quote via structured output, then
//! re-validates everything locally: the quote must actually appear in the
//! window and must pass the decision-usefulness filter. The model is never
//! trusted on either. Without an API key the extractor degrades to the
//! heuristic path over the raw window text.

use ai_client::types::WireMessage;
use ai_client::OpenAi;
use anyhow::Result;
use clipsignal_common::heuristics;
use clipsignal_common::{ReviewExtraction, ReviewTag, Sentiment, ToolContext};
use schemars::JsonSchema;
use serde::Deserialize;
use tracing::debug;

const SYSTEM_PROMPT: &str = "Extract a single verbatim quote only if it is clearly about the target tool and helps a user decide fit, risks, or tradeoffs. Return empty quote_text otherwise.";

#[derive(Debug, Deserialize, JsonSchema)]
struct LlmReviewQuote {
    quote_text: String,
    sentiment: Sentiment,
    topics: Vec<ReviewTag>,
    sponsored_flag: bool,
    confidence: f32,
}

fn user_prompt(tool_name: &str, transcript_window: &str) -> String {
    [
        &format!("Tool: {tool_name}"),
        "",
        "Transcript window:",
        transcript_window,
        "",
        "Rules:",
        "- Quote must be verbatim and decision-relevant.",
        "- Reject quotes about competitor tools, even if useful in general.",
        "- Accept concrete claims on capability, quality, speed, pricing, limits, reliability, workflow effort, or edit control.",
        "- Reject narration, hype, predictions, vague praise, setup language, and generic statements.",
        "- If evidence is weak, return empty quote_text.",
        "- Allow up to 3 sentences when the thought is cohesive and still concrete.",
        "- sponsored_flag is true only if the quote context explicitly indicates sponsorship/affiliate.",
    ]
    .join("\n")
}

pub struct ReviewExtractor {
    llm: Option<OpenAi>,
    model: String,
}

impl ReviewExtractor {
    pub fn new(openai_api_key: Option<&str>, model: &str) -> Self {
        Self {
            llm: openai_api_key.map(OpenAi::new),
            model: model.to_string(),
        }
    }

    pub fn llm_enabled(&self) -> bool {
        self.llm.is_some()
    }

    /// Extract one review quote from the window, or `None` when no usable
    /// evidence exists. `Err` means the LLM call itself failed.
    pub async fn extract(
        &self,
        tool: &ToolContext,
        window_text: &str,
    ) -> Result<Option<ReviewExtraction>> {
        match &self.llm {
            Some(client) => self.extract_with_llm(client, tool, window_text).await,
            None => Ok(extract_heuristic(window_text)),
        }
    }

    async fn extract_with_llm(
        &self,
        client: &OpenAi,
        tool: &ToolContext,
        window_text: &str,
    ) -> Result<Option<ReviewExtraction>> {
        let messages = vec![
            WireMessage::system(SYSTEM_PROMPT),
            WireMessage::user(user_prompt(&tool.tool_name, window_text)),
        ];
        let raw: LlmReviewQuote = client.extract(&self.model, messages).await?;

        let quote = heuristics::normalize_whitespace(&raw.quote_text);
        if quote.is_empty() {
            return Ok(None);
        }
        if !heuristics::is_verbatimish(window_text, &quote) {
            debug!(tool = %tool.tool_slug, "Rejected non-verbatim quote");
            return Ok(None);
        }
        let aliases = heuristics::build_tool_aliases(&tool.tool_name, &tool.tool_slug);
        if !heuristics::looks_decision_useful(&quote, &aliases, window_text) {
            debug!(tool = %tool.tool_slug, "Rejected non-useful quote");
            return Ok(None);
        }

        let mut topics = raw.topics;
        topics.truncate(4);
        if topics.is_empty() {
            topics.push(ReviewTag::Other);
        }

        Ok(Some(ReviewExtraction {
            quote_text: quote,
            sentiment: raw.sentiment,
            topics,
            sponsored_flag: raw.sponsored_flag,
            confidence: heuristics::clamp_confidence(raw.confidence),
        }))
    }
}

/// Keyword-only extraction used when no API key is configured: the whole
/// window becomes the snippet if it reads like a concrete claim.
pub fn extract_heuristic(window_text: &str) -> Option<ReviewExtraction> {
    if !heuristics::looks_like_concrete_claim(window_text) {
        return None;
    }
    Some(ReviewExtraction {
        quote_text: window_text.to_string(),
        sentiment: heuristics::infer_sentiment(window_text),
        topics: heuristics::infer_tags(window_text),
        sponsored_flag: heuristics::mentions_sponsorship(window_text),
        confidence: heuristics::infer_confidence(window_text),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn heuristic_path_accepts_concrete_claim() {
        let window = "the invideo export quality is capped at 1080p and renders cost two credits per minute of video";
        let result = extract_heuristic(window).unwrap();
        assert_eq!(result.quote_text, window);
        assert!(result.confidence >= 0.55);
        assert!(result.topics.contains(&ReviewTag::Pricing) || result.topics.contains(&ReviewTag::Limits));
    }

    #[test]
    fn heuristic_path_rejects_narration() {
        assert!(extract_heuristic("so i've been using this for a while, subscribe for more").is_none());
        assert!(extract_heuristic("too short").is_none());
    }

    #[test]
    fn heuristic_sponsorship_flag() {
        let window = "this video is sponsored but the export quality still works fine at larger resolutions";
        let result = extract_heuristic(window).unwrap();
        assert!(result.sponsored_flag);
    }

    #[test]
    fn user_prompt_carries_tool_and_window() {
        let prompt = user_prompt("InVideo AI", "some transcript text");
        assert!(prompt.starts_with("Tool: InVideo AI"));
        assert!(prompt.contains("some transcript text"));
        assert!(prompt.contains("- Quote must be verbatim and decision-relevant."));
    }

    #[test]
    fn extractor_without_key_disables_llm() {
        let extractor = ReviewExtractor::new(None, "gpt-4.1-mini");
        assert!(!extractor.llm_enabled());
    }
}
