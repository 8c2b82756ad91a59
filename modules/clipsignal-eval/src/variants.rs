//! The prompt variants under evaluation. Each pairs a system prompt with a
//! rule list appended to the user message; `v5_tool_scope_guard` is the
//! prompt the live pipeline currently runs.

use anyhow::{bail, Result};

#[derive(Debug)]
pub struct PromptVariant {
    pub id: &'static str,
    pub system: &'static str,
    pub rules: &'static [&'static str],
}

pub const PROMPT_VARIANTS: &[PromptVariant] = &[
    PromptVariant {
        id: "v1_baseline",
        system: "You extract review evidence from transcript text. Return one short verbatim quote only when it contains a concrete claim about the tool. Skip hype/speculation/promises. If none exists, return empty quote_text with Neutral sentiment and confidence 0.0. Do not paraphrase.",
        rules: &[
            "quote_text must be verbatim from transcript.",
            "Ignore filler intros/outros/subscribe prompts.",
            "Prefer claims on quality, speed, pricing, reliability, limits, output, workflow.",
            "Reject speculative/hype wording such as 'maybe', 'promises to', 'amazing'.",
            "sponsored_flag is true only if the quote context explicitly indicates sponsorship/affiliate.",
        ],
    },
    PromptVariant {
        id: "v2_decision_strict",
        system: "Extract exactly one verbatim review quote only if it helps a buyer decide whether to use the tool for their constraints or goals. If no such quote exists, return empty quote_text.",
        rules: &[
            "Must be verbatim and attributable to the transcript window.",
            "Accept only concrete claims about capability, limitation, quality, speed, pricing, reliability, compatibility, or fit-for-use-case.",
            "Reject intros, hype, predictions, vague praise, setup narration, and generic statements.",
            "Reject quotes that do not carry actionable information for a product decision.",
            "Allow up to 3 sentences if the thought is cohesive and decision-relevant.",
        ],
    },
    PromptVariant {
        id: "v3_examples_hard_negative",
        system: "You are extracting purchase-decision evidence. Return one verbatim quote only when it states a concrete, falsifiable claim about this tool. Return empty quote_text if none.",
        rules: &[
            "Verbatim only. No rewriting.",
            "Keep quote focused on measurable outcomes, constraints, or tradeoffs.",
            "Positive examples: pricing limits, export quality, rendering speed, reliability issues, feature gaps, integration constraints.",
            "Negative examples to reject: 'this looks amazing', 'maybe it will...', 'it promises to...', 'I have been using this tool'.",
            "If uncertain, prefer empty output over weak output.",
        ],
    },
    PromptVariant {
        id: "v4_precision_first",
        system: "High precision mode. Output a quote only when it is clearly valuable for a user deciding tool suitability under real constraints. Otherwise output empty quote_text.",
        rules: &[
            "Verbatim quote_text only.",
            "Must include at least one decision topic (price, quality, speed, limits, reliability, support, integrations, workflow, output) and one concrete claim verb.",
            "Reject any quote containing mostly speculation, marketing language, or non-evidential narration.",
            "A longer quote is allowed when the argument spans multiple sentences and remains concrete.",
            "sponsored_flag true only with explicit sponsorship/affiliate disclosure.",
        ],
    },
    PromptVariant {
        id: "v5_tool_scope_guard",
        system: "Extract a single verbatim quote only if it is clearly about the target tool and helps a user decide fit, risks, or tradeoffs. Return empty quote_text otherwise.",
        rules: &[
            "Quote must be verbatim and decision-relevant.",
            "Reject quotes about competitor tools, even if useful in general.",
            "Accept concrete claims on capability, quality, speed, pricing, limits, reliability, workflow effort, or edit control.",
            "Reject narration, hype, speculation, channel filler, and broad praise.",
            "If evidence is weak, return empty quote_text.",
        ],
    },
    PromptVariant {
        id: "v6_balanced_decision",
        system: "You extract buyer-decision evidence for a specific tool from noisy transcript text. Return one high-value verbatim quote or empty quote_text.",
        rules: &[
            "Keep only claims that help someone decide whether this tool suits their needs/constraints.",
            "Valid claim types include: feature capability, missing capability, output quality, speed, pricing tiers, credits, limits, watermark, reliability, and editing effort/time.",
            "Reject generic statements like 'looks amazing', promises, and future speculation.",
            "Reject competitor-focused claims unless the quote explicitly compares and still provides clear evidence about the target tool.",
            "Prefer precision over recall, but keep strong practical claims even without numbers.",
        ],
    },
    PromptVariant {
        id: "v7_practical_claims",
        system: "Extract one verbatim quote when it contains practical evidence that helps a buyer decide if this tool fits their workflow, limits, or budget. Otherwise return empty quote_text.",
        rules: &[
            "Accept practical claims such as: credits/pricing tradeoffs, watermark/export limits, template/workflow effort, edit control, speed, or reliability constraints.",
            "Accept capability statements when they are specific enough to affect tool choice (for example: create full videos with prompts and minimal timeline editing).",
            "Reject intros, channel narration, hype, speculation, and generic praise.",
            "Reject competitor-only claims unless the quote clearly states a tradeoff about the target tool.",
            "Keep quote verbatim and coherent; prefer empty output over weak output.",
        ],
    },
];

/// Resolve the variants to run. An empty filter keeps everything; a filter
/// that matches nothing is an error rather than a silent no-op run.
pub fn select_variants(filter: &[String]) -> Result<Vec<&'static PromptVariant>> {
    if filter.is_empty() {
        return Ok(PROMPT_VARIANTS.iter().collect());
    }
    let selected: Vec<&'static PromptVariant> = PROMPT_VARIANTS
        .iter()
        .filter(|variant| filter.iter().any(|wanted| wanted == variant.id))
        .collect();
    if selected.is_empty() {
        bail!("No prompt variants matched: {}", filter.join(","));
    }
    Ok(selected)
}
