use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Fixed topic vocabulary for review snippets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub enum ReviewTag {
    #[serde(rename = "UI/UX")]
    UiUx,
    #[serde(rename = "Output quality")]
    OutputQuality,
    #[serde(rename = "Relevance")]
    Relevance,
    #[serde(rename = "Speed")]
    Speed,
    #[serde(rename = "Pricing")]
    Pricing,
    #[serde(rename = "Cancellation/Refund")]
    CancellationRefund,
    #[serde(rename = "Limits")]
    Limits,
    #[serde(rename = "Integrations")]
    Integrations,
    #[serde(rename = "Watermark")]
    Watermark,
    #[serde(rename = "Export quality")]
    ExportQuality,
    #[serde(rename = "Support")]
    Support,
    #[serde(rename = "Reliability")]
    Reliability,
    #[serde(rename = "Other")]
    Other,
}

impl ReviewTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReviewTag::UiUx => "UI/UX",
            ReviewTag::OutputQuality => "Output quality",
            ReviewTag::Relevance => "Relevance",
            ReviewTag::Speed => "Speed",
            ReviewTag::Pricing => "Pricing",
            ReviewTag::CancellationRefund => "Cancellation/Refund",
            ReviewTag::Limits => "Limits",
            ReviewTag::Integrations => "Integrations",
            ReviewTag::Watermark => "Watermark",
            ReviewTag::ExportQuality => "Export quality",
            ReviewTag::Support => "Support",
            ReviewTag::Reliability => "Reliability",
            ReviewTag::Other => "Other",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum Sentiment {
    Pro,
    Con,
    Neutral,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OfferType {
    Code,
    Link,
    #[serde(rename = "Trial extension")]
    TrialExtension,
    #[serde(rename = "Credit bonus")]
    CreditBonus,
    Unknown,
}

impl OfferType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OfferType::Code => "Code",
            OfferType::Link => "Link",
            OfferType::TrialExtension => "Trial extension",
            OfferType::CreditBonus => "Credit bonus",
            OfferType::Unknown => "Unknown",
        }
    }
}

/// A deal found in a video description, before persistence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DealCandidate {
    pub offer_text: String,
    pub offer_type: OfferType,
    pub code: Option<String>,
    pub link_url: Option<String>,
}

/// A validated review quote, before persistence. An empty `quote_text` is
/// the valid "no evidence found" outcome, not an error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewExtraction {
    pub quote_text: String,
    pub sentiment: Sentiment,
    pub topics: Vec<ReviewTag>,
    pub sponsored_flag: bool,
    pub confidence: f32,
}

impl ReviewExtraction {
    pub fn empty() -> Self {
        Self {
            quote_text: String::new(),
            sentiment: Sentiment::Neutral,
            topics: vec![ReviewTag::Other],
            sponsored_flag: false,
            confidence: 0.0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.quote_text.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WindowSource {
    Mention,
    Fallback,
}

/// A merged span of transcript text considered for extraction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextWindow {
    pub start_seconds: u64,
    pub end_seconds: u64,
    pub text: String,
    pub source: WindowSource,
}

/// Identity of a tool under analysis, as the extractors need it.
#[derive(Debug, Clone)]
pub struct ToolContext {
    pub tool_name: String,
    pub tool_slug: String,
    pub tool_website_url: Option<String>,
}
