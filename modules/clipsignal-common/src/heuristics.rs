//! Shared extraction heuristics. Both the live pipeline and the evaluation
//! harness call these; keeping them in one place stops the two from drifting
//! apart.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use url::Url;

use crate::types::{OfferType, ReviewTag, Sentiment, ToolContext};

// --- review heuristics ---

static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));
static NON_WORD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^\w\s]").expect("valid regex"));
static NON_ALNUM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-z0-9\s]").expect("valid regex"));

static WEAK_REVIEW: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(promises?|maybe|might|could|hopefully|probably|i\s+think|i\s+guess|we'?ll\s+see|let'?s\s+see|ridiculously\s+easy|amazing|game\s*changer|best\s+ever)\b")
        .expect("valid regex")
});
static PLANNING_REVIEW: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(in this video|today we|i'?m going to|let'?s dive|before we start|subscribe|smash that like)\b")
        .expect("valid regex")
});
static GENERIC_REVIEW: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(so yeah|that being said|overall it is good|it is nice|it is decent|check it out|link in description)\b")
        .expect("valid regex")
});
static DECISION_TOPIC: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(price|pricing|cost|expensive|cheap|credit|trial|refund|cancel|limit\w*|slow|fast|quality|resolution|watermark|bug|crash|reliable|support|export|integrat\w*|template|voiceover|render|latency|use case|workflow|accuracy|control|edit|timeline|effort)\b")
        .expect("valid regex")
});
static DECISION_VERB: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(is|are|has|have|does|doesn'?t|can|can'?t|cannot|takes|costs|supports|lacks|fails|works|breaks|requires|allows|blocks|exports|renders)\b")
        .expect("valid regex")
});
static COMPETITOR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(freepik|freepick|openart|sora|kling|veo|runway|pika|capcut|premiere|adobe|midjourney)\b")
        .expect("valid regex")
});
static TRAILING_FRAGMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(and|or|but|with|to|for|of|in|on|at|as|like|about|upbeat)\s*$")
        .expect("valid regex")
});
static CONCRETE_CLAIM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(can|cannot|works|doesn'?t|faster|slower|better|worse|priced|cost|quality|export|limit)\b")
        .expect("valid regex")
});
static NARRATION_OPENER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)so i'?ve been using|let's jump in|subscribe|like and comment").expect("valid regex")
});
static NARRATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)in this video|today we|subscribe|like and comment").expect("valid regex")
});
static HYPE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)amazing|incredible|game changer|maybe|hopefully").expect("valid regex")
});
static QUANT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b\d+%|\$\d+|\b\d+\s*(sec|second|seconds|min|minute|minutes|hours?)\b")
        .expect("valid regex")
});
static MONEY_OR_PERCENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b\d+%|\$\d+").expect("valid regex"));
static SPONSORSHIP: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(sponsor|sponsored|sponsorship|affiliate|partner(ed)?\s+with)\b")
        .expect("valid regex")
});

const ALIAS_STOP_WORDS: &[&str] = &[
    "ai", "tool", "tools", "app", "platform", "software", "review", "tutorial",
];

pub fn normalize_whitespace(input: &str) -> String {
    WHITESPACE.replace_all(input, " ").trim().to_string()
}

pub fn normalize_for_match(input: &str) -> String {
    normalize_whitespace(input).to_lowercase()
}

/// Lowercased alphanumeric tokens of length ≥3.
pub fn tokenize(input: &str) -> Vec<String> {
    let lower = normalize_for_match(input);
    NON_ALNUM
        .replace_all(&lower, " ")
        .split_whitespace()
        .filter(|t| t.len() >= 3)
        .map(String::from)
        .collect()
}

pub fn normalize_tool_tokens(input: &str) -> Vec<String> {
    tokenize(input)
        .into_iter()
        .filter(|t| !ALIAS_STOP_WORDS.contains(&t.as_str()))
        .collect()
}

/// Matching aliases for a tool: the full normalized name, the de-hyphenated
/// slug, and their significant tokens. Purely a matching key.
pub fn build_tool_aliases(name: &str, slug: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut aliases = Vec::new();
    let mut push = |alias: String| {
        if alias.len() >= 3 && seen.insert(alias.clone()) {
            aliases.push(alias);
        }
    };

    push(normalize_for_match(name));
    push(normalize_for_match(&slug.replace('-', " ")));
    for token in normalize_tool_tokens(name) {
        push(token);
    }
    for token in normalize_tool_tokens(slug) {
        push(token);
    }
    aliases
}

/// Token-set Jaccard similarity, used to match predictions against gold.
pub fn token_set_jaccard(a: &str, b: &str) -> f64 {
    let sa: HashSet<String> = tokenize(a).into_iter().collect();
    let sb: HashSet<String> = tokenize(b).into_iter().collect();
    if sa.is_empty() || sb.is_empty() {
        return 0.0;
    }
    let intersection = sa.intersection(&sb).count();
    let union = sa.union(&sb).count();
    intersection as f64 / union as f64
}

/// Is the quote an exact or punctuation-tolerant substring of the window?
pub fn is_verbatimish(window_text: &str, quote: &str) -> bool {
    let clean_window = normalize_for_match(window_text);
    let clean_quote = normalize_for_match(quote);
    if clean_quote.chars().count() < 25 {
        return false;
    }
    if clean_window.contains(&clean_quote) {
        return true;
    }

    let no_punct_window = NON_WORD.replace_all(&clean_window, "");
    let no_punct_quote = NON_WORD.replace_all(&clean_quote, "");
    no_punct_window.contains(no_punct_quote.as_ref())
}

/// Does the quote carry a concrete, decision-relevant claim about the tool?
/// Never trusts the model: length and word-count bounds, fragment and
/// hedging rejections, a concrete topic plus a claim verb, and a competitor
/// scope guard.
pub fn looks_decision_useful(
    quote: &str,
    aliases: &[String],
    window_text: &str,
) -> bool {
    let quote = normalize_whitespace(quote);
    let len = quote.chars().count();
    if !(35..=520).contains(&len) {
        return false;
    }
    if quote.split_whitespace().count() < 9 {
        return false;
    }
    if quote.trim_end().ends_with('?') {
        return false;
    }
    if TRAILING_FRAGMENT.is_match(&quote) {
        return false;
    }
    if WEAK_REVIEW.is_match(&quote)
        || PLANNING_REVIEW.is_match(&quote)
        || GENERIC_REVIEW.is_match(&quote)
    {
        return false;
    }
    if !DECISION_TOPIC.is_match(&quote) || !DECISION_VERB.is_match(&quote) {
        return false;
    }

    let quote_lower = quote.to_lowercase();
    let window_lower = normalize_for_match(window_text);
    let alias_hit = aliases
        .iter()
        .any(|alias| quote_lower.contains(alias) || window_lower.contains(alias));
    if COMPETITOR.is_match(&quote) && !alias_hit {
        return false;
    }

    true
}

/// Loose first-pass filter used by the heuristic (non-LLM) review path.
pub fn looks_like_concrete_claim(text: &str) -> bool {
    if text.chars().count() < 30 {
        return false;
    }
    if NARRATION_OPENER.is_match(text) {
        return false;
    }
    CONCRETE_CLAIM.is_match(text)
}

pub fn infer_sentiment(text: &str) -> Sentiment {
    let lower = text.to_lowercase();
    let positive_signals = [
        "great",
        "fast",
        "easy",
        "strong",
        "excellent",
        "works well",
        "time saver",
        "reliable",
    ];
    let negative_signals = [
        "expensive",
        "limited",
        "limiting",
        "slow",
        "issue",
        "problem",
        "inconsistent",
        "hard",
        "bug",
    ];

    let positive = positive_signals.iter().filter(|s| lower.contains(*s)).count();
    let negative = negative_signals.iter().filter(|s| lower.contains(*s)).count();
    if positive > negative {
        Sentiment::Pro
    } else if negative > positive {
        Sentiment::Con
    } else {
        Sentiment::Neutral
    }
}

pub fn infer_tags(text: &str) -> Vec<ReviewTag> {
    static TAG_PATTERNS: LazyLock<Vec<(Regex, ReviewTag)>> = LazyLock::new(|| {
        [
            (r"\bui\b|\bux\b|interface|workflow|editor", ReviewTag::UiUx),
            (r"quality|output|result|render|visual", ReviewTag::OutputQuality),
            (r"relevant|fit|use case|niche", ReviewTag::Relevance),
            (r"fast|speed|quick|latency|slow", ReviewTag::Speed),
            (r"price|pricing|cost|expensive|cheap|credit", ReviewTag::Pricing),
            (r"cancel|refund|billing", ReviewTag::CancellationRefund),
            (r"limit|quota|cap|restriction", ReviewTag::Limits),
            (r"integrat|api|zapier|plugin", ReviewTag::Integrations),
            (r"watermark", ReviewTag::Watermark),
            (r"export|compression|resolution", ReviewTag::ExportQuality),
            (r"support|help|ticket", ReviewTag::Support),
            (r"crash|stable|reliable|downtime|bug", ReviewTag::Reliability),
        ]
        .into_iter()
        .map(|(pattern, tag)| (Regex::new(pattern).expect("valid regex"), tag))
        .collect()
    });

    let lower = text.to_lowercase();
    let tags: Vec<ReviewTag> = TAG_PATTERNS
        .iter()
        .filter(|(re, _)| re.is_match(&lower))
        .map(|(_, tag)| *tag)
        .take(4)
        .collect();

    if tags.is_empty() {
        vec![ReviewTag::Other]
    } else {
        tags
    }
}

pub fn infer_confidence(text: &str) -> f32 {
    let mut confidence: f32 = 0.55;
    if looks_like_concrete_claim(text) {
        confidence += 0.15;
    }
    if text.chars().count() > 120 {
        confidence += 0.08;
    }
    if MONEY_OR_PERCENT.is_match(text) {
        confidence += 0.07;
    }
    confidence.min(0.95)
}

pub fn mentions_sponsorship(text: &str) -> bool {
    SPONSORSHIP.is_match(text)
}

pub fn clamp_confidence(value: f32) -> f32 {
    if value.is_finite() {
        value.clamp(0.0, 1.0)
    } else {
        0.6
    }
}

/// Decision-signal score for a transcript window. Used both to pick
/// fallback windows on the live path and to annotate eval dataset windows.
pub fn signal_score(text: &str) -> i32 {
    if text.trim().is_empty() {
        return 0;
    }
    let mut score = 0;
    if DECISION_TOPIC.is_match(text) {
        score += 3;
    }
    if DECISION_VERB.is_match(text) {
        score += 2;
    }
    if QUANT.is_match(text) {
        score += 2;
    }
    if NARRATION.is_match(text) {
        score -= 2;
    }
    if HYPE.is_match(text) {
        score -= 2;
    }
    score
}

// --- deal heuristics ---

static URL_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"https?://[^\s)]+").expect("valid regex"));
static CODE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)\b(?:use\s+code|coupon\s+code|promo\s+code|code)\s*[:\-]?\s*["']?([A-Z0-9][A-Z0-9_-]{2,19})\b"#)
        .expect("valid regex")
});
static PERCENT_OFF: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b\d{1,2}\s?%\s?off\b").expect("valid regex"));
static DEAL_SIGNAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(promo|discount|save|deal|offer|coupon|affiliate|partner|special|exclusive|bonus|credit|trial extension|extended trial)\b")
        .expect("valid regex")
});
static STRONG_DEAL_SIGNAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(\d{1,2}\s?%\s?off|use\s+code|promo\s*code|coupon|discount|save\s+\$?\d+|save\s+\d{1,2}%|bonus\s+credits?|credit\s+bonus|bonus\s+package|extended\s+trial|extra\s+\d+\s+days?\s+trial|free\s+month)\b")
        .expect("valid regex")
});
static NON_DEAL_LINK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(twitter|x\.com|facebook|instagram|tiktok|linkedin|youtube|newsletter|course|courses|community|discord|telegram|patreon|website)\b")
        .expect("valid regex")
});
static GENERIC_CTA: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(start creating|try it|check it out|get started|sign up|learn more|give it a try)\b")
        .expect("valid regex")
});
static DEAL_VOCAB: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(discount|promo|offer|affiliate|deal|code|coupon|save|bonus|credit)\b")
        .expect("valid regex")
});
static PROMO_VOCAB: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(promo|discount|save|deal|offer|affiliate)\b").expect("valid regex")
});
static TRIAL_EXTENSION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"extended\s+trial|extra\s+\d+\s+days?\s+trial|\d+\s+day\s+trial").expect("valid regex")
});
static CREDIT_BONUS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"credit|credits|bonus|\$\d+").expect("valid regex"));
static ARROW_EMOJI: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[▶►👉➡️]+").expect("valid regex"));
static NON_WORD_ONLY: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\W*$").expect("valid regex"));

pub fn find_urls(line: &str) -> Vec<String> {
    URL_PATTERN
        .find_iter(line)
        .map(|m| m.as_str().to_string())
        .collect()
}

pub fn find_promo_code(line: &str) -> Option<String> {
    CODE_PATTERN
        .captures(line)
        .map(|caps| caps[1].to_uppercase())
}

pub fn has_percent_off(line: &str) -> bool {
    PERCENT_OFF.is_match(line)
}

pub fn has_deal_signal(line: &str) -> bool {
    DEAL_SIGNAL.is_match(line)
}

pub fn has_strong_deal_signal(line: &str) -> bool {
    STRONG_DEAL_SIGNAL.is_match(line)
}

/// The strong-signal set doubles as "the text actually describes an offer".
pub fn has_offer_detail(text: &str) -> bool {
    STRONG_DEAL_SIGNAL.is_match(text)
}

pub fn has_non_deal_link_context(text: &str) -> bool {
    NON_DEAL_LINK.is_match(text)
}

pub fn has_deal_vocab(text: &str) -> bool {
    DEAL_VOCAB.is_match(text)
}

pub fn has_promo_vocab(text: &str) -> bool {
    PROMO_VOCAB.is_match(text)
}

/// Strip URLs and arrow decorations; collapse whitespace.
pub fn clean_offer_text(input: &str) -> String {
    let no_url = URL_PATTERN.replace_all(input, " ");
    let no_arrows = ARROW_EMOJI.replace_all(&no_url, " ");
    normalize_whitespace(&no_arrows)
}

/// A bare "free trial" call to action with no quantifiable deal attached.
pub fn is_generic_free_trial_cta(line: &str) -> bool {
    let lower = line.to_lowercase();
    if !lower.contains("free trial") {
        return false;
    }
    let has_deal_signal = has_percent_off(line)
        || lower.contains("use code")
        || lower.contains("bonus")
        || lower.contains("credit")
        || lower.contains("extended")
        || lower.contains("extra");
    !has_deal_signal
}

/// Offer text that carries no usable detail on its own.
pub fn looks_generic_offer_text(text: &str) -> bool {
    if text.is_empty() || NON_WORD_ONLY.is_match(text) {
        return true;
    }
    if text.chars().count() < 8 {
        return true;
    }
    if GENERIC_CTA.is_match(text) && !has_offer_detail(text) {
        return true;
    }
    !has_offer_detail(text)
}

pub fn classify_offer_type(
    code: Option<&str>,
    link_url: Option<&str>,
    offer_text: &str,
) -> OfferType {
    let text = offer_text.to_lowercase();
    if code.is_some() {
        OfferType::Code
    } else if TRIAL_EXTENSION.is_match(&text) {
        OfferType::TrialExtension
    } else if CREDIT_BONUS.is_match(&text) {
        OfferType::CreditBonus
    } else if link_url.is_some() {
        OfferType::Link
    } else {
        OfferType::Unknown
    }
}

pub fn safe_hostname(url: &str) -> Option<String> {
    Url::parse(url)
        .ok()?
        .host_str()
        .map(|h| h.trim_start_matches("www.").to_lowercase())
}

/// Can the candidate be traced to the tool under analysis? Alias token in
/// the text/link, or the link host contains the tool's website host.
pub fn looks_relevant_to_tool(line: &str, link_url: Option<&str>, context: &ToolContext) -> bool {
    let haystack = format!("{line} {}", link_url.unwrap_or("")).to_lowercase();
    let mut tokens = normalize_tool_tokens(&context.tool_name);
    tokens.extend(normalize_tool_tokens(&context.tool_slug));
    if tokens.iter().any(|token| haystack.contains(token)) {
        return true;
    }

    let link_host = link_url.and_then(safe_hostname);
    let website_host = context.tool_website_url.as_deref().and_then(safe_hostname);
    matches!((link_host, website_host), (Some(link), Some(site)) if link.contains(&site))
}
