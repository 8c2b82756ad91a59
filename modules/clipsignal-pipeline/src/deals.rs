//! Deal extraction from video descriptions.
//!
//! Works line by line: any line with direct evidence (URL, promo code,
//! percent-off, or deal vocabulary) becomes an anchor, and missing pieces
//! are backfilled from the nearest line within two lines in either
//! direction. Candidates then pass attribution and specificity filters
//! before dedup.

use clipsignal_common::heuristics;
use clipsignal_common::{DealCandidate, OfferType, ToolContext};
use std::collections::HashSet;

#[derive(Debug, Clone)]
struct ParsedLine {
    raw: String,
    cleaned: String,
    urls: Vec<String>,
    code: Option<String>,
    has_percent: bool,
    has_deal_signal: bool,
    has_strong_signal: bool,
}

fn parse_line(line: &str) -> ParsedLine {
    let urls = heuristics::find_urls(line);
    let code = heuristics::find_promo_code(line);
    let has_percent = heuristics::has_percent_off(line);
    let has_evidence = code.is_some() || has_percent;
    ParsedLine {
        raw: line.to_string(),
        cleaned: heuristics::clean_offer_text(line),
        urls,
        has_deal_signal: heuristics::has_deal_signal(line) || has_evidence,
        has_strong_signal: heuristics::has_strong_deal_signal(line) || has_evidence,
        code,
        has_percent,
    }
}

/// Closest line to `index` matching the predicate, preferring the line
/// itself, then one above, one below, two above, two below.
fn nearest_line<'a>(
    lines: &'a [ParsedLine],
    index: usize,
    predicate: impl Fn(&ParsedLine) -> bool,
) -> Option<&'a ParsedLine> {
    for offset in [0i64, -1, 1, -2, 2] {
        let idx = index as i64 + offset;
        if idx < 0 || idx as usize >= lines.len() {
            continue;
        }
        let line = &lines[idx as usize];
        if predicate(line) {
            return Some(line);
        }
    }
    None
}

pub fn extract_deals(description: &str, context: &ToolContext) -> Vec<DealCandidate> {
    if description.trim().is_empty() {
        return Vec::new();
    }

    let lines: Vec<ParsedLine> = description
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter(|line| !heuristics::is_generic_free_trial_cta(line))
        .map(parse_line)
        .collect();

    let mut candidates = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();

    for (i, line) in lines.iter().enumerate() {
        if line.urls.is_empty() && line.code.is_none() && !line.has_percent && !line.has_deal_signal
        {
            continue;
        }

        let near_link = nearest_line(&lines, i, |l| !l.urls.is_empty());
        let near_offer = nearest_line(&lines, i, |l| {
            l.has_strong_signal && !heuristics::looks_generic_offer_text(&l.cleaned)
        });
        let near_code = nearest_line(&lines, i, |l| l.code.is_some());

        let link_url = line
            .urls
            .first()
            .or_else(|| near_link.and_then(|l| l.urls.first()))
            .cloned();
        let code = line
            .code
            .clone()
            .or_else(|| near_code.and_then(|l| l.code.clone()));

        let mut offer_text = line.cleaned.clone();
        if heuristics::looks_generic_offer_text(&offer_text) {
            if let Some(near) = near_offer {
                offer_text = near.cleaned.clone();
            }
        }
        if heuristics::looks_generic_offer_text(&offer_text) {
            offer_text = match &code {
                Some(code) => format!("Use code {code}"),
                None => String::new(),
            };
        }

        let offer_type =
            heuristics::classify_offer_type(code.as_deref(), link_url.as_deref(), &offer_text);
        let has_strong_signal = line.has_strong_signal
            || near_offer.is_some_and(|l| l.has_strong_signal)
            || code.is_some();
        let has_offer_detail = code.is_some() || heuristics::has_offer_detail(&offer_text);

        if offer_type != OfferType::Link && !has_strong_signal {
            continue;
        }
        if !has_offer_detail {
            continue;
        }

        let attribution_text = format!("{} {offer_text}", line.raw);
        if !heuristics::looks_relevant_to_tool(&attribution_text, link_url.as_deref(), context) {
            continue;
        }

        // Social/community links only survive when deal vocabulary sits
        // right next to them.
        if offer_type == OfferType::Link
            && heuristics::has_non_deal_link_context(&attribution_text)
            && !heuristics::has_deal_vocab(&attribution_text)
        {
            continue;
        }
        if offer_type == OfferType::Unknown && !heuristics::has_promo_vocab(&offer_text) {
            continue;
        }

        let key = format!(
            "{}|{}|{}|{}",
            offer_type.as_str(),
            code.as_deref().unwrap_or(""),
            link_url.as_deref().unwrap_or(""),
            offer_text.to_lowercase()
        );
        if !seen.insert(key) {
            continue;
        }

        candidates.push(DealCandidate {
            offer_text,
            offer_type,
            code,
            link_url,
        });
    }

    candidates
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context() -> ToolContext {
        ToolContext {
            tool_name: "InVideo AI".to_string(),
            tool_slug: "invideo-ai".to_string(),
            tool_website_url: Some("https://invideo.io".to_string()),
        }
    }

    #[test]
    fn extracts_code_deal_with_adjacent_link() {
        let description = "Get 50% off InVideo with code CREATOR50\nhttps://invideo.io/pricing";
        let deals = extract_deals(description, &context());
        assert!(!deals.is_empty());
        let deal = &deals[0];
        assert_eq!(deal.offer_type, OfferType::Code);
        assert_eq!(deal.code.as_deref(), Some("CREATOR50"));
        assert_eq!(deal.link_url.as_deref(), Some("https://invideo.io/pricing"));
        assert!(deal.offer_text.contains("50% off"));
    }

    #[test]
    fn uppercases_promo_code() {
        let description = "Use code creator50 for 20% off InVideo\nhttps://invideo.io";
        let deals = extract_deals(description, &context());
        assert_eq!(deals[0].code.as_deref(), Some("CREATOR50"));
    }

    #[test]
    fn skips_generic_free_trial_cta() {
        let description = "Start your free trial of InVideo today!\nhttps://invideo.io";
        let deals = extract_deals(description, &context());
        assert!(deals.is_empty());
    }

    #[test]
    fn skips_social_links_without_deal_vocab() {
        let description = "Follow InVideo on twitter: https://twitter.com/invideo";
        let deals = extract_deals(description, &context());
        assert!(deals.is_empty());
    }

    #[test]
    fn keeps_affiliate_link_with_discount_vocab() {
        let description = "InVideo discount link (affiliate): 25% off https://invideo.io/deal";
        let deals = extract_deals(description, &context());
        assert_eq!(deals.len(), 1);
        assert_eq!(deals[0].offer_type, OfferType::Link);
        assert!(deals[0].offer_text.contains("25% off"));
    }

    #[test]
    fn drops_deals_for_unrelated_tools() {
        let description = "Get 30% off SomeOtherApp with code OTHER30\nhttps://someotherapp.com";
        let deals = extract_deals(description, &context());
        assert!(deals.is_empty());
    }

    #[test]
    fn dedupes_repeated_offers() {
        let description = "50% off InVideo with code CREATOR50 https://invideo.io\n\n50% off InVideo with code CREATOR50 https://invideo.io";
        let deals = extract_deals(description, &context());
        assert_eq!(deals.len(), 1);
    }

    #[test]
    fn falls_back_to_use_code_offer_text() {
        // Line carries a code but no offer detail wording of its own.
        let description = "InVideo code: SAVEBIG20\nhttps://invideo.io";
        let deals = extract_deals(description, &context());
        assert_eq!(deals.len(), 1);
        assert_eq!(deals[0].offer_text, "Use code SAVEBIG20");
        assert_eq!(deals[0].offer_type, OfferType::Code);
    }

    #[test]
    fn classifies_trial_extension() {
        let description = "InVideo extended trial - extra 14 days trial via this link https://invideo.io/trial";
        let deals = extract_deals(description, &context());
        assert_eq!(deals.len(), 1);
        assert_eq!(deals[0].offer_type, OfferType::TrialExtension);
    }

    #[test]
    fn empty_description_yields_nothing() {
        assert!(extract_deals("   \n  ", &context()).is_empty());
    }
}
