use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;

use crate::types::CaptionSegment;

static NUMERIC_ENTITY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"&#(\d+);").expect("valid regex"));
static HEX_ENTITY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"&#x([0-9a-fA-F]+);").expect("valid regex"));
static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));
static PARAGRAPH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<p\b([^>]*)>(.*?)</p>").expect("valid regex"));
static PARA_START: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"\bt="(\d+)""#).expect("valid regex"));
static PARA_DURATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"\bd="(\d+)""#).expect("valid regex"));
static LINE_BREAK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<br\s*/?\s*>").expect("valid regex"));
static SENTENCE_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)</?s\b[^>]*>").expect("valid regex"));
static ANY_TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]+>").expect("valid regex"));

#[derive(Debug, Deserialize)]
struct TimedTextResponse {
    #[serde(default)]
    events: Vec<TimedTextEvent>,
}

#[derive(Debug, Deserialize)]
struct TimedTextEvent {
    #[serde(rename = "tStartMs")]
    start_ms: Option<i64>,
    #[serde(rename = "dDurationMs")]
    duration_ms: Option<i64>,
    #[serde(default)]
    segs: Vec<TimedTextSeg>,
}

#[derive(Debug, Deserialize)]
struct TimedTextSeg {
    utf8: Option<String>,
}

/// Decode the small set of HTML entities YouTube caption payloads use.
/// Numeric references that do not map to a valid scalar (surrogates
/// included) are left untouched rather than producing broken text.
pub fn decode_entities(input: &str) -> String {
    let step = input
        .replace("&amp;", "&")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">");

    let step = NUMERIC_ENTITY.replace_all(&step, |caps: &regex::Captures| {
        caps[1]
            .parse::<u32>()
            .ok()
            .and_then(char::from_u32)
            .map(String::from)
            .unwrap_or_else(|| caps[0].to_string())
    });

    HEX_ENTITY
        .replace_all(&step, |caps: &regex::Captures| {
            u32::from_str_radix(&caps[1], 16)
                .ok()
                .and_then(char::from_u32)
                .map(String::from)
                .unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

pub fn normalize_text(input: &str) -> String {
    WHITESPACE
        .replace_all(&decode_entities(input), " ")
        .trim()
        .to_string()
}

fn floor_start_seconds(ms: i64) -> u64 {
    (ms.max(0) / 1000) as u64
}

fn floor_duration_seconds(ms: i64) -> u64 {
    ((ms / 1000).max(1)) as u64
}

/// Parse the json3 timedtext format.
pub fn parse_timed_text(text: &str) -> Vec<CaptionSegment> {
    let Ok(payload) = serde_json::from_str::<TimedTextResponse>(text) else {
        return Vec::new();
    };

    let mut out = Vec::new();
    for event in payload.events {
        let text: String = event
            .segs
            .iter()
            .filter_map(|seg| seg.utf8.as_deref())
            .collect();
        let text = normalize_text(&text);
        if text.is_empty() {
            continue;
        }
        out.push(CaptionSegment {
            start_seconds: floor_start_seconds(event.start_ms.unwrap_or(0)),
            duration_seconds: floor_duration_seconds(event.duration_ms.unwrap_or(1000)),
            text,
        });
    }
    out
}

/// Parse the srv3 XML timedtext format without a full XML parser. The
/// payload is machine-generated, so paragraph-level regexes are enough.
pub fn parse_xml_timed_text(xml: &str) -> Vec<CaptionSegment> {
    let mut out = Vec::new();

    for caps in PARAGRAPH.captures_iter(xml) {
        let attrs = caps.get(1).map_or("", |m| m.as_str());
        let body = caps.get(2).map_or("", |m| m.as_str());

        let start_ms: i64 = PARA_START
            .captures(attrs)
            .and_then(|c| c[1].parse().ok())
            .unwrap_or(0);
        let duration_ms: i64 = PARA_DURATION
            .captures(attrs)
            .and_then(|c| c[1].parse().ok())
            .unwrap_or(1000);

        let plain = LINE_BREAK.replace_all(body, " ");
        let plain = SENTENCE_TAG.replace_all(&plain, "");
        let plain = ANY_TAG.replace_all(&plain, " ");
        let text = normalize_text(&plain);
        if text.is_empty() {
            continue;
        }

        out.push(CaptionSegment {
            start_seconds: floor_start_seconds(start_ms),
            duration_seconds: floor_duration_seconds(duration_ms),
            text,
        });
    }

    out
}

/// Dispatch on content type, falling back to sniffing the body.
pub fn parse_transcript_body(raw: &str, content_type: Option<&str>) -> Vec<CaptionSegment> {
    let text = raw.trim();
    if text.is_empty() {
        return Vec::new();
    }

    let prefer_json =
        content_type.is_some_and(|ct| ct.contains("json")) || text.starts_with('{');
    if prefer_json {
        let segments = parse_timed_text(text);
        if !segments.is_empty() {
            return segments;
        }
    }

    if content_type.is_some_and(|ct| ct.contains("xml")) || text.starts_with('<') {
        return parse_xml_timed_text(text);
    }

    let segments = parse_timed_text(text);
    if !segments.is_empty() {
        return segments;
    }
    parse_xml_timed_text(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_named_entities() {
        assert_eq!(decode_entities("a &amp; b &lt;c&gt;"), "a & b <c>");
        assert_eq!(decode_entities("it&#39;s &quot;fine&quot;"), "it's \"fine\"");
    }

    #[test]
    fn test_decode_numeric_entities() {
        assert_eq!(decode_entities("&#65;&#x42;"), "AB");
    }

    #[test]
    fn test_decode_surrogate_entity_left_intact() {
        // 0xD800 is a lone surrogate; char::from_u32 rejects it.
        assert_eq!(decode_entities("x &#55296; y"), "x &#55296; y");
    }

    #[test]
    fn test_normalize_collapses_whitespace() {
        assert_eq!(normalize_text("  a\n\tb   c "), "a b c");
    }

    #[test]
    fn test_parse_json3() {
        let payload = r#"{"events":[
            {"tStartMs":1500,"dDurationMs":2500,"segs":[{"utf8":"hello "},{"utf8":"world"}]},
            {"tStartMs":5000,"dDurationMs":900,"segs":[{"utf8":"   "}]},
            {"tStartMs":8000,"segs":[{"utf8":"tail"}]}
        ]}"#;
        let segments = parse_timed_text(payload);
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].start_seconds, 1);
        assert_eq!(segments[0].duration_seconds, 2);
        assert_eq!(segments[0].text, "hello world");
        // Missing duration defaults to one second.
        assert_eq!(segments[1].start_seconds, 8);
        assert_eq!(segments[1].duration_seconds, 1);
    }

    #[test]
    fn test_parse_json3_duration_floor_is_at_least_one() {
        let payload = r#"{"events":[{"tStartMs":0,"dDurationMs":400,"segs":[{"utf8":"x"}]}]}"#;
        let segments = parse_timed_text(payload);
        assert_eq!(segments[0].duration_seconds, 1);
    }

    #[test]
    fn test_parse_srv3_xml() {
        let xml = r#"<timedtext><body>
            <p t="1000" d="3000">first <s>part</s><br/>second</p>
            <p t="4000" d="2000"><b>bold</b> text &amp; more</p>
            <p t="9000" d="1000">   </p>
        </body></timedtext>"#;
        let segments = parse_xml_timed_text(xml);
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].start_seconds, 1);
        assert_eq!(segments[0].duration_seconds, 3);
        assert_eq!(segments[0].text, "first part second");
        assert_eq!(segments[1].text, "bold text & more");
    }

    #[test]
    fn test_dispatch_sniffs_body_when_content_type_missing() {
        let json = r#"{"events":[{"tStartMs":0,"dDurationMs":1000,"segs":[{"utf8":"a"}]}]}"#;
        assert_eq!(parse_transcript_body(json, None).len(), 1);

        let xml = r#"<timedtext><body><p t="0" d="1000">a</p></body></timedtext>"#;
        assert_eq!(parse_transcript_body(xml, None).len(), 1);
    }

    #[test]
    fn test_dispatch_falls_back_to_xml_when_json_empty() {
        let xml = r#"<timedtext><body><p t="0" d="1000">a</p></body></timedtext>"#;
        assert_eq!(parse_transcript_body(xml, Some("text/json")).len(), 1);
    }

    #[test]
    fn test_empty_body() {
        assert!(parse_transcript_body("   ", Some("application/json")).is_empty());
    }
}
