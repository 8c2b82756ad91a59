//! Helpers for transcripts stored as JSON in the cache table.

use serde_json::Value;
use youtube_client::CaptionSegment;

use crate::heuristics::normalize_whitespace;

/// Cached segments pass through the same floor/clamp rules as fresh ones;
/// malformed entries are dropped rather than failing the video.
pub fn normalize_cached_segments(value: Option<&Value>) -> Vec<CaptionSegment> {
    let Some(value) = value else {
        return Vec::new();
    };
    let Some(items) = value.as_array() else {
        return Vec::new();
    };
    let mut out = Vec::new();
    for item in items {
        let Some(start) = item.get("start_seconds").and_then(|v| v.as_u64()) else {
            continue;
        };
        let text = item
            .get("text")
            .and_then(|v| v.as_str())
            .map(str::trim)
            .unwrap_or("");
        if text.is_empty() {
            continue;
        }
        let duration = item
            .get("duration_seconds")
            .and_then(|v| v.as_u64())
            .filter(|d| *d > 0)
            .unwrap_or(1);
        out.push(CaptionSegment {
            start_seconds: start,
            duration_seconds: duration,
            text: text.to_string(),
        });
    }
    out
}

pub fn transcript_text(segments: &[CaptionSegment]) -> String {
    let joined: Vec<&str> = segments.iter().map(|s| s.text.as_str()).collect();
    normalize_whitespace(&joined.join(" "))
}

pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect::<String>().trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_normalize_cached_segments_clamps_and_drops() {
        let value = json!([
            { "start_seconds": 5, "duration_seconds": 0, "text": " hello " },
            { "start_seconds": 9, "duration_seconds": 4, "text": "   " },
            { "duration_seconds": 4, "text": "no start" },
            { "start_seconds": 12, "duration_seconds": 3, "text": "world" },
        ]);
        let segments = normalize_cached_segments(Some(&value));
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].start_seconds, 5);
        assert_eq!(segments[0].duration_seconds, 1);
        assert_eq!(segments[0].text, "hello");
        assert_eq!(segments[1].text, "world");
    }

    #[test]
    fn test_normalize_cached_segments_tolerates_non_array() {
        assert!(normalize_cached_segments(None).is_empty());
        assert!(normalize_cached_segments(Some(&json!("oops"))).is_empty());
    }

    #[test]
    fn test_truncate_chars_trims_result() {
        assert_eq!(truncate_chars("abc def  ", 100), "abc def");
        assert_eq!(truncate_chars("abcdef", 3), "abc");
    }

    #[test]
    fn test_transcript_text_joins_and_collapses() {
        let segments = vec![
            CaptionSegment { start_seconds: 0, duration_seconds: 2, text: "one  two".to_string() },
            CaptionSegment { start_seconds: 2, duration_seconds: 2, text: "three".to_string() },
        ];
        assert_eq!(transcript_text(&segments), "one two three");
    }
}
