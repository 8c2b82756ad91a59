//! Window builder: turns a caption transcript into candidate text windows
//! for review extraction, either around tool mentions or, failing that,
//! around spans that score high for decision-relevant content.

use youtube_client::CaptionSegment;

use crate::heuristics::{normalize_whitespace, signal_score};
use crate::types::{TextWindow, WindowSource};

/// Knobs for [`find_decision_fallback_windows`]. The live pipeline keeps a
/// minimum score; the evaluation harness instead blocks already-used spans
/// and insists on at least one window.
#[derive(Debug, Clone)]
pub struct FallbackOptions {
    pub count: usize,
    pub window_seconds: u64,
    pub step_seconds: u64,
    pub min_score: Option<i32>,
    pub blocked: Vec<(u64, u64)>,
    pub ensure_at_least_one: bool,
}

impl FallbackOptions {
    /// Live-pipeline profile: one window, filter out low-signal spans.
    pub fn live(count: usize, window_seconds: u64) -> Self {
        Self {
            count,
            window_seconds,
            step_seconds: 30,
            min_score: Some(2),
            blocked: Vec::new(),
            ensure_at_least_one: false,
        }
    }

    /// Evaluation-dataset profile: fill up to `count` windows around the
    /// given blocked spans, returning at least one when any text exists.
    pub fn dataset(count: usize, window_seconds: u64, blocked: Vec<(u64, u64)>) -> Self {
        Self {
            count,
            window_seconds,
            step_seconds: 30,
            min_score: None,
            blocked,
            ensure_at_least_one: true,
        }
    }
}

fn window_text(segments: &[CaptionSegment], start: u64, end: u64) -> String {
    let joined: Vec<&str> = segments
        .iter()
        .filter(|s| s.start_seconds >= start && s.start_seconds <= end)
        .map(|s| s.text.as_str())
        .collect();
    normalize_whitespace(&joined.join(" "))
}

fn overlap_seconds(a: (u64, u64), b: (u64, u64)) -> u64 {
    a.1.min(b.1).saturating_sub(a.0.max(b.0))
}

/// Build a window around every segment mentioning a tool alias, then merge
/// windows that nearly touch (`start <= prev.end - merge_slack`).
pub fn find_mention_windows(
    segments: &[CaptionSegment],
    aliases: &[String],
    window_seconds: u64,
    merge_slack: u64,
) -> Vec<TextWindow> {
    if segments.is_empty() || aliases.is_empty() {
        return Vec::new();
    }

    let half = window_seconds / 2;
    let mut windows: Vec<TextWindow> = Vec::new();

    for segment in segments {
        let lower = segment.text.to_lowercase();
        if !aliases.iter().any(|alias| lower.contains(alias)) {
            continue;
        }
        let start = segment.start_seconds.saturating_sub(half);
        let end = start + window_seconds;
        let text = window_text(segments, start, end);
        if text.is_empty() {
            continue;
        }
        windows.push(TextWindow {
            start_seconds: start,
            end_seconds: end,
            text,
            source: WindowSource::Mention,
        });
    }

    windows.sort_by_key(|w| w.start_seconds);

    let mut merged: Vec<TextWindow> = Vec::new();
    for window in windows {
        match merged.last_mut() {
            Some(prev) if window.start_seconds + merge_slack <= prev.end_seconds => {
                prev.end_seconds = prev.end_seconds.max(window.end_seconds);
                prev.text = normalize_whitespace(&format!("{} {}", prev.text, window.text));
            }
            _ => merged.push(window),
        }
    }
    merged
}

/// Slide a window across the transcript, score each span, and greedily pick
/// the top non-overlapping candidates. Only used when no mention window
/// exists (live) or to top up the eval dataset.
pub fn find_decision_fallback_windows(
    segments: &[CaptionSegment],
    options: &FallbackOptions,
) -> Vec<TextWindow> {
    if segments.is_empty() || options.count == 0 {
        return Vec::new();
    }

    let last_start = segments.last().map_or(0, |s| s.start_seconds);
    let max_start = last_start.saturating_sub(options.window_seconds);

    let mut candidates: Vec<(TextWindow, i32)> = Vec::new();
    let mut start = 0;
    while start <= max_start {
        push_candidate(segments, start, options, &mut candidates);
        start += options.step_seconds;
    }

    if candidates.is_empty() {
        push_candidate(segments, 0, options, &mut candidates);
    }

    candidates.sort_by(|a, b| {
        b.1.cmp(&a.1)
            .then(a.0.start_seconds.cmp(&b.0.start_seconds))
    });

    let mut selected: Vec<TextWindow> = Vec::new();
    for (candidate, score) in &candidates {
        if selected.len() >= options.count {
            break;
        }
        if let Some(min) = options.min_score {
            if *score < min {
                continue;
            }
        }
        let span = (candidate.start_seconds, candidate.end_seconds);
        let overlaps = |other: (u64, u64)| overlap_seconds(span, other) > 12;
        if options.blocked.iter().any(|blocked| overlaps(*blocked)) {
            continue;
        }
        if selected
            .iter()
            .any(|w| overlaps((w.start_seconds, w.end_seconds)))
        {
            continue;
        }
        selected.push(candidate.clone());
    }

    if selected.is_empty() && options.ensure_at_least_one {
        if let Some((best, _)) = candidates.first() {
            selected.push(best.clone());
        }
    }

    selected.truncate(options.count);
    selected
}

fn push_candidate(
    segments: &[CaptionSegment],
    start: u64,
    options: &FallbackOptions,
    out: &mut Vec<(TextWindow, i32)>,
) {
    let end = start + options.window_seconds;
    let text = window_text(segments, start, end);
    if text.is_empty() {
        return;
    }
    let score = signal_score(&text);
    out.push((
        TextWindow {
            start_seconds: start,
            end_seconds: end,
            text,
            source: WindowSource::Fallback,
        },
        score,
    ));
}
