//! Dataset construction: transcript windows for one tool, built solely
//! from cached transcripts so repeated runs label identical text.

use std::collections::{HashMap, HashSet};

use anyhow::{anyhow, Result};
use chrono::{SecondsFormat, Utc};
use clipsignal_common::heuristics::{build_tool_aliases, signal_score};
use clipsignal_common::transcripts::{normalize_cached_segments, truncate_chars};
use clipsignal_common::windows::{
    find_decision_fallback_windows, find_mention_windows, FallbackOptions,
};
use clipsignal_common::{TextWindow, WindowSource};
use clipsignal_store::{filter, RestStore, ToolRow, VideoRow};
use serde::{Deserialize, Serialize};
use tracing::debug;
use youtube_client::CaptionSegment;

const DATASET_WINDOW_SECONDS: u64 = 60;
const DATASET_MERGE_SLACK: u64 = 12;

#[derive(Debug, Clone)]
pub struct DatasetOptions {
    pub tool_slug: String,
    pub limit_videos: usize,
    pub windows_per_video: usize,
    pub max_window_chars: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetTool {
    pub id: String,
    pub slug: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetVideo {
    pub id: String,
    pub youtube_video_id: String,
    pub title: String,
    pub video_url: String,
    pub publish_date: Option<String>,
    pub transcript_source: Option<String>,
    pub transcript_fetched_at: Option<String>,
    pub segments_count: usize,
    pub windows_count: usize,
    pub mention_windows_count: usize,
    pub fallback_windows_count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetWindow {
    pub id: String,
    pub video_id: String,
    pub youtube_video_id: String,
    pub video_title: String,
    pub video_url: String,
    pub publish_date: Option<String>,
    pub window_index: usize,
    pub window_source: WindowSource,
    pub start_seconds: u64,
    pub end_seconds: u64,
    pub signal_score: i32,
    pub transcript_window: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dataset {
    pub generated_at: String,
    pub tool: DatasetTool,
    pub aliases: Vec<String>,
    pub requested_video_limit: usize,
    pub selected_video_count: usize,
    pub window_count: usize,
    pub videos: Vec<DatasetVideo>,
    pub windows: Vec<DatasetWindow>,
}

#[derive(Debug, Deserialize)]
struct MentionVideoRef {
    video_id: String,
}

#[derive(Debug, Deserialize)]
struct TranscriptRow {
    video_id: String,
    #[serde(default)]
    segments_json: Option<serde_json::Value>,
    #[serde(default)]
    source: Option<String>,
    #[serde(default)]
    fetched_at: Option<String>,
}

/// Mention windows first, then fallback windows around them, capped at
/// `windows_per_video` total.
fn select_windows(
    segments: &[CaptionSegment],
    aliases: &[String],
    windows_per_video: usize,
) -> Vec<TextWindow> {
    let mut selected =
        find_mention_windows(segments, aliases, DATASET_WINDOW_SECONDS, DATASET_MERGE_SLACK);
    selected.truncate(windows_per_video);

    let needed = windows_per_video.saturating_sub(selected.len());
    let blocked: Vec<(u64, u64)> = selected
        .iter()
        .map(|w| (w.start_seconds, w.end_seconds))
        .collect();
    selected.extend(find_decision_fallback_windows(
        segments,
        &FallbackOptions::dataset(needed, DATASET_WINDOW_SECONDS, blocked),
    ));

    selected.truncate(windows_per_video);
    selected
}

fn watch_url(youtube_video_id: &str) -> String {
    format!("https://www.youtube.com/watch?v={youtube_video_id}")
}

pub async fn build_dataset(store: &RestStore, opts: &DatasetOptions) -> Result<Dataset> {
    let tools: Vec<ToolRow> = store
        .select(
            "tools",
            vec![
                ("select".to_string(), "id,slug,name".to_string()),
                ("slug".to_string(), filter::eq(&opts.tool_slug)),
                ("limit".to_string(), "1".to_string()),
            ],
        )
        .await?;
    let tool = tools
        .into_iter()
        .next()
        .ok_or_else(|| anyhow!("Tool not found: {}", opts.tool_slug))?;

    let mentions: Vec<MentionVideoRef> = store
        .select(
            "video_mentions",
            vec![
                ("select".to_string(), "video_id".to_string()),
                ("tool_id".to_string(), filter::eq(&tool.id)),
                ("limit".to_string(), "10000".to_string()),
            ],
        )
        .await?;
    let mut seen = HashSet::new();
    let mention_ids: Vec<String> = mentions
        .into_iter()
        .map(|m| m.video_id)
        .filter(|id| seen.insert(id.clone()))
        .collect();
    if mention_ids.is_empty() {
        return Err(anyhow!("No videos linked for tool: {}", tool.slug));
    }

    let videos: Vec<VideoRow> = store
        .select(
            "youtube_videos",
            vec![
                (
                    "select".to_string(),
                    "id,youtube_video_id,title,video_url,published_at".to_string(),
                ),
                ("id".to_string(), filter::in_list(&mention_ids)),
                ("order".to_string(), "published_at.desc".to_string()),
                (
                    "limit".to_string(),
                    (opts.limit_videos * 4).max(40).to_string(),
                ),
            ],
        )
        .await?;
    let candidates: Vec<VideoRow> = videos
        .into_iter()
        .filter(|v| !v.youtube_video_id.starts_with("seed-"))
        .collect();

    let transcript_rows: Vec<TranscriptRow> = if candidates.is_empty() {
        Vec::new()
    } else {
        let ids: Vec<&str> = candidates.iter().map(|v| v.id.as_str()).collect();
        store
            .select(
                "video_transcripts",
                vec![
                    (
                        "select".to_string(),
                        "video_id,segments_json,source,fetched_at".to_string(),
                    ),
                    ("video_id".to_string(), filter::in_list(&ids)),
                    ("limit".to_string(), "10000".to_string()),
                ],
            )
            .await?
    };
    let transcript_by_video: HashMap<&str, &TranscriptRow> = transcript_rows
        .iter()
        .map(|row| (row.video_id.as_str(), row))
        .collect();

    let aliases = build_tool_aliases(&tool.name, &tool.slug);
    let mut selected_videos = Vec::new();
    let mut windows = Vec::new();

    for video in &candidates {
        if selected_videos.len() >= opts.limit_videos {
            break;
        }
        let row = transcript_by_video.get(video.id.as_str());
        let segments =
            normalize_cached_segments(row.and_then(|r| r.segments_json.as_ref()));
        if segments.is_empty() {
            continue;
        }

        let selected = select_windows(&segments, &aliases, opts.windows_per_video);
        if selected.is_empty() {
            continue;
        }
        debug!(
            video = %video.youtube_video_id,
            windows = selected.len(),
            "selected dataset windows"
        );

        let video_url = video
            .video_url
            .clone()
            .unwrap_or_else(|| watch_url(&video.youtube_video_id));
        let publish_date = video
            .published_at
            .as_deref()
            .map(|d| d.chars().take(10).collect::<String>());

        let mention_count = selected
            .iter()
            .filter(|w| w.source == WindowSource::Mention)
            .count();

        for (index, window) in selected.iter().enumerate() {
            windows.push(DatasetWindow {
                id: format!("{}:{}", video.id, index + 1),
                video_id: video.id.clone(),
                youtube_video_id: video.youtube_video_id.clone(),
                video_title: video.title.clone(),
                video_url: video_url.clone(),
                publish_date: publish_date.clone(),
                window_index: index + 1,
                window_source: window.source,
                start_seconds: window.start_seconds,
                end_seconds: window.end_seconds,
                signal_score: signal_score(&window.text),
                transcript_window: truncate_chars(&window.text, opts.max_window_chars),
            });
        }

        selected_videos.push(DatasetVideo {
            id: video.id.clone(),
            youtube_video_id: video.youtube_video_id.clone(),
            title: video.title.clone(),
            video_url,
            publish_date,
            transcript_source: row.and_then(|r| r.source.clone()),
            transcript_fetched_at: row.and_then(|r| r.fetched_at.clone()),
            segments_count: segments.len(),
            windows_count: selected.len(),
            mention_windows_count: mention_count,
            fallback_windows_count: selected.len() - mention_count,
        });
    }

    Ok(Dataset {
        generated_at: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        tool: DatasetTool { id: tool.id, slug: tool.slug, name: tool.name },
        aliases,
        requested_video_limit: opts.limit_videos,
        selected_video_count: selected_videos.len(),
        window_count: windows.len(),
        videos: selected_videos,
        windows,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seg(start: u64, text: &str) -> CaptionSegment {
        CaptionSegment {
            start_seconds: start,
            duration_seconds: 4,
            text: text.to_string(),
        }
    }

    fn aliases() -> Vec<String> {
        build_tool_aliases("InVideo AI", "invideo-ai")
    }

    #[test]
    fn test_mention_windows_come_first() {
        let segments = vec![
            seg(0, "welcome to the channel everyone"),
            seg(90, "invideo pricing costs $20 and exports are fast"),
            seg(200, "quality limits cap renders at 1080p"),
            seg(300, "closing remarks"),
        ];
        let selected = select_windows(&segments, &aliases(), 3);
        assert!(!selected.is_empty());
        assert_eq!(selected[0].source, WindowSource::Mention);
        assert!(selected[0].text.contains("pricing costs $20"));
    }

    #[test]
    fn test_fallback_fills_up_to_cap() {
        let segments = vec![
            seg(0, "invideo pricing costs $20"),
            seg(120, "exports are slow and renders take minutes"),
            seg(240, "support quality is reliable"),
            seg(360, "tail"),
        ];
        let selected = select_windows(&segments, &aliases(), 3);
        assert!(selected.len() > 1);
        assert!(selected.len() <= 3);
        assert_eq!(selected[0].source, WindowSource::Mention);
        assert!(selected[1..].iter().all(|w| w.source == WindowSource::Fallback));
    }

    #[test]
    fn test_cap_applies_to_mention_windows() {
        let segments = vec![
            seg(0, "invideo costs money"),
            seg(100, "invideo renders fast"),
            seg(200, "invideo exports slowly"),
            seg(300, "invideo supports teams"),
        ];
        let selected = select_windows(&segments, &aliases(), 2);
        assert_eq!(selected.len(), 2);
        assert!(selected.iter().all(|w| w.source == WindowSource::Mention));
    }

    #[test]
    fn test_no_segments_no_windows() {
        assert!(select_windows(&[], &aliases(), 3).is_empty());
    }

    #[test]
    fn test_window_ids_are_one_based() {
        // Mirrors the id assignment in build_dataset.
        let ids: Vec<String> = (0..3).map(|i| format!("{}:{}", "vid-1", i + 1)).collect();
        assert_eq!(ids, vec!["vid-1:1", "vid-1:2", "vid-1:3"]);
    }
}
