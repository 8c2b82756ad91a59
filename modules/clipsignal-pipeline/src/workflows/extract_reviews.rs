//! Review extraction: serve transcripts from the cache or acquire them,
//! build text windows per tool mention, extract one quote per window, and
//! dedup-upsert the snippets.
//!
//! Transcript status contract per video: `ok` when segments were available,
//! `missing` when the video genuinely has no captions (or the cache was
//! empty in cache-only mode), `failed` when acquisition broke down.

use std::collections::HashMap;

use anyhow::Result;
use clipsignal_common::heuristics::build_tool_aliases;
use clipsignal_common::transcripts::{normalize_cached_segments, transcript_text, truncate_chars};
use clipsignal_common::windows::{find_decision_fallback_windows, find_mention_windows, FallbackOptions};
use clipsignal_common::{Config, ToolContext};
use clipsignal_store::{filter, MentionRow, Query, RestStore, Returning, ToolRow, TranscriptCacheRow};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, warn};
use youtube_client::{fetch_transcript_segments, CaptionError, CaptionSegment};

use super::{filter_tools, load_tools, now_iso, scoped_mentions, watch_url};
use crate::request::PipelineRequest;
use crate::reviews::ReviewExtractor;
use crate::summary::RunSummary;
use crate::upsert::{upsert_snippet, RestReviewRepo, ReviewRepo, SnippetRecord, SnippetWrite};

const MENTION_WINDOW_SECONDS: u64 = 45;
const MENTION_MERGE_SLACK: u64 = 10;
const MAX_WINDOWS_PER_MENTION: usize = 3;
const MAX_WINDOW_CHARS: usize = 700;

#[derive(Debug, Deserialize)]
struct VideoWithChannel {
    id: String,
    youtube_video_id: String,
    title: String,
    #[serde(default)]
    video_url: Option<String>,
    #[serde(default)]
    published_at: Option<String>,
    #[serde(default)]
    youtube_channels: Option<ChannelNameRef>,
}

#[derive(Debug, Deserialize)]
struct ChannelNameRef {
    #[serde(default)]
    name: Option<String>,
}

pub async fn run(config: &Config, store: &RestStore, req: &PipelineRequest) -> RunSummary {
    let mut summary = RunSummary::new("extract-reviews");
    if let Err(e) = execute(config, store, req, &mut summary).await {
        summary.errors.push(e.to_string());
    }
    summary.finalize()
}

async fn execute(
    config: &Config,
    store: &RestStore,
    req: &PipelineRequest,
    summary: &mut RunSummary,
) -> Result<()> {
    let extractor = ReviewExtractor::new(config.openai_api_key.as_deref(), &config.review_model);
    if !extractor.llm_enabled() {
        summary
            .warnings
            .push("OPENAI_API_KEY not set; using heuristic extraction fallback.".to_string());
    }
    let http = reqwest::Client::new();
    let now = now_iso();

    let max_videos = match req.limit_videos_per_tool.filter(|n| *n > 0) {
        Some(per_tool) => per_tool as usize * req.limit_tools.unwrap_or(20).max(20) as usize,
        None => 200,
    };

    let tools = filter_tools(load_tools(store, false).await?, req);
    summary.tools_scanned = tools.len() as u64;
    let tool_by_id: HashMap<&str, &ToolRow> =
        tools.iter().map(|tool| (tool.id.as_str(), tool)).collect();
    let tool_ids: Vec<String> = tools.iter().map(|tool| tool.id.clone()).collect();

    let mentions = scoped_mentions(store, &tool_ids).await?;
    let mut scoped_video_ids: Vec<String> = Vec::new();
    for mention in &mentions {
        if !scoped_video_ids.contains(&mention.video_id) {
            scoped_video_ids.push(mention.video_id.clone());
        }
    }
    if scoped_video_ids.is_empty() {
        summary
            .warnings
            .push("No videos linked to requested tool scope.".to_string());
        return Ok(());
    }

    let videos: Vec<VideoWithChannel> = store
        .select(
            "youtube_videos",
            scoped_video_query(&scoped_video_ids, max_videos, req.reprocess_videos),
        )
        .await?;
    if videos.is_empty() {
        summary.warnings.push(
            if req.reprocess_videos {
                "No scoped videos found."
            } else {
                "No scoped videos found with processed_at IS NULL."
            }
            .to_string(),
        );
        return Ok(());
    }

    let video_ids: Vec<String> = videos.iter().map(|video| video.id.clone()).collect();
    let cached_rows: Vec<TranscriptCacheRow> = store
        .select(
            "video_transcripts",
            vec![
                ("select".to_string(), "video_id,segments_json".to_string()),
                ("video_id".to_string(), filter::in_list(&video_ids)),
                ("limit".to_string(), "10000".to_string()),
            ],
        )
        .await?;
    let cached_by_video: HashMap<&str, &TranscriptCacheRow> = cached_rows
        .iter()
        .map(|row| (row.video_id.as_str(), row))
        .collect();

    let mut mentions_by_video: HashMap<&str, Vec<&MentionRow>> = HashMap::new();
    for mention in &mentions {
        if !tool_by_id.contains_key(mention.tool_id.as_str()) {
            continue;
        }
        mentions_by_video
            .entry(mention.video_id.as_str())
            .or_default()
            .push(mention);
    }

    let repo = RestReviewRepo::new(store);
    let mut ok_transcript_count = 0u64;

    for video in &videos {
        let video_mentions = mentions_by_video
            .get(video.id.as_str())
            .cloned()
            .unwrap_or_default();
        if video_mentions.is_empty() {
            if !req.dry_run {
                stamp_status(store, &video.id, &now, "failed").await?;
            }
            continue;
        }

        summary.videos_scanned += 1;
        let cached = normalize_cached_segments(
            cached_by_video
                .get(video.id.as_str())
                .and_then(|row| row.segments_json.as_ref()),
        );

        let resolution = resolve_transcript(cached, req.cache_only, || {
            fetch_transcript_segments(&http, &video.youtube_video_id, config.transcript_timeout)
        })
        .await;

        let segments = match resolution {
            TranscriptResolution::Cached(segments) => segments,
            TranscriptResolution::Fetched(segments) => {
                if !req.dry_run {
                    let _: Vec<serde_json::Value> = store
                        .upsert(
                            "video_transcripts",
                            &json!({
                                "video_id": video.id,
                                "youtube_video_id": video.youtube_video_id,
                                "transcript_text": transcript_text(&segments),
                                "segments_json": segments,
                                "source": "youtube_scrape",
                                "fetched_at": now,
                                "updated_at": now,
                            }),
                            "video_id",
                            Returning::Minimal,
                        )
                        .await?;
                }
                segments
            }
            TranscriptResolution::Missing => {
                if !req.dry_run {
                    stamp_status(store, &video.id, &now, "missing").await?;
                }
                continue;
            }
            TranscriptResolution::Failed(message) => {
                summary.errors.push(format!(
                    "Transcript fetch failed for {}: {message}",
                    video.youtube_video_id
                ));
                if !req.dry_run {
                    stamp_status(store, &video.id, &now, "failed").await?;
                }
                continue;
            }
        };
        ok_transcript_count += 1;

        for mention in video_mentions {
            let Some(tool) = tool_by_id.get(mention.tool_id.as_str()) else {
                continue;
            };
            let context = ToolContext {
                tool_name: tool.name.clone(),
                tool_slug: tool.slug.clone(),
                tool_website_url: None,
            };
            let aliases = build_tool_aliases(&tool.name, &tool.slug);

            let mut windows =
                find_mention_windows(&segments, &aliases, MENTION_WINDOW_SECONDS, MENTION_MERGE_SLACK);
            windows.truncate(MAX_WINDOWS_PER_MENTION);
            if windows.is_empty() {
                windows = find_decision_fallback_windows(
                    &segments,
                    &FallbackOptions::live(1, MENTION_WINDOW_SECONDS),
                );
            }
            debug!(tool = %tool.slug, video = %video.youtube_video_id, windows = windows.len(), "Review windows");

            for window in &windows {
                let window_text = truncate_chars(&window.text, MAX_WINDOW_CHARS);

                let extraction = match extractor.extract(&context, &window_text).await {
                    Ok(Some(extraction)) => extraction,
                    Ok(None) => continue,
                    Err(e) => {
                        warn!(tool = %tool.slug, video = %video.youtube_video_id, error = %e, "LLM extraction failed");
                        summary.warnings.push(format!(
                            "LLM extraction failed for {}: {e}",
                            video.youtube_video_id
                        ));
                        continue;
                    }
                };
                if extraction.confidence < config.min_confidence {
                    continue;
                }

                let timestamp = window.start_seconds;
                let record = SnippetRecord {
                    tool_id: mention.tool_id.clone(),
                    video_id: video.id.clone(),
                    sentiment: extraction.sentiment,
                    tags: extraction.topics.clone(),
                    snippet_text: extraction.quote_text.clone(),
                    raw_snippet_text: extraction.quote_text.clone(),
                    video_title: video.title.clone(),
                    channel_name: video
                        .youtube_channels
                        .as_ref()
                        .and_then(|c| c.name.clone()),
                    publish_date: video
                        .published_at
                        .as_deref()
                        .map(|date| date.chars().take(10).collect()),
                    receipt_timestamp_seconds: timestamp,
                    receipt_url: format!(
                        "{}&t={timestamp}s",
                        video
                            .video_url
                            .clone()
                            .unwrap_or_else(|| watch_url(&video.youtube_video_id))
                    ),
                    sponsored_flag: extraction.sponsored_flag,
                    extraction_confidence: extraction.confidence,
                };

                if req.dry_run {
                    match repo
                        .find_near(&record.tool_id, &record.video_id, timestamp)
                        .await?
                    {
                        Some(_) => summary.duplicates_skipped += 1,
                        None => summary.snippets_upserted += 1,
                    }
                    continue;
                }

                match upsert_snippet(&repo, &record).await? {
                    SnippetWrite::Inserted => summary.snippets_upserted += 1,
                    SnippetWrite::Duplicate => summary.duplicates_skipped += 1,
                }
            }
        }

        if !req.dry_run {
            stamp_status(store, &video.id, &now, "ok").await?;
        }
    }

    if summary.videos_scanned > 0 && summary.snippets_upserted == 0 && ok_transcript_count == 0 {
        summary.errors.push(
            "No transcripts available for scoped videos. Review extraction produced zero snippets."
                .to_string(),
        );
    } else if summary.videos_scanned > 0 && summary.snippets_upserted == 0 {
        summary.warnings.push(
            "Transcript fetch succeeded for some videos, but no concrete review snippets passed filters."
                .to_string(),
        );
    }

    Ok(())
}

/// PostgREST query for the scoped video pass. Unprocessed videos only by
/// default; reprocessing drops the `processed_at` filter.
fn scoped_video_query(scoped_video_ids: &[String], max_videos: usize, reprocess: bool) -> Query {
    let mut query = vec![
        (
            "select".to_string(),
            "id,youtube_video_id,title,video_url,published_at,youtube_channels(name)".to_string(),
        ),
        ("id".to_string(), filter::in_list(scoped_video_ids)),
        ("order".to_string(), "published_at.desc".to_string()),
        ("limit".to_string(), max_videos.to_string()),
    ];
    if !reprocess {
        query.push(("processed_at".to_string(), filter::is_null()));
    }
    query
}

/// Outcome of the per-video transcript step. `Missing` and `Failed` map onto
/// the corresponding `transcript_status` stamps; `Fetched` segments still
/// need to be written back to the cache.
#[derive(Debug, PartialEq, Eq)]
enum TranscriptResolution {
    Cached(Vec<CaptionSegment>),
    Fetched(Vec<CaptionSegment>),
    Missing,
    Failed(String),
}

/// Serve segments from the cache when present; otherwise fetch, unless the
/// run is cache-only. The fetch closure is never invoked on a cache hit.
async fn resolve_transcript<F, Fut>(
    cached: Vec<CaptionSegment>,
    cache_only: bool,
    fetch: F,
) -> TranscriptResolution
where
    F: FnOnce() -> Fut,
    Fut: std::future::Future<Output = std::result::Result<Vec<CaptionSegment>, CaptionError>>,
{
    if !cached.is_empty() {
        return TranscriptResolution::Cached(cached);
    }
    if cache_only {
        return TranscriptResolution::Missing;
    }
    match fetch().await {
        Ok(segments) if segments.is_empty() => TranscriptResolution::Missing,
        Ok(segments) => TranscriptResolution::Fetched(segments),
        Err(e) => TranscriptResolution::Failed(e.to_string()),
    }
}

async fn stamp_status(store: &RestStore, video_id: &str, now: &str, status: &str) -> Result<()> {
    let _: Vec<serde_json::Value> = store
        .update(
            "youtube_videos",
            &json!({ "processed_at": now, "transcript_status": status }),
            vec![("id".to_string(), filter::eq(video_id))],
            Returning::Minimal,
        )
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};

    use super::*;

    fn segment(start: u64, text: &str) -> CaptionSegment {
        CaptionSegment {
            start_seconds: start,
            duration_seconds: 4,
            text: text.to_string(),
        }
    }

    fn ids() -> Vec<String> {
        vec!["v1".to_string(), "v2".to_string()]
    }

    #[test]
    fn default_scope_targets_unprocessed_videos() {
        let query = scoped_video_query(&ids(), 50, false);
        assert!(query.contains(&("processed_at".to_string(), "is.null".to_string())));
        assert!(query.contains(&("limit".to_string(), "50".to_string())));
    }

    #[test]
    fn reprocess_scope_drops_processed_filter() {
        let query = scoped_video_query(&ids(), 50, true);
        assert!(!query.iter().any(|(column, _)| column == "processed_at"));
    }

    #[tokio::test]
    async fn cached_segments_short_circuit_the_fetch() {
        let fetched = AtomicBool::new(false);
        let cached = vec![segment(0, "the pricing is twenty dollars")];
        let resolution = resolve_transcript(cached.clone(), false, || {
            fetched.store(true, Ordering::SeqCst);
            async { Ok(vec![]) }
        })
        .await;
        assert_eq!(resolution, TranscriptResolution::Cached(cached));
        assert!(!fetched.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn cache_only_miss_is_missing_without_fetching() {
        let fetched = AtomicBool::new(false);
        let resolution = resolve_transcript(vec![], true, || {
            fetched.store(true, Ordering::SeqCst);
            async { Ok(vec![segment(0, "unused")]) }
        })
        .await;
        assert_eq!(resolution, TranscriptResolution::Missing);
        assert!(!fetched.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn fetch_breakdown_resolves_to_failed() {
        let resolution = resolve_transcript(vec![], false, || async {
            Err(CaptionError::PlayerNoTracks {
                ok_no_tracks: 0,
                attempts: 3,
            })
        })
        .await;
        match resolution {
            TranscriptResolution::Failed(message) => {
                assert!(message.contains("captionTracks"));
            }
            other => panic!("expected Failed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn captionless_video_resolves_to_missing() {
        let resolution = resolve_transcript(vec![], false, || async { Ok(vec![]) }).await;
        assert_eq!(resolution, TranscriptResolution::Missing);
    }

    #[tokio::test]
    async fn fetched_segments_are_flagged_for_caching() {
        let segments = vec![segment(10, "exports are capped at ten minutes")];
        let resolution =
            resolve_transcript(vec![], false, || async { Ok(segments.clone()) }).await;
        assert_eq!(resolution, TranscriptResolution::Fetched(segments));
    }
}
