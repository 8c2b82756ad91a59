//! Video discovery: search YouTube for "{tool} review" / "{tool} tutorial",
//! keep videos whose metadata actually names the tool, and upsert
//! channel/video/mention rows.

use std::collections::HashSet;

use anyhow::Result;
use clipsignal_common::Config;
use clipsignal_store::{ChannelKeyRow, RestStore, Returning, ToolRow, VideoKeyRow};
use serde_json::json;
use tracing::info;
use youtube_client::{mentions_tool_in_metadata, YouTubeClient};

use super::{filter_tools, load_tools, watch_url};
use crate::request::PipelineRequest;
use crate::summary::RunSummary;

pub async fn run(config: &Config, store: &RestStore, req: &PipelineRequest) -> RunSummary {
    let mut summary = RunSummary::new("discover");
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
    let youtube = YouTubeClient::new(config.require_youtube().to_string());

    let mut tools = filter_tools(load_tools(store, false).await?, req);
    let tool_limit = req
        .limit_tools
        .filter(|n| *n > 0)
        .map_or(tools.len(), |n| n as usize);
    tools.truncate(tool_limit);
    summary.tools_scanned = tools.len() as u64;

    let max_videos = req
        .limit_videos_per_tool
        .filter(|n| *n > 0)
        .unwrap_or(config.default_video_limit);

    for tool in &tools {
        if let Err(e) = discover_tool(&youtube, store, tool, max_videos, req.dry_run, summary).await
        {
            summary.errors.push(format!("Tool {}: {e}", tool.slug));
        }
    }

    Ok(())
}

async fn discover_tool(
    youtube: &YouTubeClient,
    store: &RestStore,
    tool: &ToolRow,
    max_videos: u32,
    dry_run: bool,
    summary: &mut RunSummary,
) -> Result<()> {
    let search_terms = [
        format!("{} review", tool.name),
        format!("{} tutorial", tool.name),
    ];

    let mut seen: HashSet<String> = HashSet::new();
    let mut candidate_ids: Vec<String> = Vec::new();
    for term in &search_terms {
        for item in youtube.search_videos(term, max_videos).await? {
            if seen.insert(item.video_id.clone()) {
                candidate_ids.push(item.video_id);
            }
        }
    }
    candidate_ids.truncate(max_videos as usize);

    let details = youtube.video_details(&candidate_ids).await?;
    info!(tool = %tool.slug, candidates = details.len(), "Discovery candidates fetched");

    for detail in details {
        summary.videos_scanned += 1;
        if !mentions_tool_in_metadata(&tool.name, &detail.title, &detail.description) {
            continue;
        }

        if dry_run {
            summary.videos_upserted += 1;
            summary.mentions_upserted += 1;
            continue;
        }

        let channel_name = if detail.channel_title.is_empty() {
            "Unknown channel"
        } else {
            detail.channel_title.as_str()
        };
        let channel_rows: Vec<ChannelKeyRow> = store
            .upsert(
                "youtube_channels",
                &json!({
                    "youtube_channel_id": detail.channel_id,
                    "name": channel_name,
                    "handle": null,
                    "channel_url": format!("https://www.youtube.com/channel/{}", detail.channel_id),
                }),
                "youtube_channel_id",
                Returning::Representation,
            )
            .await?;
        let channel_id = channel_rows.first().map(|row| row.id.clone());

        let video_rows: Vec<VideoKeyRow> = store
            .upsert(
                "youtube_videos",
                &json!({
                    "youtube_video_id": detail.video_id,
                    "channel_id": channel_id,
                    "title": detail.title,
                    "description": detail.description,
                    "video_url": watch_url(&detail.video_id),
                    "published_at": detail.published_at,
                }),
                "youtube_video_id",
                Returning::Representation,
            )
            .await?;
        let Some(video_id) = video_rows.first().map(|row| row.id.clone()) else {
            continue;
        };
        summary.videos_upserted += 1;

        let _: Vec<serde_json::Value> = store
            .upsert(
                "video_mentions",
                &json!({
                    "tool_id": tool.id,
                    "video_id": video_id,
                    "mention_count": 1,
                    "first_mentioned_second": 0,
                    "last_mentioned_second": 0,
                    "extraction_confidence": 0.5,
                }),
                "tool_id,video_id,first_mentioned_second",
                Returning::Minimal,
            )
            .await?;
        summary.mentions_upserted += 1;
    }

    Ok(())
}
