//! Deal extraction: walk unparsed video descriptions for each mentioned
//! tool, run the deal extractor, and dedup-upsert the candidates.

use std::collections::HashMap;

use anyhow::Result;
use clipsignal_common::{Config, ToolContext};
use clipsignal_store::{filter, Query, RestStore, Returning, ToolCategoryRow, ToolRow, VideoRow};
use serde_json::json;
use tracing::debug;

use super::{filter_tools, load_tools, now_iso, scoped_mentions, watch_url};
use crate::deals::extract_deals;
use crate::request::PipelineRequest;
use crate::summary::RunSummary;
use crate::upsert::{upsert_deal, DealRecord, RestDealRepo};

pub async fn run(config: &Config, store: &RestStore, req: &PipelineRequest) -> RunSummary {
    let _ = config;
    let mut summary = RunSummary::new("extract-deals");
    if let Err(e) = execute(store, req, &mut summary).await {
        summary.errors.push(e.to_string());
    }
    summary.finalize()
}

async fn execute(
    store: &RestStore,
    req: &PipelineRequest,
    summary: &mut RunSummary,
) -> Result<()> {
    let tools = filter_tools(load_tools(store, true).await?, req);
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

    let videos: Vec<VideoRow> = store
        .select("youtube_videos", unparsed_video_query(&scoped_video_ids))
        .await?;
    if videos.is_empty() {
        summary
            .warnings
            .push("No scoped videos found with deals_parsed_at IS NULL.".to_string());
        return Ok(());
    }

    let mut mentions_by_video: HashMap<&str, Vec<&str>> = HashMap::new();
    for mention in &mentions {
        if !tool_by_id.contains_key(mention.tool_id.as_str()) {
            continue;
        }
        mentions_by_video
            .entry(mention.video_id.as_str())
            .or_default()
            .push(mention.tool_id.as_str());
    }

    let category_rows: Vec<ToolCategoryRow> = store
        .select(
            "tool_categories",
            vec![
                ("select".to_string(), "tool_id,categories(name)".to_string()),
                ("limit".to_string(), "10000".to_string()),
            ],
        )
        .await?;
    let mut categories_by_tool: HashMap<&str, Vec<String>> = HashMap::new();
    for row in &category_rows {
        let Some(name) = row.categories.as_ref().and_then(|c| c.name.clone()) else {
            continue;
        };
        let list = categories_by_tool.entry(row.tool_id.as_str()).or_default();
        if !list.contains(&name) {
            list.push(name);
        }
    }

    let now = now_iso();
    let repo = RestDealRepo::new(store);
    for video in &videos {
        let tool_ids = mentions_by_video
            .get(video.id.as_str())
            .cloned()
            .unwrap_or_default();
        if tool_ids.is_empty() {
            if !req.dry_run {
                stamp_parsed(store, &video.id, &now).await?;
            }
            continue;
        }

        summary.videos_scanned += 1;
        for tool_id in tool_ids {
            let Some(tool) = tool_by_id.get(tool_id) else {
                continue;
            };
            let context = ToolContext {
                tool_name: tool.name.clone(),
                tool_slug: tool.slug.clone(),
                tool_website_url: tool.website_url.clone(),
            };
            let candidates = extract_deals(video.description.as_deref().unwrap_or(""), &context);
            if candidates.is_empty() {
                continue;
            }
            debug!(tool = %tool.slug, video = %video.youtube_video_id, count = candidates.len(), "Deal candidates");

            let category = categories_by_tool.get(tool_id).cloned().unwrap_or_default();
            for candidate in candidates {
                if req.dry_run {
                    summary.deals_upserted += 1;
                    continue;
                }

                let record = DealRecord {
                    tool_id: tool_id.to_string(),
                    video_id: video.id.clone(),
                    offer_text: candidate.offer_text.clone(),
                    offer_type: candidate.offer_type,
                    code: candidate.code.clone(),
                    link_url: candidate.link_url.clone(),
                    receipt_url: video
                        .video_url
                        .clone()
                        .unwrap_or_else(|| watch_url(&video.youtube_video_id)),
                    receipt_timestamp_seconds: None,
                    active: true,
                    last_seen: now.clone(),
                    source: "description".to_string(),
                    category: category.clone(),
                };
                upsert_deal(&repo, &candidate, &record).await?;
                summary.deals_upserted += 1;
            }
        }

        if !req.dry_run {
            stamp_parsed(store, &video.id, &now).await?;
        }
    }

    Ok(())
}

/// PostgREST query for the deal pass. Descriptions are parsed once, so only
/// videos without a `deals_parsed_at` stamp are in scope.
fn unparsed_video_query(scoped_video_ids: &[String]) -> Query {
    vec![
        (
            "select".to_string(),
            "id,youtube_video_id,title,description,video_url,published_at".to_string(),
        ),
        ("id".to_string(), filter::in_list(scoped_video_ids)),
        ("deals_parsed_at".to_string(), filter::is_null()),
        ("order".to_string(), "published_at.desc".to_string()),
        ("limit".to_string(), "300".to_string()),
    ]
}

async fn stamp_parsed(store: &RestStore, video_id: &str, now: &str) -> Result<()> {
    let _: Vec<serde_json::Value> = store
        .update(
            "youtube_videos",
            &json!({ "deals_parsed_at": now }),
            vec![("id".to_string(), filter::eq(video_id))],
            Returning::Minimal,
        )
        .await?;
    Ok(())
}
