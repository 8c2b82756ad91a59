//! Maintenance: refresh per-tool review aggregates and deactivate deals not
//! seen within the staleness horizon.

use std::collections::HashMap;

use anyhow::Result;
use chrono::{Duration, SecondsFormat, Utc};
use clipsignal_common::Config;
use clipsignal_store::{filter, RestStore, Returning, ReviewAggregateRow};
use serde_json::json;
use tracing::info;

use super::{filter_tools, load_tools};
use crate::request::PipelineRequest;
use crate::summary::RunSummary;

const DEFAULT_STALE_DAYS: u32 = 60;

pub async fn run(config: &Config, store: &RestStore, req: &PipelineRequest) -> RunSummary {
    let _ = config;
    let mut summary = RunSummary::new("maintenance");
    if let Err(e) = execute(store, req, &mut summary).await {
        summary.errors.push(e.to_string());
    }
    summary.finalize()
}

#[derive(Debug, Default, Clone)]
struct ToolAggregate {
    count: u64,
    max_date: Option<String>,
}

fn aggregate_reviews(rows: &[ReviewAggregateRow]) -> HashMap<String, ToolAggregate> {
    let mut by_tool: HashMap<String, ToolAggregate> = HashMap::new();
    for row in rows {
        let entry = by_tool.entry(row.tool_id.clone()).or_default();
        entry.count += 1;
        if let Some(date) = &row.publish_date {
            if entry.max_date.as_deref().is_none_or(|max| date.as_str() > max) {
                entry.max_date = Some(date.clone());
            }
        }
    }
    by_tool
}

async fn execute(
    store: &RestStore,
    req: &PipelineRequest,
    summary: &mut RunSummary,
) -> Result<()> {
    let stale_days = req
        .stale_days
        .filter(|n| *n > 0)
        .unwrap_or(DEFAULT_STALE_DAYS);
    let stale_cutoff = (Utc::now() - Duration::days(i64::from(stale_days)))
        .to_rfc3339_opts(SecondsFormat::Millis, true);

    let tools = filter_tools(load_tools(store, false).await?, req);
    summary.tools_scanned = tools.len() as u64;

    let reviews: Vec<ReviewAggregateRow> = store
        .select(
            "review_snippets",
            vec![
                ("select".to_string(), "tool_id,publish_date".to_string()),
                ("limit".to_string(), "10000".to_string()),
            ],
        )
        .await?;
    let by_tool = aggregate_reviews(&reviews);

    if req.dry_run {
        return Ok(());
    }

    for tool in &tools {
        let aggregate = by_tool.get(&tool.id).cloned().unwrap_or_default();
        let _: Vec<serde_json::Value> = store
            .update(
                "tools",
                &json!({
                    "review_sources_count": aggregate.count,
                    "last_seen_review_date": aggregate.max_date,
                }),
                vec![("id".to_string(), filter::eq(&tool.id))],
                Returning::Minimal,
            )
            .await?;
    }

    let _: Vec<serde_json::Value> = store
        .update(
            "deals",
            &json!({ "active": false }),
            vec![
                ("active".to_string(), filter::eq("true")),
                ("last_seen".to_string(), filter::lt(&stale_cutoff)),
            ],
            Returning::Minimal,
        )
        .await?;
    info!(stale_days, %stale_cutoff, "Deactivated stale deals");

    Ok(())
}
