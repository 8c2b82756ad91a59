//! The four pipeline tasks. Each `run` returns a [`RunSummary`]; failures
//! land in `summary.errors` rather than aborting the process, matching how
//! the tasks behave when driven by a scheduler.

pub mod discover;
pub mod extract_deals;
pub mod extract_reviews;
pub mod maintenance;

use chrono::{SecondsFormat, Utc};
use clipsignal_store::{filter, MentionRow, RestStore, ToolRow};

use crate::request::PipelineRequest;

pub(crate) fn now_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub(crate) fn watch_url(youtube_video_id: &str) -> String {
    format!("https://www.youtube.com/watch?v={youtube_video_id}")
}

pub(crate) async fn load_tools(
    store: &RestStore,
    include_website: bool,
) -> Result<Vec<ToolRow>, clipsignal_store::StoreError> {
    let select = if include_website {
        "id,slug,name,website_url"
    } else {
        "id,slug,name"
    };
    store
        .select(
            "tools",
            vec![
                ("select".to_string(), select.to_string()),
                ("order".to_string(), "name.asc".to_string()),
                ("limit".to_string(), "1000".to_string()),
            ],
        )
        .await
}

/// Narrow the tool list to the requested ids/slugs (case-insensitive).
/// An empty request keeps everything.
pub(crate) fn filter_tools(tools: Vec<ToolRow>, req: &PipelineRequest) -> Vec<ToolRow> {
    if req.tool_ids.is_empty() {
        return tools;
    }
    let wanted: Vec<String> = req.tool_ids.iter().map(|v| v.to_lowercase()).collect();
    tools
        .into_iter()
        .filter(|tool| {
            wanted.contains(&tool.id.to_lowercase()) || wanted.contains(&tool.slug.to_lowercase())
        })
        .collect()
}

pub(crate) async fn scoped_mentions(
    store: &RestStore,
    tool_ids: &[String],
) -> Result<Vec<MentionRow>, clipsignal_store::StoreError> {
    store
        .select(
            "video_mentions",
            vec![
                ("select".to_string(), "id,tool_id,video_id".to_string()),
                ("tool_id".to_string(), filter::in_list(tool_ids)),
                ("limit".to_string(), "10000".to_string()),
            ],
        )
        .await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tool(id: &str, slug: &str) -> ToolRow {
        ToolRow {
            id: id.to_string(),
            slug: slug.to_string(),
            name: slug.to_string(),
            website_url: None,
        }
    }

    #[test]
    fn filter_tools_matches_id_or_slug_case_insensitive() {
        let tools = vec![tool("T1", "invideo-ai"), tool("T2", "heygen")];
        let req = PipelineRequest {
            tool_ids: vec!["INVIDEO-AI".to_string()],
            ..Default::default()
        };
        let filtered = filter_tools(tools.clone(), &req);
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].id, "T1");

        let req = PipelineRequest {
            tool_ids: vec!["t2".to_string()],
            ..Default::default()
        };
        let filtered = filter_tools(tools.clone(), &req);
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].slug, "heygen");

        let filtered = filter_tools(tools, &PipelineRequest::default());
        assert_eq!(filtered.len(), 2);
    }
}
