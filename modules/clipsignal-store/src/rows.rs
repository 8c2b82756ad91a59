//! Typed row projections for the tables the pipeline reads back.
//!
//! Each struct matches a `select=` column list used by a workflow, so fields
//! that are only selected in some queries default to `None`.

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct ToolRow {
    pub id: String,
    pub slug: String,
    pub name: String,
    #[serde(default)]
    pub website_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChannelKeyRow {
    pub id: String,
    pub youtube_channel_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VideoKeyRow {
    pub id: String,
    pub youtube_video_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VideoRow {
    pub id: String,
    pub youtube_video_id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub video_url: Option<String>,
    #[serde(default)]
    pub published_at: Option<String>,
    #[serde(default)]
    pub channel_id: Option<String>,
}

/// Tool name/slug embedded via the PostgREST `tools(name,slug)` join.
#[derive(Debug, Clone, Deserialize)]
pub struct ToolRef {
    pub name: String,
    pub slug: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MentionRow {
    pub id: String,
    pub tool_id: String,
    pub video_id: String,
    #[serde(default)]
    pub tools: Option<ToolRef>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TranscriptCacheRow {
    pub video_id: String,
    #[serde(default)]
    pub segments_json: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DealKeyRow {
    pub id: String,
    pub offer_text: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SnippetConfidenceRow {
    pub id: String,
    #[serde(default)]
    pub extraction_confidence: Option<f32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReviewAggregateRow {
    pub tool_id: String,
    #[serde(default)]
    pub publish_date: Option<String>,
}

/// Category name embedded via the `categories(name)` join.
#[derive(Debug, Clone, Deserialize)]
pub struct CategoryRef {
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ToolCategoryRow {
    pub tool_id: String,
    #[serde(default)]
    pub categories: Option<CategoryRef>,
}
