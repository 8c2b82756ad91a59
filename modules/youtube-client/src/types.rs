use serde::{Deserialize, Serialize};

/// One result row from YouTube search.list.
#[derive(Debug, Clone)]
pub struct SearchItem {
    pub video_id: String,
    pub title: String,
    pub description: String,
}

/// Snippet-level metadata from videos.list.
#[derive(Debug, Clone)]
pub struct VideoDetail {
    pub video_id: String,
    pub title: String,
    pub description: String,
    pub channel_id: String,
    pub channel_title: String,
    pub published_at: String,
}

/// A single timed caption segment, timestamps floored to whole seconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptionSegment {
    pub start_seconds: u64,
    pub duration_seconds: u64,
    pub text: String,
}

/// A caption track advertised by the watch page or the player API.
#[derive(Debug, Clone)]
pub struct CaptionTrack {
    pub base_url: String,
    pub language_code: Option<String>,
    pub kind: Option<String>,
}

// Wire shapes for the Data API responses. Only the fields we read.

#[derive(Debug, Deserialize)]
pub(crate) struct SearchApiResponse {
    #[serde(default)]
    pub items: Vec<SearchApiItem>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SearchApiItem {
    pub id: Option<SearchApiId>,
    pub snippet: Option<ApiSnippet>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SearchApiId {
    #[serde(rename = "videoId")]
    pub video_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct VideosApiResponse {
    #[serde(default)]
    pub items: Vec<VideosApiItem>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct VideosApiItem {
    pub id: Option<String>,
    pub snippet: Option<ApiSnippet>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ApiSnippet {
    pub title: Option<String>,
    pub description: Option<String>,
    #[serde(rename = "channelId")]
    pub channel_id: Option<String>,
    #[serde(rename = "channelTitle")]
    pub channel_title: Option<String>,
    #[serde(rename = "publishedAt")]
    pub published_at: Option<String>,
}
