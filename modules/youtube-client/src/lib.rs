pub mod captions;
pub mod error;
pub mod types;

pub use captions::fetch_transcript_segments;
pub use error::{CaptionError, Result, YouTubeError};
pub use types::{CaptionSegment, CaptionTrack, SearchItem, VideoDetail};

use chrono::Utc;
use url::Url;

use types::{SearchApiResponse, VideosApiResponse};

const DATA_API_URL: &str = "https://www.googleapis.com/youtube/v3";

/// Chunk size imposed by videos.list.
const VIDEOS_LIST_MAX_IDS: usize = 50;

pub struct YouTubeClient {
    http: reqwest::Client,
    api_key: String,
}

impl YouTubeClient {
    pub fn new(api_key: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key,
        }
    }

    /// Shared HTTP client, reused by the caption chain.
    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }

    pub async fn search_videos(&self, query: &str, max_results: u32) -> Result<Vec<SearchItem>> {
        let mut url = Url::parse(&format!("{DATA_API_URL}/search"))
            .map_err(|e| YouTubeError::Parse(e.to_string()))?;
        url.query_pairs_mut()
            .append_pair("part", "snippet")
            .append_pair("type", "video")
            .append_pair("q", query)
            .append_pair("maxResults", &max_results.to_string())
            .append_pair("key", &self.api_key);

        let response = self.http.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(YouTubeError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let payload: SearchApiResponse = response.json().await?;
        Ok(payload
            .items
            .into_iter()
            .filter_map(|item| {
                let video_id = item.id.and_then(|id| id.video_id)?;
                if video_id.is_empty() {
                    return None;
                }
                let snippet = item.snippet.unwrap_or_default();
                Some(SearchItem {
                    video_id,
                    title: snippet.title.unwrap_or_default(),
                    description: snippet.description.unwrap_or_default(),
                })
            })
            .collect())
    }

    pub async fn video_details(&self, video_ids: &[String]) -> Result<Vec<VideoDetail>> {
        let mut out = Vec::new();

        for chunk in video_ids.chunks(VIDEOS_LIST_MAX_IDS) {
            let mut url = Url::parse(&format!("{DATA_API_URL}/videos"))
                .map_err(|e| YouTubeError::Parse(e.to_string()))?;
            url.query_pairs_mut()
                .append_pair("part", "snippet")
                .append_pair("id", &chunk.join(","))
                .append_pair("maxResults", &chunk.len().to_string())
                .append_pair("key", &self.api_key);

            let response = self.http.get(url).send().await?;
            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(YouTubeError::Api {
                    status: status.as_u16(),
                    message: body,
                });
            }

            let payload: VideosApiResponse = response.json().await?;
            for item in payload.items {
                let Some(video_id) = item.id else { continue };
                let snippet = item.snippet.unwrap_or_default();
                out.push(VideoDetail {
                    video_id,
                    title: snippet.title.unwrap_or_default(),
                    description: snippet.description.unwrap_or_default(),
                    channel_id: snippet.channel_id.unwrap_or_default(),
                    channel_title: snippet
                        .channel_title
                        .unwrap_or_else(|| "Unknown channel".to_string()),
                    published_at: snippet
                        .published_at
                        .unwrap_or_else(|| Utc::now().to_rfc3339()),
                });
            }
        }

        Ok(out)
    }
}

/// Case-insensitive substring check of a tool name against video metadata.
pub fn mentions_tool_in_metadata(tool_name: &str, title: &str, description: &str) -> bool {
    let needle = tool_name.to_lowercase();
    let needle = needle.trim();
    if needle.is_empty() {
        return false;
    }
    let haystack = format!("{title} {description}").to_lowercase();
    haystack.contains(needle)
}
