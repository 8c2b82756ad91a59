use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;

use crate::types::CaptionTrack;

pub const DEFAULT_CLIENT_VERSION: &str = "2.20260213.01.00";

static CAPTIONS_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?s)"captions":(\{.*?\}),"videoDetails""#).expect("valid regex"));
static INITIAL_PLAYER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)ytInitialPlayerResponse\s*=\s*(\{.*?\});").expect("valid regex"));
static API_KEY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""INNERTUBE_API_KEY":"([^"]+)""#).expect("valid regex"));
static CLIENT_VERSION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""INNERTUBE_CLIENT_VERSION":"([^"]+)""#).expect("valid regex"));
static VISITOR_DATA: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""VISITOR_DATA":"([^"]+)""#).expect("valid regex"));
static TRANSCRIPT_PARAMS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#""getTranscriptEndpoint":\{"params":"([^"]+)"\}"#).expect("valid regex")
});
static TRANSCRIPT_CONTINUATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?s)"panelIdentifier":"engagement-panel-searchable-transcript".*?"continuationCommand":\{"token":"([^"]+)"\}"#,
    )
    .expect("valid regex")
});

/// Everything the rest of the caption chain can mine out of a watch page.
#[derive(Debug, Default)]
pub struct WatchPageContext {
    pub caption_tracks: Vec<CaptionTrack>,
    pub api_key: Option<String>,
    pub client_version: String,
    pub visitor_data: Option<String>,
    pub transcript_params: Option<String>,
    pub transcript_continuation: Option<String>,
}

/// Pull caption tracks out of a `captions` JSON object.
pub fn parse_caption_tracks(captions: &serde_json::Value) -> Vec<CaptionTrack> {
    let tracks = captions
        .get("playerCaptionsTracklistRenderer")
        .and_then(|r| r.get("captionTracks"))
        .and_then(|t| t.as_array());

    let Some(tracks) = tracks else {
        return Vec::new();
    };

    tracks
        .iter()
        .filter_map(|track| {
            let base_url = track.get("baseUrl")?.as_str()?;
            if base_url.is_empty() {
                return None;
            }
            Some(CaptionTrack {
                base_url: base_url.to_string(),
                language_code: track
                    .get("languageCode")
                    .and_then(|v| v.as_str())
                    .map(String::from),
                kind: track.get("kind").and_then(|v| v.as_str()).map(String::from),
            })
        })
        .collect()
}

pub fn extract_caption_tracks(html: &str) -> Vec<CaptionTrack> {
    if let Some(caps) = INITIAL_PLAYER.captures(html) {
        if let Ok(payload) = serde_json::from_str::<serde_json::Value>(&caps[1]) {
            if let Some(captions) = payload.get("captions") {
                return parse_caption_tracks(captions);
            }
        }
    }

    if let Some(caps) = CAPTIONS_BLOCK.captures(html) {
        if let Ok(parsed) = serde_json::from_str::<serde_json::Value>(&caps[1]) {
            let tracks = parse_caption_tracks(&parsed);
            if !tracks.is_empty() {
                return tracks;
            }
        }
    }

    Vec::new()
}

fn capture_one(re: &Regex, html: &str) -> Option<String> {
    re.captures(html).map(|c| c[1].to_string())
}

pub fn parse_watch_page(html: &str) -> WatchPageContext {
    WatchPageContext {
        caption_tracks: extract_caption_tracks(html),
        api_key: capture_one(&API_KEY, html),
        client_version: capture_one(&CLIENT_VERSION, html)
            .unwrap_or_else(|| DEFAULT_CLIENT_VERSION.to_string()),
        visitor_data: capture_one(&VISITOR_DATA, html),
        transcript_params: capture_one(&TRANSCRIPT_PARAMS, html),
        transcript_continuation: capture_one(&TRANSCRIPT_CONTINUATION, html),
    }
}

pub async fn fetch_watch_page_context(
    http: &reqwest::Client,
    video_id: &str,
    timeout: Duration,
) -> Option<WatchPageContext> {
    let url = format!(
        "https://www.youtube.com/watch?v={}",
        urlencoding_encode(video_id)
    );
    let response = http
        .get(&url)
        .header("User-Agent", "Mozilla/5.0")
        .header("Accept-Language", "en-US,en;q=0.9")
        .header(
            "Accept",
            "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
        )
        .timeout(timeout)
        .send()
        .await
        .ok()?;
    if !response.status().is_success() {
        return None;
    }

    let html = response.text().await.ok()?;
    Some(parse_watch_page(&html))
}

fn urlencoding_encode(input: &str) -> String {
    url::form_urlencoded::byte_serialize(input.as_bytes()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_tracks_from_initial_player_response() {
        let html = r#"<script>var ytInitialPlayerResponse = {"captions":{"playerCaptionsTracklistRenderer":{"captionTracks":[{"baseUrl":"https://example.com/tt?v=abc","languageCode":"en","kind":"asr"}]}},"videoDetails":{"videoId":"abc"}};</script>"#;
        let tracks = extract_caption_tracks(html);
        assert_eq!(tracks.len(), 1);
        assert_eq!(tracks[0].language_code.as_deref(), Some("en"));
        assert_eq!(tracks[0].kind.as_deref(), Some("asr"));
    }

    #[test]
    fn test_extract_tracks_skips_empty_base_url() {
        let captions = serde_json::json!({
            "playerCaptionsTracklistRenderer": {
                "captionTracks": [
                    {"baseUrl": "", "languageCode": "en"},
                    {"baseUrl": "https://example.com/tt", "languageCode": "de"}
                ]
            }
        });
        let tracks = parse_caption_tracks(&captions);
        assert_eq!(tracks.len(), 1);
        assert_eq!(tracks[0].language_code.as_deref(), Some("de"));
    }

    #[test]
    fn test_parse_watch_page_innertube_fields() {
        let html = r#""INNERTUBE_API_KEY":"test-key","INNERTUBE_CLIENT_VERSION":"2.20260101.00.00","VISITOR_DATA":"visitor123""#;
        let ctx = parse_watch_page(html);
        assert_eq!(ctx.api_key.as_deref(), Some("test-key"));
        assert_eq!(ctx.client_version, "2.20260101.00.00");
        assert_eq!(ctx.visitor_data.as_deref(), Some("visitor123"));
    }

    #[test]
    fn test_parse_watch_page_defaults_client_version() {
        let ctx = parse_watch_page("<html></html>");
        assert_eq!(ctx.client_version, DEFAULT_CLIENT_VERSION);
        assert!(ctx.api_key.is_none());
        assert!(ctx.caption_tracks.is_empty());
    }

    #[test]
    fn test_parse_transcript_endpoint_hints() {
        let html = r#""getTranscriptEndpoint":{"params":"abc123"} ... "panelIdentifier":"engagement-panel-searchable-transcript","x":1,"continuationCommand":{"token":"tok456"}"#;
        let ctx = parse_watch_page(html);
        assert_eq!(ctx.transcript_params.as_deref(), Some("abc123"));
        assert_eq!(ctx.transcript_continuation.as_deref(), Some("tok456"));
    }
}
