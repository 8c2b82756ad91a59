use std::time::Duration;

use crate::types::{CaptionSegment, CaptionTrack};

use super::parse::parse_transcript_body;

/// Build the URL variants to try for a single caption track. Tracks whose
/// base URL already pins a format are fetched as-is.
pub fn track_url_variants(base_url: &str) -> Vec<String> {
    if base_url.contains("fmt=") {
        vec![base_url.to_string()]
    } else {
        vec![
            format!("{base_url}&fmt=json3"),
            format!("{base_url}&fmt=srv3"),
            base_url.to_string(),
        ]
    }
}

/// Order tracks English-first; within each group the advertised order holds.
pub fn order_tracks(tracks: &[CaptionTrack]) -> Vec<&CaptionTrack> {
    let is_english =
        |t: &CaptionTrack| t.language_code.as_deref().unwrap_or("").starts_with("en");
    tracks
        .iter()
        .filter(|t| is_english(t))
        .chain(tracks.iter().filter(|t| !is_english(t)))
        .collect()
}

async fn fetch_track_transcript(
    http: &reqwest::Client,
    base_url: &str,
    video_id: &str,
    timeout: Duration,
) -> Vec<CaptionSegment> {
    for url in track_url_variants(base_url) {
        let response = http
            .get(&url)
            .header("User-Agent", "Mozilla/5.0")
            .header("Accept-Language", "en-US,en;q=0.9")
            .header(
                "Referer",
                format!("https://www.youtube.com/watch?v={video_id}"),
            )
            .timeout(timeout)
            .send()
            .await;

        let Ok(response) = response else { continue };
        if !response.status().is_success() {
            continue;
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(String::from);
        let Ok(text) = response.text().await else {
            continue;
        };

        let segments = parse_transcript_body(&text, content_type.as_deref());
        if !segments.is_empty() {
            return segments;
        }
    }

    Vec::new()
}

/// Try each advertised track until one yields segments.
pub async fn fetch_via_caption_tracks(
    http: &reqwest::Client,
    video_id: &str,
    tracks: &[CaptionTrack],
    timeout: Duration,
) -> Vec<CaptionSegment> {
    for track in order_tracks(tracks) {
        let segments = fetch_track_transcript(http, &track.base_url, video_id, timeout).await;
        if !segments.is_empty() {
            return segments;
        }
    }
    Vec::new()
}
