//! Caption retrieval chain. YouTube exposes no single reliable caption
//! endpoint, so this walks a sequence of increasingly desperate paths:
//! watch-page tracks, player API tracks, the legacy timedtext endpoint,
//! and finally the get_transcript RPC.

pub mod parse;
pub mod player;
pub mod timedtext;
pub mod track;
pub mod transcript_rpc;
pub mod watch_page;

use std::time::Duration;

use tracing::debug;

use crate::error::CaptionError;
use crate::types::CaptionSegment;

use player::{discover_tracks_via_player, FALLBACK_INNERTUBE_API_KEYS};
use timedtext::fetch_timedtext_legacy;
use track::fetch_via_caption_tracks;
use transcript_rpc::fetch_via_transcript_rpc;
use watch_page::fetch_watch_page_context;

/// Fetch the full caption transcript for a video.
///
/// Returns an empty vec when the video genuinely appears to have no
/// captions; returns a [`CaptionError`] when retrieval broke down in a way
/// that should not be cached as a definite absence.
pub async fn fetch_transcript_segments(
    http: &reqwest::Client,
    video_id: &str,
    timeout: Duration,
) -> Result<Vec<CaptionSegment>, CaptionError> {
    let context = fetch_watch_page_context(http, video_id, timeout).await;

    if let Some(ctx) = &context {
        let segments = fetch_via_caption_tracks(http, video_id, &ctx.caption_tracks, timeout).await;
        if !segments.is_empty() {
            debug!(video_id, count = segments.len(), "Transcript via watch-page tracks");
            return Ok(segments);
        }
    }

    let mut api_keys: Vec<String> = Vec::new();
    if let Some(key) = context.as_ref().and_then(|c| c.api_key.clone()) {
        api_keys.push(key);
    }
    for key in FALLBACK_INNERTUBE_API_KEYS {
        if !api_keys.iter().any(|k| k == key) {
            api_keys.push((*key).to_string());
        }
    }

    let discovery = discover_tracks_via_player(
        http,
        &api_keys,
        context.as_ref().and_then(|c| c.visitor_data.as_deref()),
        video_id,
        timeout,
    )
    .await;

    if !discovery.tracks.is_empty() {
        let segments = fetch_via_caption_tracks(http, video_id, &discovery.tracks, timeout).await;
        if !segments.is_empty() {
            debug!(video_id, count = segments.len(), "Transcript via player API tracks");
            return Ok(segments);
        }
    }

    let segments = fetch_timedtext_legacy(http, video_id, timeout).await;
    if !segments.is_empty() {
        debug!(video_id, count = segments.len(), "Transcript via legacy timedtext");
        return Ok(segments);
    }

    if let Some(ctx) = &context {
        let segments = fetch_via_transcript_rpc(http, ctx, video_id, timeout).await;
        if !segments.is_empty() {
            debug!(video_id, count = segments.len(), "Transcript via get_transcript RPC");
            return Ok(segments);
        }
    }

    let watch_tracks = context.as_ref().map_or(0, |c| c.caption_tracks.len());

    if discovery.tracks.is_empty()
        && discovery.attempts > 0
        && (discovery.network_errors > 0 || !discovery.non_ok_statuses.is_empty())
        && discovery.ok_no_tracks == 0
    {
        let mut statuses: Vec<u16> = discovery.non_ok_statuses.clone();
        statuses.sort_unstable();
        statuses.dedup();
        let statuses = if statuses.is_empty() {
            "none".to_string()
        } else {
            statuses
                .iter()
                .map(|s| s.to_string())
                .collect::<Vec<_>>()
                .join(",")
        };
        return Err(CaptionError::DiscoveryFailed {
            attempts: discovery.attempts,
            network_errors: discovery.network_errors,
            statuses,
        });
    }

    if discovery.tracks.is_empty() && discovery.ok_no_tracks > 0 && watch_tracks == 0 {
        return Err(CaptionError::PlayerNoTracks {
            ok_no_tracks: discovery.ok_no_tracks,
            attempts: discovery.attempts,
        });
    }

    if watch_tracks > 0 || !discovery.tracks.is_empty() {
        return Err(CaptionError::EmptyTranscript {
            watch_tracks,
            player_tracks: discovery.tracks.len(),
        });
    }

    Ok(Vec::new())
}
