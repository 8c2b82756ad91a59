use std::time::Duration;

use serde_json::json;

use crate::types::CaptionSegment;

use super::parse::normalize_text;
use super::watch_page::WatchPageContext;

/// Call `youtubei/v1/get_transcript` using hints mined from the watch page.
/// Needs either transcript params or a panel continuation token.
pub async fn fetch_via_transcript_rpc(
    http: &reqwest::Client,
    context: &WatchPageContext,
    video_id: &str,
    timeout: Duration,
) -> Vec<CaptionSegment> {
    let Some(api_key) = context.api_key.as_deref() else {
        return Vec::new();
    };

    let mut client = json!({
        "clientName": "WEB",
        "clientVersion": context.client_version,
    });
    if let Some(visitor) = context.visitor_data.as_deref() {
        client["visitorData"] = json!(visitor);
    }

    let mut body = json!({ "context": { "client": client } });
    if let Some(params) = context.transcript_params.as_deref() {
        body["params"] = json!(params);
    } else if let Some(continuation) = context.transcript_continuation.as_deref() {
        body["continuation"] = json!(continuation);
    } else {
        return Vec::new();
    }

    let endpoint = format!(
        "https://www.youtube.com/youtubei/v1/get_transcript?prettyPrint=false&key={api_key}"
    );

    let mut request = http
        .post(&endpoint)
        .header("Content-Type", "application/json")
        .header("User-Agent", "Mozilla/5.0")
        .header("X-YouTube-Client-Name", "1")
        .header("X-YouTube-Client-Version", context.client_version.as_str())
        .header("Origin", "https://www.youtube.com")
        .header(
            "Referer",
            format!("https://www.youtube.com/watch?v={video_id}"),
        )
        .timeout(timeout);
    if let Some(visitor) = context.visitor_data.as_deref() {
        request = request.header("X-Goog-Visitor-Id", visitor);
    }

    let Ok(response) = request.json(&body).send().await else {
        return Vec::new();
    };
    if !response.status().is_success() {
        return Vec::new();
    }
    let Ok(payload) = response.json::<serde_json::Value>().await else {
        return Vec::new();
    };

    let mut out = Vec::new();
    collect_segments(&payload, &mut out);
    out
}

/// Walk the response tree for `transcriptSegmentRenderer` nodes; the
/// surrounding structure varies across clients and experiments.
pub fn collect_segments(node: &serde_json::Value, out: &mut Vec<CaptionSegment>) {
    match node {
        serde_json::Value::Array(items) => {
            for item in items {
                collect_segments(item, out);
            }
        }
        serde_json::Value::Object(map) => {
            if let Some(renderer) = map.get("transcriptSegmentRenderer") {
                if let Some(segment) = parse_segment_renderer(renderer) {
                    out.push(segment);
                }
            }
            for value in map.values() {
                collect_segments(value, out);
            }
        }
        _ => {}
    }
}

fn parse_ms(value: Option<&serde_json::Value>) -> Option<i64> {
    match value {
        Some(serde_json::Value::String(s)) => s.parse().ok(),
        Some(serde_json::Value::Number(n)) => n.as_i64(),
        _ => Some(0),
    }
}

fn parse_segment_renderer(renderer: &serde_json::Value) -> Option<CaptionSegment> {
    let start_ms = parse_ms(renderer.get("startMs"))?;
    let end_ms = parse_ms(renderer.get("endMs"))?;

    let text: String = renderer
        .get("snippet")
        .and_then(|s| s.get("runs"))
        .and_then(|r| r.as_array())
        .map(|runs| {
            runs.iter()
                .filter_map(|run| run.get("text").and_then(|t| t.as_str()))
                .collect()
        })
        .unwrap_or_default();
    let text = normalize_text(&text);
    if text.is_empty() {
        return None;
    }

    let duration_ms = (end_ms - start_ms).max(1000);
    Some(CaptionSegment {
        start_seconds: (start_ms.max(0) / 1000) as u64,
        duration_seconds: ((duration_ms / 1000).max(1)) as u64,
        text,
    })
}
