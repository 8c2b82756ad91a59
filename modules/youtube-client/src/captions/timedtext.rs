use std::time::Duration;

use url::Url;

use crate::types::CaptionSegment;

use super::parse::parse_transcript_body;

const VARIANTS: &[(Option<&str>, Option<&str>, &str)] = &[
    (Some("en"), Some("asr"), "json3"),
    (Some("en"), None, "json3"),
    (None, Some("asr"), "json3"),
    (None, None, "json3"),
    (Some("en"), None, "srv3"),
];

/// Last-resort probe of the unauthenticated legacy timedtext endpoint.
pub async fn fetch_timedtext_legacy(
    http: &reqwest::Client,
    video_id: &str,
    timeout: Duration,
) -> Vec<CaptionSegment> {
    for (lang, kind, fmt) in VARIANTS {
        let mut url = match Url::parse("https://www.youtube.com/api/timedtext") {
            Ok(u) => u,
            Err(_) => return Vec::new(),
        };
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("v", video_id);
            if let Some(lang) = lang {
                query.append_pair("lang", lang);
            }
            if let Some(kind) = kind {
                query.append_pair("kind", kind);
            }
            query.append_pair("fmt", fmt);
        }

        let response = http
            .get(url)
            .header("User-Agent", "Mozilla/5.0")
            .header("Accept-Language", "en-US,en;q=0.9")
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
