//! Dedup-aware persistence for deals and review snippets.
//!
//! The repos are thin REST accessors; the coordinators own the dedup
//! decisions so they can be tested against in-memory fakes.

use anyhow::Result;
use async_trait::async_trait;
use clipsignal_common::heuristics::{normalize_for_match, normalize_whitespace};
use clipsignal_common::{DealCandidate, OfferType, ReviewTag, Sentiment};
use clipsignal_store::{filter, DealKeyRow, RestStore, Returning, SnippetConfidenceRow};
use serde::Serialize;
use serde_json::json;

/// Full column set written for a deal row.
#[derive(Debug, Clone, Serialize)]
pub struct DealRecord {
    pub tool_id: String,
    pub video_id: String,
    pub offer_text: String,
    pub offer_type: OfferType,
    pub code: Option<String>,
    pub link_url: Option<String>,
    pub receipt_url: String,
    pub receipt_timestamp_seconds: Option<u64>,
    pub active: bool,
    pub last_seen: String,
    pub source: String,
    pub category: Vec<String>,
}

/// Full column set written for a review snippet row.
#[derive(Debug, Clone, Serialize)]
pub struct SnippetRecord {
    pub tool_id: String,
    pub video_id: String,
    pub sentiment: Sentiment,
    pub tags: Vec<ReviewTag>,
    pub snippet_text: String,
    pub raw_snippet_text: String,
    pub video_title: String,
    pub channel_name: Option<String>,
    pub publish_date: Option<String>,
    pub receipt_timestamp_seconds: u64,
    pub receipt_url: String,
    pub sponsored_flag: bool,
    pub extraction_confidence: f32,
}

#[async_trait]
pub trait DealRepo {
    async fn find_by_code(&self, tool_id: &str, code: &str) -> Result<Option<DealKeyRow>>;
    async fn find_by_link(&self, tool_id: &str, link_url: &str) -> Result<Option<DealKeyRow>>;
    async fn find_by_offer_text(&self, tool_id: &str, token: &str) -> Result<Vec<DealKeyRow>>;
    async fn update_existing(&self, id: &str, record: &DealRecord) -> Result<()>;
    async fn insert(&self, record: &DealRecord) -> Result<()>;
}

#[async_trait]
pub trait ReviewRepo {
    async fn find_near(
        &self,
        tool_id: &str,
        video_id: &str,
        timestamp: u64,
    ) -> Result<Option<SnippetConfidenceRow>>;
    async fn overwrite(&self, id: &str, record: &SnippetRecord) -> Result<()>;
    async fn insert(&self, record: &SnippetRecord) -> Result<()>;
}

/// Alphanumeric-only comparison form; both the match token and the local
/// confirmation go through this so punctuation never breaks the match.
fn comparable_offer_text(offer_text: &str) -> String {
    let stripped: String = normalize_for_match(offer_text)
        .chars()
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || *c == ' ')
        .collect();
    normalize_whitespace(&stripped)
}

/// The offer-text fallback match key: normalized prefix, alphanumeric only.
fn offer_text_token(offer_text: &str) -> String {
    let prefix: String = normalize_for_match(offer_text).chars().take(32).collect();
    comparable_offer_text(&prefix)
}

/// Identity resolution for a candidate deal: exact code match first, then
/// exact link match, then a normalized offer-text prefix match confirmed
/// locally.
pub async fn find_existing_deal(
    repo: &impl DealRepo,
    tool_id: &str,
    candidate: &DealCandidate,
) -> Result<Option<String>> {
    if let Some(code) = &candidate.code {
        if let Some(row) = repo.find_by_code(tool_id, code).await? {
            return Ok(Some(row.id));
        }
        if let Some(link) = &candidate.link_url {
            return Ok(repo.find_by_link(tool_id, link).await?.map(|r| r.id));
        }
        return Ok(None);
    }

    if let Some(link) = &candidate.link_url {
        return Ok(repo.find_by_link(tool_id, link).await?.map(|r| r.id));
    }

    let token = offer_text_token(&candidate.offer_text);
    if token.is_empty() {
        return Ok(None);
    }
    let rows = repo.find_by_offer_text(tool_id, &token).await?;
    Ok(rows
        .into_iter()
        .find(|row| comparable_offer_text(&row.offer_text).contains(&token))
        .map(|row| row.id))
}

/// Refresh the existing row when the deal is already known, insert otherwise.
pub async fn upsert_deal(
    repo: &impl DealRepo,
    candidate: &DealCandidate,
    record: &DealRecord,
) -> Result<()> {
    match find_existing_deal(repo, &record.tool_id, candidate).await? {
        Some(id) => repo.update_existing(&id, record).await,
        None => repo.insert(record).await,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnippetWrite {
    Inserted,
    Duplicate,
}

/// A snippet within ±5s of an existing one for the same tool and video is a
/// duplicate; the stored row is only overwritten by a strictly more
/// confident extraction.
pub async fn upsert_snippet(repo: &impl ReviewRepo, record: &SnippetRecord) -> Result<SnippetWrite> {
    let existing = repo
        .find_near(
            &record.tool_id,
            &record.video_id,
            record.receipt_timestamp_seconds,
        )
        .await?;

    if let Some(existing) = existing {
        let stored = existing.extraction_confidence.unwrap_or(0.0);
        if record.extraction_confidence > stored {
            repo.overwrite(&existing.id, record).await?;
        }
        return Ok(SnippetWrite::Duplicate);
    }

    repo.insert(record).await?;
    Ok(SnippetWrite::Inserted)
}

pub struct RestDealRepo<'a> {
    store: &'a RestStore,
}

impl<'a> RestDealRepo<'a> {
    pub fn new(store: &'a RestStore) -> Self {
        Self { store }
    }
}

#[async_trait]
impl DealRepo for RestDealRepo<'_> {
    async fn find_by_code(&self, tool_id: &str, code: &str) -> Result<Option<DealKeyRow>> {
        let rows: Vec<DealKeyRow> = self
            .store
            .select(
                "deals",
                vec![
                    ("select".to_string(), "id,offer_text".to_string()),
                    ("tool_id".to_string(), filter::eq(tool_id)),
                    ("code".to_string(), filter::eq(code)),
                    ("limit".to_string(), "1".to_string()),
                ],
            )
            .await?;
        Ok(rows.into_iter().next())
    }

    async fn find_by_link(&self, tool_id: &str, link_url: &str) -> Result<Option<DealKeyRow>> {
        let rows: Vec<DealKeyRow> = self
            .store
            .select(
                "deals",
                vec![
                    ("select".to_string(), "id,offer_text".to_string()),
                    ("tool_id".to_string(), filter::eq(tool_id)),
                    ("link_url".to_string(), filter::eq(link_url)),
                    ("limit".to_string(), "1".to_string()),
                ],
            )
            .await?;
        Ok(rows.into_iter().next())
    }

    async fn find_by_offer_text(&self, tool_id: &str, token: &str) -> Result<Vec<DealKeyRow>> {
        let rows = self
            .store
            .select(
                "deals",
                vec![
                    ("select".to_string(), "id,offer_text".to_string()),
                    ("tool_id".to_string(), filter::eq(tool_id)),
                    ("offer_text".to_string(), filter::ilike_contains(token)),
                    ("limit".to_string(), "20".to_string()),
                ],
            )
            .await?;
        Ok(rows)
    }

    async fn update_existing(&self, id: &str, record: &DealRecord) -> Result<()> {
        let patch = json!({
            "offer_text": record.offer_text,
            "offer_type": record.offer_type,
            "code": record.code,
            "link_url": record.link_url,
            "receipt_url": record.receipt_url,
            "last_seen": record.last_seen,
            "active": record.active,
            "source": record.source,
            "category": record.category,
        });
        let _: Vec<serde_json::Value> = self
            .store
            .update(
                "deals",
                &patch,
                vec![("id".to_string(), filter::eq(id))],
                Returning::Minimal,
            )
            .await?;
        Ok(())
    }

    async fn insert(&self, record: &DealRecord) -> Result<()> {
        let _: Vec<serde_json::Value> = self
            .store
            .insert("deals", record, Returning::Minimal)
            .await?;
        Ok(())
    }
}

pub struct RestReviewRepo<'a> {
    store: &'a RestStore,
}

impl<'a> RestReviewRepo<'a> {
    pub fn new(store: &'a RestStore) -> Self {
        Self { store }
    }
}

#[async_trait]
impl ReviewRepo for RestReviewRepo<'_> {
    async fn find_near(
        &self,
        tool_id: &str,
        video_id: &str,
        timestamp: u64,
    ) -> Result<Option<SnippetConfidenceRow>> {
        let low = timestamp.saturating_sub(5);
        let high = timestamp + 5;
        let rows: Vec<SnippetConfidenceRow> = self
            .store
            .select(
                "review_snippets",
                vec![
                    (
                        "select".to_string(),
                        "id,extraction_confidence".to_string(),
                    ),
                    ("tool_id".to_string(), filter::eq(tool_id)),
                    ("video_id".to_string(), filter::eq(video_id)),
                    (
                        "and".to_string(),
                        filter::and_range("receipt_timestamp_seconds", low, high),
                    ),
                    ("limit".to_string(), "1".to_string()),
                ],
            )
            .await?;
        Ok(rows.into_iter().next())
    }

    async fn overwrite(&self, id: &str, record: &SnippetRecord) -> Result<()> {
        let patch = json!({
            "sentiment": record.sentiment,
            "tags": record.tags,
            "snippet_text": record.snippet_text,
            "raw_snippet_text": record.raw_snippet_text,
            "sponsored_flag": record.sponsored_flag,
            "extraction_confidence": record.extraction_confidence,
        });
        let _: Vec<serde_json::Value> = self
            .store
            .update(
                "review_snippets",
                &patch,
                vec![("id".to_string(), filter::eq(id))],
                Returning::Minimal,
            )
            .await?;
        Ok(())
    }

    async fn insert(&self, record: &SnippetRecord) -> Result<()> {
        let _: Vec<serde_json::Value> = self
            .store
            .insert("review_snippets", record, Returning::Minimal)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeDealRepo {
        by_code: Vec<(String, String, String)>, // tool_id, code, id
        by_link: Vec<(String, String, String)>,
        rows: Vec<(String, DealKeyRow)>, // tool_id, row
        updates: Mutex<Vec<String>>,
        inserts: Mutex<u32>,
    }

    #[async_trait]
    impl DealRepo for FakeDealRepo {
        async fn find_by_code(&self, tool_id: &str, code: &str) -> Result<Option<DealKeyRow>> {
            Ok(self
                .by_code
                .iter()
                .find(|(t, c, _)| t == tool_id && c == code)
                .map(|(_, _, id)| DealKeyRow {
                    id: id.clone(),
                    offer_text: String::new(),
                }))
        }

        async fn find_by_link(&self, tool_id: &str, link: &str) -> Result<Option<DealKeyRow>> {
            Ok(self
                .by_link
                .iter()
                .find(|(t, l, _)| t == tool_id && l == link)
                .map(|(_, _, id)| DealKeyRow {
                    id: id.clone(),
                    offer_text: String::new(),
                }))
        }

        async fn find_by_offer_text(&self, tool_id: &str, _token: &str) -> Result<Vec<DealKeyRow>> {
            Ok(self
                .rows
                .iter()
                .filter(|(t, _)| t == tool_id)
                .map(|(_, row)| row.clone())
                .collect())
        }

        async fn update_existing(&self, id: &str, _record: &DealRecord) -> Result<()> {
            self.updates.lock().unwrap().push(id.to_string());
            Ok(())
        }

        async fn insert(&self, _record: &DealRecord) -> Result<()> {
            *self.inserts.lock().unwrap() += 1;
            Ok(())
        }
    }

    fn candidate(code: Option<&str>, link: Option<&str>, text: &str) -> DealCandidate {
        DealCandidate {
            offer_text: text.to_string(),
            offer_type: OfferType::Code,
            code: code.map(String::from),
            link_url: link.map(String::from),
        }
    }

    fn record(tool_id: &str) -> DealRecord {
        DealRecord {
            tool_id: tool_id.to_string(),
            video_id: "v1".to_string(),
            offer_text: "50% off".to_string(),
            offer_type: OfferType::Code,
            code: Some("SAVE50".to_string()),
            link_url: None,
            receipt_url: "https://www.youtube.com/watch?v=abc".to_string(),
            receipt_timestamp_seconds: None,
            active: true,
            last_seen: "2026-01-01T00:00:00Z".to_string(),
            source: "description".to_string(),
            category: vec![],
        }
    }

    #[tokio::test]
    async fn code_match_wins_over_link() {
        let repo = FakeDealRepo {
            by_code: vec![("t1".into(), "SAVE50".into(), "deal-1".into())],
            by_link: vec![("t1".into(), "https://x.io".into(), "deal-2".into())],
            ..Default::default()
        };
        let found =
            find_existing_deal(&repo, "t1", &candidate(Some("SAVE50"), Some("https://x.io"), ""))
                .await
                .unwrap();
        assert_eq!(found.as_deref(), Some("deal-1"));
    }

    #[tokio::test]
    async fn code_falls_back_to_link() {
        let repo = FakeDealRepo {
            by_link: vec![("t1".into(), "https://x.io".into(), "deal-2".into())],
            ..Default::default()
        };
        let found =
            find_existing_deal(&repo, "t1", &candidate(Some("NEW10"), Some("https://x.io"), ""))
                .await
                .unwrap();
        assert_eq!(found.as_deref(), Some("deal-2"));
    }

    #[tokio::test]
    async fn offer_text_match_requires_local_confirmation() {
        let repo = FakeDealRepo {
            rows: vec![
                (
                    "t1".into(),
                    DealKeyRow {
                        id: "deal-3".into(),
                        offer_text: "Unrelated bonus package".into(),
                    },
                ),
                (
                    "t1".into(),
                    DealKeyRow {
                        id: "deal-4".into(),
                        offer_text: "Get 50% off your first year today".into(),
                    },
                ),
            ],
            ..Default::default()
        };
        let found = find_existing_deal(
            &repo,
            "t1",
            &candidate(None, None, "Get 50% off your first year"),
        )
        .await
        .unwrap();
        assert_eq!(found.as_deref(), Some("deal-4"));
    }

    #[tokio::test]
    async fn upsert_updates_known_deal_and_inserts_new() {
        let repo = FakeDealRepo {
            by_code: vec![("t1".into(), "SAVE50".into(), "deal-1".into())],
            ..Default::default()
        };
        upsert_deal(&repo, &candidate(Some("SAVE50"), None, ""), &record("t1"))
            .await
            .unwrap();
        assert_eq!(repo.updates.lock().unwrap().as_slice(), ["deal-1"]);
        assert_eq!(*repo.inserts.lock().unwrap(), 0);

        upsert_deal(&repo, &candidate(Some("FRESH20"), None, ""), &record("t1"))
            .await
            .unwrap();
        assert_eq!(*repo.inserts.lock().unwrap(), 1);
    }

    #[derive(Default)]
    struct FakeReviewRepo {
        near: Option<SnippetConfidenceRow>,
        overwrites: Mutex<Vec<String>>,
        inserts: Mutex<u32>,
    }

    #[async_trait]
    impl ReviewRepo for FakeReviewRepo {
        async fn find_near(
            &self,
            _tool_id: &str,
            _video_id: &str,
            _timestamp: u64,
        ) -> Result<Option<SnippetConfidenceRow>> {
            Ok(self.near.clone())
        }

        async fn overwrite(&self, id: &str, _record: &SnippetRecord) -> Result<()> {
            self.overwrites.lock().unwrap().push(id.to_string());
            Ok(())
        }

        async fn insert(&self, _record: &SnippetRecord) -> Result<()> {
            *self.inserts.lock().unwrap() += 1;
            Ok(())
        }
    }

    fn snippet(confidence: f32) -> SnippetRecord {
        SnippetRecord {
            tool_id: "t1".to_string(),
            video_id: "v1".to_string(),
            sentiment: Sentiment::Neutral,
            tags: vec![ReviewTag::Other],
            snippet_text: "the tool exports at 1080p only".to_string(),
            raw_snippet_text: "the tool exports at 1080p only".to_string(),
            video_title: "Review".to_string(),
            channel_name: None,
            publish_date: None,
            receipt_timestamp_seconds: 42,
            receipt_url: "https://www.youtube.com/watch?v=abc&t=42s".to_string(),
            sponsored_flag: false,
            extraction_confidence: confidence,
        }
    }

    #[tokio::test]
    async fn new_snippet_inserts() {
        let repo = FakeReviewRepo::default();
        let outcome = upsert_snippet(&repo, &snippet(0.8)).await.unwrap();
        assert_eq!(outcome, SnippetWrite::Inserted);
        assert_eq!(*repo.inserts.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn near_duplicate_only_overwritten_by_higher_confidence() {
        let repo = FakeReviewRepo {
            near: Some(SnippetConfidenceRow {
                id: "snip-1".into(),
                extraction_confidence: Some(0.7),
            }),
            ..Default::default()
        };

        let outcome = upsert_snippet(&repo, &snippet(0.6)).await.unwrap();
        assert_eq!(outcome, SnippetWrite::Duplicate);
        assert!(repo.overwrites.lock().unwrap().is_empty());

        let outcome = upsert_snippet(&repo, &snippet(0.9)).await.unwrap();
        assert_eq!(outcome, SnippetWrite::Duplicate);
        assert_eq!(repo.overwrites.lock().unwrap().as_slice(), ["snip-1"]);
    }

    #[tokio::test]
    async fn null_stored_confidence_counts_as_zero() {
        let repo = FakeReviewRepo {
            near: Some(SnippetConfidenceRow {
                id: "snip-2".into(),
                extraction_confidence: None,
            }),
            ..Default::default()
        };
        let outcome = upsert_snippet(&repo, &snippet(0.5)).await.unwrap();
        assert_eq!(outcome, SnippetWrite::Duplicate);
        assert_eq!(repo.overwrites.lock().unwrap().as_slice(), ["snip-2"]);
    }

    #[test]
    fn offer_text_token_normalizes_prefix() {
        let token = offer_text_token("Get 50% OFF   your first year — today only!");
        assert!(token.starts_with("get 50 off your first year"));
        assert!(token.len() <= 32);
        assert_eq!(offer_text_token("!!!"), "");
    }

    #[test]
    fn punctuated_row_text_still_confirms_token() {
        let token = offer_text_token("Get 50% off — your first year!");
        assert_eq!(token, "get 50 off your first year");
        assert!(comparable_offer_text("Get 50% off, your first year, billed annually")
            .contains(&token));
    }
}
