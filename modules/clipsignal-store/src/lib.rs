pub mod error;
pub mod filter;
pub mod rows;

pub use error::{Result, StoreError};
pub use rows::{
    CategoryRef, ChannelKeyRow, DealKeyRow, MentionRow, ReviewAggregateRow, SnippetConfidenceRow,
    ToolCategoryRow, ToolRef, ToolRow, TranscriptCacheRow, VideoKeyRow, VideoRow,
};

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Query parameters for a PostgREST request: `select`, `order`, `limit`, and
/// column filters like `("tool_id", "eq.{id}")`. See [`filter`] for value
/// builders.
pub type Query = Vec<(String, String)>;

/// PostgREST `return=` preference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Returning {
    Representation,
    Minimal,
}

impl Returning {
    fn as_str(self) -> &'static str {
        match self {
            Returning::Representation => "representation",
            Returning::Minimal => "minimal",
        }
    }
}

/// PostgREST storage client. All pipeline persistence goes through here.
pub struct RestStore {
    base_url: String,
    service_key: String,
    http: reqwest::Client,
}

impl RestStore {
    pub fn new(base_url: &str, service_key: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            service_key: service_key.to_string(),
            http: reqwest::Client::new(),
        }
    }

    fn headers(&self, prefer: Option<&str>) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if let Ok(key) = HeaderValue::from_str(&self.service_key) {
            headers.insert("apikey", key);
        }
        if let Ok(bearer) = HeaderValue::from_str(&format!("Bearer {}", self.service_key)) {
            headers.insert(AUTHORIZATION, bearer);
        }
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Some(prefer) = prefer {
            if let Ok(value) = HeaderValue::from_str(prefer) {
                headers.insert("Prefer", value);
            }
        }
        headers
    }

    async fn request<T: DeserializeOwned>(
        &self,
        method: reqwest::Method,
        table: &str,
        query: &Query,
        body: Option<&serde_json::Value>,
        prefer: Option<&str>,
    ) -> Result<Vec<T>> {
        let path = format!("/rest/v1/{table}");
        let url = format!("{}{}", self.base_url, path);

        let mut builder = self
            .http
            .request(method.clone(), &url)
            .headers(self.headers(prefer))
            .query(query);
        if let Some(body) = body {
            builder = builder.json(body);
        }

        let resp = builder.send().await?;
        let status = resp.status();
        let text = resp.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(StoreError::Api {
                method: method.to_string(),
                path,
                status: status.as_u16(),
                message: text,
            });
        }

        // `return=minimal` responses have no body.
        if text.is_empty() {
            return Ok(Vec::new());
        }
        let rows: Vec<T> = serde_json::from_str(&text)?;
        Ok(rows)
    }

    pub async fn select<T: DeserializeOwned>(&self, table: &str, query: Query) -> Result<Vec<T>> {
        tracing::debug!(table, params = query.len(), "Store select");
        self.request(reqwest::Method::GET, table, &query, None, None)
            .await
    }

    pub async fn upsert<T: DeserializeOwned>(
        &self,
        table: &str,
        row: &impl Serialize,
        on_conflict: &str,
        returning: Returning,
    ) -> Result<Vec<T>> {
        let query = vec![("on_conflict".to_string(), on_conflict.to_string())];
        let prefer = format!(
            "resolution=merge-duplicates,return={}",
            returning.as_str()
        );
        let body = serde_json::to_value(row)?;
        tracing::debug!(table, on_conflict, "Store upsert");
        self.request(reqwest::Method::POST, table, &query, Some(&body), Some(&prefer))
            .await
    }

    pub async fn insert<T: DeserializeOwned>(
        &self,
        table: &str,
        row: &impl Serialize,
        returning: Returning,
    ) -> Result<Vec<T>> {
        let prefer = format!("return={}", returning.as_str());
        let body = serde_json::to_value(row)?;
        tracing::debug!(table, "Store insert");
        self.request(reqwest::Method::POST, table, &Vec::new(), Some(&body), Some(&prefer))
            .await
    }

    pub async fn update<T: DeserializeOwned>(
        &self,
        table: &str,
        patch: &impl Serialize,
        filters: Query,
        returning: Returning,
    ) -> Result<Vec<T>> {
        let prefer = format!("return={}", returning.as_str());
        let body = serde_json::to_value(patch)?;
        tracing::debug!(table, filters = filters.len(), "Store update");
        self.request(reqwest::Method::PATCH, table, &filters, Some(&body), Some(&prefer))
            .await
    }
}
