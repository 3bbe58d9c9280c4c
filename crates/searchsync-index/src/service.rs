//! Solr client built on the two transport primitives.

use std::sync::Arc;
use std::time::Duration;

use reqwest::Url;
use serde::{Deserialize, Serialize};

use searchsync_core::{Error, IndexDocument, Result};

use crate::transport::{CONTENT_TYPE_JSON, RawResponse, SearchTransport};

/// When updates become visible to searchers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommitMode {
    /// Hard commit on every update request (`commit=true`).
    Immediate,
    /// Ask the engine to commit within this many milliseconds.
    Within(u64),
    /// Leave commits to the engine's autocommit settings.
    Deferred,
}

impl Default for CommitMode {
    fn default() -> Self {
        CommitMode::Within(1_000)
    }
}

/// Connection settings for the search engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SolrConfig {
    /// Base URL, e.g. `http://localhost:8983/solr`
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Per-request timeout in milliseconds
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Commit behaviour of update requests
    #[serde(default)]
    pub commit: CommitMode,
}

fn default_base_url() -> String {
    "http://localhost:8983/solr".to_string()
}

fn default_timeout_ms() -> u64 {
    10_000
}

impl Default for SolrConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_ms: default_timeout_ms(),
            commit: CommitMode::default(),
        }
    }
}

impl SolrConfig {
    /// The request timeout.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// High-level engine operations.
///
/// Each operation is exactly one request through the [`SearchTransport`].
#[derive(Clone)]
pub struct SolrService {
    transport: Arc<dyn SearchTransport>,
    config: SolrConfig,
}

impl std::fmt::Debug for SolrService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SolrService")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl SolrService {
    /// Creates a client.
    pub fn new(transport: Arc<dyn SearchTransport>, config: SolrConfig) -> Self {
        Self { transport, config }
    }

    /// Client settings.
    pub fn config(&self) -> &SolrConfig {
        &self.config
    }

    fn url(&self, core: &str, path: &str, query: &[(&str, String)]) -> Result<Url> {
        let base = self.config.base_url.trim_end_matches('/');
        let mut url = Url::parse(&format!("{base}/{core}/{path}"))
            .map_err(|e| Error::config(format!("invalid solr url '{base}': {e}")))?;
        if !query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in query {
                pairs.append_pair(key, value);
            }
        }
        Ok(url)
    }

    fn update_url(&self, core: &str) -> Result<Url> {
        let mut query = vec![("wt", "json".to_string())];
        match self.config.commit {
            CommitMode::Immediate => query.push(("commit", "true".to_string())),
            CommitMode::Within(ms) => query.push(("commitWithin", ms.to_string())),
            CommitMode::Deferred => {}
        }
        self.url(core, "update", &query)
    }

    async fn post_update(&self, core: &str, payload: &serde_json::Value) -> Result<RawResponse> {
        let url = self.update_url(core)?;
        let body = serde_json::to_vec(payload)?;
        let response = self
            .transport
            .send_raw_post(url.as_str(), body, self.config.timeout(), CONTENT_TYPE_JSON)
            .await?;
        Ok(response)
    }

    /// Adds or replaces documents in one request.
    pub async fn add(&self, core: &str, documents: &[IndexDocument]) -> Result<RawResponse> {
        let payload =
            serde_json::Value::Array(documents.iter().map(IndexDocument::to_engine_json).collect());
        log::debug!("add {} documents to {core}", documents.len());
        self.post_update(core, &payload).await
    }

    /// Deletes documents by their `_documentid` values in one request.
    pub async fn delete_by_id(&self, core: &str, ids: &[String]) -> Result<RawResponse> {
        let payload = serde_json::json!({ "delete": ids });
        log::debug!("delete {} documents from {core}", ids.len());
        self.post_update(core, &payload).await
    }

    /// Deletes every document matching `query` in one request.
    pub async fn delete_by_query(&self, core: &str, query: &str) -> Result<RawResponse> {
        let payload = serde_json::json!({ "delete": { "query": query } });
        log::debug!("delete by query from {core}: {query}");
        self.post_update(core, &payload).await
    }

    /// Issues an explicit hard commit.
    pub async fn commit(&self, core: &str) -> Result<RawResponse> {
        let url = self.url(core, "update", &[("commit", "true".to_string())])?;
        let response = self
            .transport
            .send_raw_post(url.as_str(), b"{}".to_vec(), self.config.timeout(), CONTENT_TYPE_JSON)
            .await?;
        Ok(response)
    }

    /// Checks that the core answers.
    pub async fn ping(&self, core: &str) -> Result<()> {
        let url = self.url(core, "admin/ping", &[("wt", "json".to_string())])?;
        self.transport
            .send_raw_get(url.as_str(), self.config.timeout())
            .await?;
        Ok(())
    }

    /// Runs a query and returns the parsed JSON response.
    pub async fn select(&self, core: &str, query: &str, rows: usize) -> Result<serde_json::Value> {
        let url = self.url(
            core,
            "select",
            &[
                ("q", query.to_string()),
                ("rows", rows.to_string()),
                ("wt", "json".to_string()),
            ],
        )?;
        let response = self
            .transport
            .send_raw_get(url.as_str(), self.config.timeout())
            .await?;
        Ok(response.json()?)
    }
}
