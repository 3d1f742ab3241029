/// Search-log index
///
/// Every feed search is recorded as a document in an Elasticsearch index.
/// Terms aggregations over that index power the popular-search ranking and
/// the autocomplete suggestions.
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use elasticsearch::{
    http::transport::{BuildError, SingleNodeConnectionPool, TransportBuilder},
    Elasticsearch, IndexParts, SearchParts,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;
use url::Url;

#[derive(Debug, Error)]
pub enum SearchLogError {
    #[error("invalid Elasticsearch URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("failed to build transport: {0}")]
    TransportBuild(#[from] BuildError),
    #[error("transport error: {0}")]
    Transport(#[from] elasticsearch::Error),
    #[error("search index returned status {0}")]
    Status(u16),
}

/// One recorded search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchLogEntry {
    pub log: String,
    /// Board the search was issued from ("중고거래" or "동네홍보").
    pub category: String,
    pub timestamp: DateTime<Utc>,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SearchLog: Send + Sync {
    async fn record(&self, entry: SearchLogEntry) -> Result<(), SearchLogError>;

    /// Most frequent search terms.
    async fn top_terms(&self, size: u32) -> Result<Vec<String>, SearchLogError>;

    /// Most frequent search terms matching `prefix`.
    async fn suggest(&self, prefix: &str, size: u32) -> Result<Vec<String>, SearchLogError>;
}

#[derive(Clone)]
pub struct ElasticsearchSearchLog {
    client: Elasticsearch,
    index: String,
}

impl ElasticsearchSearchLog {
    pub fn new(url: &str, index: &str) -> Result<Self, SearchLogError> {
        let parsed = Url::parse(url)?;
        let pool = SingleNodeConnectionPool::new(parsed);
        let transport = TransportBuilder::new(pool).build()?;

        Ok(Self {
            client: Elasticsearch::new(transport),
            index: index.to_string(),
        })
    }

    async fn terms(&self, body: Value) -> Result<Vec<String>, SearchLogError> {
        let response = self
            .client
            .search(SearchParts::Index(&[self.index.as_str()]))
            .body(body)
            .send()
            .await?;

        let status = response.status_code();
        if !status.is_success() {
            return Err(SearchLogError::Status(status.as_u16()));
        }

        let result: Value = response.json().await?;
        Ok(bucket_keys(&result))
    }
}

fn terms_aggregation(size: u32) -> Value {
    json!({
        "by_count": {
            "terms": {
                "field": "log.raw",
                "size": size,
                "order": { "_count": "desc" }
            }
        }
    })
}

fn bucket_keys(result: &Value) -> Vec<String> {
    result["aggregations"]["by_count"]["buckets"]
        .as_array()
        .map(|buckets| {
            buckets
                .iter()
                .filter_map(|bucket| bucket["key"].as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}

#[async_trait]
impl SearchLog for ElasticsearchSearchLog {
    async fn record(&self, entry: SearchLogEntry) -> Result<(), SearchLogError> {
        let response = self
            .client
            .index(IndexParts::Index(&self.index))
            .body(entry)
            .send()
            .await?;

        let status = response.status_code();
        if status.is_success() {
            Ok(())
        } else {
            Err(SearchLogError::Status(status.as_u16()))
        }
    }

    async fn top_terms(&self, size: u32) -> Result<Vec<String>, SearchLogError> {
        self.terms(json!({
            "size": 0,
            "aggs": terms_aggregation(size)
        }))
        .await
    }

    async fn suggest(&self, prefix: &str, size: u32) -> Result<Vec<String>, SearchLogError> {
        self.terms(json!({
            "size": 0,
            "query": { "match": { "log": prefix } },
            "aggs": terms_aggregation(size)
        }))
        .await
    }
}
