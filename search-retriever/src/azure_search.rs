//! Azure Cognitive Search retriever.
//!
//! Issues a simple full-text query against the index documents endpoint:
//! `GET {base}/indexes/{index}/docs?api-version=..&search=<question>&$top=<k>`
//! with the key in the `api-key` header, and maps each returned row to a
//! [`Document`]. Ranking is entirely the service's; rows keep its order.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::header;
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{debug, error, info, instrument};

use crate::{
    Retriever, errors::retriever_error::RetrieverError, structs::document::Document,
    structs::search_config::SearchConfig,
};

/// Retriever bound to one search index.
#[derive(Debug)]
pub struct AzureSearchRetriever {
    client: reqwest::Client,
    cfg: SearchConfig,
    url_docs: String,
}

impl AzureSearchRetriever {
    /// Creates a retriever from a validated config.
    ///
    /// # Errors
    /// - [`RetrieverError::MissingCredential`] / [`RetrieverError::InvalidConfig`] from validation
    /// - [`RetrieverError::Http`] if the HTTP client cannot be built
    pub fn new(cfg: SearchConfig) -> Result<Self, RetrieverError> {
        cfg.validate()?;

        let api_key = cfg.api_key.as_deref().unwrap_or_default().trim();
        let mut key = header::HeaderValue::from_str(api_key)
            .map_err(|e| RetrieverError::InvalidConfig(format!("invalid api-key header: {e}")))?;
        key.set_sensitive(true);

        let mut headers = header::HeaderMap::new();
        headers.insert(header::HeaderName::from_static("api-key"), key);
        headers.insert(
            header::ACCEPT,
            header::HeaderValue::from_static("application/json"),
        );

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .default_headers(headers)
            .build()?;

        let url_docs = cfg.docs_url();
        debug!(url = %url_docs, top_k = cfg.top_k, "AzureSearchRetriever initialized");

        Ok(Self {
            client,
            cfg,
            url_docs,
        })
    }

    /// Runs the query and returns at most `top_k` documents in relevance order.
    #[instrument(skip_all, fields(index = self.cfg.index_name.as_deref().unwrap_or_default()))]
    pub async fn search(&self, query: &str) -> Result<Vec<Document>, RetrieverError> {
        let started = Instant::now();
        let top = self.cfg.top_k.to_string();

        let resp = self
            .client
            .get(&self.url_docs)
            .query(&[
                ("api-version", self.cfg.api_version.as_str()),
                ("search", query),
                ("$top", top.as_str()),
            ])
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            let snippet = text.chars().take(240).collect::<String>();
            error!(
                %status,
                url = %self.url_docs,
                %snippet,
                latency_ms = started.elapsed().as_millis(),
                "search returned non-success status"
            );
            return Err(RetrieverError::HttpStatus {
                status,
                url: self.url_docs.clone(),
                snippet,
            });
        }

        let body: SearchResponse = resp.json().await.map_err(|e| {
            RetrieverError::Decode(format!("serde error: {e}; expected `{{ value: [...] }}`"))
        })?;

        let docs = map_rows(body.value, &self.cfg.content_key, self.cfg.top_k);

        info!(
            hits = docs.len(),
            latency_ms = started.elapsed().as_millis(),
            "search completed"
        );
        Ok(docs)
    }
}

#[async_trait]
impl Retriever for AzureSearchRetriever {
    async fn retrieve(&self, query: &str) -> Result<Vec<Document>, RetrieverError> {
        self.search(query).await
    }
}

/// Maps raw rows to documents, capped at `top_k`. Non-object rows are skipped.
fn map_rows(rows: Vec<Value>, content_key: &str, top_k: usize) -> Vec<Document> {
    rows.into_iter()
        .filter_map(|row| match row {
            Value::Object(map) => Some(map),
            _ => None,
        })
        .take(top_k)
        .map(|map: Map<String, Value>| Document::from_search_row(map, content_key))
        .collect()
}

/// Response body of the documents search endpoint.
#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    value: Vec<Value>,
}
