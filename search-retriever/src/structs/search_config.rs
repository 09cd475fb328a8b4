//! Configuration layer: reads search settings from environment variables
//! and exposes a strongly typed config for the Azure Cognitive Search retriever.

use serde::{Deserialize, Serialize};

use crate::errors::retriever_error::RetrieverError;

/// Number of documents fetched per question.
pub const DEFAULT_TOP_K: usize = 10;
/// Index field holding the snippet text.
pub const DEFAULT_CONTENT_KEY: &str = "content";
pub const DEFAULT_API_VERSION: &str = "2020-06-30";
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const ENV_TIMEOUT_SECS: &str = "AZURE_COGNITIVE_SEARCH_TIMEOUT_SECS";

/// Azure Cognitive Search connectivity and query parameters.
///
/// Credentials are optional at construction; [`SearchConfig::validate`] is
/// called when a retriever is built.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Search service name (`<name>.search.windows.net`).
    pub service_name: Option<String>,
    /// Query/admin key sent in the `api-key` header.
    pub api_key: Option<String>,
    /// Index to query.
    pub index_name: Option<String>,
    /// REST `api-version`.
    pub api_version: String,
    /// Full base URL overriding `https://<service>.search.windows.net`.
    pub endpoint: Option<String>,
    /// Field mapped to `Document::page_content`.
    pub content_key: String,
    /// Maximum documents returned per query.
    pub top_k: usize,
    /// HTTP timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            service_name: None,
            api_key: None,
            index_name: None,
            api_version: DEFAULT_API_VERSION.to_string(),
            endpoint: None,
            content_key: DEFAULT_CONTENT_KEY.to_string(),
            top_k: DEFAULT_TOP_K,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl SearchConfig {
    /// Builds a config from the given credentials plus environment tuning.
    ///
    /// Environment variables used:
    /// - `AZURE_COGNITIVE_SEARCH_API_VERSION` (default: "2020-06-30")
    /// - `AZURE_COGNITIVE_SEARCH_ENDPOINT` (optional base URL override)
    /// - `AZURE_COGNITIVE_SEARCH_TIMEOUT_SECS` (default: 30)
    ///
    /// # Errors
    /// [`RetrieverError::InvalidConfig`] when the timeout is not a number.
    pub fn with_credentials(
        service_name: Option<String>,
        api_key: Option<String>,
        index_name: Option<String>,
    ) -> Result<Self, RetrieverError> {
        Self::tuned_by(service_name, api_key, index_name, |key| {
            std::env::var(key).ok()
        })
    }

    fn tuned_by(
        service_name: Option<String>,
        api_key: Option<String>,
        index_name: Option<String>,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, RetrieverError> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let timeout_secs = match get(ENV_TIMEOUT_SECS) {
            Some(v) => v.trim().parse::<u64>().map_err(|e| {
                RetrieverError::InvalidConfig(format!("{ENV_TIMEOUT_SECS}={v:?}: {e}"))
            })?,
            None => DEFAULT_TIMEOUT_SECS,
        };
        Ok(Self {
            service_name,
            api_key,
            index_name,
            api_version: get("AZURE_COGNITIVE_SEARCH_API_VERSION")
                .unwrap_or_else(|| DEFAULT_API_VERSION.to_string()),
            endpoint: get("AZURE_COGNITIVE_SEARCH_ENDPOINT"),
            timeout_secs,
            ..Self::default()
        })
    }

    /// Ensures every credential needed for a query is present.
    ///
    /// # Errors
    /// [`RetrieverError::MissingCredential`] naming the first missing value;
    /// [`RetrieverError::InvalidConfig`] for `top_k == 0` or a malformed endpoint.
    pub fn validate(&self) -> Result<(), RetrieverError> {
        if self.endpoint.is_none() && is_blank(&self.service_name) {
            return Err(RetrieverError::MissingCredential(
                "AZURE_COGNITIVE_SEARCH_SERVICE_NAME",
            ));
        }
        if is_blank(&self.api_key) {
            return Err(RetrieverError::MissingCredential(
                "AZURE_COGNITIVE_SEARCH_API_KEY",
            ));
        }
        if is_blank(&self.index_name) {
            return Err(RetrieverError::MissingCredential(
                "AZURE_COGNITIVE_SEARCH_INDEX_NAME",
            ));
        }
        if self.top_k == 0 {
            return Err(RetrieverError::InvalidConfig("top_k must be > 0".into()));
        }
        if let Some(ep) = &self.endpoint {
            if !(ep.starts_with("http://") || ep.starts_with("https://")) {
                return Err(RetrieverError::InvalidConfig(
                    "AZURE_COGNITIVE_SEARCH_ENDPOINT must start with http:// or https://".into(),
                ));
            }
        }
        Ok(())
    }

    /// Base URL of the search service, without trailing slash.
    pub fn base_url(&self) -> String {
        match &self.endpoint {
            Some(ep) => ep.trim_end_matches('/').to_string(),
            None => format!(
                "https://{}.search.windows.net",
                self.service_name.as_deref().unwrap_or_default().trim()
            ),
        }
    }

    /// URL of the documents search endpoint for the configured index.
    pub fn docs_url(&self) -> String {
        format!(
            "{}/indexes/{}/docs",
            self.base_url(),
            self.index_name.as_deref().unwrap_or_default().trim()
        )
    }

    /// True when all three credentials are present (no network check).
    pub fn is_configured(&self) -> bool {
        self.validate().is_ok()
    }
}

fn is_blank(v: &Option<String>) -> bool {
    v.as_deref().is_none_or(|s| s.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full() -> SearchConfig {
        SearchConfig {
            service_name: Some("yape-search".into()),
            api_key: Some("key".into()),
            index_name: Some("faq-index".into()),
            ..SearchConfig::default()
        }
    }

    #[test]
    fn defaults_match_support_chat() {
        let cfg = SearchConfig::default();
        assert_eq!(cfg.top_k, 10);
        assert_eq!(cfg.content_key, "content");
        assert_eq!(cfg.api_version, "2020-06-30");
    }

    #[test]
    fn builds_service_url() {
        assert_eq!(
            full().docs_url(),
            "https://yape-search.search.windows.net/indexes/faq-index/docs"
        );
    }

    #[test]
    fn endpoint_override_wins() {
        let cfg = SearchConfig {
            endpoint: Some("http://127.0.0.1:9000/".into()),
            ..full()
        };
        assert_eq!(cfg.docs_url(), "http://127.0.0.1:9000/indexes/faq-index/docs");
    }

    #[test]
    fn malformed_timeout_is_rejected() {
        let tuned = |timeout: &'static str| {
            SearchConfig::tuned_by(None, None, None, move |k| {
                (k == ENV_TIMEOUT_SECS).then(|| timeout.to_string())
            })
        };
        assert_eq!(tuned(" 5 ").unwrap().timeout_secs, 5);
        assert_eq!(tuned("").unwrap().timeout_secs, DEFAULT_TIMEOUT_SECS);
        match tuned("30s") {
            Err(RetrieverError::InvalidConfig(msg)) => assert!(msg.contains(ENV_TIMEOUT_SECS)),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn reports_first_missing_credential() {
        let cfg = SearchConfig {
            api_key: Some("  ".into()),
            ..full()
        };
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("AZURE_COGNITIVE_SEARCH_API_KEY"));
        assert!(!cfg.is_configured());
        assert!(full().is_configured());
    }
}
