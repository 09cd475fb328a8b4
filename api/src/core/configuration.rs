//! Per-request configuration.
//!
//! A [`Configuration`] is built for every request from the process
//! environment, then patched with whatever credential fields the request body
//! carries. Nothing is validated here; a missing value surfaces when the
//! pipeline or history store is built.
//!
//! The history connection string is environment-only: callers cannot point
//! the server at a store of their choosing.

use std::{collections::HashMap, fmt, sync::Arc};

use search_retriever::{RetrieverError, SearchConfig};
use serde::Deserialize;

pub const ENV_SEARCH_SERVICE_NAME: &str = "AZURE_COGNITIVE_SEARCH_SERVICE_NAME";
pub const ENV_SEARCH_API_KEY: &str = "AZURE_COGNITIVE_SEARCH_API_KEY";
pub const ENV_SEARCH_INDEX_NAME: &str = "AZURE_COGNITIVE_SEARCH_INDEX_NAME";
pub const ENV_OPENAI_API_KEY: &str = "OPENAI_API_KEY";
pub const ENV_HISTORY_CONNECTION_STRING: &str = "CHAT_HISTORY_CONNECTION_STRING";
pub const ENV_HISTORY_SESSION_ID: &str = "CHAT_HISTORY_SESSION_ID";

/// Where per-request variables are looked up.
#[derive(Debug, Clone, Default)]
pub enum EnvSource {
    /// `std::env`, read at lookup time.
    #[default]
    Process,
    /// A fixed table, for embedding and tests.
    Fixed(Arc<HashMap<String, String>>),
}

impl EnvSource {
    pub fn fixed<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self::Fixed(Arc::new(
            pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        ))
    }

    pub fn var(&self, name: &str) -> Option<String> {
        match self {
            Self::Process => std::env::var(name).ok(),
            Self::Fixed(vars) => vars.get(name).cloned(),
        }
    }
}

/// Credentials and identifiers the pipeline needs for one request.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Configuration {
    pub search_service_name: Option<String>,
    pub search_api_key: Option<String>,
    pub search_index_name: Option<String>,
    pub openai_api_key: Option<String>,
    pub history_connection_string: Option<String>,
    pub session_id: Option<String>,
}

impl Configuration {
    /// Reads `env` as it is right now.
    pub fn from_source(env: &EnvSource) -> Self {
        Self::from_lookup(|name| env.var(name))
    }

    /// Builds from an arbitrary variable source. Blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |name: &str| non_blank(lookup(name));
        Self {
            search_service_name: get(ENV_SEARCH_SERVICE_NAME),
            search_api_key: get(ENV_SEARCH_API_KEY),
            search_index_name: get(ENV_SEARCH_INDEX_NAME),
            openai_api_key: get(ENV_OPENAI_API_KEY),
            history_connection_string: get(ENV_HISTORY_CONNECTION_STRING),
            session_id: get(ENV_HISTORY_SESSION_ID),
        }
    }

    /// Environment first, then request-body overrides on top.
    pub fn resolve(env: &EnvSource, overrides: &ConfigOverrides) -> Self {
        Self::from_source(env).with_overrides(overrides)
    }

    /// Non-blank override fields replace the current values.
    pub fn with_overrides(mut self, o: &ConfigOverrides) -> Self {
        fn patch(slot: &mut Option<String>, value: &Option<String>) {
            if let Some(v) = non_blank(value.clone()) {
                *slot = Some(v);
            }
        }
        patch(&mut self.search_service_name, &o.search_service_name);
        patch(&mut self.search_api_key, &o.search_key());
        patch(&mut self.search_index_name, &o.search_index_name);
        patch(&mut self.openai_api_key, &o.openai_api_key);
        patch(&mut self.session_id, &o.session_id);
        self
    }

    /// Retriever settings for these credentials (tuning still comes from env).
    pub fn search_config(&self) -> Result<SearchConfig, RetrieverError> {
        SearchConfig::with_credentials(
            self.search_service_name.clone(),
            self.search_api_key.clone(),
            self.search_index_name.clone(),
        )
    }
}

impl fmt::Debug for Configuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn secret(v: &Option<String>) -> &'static str {
            if v.is_some() { "<set>" } else { "<unset>" }
        }
        f.debug_struct("Configuration")
            .field("search_service_name", &self.search_service_name)
            .field("search_api_key", &secret(&self.search_api_key))
            .field("search_index_name", &self.search_index_name)
            .field("openai_api_key", &secret(&self.openai_api_key))
            .field(
                "history_connection_string",
                &secret(&self.history_connection_string),
            )
            .field("session_id", &self.session_id)
            .finish()
    }
}

/// Optional credential fields accepted in request bodies.
///
/// Keys mirror the deployment's setting names. A `CHAT_HISTORY_CONNECTION_STRING`
/// key in the body is ignored. The search service has a single
/// key; `AZURE_SEARCH_API_KEY` wins over `AZURE_SEARCH_ADMIN_KEY` when both
/// are sent.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfigOverrides {
    #[serde(rename = "AZURE_SEARCH_SERVICE_NAME", default)]
    pub search_service_name: Option<String>,
    #[serde(rename = "AZURE_SEARCH_API_KEY", default)]
    pub search_api_key: Option<String>,
    #[serde(rename = "AZURE_SEARCH_ADMIN_KEY", default)]
    pub search_admin_key: Option<String>,
    #[serde(rename = "AZURE_SEARCH_VECTOR_INDEX_NAME", default)]
    pub search_index_name: Option<String>,
    #[serde(rename = "OPENAI_API_KEY", default)]
    pub openai_api_key: Option<String>,
    #[serde(default)]
    pub session_id: Option<String>,
}

impl ConfigOverrides {
    fn search_key(&self) -> Option<String> {
        non_blank(self.search_api_key.clone()).or_else(|| non_blank(self.search_admin_key.clone()))
    }
}

fn non_blank(v: Option<String>) -> Option<String> {
    v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}
