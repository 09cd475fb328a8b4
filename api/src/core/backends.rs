//! Factories for the outbound clients a request needs.
//!
//! Handlers never construct HTTP or Redis clients directly; they ask the
//! [`ChatBackends`] held in `AppState`. [`LiveBackends`] builds real clients
//! and caches them per configuration, so connection pools survive across
//! requests even though configuration is resolved per request. Each cache
//! holds at most [`MAX_CACHED_CLIENTS`] entries; clients for configs beyond
//! that are built per request and dropped with it.

use std::{
    collections::HashMap,
    hash::{Hash, Hasher},
    sync::{Arc, RwLock},
};

use ai_llm_service::{
    AiLlmError, ChatModel, LlmModelConfig, LlmProvider, OpenAiService,
    health_service::{HealthService, HealthStatus},
};
use async_trait::async_trait;
use chat_history::{HistoryError, HistoryStore, RedisHistory};
use search_retriever::{AzureSearchRetriever, Retriever, RetrieverError, SearchConfig};
use tracing::debug;

/// Per-cache bound, so credentials sent in request bodies cannot grow the
/// caches without limit.
pub const MAX_CACHED_CLIENTS: usize = 32;

#[async_trait]
pub trait ChatBackends: Send + Sync {
    fn retriever(&self, cfg: SearchConfig) -> Result<Arc<dyn Retriever>, RetrieverError>;

    fn chat_model(&self, cfg: LlmModelConfig) -> Result<Arc<dyn ChatModel>, AiLlmError>;

    fn history_store(&self, connection_string: &str)
    -> Result<Arc<dyn HistoryStore>, HistoryError>;

    /// Best-effort provider probe; never fails.
    async fn llm_health(&self, cfg: &LlmModelConfig) -> HealthStatus;
}

/// Production backends: Azure Cognitive Search, OpenAI, Redis.
pub struct LiveBackends {
    retrievers: RwLock<HashMap<SearchConfig, Arc<AzureSearchRetriever>>>,
    models: RwLock<HashMap<ClientKey, Arc<OpenAiService>>>,
    stores: RwLock<HashMap<String, Arc<RedisHistory>>>,
    health: HealthService,
}

impl LiveBackends {
    /// # Errors
    /// [`AiLlmError::HttpTransport`] if the health-probe client cannot be built.
    pub fn new() -> Result<Self, AiLlmError> {
        Ok(Self {
            retrievers: RwLock::new(HashMap::new()),
            models: RwLock::new(HashMap::new()),
            stores: RwLock::new(HashMap::new()),
            health: HealthService::new(None)?,
        })
    }
}

#[async_trait]
impl ChatBackends for LiveBackends {
    fn retriever(&self, cfg: SearchConfig) -> Result<Arc<dyn Retriever>, RetrieverError> {
        let cli: Arc<dyn Retriever> = get_or_try_init(&self.retrievers, cfg.clone(), || {
            AzureSearchRetriever::new(cfg)
        })?;
        Ok(cli)
    }

    fn chat_model(&self, cfg: LlmModelConfig) -> Result<Arc<dyn ChatModel>, AiLlmError> {
        let key = ClientKey::from(&cfg);
        let cli: Arc<dyn ChatModel> = get_or_try_init(&self.models, key, || OpenAiService::new(cfg))?;
        Ok(cli)
    }

    fn history_store(
        &self,
        connection_string: &str,
    ) -> Result<Arc<dyn HistoryStore>, HistoryError> {
        let cli: Arc<dyn HistoryStore> =
            get_or_try_init(&self.stores, connection_string.to_string(), || {
            RedisHistory::open(connection_string)
        })?;
        Ok(cli)
    }

    async fn llm_health(&self, cfg: &LlmModelConfig) -> HealthStatus {
        self.health.check(cfg).await
    }
}

/// Returns the cached client for `key`, building it on first use. A failed
/// build is not cached, and neither is a new client once the cache is full.
fn get_or_try_init<K, V, E>(
    cache: &RwLock<HashMap<K, Arc<V>>>,
    key: K,
    build: impl FnOnce() -> Result<V, E>,
) -> Result<Arc<V>, E>
where
    K: Eq + Hash,
{
    if let Some(cli) = cache
        .read()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .get(&key)
        .cloned()
    {
        return Ok(cli);
    }
    let built = Arc::new(build()?);
    let mut w = cache
        .write()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    if let Some(cli) = w.get(&key) {
        return Ok(cli.clone());
    }
    if w.len() >= MAX_CACHED_CLIENTS {
        debug!(cached = w.len(), "client cache full; client not kept");
        return Ok(built);
    }
    debug!(cached = w.len() + 1, "client cache miss");
    w.insert(key, built.clone());
    Ok(built)
}

/// Cache key identifying a unique chat client config. Temperature is compared
/// by bit pattern so configs that differ only in sampling get their own client.
#[derive(Clone, PartialEq, Eq)]
struct ClientKey {
    provider: LlmProvider,
    endpoint: String,
    model: String,
    api_key: Option<String>,
    api_version: Option<String>,
    max_tokens: Option<u32>,
    temperature_bits: Option<u32>,
    top_p_bits: Option<u32>,
    timeout: Option<u64>,
}

impl From<&LlmModelConfig> for ClientKey {
    fn from(cfg: &LlmModelConfig) -> Self {
        Self {
            provider: cfg.provider,
            endpoint: cfg.endpoint.clone(),
            model: cfg.model.clone(),
            api_key: cfg.api_key.clone(),
            api_version: cfg.api_version.clone(),
            max_tokens: cfg.max_tokens,
            temperature_bits: cfg.temperature.map(f32::to_bits),
            top_p_bits: cfg.top_p.map(f32::to_bits),
            timeout: cfg.timeout_secs,
        }
    }
}

impl Hash for ClientKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.provider.hash(state);
        self.endpoint.hash(state);
        self.model.hash(state);
        self.api_key.hash(state);
        self.api_version.hash(state);
        self.max_tokens.hash(state);
        self.temperature_bits.hash(state);
        self.top_p_bits.hash(state);
        self.timeout.hash(state);
    }
}
