use crate::config::llm_provider::LlmProvider;

/// Configuration for a single chat-completion model invocation.
///
/// # Fields
///
/// - `provider`: which backend to use (OpenAI or Azure OpenAI).
/// - `model`: model identifier (`"gpt-3.5-turbo-16k-0613"`) or Azure deployment name.
/// - `endpoint`: base URL (`https://api.openai.com` or the Azure resource URL).
/// - `api_key`: credential; required to build a client, not to build the config.
/// - `api_version`: Azure `api-version` query parameter (ignored for OpenAI).
/// - `max_tokens`: optional completion cap.
/// - `temperature`: sampling temperature (0.0 = deterministic).
/// - `top_p`: nucleus sampling cutoff.
/// - `timeout_secs`: request timeout in seconds.
///
/// # Examples
///
/// ```
/// use ai_llm_service::{LlmModelConfig, LlmProvider};
///
/// let cfg = LlmModelConfig {
///     provider: LlmProvider::OpenAI,
///     model: "gpt-3.5-turbo-16k-0613".to_string(),
///     endpoint: "https://api.openai.com".to_string(),
///     api_key: Some("sk-...".to_string()),
///     api_version: None,
///     max_tokens: None,
///     temperature: Some(0.0),
///     top_p: None,
///     timeout_secs: Some(60),
/// };
/// assert_eq!(cfg.temperature, Some(0.0));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct LlmModelConfig {
    /// The LLM provider/backend.
    pub provider: LlmProvider,

    /// Model identifier or Azure deployment name.
    pub model: String,

    /// Base URL of the API.
    pub endpoint: String,

    /// API key for authentication.
    pub api_key: Option<String>,

    /// Azure OpenAI `api-version`.
    pub api_version: Option<String>,

    /// Maximum number of tokens to generate.
    pub max_tokens: Option<u32>,

    /// Sampling temperature.
    pub temperature: Option<f32>,

    /// Nucleus sampling parameter.
    pub top_p: Option<f32>,

    /// Optional request timeout (in seconds).
    pub timeout_secs: Option<u64>,
}
