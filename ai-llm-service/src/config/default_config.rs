//! Chat model configs loaded from environment variables.
//!
//! Configs are built per request, so environment changes are picked up on the
//! next call. The API key is supplied by the caller (it may come from a request
//! override) and is not validated here; [`crate::OpenAiService::new`] rejects a
//! missing key.
//!
//! # Environment variables
//!
//! Common:
//! - `LLM_PROVIDER`     = `openai` (default) or `azure`
//! - `LLM_MAX_TOKENS`   = optional completion cap (u32)
//! - `LLM_TIMEOUT_SECS` = request timeout, default 60
//!
//! OpenAI:
//! - `OPENAI_API_BASE` = base URL, default `https://api.openai.com`
//! - `OPENAI_MODEL`    = model id, default `gpt-3.5-turbo-16k-0613`
//!
//! Azure OpenAI:
//! - `AZURE_OPENAI_ENDPOINT`    (mandatory)
//! - `AZURE_OPENAI_DEPLOYMENT`  (mandatory)
//! - `AZURE_OPENAI_API_VERSION` default `2023-05-15`

use crate::{
    config::{llm_model_config::LlmModelConfig, llm_provider::LlmProvider},
    error_handler::{AiLlmError, ConfigError, env_opt, env_opt_u32, env_opt_u64, must_env},
};

/// Model used by the support chat when `OPENAI_MODEL` is unset.
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-3.5-turbo-16k-0613";
pub const DEFAULT_OPENAI_BASE: &str = "https://api.openai.com";
pub const DEFAULT_AZURE_API_VERSION: &str = "2023-05-15";
const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Constructs the chat model config for the configured provider.
///
/// # Errors
/// - [`ConfigError::UnsupportedProvider`] for an unknown `LLM_PROVIDER`
/// - [`ConfigError::MissingVar`] for missing Azure routing variables
/// - [`ConfigError::InvalidNumber`] for malformed numeric variables
pub fn config_chat(
    api_key: Option<String>,
    temperature: f32,
) -> Result<LlmModelConfig, AiLlmError> {
    let provider = env_opt("LLM_PROVIDER")
        .map(|p| p.parse::<LlmProvider>())
        .transpose()?
        .unwrap_or_default();

    match provider {
        LlmProvider::OpenAI => config_openai_chat(api_key, temperature),
        LlmProvider::AzureOpenAI => config_azure_chat(api_key, temperature),
    }
}

/// Constructs a config for OpenAI chat completions.
///
/// # Defaults
/// - `model = gpt-3.5-turbo-16k-0613`
/// - `endpoint = https://api.openai.com`
/// - `timeout_secs = Some(60)`
pub fn config_openai_chat(
    api_key: Option<String>,
    temperature: f32,
) -> Result<LlmModelConfig, AiLlmError> {
    let model = env_opt("OPENAI_MODEL").unwrap_or_else(|| DEFAULT_OPENAI_MODEL.to_string());
    let endpoint = env_opt("OPENAI_API_BASE").unwrap_or_else(|| DEFAULT_OPENAI_BASE.to_string());

    Ok(LlmModelConfig {
        provider: LlmProvider::OpenAI,
        model,
        endpoint,
        api_key,
        api_version: None,
        max_tokens: env_opt_u32("LLM_MAX_TOKENS")?,
        temperature: Some(temperature),
        top_p: None,
        timeout_secs: Some(env_opt_u64("LLM_TIMEOUT_SECS")?.unwrap_or(DEFAULT_TIMEOUT_SECS)),
    })
}

/// Constructs a config for an Azure OpenAI deployment.
pub fn config_azure_chat(
    api_key: Option<String>,
    temperature: f32,
) -> Result<LlmModelConfig, AiLlmError> {
    let endpoint = must_env("AZURE_OPENAI_ENDPOINT")?;
    let model = must_env("AZURE_OPENAI_DEPLOYMENT")?;
    let api_version = env_opt("AZURE_OPENAI_API_VERSION")
        .unwrap_or_else(|| DEFAULT_AZURE_API_VERSION.to_string());

    Ok(LlmModelConfig {
        provider: LlmProvider::AzureOpenAI,
        model,
        endpoint,
        api_key,
        api_version: Some(api_version),
        max_tokens: env_opt_u32("LLM_MAX_TOKENS")?,
        temperature: Some(temperature),
        top_p: None,
        timeout_secs: Some(env_opt_u64("LLM_TIMEOUT_SECS")?.unwrap_or(DEFAULT_TIMEOUT_SECS)),
    })
}
