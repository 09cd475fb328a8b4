//! OpenAI / Azure OpenAI service for chat completions.
//!
//! Minimal, non-streaming client around the chat-completions REST API.
//! Endpoints are derived from `LlmModelConfig::endpoint`:
//! - OpenAI: `POST {endpoint}/v1/chat/completions`
//! - Azure:  `POST {endpoint}/openai/deployments/{model}/chat/completions?api-version=..`
//!
//! Constructor validation:
//! - `cfg.api_key` must be present
//! - `cfg.endpoint` must start with http:// or https://
//! - `cfg.temperature`, when set, must lie in `0.0..=2.0`
//!
//! Errors are normalized via unified error types in `error_handler`.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::header;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use crate::{
    config::{llm_model_config::LlmModelConfig, llm_provider::LlmProvider},
    error_handler::{
        AiLlmError, HttpError, ProviderError, ProviderErrorKind, is_http_endpoint, make_snippet,
        validate_range_f32,
    },
    message::{ChatMessage, ChatModel},
};

/// Thin client for the chat-completions API.
///
/// Constructed from a complete [`LlmModelConfig`]. Internally keeps a
/// preconfigured `reqwest::Client` (with timeout and default auth headers).
#[derive(Debug)]
pub struct OpenAiService {
    client: reqwest::Client,
    cfg: LlmModelConfig,
    url_chat: String,
}

impl OpenAiService {
    /// Creates a new [`OpenAiService`] from the given config.
    ///
    /// # Errors
    /// - [`ProviderErrorKind::MissingApiKey`] if `cfg.api_key` is `None` or blank
    /// - [`ProviderErrorKind::InvalidEndpoint`] if `cfg.endpoint` is invalid
    /// - [`crate::error_handler::ConfigError::OutOfRange`] for a bad temperature
    /// - [`AiLlmError::HttpTransport`] if the HTTP client cannot be built
    pub fn new(cfg: LlmModelConfig) -> Result<Self, AiLlmError> {
        let provider = cfg.provider;

        let api_key = cfg
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| ProviderError::new(provider, ProviderErrorKind::MissingApiKey))?;

        if !is_http_endpoint(&cfg.endpoint) {
            return Err(ProviderError::new(
                provider,
                ProviderErrorKind::InvalidEndpoint(cfg.endpoint.clone()),
            )
            .into());
        }

        if let Some(t) = cfg.temperature {
            validate_range_f32("temperature", t, 0.0, 2.0)?;
        }

        let timeout = cfg
            .timeout_secs
            .map(Duration::from_secs)
            .unwrap_or_else(|| Duration::from_secs(60));

        let mut headers = header::HeaderMap::new();
        let (name, value) = match provider {
            LlmProvider::OpenAI => (header::AUTHORIZATION, format!("Bearer {api_key}")),
            LlmProvider::AzureOpenAI => (header::HeaderName::from_static("api-key"), api_key),
        };
        let mut value = header::HeaderValue::from_str(&value).map_err(|e| {
            ProviderError::new(
                provider,
                ProviderErrorKind::Decode(format!("invalid API key header: {e}")),
            )
        })?;
        value.set_sensitive(true);
        headers.insert(name, value);
        headers.insert(
            header::CONTENT_TYPE,
            header::HeaderValue::from_static("application/json"),
        );

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()?;

        let url_chat = chat_url(&cfg);

        info!(
            provider = ?cfg.provider,
            model = %cfg.model,
            endpoint = %cfg.endpoint,
            timeout_secs = timeout.as_secs(),
            "OpenAiService initialized"
        );

        Ok(Self {
            client,
            cfg,
            url_chat,
        })
    }

    /// Performs a **non-streaming** chat completion request.
    ///
    /// Mapped options from config: `model`, `temperature`, `top_p`, `max_tokens`.
    ///
    /// # Errors
    /// - [`ProviderErrorKind::HttpStatus`] for non-2xx responses
    /// - [`AiLlmError::HttpTransport`] for client/network failures
    /// - [`ProviderErrorKind::Decode`] if the JSON cannot be parsed
    /// - [`ProviderErrorKind::EmptyChoices`] if no choice carries content
    pub async fn chat(&self, messages: &[ChatMessage]) -> Result<String, AiLlmError> {
        let started = Instant::now();
        let body = ChatCompletionRequest::from_cfg(&self.cfg, messages);
        let provider = self.cfg.provider;

        debug!(
            model = %self.cfg.model,
            messages = messages.len(),
            prompt_chars = messages.iter().map(|m| m.content.len()).sum::<usize>(),
            "POST {}", self.url_chat
        );

        let resp = self.client.post(&self.url_chat).json(&body).send().await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let url = strip_query(&self.url_chat);
            let text = resp.text().await.unwrap_or_default();
            let snippet = make_snippet(&text);

            error!(
                %status,
                %url,
                %snippet,
                model = %self.cfg.model,
                latency_ms = started.elapsed().as_millis(),
                "chat completions returned non-success status"
            );

            return Err(ProviderError::new(
                provider,
                ProviderErrorKind::HttpStatus(HttpError {
                    status,
                    url,
                    snippet,
                }),
            )
            .into());
        }

        let out: ChatCompletionResponse = match resp.json().await {
            Ok(v) => v,
            Err(e) => {
                error!(
                    error = %e,
                    model = %self.cfg.model,
                    latency_ms = started.elapsed().as_millis(),
                    "failed to decode chat completions response"
                );
                return Err(ProviderError::new(
                    provider,
                    ProviderErrorKind::Decode(format!(
                        "serde error: {e}; expected `choices[0].message.content`"
                    )),
                )
                .into());
            }
        };

        let content = out
            .choices
            .into_iter()
            .find_map(|c| c.message.content)
            .ok_or_else(|| ProviderError::new(provider, ProviderErrorKind::EmptyChoices))?;

        info!(
            model = %self.cfg.model,
            latency_ms = started.elapsed().as_millis(),
            answer_chars = content.len(),
            "chat completion completed"
        );

        Ok(content)
    }
}

#[async_trait]
impl ChatModel for OpenAiService {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String, AiLlmError> {
        self.chat(messages).await
    }
}

/// Builds the chat-completions URL for the config's provider.
fn chat_url(cfg: &LlmModelConfig) -> String {
    let base = cfg.endpoint.trim().trim_end_matches('/');
    match cfg.provider {
        LlmProvider::OpenAI => {
            if base.ends_with("/v1") {
                format!("{base}/chat/completions")
            } else {
                format!("{base}/v1/chat/completions")
            }
        }
        LlmProvider::AzureOpenAI => format!(
            "{base}/openai/deployments/{}/chat/completions?api-version={}",
            cfg.model,
            cfg.api_version
                .as_deref()
                .unwrap_or(crate::config::default_config::DEFAULT_AZURE_API_VERSION)
        ),
    }
}

fn strip_query(url: &str) -> String {
    url.split('?').next().unwrap_or(url).to_string()
}

/* ===========================================================================
HTTP payloads & options
======================================================================== */

/// Minimal request body for chat completions (non-streaming).
#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

impl<'a> ChatCompletionRequest<'a> {
    fn from_cfg(cfg: &'a LlmModelConfig, messages: &'a [ChatMessage]) -> Self {
        Self {
            model: &cfg.model,
            messages,
            temperature: cfg.temperature,
            top_p: cfg.top_p,
            max_tokens: cfg.max_tokens,
        }
    }
}

/// Minimal response for chat completions.
#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessageOut,
}

#[derive(Debug, Deserialize)]
struct ChatMessageOut {
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg(provider: LlmProvider, endpoint: &str) -> LlmModelConfig {
        LlmModelConfig {
            provider,
            model: "gpt-3.5-turbo-16k-0613".into(),
            endpoint: endpoint.into(),
            api_key: Some("sk-test".into()),
            api_version: Some("2023-05-15".into()),
            max_tokens: None,
            temperature: Some(0.0),
            top_p: None,
            timeout_secs: Some(5),
        }
    }

    #[test]
    fn openai_url_handles_trailing_v1() {
        assert_eq!(
            chat_url(&cfg(LlmProvider::OpenAI, "https://api.openai.com/")),
            "https://api.openai.com/v1/chat/completions"
        );
        assert_eq!(
            chat_url(&cfg(LlmProvider::OpenAI, "https://gateway.local/v1")),
            "https://gateway.local/v1/chat/completions"
        );
    }

    #[test]
    fn azure_url_uses_deployment_and_version() {
        assert_eq!(
            chat_url(&cfg(LlmProvider::AzureOpenAI, "https://yape.openai.azure.com")),
            "https://yape.openai.azure.com/openai/deployments/gpt-3.5-turbo-16k-0613/chat/completions?api-version=2023-05-15"
        );
    }

    #[test]
    fn request_body_keeps_temperature_zero() {
        let c = cfg(LlmProvider::OpenAI, "https://api.openai.com");
        let msgs = vec![ChatMessage::user("hola")];
        let body = serde_json::to_value(ChatCompletionRequest::from_cfg(&c, &msgs)).unwrap();
        assert_eq!(body["temperature"], serde_json::json!(0.0));
        assert_eq!(body["messages"][0]["role"], "user");
        assert!(body.get("max_tokens").is_none());
    }

    #[test]
    fn missing_key_is_rejected() {
        let mut c = cfg(LlmProvider::OpenAI, "https://api.openai.com");
        c.api_key = Some("   ".into());
        let err = OpenAiService::new(c).unwrap_err();
        match err {
            AiLlmError::Provider(p) => assert!(p.is_auth()),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn invalid_endpoint_is_rejected() {
        let c = cfg(LlmProvider::OpenAI, "api.openai.com");
        assert!(OpenAiService::new(c).is_err());
    }
}
