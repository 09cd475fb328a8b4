use std::str::FromStr;

use crate::error_handler::ConfigError;

/// Represents the hosted chat-completion backend.
///
/// Both variants speak the OpenAI chat-completions wire format; they differ in
/// URL layout and authentication header:
///
/// - [`LlmProvider::OpenAI`]: `POST {endpoint}/v1/chat/completions`, `Authorization: Bearer <key>`
/// - [`LlmProvider::AzureOpenAI`]: `POST {endpoint}/openai/deployments/{model}/chat/completions?api-version=..`,
///   `api-key: <key>`
///
/// # Examples
///
/// ```
/// use ai_llm_service::LlmProvider;
///
/// let p: LlmProvider = "azure".parse().unwrap();
/// assert_eq!(p, LlmProvider::AzureOpenAI);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum LlmProvider {
    /// api.openai.com (or any compatible gateway).
    #[default]
    OpenAI,
    /// Azure OpenAI resource, where `model` is the deployment name.
    AzureOpenAI,
}

impl FromStr for LlmProvider {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "openai" | "chatgpt" => Ok(LlmProvider::OpenAI),
            "azure" | "azure_openai" | "azure-openai" => Ok(LlmProvider::AzureOpenAI),
            other => Err(ConfigError::UnsupportedProvider(other.to_string())),
        }
    }
}
