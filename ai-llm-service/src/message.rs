//! Provider-agnostic chat messages and the [`ChatModel`] seam.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error_handler::AiLlmError;

/// Author of a chat message, serialized the way the chat-completions API expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

/// A single chat message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

/// Anything that turns a message list into a single completion.
///
/// Implemented by [`crate::OpenAiService`]; pipelines depend on this trait so
/// they can run against deterministic stubs.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Runs one non-streaming completion and returns the answer text.
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String, AiLlmError>;
}
