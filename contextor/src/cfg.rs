//! Per-endpoint chain settings.

use crate::prompt::PromptTemplate;

/// Prior turns fed into the prompt when nothing else is configured.
pub const DEFAULT_HISTORY_WINDOW: usize = 5;
/// Upper bound for the joined `{context}` text (bytes).
pub const DEFAULT_MAX_CONTEXT_CHARS: usize = 24_000;

pub const QUERY_TEMPERATURE: f32 = 0.0;
pub const MESSAGES_TEMPERATURE: f32 = 0.7;

/// Knobs for one [`crate::RagChain`] run.
#[derive(Debug, Clone)]
pub struct ChainSettings {
    /// Sampling temperature passed to the chat model config.
    pub temperature: f32,
    pub template: PromptTemplate,
    /// Number of most recent prior turns replayed before the prompt.
    pub history_window: usize,
    /// Cap on the `{context}` text; `0` disables it.
    pub max_context_chars: usize,
}

impl ChainSettings {
    /// Settings for the ephemeral-history endpoint (deterministic answers).
    pub fn query(template: PromptTemplate, history_window: usize) -> Self {
        Self {
            temperature: QUERY_TEMPERATURE,
            template,
            history_window,
            max_context_chars: DEFAULT_MAX_CONTEXT_CHARS,
        }
    }

    /// Settings for the persistent-history endpoint.
    pub fn messages(template: PromptTemplate, history_window: usize) -> Self {
        Self {
            temperature: MESSAGES_TEMPERATURE,
            template,
            history_window,
            max_context_chars: DEFAULT_MAX_CONTEXT_CHARS,
        }
    }
}
