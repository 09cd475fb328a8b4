//! Retrieval-augmented answer pipeline for the support chat.
//!
//! Public API: [`RagChain::run`]. It retrieves the documents for a question,
//! joins their text into the prompt's `{context}`, replays a window of prior
//! turns, makes a single chat completion, and returns the answer text.
//!
//! Prompt wording is data: see [`PromptTemplates`].

mod cfg;
mod chain;
mod error;
pub mod prompt;

pub use cfg::{
    ChainSettings, DEFAULT_HISTORY_WINDOW, DEFAULT_MAX_CONTEXT_CHARS, MESSAGES_TEMPERATURE,
    QUERY_TEMPERATURE,
};
pub use chain::RagChain;
pub use error::{ContextorError, TemplateError};
pub use prompt::{PromptTemplate, PromptTemplates};
