//! Typed errors for the contextor crate.

use ai_llm_service::AiLlmError;
use search_retriever::RetrieverError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ContextorError {
    /// Document lookup failed (search service unreachable, bad key, ...).
    #[error("retrieval failed: {0}")]
    Retrieval(#[from] RetrieverError),

    /// Chat completion failed.
    #[error("completion failed: {0}")]
    Llm(#[from] AiLlmError),

    #[error("prompt template error: {0}")]
    Template(#[from] TemplateError),
}

impl ContextorError {
    /// True when the failure came from a credential that was never supplied,
    /// as opposed to a service rejecting or failing the call.
    pub fn is_missing_credential(&self) -> bool {
        match self {
            Self::Retrieval(RetrieverError::MissingCredential(_)) => true,
            Self::Llm(e) => e.is_missing_api_key(),
            _ => false,
        }
    }
}

#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("template is missing the {{{0}}} placeholder")]
    MissingVariable(&'static str),

    #[error("unknown template placeholder {{{0}}}")]
    UnknownVariable(String),

    #[error("cannot read template {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}
