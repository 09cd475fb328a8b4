//! Unified error type for the search-retriever crate.

use reqwest::StatusCode;
use thiserror::Error;

/// Errors produced while querying the search index.
#[derive(Debug, Error)]
pub enum RetrieverError {
    // ── Configuration / credentials ─────────────────────────────────────────
    /// A credential needed to reach the index is missing.
    #[error("missing search credential: {0}")]
    MissingCredential(&'static str),

    /// Configuration combination is invalid.
    #[error("invalid search configuration: {0}")]
    InvalidConfig(String),

    // ── Transport ───────────────────────────────────────────────────────────
    /// Network/client error from reqwest.
    #[error("search transport error: {0}")]
    Http(#[from] reqwest::Error),

    /// The search service answered with a non-success status.
    #[error("search service returned HTTP {status} from {url}: {snippet}")]
    HttpStatus {
        status: StatusCode,
        url: String,
        snippet: String,
    },

    // ── Payload ─────────────────────────────────────────────────────────────
    /// The response body did not match the expected shape.
    #[error("failed to decode search response: {0}")]
    Decode(String),
}
