//! Public API:
//! - [`Retriever`]: async seam used by the chat pipeline.
//! - [`AzureSearchRetriever`]: top-k full-text retrieval from an Azure Cognitive Search index.
//! - [`Document`], [`SearchConfig`], [`RetrieverError`].

mod azure_search;
pub mod errors;
pub mod structs;

use async_trait::async_trait;

pub use azure_search::AzureSearchRetriever;
pub use errors::retriever_error::RetrieverError;
pub use structs::{document::Document, search_config::SearchConfig};

/// Fetches the documents relevant to a question.
#[async_trait]
pub trait Retriever: Send + Sync {
    async fn retrieve(&self, query: &str) -> Result<Vec<Document>, RetrieverError>;
}
