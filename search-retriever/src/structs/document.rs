use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A retrieved document snippet.
///
/// `page_content` is the index's content field; `metadata` holds every other
/// field returned for the row, including `@search.score`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub page_content: String,
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

impl Document {
    pub fn new(page_content: impl Into<String>) -> Self {
        Self {
            page_content: page_content.into(),
            metadata: Map::new(),
        }
    }

    /// Relevance score assigned by the search service, if present.
    pub fn score(&self) -> Option<f64> {
        self.metadata.get("@search.score").and_then(Value::as_f64)
    }

    /// Splits one search row into content and metadata.
    ///
    /// A missing or non-string content field yields empty content; non-string
    /// values are rendered as JSON text so nothing is silently dropped.
    pub fn from_search_row(mut row: Map<String, Value>, content_key: &str) -> Self {
        let page_content = match row.remove(content_key) {
            Some(Value::String(s)) => s,
            Some(Value::Null) | None => String::new(),
            Some(other) => other.to_string(),
        };
        Self {
            page_content,
            metadata: row,
        }
    }
}
