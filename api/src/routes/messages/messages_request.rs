use serde::Deserialize;

use crate::{
    core::configuration::ConfigOverrides, error_handler::AppError,
    routes::query::query_request::non_blank_question,
};

/// Request payload for `POST /api/messages`.
#[derive(Debug, Deserialize)]
pub struct MessagesRequest {
    pub question: String,
    /// Optional search/LLM credentials and `session_id`.
    #[serde(flatten)]
    pub overrides: ConfigOverrides,
}

impl MessagesRequest {
    pub fn question(&self) -> Result<&str, AppError> {
        non_blank_question(&self.question)
    }
}
