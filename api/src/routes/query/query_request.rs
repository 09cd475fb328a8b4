use serde::Deserialize;

use crate::{core::configuration::ConfigOverrides, error_handler::AppError};

/// Request payload for `POST /api/query`.
#[derive(Debug, Deserialize)]
pub struct QueryRequest {
    /// Natural language question.
    pub question: String,
    /// Optional credentials and `session_id`.
    #[serde(flatten)]
    pub overrides: ConfigOverrides,
}

impl QueryRequest {
    /// The question, rejected with 422 when blank.
    pub fn question(&self) -> Result<&str, AppError> {
        non_blank_question(&self.question)
    }
}

pub(crate) fn non_blank_question(q: &str) -> Result<&str, AppError> {
    if q.trim().is_empty() {
        Err(AppError::validation(
            "question",
            "question must not be blank",
        ))
    } else {
        Ok(q)
    }
}
