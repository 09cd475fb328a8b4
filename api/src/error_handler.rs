use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use ai_llm_service::AiLlmError;
use chat_history::HistoryError;
use contextor::{ContextorError, TemplateError};
use search_retriever::RetrieverError;
use thiserror::Error;
use tracing::error;

use crate::core::http::response_envelope::{ApiErrorDetail, ErrorBody};

/// Public application error type.
#[derive(Debug, Error)]
pub enum AppError {
    // --- Boot / config ---
    #[error("configuration error: {0}")]
    Config(String),

    #[error("failed to bind listener")]
    Bind(#[source] std::io::Error),

    #[error("server error")]
    Server(#[source] std::io::Error),

    // --- Request ---
    /// Body could not be read as the endpoint's JSON payload.
    #[error("{message}")]
    Rejected { status: StatusCode, message: String },

    /// Well-formed body with unusable values.
    #[error("{message}")]
    Validation {
        message: String,
        details: Vec<ApiErrorDetail>,
    },

    // --- Pipeline ---
    #[error("missing credential: {0}")]
    MissingCredential(&'static str),

    #[error(transparent)]
    Pipeline(#[from] ContextorError),

    #[error("chat history error: {0}")]
    History(#[from] HistoryError),
}

impl AppError {
    /// 422 naming the offending field.
    pub fn validation(path: &str, message: impl Into<String>) -> Self {
        let message = message.into();
        AppError::Validation {
            details: vec![ApiErrorDetail {
                path: Some(path.to_string()),
                hint: Some(message.clone()),
            }],
            message,
        }
    }

    /// Request errors are 4xx; everything past validation is a 500 and is
    /// told apart by [`AppError::error_code`].
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Rejected { status, .. } => *status,
            AppError::Validation { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Config(_)
            | AppError::Bind(_)
            | AppError::Server(_)
            | AppError::MissingCredential(_)
            | AppError::Pipeline(_)
            | AppError::History(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::Rejected { status, .. } => match *status {
                StatusCode::BAD_REQUEST => "BAD_REQUEST",
                StatusCode::UNSUPPORTED_MEDIA_TYPE => "UNSUPPORTED_MEDIA_TYPE",
                StatusCode::PAYLOAD_TOO_LARGE => "PAYLOAD_TOO_LARGE",
                _ => "UNPROCESSABLE_ENTITY",
            },
            AppError::Validation { .. } => "VALIDATION_ERROR",
            AppError::MissingCredential(_) => "MISSING_CREDENTIAL",
            AppError::Pipeline(e) if e.is_missing_credential() => "MISSING_CREDENTIAL",
            AppError::Pipeline(ContextorError::Llm(AiLlmError::Config(_)))
            | AppError::Pipeline(ContextorError::Retrieval(RetrieverError::InvalidConfig(_)))
            | AppError::Pipeline(ContextorError::Template(_))
            | AppError::Config(_) => "CONFIG_ERROR",
            AppError::Pipeline(_) => "UPSTREAM_ERROR",
            AppError::History(HistoryError::InvalidConnectionString(_)) => "CONFIG_ERROR",
            AppError::History(_) => "HISTORY_STORE_ERROR",
            AppError::Bind(_) | AppError::Server(_) => "INTERNAL_ERROR",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.error_code();
        if status.is_server_error() {
            error!(code, error = %self, "request failed");
        }
        let detail = self.to_string();
        let details = match self {
            AppError::Validation { details, .. } => details,
            AppError::Rejected { message, .. } => rejection_details(&message),
            _ => Vec::new(),
        };
        ErrorBody {
            detail,
            code,
            details,
        }
        .into_response_with_status(status)
    }
}

/// Handy result alias used across handlers.
pub type AppResult<T> = Result<T, AppError>;

impl From<JsonRejection> for AppError {
    fn from(err: JsonRejection) -> Self {
        AppError::Rejected {
            status: err.status(),
            message: err.body_text(),
        }
    }
}

impl From<RetrieverError> for AppError {
    fn from(err: RetrieverError) -> Self {
        AppError::Pipeline(err.into())
    }
}

impl From<AiLlmError> for AppError {
    fn from(err: AiLlmError) -> Self {
        AppError::Pipeline(err.into())
    }
}

impl From<TemplateError> for AppError {
    fn from(err: TemplateError) -> Self {
        AppError::Config(err.to_string())
    }
}

/// Best-effort pointer at the offending field of a serde rejection.
fn rejection_details(msg: &str) -> Vec<ApiErrorDetail> {
    let path = field_in_backticks(msg, "missing field `")
        .or_else(|| field_in_backticks(msg, "unknown field `"))
        .or_else(|| {
            // "... into the target type: question: invalid type: ..."
            msg.split_once("target type: ")
                .and_then(|(_, rest)| rest.split_once(": "))
                .map(|(field, _)| field.trim().to_string())
                .filter(|f| !f.is_empty() && !f.contains(' '))
        });
    let hint = if msg.contains("invalid type") && msg.contains("expected a string") {
        Some("Expected a JSON string here (e.g. \"¿Cómo recargo mi saldo?\").".to_string())
    } else if msg.contains("expected a map") || msg.contains("expected struct") {
        Some("Expected a JSON object here (e.g. { \"question\": \"...\" }).".to_string())
    } else if msg.contains("Content-Type") {
        Some("Send the body with `Content-Type: application/json`.".to_string())
    } else {
        None
    };

    if path.is_none() && hint.is_none() {
        return Vec::new();
    }
    vec![ApiErrorDetail { path, hint }]
}

fn field_in_backticks(msg: &str, prefix: &str) -> Option<String> {
    let start = msg.find(prefix)? + prefix.len();
    let len = msg[start..].find('`')?;
    Some(msg[start..start + len].to_string())
}
