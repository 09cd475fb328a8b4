use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

/// Success envelope: `{"result": ...}`.
#[derive(Debug, Serialize)]
pub struct ResultBody<T>
where
    T: Serialize,
{
    pub result: T,
}

impl<T> ResultBody<T>
where
    T: Serialize,
{
    pub fn new(result: T) -> Self {
        Self { result }
    }
}

/// Failure envelope: `{"detail": "...", "code": "..."}`.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// Error text, as rendered by the failing component.
    pub detail: String,
    /// Stable, machine-readable error code (e.g. "UPSTREAM_ERROR").
    pub code: &'static str,
    /// Optional per-field details for request errors.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub details: Vec<ApiErrorDetail>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApiErrorDetail {
    /// Field path like `question` or `session_id`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// Optional hint to help the client fix the request.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

impl ErrorBody {
    pub fn into_response_with_status(self, status: StatusCode) -> Response {
        (status, Json(self)).into_response()
    }
}
