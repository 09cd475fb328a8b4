//! GET /api/health — best-effort dependency report. Always 200.

use std::sync::Arc;

use ai_llm_service::{config::default_config::config_chat, health_service::HealthStatus};
use axum::{Json, extract::State};
use contextor::QUERY_TEMPERATURE;
use serde::Serialize;
use tracing::warn;

use crate::core::{
    app_state::AppState, configuration::Configuration, http::response_envelope::ResultBody,
};

#[derive(Debug, Serialize)]
pub struct HealthReport {
    /// Chat-completion provider probe; `None` when no model config could be built.
    pub llm: Option<HealthStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub llm_error: Option<String>,
    /// All three search credentials are present.
    pub search_configured: bool,
    /// History connection string is present.
    pub history_configured: bool,
}

pub async fn health_route(State(state): State<Arc<AppState>>) -> Json<ResultBody<HealthReport>> {
    let cfg = Configuration::from_source(&state.env);

    let (llm, llm_error) = match config_chat(cfg.openai_api_key.clone(), QUERY_TEMPERATURE) {
        Ok(llm_cfg) => (Some(state.backends.llm_health(&llm_cfg).await), None),
        Err(e) => {
            warn!(error = %e, "cannot build chat model config for health probe");
            (None, Some(e.to_string()))
        }
    };

    Json(ResultBody::new(HealthReport {
        llm,
        llm_error,
        search_configured: cfg.search_config().is_ok_and(|c| c.is_configured()),
        history_configured: cfg.history_connection_string.is_some(),
    }))
}
