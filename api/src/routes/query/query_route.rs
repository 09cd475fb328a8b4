//! POST /api/query — answers with session-scoped, in-process history.

use std::sync::Arc;

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
};
use chat_history::Turn;
use contextor::ChainSettings;
use tracing::{debug, info, instrument};

use crate::{
    core::{
        app_state::AppState, configuration::Configuration,
        http::response_envelope::ResultBody,
    },
    error_handler::{AppError, AppResult},
    routes::{pipeline::build_chain, query::query_request::QueryRequest},
};

/// Handler: POST /api/query
///
/// Runs the chain at temperature 0 with the session's prior turns, appends
/// exactly one `(question, answer)` turn, and returns every turn of the
/// session, oldest first. Nothing is recorded when the chain fails.
///
/// # Example
/// ```bash
/// curl -X POST http://127.0.0.1:8080/api/query \
///   -H 'content-type: application/json' \
///   -d '{"question":"¿Puedo usar Yape desde Argentina?","session_id":"cliente-42"}'
/// ```
#[instrument(name = "query_route", skip_all)]
pub async fn query_route(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<QueryRequest>, JsonRejection>,
) -> AppResult<Json<ResultBody<Vec<Turn>>>> {
    let Json(req) = payload?;
    let question = req.question()?;

    let cfg = Configuration::resolve(&state.env, &req.overrides);
    let session = cfg.session_id.clone().ok_or_else(|| {
        AppError::validation(
            "session_id",
            "session_id is required (request body or CHAT_HISTORY_SESSION_ID)",
        )
    })?;
    debug!(?cfg, "configuration resolved");

    let settings = ChainSettings::query(
        state.templates.query.clone(),
        state.settings.history_window,
    );
    let chain = build_chain(&state, &cfg, settings)?;

    let prior = state.ephemeral.turns(&session).await;
    let answer = chain.run(question, &prior).await?;
    let turns = state
        .ephemeral
        .append_turn(&session, question, &answer)
        .await?;

    info!(session = %session, turns = turns.len(), "query answered");
    Ok(Json(ResultBody::new(turns)))
}
