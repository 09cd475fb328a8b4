//! POST /api/messages — answers with persistent, per-session history.

use std::sync::Arc;

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
};
use chat_history::{ChatRecord, turns_from_records};
use contextor::ChainSettings;
use tracing::{debug, info, instrument};

use crate::{
    core::{
        app_state::AppState,
        configuration::{Configuration, ENV_HISTORY_CONNECTION_STRING, ENV_HISTORY_SESSION_ID},
        http::response_envelope::ResultBody,
    },
    error_handler::{AppError, AppResult},
    routes::{messages::messages_request::MessagesRequest, pipeline::build_chain},
};

/// Handler: POST /api/messages
///
/// Loads the session's stored messages, runs the chain at temperature 0.7,
/// then appends the user message followed by the assistant message. Both
/// appends happen only after the chain succeeded; they are not atomic as a
/// pair.
///
/// # Example
/// ```bash
/// curl -X POST http://127.0.0.1:8080/api/messages \
///   -H 'content-type: application/json' \
///   -d '{"question":"¿Cómo cambio mi número?","session_id":"cliente-42"}'
/// ```
#[instrument(name = "messages_route", skip_all)]
pub async fn messages_route(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<MessagesRequest>, JsonRejection>,
) -> AppResult<Json<ResultBody<String>>> {
    let Json(req) = payload?;
    let question = req.question()?;

    let cfg = Configuration::resolve(&state.env, &req.overrides);
    debug!(?cfg, "configuration resolved");
    let conn = cfg
        .history_connection_string
        .as_deref()
        .ok_or(AppError::MissingCredential(ENV_HISTORY_CONNECTION_STRING))?;
    let session = cfg
        .session_id
        .as_deref()
        .ok_or(AppError::MissingCredential(ENV_HISTORY_SESSION_ID))?;

    let settings = ChainSettings::messages(
        state.templates.messages.clone(),
        state.settings.history_window,
    );
    let chain = build_chain(&state, &cfg, settings)?;
    let store = state.backends.history_store(conn)?;

    let prior = turns_from_records(&store.load(session).await?);
    let answer = chain.run(question, &prior).await?;

    store.append(&ChatRecord::user(session, question)).await?;
    store.append(&ChatRecord::assistant(session, answer.as_str())).await?;

    info!(session = %session, prior_turns = prior.len(), "message answered");
    Ok(Json(ResultBody::new(answer)))
}
