//! Per-request chain assembly shared by the chat routes.

use ai_llm_service::config::default_config::config_chat;
use contextor::{ChainSettings, RagChain};

use crate::{
    core::{app_state::AppState, configuration::Configuration},
    error_handler::AppResult,
};

/// Builds the retriever and chat model for `cfg` and wires them into a chain.
///
/// Missing search credentials or API key fail here, before any network call.
pub(crate) fn build_chain(
    state: &AppState,
    cfg: &Configuration,
    settings: ChainSettings,
) -> AppResult<RagChain> {
    let retriever = state.backends.retriever(cfg.search_config()?)?;
    let llm_cfg = config_chat(cfg.openai_api_key.clone(), settings.temperature)?;
    let model = state.backends.chat_model(llm_cfg)?;
    Ok(RagChain::new(retriever, model, settings))
}
