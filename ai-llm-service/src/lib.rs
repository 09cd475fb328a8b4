//! Shared chat-completion service for the support chat backend.
//!
//! - [`config`]: model configs and provider selection, loaded from env per request
//! - [`services::open_ai_service`]: non-streaming OpenAI / Azure OpenAI client
//! - [`message`]: provider-agnostic chat messages and the [`ChatModel`] seam
//! - [`health_service`]: best-effort provider probes for `/health`
//! - [`telemetry`]: crate-scoped tracing layer

pub mod config;
pub mod error_handler;
pub mod health_service;
pub mod message;
pub mod services;
pub mod telemetry;

pub use config::{llm_model_config::LlmModelConfig, llm_provider::LlmProvider};
pub use error_handler::{AiLlmError, Result};
pub use message::{ChatMessage, ChatModel, ChatRole};
pub use services::open_ai_service::OpenAiService;
