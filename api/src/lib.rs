//! HTTP surface of the support chat.
//!
//! - `POST /api/query`: answer + the session's in-process turn list
//! - `POST /api/messages`: answer, with history persisted in Redis
//! - `GET /api/health`: dependency report
//!
//! [`start`] is what the binary runs; [`router`] is exposed so tests (and any
//! other host) can serve the same routes over their own listener.

mod core;
mod error_handler;
mod middleware_layer;
mod routes;

use std::sync::Arc;

use axum::{
    Router, middleware,
    routing::{get, post},
};
use tokio::{net::TcpListener, signal};
use tracing::{error, info};

pub use crate::core::{
    app_state::{AppSettings, AppState},
    backends::{ChatBackends, LiveBackends},
    configuration::{ConfigOverrides, Configuration, EnvSource},
};
pub use error_handler::{AppError, AppResult};
pub use middleware_layer::request_id::REQUEST_ID_HEADER;

use crate::{
    middleware_layer::request_id::request_id,
    routes::{
        health::health_route::health_route, messages::messages_route::messages_route,
        query::query_route::query_route,
    },
};

/// All routes, with request-id/access-log middleware, bound to `state`.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/query", post(query_route))
        .route("/api/messages", post(messages_route))
        .route("/api/health", get(health_route))
        .layer(middleware::from_fn(request_id))
        .with_state(state)
}

/// Reads settings from the environment, binds, and serves until Ctrl+C.
///
/// # Errors
/// [`AppError::Config`] for malformed settings or templates,
/// [`AppError::Bind`] / [`AppError::Server`] for listener failures.
pub async fn start() -> Result<(), AppError> {
    let settings = AppSettings::from_env()?;
    let templates = settings.load_templates()?;
    let backends = LiveBackends::new().map_err(|e| AppError::Config(e.to_string()))?;

    let listener = TcpListener::bind(&settings.bind_addr)
        .await
        .map_err(AppError::Bind)?;
    info!(
        addr = %settings.bind_addr,
        history_window = settings.history_window,
        template_dir = ?settings.template_dir,
        "support chat API listening"
    );

    let state = Arc::new(AppState::new(settings, templates, Arc::new(backends)));

    // Start server with graceful shutdown on Ctrl+C
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(AppError::Server)
}

/// Resolves when Ctrl+C is pressed.
async fn shutdown_signal() {
    if let Err(e) = signal::ctrl_c().await {
        error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}
