use ai_llm_service::telemetry;
use anyhow::Context;
use tracing::{Level, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env is optional: under the Functions host settings arrive as env vars.
    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            return Err(e).context("failed to load .env");
        }
    }

    tracing_subscriber::registry()
        .with(telemetry::env_filter_with_level("info", Level::INFO))
        .with(telemetry::layer())
        .init();

    info!(version = env!("CARGO_PKG_VERSION"), "starting support chat backend");

    api::start().await.context("support chat API stopped with an error")?;

    Ok(())
}
