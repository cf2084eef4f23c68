mod config;
mod errors;
mod evaluation;
mod llm_client;
mod models;
mod routes;
mod state;

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{Config, API_KEY_VAR};
use crate::evaluation::pipeline::EvaluationSettings;
use crate::evaluation::prompts::SYSTEM_PROMPT_VERSION;
use crate::llm_client::LlmClient;
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first so RUST_LOG from .env is honoured
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{}={},tower_http={}",
                env!("CARGO_PKG_NAME"),
                &config.rust_log,
                &config.rust_log
            ))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting MVP Evaluator v{}", env!("CARGO_PKG_VERSION"));

    if config.qwen_api_key.is_none() {
        warn!("{API_KEY_VAR} is not set; evaluation requests will fail until it is configured");
    }

    // One DashScope client serves both report generation and image OCR
    let llm = Arc::new(LlmClient::from_config(&config)?);
    let settings = EvaluationSettings::from_config(&config);
    info!(
        "LLM client initialized (model: {}, vision model: {}, prompt: {}, timeout: {}s)",
        settings.model,
        llm_client::VISION_MODEL,
        SYSTEM_PROMPT_VERSION,
        config.llm_timeout.as_secs()
    );

    let state = AppState {
        generator: llm.clone(),
        vision: llm,
        settings,
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
