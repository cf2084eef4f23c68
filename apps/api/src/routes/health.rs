use axum::Json;
use serde_json::{json, Value};

use crate::evaluation::prompts::SYSTEM_PROMPT_VERSION;

/// GET /health
/// Returns a simple status object with service and prompt template versions.
pub async fn health_handler() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "service": "mvp-evaluator",
        "prompt_version": SYSTEM_PROMPT_VERSION
    }))
}
