use std::sync::Arc;

use crate::evaluation::pipeline::EvaluationSettings;
use crate::llm_client::{TextGenerator, VisionDescriber};

/// Shared application state injected into all route handlers via Axum extractors.
/// Immutable after startup; nothing here is mutated per request.
#[derive(Clone)]
pub struct AppState {
    /// Report generation backend. Default: the DashScope `LlmClient`.
    pub generator: Arc<dyn TextGenerator>,
    /// Image OCR backend. Default: the same `LlmClient`.
    pub vision: Arc<dyn VisionDescriber>,
    pub settings: EvaluationSettings,
}
