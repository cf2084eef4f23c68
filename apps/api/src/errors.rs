use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::llm_client::LlmError;

/// Message shown when a request carries neither a description nor any file content.
pub const MISSING_INPUT_MESSAGE: &str = "请填写 App 功能描述或上传相关文件";

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
///
/// Display strings are user-facing: the browser client shows `error` verbatim.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error("文件解析后未提取到有效内容。请确保文件包含文字内容，或尝试填写功能描述。")]
    EmptyExtraction,

    #[error(transparent)]
    Llm(#[from] LlmError),
}

impl AppError {
    pub fn missing_input() -> Self {
        AppError::Validation(MISSING_INPUT_MESSAGE.to_string())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::EmptyExtraction => StatusCode::BAD_REQUEST,
            AppError::Llm(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Short label for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "validation",
            AppError::EmptyExtraction => "empty_extraction",
            AppError::Llm(LlmError::MissingCredential) => "missing_credential",
            AppError::Llm(LlmError::QuotaExceeded { .. }) => "quota_exceeded",
            AppError::Llm(LlmError::Provider { .. }) | AppError::Llm(LlmError::Parse(_)) => {
                "provider_error"
            }
            AppError::Llm(LlmError::EmptyContent) => "empty_response",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            AppError::Validation(msg) => msg.clone(),
            AppError::EmptyExtraction => self.to_string(),
            AppError::Llm(e) => {
                tracing::error!(
                    kind = self.kind(),
                    upstream_status = ?e.upstream_status(),
                    "LLM error: {e:?}"
                );
                e.to_string()
            }
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}
