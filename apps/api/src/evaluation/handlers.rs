//! Axum route handlers for the Evaluation API.

use axum::{
    extract::{multipart::Field, rejection::JsonRejection, Multipart, State},
    Json,
};
use bytes::BytesMut;
use tracing::{info_span, Instrument};
use uuid::Uuid;

use crate::errors::AppError;
use crate::evaluation::extractor::extract;
use crate::evaluation::pipeline::run_evaluation;
use crate::models::evaluation::{
    dedup_platforms, EvaluateRequest, EvaluationInput, EvaluationReport, TargetPlatform,
};
use crate::models::upload::{ExtractionResult, UploadedFile, MAX_UPLOAD_BYTES};
use crate::state::AppState;

/// Multipart field carrying uploaded files.
const FILES_FIELD: &str = "files";
const DESCRIPTION_FIELD: &str = "description";
const PLATFORMS_FIELD: &str = "targetPlatforms";

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/evaluate
///
/// JSON body `{description, targetPlatforms?, fileContent?}` → `{markdown}`.
pub async fn handle_evaluate(
    State(state): State<AppState>,
    payload: Result<Json<EvaluateRequest>, JsonRejection>,
) -> Result<Json<EvaluationReport>, AppError> {
    let Json(request) = payload.map_err(|e| AppError::Validation(e.body_text()))?;
    evaluate(&state, EvaluationInput::from(request)).await
}

/// POST /api/evaluate/upload
///
/// One-shot multipart variant: `description`, repeated `targetPlatforms` and
/// repeated `files` parts go through extraction and evaluation in one request.
pub async fn handle_evaluate_upload(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<EvaluationReport>, AppError> {
    let form = read_form(multipart).await?;
    let input = EvaluationInput {
        description: form.description,
        target_platforms: dedup_platforms(form.platforms),
        file_content: None,
        files: form.files,
    };
    evaluate(&state, input).await
}

/// POST /api/parse-files
///
/// Extracts text from repeated `files` parts → `{content, fileCount}`.
/// Lets the browser show what was read before it asks for the report.
pub async fn handle_parse_files(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<ExtractionResult>, AppError> {
    let form = read_form(multipart).await?;
    if form.files.is_empty() {
        return Err(AppError::Validation("未上传文件".to_string()));
    }

    let span = info_span!("parse_files", request_id = %Uuid::new_v4(), files = form.files.len());
    let result = extract(&form.files, state.vision.as_ref())
        .instrument(span)
        .await?;
    Ok(Json(result))
}

async fn evaluate(
    state: &AppState,
    input: EvaluationInput,
) -> Result<Json<EvaluationReport>, AppError> {
    let span = info_span!(
        "evaluation",
        request_id = %Uuid::new_v4(),
        files = input.files.len()
    );
    let report = run_evaluation(
        state.generator.as_ref(),
        state.vision.as_ref(),
        &state.settings,
        input,
    )
    .instrument(span)
    .await?;
    Ok(Json(report))
}

// ────────────────────────────────────────────────────────────────────────────
// Multipart
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
struct UploadForm {
    description: String,
    platforms: Vec<TargetPlatform>,
    files: Vec<UploadedFile>,
}

/// Reads every part of the form. Unknown fields are ignored; files over
/// `MAX_UPLOAD_BYTES` reject the whole request.
async fn read_form(mut multipart: Multipart) -> Result<UploadForm, AppError> {
    let mut form = UploadForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(e.body_text()))?
    {
        let field_name = field.name().map(str::to_string);
        match field_name.as_deref() {
            Some(FILES_FIELD) => form.files.push(read_file(field).await?),
            Some(DESCRIPTION_FIELD) => form.description = read_text(field).await?,
            Some(PLATFORMS_FIELD) => {
                let value = read_text(field).await?;
                form.platforms
                    .push(value.parse::<TargetPlatform>().map_err(AppError::Validation)?);
            }
            _ => {}
        }
    }

    Ok(form)
}

async fn read_text(field: Field<'_>) -> Result<String, AppError> {
    field
        .text()
        .await
        .map_err(|e| AppError::Validation(e.body_text()))
}

/// Streams one file part, stopping as soon as it passes the per-file cap.
async fn read_file(mut field: Field<'_>) -> Result<UploadedFile, AppError> {
    let name = field.file_name().unwrap_or("未命名文件").to_string();
    let mime_type = field
        .content_type()
        .unwrap_or("application/octet-stream")
        .to_string();

    let mut buf = BytesMut::new();
    while let Some(chunk) = field
        .chunk()
        .await
        .map_err(|e| AppError::Validation(e.body_text()))?
    {
        if buf.len() + chunk.len() > MAX_UPLOAD_BYTES {
            return Err(AppError::Validation(format!(
                "以下文件无法上传：{name}（超过 10MB）"
            )));
        }
        buf.extend_from_slice(&chunk);
    }
    let bytes = buf.freeze();

    Ok(UploadedFile::new(name, mime_type, bytes))
}
