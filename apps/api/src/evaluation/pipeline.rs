//! Evaluation pipeline — the single entry point from an inbound request to a report.
//!
//! Flow: validate → extract files (if any) → derive description → build user
//!       message → one text-generation call → return Markdown untouched.
//!
//! Strictly sequential, no retries, no partial results.

use std::fmt;

use tracing::{debug, info, warn};

use crate::config::Config;
use crate::errors::AppError;
use crate::evaluation::extractor::extract;
use crate::evaluation::prompt_builder::build_user_message;
use crate::evaluation::prompts::{FILE_ONLY_DESCRIPTION, REPORT_PARAMS, SYSTEM_PROMPT};
use crate::llm_client::{GenerationParams, GenerationRequest, TextGenerator, VisionDescriber};
use crate::models::evaluation::{EvaluationInput, EvaluationReport};

/// Model settings for the report call, fixed at startup.
#[derive(Debug, Clone)]
pub struct EvaluationSettings {
    pub model: String,
    pub system_prompt: &'static str,
    pub params: GenerationParams,
}

impl EvaluationSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            model: config.qwen_model.clone(),
            system_prompt: SYSTEM_PROMPT,
            params: REPORT_PARAMS,
        }
    }
}

/// Where a request currently is. Failures are reported with the stage they hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Received,
    Validating,
    Extracting,
    Building,
    Calling,
    Succeeded,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Received => "received",
            Stage::Validating => "validating",
            Stage::Extracting => "extracting",
            Stage::Building => "building",
            Stage::Calling => "calling",
            Stage::Succeeded => "succeeded",
        };
        f.write_str(name)
    }
}

/// Runs one evaluation end to end.
pub async fn run_evaluation(
    generator: &dyn TextGenerator,
    vision: &dyn VisionDescriber,
    settings: &EvaluationSettings,
    input: EvaluationInput,
) -> Result<EvaluationReport, AppError> {
    let mut stage = Stage::Received;
    let result = run_stages(generator, vision, settings, input, &mut stage).await;

    match &result {
        Ok(report) => info!(
            markdown_len = report.markdown.len(),
            "Evaluation succeeded"
        ),
        Err(e) => warn!(stage = %stage, kind = e.kind(), "Evaluation failed: {e}"),
    }
    result
}

fn advance(stage: &mut Stage, next: Stage) {
    debug!(from = %stage, to = %next, "Evaluation stage");
    *stage = next;
}

async fn run_stages(
    generator: &dyn TextGenerator,
    vision: &dyn VisionDescriber,
    settings: &EvaluationSettings,
    input: EvaluationInput,
    stage: &mut Stage,
) -> Result<EvaluationReport, AppError> {
    // Step 1: something to evaluate must be present
    advance(stage, Stage::Validating);
    let description = input.description.trim().to_string();
    let mut file_content = input
        .file_content
        .map(|c| c.trim().to_string())
        .unwrap_or_default();

    if description.is_empty() && file_content.is_empty() && input.files.is_empty() {
        return Err(AppError::missing_input());
    }

    // Step 2: extract uploads, falling back to the description when they yield nothing
    if !input.files.is_empty() {
        advance(stage, Stage::Extracting);
        match extract(&input.files, vision).await {
            Ok(extraction) => {
                info!(
                    file_count = extraction.file_count,
                    chars = extraction.combined_text.chars().count(),
                    "Files extracted"
                );
                if !file_content.is_empty() {
                    file_content.push_str("\n\n");
                }
                file_content.push_str(&extraction.combined_text);
            }
            Err(AppError::EmptyExtraction) if !description.is_empty() => {
                warn!("Uploaded files yielded no content; continuing with the description");
            }
            Err(e) => return Err(e),
        }
    }
    // Payloads are not needed past extraction.
    drop(input.files);

    if description.is_empty() && file_content.is_empty() {
        return Err(AppError::EmptyExtraction);
    }

    // Step 3: file-only requests get a placeholder description
    let description = if description.is_empty() {
        FILE_ONLY_DESCRIPTION.to_string()
    } else {
        description
    };

    // Step 4: build and call
    advance(stage, Stage::Building);
    let file_content = (!file_content.is_empty()).then_some(file_content.as_str());
    let user_message = build_user_message(&description, &input.target_platforms, file_content);

    advance(stage, Stage::Calling);
    info!(
        model = %settings.model,
        platforms = input.target_platforms.len(),
        "Requesting evaluation report"
    );
    let markdown = generator
        .generate(&GenerationRequest {
            model: &settings.model,
            system_prompt: settings.system_prompt,
            user_message: &user_message,
            params: settings.params,
        })
        .await?;

    advance(stage, Stage::Succeeded);
    Ok(EvaluationReport { markdown })
}
