// Prompt constants for the evaluation pipeline.

use crate::llm_client::GenerationParams;

/// Version tag of the report template below. Bump together with the file name.
pub const SYSTEM_PROMPT_VERSION: &str = "mvp-report-v1";

/// System instruction for the MVP evaluation report. Passed through unchanged;
/// the structure it asks for is never checked on the model's output.
pub const SYSTEM_PROMPT: &str = include_str!("../../prompts/mvp_report_v1.md");

/// Low temperature keeps reports for the same idea close to each other.
pub const REPORT_PARAMS: GenerationParams = GenerationParams {
    temperature: Some(0.3),
    max_tokens: 3000,
};

/// Stands in for the description when the requirements came only from uploads.
pub const FILE_ONLY_DESCRIPTION: &str = "（用户通过上传文件提供需求）";

pub const DESCRIPTION_LABEL: &str = "我想开发的 App 功能描述：";
pub const PLATFORMS_LABEL: &str = "目标平台：";
pub const PLATFORM_SEPARATOR: &str = "、";
pub const FILE_CONTENT_LABEL: &str = "上传文件中提取的需求内容：";
