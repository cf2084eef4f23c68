//! Prompt Builder — assembles the single user message sent with the report template.
//!
//! Field order is fixed (description, platforms, file content); the template was
//! tuned against this shape.

use crate::evaluation::prompts::{
    DESCRIPTION_LABEL, FILE_CONTENT_LABEL, PLATFORMS_LABEL, PLATFORM_SEPARATOR,
};
use crate::models::evaluation::TargetPlatform;

/// Builds the user message. Pure: identical input gives byte-identical output.
pub fn build_user_message(
    description: &str,
    target_platforms: &[TargetPlatform],
    file_content: Option<&str>,
) -> String {
    let mut message = format!("{DESCRIPTION_LABEL}\n{description}\n\n");

    if !target_platforms.is_empty() {
        let platforms: Vec<&str> = target_platforms.iter().map(TargetPlatform::as_str).collect();
        message.push_str(&format!(
            "{PLATFORMS_LABEL}{}\n\n",
            platforms.join(PLATFORM_SEPARATOR)
        ));
    }

    if let Some(content) = file_content.map(str::trim).filter(|c| !c.is_empty()) {
        message.push_str(&format!("{FILE_CONTENT_LABEL}\n{content}\n"));
    }

    message.trim().to_string()
}
