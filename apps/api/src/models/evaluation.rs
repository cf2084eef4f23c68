use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::models::upload::UploadedFile;

/// A platform the product should ship on. Wire values match the browser client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TargetPlatform {
    Web,
    Ios,
    Android,
    MiniProgram,
}

impl TargetPlatform {
    pub fn as_str(&self) -> &'static str {
        match self {
            TargetPlatform::Web => "web",
            TargetPlatform::Ios => "ios",
            TargetPlatform::Android => "android",
            TargetPlatform::MiniProgram => "mini-program",
        }
    }
}

impl fmt::Display for TargetPlatform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TargetPlatform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "web" => Ok(TargetPlatform::Web),
            "ios" => Ok(TargetPlatform::Ios),
            "android" => Ok(TargetPlatform::Android),
            "mini-program" => Ok(TargetPlatform::MiniProgram),
            other => Err(format!("不支持的目标平台：{other}")),
        }
    }
}

/// Collapses repeated platforms, keeping the first occurrence so the user's
/// selection order survives.
pub fn dedup_platforms(platforms: Vec<TargetPlatform>) -> Vec<TargetPlatform> {
    let mut unique = Vec::with_capacity(platforms.len());
    for platform in platforms {
        if !unique.contains(&platform) {
            unique.push(platform);
        }
    }
    unique
}

/// JSON body of `POST /api/evaluate`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluateRequest {
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub target_platforms: Vec<TargetPlatform>,
    /// Text produced by an earlier `POST /api/parse-files` call.
    #[serde(default)]
    pub file_content: Option<String>,
}

/// Everything the evaluation pipeline needs for one request, from either inbound surface.
#[derive(Debug, Clone, Default)]
pub struct EvaluationInput {
    pub description: String,
    pub target_platforms: Vec<TargetPlatform>,
    pub file_content: Option<String>,
    pub files: Vec<UploadedFile>,
}

impl From<EvaluateRequest> for EvaluationInput {
    fn from(request: EvaluateRequest) -> Self {
        Self {
            description: request.description,
            target_platforms: dedup_platforms(request.target_platforms),
            file_content: request.file_content,
            files: Vec::new(),
        }
    }
}

/// The model's Markdown report, returned to the caller untouched.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvaluationReport {
    pub markdown: String,
}
