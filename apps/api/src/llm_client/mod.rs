/// LLM Client — the single point of entry for all DashScope (Qwen) calls.
///
/// ARCHITECTURAL RULE: No other module may call the DashScope API directly.
/// Text generation and vision OCR both go through this module, and callers see
/// them only through the `TextGenerator` / `VisionDescriber` traits.
///
/// No retries: a failed call fails the request and the user resubmits.
use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use reqwest::{Client, StatusCode};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};

pub mod classify;
pub mod prompts;
pub mod response;

use crate::config::Config;
use classify::{classify_failure, FailureKind};
use prompts::VISION_INSTRUCTION;
use response::{DashScopeErrorBody, DashScopeResponse};

const TEXT_GENERATION_PATH: &str = "/api/v1/services/aigc/text-generation/generation";
const MULTIMODAL_GENERATION_PATH: &str = "/api/v1/services/aigc/multimodal-generation/generation";

/// Vision model used for image OCR. Not configurable.
pub const VISION_MODEL: &str = "qwen-vl-max";
const VISION_MAX_TOKENS: u32 = 2000;

/// Shown to the user when DashScope reports exhausted quota or balance.
pub const QUOTA_REMEDIATION: &str = "API 配额已用完或余额不足。请检查你的阿里云账户余额和计费设置。\n\n\
解决方案：\n\
1. 访问 https://dashscope.console.aliyun.com/overview 检查账户余额\n\
2. 在 DashScope 控制台充值\n\
3. 检查使用限制和配额设置";

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("QWEN_API_KEY 未配置，请在 .env 文件或环境变量中设置")]
    MissingCredential,

    #[error("{}", QUOTA_REMEDIATION)]
    QuotaExceeded { message: String },

    #[error("通义千问 API 错误: {message}")]
    Provider { status: Option<u16>, message: String },

    #[error("通义千问 API 返回了无法解析的响应: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("通义千问 API 返回内容为空，请稍后重试")]
    EmptyContent,
}

impl LlmError {
    /// The provider's own wording where there is one, for embedding in advisory notes.
    pub fn upstream_message(&self) -> String {
        match self {
            LlmError::QuotaExceeded { message } | LlmError::Provider { message, .. } => {
                message.clone()
            }
            other => other.to_string(),
        }
    }

    /// HTTP status DashScope answered with, when the failure came from a response.
    pub fn upstream_status(&self) -> Option<u16> {
        match self {
            LlmError::Provider { status, .. } => *status,
            _ => None,
        }
    }
}

/// Generation parameters sent as DashScope `parameters`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationParams {
    pub temperature: Option<f64>,
    pub max_tokens: u32,
}

/// One text-generation call: a system instruction plus a single user message.
#[derive(Debug, Clone)]
pub struct GenerationRequest<'a> {
    pub model: &'a str,
    pub system_prompt: &'a str,
    pub user_message: &'a str,
    pub params: GenerationParams,
}

/// Produces text from a system prompt and a user message.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, request: &GenerationRequest<'_>) -> Result<String, LlmError>;
}

/// Describes the text and content of an image.
#[async_trait]
pub trait VisionDescriber: Send + Sync {
    async fn describe_image(&self, mime_type: &str, bytes: &[u8]) -> Result<String, LlmError>;
}

#[derive(Debug, Serialize)]
struct DashScopeRequest<'a, M> {
    model: &'a str,
    input: DashScopeInput<M>,
    parameters: DashScopeParameters,
}

#[derive(Debug, Serialize)]
struct DashScopeInput<M> {
    messages: Vec<M>,
}

#[derive(Debug, Serialize)]
struct DashScopeParameters {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
    max_tokens: u32,
}

impl From<GenerationParams> for DashScopeParameters {
    fn from(params: GenerationParams) -> Self {
        Self {
            temperature: params.temperature,
            max_tokens: params.max_tokens,
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct MultimodalMessage<'a> {
    role: &'a str,
    content: Vec<MultimodalPart<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum MultimodalPart<'a> {
    Image { image: String },
    Text { text: &'a str },
}

/// The DashScope client used by the whole service.
#[derive(Clone)]
pub struct LlmClient {
    client: Client,
    api_key: Option<String>,
    base_url: String,
    timeout: Duration,
}

impl LlmClient {
    pub fn new(api_key: Option<String>, base_url: String, timeout: Duration) -> reqwest::Result<Self> {
        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
            api_key,
            base_url,
            timeout,
        })
    }

    pub fn from_config(config: &Config) -> reqwest::Result<Self> {
        Self::new(
            config.qwen_api_key.clone(),
            config.dashscope_base_url.clone(),
            config.llm_timeout,
        )
    }

    fn credential(&self) -> Result<&str, LlmError> {
        self.api_key.as_deref().ok_or(LlmError::MissingCredential)
    }

    /// POSTs a DashScope request and returns the generated text.
    /// The credential is checked before anything goes on the wire.
    async fn post<T: Serialize + ?Sized>(&self, path: &str, body: &T) -> Result<String, LlmError> {
        let api_key = self.credential()?;
        let url = format!("{}{}", self.base_url, path);

        let response = self
            .client
            .post(&url)
            .bearer_auth(api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        let text = response.text().await.map_err(|e| self.transport_error(e))?;

        if !status.is_success() {
            return Err(failure_from_response(status, &text));
        }

        let parsed: DashScopeResponse = serde_json::from_str(&text)?;
        if let Some(usage) = &parsed.usage {
            debug!(
                request_id = parsed.request_id.as_deref().unwrap_or("-"),
                "DashScope call succeeded: input_tokens={:?}, output_tokens={:?}",
                usage.input_tokens,
                usage.output_tokens
            );
        }

        parsed.into_text().ok_or(LlmError::EmptyContent)
    }

    fn transport_error(&self, error: reqwest::Error) -> LlmError {
        let message = if error.is_timeout() {
            format!("请求超时（超过 {} 秒未响应）", self.timeout.as_secs())
        } else {
            error.to_string()
        };
        warn!("DashScope transport error: {message}");
        LlmError::Provider {
            status: error.status().map(|s| s.as_u16()),
            message,
        }
    }
}

#[async_trait]
impl TextGenerator for LlmClient {
    async fn generate(&self, request: &GenerationRequest<'_>) -> Result<String, LlmError> {
        let body = DashScopeRequest {
            model: request.model,
            input: DashScopeInput {
                messages: vec![
                    ChatMessage {
                        role: "system",
                        content: request.system_prompt,
                    },
                    ChatMessage {
                        role: "user",
                        content: request.user_message,
                    },
                ],
            },
            parameters: request.params.into(),
        };
        self.post(TEXT_GENERATION_PATH, &body).await
    }
}

#[async_trait]
impl VisionDescriber for LlmClient {
    async fn describe_image(&self, mime_type: &str, bytes: &[u8]) -> Result<String, LlmError> {
        let data_uri = format!("data:{mime_type};base64,{}", BASE64.encode(bytes));
        let body = DashScopeRequest {
            model: VISION_MODEL,
            input: DashScopeInput {
                messages: vec![MultimodalMessage {
                    role: "user",
                    content: vec![
                        MultimodalPart::Image { image: data_uri },
                        MultimodalPart::Text {
                            text: VISION_INSTRUCTION,
                        },
                    ],
                }],
            },
            parameters: DashScopeParameters {
                temperature: None,
                max_tokens: VISION_MAX_TOKENS,
            },
        };
        self.post(MULTIMODAL_GENERATION_PATH, &body).await
    }
}

/// Turns a non-success response into a classified error.
/// A missing or malformed body falls back to the HTTP reason phrase.
fn failure_from_response(status: StatusCode, body: &str) -> LlmError {
    let DashScopeErrorBody { code, message } = DashScopeErrorBody::from_body(body);
    let message = message.unwrap_or_else(|| {
        format!(
            "通义千问 API 调用失败: {}",
            status.canonical_reason().unwrap_or(status.as_str())
        )
    });

    warn!(
        status = status.as_u16(),
        code = code.as_deref().unwrap_or("-"),
        "DashScope returned an error: {message}"
    );

    match classify_failure(code.as_deref(), &message) {
        FailureKind::Quota => LlmError::QuotaExceeded { message },
        FailureKind::Other => LlmError::Provider {
            status: Some(status.as_u16()),
            message,
        },
    }
}
