//! File Content Extractor — turns a batch of uploads into one tagged text block.
//!
//! Files are processed one by one in input order. Per-file problems (oversized
//! image, OCR failure, unsupported type) become advisory notes inside the text;
//! only a batch with no content at all, or a missing credential, fails the call.

use tracing::{debug, warn};

use crate::errors::AppError;
use crate::llm_client::{LlmError, VisionDescriber};
use crate::models::upload::{ExtractionResult, UploadedFile};

/// Images above this size are not sent to the vision model.
pub const MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;

const IMAGE_LABEL: &str = "图片";
const TEXT_LABEL: &str = "文本";

const OVERSIZED_IMAGE_NOTE: &str = "注意：图片文件较大（超过 5MB），可能影响解析速度。建议压缩后再上传。";
const IMAGE_QUOTA_NOTE: &str = "注意：图片解析失败，可能是 API 配额不足。请检查 DashScope 账户余额。";
const UNSUPPORTED_NOTE: &str = "注意：此文件类型需要额外配置解析库，当前版本暂不支持自动解析。\
    请将内容复制粘贴到功能描述中，或转换为图片/文本格式上传。";

/// Header that opens every file section.
pub fn section_header(name: &str, label: &str) -> String {
    format!("【文件：{name}（{label}）】")
}

fn section(name: &str, label: &str, body: &str) -> String {
    format!("\n\n{}\n{body}", section_header(name, label))
}

/// Extracts text from `files` in order, calling the vision model for images.
pub async fn extract(
    files: &[UploadedFile],
    vision: &dyn VisionDescriber,
) -> Result<ExtractionResult, AppError> {
    let mut combined = String::new();

    for file in files {
        if let Some(part) = extract_file(file, vision).await? {
            combined.push_str(&part);
        } else {
            warn!(file = %file.name, "No content extracted from file");
        }
    }

    let combined_text = combined.trim().to_string();
    if combined_text.is_empty() {
        return Err(AppError::EmptyExtraction);
    }

    Ok(ExtractionResult {
        combined_text,
        file_count: files.len(),
    })
}

/// One file's section, or `None` when the file holds no usable content.
async fn extract_file(
    file: &UploadedFile,
    vision: &dyn VisionDescriber,
) -> Result<Option<String>, AppError> {
    debug!(
        file = %file.name,
        mime = %file.mime_type,
        size = file.size_bytes,
        "Extracting file"
    );

    if file.is_image() {
        return extract_image(file, vision).await;
    }

    if file.is_text() {
        let text = String::from_utf8_lossy(&file.bytes);
        if text.trim().is_empty() {
            return Ok(None);
        }
        return Ok(Some(section(&file.name, TEXT_LABEL, &text)));
    }

    Ok(Some(section(&file.name, &file.mime_type, UNSUPPORTED_NOTE)))
}

async fn extract_image(
    file: &UploadedFile,
    vision: &dyn VisionDescriber,
) -> Result<Option<String>, AppError> {
    if file.size_bytes > MAX_IMAGE_BYTES {
        let size_mb = file.size_bytes as f64 / 1024.0 / 1024.0;
        let label = format!("{IMAGE_LABEL}，{size_mb:.2}MB");
        return Ok(Some(section(&file.name, &label, OVERSIZED_IMAGE_NOTE)));
    }

    match vision.describe_image(&file.mime_type, &file.bytes).await {
        Ok(caption) => Ok(Some(section(&file.name, IMAGE_LABEL, &caption))),
        Err(LlmError::MissingCredential) => Err(LlmError::MissingCredential.into()),
        Err(LlmError::EmptyContent) => Ok(None),
        Err(LlmError::QuotaExceeded { message }) => {
            warn!(file = %file.name, "Image OCR hit quota: {message}");
            Ok(Some(section(&file.name, IMAGE_LABEL, IMAGE_QUOTA_NOTE)))
        }
        Err(e) => {
            warn!(file = %file.name, "Image OCR failed: {e}");
            let note = format!(
                "注意：图片解析失败（{}）。请尝试压缩图片或转换为文本格式。",
                e.upstream_message()
            );
            Ok(Some(section(&file.name, IMAGE_LABEL, &note)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bytes::Bytes;
    use std::sync::Mutex;

    /// Vision fake that replays a fixed outcome and records which files it saw.
    struct FakeVision {
        outcome: fn() -> Result<String, LlmError>,
        calls: Mutex<Vec<String>>,
    }

    impl FakeVision {
        fn new(outcome: fn() -> Result<String, LlmError>) -> Self {
            Self {
                outcome,
                calls: Mutex::new(Vec::new()),
            }
        }

        fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl VisionDescriber for FakeVision {
        async fn describe_image(&self, mime_type: &str, _bytes: &[u8]) -> Result<String, LlmError> {
            self.calls.lock().unwrap().push(mime_type.to_string());
            (self.outcome)()
        }
    }

    fn caption() -> Result<String, LlmError> {
        Ok("首页有登录按钮".to_string())
    }

    fn text_file(name: &str, content: &str) -> UploadedFile {
        UploadedFile::new(name, "text/plain", Bytes::from(content.to_string()))
    }

    fn image(name: &str, size: usize) -> UploadedFile {
        UploadedFile::new(name, "image/png", Bytes::from(vec![0u8; size]))
    }

    #[tokio::test]
    async fn test_text_file_is_verbatim_and_tagged() {
        let vision = FakeVision::new(caption);
        let files = vec![text_file("需求.txt", "user registration, checkout flow")];

        let result = extract(&files, &vision).await.unwrap();

        assert_eq!(
            result.combined_text,
            "【文件：需求.txt（文本）】\nuser registration, checkout flow"
        );
        assert_eq!(result.file_count, 1);
        assert_eq!(vision.call_count(), 0);
    }

    #[tokio::test]
    async fn test_order_preserved_with_one_header_per_file() {
        let vision = FakeVision::new(caption);
        let files = vec![
            text_file("a.md", "第一"),
            image("b.png", 16),
            text_file("c.txt", "第三"),
        ];

        let result = extract(&files, &vision).await.unwrap();

        assert_eq!(result.combined_text.matches("【文件：").count(), 3);
        let a = result.combined_text.find("a.md").unwrap();
        let b = result.combined_text.find("b.png").unwrap();
        let c = result.combined_text.find("c.txt").unwrap();
        assert!(a < b && b < c);
        assert!(result.combined_text.contains("首页有登录按钮"));
    }

    #[tokio::test]
    async fn test_oversized_image_makes_no_vision_call() {
        let vision = FakeVision::new(caption);
        let files = vec![
            image("big.png", MAX_IMAGE_BYTES + 1),
            text_file("orders.txt", "订单管理"),
        ];

        let result = extract(&files, &vision).await.unwrap();

        assert_eq!(vision.call_count(), 0);
        assert!(result
            .combined_text
            .contains("【文件：big.png（图片，5.00MB）】\n注意：图片文件较大"));
        assert!(result.combined_text.contains("订单管理"));
    }

    #[tokio::test]
    async fn test_image_at_cap_is_still_described() {
        let vision = FakeVision::new(caption);
        let result = extract(&[image("edge.png", MAX_IMAGE_BYTES)], &vision)
            .await
            .unwrap();
        assert_eq!(vision.call_count(), 1);
        assert!(result.combined_text.contains("首页有登录按钮"));
    }

    #[tokio::test]
    async fn test_quota_failure_becomes_advisory_note() {
        let vision = FakeVision::new(|| {
            Err(LlmError::QuotaExceeded {
                message: "quota exceeded".to_string(),
            })
        });
        let result = extract(&[image("shot.png", 8)], &vision).await.unwrap();
        assert!(result.combined_text.contains(IMAGE_QUOTA_NOTE));
    }

    #[tokio::test]
    async fn test_generic_failure_embeds_upstream_message() {
        let vision = FakeVision::new(|| {
            Err(LlmError::Provider {
                status: Some(400),
                message: "image format illegal".to_string(),
            })
        });
        let result = extract(&[image("shot.png", 8)], &vision).await.unwrap();
        assert!(result
            .combined_text
            .contains("注意：图片解析失败（image format illegal）"));
    }

    #[tokio::test]
    async fn test_missing_credential_aborts() {
        let vision = FakeVision::new(|| Err(LlmError::MissingCredential));
        let err = extract(&[image("shot.png", 8)], &vision).await.unwrap_err();
        assert!(matches!(err, AppError::Llm(LlmError::MissingCredential)));
    }

    #[tokio::test]
    async fn test_unsupported_type_gets_notice_without_call() {
        let vision = FakeVision::new(caption);
        let file = UploadedFile::new("plan.pdf", "application/pdf", Bytes::from_static(b"%PDF"));

        let result = extract(&[file], &vision).await.unwrap();

        assert_eq!(vision.call_count(), 0);
        assert!(result
            .combined_text
            .starts_with("【文件：plan.pdf（application/pdf）】\n注意：此文件类型"));
    }

    #[tokio::test]
    async fn test_only_empty_files_is_empty_extraction() {
        let vision = FakeVision::new(|| Err(LlmError::EmptyContent));
        let files = vec![text_file("blank.txt", "  \n"), image("blank.png", 4)];

        let err = extract(&files, &vision).await.unwrap_err();

        assert!(matches!(err, AppError::EmptyExtraction));
    }

    #[tokio::test]
    async fn test_no_files_is_empty_extraction() {
        let vision = FakeVision::new(caption);
        let err = extract(&[], &vision).await.unwrap_err();
        assert!(matches!(err, AppError::EmptyExtraction));
    }

    #[tokio::test]
    async fn test_invalid_utf8_is_replaced_not_rejected() {
        let vision = FakeVision::new(caption);
        let file = UploadedFile::new("notes.txt", "text/plain", Bytes::from(vec![b'o', b'k', 0xff]));
        let result = extract(&[file], &vision).await.unwrap();
        assert!(result.combined_text.contains("ok\u{fffd}"));
    }
}
