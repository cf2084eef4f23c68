use bytes::Bytes;
use serde::Serialize;

/// Largest file accepted at upload time.
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// A file received in a multipart request. Lives only as long as the request.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub name: String,
    pub mime_type: String,
    pub size_bytes: usize,
    pub bytes: Bytes,
}

impl UploadedFile {
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>, bytes: Bytes) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            size_bytes: bytes.len(),
            bytes,
        }
    }

    pub fn is_image(&self) -> bool {
        self.mime_type.starts_with("image/")
    }

    pub fn is_text(&self) -> bool {
        self.mime_type.starts_with("text/")
    }
}

/// Concatenated, per-file-tagged text extracted from a batch of uploads.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionResult {
    #[serde(rename = "content")]
    pub combined_text: String,
    pub file_count: usize,
}
