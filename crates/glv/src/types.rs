//! Core data types for image references, normalized images, and tool results.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Prefix marking an inline base64 image reference.
pub const INLINE_DATA_PREFIX: &str = "data:";

/// Canonical transport MIME type for normalized images.
pub const CANONICAL_MIME: &str = "image/jpeg";

/// Where an image comes from. Resolved once from the raw reference string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageReference {
    LocalPath(String),
    RemoteUrl(String),
    InlineData {
        mime_hint: Option<String>,
        payload: String,
    },
}

/// An image re-encoded for transport.
///
/// When `transcoded` is false the normalizer could not decode or encode the input and
/// `bytes` holds the original buffer, still labelled with [`CANONICAL_MIME`].
#[derive(Debug, Clone)]
pub struct NormalizedImage {
    pub bytes: Vec<u8>,
    pub mime: &'static str,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub transcoded: bool,
}

/// Query mode for the remote vision model.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VisionMode {
    #[default]
    Describe,
    Ocr,
    Qa,
    Detect,
}

impl VisionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            VisionMode::Describe => "describe",
            VisionMode::Ocr => "ocr",
            VisionMode::Qa => "qa",
            VisionMode::Detect => "detect",
        }
    }
}

impl std::fmt::Display for VisionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for VisionMode {
    type Err = GlvError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "describe" => Ok(VisionMode::Describe),
            "ocr" => Ok(VisionMode::Ocr),
            "qa" => Ok(VisionMode::Qa),
            "detect" => Ok(VisionMode::Detect),
            other => Err(GlvError::InvalidInput(format!(
                "Unknown vision mode: {other}. Use describe, ocr, qa, or detect."
            ))),
        }
    }
}

/// A fully prepared vision request.
#[derive(Debug, Clone)]
pub struct VisionRequest {
    pub prompt: String,
    pub mode: VisionMode,
    pub wants_structured_output: bool,
    pub image: NormalizedImage,
}

/// Metadata attached to every vision result.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisionMetadata {
    pub mode: VisionMode,
    pub return_json: bool,
    pub timestamp: i64,
}

/// Result envelope of a vision query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VisionResult {
    #[serde(rename = "ok")]
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub metadata: VisionMetadata,
}

/// Image section of a `read_image` result.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImagePayload {
    pub source: String,
    pub mime: String,
    pub data_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    pub transcoded: bool,
}

/// Result envelope of an image read.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageReadResult {
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<ImagePayload>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Opaque identifier of an uploaded file. Valid for one request only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileUploadHandle {
    pub remote_file_id: String,
}

/// Broad kind of an accepted file, derived from its extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileCategory {
    Image,
    Document,
    Spreadsheet,
    Presentation,
    Text,
}

/// Result envelope of a file extraction.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileProcessingResult {
    #[serde(rename = "ok")]
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_category: Option<FileCategory>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extract_prompt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub upload_timestamp: i64,
    pub file_size_bytes: u64,
    pub processing_duration_millis: u64,
}

/// Errors that can occur in the toolbox.
#[derive(thiserror::Error, Debug)]
pub enum GlvError {
    #[error("Invalid image reference: {0}")]
    InvalidReference(String),

    #[error("Failed to fetch image: {0}")]
    FetchFailure(String),

    #[error("Failed to read {path}: {source}")]
    ReadFailure {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{0} environment variable is required")]
    MissingCredential(&'static str),

    #[error("Vision API request failed: {0}")]
    UpstreamError(String),

    #[error("Vision API error: {0}")]
    ProviderError(String),

    #[error("Unsupported file type: .{extension}. Supported types: {allowed}")]
    UnsupportedType { extension: String, allowed: String },

    #[error("File too large: {actual_mb:.2} MB exceeds the {limit_mb} MB limit for {kind} files")]
    SizeLimitExceeded {
        actual_mb: f64,
        limit_mb: u64,
        kind: &'static str,
    },

    #[error("File upload failed: {0}")]
    UploadFailure(String),

    #[error("File content retrieval failed: {0}")]
    RetrievalFailure(String),

    #[error("Image transcoding failed: {0}")]
    TranscodeFailure(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Convenience result type.
pub type GlvResult<T> = Result<T, GlvError>;
