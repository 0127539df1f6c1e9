//! Remote file adapter: policy checks, multipart upload, and content retrieval.

use std::path::{Path, PathBuf};
use std::time::Instant;

use reqwest::header::CONTENT_TYPE;
use reqwest::multipart::{Form, Part};
use serde_json::Value;

use crate::config::ApiConfig;
use crate::types::{FileCategory, FileProcessingResult, FileUploadHandle, GlvError, GlvResult};

const MIB: u64 = 1024 * 1024;

/// Size limit for image files.
pub const IMAGE_SIZE_LIMIT: u64 = 5 * MIB;

/// Size limit for every other accepted file type.
pub const DOCUMENT_SIZE_LIMIT: u64 = 50 * MIB;

/// Extensions accepted for extraction.
pub const SUPPORTED_EXTENSIONS: [&str; 12] = [
    "pdf", "docx", "doc", "xls", "xlsx", "ppt", "pptx", "png", "jpg", "jpeg", "csv", "txt",
];

const IMAGE_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

/// Fixed `purpose` field of the upload form.
const FILE_PURPOSE: &str = "file-extract";

/// Category of an accepted extension, `None` when the extension is not allowed.
pub fn category_for(extension: &str) -> Option<FileCategory> {
    let category = match extension {
        "png" | "jpg" | "jpeg" => FileCategory::Image,
        "pdf" | "doc" | "docx" => FileCategory::Document,
        "xls" | "xlsx" | "csv" => FileCategory::Spreadsheet,
        "ppt" | "pptx" => FileCategory::Presentation,
        "txt" => FileCategory::Text,
        _ => return None,
    };
    Some(category)
}

/// A local file that passed the upload policy.
#[derive(Debug, Clone)]
pub struct CheckedFile {
    pub path: PathBuf,
    pub filename: String,
    pub size: u64,
    pub category: FileCategory,
}

/// Apply the upload policy: stat, then size limit, then extension allow-list.
pub async fn check_file(path: &str) -> GlvResult<CheckedFile> {
    let read_failure = |source| GlvError::ReadFailure {
        path: path.to_string(),
        source,
    };

    let metadata = tokio::fs::metadata(path).await.map_err(read_failure)?;
    if !metadata.is_file() {
        return Err(read_failure(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            "not a regular file",
        )));
    }

    let file_path = Path::new(path);
    let extension = file_path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();
    let size = metadata.len();

    let (limit, kind) = if IMAGE_EXTENSIONS.contains(&extension.as_str()) {
        (IMAGE_SIZE_LIMIT, "image")
    } else {
        (DOCUMENT_SIZE_LIMIT, "document")
    };
    if size > limit {
        return Err(GlvError::SizeLimitExceeded {
            actual_mb: size as f64 / MIB as f64,
            limit_mb: limit / MIB,
            kind,
        });
    }

    let category = category_for(&extension).ok_or_else(|| GlvError::UnsupportedType {
        extension: extension.clone(),
        allowed: SUPPORTED_EXTENSIONS.join(", "),
    })?;

    let filename = file_path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("upload")
        .to_string();

    Ok(CheckedFile {
        path: file_path.to_path_buf(),
        filename,
        size,
        category,
    })
}

/// Client for the provider's file extraction endpoints.
#[derive(Debug, Clone)]
pub struct FileClient {
    http: reqwest::Client,
    config: ApiConfig,
}

impl FileClient {
    pub fn new(http: reqwest::Client, config: ApiConfig) -> Self {
        Self { http, config }
    }

    /// Validate, upload, and fetch extracted content. Never fails; errors land in the
    /// result envelope.
    pub async fn process_file(
        &self,
        path: &str,
        extract_prompt: Option<&str>,
    ) -> FileProcessingResult {
        let started = Instant::now();
        let mut result = FileProcessingResult {
            upload_timestamp: chrono::Utc::now().timestamp_millis(),
            extract_prompt: extract_prompt.map(str::to_string),
            ..Default::default()
        };

        match self.extract(path, &mut result).await {
            Ok(()) => result.success = true,
            Err(e) => {
                tracing::warn!("file processing failed for {path}: {e}");
                result.error = Some(e.to_string());
            }
        }

        result.processing_duration_millis = started.elapsed().as_millis() as u64;
        result
    }

    async fn extract(&self, path: &str, result: &mut FileProcessingResult) -> GlvResult<()> {
        self.config.require_key()?;

        if let Ok(metadata) = tokio::fs::metadata(path).await {
            result.file_size_bytes = metadata.len();
        }
        let checked = check_file(path).await?;
        result.filename = Some(checked.filename.clone());
        result.file_category = Some(checked.category);

        let handle = self.upload(&checked).await?;
        result.file_id = Some(handle.remote_file_id.clone());

        result.content = Some(self.fetch_content(&handle).await?);
        Ok(())
    }

    /// Upload a checked file and return its remote identifier.
    pub async fn upload(&self, file: &CheckedFile) -> GlvResult<FileUploadHandle> {
        let api_key = self.config.require_key()?;
        let data = tokio::fs::read(&file.path)
            .await
            .map_err(|source| GlvError::ReadFailure {
                path: file.path.display().to_string(),
                source,
            })?;

        let mime = mime_guess::from_path(&file.path).first_or_octet_stream();
        let part = Part::bytes(data)
            .file_name(file.filename.clone())
            .mime_str(mime.as_ref())
            .map_err(|e| GlvError::UploadFailure(e.to_string()))?;
        let form = Form::new().text("purpose", FILE_PURPOSE).part("file", part);

        tracing::debug!("Uploading {} ({} bytes)", file.filename, file.size);

        let response = self
            .http
            .post(self.config.endpoint("files"))
            .bearer_auth(api_key)
            .multipart(form)
            .send()
            .await
            .map_err(|e| GlvError::UploadFailure(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GlvError::UploadFailure(format!("HTTP {status}: {body}")));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| GlvError::UploadFailure(format!("invalid response body: {e}")))?;

        let remote_file_id = match body.get("id") {
            Some(Value::String(id)) if !id.is_empty() => id.clone(),
            Some(Value::Number(id)) => id.to_string(),
            _ => {
                return Err(GlvError::UploadFailure(
                    "response did not include a file id".to_string(),
                ))
            }
        };

        tracing::info!("Uploaded {} as {remote_file_id}", file.filename);
        Ok(FileUploadHandle { remote_file_id })
    }

    /// `{base}/files/{id}/content`, with the provider-issued id escaped as one path segment.
    fn content_url(&self, remote_file_id: &str) -> GlvResult<reqwest::Url> {
        let invalid =
            |detail: String| GlvError::RetrievalFailure(format!("invalid file URL: {detail}"));
        let mut url = reqwest::Url::parse(&self.config.endpoint("files"))
            .map_err(|e| invalid(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| invalid(self.config.base_url.clone()))?
            .pop_if_empty()
            .push(remote_file_id)
            .push("content");
        Ok(url)
    }

    /// Fetch extracted content. JSON bodies come back pretty-printed.
    pub async fn fetch_content(&self, handle: &FileUploadHandle) -> GlvResult<String> {
        let api_key = self.config.require_key()?;
        let url = self.content_url(&handle.remote_file_id)?;

        let response = self
            .http
            .get(url)
            .bearer_auth(api_key)
            .send()
            .await
            .map_err(|e| GlvError::RetrievalFailure(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GlvError::RetrievalFailure(format!("HTTP {status}: {body}")));
        }

        let is_json = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.contains("application/json"));

        if is_json {
            let value: Value = response
                .json()
                .await
                .map_err(|e| GlvError::RetrievalFailure(format!("invalid JSON body: {e}")))?;
            serde_json::to_string_pretty(&value)
                .map_err(|e| GlvError::RetrievalFailure(e.to_string()))
        } else {
            response
                .text()
                .await
                .map_err(|e| GlvError::RetrievalFailure(e.to_string()))
        }
    }
}
