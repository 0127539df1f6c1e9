//! Remote vision adapter: chat-completions payload construction and response decoding.

use serde::Serialize;
use serde_json::{json, Value};

use crate::config::ApiConfig;
use crate::loader::ImageLoader;
use crate::normalize::{normalize, QUERY_MAX_SIDE, QUERY_QUALITY};
use crate::types::{
    GlvError, GlvResult, VisionMetadata, VisionMode, VisionRequest, VisionResult,
};

/// Maximum prompt length in characters, ellipsis included.
pub const MAX_PROMPT_CHARS: usize = 300;

const TEMPERATURE: f64 = 0.1;
const MAX_TOKENS: u32 = 1000;

/// System instruction for each query mode.
const INSTRUCTIONS: [(VisionMode, &str); 4] = [
    (VisionMode::Describe, "Describe the content of the image."),
    (VisionMode::Ocr, "Recognize all text in the image."),
    (VisionMode::Qa, "Answer the question based on the image."),
    (VisionMode::Detect, "Identify the objects in the image."),
];

const JSON_SUFFIX: &str = " Answer in JSON format.";

/// Request body for `POST <base>/chat/completions`.
#[derive(Debug, Serialize)]
pub struct ChatRequest<'a> {
    pub model: &'a str,
    pub messages: Vec<ChatMessage>,
    pub temperature: f64,
    pub max_tokens: u32,
}

#[derive(Debug, Serialize)]
#[serde(tag = "role", rename_all = "lowercase")]
pub enum ChatMessage {
    System { content: String },
    User { content: Vec<ContentPart> },
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Debug, Serialize)]
pub struct ImageUrl {
    pub url: String,
}

/// System instruction for a mode, with the JSON suffix when structured output is wanted.
pub fn system_instruction(mode: VisionMode, wants_json: bool) -> String {
    let base = INSTRUCTIONS
        .iter()
        .find(|(m, _)| *m == mode)
        .map(|(_, text)| *text)
        .unwrap_or(INSTRUCTIONS[0].1);
    if wants_json {
        format!("{base}{JSON_SUFFIX}")
    } else {
        base.to_string()
    }
}

/// Cut a prompt to at most [`MAX_PROMPT_CHARS`] characters.
pub fn truncate_prompt(prompt: &str) -> String {
    if prompt.chars().count() <= MAX_PROMPT_CHARS {
        return prompt.to_string();
    }
    let mut cut: String = prompt.chars().take(MAX_PROMPT_CHARS - 3).collect();
    cut.push_str("...");
    cut
}

/// Build the provider payload for a prepared request.
pub fn build_payload<'a>(model: &'a str, request: &VisionRequest) -> ChatRequest<'a> {
    ChatRequest {
        model,
        messages: vec![
            ChatMessage::System {
                content: system_instruction(request.mode, request.wants_structured_output),
            },
            ChatMessage::User {
                content: vec![
                    ContentPart::Text {
                        text: request.prompt.clone(),
                    },
                    ContentPart::ImageUrl {
                        image_url: ImageUrl {
                            url: request.image.data_url(),
                        },
                    },
                ],
            },
        ],
        temperature: TEMPERATURE,
        max_tokens: MAX_TOKENS,
    }
}

/// Extract the answer from a provider response body.
///
/// With `wants_json`, content that does not parse degrades to
/// `{"text": <content>, "parsed": false}` instead of failing.
pub fn normalize_response(body: &Value, wants_json: bool) -> GlvResult<Value> {
    if let Some(error) = body.get("error").filter(|e| !e.is_null()) {
        let message = error
            .get("message")
            .and_then(Value::as_str)
            .or_else(|| error.as_str())
            .unwrap_or("unknown provider error");
        return Err(GlvError::ProviderError(message.to_string()));
    }

    let content = body
        .pointer("/choices/0/message/content")
        .and_then(Value::as_str)
        .unwrap_or("");

    if !wants_json {
        return Ok(Value::String(content.to_string()));
    }

    Ok(serde_json::from_str(strip_code_fence(content))
        .unwrap_or_else(|_| json!({ "text": content, "parsed": false })))
}

/// Models often wrap JSON answers in a markdown fence.
fn strip_code_fence(content: &str) -> &str {
    let trimmed = content.trim();
    trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|rest| rest.strip_suffix("```"))
        .map(str::trim)
        .unwrap_or(trimmed)
}

/// Client for vision queries against the configured provider.
#[derive(Debug, Clone)]
pub struct VisionClient {
    http: reqwest::Client,
    config: ApiConfig,
    loader: ImageLoader,
}

impl VisionClient {
    pub fn new(http: reqwest::Client, config: ApiConfig) -> Self {
        let loader = ImageLoader::new(http.clone());
        Self {
            http,
            config,
            loader,
        }
    }

    /// Run a query and wrap the outcome in a result envelope. Never fails.
    pub async fn query(
        &self,
        reference: &str,
        prompt: &str,
        mode: VisionMode,
        wants_json: bool,
    ) -> VisionResult {
        let outcome = self.ask(reference, prompt, mode, wants_json).await;
        let metadata = VisionMetadata {
            mode,
            return_json: wants_json,
            timestamp: chrono::Utc::now().timestamp_millis(),
        };

        match outcome {
            Ok(result) => VisionResult {
                success: true,
                result: Some(result),
                error: None,
                metadata,
            },
            Err(e) => {
                tracing::warn!("vision query failed: {e}");
                VisionResult {
                    success: false,
                    result: None,
                    error: Some(e.to_string()),
                    metadata,
                }
            }
        }
    }

    /// Run a query, returning the typed error on failure.
    pub async fn ask(
        &self,
        reference: &str,
        prompt: &str,
        mode: VisionMode,
        wants_json: bool,
    ) -> GlvResult<Value> {
        let api_key = self.config.require_key()?;

        let bytes = self.loader.load_str(reference).await?;
        let request = VisionRequest {
            prompt: truncate_prompt(prompt),
            mode,
            wants_structured_output: wants_json,
            image: normalize(bytes, QUERY_MAX_SIDE, QUERY_QUALITY),
        };
        let payload = build_payload(&self.config.vision_model, &request);

        tracing::debug!(
            "vision query: mode={mode} json={wants_json} model={} image={} bytes",
            self.config.vision_model,
            request.image.bytes.len()
        );

        let response = self
            .http
            .post(self.config.endpoint("chat/completions"))
            .bearer_auth(api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| GlvError::UpstreamError(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(GlvError::UpstreamError(status.to_string()));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| GlvError::UpstreamError(format!("invalid response body: {e}")))?;

        normalize_response(&body, wants_json)
    }
}
