//! Tool: vision_query — Ask the vision model about an image.

use serde::Deserialize;
use serde_json::{json, Value};

use glv::{VisionClient, VisionMode};

use crate::config::ServerContext;
use crate::types::{McpError, McpResult, ToolCallResult, ToolDefinition};

#[derive(Debug, Deserialize)]
struct QueryParams {
    path: String,
    prompt: String,
    #[serde(default)]
    mode: VisionMode,
    #[serde(default, rename = "returnJson")]
    return_json: bool,
}

pub fn definition() -> ToolDefinition {
    ToolDefinition {
        name: "vision_query".to_string(),
        description: Some(
            "Ask the GLM vision model about an image: describe it, read its text (OCR), answer a question, or detect objects"
                .to_string(),
        ),
        input_schema: json!({
            "type": "object",
            "properties": {
                "path": { "type": "string", "description": "Image path, URL, or data URL" },
                "prompt": { "type": "string", "description": "Question or instruction (truncated to 300 characters)" },
                "mode": {
                    "type": "string",
                    "enum": ["describe", "ocr", "qa", "detect"],
                    "default": "describe"
                },
                "returnJson": {
                    "type": "boolean",
                    "default": false,
                    "description": "Ask for a JSON answer and parse it"
                }
            },
            "required": ["path", "prompt"]
        }),
    }
}

pub async fn execute(args: Value, ctx: &ServerContext) -> McpResult<ToolCallResult> {
    let params: QueryParams =
        serde_json::from_value(args).map_err(|e| McpError::InvalidParams(e.to_string()))?;

    let client = VisionClient::new(ctx.http().clone(), ctx.api_config());
    let result = client
        .query(&params.path, &params.prompt, params.mode, params.return_json)
        .await;

    Ok(ToolCallResult::envelope(result.success, &result))
}
