//! Tool: read_image — Load an image and return it as a bounded JPEG data URL.

use serde::Deserialize;
use serde_json::{json, Value};

use glv::ImageLoader;

use crate::config::ServerContext;
use crate::types::{McpError, McpResult, ToolCallResult, ToolDefinition};

#[derive(Debug, Deserialize)]
struct ReadImageParams {
    path: String,
    #[serde(default, rename = "maxSide")]
    max_side: Option<f64>,
}

pub fn definition() -> ToolDefinition {
    ToolDefinition {
        name: "read_image".to_string(),
        description: Some(
            "Read a local, remote (http/https), or data-URL image and return a JPEG data URL with its dimensions"
                .to_string(),
        ),
        input_schema: json!({
            "type": "object",
            "properties": {
                "path": { "type": "string", "description": "Image path, URL, or data URL" },
                "maxSide": {
                    "type": "number",
                    "description": "Maximum length of the longer side in pixels (default 1024)"
                }
            },
            "required": ["path"]
        }),
    }
}

pub async fn execute(args: Value, ctx: &ServerContext) -> McpResult<ToolCallResult> {
    let params: ReadImageParams =
        serde_json::from_value(args).map_err(|e| McpError::InvalidParams(e.to_string()))?;

    let max_side = match params.max_side {
        None => None,
        Some(side) if side.is_finite() && side >= 1.0 => {
            Some(side.round().min(u32::MAX as f64) as u32)
        }
        Some(side) => {
            return Err(McpError::InvalidParams(format!(
                "'maxSide' must be a positive number, got {side}"
            )))
        }
    };

    let result = ImageLoader::new(ctx.http().clone())
        .read_image(&params.path, max_side)
        .await;

    Ok(ToolCallResult::envelope(result.ok, &result))
}
