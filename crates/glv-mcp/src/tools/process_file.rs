//! Tool: process_file — Upload a document for remote content extraction.

use serde::Deserialize;
use serde_json::{json, Value};

use glv::files::SUPPORTED_EXTENSIONS;
use glv::FileClient;

use crate::config::ServerContext;
use crate::types::{McpError, McpResult, ToolCallResult, ToolDefinition};

#[derive(Debug, Deserialize)]
struct ProcessParams {
    #[serde(rename = "filePath")]
    file_path: String,
    #[serde(default, rename = "extractPrompt")]
    extract_prompt: Option<String>,
}

pub fn definition() -> ToolDefinition {
    ToolDefinition {
        name: "process_file".to_string(),
        description: Some(format!(
            "Upload a local file for content extraction and return the extracted content. \
             Supported: {}. Images up to 5 MB, other files up to 50 MB.",
            SUPPORTED_EXTENSIONS.join(", ")
        )),
        input_schema: json!({
            "type": "object",
            "properties": {
                "filePath": { "type": "string", "description": "Path to the local file" },
                "extractPrompt": {
                    "type": "string",
                    "description": "Optional note on what to extract; echoed in the result"
                }
            },
            "required": ["filePath"]
        }),
    }
}

pub async fn execute(args: Value, ctx: &ServerContext) -> McpResult<ToolCallResult> {
    let params: ProcessParams =
        serde_json::from_value(args).map_err(|e| McpError::InvalidParams(e.to_string()))?;

    let client = FileClient::new(ctx.http().clone(), ctx.api_config());
    let result = client
        .process_file(&params.file_path, params.extract_prompt.as_deref())
        .await;

    Ok(ToolCallResult::envelope(result.success, &result))
}
