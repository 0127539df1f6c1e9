//! Tool registration and dispatch.

use serde_json::Value;

use crate::config::ServerContext;
use crate::types::{McpError, McpResult, ToolCallResult, ToolDefinition};

use super::{process_file, read_image, vision_query};

pub struct ToolRegistry;

impl ToolRegistry {
    pub fn list_tools() -> Vec<ToolDefinition> {
        vec![
            read_image::definition(),
            vision_query::definition(),
            process_file::definition(),
        ]
    }

    pub async fn call(
        name: &str,
        arguments: Option<Value>,
        ctx: &ServerContext,
    ) -> McpResult<ToolCallResult> {
        let args = arguments.unwrap_or(Value::Object(serde_json::Map::new()));

        tracing::debug!("tools/call {name}");
        match name {
            "read_image" => read_image::execute(args, ctx).await,
            "vision_query" => vision_query::execute(args, ctx).await,
            "process_file" => process_file::execute(args, ctx).await,
            _ => Err(McpError::ToolNotFound(name.to_string())),
        }
    }
}
