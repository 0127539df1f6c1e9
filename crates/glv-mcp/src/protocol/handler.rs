//! Request dispatcher: routes JSON-RPC messages to the MCP methods.

use serde_json::Value;

use crate::config::ServerContext;
use crate::tools::ToolRegistry;
use crate::types::*;

use super::negotiation::negotiate;

/// Dispatches incoming JSON-RPC messages. Cheap to share behind an `Arc`; tool calls
/// run concurrently and touch no shared mutable state.
pub struct ProtocolHandler {
    context: ServerContext,
}

impl ProtocolHandler {
    pub fn new(context: ServerContext) -> Self {
        Self { context }
    }

    /// Handle one message. Returns the response for requests, `None` otherwise.
    pub async fn handle_message(&self, msg: JsonRpcMessage) -> Option<Value> {
        match msg {
            JsonRpcMessage::Request(req) => Some(self.handle_request(req).await),
            JsonRpcMessage::Notification(notif) => {
                handle_notification(&notif);
                None
            }
            _ => {
                tracing::warn!("Ignoring response message sent by client");
                None
            }
        }
    }

    async fn handle_request(&self, request: JsonRpcRequest) -> Value {
        if let Err(e) = validate_request(&request) {
            return serde_json::to_value(e.to_json_rpc_error(request.id)).unwrap_or_default();
        }

        let id = request.id.clone();
        match self.dispatch_request(&request).await {
            Ok(value) => serde_json::to_value(JsonRpcResponse::new(id, value)).unwrap_or_default(),
            Err(e) => {
                tracing::debug!("{} failed: {e}", request.method);
                serde_json::to_value(e.to_json_rpc_error(id)).unwrap_or_default()
            }
        }
    }

    async fn dispatch_request(&self, request: &JsonRpcRequest) -> McpResult<Value> {
        match request.method.as_str() {
            "initialize" => handle_initialize(request.params.clone()),
            "shutdown" => {
                tracing::info!("Shutdown requested");
                Ok(empty_object())
            }
            "ping" => Ok(empty_object()),

            "tools/list" => handle_tools_list(),
            "tools/call" => self.handle_tools_call(request.params.clone()).await,

            _ => Err(McpError::MethodNotFound(request.method.clone())),
        }
    }

    async fn handle_tools_call(&self, params: Option<Value>) -> McpResult<Value> {
        let call_params: ToolCallParams = params
            .map(serde_json::from_value)
            .transpose()
            .map_err(|e| McpError::InvalidParams(e.to_string()))?
            .ok_or_else(|| McpError::InvalidParams("Tool call params required".to_string()))?;

        let result =
            ToolRegistry::call(&call_params.name, call_params.arguments, &self.context).await?;

        serde_json::to_value(result).map_err(|e| McpError::InternalError(e.to_string()))
    }
}

/// Reject requests with the wrong protocol version, an empty method, or params that are
/// neither an object nor an array.
fn validate_request(request: &JsonRpcRequest) -> McpResult<()> {
    if request.jsonrpc != JSONRPC_VERSION {
        return Err(McpError::InvalidRequest(format!(
            "Expected jsonrpc version \"{JSONRPC_VERSION}\", got \"{}\"",
            request.jsonrpc
        )));
    }

    if request.method.trim().is_empty() {
        return Err(McpError::InvalidRequest(
            "Method name must not be empty".to_string(),
        ));
    }

    match &request.params {
        None | Some(Value::Object(_)) | Some(Value::Array(_)) => Ok(()),
        Some(other) => Err(McpError::InvalidRequest(format!(
            "params must be an object or array, got {}",
            json_type_name(other)
        ))),
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn handle_notification(notification: &JsonRpcNotification) {
    match notification.method.as_str() {
        "initialized" | "notifications/initialized" => {
            tracing::info!("MCP handshake complete");
        }
        "notifications/cancelled" => {
            tracing::info!("Cancellation requested; in-flight calls run to completion");
        }
        _ => {
            tracing::debug!("Unknown notification: {}", notification.method);
        }
    }
}

fn handle_initialize(params: Option<Value>) -> McpResult<Value> {
    let init_params: InitializeParams = params
        .map(serde_json::from_value)
        .transpose()
        .map_err(|e| McpError::InvalidParams(e.to_string()))?
        .ok_or_else(|| McpError::InvalidParams("Initialize params required".to_string()))?;

    serde_json::to_value(negotiate(&init_params))
        .map_err(|e| McpError::InternalError(e.to_string()))
}

fn handle_tools_list() -> McpResult<Value> {
    let result = ToolListResult {
        tools: ToolRegistry::list_tools(),
        next_cursor: None,
    };
    serde_json::to_value(result).map_err(|e| McpError::InternalError(e.to_string()))
}

fn empty_object() -> Value {
    Value::Object(serde_json::Map::new())
}
