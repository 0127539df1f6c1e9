//! Newline-delimited JSON framing.

use crate::types::{JsonRpcError, JsonRpcMessage, McpError, McpResult, RequestId};

/// Parse one line as a JSON-RPC message.
pub fn parse_message(line: &str) -> McpResult<JsonRpcMessage> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Err(McpError::ParseError("Empty message".to_string()));
    }

    serde_json::from_str(trimmed).map_err(|e| McpError::ParseError(e.to_string()))
}

/// Parse one raw input line. Bytes that are not UTF-8 are a parse error like any
/// other malformed line.
pub fn decode_line(raw: &[u8]) -> McpResult<JsonRpcMessage> {
    let line = std::str::from_utf8(raw)
        .map_err(|e| McpError::ParseError(format!("Message is not valid UTF-8: {e}")))?;
    parse_message(line)
}

/// Serialize a value as a single line with a trailing newline.
pub fn frame_message(value: &serde_json::Value) -> McpResult<String> {
    let mut json = serde_json::to_string(value)?;
    json.push('\n');
    Ok(json)
}

/// Error response for a line that could not be parsed. The id is unknown, so null.
pub fn parse_error_response(err: &McpError) -> McpResult<serde_json::Value> {
    let error = JsonRpcError::new(RequestId::Null, err.code(), err.to_string());
    Ok(serde_json::to_value(error)?)
}
