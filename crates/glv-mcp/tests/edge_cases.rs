//! Edge case integration tests for glv-mcp.
//!
//! Drives the protocol handler end to end against a mocked provider.

use base64::Engine;
use serde_json::{json, Value};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use glv::ApiConfig;
use glv_mcp::config::ServerContext;
use glv_mcp::protocol::ProtocolHandler;
use glv_mcp::transport::framing;
use glv_mcp::types::*;

// ─────────────────────── helpers ───────────────────────

/// Handler whose provider calls go to `base_url` with a fixed key.
fn handler_for(base_url: &str, api_key: Option<&str>) -> ProtocolHandler {
    let config = ApiConfig::new(api_key.map(str::to_string), base_url);
    ProtocolHandler::new(ServerContext::fixed(config))
}

/// Build an MCP JSON-RPC request.
fn mcp_request(id: i64, method: &str, params: Value) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "method": method,
        "params": params
    })
}

fn tool_call(id: i64, name: &str, arguments: Value) -> Value {
    mcp_request(id, "tools/call", json!({ "name": name, "arguments": arguments }))
}

/// Send a JSON-RPC message through the handler and return the response.
async fn send(handler: &ProtocolHandler, msg: Value) -> Option<Value> {
    let parsed: JsonRpcMessage = serde_json::from_value(msg).unwrap();
    handler.handle_message(parsed).await
}

/// Send and unwrap the response.
async fn send_unwrap(handler: &ProtocolHandler, msg: Value) -> Value {
    send(handler, msg).await.expect("expected response")
}

/// Parse the JSON envelope carried in a tool result's first text block.
fn envelope(resp: &Value) -> Value {
    let text = resp["result"]["content"][0]["text"]
        .as_str()
        .unwrap_or_else(|| panic!("no text content in {resp}"));
    serde_json::from_str(text).unwrap()
}

fn is_error(resp: &Value) -> bool {
    resp["result"]["isError"].as_bool().unwrap_or(false)
}

fn make_png(width: u32, height: u32) -> Vec<u8> {
    let img = image::DynamicImage::new_rgb8(width, height);
    let mut buf = Vec::new();
    let encoder = image::codecs::png::PngEncoder::new(&mut buf);
    img.write_with_encoder(encoder).unwrap();
    buf
}

fn png_data_url(width: u32, height: u32) -> String {
    let b64 = base64::engine::general_purpose::STANDARD.encode(make_png(width, height));
    format!("data:image/png;base64,{b64}")
}

fn completion(content: &str) -> Value {
    json!({
        "choices": [{ "message": { "role": "assistant", "content": content } }]
    })
}

// ═══════════════════════════════════════════════════════
// PROTOCOL
// ═══════════════════════════════════════════════════════

#[tokio::test]
async fn test_initialize_and_list_tools() {
    let handler = handler_for("http://127.0.0.1:9", None);

    let resp = send_unwrap(
        &handler,
        mcp_request(
            0,
            "initialize",
            json!({
                "protocolVersion": "2024-11-05",
                "capabilities": {},
                "clientInfo": { "name": "test-client", "version": "1.0" }
            }),
        ),
    )
    .await;
    assert_eq!(resp["result"]["serverInfo"]["name"], "glv-mcp");
    assert!(resp["result"]["capabilities"]["tools"].is_object());

    assert!(send(&handler, json!({ "jsonrpc": "2.0", "method": "notifications/initialized" }))
        .await
        .is_none());

    let resp = send_unwrap(&handler, mcp_request(1, "tools/list", json!({}))).await;
    let names: Vec<&str> = resp["result"]["tools"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["read_image", "vision_query", "process_file"]);
}

#[tokio::test]
async fn test_malformed_json() {
    let err = framing::parse_message(r#"{"broken":"#).unwrap_err();
    assert_eq!(err.code(), -32700);
    assert!(framing::parse_message("").is_err());
}

#[tokio::test]
async fn test_unknown_method() {
    let handler = handler_for("http://127.0.0.1:9", None);
    let resp = send_unwrap(&handler, mcp_request(2, "resources/list", json!({}))).await;
    assert_eq!(resp["error"]["code"], -32601);
    assert_eq!(resp["id"], 2);
}

#[tokio::test]
async fn test_wrong_jsonrpc_version() {
    let handler = handler_for("http://127.0.0.1:9", None);
    let msg = json!({ "jsonrpc": "1.0", "id": 3, "method": "ping" });
    let resp = send_unwrap(&handler, msg).await;
    assert_eq!(resp["error"]["code"], -32600);
}

#[tokio::test]
async fn test_fractional_id_gets_a_reply() {
    let handler = handler_for("http://127.0.0.1:9", None);
    let resp = send_unwrap(&handler, json!({ "jsonrpc": "2.0", "id": 1.5, "method": "ping" })).await;
    assert_eq!(resp["id"], 1.5);
    assert!(resp["result"].is_object());
}

#[tokio::test]
async fn test_scalar_params_rejected() {
    let handler = handler_for("http://127.0.0.1:9", None);
    let resp = send_unwrap(&handler, mcp_request(7, "tools/call", json!("read_image"))).await;
    assert_eq!(resp["error"]["code"], -32600);
    assert_eq!(resp["id"], 7);
}

#[tokio::test]
async fn test_unknown_tool() {
    let handler = handler_for("http://127.0.0.1:9", None);
    let resp = send_unwrap(&handler, tool_call(4, "vision_capture", json!({}))).await;
    assert_eq!(resp["error"]["code"], -32803);
}

#[tokio::test]
async fn test_missing_required_argument() {
    let handler = handler_for("http://127.0.0.1:9", None);
    let resp = send_unwrap(&handler, tool_call(5, "vision_query", json!({ "path": "a.png" }))).await;
    assert_eq!(resp["error"]["code"], -32602);
}

#[tokio::test]
async fn test_unknown_mode_is_invalid_params() {
    let handler = handler_for("http://127.0.0.1:9", Some("k"));
    let resp = send_unwrap(
        &handler,
        tool_call(
            6,
            "vision_query",
            json!({ "path": "a.png", "prompt": "hi", "mode": "segment" }),
        ),
    )
    .await;
    assert_eq!(resp["error"]["code"], -32602);
}

// ═══════════════════════════════════════════════════════
// read_image
// ═══════════════════════════════════════════════════════

#[tokio::test]
async fn test_read_image_inline() {
    let handler = handler_for("http://127.0.0.1:9", None);
    let resp = send_unwrap(
        &handler,
        tool_call(10, "read_image", json!({ "path": png_data_url(2048, 1024) })),
    )
    .await;

    assert!(!is_error(&resp), "unexpected error: {resp}");
    let body = envelope(&resp);
    assert_eq!(body["ok"], true);
    assert_eq!(body["image"]["mime"], "image/jpeg");
    assert_eq!(body["image"]["width"], 1024);
    assert_eq!(body["image"]["height"], 512);
    assert!(body["image"]["dataUrl"]
        .as_str()
        .unwrap()
        .starts_with("data:image/jpeg;base64,"));
    assert_eq!(body["image"]["source"], "data:image/png;base64,...");
}

#[tokio::test]
async fn test_read_image_custom_max_side() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("wide.png");
    std::fs::write(&file, make_png(1000, 500)).unwrap();

    let handler = handler_for("http://127.0.0.1:9", None);
    let resp = send_unwrap(
        &handler,
        tool_call(
            11,
            "read_image",
            json!({ "path": file.to_str().unwrap(), "maxSide": 200 }),
        ),
    )
    .await;

    let body = envelope(&resp);
    assert_eq!(body["image"]["width"], 200);
    assert_eq!(body["image"]["height"], 100);
}

#[tokio::test]
async fn test_read_image_zero_max_side() {
    let handler = handler_for("http://127.0.0.1:9", None);
    let resp = send_unwrap(
        &handler,
        tool_call(12, "read_image", json!({ "path": "a.png", "maxSide": 0 })),
    )
    .await;
    assert_eq!(resp["error"]["code"], -32602);
}

#[tokio::test]
async fn test_read_image_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("missing.png");

    let handler = handler_for("http://127.0.0.1:9", None);
    let resp = send_unwrap(
        &handler,
        tool_call(13, "read_image", json!({ "path": missing.to_str().unwrap() })),
    )
    .await;

    assert!(is_error(&resp));
    let body = envelope(&resp);
    assert_eq!(body["ok"], false);
    assert!(body["error"].as_str().unwrap().contains("missing.png"));
}

// ═══════════════════════════════════════════════════════
// vision_query
// ═══════════════════════════════════════════════════════

#[tokio::test]
async fn test_vision_query_structured() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("authorization", "Bearer test-key"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(completion("```json\n{\"objects\": [\"cat\", \"sofa\"]}\n```")),
        )
        .expect(1)
        .mount(&server)
        .await;

    let handler = handler_for(&server.uri(), Some("test-key"));
    let resp = send_unwrap(
        &handler,
        tool_call(
            20,
            "vision_query",
            json!({
                "path": png_data_url(64, 64),
                "prompt": "What is in the picture?",
                "mode": "detect",
                "returnJson": true
            }),
        ),
    )
    .await;

    assert!(!is_error(&resp), "unexpected error: {resp}");
    let body = envelope(&resp);
    assert_eq!(body["ok"], true);
    assert_eq!(body["result"]["objects"][1], "sofa");
    assert_eq!(body["metadata"]["mode"], "detect");
    assert_eq!(body["metadata"]["returnJson"], true);
    assert!(body["metadata"]["timestamp"].as_i64().unwrap() > 0);
}

#[tokio::test]
async fn test_vision_query_missing_credential() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion("never")))
        .expect(0)
        .mount(&server)
        .await;

    let handler = handler_for(&server.uri(), None);
    let resp = send_unwrap(
        &handler,
        tool_call(
            21,
            "vision_query",
            json!({ "path": png_data_url(8, 8), "prompt": "describe" }),
        ),
    )
    .await;

    assert!(is_error(&resp));
    let body = envelope(&resp);
    assert_eq!(body["ok"], false);
    assert!(body["error"].as_str().unwrap().contains("GLM_API_KEY"));
    assert_eq!(body["metadata"]["mode"], "describe");
}

#[tokio::test]
async fn test_vision_query_upstream_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(429))
        .mount(&server)
        .await;

    let handler = handler_for(&server.uri(), Some("test-key"));
    let resp = send_unwrap(
        &handler,
        tool_call(
            22,
            "vision_query",
            json!({ "path": png_data_url(8, 8), "prompt": "describe" }),
        ),
    )
    .await;

    assert!(is_error(&resp));
    let error = envelope(&resp)["error"].as_str().unwrap().to_string();
    assert!(error.contains("429"), "{error}");
}

// ═══════════════════════════════════════════════════════
// process_file
// ═══════════════════════════════════════════════════════

#[tokio::test]
async fn test_process_file_rejects_executable() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("setup.exe");
    std::fs::write(&file, b"MZ").unwrap();

    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let handler = handler_for(&server.uri(), Some("test-key"));
    let resp = send_unwrap(
        &handler,
        tool_call(30, "process_file", json!({ "filePath": file.to_str().unwrap() })),
    )
    .await;

    assert!(is_error(&resp));
    let body = envelope(&resp);
    assert_eq!(body["ok"], false);
    assert!(body["error"].as_str().unwrap().contains(".exe"));
}

#[tokio::test]
async fn test_process_file_extracts_text() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("notes.txt");
    std::fs::write(&file, b"quarterly numbers").unwrap();

    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/files"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "file-123" })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/files/file-123/content"))
        .respond_with(ResponseTemplate::new(200).set_body_string("quarterly numbers"))
        .expect(1)
        .mount(&server)
        .await;

    let handler = handler_for(&server.uri(), Some("test-key"));
    let resp = send_unwrap(
        &handler,
        tool_call(
            31,
            "process_file",
            json!({ "filePath": file.to_str().unwrap(), "extractPrompt": "summarize" }),
        ),
    )
    .await;

    assert!(!is_error(&resp), "unexpected error: {resp}");
    let body = envelope(&resp);
    assert_eq!(body["ok"], true);
    assert_eq!(body["fileId"], "file-123");
    assert_eq!(body["content"], "quarterly numbers");
    assert_eq!(body["fileCategory"], "text");
    assert_eq!(body["filename"], "notes.txt");
    assert_eq!(body["extractPrompt"], "summarize");
    assert_eq!(body["fileSizeBytes"], 17);
}

// ═══════════════════════════════════════════════════════
// CONCURRENCY
// ═══════════════════════════════════════════════════════

#[tokio::test]
async fn test_concurrent_reads() {
    let handler = std::sync::Arc::new(handler_for("http://127.0.0.1:9", None));

    let mut tasks = Vec::new();
    for i in 0..8u32 {
        let handler = handler.clone();
        tasks.push(tokio::spawn(async move {
            let side = 100 + i * 10;
            let resp = send_unwrap(
                &handler,
                tool_call(
                    100 + i as i64,
                    "read_image",
                    json!({ "path": png_data_url(side, side) }),
                ),
            )
            .await;
            (side, resp)
        }));
    }

    for task in tasks {
        let (side, resp) = task.await.unwrap();
        let body = envelope(&resp);
        assert_eq!(body["image"]["width"], side);
    }
}
