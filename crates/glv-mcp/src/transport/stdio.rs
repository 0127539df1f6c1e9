//! Stdio transport: reads JSON-RPC lines from stdin, writes responses to stdout.

use std::sync::Arc;

use serde_json::Value;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;

use crate::protocol::ProtocolHandler;
use crate::types::{McpError, McpResult};

use super::framing;

/// Stdio transport for desktop MCP clients.
///
/// Each request runs on its own task; a single writer task serializes output lines,
/// so responses may arrive out of request order.
pub struct StdioTransport {
    handler: Arc<ProtocolHandler>,
}

impl StdioTransport {
    pub fn new(handler: ProtocolHandler) -> Self {
        Self {
            handler: Arc::new(handler),
        }
    }

    /// Serve on the process's stdin/stdout until EOF.
    pub async fn run(&self) -> McpResult<()> {
        let reader = BufReader::new(tokio::io::stdin());
        self.serve(reader, tokio::io::stdout()).await?;
        Ok(())
    }

    /// Serve on arbitrary streams. Returns the writer once every response is flushed.
    pub async fn serve<R, W>(&self, mut reader: R, writer: W) -> McpResult<W>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let (tx, rx) = mpsc::unbounded_channel::<Value>();
        let writer_task = tokio::spawn(write_responses(rx, writer));

        tracing::info!("Stdio transport started");

        let mut line = Vec::new();
        loop {
            line.clear();
            if reader.read_until(b'\n', &mut line).await? == 0 {
                tracing::info!("EOF on stdin, shutting down");
                break;
            }

            if line.iter().all(u8::is_ascii_whitespace) {
                continue;
            }

            match framing::decode_line(&line) {
                Ok(msg) => {
                    let handler = Arc::clone(&self.handler);
                    let tx = tx.clone();
                    tokio::spawn(async move {
                        if let Some(response) = handler.handle_message(msg).await {
                            let _ = tx.send(response);
                        }
                    });
                }
                Err(e) => {
                    tracing::warn!("Parse error: {e}");
                    let _ = tx.send(framing::parse_error_response(&e)?);
                }
            }
        }

        // The writer finishes once the last in-flight request drops its sender.
        drop(tx);
        writer_task
            .await
            .map_err(|e| McpError::InternalError(format!("writer task failed: {e}")))?
    }
}

async fn write_responses<W>(mut rx: mpsc::UnboundedReceiver<Value>, mut writer: W) -> McpResult<W>
where
    W: AsyncWrite + Unpin,
{
    while let Some(response) = rx.recv().await {
        let framed = framing::frame_message(&response)?;
        writer.write_all(framed.as_bytes()).await?;
        writer.flush().await?;
    }
    Ok(writer)
}
