use serde_json::Value;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::{debug, info, warn};

use crate::embed::Embedder;
use crate::server::{JsonRpcResponse, McpHandler, PARSE_ERROR};
use crate::Result;

/// Serve newline-delimited JSON-RPC from `reader`, answering on `writer`.
///
/// Messages are handled in arrival order. Returns when the reader hits EOF.
/// A line that is not UTF-8 gets a parse error reply; the session goes on.
pub async fn serve_lines<E, R, W>(handler: &McpHandler<E>, mut reader: R, mut writer: W) -> Result<()>
where
    E: Embedder,
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut buf = Vec::new();
    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf).await? == 0 {
            break;
        }

        let response = match std::str::from_utf8(&buf) {
            Ok(line) => {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                debug!(message = trimmed, "recv");
                handler.handle_message(trimmed).await
            }
            Err(e) => {
                warn!(error = %e, "dropping line that is not UTF-8");
                Some(JsonRpcResponse::failure(
                    Value::Null,
                    PARSE_ERROR,
                    format!("Parse error: {e}"),
                ))
            }
        };

        if let Some(response) = response {
            let text = response.to_json();
            debug!(message = %text, "send");
            writer.write_all(text.as_bytes()).await?;
            writer.write_all(b"\n").await?;
            writer.flush().await?;
        }
    }
    Ok(())
}

/// Serve on the process's stdin/stdout. Logging must stay on stderr.
pub(crate) async fn run<E: Embedder>(handler: &McpHandler<E>) -> Result<()> {
    info!("serving MCP over stdio");
    serve_lines(handler, BufReader::new(tokio::io::stdin()), tokio::io::stdout()).await?;
    info!("stdin closed, shutting down");
    Ok(())
}
