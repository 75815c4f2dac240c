use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::debug;

use crate::embed::Embedder;
use crate::tool::{SabermetricsRag, SERVER_INSTRUCTIONS, SERVER_NAME, TOOL_DESCRIPTION, TOOL_NAME};

pub const PROTOCOL_VERSION: &str = "2024-11-05";

pub const PARSE_ERROR: i64 = -32700;
pub const INVALID_REQUEST: i64 = -32600;
pub const METHOD_NOT_FOUND: i64 = -32601;
pub const INVALID_PARAMS: i64 = -32602;

#[derive(Debug, Clone, Deserialize)]
pub struct JsonRpcRequest {
    #[serde(default)]
    pub jsonrpc: String,
    /// Absent for notifications
    #[serde(default)]
    pub id: Option<Value>,
    pub method: String,
    #[serde(default)]
    pub params: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    pub id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcError {
    pub code: i64,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl JsonRpcResponse {
    pub fn success(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    pub fn failure(id: Value, code: i64, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: None,
            error: Some(JsonRpcError {
                code,
                message: message.into(),
                data: None,
            }),
        }
    }

    /// Serialize for the wire.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|e| {
            json!({
                "jsonrpc": "2.0",
                "id": Value::Null,
                "error": {"code": -32603, "message": format!("serialize error: {e}")}
            })
            .to_string()
        })
    }
}

/// Tool advertised by `tools/list`
#[derive(Debug, Clone, Serialize)]
struct Tool {
    name: &'static str,
    description: &'static str,
    #[serde(rename = "inputSchema")]
    input_schema: Value,
}

#[derive(Debug, Deserialize)]
struct CallParams {
    name: String,
    #[serde(default)]
    arguments: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct SearchArgs {
    query: String,
    #[serde(default)]
    k: Option<usize>,
}

/// Parse one raw message. A malformed message yields the error response to
/// send back instead.
pub fn parse_message(raw: &str) -> std::result::Result<JsonRpcRequest, JsonRpcResponse> {
    let value: Value = serde_json::from_str(raw)
        .map_err(|e| JsonRpcResponse::failure(Value::Null, PARSE_ERROR, format!("Parse error: {e}")))?;
    let id = value.get("id").cloned().unwrap_or(Value::Null);
    serde_json::from_value(value)
        .map_err(|e| JsonRpcResponse::failure(id, INVALID_REQUEST, format!("Invalid request: {e}")))
}

/// Transport-independent JSON-RPC dispatcher for the retrieval tool.
pub struct McpHandler<E: Embedder> {
    rag: SabermetricsRag<E>,
}

impl<E: Embedder> Clone for McpHandler<E> {
    fn clone(&self) -> Self {
        Self {
            rag: self.rag.clone(),
        }
    }
}

impl<E: Embedder> McpHandler<E> {
    pub fn new(rag: SabermetricsRag<E>) -> Self {
        Self { rag }
    }

    /// Parse and handle one raw message. `None` means nothing goes back
    /// (the message was a notification).
    pub async fn handle_message(&self, raw: &str) -> Option<JsonRpcResponse> {
        match parse_message(raw) {
            Ok(request) => self.handle(request).await,
            Err(response) => Some(response),
        }
    }

    pub async fn handle(&self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        debug!(method = %request.method, id = ?request.id, "request");
        let Some(id) = request.id else {
            // notifications get no reply
            return None;
        };
        if request.method.starts_with("notifications/") {
            return None;
        }

        let response = match request.method.as_str() {
            "initialize" => JsonRpcResponse::success(
                id,
                json!({
                    "protocolVersion": PROTOCOL_VERSION,
                    "capabilities": {"tools": {"listChanged": false}},
                    "serverInfo": {"name": SERVER_NAME, "version": env!("CARGO_PKG_VERSION")},
                    "instructions": SERVER_INSTRUCTIONS
                }),
            ),
            "ping" => JsonRpcResponse::success(id, json!({})),
            "tools/list" => JsonRpcResponse::success(id, json!({ "tools": [search_tool()] })),
            "tools/call" => self.call_tool(id, request.params).await,
            other => JsonRpcResponse::failure(id, METHOD_NOT_FOUND, format!("Method not found: {other}")),
        };
        Some(response)
    }

    async fn call_tool(&self, id: Value, params: Option<Value>) -> JsonRpcResponse {
        let params: CallParams = match params.map(serde_json::from_value::<CallParams>).transpose() {
            Ok(Some(params)) => params,
            Ok(None) => return JsonRpcResponse::failure(id, INVALID_PARAMS, "Missing params"),
            Err(e) => return JsonRpcResponse::failure(id, INVALID_PARAMS, format!("Invalid params: {e}")),
        };
        if params.name != TOOL_NAME {
            return JsonRpcResponse::failure(id, INVALID_PARAMS, format!("Unknown tool: {}", params.name));
        }

        let args: SearchArgs = match serde_json::from_value(params.arguments.unwrap_or_else(|| json!({}))) {
            Ok(args) => args,
            Err(e) => return JsonRpcResponse::failure(id, INVALID_PARAMS, format!("Invalid arguments: {e}")),
        };
        if args.k == Some(0) {
            return JsonRpcResponse::failure(id, INVALID_PARAMS, "Invalid arguments: k must be at least 1");
        }

        let response = self.rag.respond(&args.query, args.k).await;
        JsonRpcResponse::success(
            id,
            json!({
                "content": [{ "type": "text", "text": response.to_json() }],
                "isError": response.is_error()
            }),
        )
    }
}

fn search_tool() -> Tool {
    Tool {
        name: TOOL_NAME,
        description: TOOL_DESCRIPTION,
        input_schema: json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "Question about a sabermetric metric, e.g. \"OPS가 뭐야?\""
                },
                "k": {
                    "type": "integer",
                    "minimum": 1,
                    "description": "Number of chunks to return (default 3)"
                }
            },
            "required": ["query"]
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::FixedSizeChunker;
    use crate::embed::HashEmbedder;
    use crate::search::SearchEngine;
    use crate::source::SourceSet;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    fn handler(primary: &Path) -> McpHandler<HashEmbedder> {
        let engine = SearchEngine::new(
            HashEmbedder::default(),
            SourceSet::new(primary),
            FixedSizeChunker::default(),
        );
        McpHandler::new(SabermetricsRag::new(engine))
    }

    fn corpus(dir: &TempDir) -> std::path::PathBuf {
        let path = dir.path().join("sabermetrics.txt");
        fs::write(
            &path,
            "OPS (On-base Plus Slugging)\nOPS = OBP + SLG\n\x0CWAR (Wins Above Replacement)\n",
        )
        .unwrap();
        path
    }

    async fn call(handler: &McpHandler<HashEmbedder>, raw: &str) -> JsonRpcResponse {
        handler.handle_message(raw).await.unwrap()
    }

    #[tokio::test]
    async fn test_initialize() {
        let dir = TempDir::new().unwrap();
        let handler = handler(&corpus(&dir));

        let response = call(&handler, r#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":{}}"#).await;
        let result = response.result.unwrap();
        assert_eq!(response.id, json!(1));
        assert_eq!(result["serverInfo"]["name"], "sabermetrics-rag-mcp");
        assert_eq!(result["protocolVersion"], PROTOCOL_VERSION);
        assert!(result["instructions"].as_str().unwrap().contains("sabermetrics_rag"));
    }

    #[tokio::test]
    async fn test_notifications_get_no_reply() {
        let dir = TempDir::new().unwrap();
        let handler = handler(&corpus(&dir));

        assert!(handler
            .handle_message(r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#)
            .await
            .is_none());
        assert!(handler
            .handle_message(r#"{"jsonrpc":"2.0","method":"notifications/cancelled","params":{"requestId":3}}"#)
            .await
            .is_none());
    }

    #[tokio::test]
    async fn test_tools_list() {
        let dir = TempDir::new().unwrap();
        let handler = handler(&corpus(&dir));

        let response = call(&handler, r#"{"jsonrpc":"2.0","id":"a","method":"tools/list"}"#).await;
        let tools = response.result.unwrap()["tools"].clone();
        assert_eq!(tools.as_array().unwrap().len(), 1);
        assert_eq!(tools[0]["name"], "sabermetrics_rag");
        assert_eq!(tools[0]["inputSchema"]["required"], json!(["query"]));
    }

    #[tokio::test]
    async fn test_tools_call_returns_payload_text() {
        let dir = TempDir::new().unwrap();
        let handler = handler(&corpus(&dir));

        let response = call(
            &handler,
            r#"{"jsonrpc":"2.0","id":7,"method":"tools/call","params":{"name":"sabermetrics_rag","arguments":{"query":"OPS 는 뭐야?","k":1}}}"#,
        )
        .await;
        let result = response.result.unwrap();
        assert_eq!(result["isError"], false);

        let payload: Value = serde_json::from_str(result["content"][0]["text"].as_str().unwrap()).unwrap();
        assert_eq!(payload["keyword"], "OPS");
        assert_eq!(payload["chunks"].as_array().unwrap().len(), 1);
        assert_eq!(payload["chunks"][0]["page"], 1);
    }

    #[tokio::test]
    async fn test_tools_call_failure_sets_is_error() {
        let dir = TempDir::new().unwrap();
        let handler = handler(&dir.path().join("missing.pdf"));

        let response = call(
            &handler,
            r#"{"jsonrpc":"2.0","id":8,"method":"tools/call","params":{"name":"sabermetrics_rag","arguments":{"query":"ERA"}}}"#,
        )
        .await;
        assert!(response.error.is_none());
        let result = response.result.unwrap();
        assert_eq!(result["isError"], true);
        let payload: Value = serde_json::from_str(result["content"][0]["text"].as_str().unwrap()).unwrap();
        assert!(payload.get("keyword").is_none());
        assert!(payload["error"].as_str().unwrap().contains("not found"));
    }

    #[tokio::test]
    async fn test_error_codes() {
        let dir = TempDir::new().unwrap();
        let handler = handler(&corpus(&dir));

        let parse = call(&handler, "{not json").await;
        assert_eq!(parse.error.unwrap().code, PARSE_ERROR);
        assert_eq!(parse.id, Value::Null);

        let unknown = call(&handler, r#"{"jsonrpc":"2.0","id":2,"method":"resources/list"}"#).await;
        assert_eq!(unknown.error.unwrap().code, METHOD_NOT_FOUND);

        let no_tool = call(
            &handler,
            r#"{"jsonrpc":"2.0","id":3,"method":"tools/call","params":{"name":"other","arguments":{"query":"x"}}}"#,
        )
        .await;
        assert_eq!(no_tool.error.unwrap().code, INVALID_PARAMS);

        let no_query = call(
            &handler,
            r#"{"jsonrpc":"2.0","id":4,"method":"tools/call","params":{"name":"sabermetrics_rag","arguments":{}}}"#,
        )
        .await;
        assert_eq!(no_query.error.unwrap().code, INVALID_PARAMS);

        let zero_k = call(
            &handler,
            r#"{"jsonrpc":"2.0","id":5,"method":"tools/call","params":{"name":"sabermetrics_rag","arguments":{"query":"x","k":0}}}"#,
        )
        .await;
        assert_eq!(zero_k.error.unwrap().code, INVALID_PARAMS);

        let not_request = call(&handler, r#"{"jsonrpc":"2.0","id":6}"#).await;
        assert_eq!(not_request.error.unwrap().code, INVALID_REQUEST);
        assert_eq!(not_request.id, json!(6));
    }

    #[tokio::test]
    async fn test_tools_call_huge_k_returns_every_chunk() {
        let dir = TempDir::new().unwrap();
        let handler = handler(&corpus(&dir));

        for k in ["100000000000000", "18446744073709551615"] {
            let raw = format!(
                r#"{{"jsonrpc":"2.0","id":10,"method":"tools/call","params":{{"name":"sabermetrics_rag","arguments":{{"query":"OPS","k":{k}}}}}}}"#
            );
            let result = call(&handler, &raw).await.result.unwrap();
            assert_eq!(result["isError"], false);
            let payload: Value = serde_json::from_str(result["content"][0]["text"].as_str().unwrap()).unwrap();
            assert_eq!(payload["chunks"].as_array().unwrap().len(), 2);
        }
    }

    #[tokio::test]
    async fn test_ping() {
        let dir = TempDir::new().unwrap();
        let handler = handler(&corpus(&dir));
        let response = call(&handler, r#"{"jsonrpc":"2.0","id":9,"method":"ping"}"#).await;
        assert_eq!(response.result, Some(json!({})));
    }
}
