//! Retrieval tool
//!
//! The query-facing contract of the crate: given a question, return the
//! canonical metric keyword plus the ranked chunks that answer it.
//!
//! Two flavours share one implementation:
//!
//! - [`SabermetricsRag::retrieve`] is typed and propagates errors.
//! - [`SabermetricsRag::respond`] and [`SabermetricsRag::call`] sit at the
//!   boundary (agent tool, MCP `tools/call`, `--test-query`) and never fail;
//!   errors come back as `{"error": "..."}`.
//!
//! # Usage
//!
//! ```ignore
//! use saberrag_lib::tool::SabermetricsRag;
//!
//! let rag = SabermetricsRag::new(engine);
//! let json = rag.call("OPS가 뭐야?").await;
//! ```

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::chunk::Page;
use crate::embed::Embedder;
use crate::keyword::{classify, Keyword};
use crate::search::SearchEngine;
use crate::Result;

/// Number of chunks returned when the caller does not ask for a count
pub const DEFAULT_K: usize = 3;

/// MCP tool name
pub const TOOL_NAME: &str = "sabermetrics_rag";
pub const TOOL_DESCRIPTION: &str = "Search the sabermetrics reference for OPS, ERA, FIP, wRC+, WAR \
definitions and explanations. Returns keyword+chunks.";

/// In-process agent tool name
pub const AGENT_TOOL_NAME: &str = "sabermetrics_rag_tool";
pub const AGENT_TOOL_DESCRIPTION: &str = "Search for baseball sabermetrics definitions and \
explanations in the knowledge base. Use this tool when asked about OPS, ERA, FIP, wRC+, WAR, or \
other baseball metrics. Returns a JSON string containing the keyword (derived from query/content) \
and relevant text chunks from the reference document.";

pub const SERVER_NAME: &str = "sabermetrics-rag-mcp";
pub const SERVER_INSTRUCTIONS: &str = "RAG over the sabermetrics reference; use sabermetrics_rag \
to fetch chunks for OPS/ERA/FIP/wRC+/WAR queries.";

const UNKNOWN: &str = "unknown";

/// One retrieved chunk as presented to the caller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievedChunk {
    pub content: String,
    pub page: Page,
    pub source: String,
}

/// Keyword and ranked chunks for one query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalResult {
    pub keyword: Keyword,
    pub chunks: Vec<RetrievedChunk>,
}

/// Boundary payload: either a result or an error message, never both
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ToolResponse {
    Found(RetrievalResult),
    Failed { error: String },
}

impl ToolResponse {
    #[must_use]
    pub fn is_error(&self) -> bool {
        matches!(self, ToolResponse::Failed { .. })
    }

    /// Serialize to the JSON text handed to tool callers.
    #[must_use]
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|e| json!({ "error": e.to_string() }).to_string())
    }
}

impl From<Result<RetrievalResult>> for ToolResponse {
    fn from(result: Result<RetrievalResult>) -> Self {
        match result {
            Ok(found) => ToolResponse::Found(found),
            Err(e) => ToolResponse::Failed { error: e.to_string() },
        }
    }
}

/// Description of a callable tool, as handed to an agent framework
#[derive(Debug, Clone, Serialize)]
pub struct ToolDefinition {
    pub name: &'static str,
    pub description: &'static str,
    pub parameters: Value,
}

/// The sabermetrics retrieval tool.
///
/// Cheap to clone; clones share one [`SearchEngine`] and therefore one
/// index.
pub struct SabermetricsRag<E: Embedder> {
    engine: Arc<SearchEngine<E>>,
    default_k: usize,
}

impl<E: Embedder> Clone for SabermetricsRag<E> {
    fn clone(&self) -> Self {
        Self {
            engine: Arc::clone(&self.engine),
            default_k: self.default_k,
        }
    }
}

impl<E: Embedder> SabermetricsRag<E> {
    pub fn new(engine: SearchEngine<E>) -> Self {
        Self::from_shared(Arc::new(engine))
    }

    pub fn from_shared(engine: Arc<SearchEngine<E>>) -> Self {
        Self {
            engine,
            default_k: DEFAULT_K,
        }
    }

    /// Override the chunk count used when a caller gives none.
    #[must_use]
    pub fn with_default_k(mut self, k: usize) -> Self {
        self.default_k = k.max(1);
        self
    }

    /// Retrieve the `k` nearest chunks and classify the query against them.
    pub async fn retrieve(&self, query: &str, k: usize) -> Result<RetrievalResult> {
        let hits = self.engine.search(query, k).await?;

        let mut combined = String::from(query);
        for hit in &hits {
            combined.push('\n');
            combined.push_str(&hit.chunk.content);
        }
        let keyword = classify(&combined);
        debug!(%keyword, hits = hits.len(), "retrieved chunks");

        let chunks = hits
            .into_iter()
            .map(|hit| RetrievedChunk {
                source: hit.chunk.metadata.source_id.unwrap_or_else(|| UNKNOWN.to_string()),
                page: hit.chunk.metadata.page,
                content: hit.chunk.content,
            })
            .collect();

        Ok(RetrievalResult { keyword, chunks })
    }

    /// Boundary variant of [`retrieve`](Self::retrieve); failures become
    /// [`ToolResponse::Failed`].
    pub async fn respond(&self, query: &str, k: Option<usize>) -> ToolResponse {
        let k = k.unwrap_or(self.default_k);
        let response = ToolResponse::from(self.retrieve(query, k).await);
        if let ToolResponse::Failed { error } = &response {
            warn!(query, error = %error, "retrieval failed");
        }
        response
    }

    /// Agent tool entry point: `query` in, JSON text out.
    pub async fn call(&self, query: &str) -> String {
        self.respond(query, None).await.to_json()
    }

    /// Definition of the agent tool served by [`call`](Self::call).
    #[must_use]
    pub fn agent_tool(&self) -> ToolDefinition {
        ToolDefinition {
            name: AGENT_TOOL_NAME,
            description: AGENT_TOOL_DESCRIPTION,
            parameters: json!({
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "The search query (e.g., \"OPS definition\", \"wRC+ meaning\")."
                    }
                },
                "required": ["query"]
            }),
        }
    }
}
