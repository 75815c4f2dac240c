//! MCP-style service
//!
//! Exposes the retrieval tool over JSON-RPC on one of three transports:
//!
//! - `stdio`: newline-delimited messages on stdin/stdout
//! - `sse`: `GET <mount>/sse` event stream, requests posted to the
//!   announced `<mount>/messages/?session_id=...` endpoint
//! - `streamable-http`: `POST <mount>/mcp`, response in the HTTP body
//!
//! # Usage
//!
//! ```ignore
//! use saberrag_lib::server::{serve, ServerOptions, Transport};
//!
//! let options = ServerOptions { transport: Transport::Sse, ..Default::default() };
//! serve(rag, &options).await?;
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::embed::Embedder;
use crate::tool::SabermetricsRag;
use crate::{Error, Result};

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 8000;
pub const DEFAULT_MOUNT_PATH: &str = "/";

/// Wire transport for the service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Transport {
    #[default]
    Stdio,
    Sse,
    StreamableHttp,
}

impl Transport {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Transport::Stdio => "stdio",
            Transport::Sse => "sse",
            Transport::StreamableHttp => "streamable-http",
        }
    }
}

impl fmt::Display for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Transport {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "stdio" => Ok(Transport::Stdio),
            "sse" => Ok(Transport::Sse),
            "streamable-http" => Ok(Transport::StreamableHttp),
            other => Err(Error::InvalidInput(format!(
                "unknown transport {other:?} (expected stdio, sse or streamable-http)"
            ))),
        }
    }
}

/// Where and how to serve
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerOptions {
    pub transport: Transport,
    /// Bind host for the HTTP transports
    pub host: String,
    /// Bind port for the HTTP transports
    pub port: u16,
    /// Path prefix for the HTTP transports
    pub mount_path: String,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            transport: Transport::default(),
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            mount_path: DEFAULT_MOUNT_PATH.to_string(),
        }
    }
}

/// Serve the tool until the transport closes (stdin EOF) or the process
/// is stopped.
pub async fn serve<E: Embedder>(rag: SabermetricsRag<E>, options: &ServerOptions) -> Result<()> {
    let handler = McpHandler::new(rag);
    match options.transport {
        Transport::Stdio => stdio::run(&handler).await,
        Transport::Sse | Transport::StreamableHttp => http::serve(handler, options).await,
    }
}

/// Route prefix for a mount path: `""` for the root, otherwise a leading
/// slash and no trailing one.
pub(crate) fn route_prefix(mount_path: &str) -> String {
    let trimmed = mount_path.trim().trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("/{trimmed}")
    }
}

mod http;
mod protocol;
mod stdio;

pub use http::router;
pub use protocol::*;
pub use stdio::serve_lines;
