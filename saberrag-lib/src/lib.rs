//! saberrag - retrieval core for grounding sabermetrics answers
//!
//! # Architecture
//!
//! ```text
//! SourceSet -> Chunker -> Embedder -> FlatIndex
//!                                       |
//! Query -> Embedder -> SearchEngine <---+
//!                          |
//!                   SabermetricsRag -> classify -> {keyword, chunks}
//!                          |
//!              agent tool / MCP server (stdio, sse, streamable-http)
//! ```
//!
//! # Example
//!
//! ```ignore
//! use saberrag_lib::{chunk::FixedSizeChunker, embed::HashEmbedder, search::SearchEngine};
//! use saberrag_lib::{source::SourceSet, tool::SabermetricsRag};
//!
//! let sources = SourceSet::new("data/sabermetrics.txt").with_supplementary("docs/response.md");
//! let engine = SearchEngine::new(HashEmbedder::default(), sources, FixedSizeChunker::default());
//! let rag = SabermetricsRag::new(engine);
//!
//! // Typed
//! let result = rag.retrieve("OPS가 뭐야?", 3).await?;
//!
//! // JSON text, never fails
//! let json = rag.call("What is a good FIP?").await;
//! ```

pub mod chunk;
pub mod config;
pub mod embed;
pub mod error;
pub mod index;
pub mod keyword;
pub mod search;
pub mod server;
pub mod source;
pub mod tool;

pub use error::{Error, Result};
