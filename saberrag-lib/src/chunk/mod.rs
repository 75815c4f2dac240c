//! Document chunking
//!
//! Source units are cut into bounded windows before embedding. Each chunk
//! carries the provenance of the unit it came from (source, page, content
//! type) so search hits can be cited back to the reference document.
//!
//! # Implementing a Chunker
//!
//! ```ignore
//! use saberrag_lib::chunk::{Chunker, Chunk, ChunkMetadata};
//!
//! struct MyChunker { /* ... */ }
//!
//! impl Chunker for MyChunker {
//!     fn chunk(&self, content: &str, metadata: ChunkMetadata) -> Vec<Chunk> {
//!         // Your chunking logic here
//!         todo!()
//!     }
//!
//!     fn name(&self) -> &str {
//!         "mine"
//!     }
//! }
//! ```

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::source::SourceUnit;

/// A chunk of text with its metadata
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
pub struct Chunk {
    /// Content hash, stable for identical text
    pub id: String,
    /// The text content of this chunk
    pub content: String,
    /// Metadata inherited from the source unit
    pub metadata: ChunkMetadata,
}

/// Metadata associated with a chunk
#[derive(Debug, Clone, Default, Serialize, Deserialize, Eq, PartialEq)]
pub struct ChunkMetadata {
    /// Source document identifier (file path or a fixed label)
    pub source_id: Option<String>,
    /// Content type tag (e.g. "reference", "response_template")
    pub source_type: Option<String>,
    /// Page within the source document, 1-based
    pub page: Page,
    /// Character offset of this chunk within its unit
    pub position: usize,
    /// Total number of chunks cut from the same unit
    pub total_chunks: Option<usize>,
}

/// Page number of a unit, or `"unknown"` for unpaginated sources.
///
/// Serializes as a bare integer or the string `"unknown"`, which is the
/// shape the tool surfaces promise to their callers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Page {
    Number(u32),
    #[default]
    Unknown,
}

impl fmt::Display for Page {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Page::Number(n) => write!(f, "{n}"),
            Page::Unknown => f.write_str("unknown"),
        }
    }
}

impl Serialize for Page {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Page::Number(n) => serializer.serialize_u32(*n),
            Page::Unknown => serializer.serialize_str("unknown"),
        }
    }
}

impl<'de> Deserialize<'de> for Page {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Number(u32),
            Text(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Number(n) => Ok(Page::Number(n)),
            Raw::Text(s) if s == "unknown" => Ok(Page::Unknown),
            Raw::Text(s) => Err(serde::de::Error::custom(format!(
                "expected a page number or \"unknown\", got {s:?}"
            ))),
        }
    }
}

/// Trait for document chunking strategies
pub trait Chunker: Send + Sync {
    /// Split content into chunks
    ///
    /// # Arguments
    /// * `content` - The text content to chunk
    /// * `metadata` - Base metadata to attach to each chunk
    fn chunk(&self, content: &str, metadata: ChunkMetadata) -> Vec<Chunk>;

    /// Returns the name of this chunking strategy
    fn name(&self) -> &str;

    /// Chunk every unit in order, keeping each unit's chunks contiguous.
    fn split(&self, units: &[SourceUnit]) -> Vec<Chunk> {
        units
            .iter()
            .flat_map(|unit| self.chunk(&unit.text, unit.metadata.clone()))
            .collect()
    }
}

mod fixed;

pub use fixed::*;
