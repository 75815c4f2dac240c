use std::hash::{DefaultHasher, Hash, Hasher};

use crate::chunk::{Chunk, ChunkMetadata, Chunker};
use crate::{Error, Result};

/// Default window size in characters
pub const DEFAULT_CHUNK_SIZE: usize = 500;
/// Default overlap between consecutive windows in characters
pub const DEFAULT_CHUNK_OVERLAP: usize = 50;

/// Fixed-size chunker - sliding character window with overlap
///
/// Windows are measured in characters, not bytes, so multi-byte text (the
/// corpus mixes English and Korean) is never cut inside a code point.
/// The window advances by `chunk_size - overlap` until the remainder fits
/// in a single window, which becomes the unit's last chunk.
#[derive(Debug, Clone)]
pub struct FixedSizeChunker {
    chunk_size: usize,
    overlap: usize,
}

impl FixedSizeChunker {
    /// Create a chunker, rejecting `overlap >= chunk_size`.
    pub fn new(chunk_size: usize, overlap: usize) -> Result<Self> {
        if chunk_size == 0 {
            return Err(Error::InvalidInput("chunk size must be positive".to_string()));
        }
        if overlap >= chunk_size {
            return Err(Error::InvalidInput(format!(
                "chunk overlap ({overlap}) must be smaller than chunk size ({chunk_size})"
            )));
        }
        Ok(Self { chunk_size, overlap })
    }

    #[must_use]
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    #[must_use]
    pub fn overlap(&self) -> usize {
        self.overlap
    }

    fn stride(&self) -> usize {
        self.chunk_size - self.overlap
    }
}

impl Default for FixedSizeChunker {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            overlap: DEFAULT_CHUNK_OVERLAP,
        }
    }
}

impl Chunker for FixedSizeChunker {
    fn name(&self) -> &str {
        "fixed"
    }

    fn chunk(&self, content: &str, mut metadata: ChunkMetadata) -> Vec<Chunk> {
        if content.trim().is_empty() {
            return Vec::new();
        }

        // byte offset of every char, plus the end of the string
        let bounds: Vec<usize> = content
            .char_indices()
            .map(|(i, _)| i)
            .chain(std::iter::once(content.len()))
            .collect();
        let len = bounds.len() - 1;

        let mut windows = Vec::new();
        let mut start = 0;
        loop {
            if len - start <= self.chunk_size {
                windows.push((start, len));
                break;
            }
            windows.push((start, start + self.chunk_size));
            start += self.stride();
        }

        metadata.total_chunks = Some(windows.len());

        windows
            .into_iter()
            .map(|(start, end)| {
                let c = &content[bounds[start]..bounds[end]];

                let mut m = metadata.clone();
                m.position = start;

                Chunk {
                    id: generate_id(c),
                    content: c.to_string(),
                    metadata: m,
                }
            })
            .collect()
    }
}

fn generate_id(string: &str) -> String {
    let mut hasher = DefaultHasher::new();
    string.hash(&mut hasher);
    format!("{:x}", hasher.finish())
}
