//! Vector index
//!
//! Holds `(embedding, chunk)` entries and answers k-nearest-neighbour
//! queries. An index is built once from a complete set of entries and is
//! read-only afterwards; a rebuild produces a new index rather than
//! mutating the old one.
//!
//! # Distance
//!
//! Squared Euclidean (L2) distance, smaller is closer. For L2-normalized
//! embeddings this ranks identically to cosine similarity.
//!
//! # Usage
//!
//! ```ignore
//! use saberrag_lib::index::{FlatIndex, VectorIndex};
//!
//! let index = FlatIndex::build(entries)?;
//! let hits = index.search(&query_embedding, 3)?;
//! ```

use crate::chunk::Chunk;
use crate::embed::Embedding;
use crate::Result;

/// A search hit with its distance to the query
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    /// The matched chunk
    pub chunk: Chunk,
    /// Squared L2 distance (lower is more similar)
    pub distance: f32,
}

/// Trait for searchable vector indexes
pub trait VectorIndex: Send + Sync {
    /// Search for the chunks nearest to `query`
    ///
    /// # Returns
    /// At most `k` hits sorted by ascending distance (nearest first)
    fn search(&self, query: &Embedding, k: usize) -> Result<Vec<SearchHit>>;

    /// Dimension shared by every stored vector
    fn dimension(&self) -> usize;

    /// Number of stored entries
    fn len(&self) -> usize;

    /// Check if index is empty
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

mod flat;

pub use flat::*;
