use std::cmp::Ordering;
use std::collections::BinaryHeap;

use crate::chunk::Chunk;
use crate::embed::Embedding;
use crate::index::{SearchHit, VectorIndex};
use crate::{Error, Result};

/// A stored vector and the chunk it was computed from
#[derive(Debug, Clone)]
pub struct IndexedEntry {
    pub vector: Embedding,
    pub chunk: Chunk,
}

/// Exact nearest-neighbour index over a flat list of entries.
///
/// Brute-force squared L2 scan, which is plenty for a reference corpus of a
/// few hundred chunks. Entry ids are insertion ordinals, and ties on
/// distance are broken by them so results are reproducible.
#[derive(Debug, Clone)]
pub struct FlatIndex {
    dimension: usize,
    entries: Vec<IndexedEntry>,
}

impl FlatIndex {
    /// Build an index from `(embedding, chunk)` pairs.
    ///
    /// Fails with `EmptyCorpus` when there is nothing to index and with
    /// `DimensionMismatch` when the vectors disagree on their length.
    pub fn build(entries: impl IntoIterator<Item = (Embedding, Chunk)>) -> Result<Self> {
        let entries: Vec<IndexedEntry> = entries
            .into_iter()
            .map(|(vector, chunk)| IndexedEntry { vector, chunk })
            .collect();

        let dimension = entries.first().ok_or(Error::EmptyCorpus)?.vector.len();
        if dimension == 0 {
            return Err(Error::InvalidInput("embeddings must not be empty".to_string()));
        }
        if let Some(bad) = entries.iter().find(|e| e.vector.len() != dimension) {
            return Err(Error::DimensionMismatch {
                expected: dimension,
                actual: bad.vector.len(),
            });
        }

        Ok(Self { dimension, entries })
    }

    /// Entry by id (insertion ordinal)
    #[must_use]
    pub fn get(&self, id: usize) -> Option<&IndexedEntry> {
        self.entries.get(id)
    }
}

impl VectorIndex for FlatIndex {
    fn search(&self, query: &Embedding, k: usize) -> Result<Vec<SearchHit>> {
        if query.len() != self.dimension {
            return Err(Error::DimensionMismatch {
                expected: self.dimension,
                actual: query.len(),
            });
        }
        // callers may ask for more than exists; never size the heap from them
        let k = k.min(self.entries.len());
        if k == 0 {
            return Ok(Vec::new());
        }

        // max-heap of the k best so far; the worst candidate sits on top
        let mut heap = BinaryHeap::with_capacity(k + 1);
        for (id, entry) in self.entries.iter().enumerate() {
            heap.push(Candidate {
                distance: squared_l2(query, &entry.vector),
                id,
            });
            if heap.len() > k {
                heap.pop();
            }
        }

        Ok(heap
            .into_sorted_vec()
            .into_iter()
            .map(|c| SearchHit {
                chunk: self.entries[c.id].chunk.clone(),
                distance: c.distance,
            })
            .collect())
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

#[derive(Debug, Clone, Copy)]
struct Candidate {
    distance: f32,
    id: usize,
}

impl Ord for Candidate {
    fn cmp(&self, other: &Self) -> Ordering {
        self.distance
            .total_cmp(&other.distance)
            .then(self.id.cmp(&other.id))
    }
}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Candidate {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Candidate {}

/// Squared Euclidean distance between two vectors of equal length.
fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len(), "vectors must have same length");
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}
