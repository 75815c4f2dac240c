//! Text embedding
//!
//! The index is only as good as the embedding space it lives in, so every
//! provider sits behind [`Embedder`] and the rest of the crate never knows
//! which one it is talking to.
//!
//! # Providers
//!
//! - [`GeminiEmbedder`]: Google `text-embedding-004` over HTTPS (768 dims).
//!   Needs `GEMINI_API_KEY` or `GOOGLE_API_KEY`.
//! - [`HashEmbedder`]: deterministic feature hashing, no network. Good
//!   enough for keyword-heavy queries, tests and offline demos.
//! - `E5Embedder` (feature `fastembed`): local ONNX model via fastembed.
//!
//! # Usage
//!
//! ```ignore
//! use saberrag_lib::embed::{Embedder, HashEmbedder};
//!
//! let embedder = HashEmbedder::new(512);
//!
//! // Embed documents (for indexing)
//! let doc_embeddings = embedder.embed_documents(&chunks).await?;
//!
//! // Embed query (for searching)
//! let query_embedding = embedder.embed_query("OPS가 뭐야?").await?;
//! ```

use std::future::Future;
use std::time::Duration;

use crate::{Error, Result};

/// A vector embedding - fixed size array of floats
pub type Embedding = Vec<f32>;

/// Trait for text embedding models
///
/// Failures of any kind (credentials, quota, transport, malformed
/// responses) are reported as [`Error::EmbeddingUnavailable`].
pub trait Embedder: Send + Sync + 'static {
    /// Embed multiple documents for indexing
    ///
    /// Returns exactly one embedding per input text, in input order.
    fn embed_documents(&self, texts: &[String]) -> impl Future<Output = Result<Vec<Embedding>>> + Send;

    /// Embed a single query for searching
    ///
    /// Some models embed queries differently from documents; this method
    /// handles that distinction.
    fn embed_query(&self, text: &str) -> impl Future<Output = Result<Embedding>> + Send;

    /// Returns the embedding dimension
    fn dimension(&self) -> usize;

    /// Returns the model name/identifier
    fn model_name(&self) -> &str;
}

/// Run an embedding call with a deadline.
///
/// Expiry is reported as [`Error::EmbeddingUnavailable`] so callers treat a
/// hung endpoint like any other outage.
pub async fn with_timeout<T>(limit: Duration, call: impl Future<Output = Result<T>>) -> Result<T> {
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => Err(Error::EmbeddingUnavailable(format!(
            "embedding request timed out after {:.1}s",
            limit.as_secs_f32()
        ))),
    }
}

pub(crate) fn l2_normalize(vector: &mut [f32]) {
    let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm == 0.0 {
        return;
    }
    for value in vector.iter_mut() {
        *value /= norm;
    }
}

#[cfg(feature = "fastembed")]
mod e5;
mod gemini;
mod hash;

#[cfg(feature = "fastembed")]
pub use e5::*;
pub use gemini::*;
pub use hash::*;
