use std::sync::{Arc, Mutex};

use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};

use crate::embed::{Embedder, Embedding};
use crate::{Error, Result};

const E5_DIMENSION: usize = 384;

/// Local embedder using intfloat/multilingual-e5-small.
///
/// Uses fastembed for ONNX-based inference on the blocking pool. The model
/// is multilingual, so Korean questions land near English reference text.
#[derive(Clone)]
pub struct E5Embedder {
    model: Arc<Mutex<TextEmbedding>>,
}

impl E5Embedder {
    /// Create a new local embedder.
    ///
    /// Downloads the model on first use.
    pub fn new() -> Result<Self> {
        let opts = InitOptions::new(EmbeddingModel::MultilingualE5Small).with_show_download_progress(false);

        TextEmbedding::try_new(opts)
            .map(|model| Self {
                model: Arc::new(Mutex::new(model)),
            })
            .map_err(|e| Error::EmbeddingUnavailable(e.to_string()))
    }

    async fn run(&self, inputs: Vec<String>) -> Result<Vec<Embedding>> {
        let model = Arc::clone(&self.model);
        tokio::task::spawn_blocking(move || {
            let mut model = model
                .lock()
                .map_err(|_| Error::EmbeddingUnavailable("embedding model lock poisoned".to_string()))?;
            model
                .embed(inputs, None)
                .map_err(|e| Error::EmbeddingUnavailable(e.to_string()))
        })
        .await
        .map_err(|e| Error::EmbeddingUnavailable(format!("embedding task failed: {e}")))?
    }
}

impl Embedder for E5Embedder {
    async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Embedding>> {
        // E5 models expect role prefixes on both sides
        let inputs = texts.iter().map(|t| format!("passage: {t}")).collect();
        self.run(inputs).await
    }

    async fn embed_query(&self, text: &str) -> Result<Embedding> {
        self.run(vec![format!("query: {text}")])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| Error::EmbeddingUnavailable("model returned no embeddings".to_string()))
    }

    fn dimension(&self) -> usize {
        E5_DIMENSION
    }

    fn model_name(&self) -> &str {
        "intfloat/multilingual-e5-small"
    }
}
