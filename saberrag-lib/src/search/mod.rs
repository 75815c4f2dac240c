//! High-level search interface
//!
//! Combines the document sources, chunker, embedder and index into one
//! object that owns the live index for the life of the process.
//!
//! The index is built lazily on the first search (or an explicit
//! [`SearchEngine::ensure_built`]) and cached. At most one build runs at a
//! time: concurrent callers queue on the build lock and pick up the index the
//! first of them produced. A failed build leaves the cache empty, so the next
//! call simply tries again.
//!
//! # Usage
//!
//! ```ignore
//! use saberrag_lib::search::SearchEngine;
//!
//! let engine = SearchEngine::new(embedder, sources, FixedSizeChunker::default());
//! let hits = engine.search("What does OPS mean?", 3).await?;
//!
//! // documents changed on disk
//! engine.invalidate().await;
//! ```

use std::sync::atomic::{AtomicUsize, Ordering};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinError;
use tracing::info;

use crate::chunk::{Chunker, FixedSizeChunker};
use crate::embed::{self, Embedder};
use crate::index::{FlatIndex, SearchHit, VectorIndex};
use crate::source::SourceSet;
use crate::{Error, Result};

/// Default deadline for a single embedding call
pub const DEFAULT_EMBED_TIMEOUT: Duration = Duration::from_secs(30);

/// Search engine owning the lifecycle of one vector index.
pub struct SearchEngine<E: Embedder> {
    embedder: E,
    sources: SourceSet,
    chunker: FixedSizeChunker,
    embed_timeout: Duration,
    index: RwLock<Option<Arc<FlatIndex>>>,
    build_lock: Mutex<()>,
    builds: AtomicUsize,
}

impl<E: Embedder> SearchEngine<E> {
    /// Create a new search engine. Nothing is read or embedded until the
    /// first search.
    #[must_use]
    pub fn new(embedder: E, sources: SourceSet, chunker: FixedSizeChunker) -> Self {
        Self {
            embedder,
            sources,
            chunker,
            embed_timeout: DEFAULT_EMBED_TIMEOUT,
            index: RwLock::new(None),
            build_lock: Mutex::new(()),
            builds: AtomicUsize::new(0),
        }
    }

    #[must_use]
    pub fn with_embed_timeout(mut self, timeout: Duration) -> Self {
        self.embed_timeout = timeout;
        self
    }

    /// Return the cached index, building it first if there is none.
    pub async fn ensure_built(&self) -> Result<Arc<FlatIndex>> {
        if let Some(index) = self.cached().await {
            return Ok(index);
        }

        let _guard = self.build_lock.lock().await;
        // another caller may have finished a build while we waited
        if let Some(index) = self.cached().await {
            return Ok(index);
        }

        let index = Arc::new(self.build().await?);
        *self.index.write().await = Some(Arc::clone(&index));
        Ok(index)
    }

    /// Drop the cached index; the next search rebuilds from the sources.
    ///
    /// Waits for an in-flight build so its result cannot outlive the call.
    pub async fn invalidate(&self) {
        let _guard = self.build_lock.lock().await;
        *self.index.write().await = None;
        info!("index invalidated");
    }

    /// Build a fresh index and swap it in, serving the old one meanwhile.
    ///
    /// On failure the previous index (if any) stays live.
    pub async fn rebuild(&self) -> Result<Arc<FlatIndex>> {
        let _guard = self.build_lock.lock().await;
        let index = Arc::new(self.build().await?);
        *self.index.write().await = Some(Arc::clone(&index));
        Ok(index)
    }

    /// Search for chunks similar to the query.
    pub async fn search(&self, query: &str, k: usize) -> Result<Vec<SearchHit>> {
        let index = self.ensure_built().await?;
        let query_embedding = embed::with_timeout(self.embed_timeout, self.embedder.embed_query(query)).await?;
        index.search(&query_embedding, k)
    }

    /// Returns `true` if an index is currently cached.
    pub async fn is_built(&self) -> bool {
        self.index.read().await.is_some()
    }

    /// Number of builds started so far, successful or not.
    #[must_use]
    pub fn build_count(&self) -> usize {
        self.builds.load(Ordering::SeqCst)
    }

    async fn cached(&self) -> Option<Arc<FlatIndex>> {
        self.index.read().await.as_ref().map(Arc::clone)
    }

    async fn build(&self) -> Result<FlatIndex> {
        self.builds.fetch_add(1, Ordering::SeqCst);

        let sources = self.sources.clone();
        let units = tokio::task::spawn_blocking(move || sources.ingest())
            .await
            .map_err(|e| ingestion_failed(self.sources.primary(), &e))??;
        info!(units = units.len(), "splitting documents");

        let chunks = self.chunker.split(&units);
        if chunks.is_empty() {
            return Err(Error::EmptyCorpus);
        }
        info!(chunks = chunks.len(), chunker = self.chunker.name(), "created chunks");

        let texts: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();
        let embeddings =
            embed::with_timeout(self.embed_timeout, self.embedder.embed_documents(&texts)).await?;
        if embeddings.len() != chunks.len() {
            return Err(Error::EmbeddingUnavailable(format!(
                "expected {} embeddings, received {}",
                chunks.len(),
                embeddings.len()
            )));
        }

        let index = FlatIndex::build(embeddings.into_iter().zip(chunks))?;
        info!(
            entries = index.len(),
            dimension = index.dimension(),
            model = self.embedder.model_name(),
            "built vector index"
        );
        Ok(index)
    }
}

/// A reader that died mid-ingestion is an extraction failure of the corpus.
fn ingestion_failed(primary: &Path, err: &JoinError) -> Error {
    let reason = if err.is_panic() {
        "reader panicked".to_string()
    } else {
        err.to_string()
    };
    Error::Extraction {
        path: primary.to_path_buf(),
        reason,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::Page;
    use crate::embed::{Embedding, HashEmbedder};
    use std::fs;
    use std::path::PathBuf;
    use tempfile::TempDir;

    /// Hash embedder that counts document batches and can be told to fail
    /// or stall.
    struct CountingEmbedder {
        inner: HashEmbedder,
        batches: Arc<AtomicUsize>,
        fail: bool,
        delay: Duration,
    }

    impl CountingEmbedder {
        fn new() -> Self {
            Self {
                inner: HashEmbedder::new(256),
                batches: Arc::new(AtomicUsize::new(0)),
                fail: false,
                delay: Duration::ZERO,
            }
        }
    }

    impl Embedder for CountingEmbedder {
        async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Embedding>> {
            self.batches.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            if self.fail {
                return Err(Error::EmbeddingUnavailable("quota exceeded".to_string()));
            }
            self.inner.embed_documents(texts).await
        }

        async fn embed_query(&self, text: &str) -> Result<Embedding> {
            self.inner.embed_query(text).await
        }

        fn dimension(&self) -> usize {
            self.inner.dimension()
        }

        fn model_name(&self) -> &str {
            "counting"
        }
    }

    fn corpus(dir: &TempDir) -> PathBuf {
        let path = dir.path().join("sabermetrics.txt");
        fs::write(
            &path,
            "OPS (On-base Plus Slugging)\nFormula: OPS = OBP + SLG\n\
             \x0CERA (Earned Run Average)\nFormula: ERA = earned runs x 9 / innings\n\
             \x0CWAR (Wins Above Replacement)\n6+ WAR: MVP candidate\n",
        )
        .unwrap();
        path
    }

    fn engine(embedder: CountingEmbedder, primary: PathBuf) -> SearchEngine<CountingEmbedder> {
        SearchEngine::new(embedder, SourceSet::new(primary), FixedSizeChunker::default())
    }

    #[tokio::test]
    async fn test_ensure_built_builds_once() {
        let dir = TempDir::new().unwrap();
        let embedder = CountingEmbedder::new();
        let batches = Arc::clone(&embedder.batches);
        let engine = engine(embedder, corpus(&dir));

        assert!(!engine.is_built().await);
        for _ in 0..5 {
            engine.ensure_built().await.unwrap();
        }
        engine.search("OPS", 1).await.unwrap();

        assert!(engine.is_built().await);
        assert_eq!(engine.build_count(), 1);
        assert_eq!(batches.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_concurrent_callers_share_one_build() {
        let dir = TempDir::new().unwrap();
        let mut embedder = CountingEmbedder::new();
        embedder.delay = Duration::from_millis(50);
        let batches = Arc::clone(&embedder.batches);
        let engine = Arc::new(engine(embedder, corpus(&dir)));

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let engine = Arc::clone(&engine);
                tokio::spawn(async move { engine.ensure_built().await.map(|i| i.len()) })
            })
            .collect();
        for task in tasks {
            assert_eq!(task.await.unwrap().unwrap(), 3);
        }

        assert_eq!(engine.build_count(), 1);
        assert_eq!(batches.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_invalidate_triggers_rebuild() {
        let dir = TempDir::new().unwrap();
        let engine = engine(CountingEmbedder::new(), corpus(&dir));

        engine.ensure_built().await.unwrap();
        engine.invalidate().await;
        assert!(!engine.is_built().await);

        engine.ensure_built().await.unwrap();
        assert_eq!(engine.build_count(), 2);
    }

    #[tokio::test]
    async fn test_rebuild_picks_up_changed_documents() {
        let dir = TempDir::new().unwrap();
        let primary = corpus(&dir);
        let engine = engine(CountingEmbedder::new(), primary.clone());

        assert_eq!(engine.ensure_built().await.unwrap().len(), 3);

        fs::write(&primary, "FIP (Fielding Independent Pitching)\n").unwrap();
        let rebuilt = engine.rebuild().await.unwrap();
        assert_eq!(rebuilt.len(), 1);
        assert_eq!(engine.ensure_built().await.unwrap().len(), 1);
        assert_eq!(engine.build_count(), 2);
    }

    #[tokio::test]
    async fn test_missing_source_is_not_cached() {
        let dir = TempDir::new().unwrap();
        let primary = dir.path().join("sabermetrics.txt");
        let engine = engine(CountingEmbedder::new(), primary.clone());

        let err = engine.ensure_built().await.unwrap_err();
        assert!(matches!(err, Error::SourceNotFound(_)));
        assert!(!engine.is_built().await);

        // the document appears; the next call retries and succeeds
        corpus(&dir);
        assert!(engine.ensure_built().await.is_ok());
        assert_eq!(engine.build_count(), 2);
    }

    #[tokio::test]
    async fn test_embedding_failure_is_not_cached() {
        let dir = TempDir::new().unwrap();
        let mut embedder = CountingEmbedder::new();
        embedder.fail = true;
        let engine = engine(embedder, corpus(&dir));

        for _ in 0..2 {
            let err = engine.search("OPS", 3).await.unwrap_err();
            assert!(matches!(err, Error::EmbeddingUnavailable(_)));
        }
        assert!(!engine.is_built().await);
        assert_eq!(engine.build_count(), 2);
    }

    #[tokio::test]
    async fn test_failed_rebuild_keeps_old_index() {
        let dir = TempDir::new().unwrap();
        let primary = corpus(&dir);
        let engine = engine(CountingEmbedder::new(), primary.clone());
        engine.ensure_built().await.unwrap();

        fs::remove_file(&primary).unwrap();
        assert!(engine.rebuild().await.is_err());
        assert_eq!(engine.ensure_built().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_blank_corpus_is_empty_corpus() {
        let dir = TempDir::new().unwrap();
        let primary = dir.path().join("blank.txt");
        fs::write(&primary, "   \n\x0C\n\n").unwrap();
        let engine = engine(CountingEmbedder::new(), primary);

        let err = engine.ensure_built().await.unwrap_err();
        assert!(matches!(err, Error::EmptyCorpus));
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_embedder_times_out() {
        let dir = TempDir::new().unwrap();
        let mut embedder = CountingEmbedder::new();
        embedder.delay = Duration::from_secs(120);
        let engine = engine(embedder, corpus(&dir)).with_embed_timeout(Duration::from_secs(1));

        let err = engine.ensure_built().await.unwrap_err();
        assert!(matches!(err, Error::EmbeddingUnavailable(msg) if msg.contains("timed out")));
    }

    #[tokio::test]
    async fn test_search_ranks_matching_page_first() {
        let dir = TempDir::new().unwrap();
        let engine = engine(CountingEmbedder::new(), corpus(&dir));

        let hits = engine.search("What does OPS mean?", 3).await.unwrap();
        assert_eq!(hits.len(), 3);
        assert!(hits[0].chunk.content.contains("OBP + SLG"));
        assert_eq!(hits[0].chunk.metadata.page, Page::Number(1));
        for pair in hits.windows(2) {
            assert!(pair[0].distance <= pair[1].distance);
        }
    }

    #[tokio::test]
    async fn test_two_builds_rank_identically() {
        let dir = TempDir::new().unwrap();
        let primary = corpus(&dir);
        let first = engine(CountingEmbedder::new(), primary.clone());
        let second = engine(CountingEmbedder::new(), primary);

        for query in ["wins above replacement", "earned runs", "OPS가 뭐야?"] {
            let a: Vec<String> = first.search(query, 3).await.unwrap().into_iter().map(|h| h.chunk.content).collect();
            let b: Vec<String> = second.search(query, 3).await.unwrap().into_iter().map(|h| h.chunk.content).collect();
            assert_eq!(a, b, "query {query:?}");
        }
    }

    #[tokio::test]
    async fn test_panicking_reader_is_extraction_error() {
        let join_err = tokio::task::spawn_blocking(|| panic!("bad page"))
            .await
            .unwrap_err();

        let err = ingestion_failed(Path::new("data/sabermetrics.pdf"), &join_err);
        match err {
            Error::Extraction { path, reason } => {
                assert_eq!(path, PathBuf::from("data/sabermetrics.pdf"));
                assert_eq!(reason, "reader panicked");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
