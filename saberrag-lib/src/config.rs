//! Configuration file support
//!
//! Loads `saberrag.toml` from the current directory, or an explicit path.
//! Every field is optional; accessors supply the defaults. Relative document
//! paths are resolved against the directory holding the config file.
//! Credentials never live here, only in the environment.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use tracing::debug;

use crate::chunk::{FixedSizeChunker, DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE};
use crate::embed::{DEFAULT_GEMINI_MODEL, DEFAULT_HASH_DIMENSION};
use crate::server::{Transport, DEFAULT_HOST, DEFAULT_MOUNT_PATH, DEFAULT_PORT};
use crate::source::SourceSet;
use crate::tool::DEFAULT_K;
use crate::{Error, Result};

/// File looked up in the working directory when no path is given
pub const CONFIG_FILE_NAME: &str = "saberrag.toml";

pub const DEFAULT_PRIMARY_PATH: &str = "data/sabermetrics.pdf";
pub const DEFAULT_SUPPLEMENTARY_PATH: &str = "docs/response.md";

/// Embedding provider selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProvider {
    #[default]
    Gemini,
    Hash,
    Fastembed,
}

/// Document locations
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SourcesConfig {
    /// Paginated reference document (PDF or form-feed separated text)
    pub primary: Option<PathBuf>,
    /// Optional response-format document
    pub supplementary: Option<PathBuf>,
}

/// Chunking configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    pub size: Option<usize>,
    pub overlap: Option<usize>,
}

impl ChunkingConfig {
    /// Get chunk size in characters (defaults to 500)
    pub fn size(&self) -> usize {
        self.size.unwrap_or(DEFAULT_CHUNK_SIZE)
    }

    /// Get overlap in characters (defaults to 50)
    pub fn overlap(&self) -> usize {
        self.overlap.unwrap_or(DEFAULT_CHUNK_OVERLAP)
    }
}

/// Embedding configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// Provider type (gemini, hash, fastembed)
    pub provider: Option<EmbeddingProvider>,
    /// Model identifier for the gemini provider
    pub model: Option<String>,
    /// Vector size for the hash provider
    pub dimension: Option<usize>,
    /// Deadline for each embedding call, in seconds
    pub timeout_secs: Option<u64>,
}

impl EmbeddingConfig {
    /// Get provider type (defaults to Gemini)
    pub fn provider(&self) -> EmbeddingProvider {
        self.provider.unwrap_or_default()
    }

    /// Get model identifier (defaults to text-embedding-004)
    pub fn model(&self) -> &str {
        self.model.as_deref().unwrap_or(DEFAULT_GEMINI_MODEL)
    }

    /// Get hash dimension (defaults to 512)
    pub fn dimension(&self) -> usize {
        self.dimension.unwrap_or(DEFAULT_HASH_DIMENSION)
    }

    /// Get embedding timeout (defaults to 30s)
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.unwrap_or(30))
    }
}

/// Retrieval configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Chunks returned per query
    pub k: Option<usize>,
}

impl RetrievalConfig {
    /// Get k (defaults to 3)
    pub fn k(&self) -> usize {
        self.k.unwrap_or(DEFAULT_K)
    }
}

/// Service configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub transport: Option<Transport>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub mount_path: Option<String>,
}

impl ServerConfig {
    /// Get transport (defaults to stdio)
    pub fn transport(&self) -> Transport {
        self.transport.unwrap_or_default()
    }

    /// Get host (defaults to 127.0.0.1)
    pub fn host(&self) -> &str {
        self.host.as_deref().unwrap_or(DEFAULT_HOST)
    }

    /// Get port (defaults to 8000)
    pub fn port(&self) -> u16 {
        self.port.unwrap_or(DEFAULT_PORT)
    }

    /// Get mount path (defaults to "/")
    pub fn mount_path(&self) -> &str {
        self.mount_path.as_deref().unwrap_or(DEFAULT_MOUNT_PATH)
    }
}

/// Configuration loaded from saberrag.toml
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub sources: SourcesConfig,
    pub chunking: ChunkingConfig,
    pub embedding: EmbeddingConfig,
    pub retrieval: RetrievalConfig,
    pub server: ServerConfig,

    /// Directory relative paths resolve against; unset means the working directory
    #[serde(skip)]
    base_dir: Option<PathBuf>,
}

impl Config {
    /// Load `saberrag.toml` from the working directory, or the defaults if
    /// there is none. A file that exists but does not parse is an error.
    pub fn load() -> Result<Self> {
        let path = PathBuf::from(CONFIG_FILE_NAME);
        if path.is_file() {
            Self::from_path(&path)
        } else {
            debug!("no {} in working directory, using defaults", CONFIG_FILE_NAME);
            Ok(Self::default())
        }
    }

    /// Load configuration from an explicit path.
    pub fn from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("cannot read {}: {}", path.display(), e)))?;
        let mut config: Self = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
        config
            .validate()
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
        config.base_dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf);
        debug!(path = %path.display(), "loaded config");
        Ok(config)
    }

    /// Parse configuration text. Paths stay relative to the working directory.
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).map_err(|e| Error::Config(e.to_string()))?;
        config.validate().map_err(Error::Config)?;
        Ok(config)
    }

    fn validate(&self) -> std::result::Result<(), String> {
        if self.retrieval.k == Some(0) {
            return Err("retrieval.k must be at least 1".to_string());
        }
        Ok(())
    }

    /// Resolve a configured path against the config file's directory.
    pub fn resolve(&self, path: &Path) -> PathBuf {
        match &self.base_dir {
            Some(base) if path.is_relative() => base.join(path),
            _ => path.to_path_buf(),
        }
    }

    /// Primary document path, resolved
    pub fn primary_path(&self) -> PathBuf {
        let path = self
            .sources
            .primary
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_PRIMARY_PATH));
        self.resolve(&path)
    }

    /// Supplementary document path, resolved
    pub fn supplementary_path(&self) -> PathBuf {
        let path = self
            .sources
            .supplementary
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_SUPPLEMENTARY_PATH));
        self.resolve(&path)
    }

    /// The configured corpus
    pub fn source_set(&self) -> SourceSet {
        SourceSet::new(self.primary_path()).with_supplementary(self.supplementary_path())
    }

    /// The configured chunker; rejects an overlap not smaller than the size.
    pub fn chunker(&self) -> Result<FixedSizeChunker> {
        FixedSizeChunker::new(self.chunking.size(), self.chunking.overlap())
    }
}
