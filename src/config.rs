//! Configuration for ingestion, indexing, embedding, and search.
//!
//! Loaded in order (later wins):
//! 1. Built-in defaults
//! 2. An optional TOML file
//! 3. Environment variables prefixed with `DOCSEARCH__`, nested with `__`
//!    (e.g. `DOCSEARCH__INGEST__CHUNK_SIZE=800`)

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DocSearchConfig {
    pub ingest: IngestConfig,
    pub index: IndexConfig,
    pub embedding: EmbeddingConfig,
    pub search: SearchConfig,
}

/// Document loading, header cleaning, and chunking.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    /// Folder holding pre-extracted document text.
    pub documents_dir: PathBuf,
    /// JSON file with header templates. Missing file disables cleaning.
    pub header_templates: PathBuf,
    /// Lines skipped after the last header label line.
    pub header_slack: usize,
    /// Window size in characters.
    pub chunk_size: usize,
    /// Characters shared by consecutive windows.
    pub chunk_overlap: usize,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            documents_dir: PathBuf::from("pdfs"),
            header_templates: PathBuf::from("header_templates.json"),
            header_slack: crate::ingest::header::DEFAULT_HEADER_SLACK,
            chunk_size: 1000,
            chunk_overlap: 200,
        }
    }
}

/// Persisted index location.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    /// Directory holding the bundle artifacts.
    pub dir: PathBuf,
    /// Upper bound on a single save or load.
    pub io_timeout_secs: u64,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            dir: default_data_dir().join("index"),
            io_timeout_secs: 30,
        }
    }
}

impl IndexConfig {
    pub fn io_timeout(&self) -> Duration {
        Duration::from_secs(self.io_timeout_secs)
    }
}

/// Which embedding implementation to construct.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingBackend {
    /// Local ONNX model via fastembed.
    #[default]
    Fastembed,
    /// OpenAI-compatible `/embeddings` HTTP endpoint.
    Openai,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub backend: EmbeddingBackend,
    /// Texts per gateway call during a build.
    pub batch_size: usize,
    /// Batches in flight at once during a build.
    pub concurrency: usize,
    /// Upper bound on a single gateway call.
    pub timeout_secs: u64,
    /// Where fastembed stores downloaded model files.
    pub cache_dir: PathBuf,
    /// Base URL for the HTTP backend, e.g. `http://localhost:1234/v1`.
    pub base_url: String,
    /// Model name sent to the HTTP backend.
    pub model: String,
    /// Expected vector dimension for the HTTP backend.
    pub dimension: usize,
    /// Environment variable holding the HTTP backend's API key. Unset means no auth.
    pub api_key_env: Option<String>,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            backend: EmbeddingBackend::default(),
            batch_size: 32,
            concurrency: 2,
            timeout_secs: 60,
            cache_dir: default_data_dir().join("models"),
            base_url: "http://localhost:1234/v1".to_string(),
            model: "text-embedding-all-minilm-l6-v2".to_string(),
            dimension: 384,
            api_key_env: None,
        }
    }
}

impl EmbeddingConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Chunks returned per query when the caller does not say otherwise.
    pub top_k: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self { top_k: 3 }
    }
}

impl DocSearchConfig {
    /// Load defaults, then `path` (if given and present), then environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(false));
        }
        builder = builder.add_source(
            config::Environment::with_prefix("DOCSEARCH")
                .separator("__")
                .try_parsing(true),
        );

        let config: DocSearchConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings that would make a build loop forever or return nothing.
    pub fn validate(&self) -> Result<()> {
        if self.ingest.chunk_size == 0 {
            return Err(Error::InvalidConfiguration(
                "ingest.chunk_size must be greater than 0".into(),
            ));
        }
        if self.ingest.chunk_overlap >= self.ingest.chunk_size {
            return Err(Error::InvalidConfiguration(format!(
                "ingest.chunk_overlap ({}) must be smaller than ingest.chunk_size ({})",
                self.ingest.chunk_overlap, self.ingest.chunk_size
            )));
        }
        if self.embedding.batch_size == 0 {
            return Err(Error::InvalidConfiguration(
                "embedding.batch_size must be greater than 0".into(),
            ));
        }
        if self.embedding.concurrency == 0 {
            return Err(Error::InvalidConfiguration(
                "embedding.concurrency must be greater than 0".into(),
            ));
        }
        if self.search.top_k == 0 {
            return Err(Error::InvalidConfiguration(
                "search.top_k must be greater than 0".into(),
            ));
        }
        Ok(())
    }
}

fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("docsearch")
}
