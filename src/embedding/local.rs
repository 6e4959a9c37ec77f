//! Local embedding generation via fastembed.

use crate::embedding::EmbeddingGateway;
use crate::error::{Error, Result};
use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;

/// `all-MiniLM-L6-v2` output size.
const MINILM_DIMENSION: usize = 384;

/// fastembed model wrapper with thread-safe sharing.
///
/// Inference is CPU-bound, so calls run on the blocking pool.
pub struct FastEmbedGateway {
    model: Arc<fastembed::TextEmbedding>,
}

impl FastEmbedGateway {
    /// Load `all-MiniLM-L6-v2`, storing downloaded model files in `cache_dir`.
    ///
    /// Limits ONNX intra-op threads to avoid excessive memory usage on
    /// machines with many cores.
    pub fn new(cache_dir: &Path) -> Result<Self> {
        if std::env::var("OMP_NUM_THREADS").is_err() {
            // SAFETY: Called once during single-threaded init before any ONNX
            // threads are spawned.
            unsafe { std::env::set_var("OMP_NUM_THREADS", "2") };
        }

        let options = fastembed::InitOptions::new(fastembed::EmbeddingModel::AllMiniLML6V2)
            .with_cache_dir(cache_dir.to_path_buf())
            .with_show_download_progress(true);

        let model = fastembed::TextEmbedding::try_new(options)
            .map_err(|e| Error::EmbeddingFailure(format!("failed to load model: {e}")))?;

        tracing::info!(cache_dir = %cache_dir.display(), "loaded local embedding model");
        Ok(Self {
            model: Arc::new(model),
        })
    }
}

#[async_trait]
impl EmbeddingGateway for FastEmbedGateway {
    fn dimension(&self) -> usize {
        MINILM_DIMENSION
    }

    async fn embed(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
        let model = self.model.clone();
        tokio::task::spawn_blocking(move || {
            model
                .embed(texts, None)
                .map_err(|e| Error::EmbeddingFailure(e.to_string()))
        })
        .await
        .map_err(|e| Error::EmbeddingFailure(format!("embedding task failed: {e}")))?
    }
}
