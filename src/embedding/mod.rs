//! Embedding gateway: the injected `text -> vector` capability.
//!
//! The index and retrieval code only see [`EmbeddingGateway`]. Concrete
//! backends are a local fastembed model and an OpenAI-compatible HTTP service.

pub mod http;
pub mod local;

pub use http::HttpEmbeddingGateway;
pub use local::FastEmbedGateway;

use crate::config::{EmbeddingBackend, EmbeddingConfig};
use crate::error::{Error, Result};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// Batch text encoder producing vectors of one fixed dimension.
#[async_trait]
pub trait EmbeddingGateway: Send + Sync {
    /// Length of every vector this gateway returns.
    fn dimension(&self) -> usize;

    /// Encode `texts`, returning one vector per input in input order.
    async fn embed(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>>;
}

/// Construct the gateway selected by `config.backend`.
pub fn from_config(config: &EmbeddingConfig) -> Result<Arc<dyn EmbeddingGateway>> {
    match config.backend {
        EmbeddingBackend::Fastembed => Ok(Arc::new(FastEmbedGateway::new(&config.cache_dir)?)),
        EmbeddingBackend::Openai => Ok(Arc::new(HttpEmbeddingGateway::from_config(config)?)),
    }
}

/// Call the gateway once, bounded by `timeout`, and check the batch shape.
///
/// Timeouts and short or long batches surface as [`Error::EmbeddingFailure`].
pub async fn embed_checked(
    gateway: &dyn EmbeddingGateway,
    texts: Vec<String>,
    timeout: Duration,
) -> Result<Vec<Vec<f32>>> {
    let expected = texts.len();
    let vectors = tokio::time::timeout(timeout, gateway.embed(texts))
        .await
        .map_err(|_| {
            Error::EmbeddingFailure(format!("embedding call timed out after {timeout:?}"))
        })??;

    if vectors.len() != expected {
        return Err(Error::EmbeddingFailure(format!(
            "gateway returned {} vectors for {expected} texts",
            vectors.len()
        )));
    }
    Ok(vectors)
}

/// Embed a single query string.
pub async fn embed_query(
    gateway: &dyn EmbeddingGateway,
    text: &str,
    timeout: Duration,
) -> Result<Vec<f32>> {
    let mut vectors = embed_checked(gateway, vec![text.to_string()], timeout).await?;
    vectors
        .pop()
        .ok_or_else(|| Error::EmbeddingFailure("gateway returned no vector".into()))
}
