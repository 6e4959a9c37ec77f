//! Query serving over an atomically swappable bundle.

use crate::embedding::{EmbeddingGateway, embed_query};
use crate::error::{Error, Result};
use crate::index::{IndexBundle, IndexStore, VectorIndex};
use crate::ingest::{Chunk, Document};
use crate::retrieval::builder::{IndexBuilder, IndexStats};
use arc_swap::ArcSwapOption;
use std::sync::Arc;
use std::time::Duration;

/// A retrieved chunk with its squared Euclidean distance to the query.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub chunk: Chunk,
    pub distance: f32,
}

/// Answers queries against the current bundle.
///
/// Queries take a snapshot of the bundle handle and never block each other.
/// Reloads and rebuilds prepare the new bundle completely, then swap the
/// handle, so a query sees either the old bundle or the new one.
pub struct QueryService {
    gateway: Arc<dyn EmbeddingGateway>,
    bundle: ArcSwapOption<IndexBundle>,
    embed_timeout: Duration,
}

impl QueryService {
    pub fn new(gateway: Arc<dyn EmbeddingGateway>, embed_timeout: Duration) -> Self {
        Self {
            gateway,
            bundle: ArcSwapOption::empty(),
            embed_timeout,
        }
    }

    /// The bundle queries currently run against.
    pub fn current(&self) -> Option<Arc<IndexBundle>> {
        self.bundle.load_full()
    }

    /// Make `bundle` current, returning the one it replaced.
    pub fn install(&self, bundle: Arc<IndexBundle>) -> Option<Arc<IndexBundle>> {
        let previous = self.bundle.swap(Some(bundle.clone()));
        tracing::info!(
            build_id = %bundle.build_id(),
            rows = bundle.len(),
            replaced = previous.is_some(),
            "index bundle installed"
        );
        previous
    }

    /// Load the persisted bundle and swap it in. On failure the current
    /// bundle stays in place.
    pub async fn reload(
        &self,
        store: &IndexStore,
        io_timeout: Duration,
    ) -> Result<Arc<IndexBundle>> {
        let bundle = Arc::new(store.load_async(io_timeout).await?);
        self.install(bundle.clone());
        Ok(bundle)
    }

    /// Build from `documents`, persist, then swap in. Any failure, including a
    /// save that times out, leaves both the served bundle and the stored one
    /// untouched.
    pub async fn rebuild(
        &self,
        builder: &IndexBuilder,
        documents: &[Document],
        store: &IndexStore,
        io_timeout: Duration,
    ) -> Result<IndexStats> {
        let (bundle, stats) = builder.build(documents).await?;
        let bundle = Arc::new(bundle);
        store.save_async(bundle.clone(), io_timeout).await?;
        self.install(bundle);
        Ok(stats)
    }

    /// Nearest chunks to `query`, closest first, with distances.
    pub async fn search(&self, query: &str, k: usize) -> Result<Vec<SearchHit>> {
        let bundle = self.bundle.load_full().ok_or(Error::IndexUnavailable)?;
        if k == 0 {
            return Err(Error::InvalidConfiguration(
                "k must be greater than 0".into(),
            ));
        }

        let vector = embed_query(self.gateway.as_ref(), query, self.embed_timeout).await?;
        let neighbors = bundle.index().query(&vector, k)?;

        let hits = neighbors
            .into_iter()
            .map(|neighbor| {
                bundle
                    .chunks()
                    .get(neighbor.row)
                    .map(|chunk| SearchHit {
                        chunk: chunk.clone(),
                        distance: neighbor.distance,
                    })
                    .ok_or_else(|| {
                        Error::Other(anyhow::anyhow!(
                            "index returned row {} beyond {} chunks",
                            neighbor.row,
                            bundle.len()
                        ))
                    })
            })
            .collect::<Result<Vec<_>>>()?;

        tracing::debug!(k, hits = hits.len(), "search complete");
        Ok(hits)
    }

    /// Nearest chunks to `query`, closest first.
    pub async fn retrieve(&self, query: &str, k: usize) -> Result<Vec<Chunk>> {
        Ok(self
            .search(query, k)
            .await?
            .into_iter()
            .map(|hit| hit.chunk)
            .collect())
    }
}
