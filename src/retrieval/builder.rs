//! Full index build: clean, chunk, embed, and assemble a bundle.

use crate::config::DocSearchConfig;
use crate::embedding::{EmbeddingGateway, embed_checked};
use crate::error::{Error, Result};
use crate::index::{FlatIndex, IndexBundle, VectorIndex};
use crate::ingest::{Chunk, Chunker, Document, HeaderCleaner, HeaderTemplate};
use futures::{StreamExt as _, TryStreamExt as _};
use std::sync::Arc;
use std::time::Duration;

/// Statistics from a build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexStats {
    pub documents: usize,
    pub pages: usize,
    pub chunks: usize,
    pub dimension: usize,
}

/// Owns every intermediate of a build and hands back only the finished bundle.
pub struct IndexBuilder {
    gateway: Arc<dyn EmbeddingGateway>,
    cleaner: HeaderCleaner,
    chunker: Chunker,
    batch_size: usize,
    concurrency: usize,
    embed_timeout: Duration,
}

impl IndexBuilder {
    pub fn new(
        gateway: Arc<dyn EmbeddingGateway>,
        cleaner: HeaderCleaner,
        chunker: Chunker,
    ) -> Self {
        Self {
            gateway,
            cleaner,
            chunker,
            batch_size: 32,
            concurrency: 1,
            embed_timeout: Duration::from_secs(60),
        }
    }

    /// Wire up cleaning, chunking, and batching from configuration.
    ///
    /// The header templates file is read here; problems with it only disable
    /// cleaning.
    pub fn from_config(
        gateway: Arc<dyn EmbeddingGateway>,
        config: &DocSearchConfig,
    ) -> Result<Self> {
        config.validate()?;
        let template = HeaderTemplate::load_first(&config.ingest.header_templates);
        let cleaner = HeaderCleaner::new(template).with_slack(config.ingest.header_slack);
        let chunker = Chunker::new(config.ingest.chunk_size, config.ingest.chunk_overlap)?;

        Ok(Self::new(gateway, cleaner, chunker)
            .with_batching(config.embedding.batch_size, config.embedding.concurrency)
            .with_embed_timeout(config.embedding.timeout()))
    }

    /// `batch_size` texts per gateway call, up to `concurrency` calls in flight.
    pub fn with_batching(mut self, batch_size: usize, concurrency: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn with_embed_timeout(mut self, timeout: Duration) -> Self {
        self.embed_timeout = timeout;
        self
    }

    /// Clean and chunk every document into one globally numbered sequence.
    pub fn chunk_documents(&self, documents: &[Document]) -> Vec<Chunk> {
        let mut chunks = Vec::new();
        for document in documents {
            let text = document.cleaned_text(&self.cleaner);
            let document_chunks = self.chunker.chunk(&document.filename, &text, chunks.len());
            tracing::debug!(
                filename = %document.filename,
                chars = text.chars().count(),
                chunks = document_chunks.len(),
                "chunked document"
            );
            chunks.extend(document_chunks);
        }
        chunks
    }

    /// Run a complete build. Nothing is returned unless every chunk embedded.
    pub async fn build(&self, documents: &[Document]) -> Result<(IndexBundle, IndexStats)> {
        if !self.cleaner.is_enabled() {
            tracing::debug!("no header labels configured, pages are indexed as extracted");
        }

        let chunks = self.chunk_documents(documents);
        tracing::info!(documents = documents.len(), chunks = chunks.len(), "created chunks");

        let vectors = self.embed_chunks(&chunks).await?;
        self.check_dimensions(&chunks, &vectors)?;
        let index = FlatIndex::build(vectors)?;
        tracing::info!(
            vectors = index.len(),
            dimension = index.dimension(),
            "created embeddings"
        );

        // An empty corpus yields a zero-dimensional index whatever the gateway reports.
        let stats = IndexStats {
            documents: documents.len(),
            pages: documents.iter().map(|d| d.pages.len()).sum(),
            chunks: chunks.len(),
            dimension: index.dimension(),
        };
        let bundle = IndexBundle::new(index, chunks)?;

        tracing::info!(
            build_id = %bundle.build_id(),
            documents = stats.documents,
            pages = stats.pages,
            chunks = stats.chunks,
            "index build complete"
        );
        Ok((bundle, stats))
    }

    async fn embed_chunks(&self, chunks: &[Chunk]) -> Result<Vec<Vec<f32>>> {
        let gateway = self.gateway.as_ref();
        let timeout = self.embed_timeout;
        let batch_size = self.batch_size;

        let batches: Vec<Vec<String>> = chunks
            .chunks(batch_size)
            .map(|batch| batch.iter().map(|chunk| chunk.text.clone()).collect())
            .collect();

        let embedded: Vec<Vec<Vec<f32>>> = futures::stream::iter(batches.into_iter().enumerate())
            .map(|(batch_number, texts)| async move {
                let first = batch_number * batch_size;
                let last = first + texts.len();
                embed_checked(gateway, texts, timeout)
                    .await
                    .map_err(|error| match error {
                        Error::EmbeddingFailure(reason) => {
                            Error::EmbeddingFailure(format!("chunks {first}..{last}: {reason}"))
                        }
                        other => other,
                    })
            })
            .buffered(self.concurrency)
            .try_collect()
            .await?;

        Ok(embedded.into_iter().flatten().collect())
    }

    /// Every vector must have the gateway's dimension; name the chunk that doesn't.
    fn check_dimensions(&self, chunks: &[Chunk], vectors: &[Vec<f32>]) -> Result<()> {
        let expected = self.gateway.dimension();
        for (chunk, vector) in chunks.iter().zip(vectors) {
            if vector.len() != expected {
                return Err(Error::dimension_mismatch(
                    format!("chunk {} of {}", chunk.sequence_index, chunk.filename),
                    expected,
                    vector.len(),
                ));
            }
        }
        Ok(())
    }
}
