//! The persisted unit: a vector index and its positionally aligned chunks.

use crate::error::{Error, Result};
use crate::index::{FlatIndex, VectorIndex};
use crate::ingest::Chunk;
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// A complete, immutable index build.
///
/// Row `i` of `index` always corresponds to `chunks[i]`, and
/// `chunks[i].sequence_index == i`. Construction enforces this.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexBundle {
    build_id: Uuid,
    built_at: DateTime<Utc>,
    index: FlatIndex,
    chunks: Vec<Chunk>,
}

impl IndexBundle {
    /// Pair a freshly built index with its chunks under a new build id.
    pub fn new(index: FlatIndex, chunks: Vec<Chunk>) -> Result<Self> {
        check_alignment(&index, &chunks).map_err(|reason| {
            Error::Other(anyhow::anyhow!("index bundle misaligned: {reason}"))
        })?;
        Ok(Self {
            build_id: Uuid::new_v4(),
            built_at: Utc::now(),
            index,
            chunks,
        })
    }

    /// Reassemble a bundle read from storage. The caller maps the error.
    pub(crate) fn from_parts(
        build_id: Uuid,
        built_at: DateTime<Utc>,
        index: FlatIndex,
        chunks: Vec<Chunk>,
    ) -> std::result::Result<Self, String> {
        check_alignment(&index, &chunks)?;
        Ok(Self {
            build_id,
            built_at,
            index,
            chunks,
        })
    }

    pub fn build_id(&self) -> Uuid {
        self.build_id
    }

    pub fn built_at(&self) -> DateTime<Utc> {
        self.built_at
    }

    pub fn index(&self) -> &FlatIndex {
        &self.index
    }

    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }
}

fn check_alignment(index: &FlatIndex, chunks: &[Chunk]) -> std::result::Result<(), String> {
    if chunks.len() != index.len() {
        return Err(format!(
            "{} chunks for {} vector rows",
            chunks.len(),
            index.len()
        ));
    }
    if let Some((position, chunk)) = chunks
        .iter()
        .enumerate()
        .find(|(position, chunk)| chunk.sequence_index != *position)
    {
        return Err(format!(
            "chunk at position {position} carries sequence index {}",
            chunk.sequence_index
        ));
    }
    Ok(())
}
