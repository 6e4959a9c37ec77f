//! Document search core: header-aware chunking, exact vector retrieval, and
//! an index bundle lifecycle that keeps vectors and chunk metadata aligned.

pub mod config;
pub mod embedding;
pub mod error;
pub mod index;
pub mod ingest;
pub mod retrieval;

pub use crate::config::DocSearchConfig;
pub use crate::embedding::EmbeddingGateway;
pub use crate::error::{Error, Result};
pub use crate::index::{FlatIndex, IndexBundle, IndexStore, Neighbor, VectorIndex};
pub use crate::ingest::{Chunk, Chunker, Document, DocumentLoader, HeaderCleaner, HeaderTemplate};
pub use crate::retrieval::{IndexBuilder, IndexStats, QueryService, SearchHit, answer_context};
