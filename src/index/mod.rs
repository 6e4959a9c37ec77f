//! Vector index, persisted bundle, and the store that keeps them aligned.

pub mod bundle;
pub mod flat;
pub mod store;

pub use bundle::IndexBundle;
pub use flat::FlatIndex;
pub use store::IndexStore;

use crate::error::Result;

/// One query result: a row position and its squared Euclidean distance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    pub row: usize,
    pub distance: f32,
}

/// Nearest-neighbor lookup over an immutable set of rows.
///
/// Results are ordered by ascending distance, ties broken by ascending row,
/// and never padded when `k` exceeds the row count. Any implementation,
/// exact or approximate, keeps this contract so callers need not change.
pub trait VectorIndex: Send + Sync {
    /// Vector dimension. Zero for an index built from no rows.
    fn dimension(&self) -> usize;

    /// Number of stored rows.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn query(&self, vector: &[f32], k: usize) -> Result<Vec<Neighbor>>;
}
