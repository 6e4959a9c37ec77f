//! Exact brute-force index over a row-major `f32` matrix.

use crate::error::{Error, Result};
use crate::index::{Neighbor, VectorIndex};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Brute-force squared-L2 index. Suited to small and medium corpora.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FlatIndex {
    dimension: usize,
    rows: usize,
    /// `rows * dimension` values, row-major.
    data: Vec<f32>,
}

impl FlatIndex {
    /// Build from a complete set of vectors sharing one dimension.
    ///
    /// The first row fixes the dimension. Zero rows is legal and gives an
    /// index that answers every query with nothing.
    pub fn build(vectors: Vec<Vec<f32>>) -> Result<Self> {
        let Some(dimension) = vectors.first().map(Vec::len) else {
            return Ok(Self::default());
        };
        if dimension == 0 {
            return Err(Error::InvalidConfiguration(
                "cannot index zero-dimensional vectors".into(),
            ));
        }

        let rows = vectors.len();
        let mut data = Vec::with_capacity(rows * dimension);
        for (row, vector) in vectors.into_iter().enumerate() {
            if vector.len() != dimension {
                return Err(Error::dimension_mismatch(
                    format!("row {row}"),
                    dimension,
                    vector.len(),
                ));
            }
            data.extend(vector);
        }

        Ok(Self {
            dimension,
            rows,
            data,
        })
    }

    /// Borrow row `row`, if present.
    pub fn row(&self, row: usize) -> Option<&[f32]> {
        if row >= self.rows {
            return None;
        }
        let start = row * self.dimension;
        Some(&self.data[start..start + self.dimension])
    }

    /// Check the stored shape after deserialization.
    pub(crate) fn is_consistent(&self) -> bool {
        self.rows
            .checked_mul(self.dimension)
            .is_some_and(|len| len == self.data.len())
            && (self.rows == 0 || self.dimension > 0)
    }
}

impl VectorIndex for FlatIndex {
    fn dimension(&self) -> usize {
        self.dimension
    }

    fn len(&self) -> usize {
        self.rows
    }

    fn query(&self, vector: &[f32], k: usize) -> Result<Vec<Neighbor>> {
        if k == 0 {
            return Err(Error::InvalidConfiguration(
                "k must be greater than 0".into(),
            ));
        }
        if self.rows == 0 {
            return Ok(Vec::new());
        }
        if vector.len() != self.dimension {
            return Err(Error::dimension_mismatch(
                "query vector",
                self.dimension,
                vector.len(),
            ));
        }

        let mut neighbors: Vec<Neighbor> = self
            .data
            .chunks_exact(self.dimension)
            .enumerate()
            .map(|(row, stored)| Neighbor {
                row,
                distance: squared_l2(stored, vector),
            })
            .collect();

        if k < neighbors.len() {
            neighbors.select_nth_unstable_by(k - 1, compare_neighbors);
            neighbors.truncate(k);
        }
        neighbors.sort_unstable_by(compare_neighbors);
        Ok(neighbors)
    }
}

/// Ascending distance, then ascending row. Total, so results are reproducible.
fn compare_neighbors(a: &Neighbor, b: &Neighbor) -> Ordering {
    a.distance
        .total_cmp(&b.distance)
        .then_with(|| a.row.cmp(&b.row))
}

fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b)
        .map(|(x, y)| {
            let diff = x - y;
            diff * diff
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> FlatIndex {
        FlatIndex::build(vec![vec![0.0, 0.0], vec![1.0, 0.0], vec![5.0, 5.0]]).unwrap()
    }

    #[test]
    fn nearest_two_of_three() {
        let results = sample().query(&[0.0, 0.0], 2).unwrap();
        let rows: Vec<usize> = results.iter().map(|n| n.row).collect();
        assert_eq!(rows, vec![0, 1]);
        assert_eq!(results[0].distance, 0.0);
        assert_eq!(results[1].distance, 1.0);
    }

    #[test]
    fn k_larger_than_rows_returns_all_ordered() {
        let results = sample().query(&[4.0, 4.0], 10).unwrap();
        let rows: Vec<usize> = results.iter().map(|n| n.row).collect();
        assert_eq!(rows, vec![2, 1, 0]);
        assert_eq!(results[0].distance, 2.0);
    }

    #[test]
    fn ties_break_by_row() {
        let index = FlatIndex::build(vec![
            vec![1.0, 0.0],
            vec![0.0, 1.0],
            vec![-1.0, 0.0],
            vec![0.0, -1.0],
        ])
        .unwrap();

        for _ in 0..3 {
            let rows: Vec<usize> = index
                .query(&[0.0, 0.0], 3)
                .unwrap()
                .iter()
                .map(|n| n.row)
                .collect();
            assert_eq!(rows, vec![0, 1, 2]);
        }
    }

    #[test]
    fn empty_index_returns_nothing() {
        let index = FlatIndex::build(Vec::new()).unwrap();
        assert!(index.is_empty());
        assert_eq!(index.dimension(), 0);
        assert!(index.query(&[1.0, 2.0, 3.0], 5).unwrap().is_empty());
    }

    #[test]
    fn mismatched_rows_are_rejected() {
        let error = FlatIndex::build(vec![vec![0.0, 0.0], vec![1.0]]).unwrap_err();
        match error {
            Error::DimensionMismatch {
                context,
                expected,
                actual,
            } => {
                assert_eq!(context, "row 1");
                assert_eq!(expected, 2);
                assert_eq!(actual, 1);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn query_dimension_and_k_are_checked() {
        let index = sample();
        assert!(matches!(
            index.query(&[0.0], 1),
            Err(Error::DimensionMismatch { .. })
        ));
        assert!(matches!(
            index.query(&[0.0, 0.0], 0),
            Err(Error::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn row_access() {
        let index = sample();
        assert_eq!(index.row(2), Some(&[5.0, 5.0][..]));
        assert_eq!(index.row(3), None);
        assert!(index.is_consistent());
    }

    #[test]
    fn overflowing_shape_is_inconsistent() {
        let index = FlatIndex {
            dimension: usize::MAX,
            rows: 2,
            data: vec![0.0; 4],
        };
        assert!(!index.is_consistent());
    }
}
