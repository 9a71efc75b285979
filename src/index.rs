//! The index module
//! Brute-force nearest neighbour search over a flat vector array

use crate::error::{Error, Result};
use crate::vector::squared_euclidean;

/// Exact k-NN index using squared Euclidean distance.
///
/// Vectors are stored contiguously as `[v1_d1, v1_d2, ..., v2_d1, v2_d2, ...]`,
/// so row `i` of the index is row `i` of the artifact it was built from.
/// The index is immutable once built.
#[derive(Debug, Clone)]
pub struct FlatIndex {
    vectors: Vec<f32>,
    dimension: usize,
}

impl FlatIndex {
    /// Builds an index from a row-major `N x dimension` buffer.
    ///
    /// # Arguments
    ///
    /// * `dimension` - Length of every vector, must be non-zero
    /// * `vectors` - Flat buffer whose length is a multiple of `dimension`
    ///
    /// # Examples
    ///
    /// ```
    /// use nyaya_rag::FlatIndex;
    ///
    /// let index = FlatIndex::from_rows(2, vec![1.0, 0.0, 0.0, 1.0]).unwrap();
    /// assert_eq!(index.len(), 2);
    /// assert_eq!(index.vector(1), &[0.0, 1.0]);
    /// ```
    pub fn from_rows(dimension: usize, vectors: Vec<f32>) -> Result<FlatIndex> {
        if dimension == 0 {
            return Err(Error::startup("Index dimension must be non-zero"));
        }
        if vectors.len() % dimension != 0 {
            return Err(Error::startup(format!(
                "Vector buffer of {} floats is not a whole number of {}-dimensional rows",
                vectors.len(),
                dimension
            )));
        }

        Ok(FlatIndex { vectors, dimension })
    }

    /// Returns the `top_k` rows closest to `query`.
    ///
    /// Each hit is `(row, squared_distance)`. Hits are sorted by ascending
    /// distance; rows at equal distance keep their storage order. At most
    /// `min(top_k, len())` hits are returned, and an empty index yields none.
    ///
    /// # Examples
    ///
    /// ```
    /// use nyaya_rag::FlatIndex;
    ///
    /// let index = FlatIndex::from_rows(3, vec![
    ///     1.0, 0.0, 0.0,
    ///     0.0, 1.0, 0.0,
    ///     0.7, 0.7, 0.0,
    /// ]).unwrap();
    ///
    /// let hits = index.search(&[1.0, 0.0, 0.0], 2).unwrap();
    /// assert_eq!(hits.len(), 2);
    /// assert_eq!(hits[0].0, 0);
    /// assert_eq!(hits[0].1, 0.0);
    /// assert_eq!(hits[1].0, 2);
    /// ```
    pub fn search(&self, query: &[f32], top_k: usize) -> Result<Vec<(usize, f32)>> {
        if query.len() != self.dimension {
            return Err(Error::DimensionMismatch { expected: self.dimension, actual: query.len() });
        }

        let k = top_k.min(self.len());
        if k == 0 {
            return Ok(Vec::new());
        }

        // Sorted ascending, never longer than k
        let mut best: Vec<(usize, f32)> = Vec::with_capacity(k + 1);
        for (i, row) in self.vectors.chunks_exact(self.dimension).enumerate() {
            let dist = squared_euclidean(row, query)?;
            if best.len() == k && dist.total_cmp(&best[k - 1].1).is_ge() {
                continue;
            }
            let insert_index = best.partition_point(|&(_, d)| d.total_cmp(&dist).is_le());
            best.insert(insert_index, (i, dist));
            best.truncate(k);
        }

        Ok(best)
    }

    /// Returns the vector stored at `row`.
    ///
    /// # Panics
    ///
    /// Panics if `row` is out of bounds.
    pub fn vector(&self, row: usize) -> &[f32] {
        let start = row * self.dimension;
        &self.vectors[start..start + self.dimension]
    }

    /// Returns the number of vectors in the index.
    pub fn len(&self) -> usize {
        self.vectors.len() / self.dimension
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }
}
