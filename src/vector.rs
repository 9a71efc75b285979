//! This is the vector math module
//! Provide L2 normalization and squared Euclidean distance

use crate::error::{Error, Result};

/// L2 Normalization
/// norm_vec = vec / ||vec||
/// Zero vector cannot be normalized
pub fn l2_norm(vector: &[f32]) -> Result<Vec<f32>> {
    if vector.is_empty() {
        return Err(Error::embedding("Cannot normalize an empty vector"));
    }

    let norm = vector.iter()
        .map(|x| x * x)
        .sum::<f32>()
        .sqrt();

    if norm == 0.0 {
        return Err(Error::embedding("Cannot normalize a zero vector"));
    }

    let normed_vec = vector.iter()
        .map(|x| x / norm)
        .collect();

    Ok(normed_vec)
}

/// Squared Euclidean distance
/// dist = sum((a[i] - b[i])^2) for i = 0..a.len()
/// Lower is more similar. Can only process vectors with same dimensions
pub fn squared_euclidean(left: &[f32], right: &[f32]) -> Result<f32> {
    if left.len() != right.len() {
        return Err(Error::DimensionMismatch { expected: left.len(), actual: right.len() });
    }

    Ok(left
        .iter()
        .zip(right.iter())
        .map(|(x, y)| {
            let d = x - y;
            d * d
        })
        .sum())
}
