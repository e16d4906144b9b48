//! Vector index abstraction and the exact L2 implementation.

use sage_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};

/// Trait for nearest-neighbour indexes over a fixed, ordered set of vectors.
///
/// Implementations are immutable once built and safe to share between
/// concurrent readers.
pub trait VectorIndex: Send + Sync {
    /// Dimension every stored and query vector must have.
    fn dimensions(&self) -> usize;

    /// Number of stored vectors.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The `k` nearest stored vectors as `(position, distance)`.
    ///
    /// Results are sorted by ascending distance, ties by lower position.
    /// `k` is clamped to `len()`.
    fn search(&self, query: &[f32], k: usize) -> AppResult<Vec<(usize, f32)>>;
}

/// Brute-force index using squared Euclidean distance.
///
/// Vectors are stored contiguously, row `i` at `[i * dimensions, (i + 1) * dimensions)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlatL2Index {
    dimensions: usize,
    data: Vec<f32>,
}

impl FlatL2Index {
    /// Build an index from vectors in insertion order.
    ///
    /// Fails if any vector's length differs from `dimensions`.
    pub fn build(vectors: &[Vec<f32>], dimensions: usize) -> AppResult<Self> {
        if dimensions == 0 {
            return Err(AppError::Config(
                "Index dimension must be positive".to_string(),
            ));
        }

        let mut data = Vec::with_capacity(vectors.len() * dimensions);
        for (position, vector) in vectors.iter().enumerate() {
            if vector.len() != dimensions {
                return Err(AppError::Config(format!(
                    "Vector {} has dimension {}, index expects {}",
                    position,
                    vector.len(),
                    dimensions
                )));
            }
            data.extend_from_slice(vector);
        }

        Ok(Self { dimensions, data })
    }

    /// Stored vector at `position`.
    pub fn vector(&self, position: usize) -> Option<&[f32]> {
        let start = position.checked_mul(self.dimensions)?;
        self.data.get(start..start + self.dimensions)
    }

    /// Stored vectors, one row at a time.
    pub fn rows(&self) -> impl Iterator<Item = &[f32]> {
        self.data.chunks_exact(self.dimensions)
    }

    /// Check internal shape after deserialization.
    pub(crate) fn check_shape(&self) -> AppResult<()> {
        if self.dimensions == 0 || self.data.len() % self.dimensions != 0 {
            return Err(AppError::Config(format!(
                "Corrupt vector data: {} values for dimension {}",
                self.data.len(),
                self.dimensions
            )));
        }
        Ok(())
    }
}

impl VectorIndex for FlatL2Index {
    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn len(&self) -> usize {
        self.data.len() / self.dimensions
    }

    fn search(&self, query: &[f32], k: usize) -> AppResult<Vec<(usize, f32)>> {
        if query.len() != self.dimensions {
            return Err(AppError::Config(format!(
                "Query vector has dimension {}, index expects {}",
                query.len(),
                self.dimensions
            )));
        }

        let mut scored: Vec<(usize, f32)> = self
            .rows()
            .enumerate()
            .map(|(position, row)| (position, squared_l2(query, row)))
            .collect();

        // NaN distances of either sign rank after everything else
        scored.sort_by(|a, b| {
            a.1.is_nan()
                .cmp(&b.1.is_nan())
                .then(a.1.total_cmp(&b.1))
                .then(a.0.cmp(&b.0))
        });
        scored.truncate(k.min(scored.len()));

        Ok(scored)
    }
}

fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}
